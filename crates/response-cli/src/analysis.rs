//! Channel analysis: evaluation, sensitivity, unit checks and export.

use crate::config::AnalysisConfig;
use anyhow::{Context, Result};
use lib_filters::{export_response, ChannelResponse, PassBand};
use lib_metadata::SurveyFilters;
use lib_types::response::Response;
use lib_types::units::{Hertz, Seconds};
use serde::Serialize;

/// Sampled composite response of one channel.
#[derive(Clone, Debug, Serialize)]
pub struct ResponseCurve {
    pub channel: String,
    pub frequencies: Vec<Hertz>,
    pub amplitude: Vec<f64>,
    /// Phase in degrees.
    pub phase: Vec<f64>,
}

/// Scalar properties of one channel.
#[derive(Clone, Debug, Serialize)]
pub struct ChannelSummary {
    pub channel: String,
    pub sample_rate: Hertz,
    pub filters: Vec<String>,
    pub units_in: Option<String>,
    pub units_out: Option<String>,
    pub pass_band: Option<PassBand>,
    pub normalization_frequency: Option<Hertz>,
    pub sensitivity: Option<f64>,
    pub total_delay: Seconds,
}

/// Outcome of a unit-consistency check for one channel.
#[derive(Clone, Debug, Serialize)]
pub struct UnitCheck {
    pub channel: String,
    pub consistent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Runs channel-level analyses over a loaded survey.
pub struct Analyzer {
    survey: SurveyFilters,
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(survey: SurveyFilters, config: AnalysisConfig) -> Self {
        Self { survey, config }
    }

    pub fn survey(&self) -> &SurveyFilters {
        &self.survey
    }

    /// Resolve a channel onto the configured grid.
    pub fn channel(&self, name: &str) -> Result<ChannelResponse> {
        let mut response = self
            .survey
            .channel_response(name)
            .with_context(|| format!("Failed to resolve channel '{}'", name))?;
        response.set_frequencies(Some(self.config.grid.frequencies()))?;
        if let Some(frequency) = self.config.export.normalization_frequency {
            response.set_normalization_frequency(Some(frequency));
        }
        Ok(response)
    }

    pub fn response_curve(&self, name: &str) -> Result<ResponseCurve> {
        let mut channel = self.channel(name)?;
        let h = channel.complex_response(None, &self.config.response.options())?;

        tracing::info!("Evaluated '{}' at {} frequencies", name, h.len());

        Ok(ResponseCurve {
            channel: name.to_string(),
            frequencies: channel.frequencies().map(<[Hertz]>::to_vec).unwrap_or_default(),
            amplitude: h.iter().map(|v| v.norm()).collect(),
            phase: h.iter().map(|v| v.arg().to_degrees()).collect(),
        })
    }

    pub fn summary(&self, name: &str) -> Result<ChannelSummary> {
        let mut channel = self.channel(name)?;
        let sample_rate = self.survey.channel(name)?.sample_rate;

        let pass_band = channel.pass_band()?;
        let sensitivity = match channel.compute_instrument_sensitivity(None) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("No sensitivity for '{}': {}", name, e);
                None
            }
        };

        Ok(ChannelSummary {
            channel: name.to_string(),
            sample_rate,
            filters: channel.names().into_iter().map(String::from).collect(),
            units_in: channel.units_in().ok().map(String::from),
            units_out: channel.units_out().ok().map(String::from),
            pass_band,
            normalization_frequency: channel.normalization_frequency(),
            sensitivity,
            total_delay: channel.total_delay(),
        })
    }

    /// Sensitivity and the frequency it was evaluated at.
    pub fn sensitivity(&self, name: &str, frequency: Option<Hertz>) -> Result<(Hertz, f64)> {
        let mut channel = self.channel(name)?;
        let value = channel
            .compute_instrument_sensitivity(frequency)
            .with_context(|| format!("Failed to compute sensitivity of '{}'", name))?;
        let at = channel
            .normalization_frequency()
            .context("Normalization frequency missing after sensitivity computation")?;
        Ok((at, value))
    }

    /// Check one channel, or every channel when `name` is `None`.
    pub fn check_units(&self, name: Option<&str>) -> Result<Vec<UnitCheck>> {
        let names: Vec<&str> = match name {
            Some(name) => vec![name],
            None => self.survey.channels.iter().map(|c| c.name.as_str()).collect(),
        };

        names
            .into_iter()
            .map(|name| {
                let channel = self.channel(name)?;
                let check = match channel.check_consistency_of_units() {
                    Ok(()) => UnitCheck {
                        channel: name.to_string(),
                        consistent: true,
                        message: None,
                    },
                    Err(e) => UnitCheck {
                        channel: name.to_string(),
                        consistent: false,
                        message: Some(e.to_string()),
                    },
                };
                Ok(check)
            })
            .collect()
    }

    /// Export a channel as a sensitivity header plus response stages.
    pub fn export(&self, name: &str, sample_rate: Option<Hertz>) -> Result<Response> {
        let mut channel = self.channel(name)?;
        let sample_rate = match sample_rate.or(self.config.export.sample_rate) {
            Some(rate) => rate,
            None => self.survey.channel(name)?.sample_rate,
        };
        let response = export_response(&mut channel, None, sample_rate)
            .with_context(|| format!("Failed to export channel '{}'", name))?;

        tracing::info!(
            "Exported '{}' with {} stages, sensitivity {} at {} Hz",
            name,
            response.len(),
            response.instrument_sensitivity.value,
            response.instrument_sensitivity.frequency.0
        );
        Ok(response)
    }
}
