//! Shared filter metadata and the stage capability trait.

use crate::error::FilterResult;
use crate::pass_band::{estimate_pass_band, PassBand, PassBandOptions};
use lib_types::response::ResponseStage;
use lib_types::units::Hertz;
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of filter stage kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    PoleZero,
    Coefficient,
    TimeDelay,
    Fir,
    FrequencyResponseTable,
}

impl FilterType {
    pub const ALL: [FilterType; 5] = [
        Self::PoleZero,
        Self::Coefficient,
        Self::TimeDelay,
        Self::Fir,
        Self::FrequencyResponseTable,
    ];

    /// Tag used in metadata files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PoleZero => "pole_zero",
            Self::Coefficient => "coefficient",
            Self::TimeDelay => "time_delay",
            Self::Fir => "fir",
            Self::FrequencyResponseTable => "frequency_response_table",
        }
    }

    /// Parse a metadata tag. Accepts the spaced spelling used by older files.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let normalized = tag.trim().to_ascii_lowercase().replace(' ', "_");
        Self::ALL.into_iter().find(|t| t.as_str() == normalized)
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_gain() -> f64 {
    1.0
}

/// Attributes every filter stage carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterBase {
    /// Unique key within a chain or registry.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,

    pub units_in: String,
    pub units_out: String,

    #[serde(default = "default_gain")]
    pub gain: f64,

    /// Stage belongs to a sample-rate reduction step.
    #[serde(default)]
    pub decimation_active: bool,
}

impl FilterBase {
    /// Field names accepted in metadata files.
    pub const FIELDS: &'static [&'static str] = &[
        "name",
        "comments",
        "units_in",
        "units_out",
        "gain",
        "decimation_active",
    ];

    /// Create base metadata with unit gain.
    pub fn new(
        name: impl Into<String>,
        units_in: impl Into<String>,
        units_out: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            comments: None,
            units_in: units_in.into(),
            units_out: units_out.into(),
            gain: default_gain(),
            decimation_active: false,
        }
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn with_decimation_active(mut self, active: bool) -> Self {
        self.decimation_active = active;
        self
    }
}

/// Table interpolation used by tabulated stages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Linear in frequency for amplitude and phase.
    #[default]
    Linear,
    /// Linear in log-frequency, amplitude interpolated in log space.
    LogLinear,
    /// Value of the closest table row.
    Nearest,
}

/// Options forwarded to every stage of a chain during evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseOptions {
    #[serde(default)]
    pub interpolation: Interpolation,
}

/// Capability interface implemented by every filter stage.
pub trait FilterStage {
    /// Shared metadata.
    fn base(&self) -> &FilterBase;

    /// Kind tag.
    fn filter_type(&self) -> FilterType;

    /// Complex response sampled at `frequencies`.
    fn complex_response(&self, frequencies: &[Hertz], options: &ResponseOptions) -> Array1<Complex64>;

    /// Convert to an external response stage.
    fn to_response_stage(
        &self,
        stage_number: usize,
        normalization_frequency: Hertz,
        sample_rate: Hertz,
    ) -> ResponseStage;

    /// Check stage invariants.
    fn validate(&self) -> FilterResult<()> {
        Ok(())
    }

    /// Frequency band over which the amplitude response is flat.
    fn pass_band(&self, frequencies: &[Hertz], options: &ResponseOptions) -> Option<PassBand> {
        let amplitudes: Vec<f64> = self
            .complex_response(frequencies, options)
            .iter()
            .map(|h| h.norm())
            .collect();
        estimate_pass_band(frequencies, &amplitudes, &PassBandOptions::default())
    }

    fn name(&self) -> &str {
        &self.base().name
    }

    fn units_in(&self) -> &str {
        &self.base().units_in
    }

    fn units_out(&self) -> &str {
        &self.base().units_out
    }

    fn gain(&self) -> f64 {
        self.base().gain
    }

    fn decimation_active(&self) -> bool {
        self.base().decimation_active
    }
}
