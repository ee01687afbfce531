//! Tabulated frequency/amplitude/phase (FAP) stage.

use crate::base::{FilterBase, FilterStage, FilterType, Interpolation, ResponseOptions};
use crate::error::{FilterError, FilterResult};
use crate::interpolation::{interpolate_table, unwrap_phase};
use lib_types::response::{Decimation, ResponseListElement, ResponseStage, StageKind};
use lib_types::units::Hertz;
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Calibration table sampled at discrete frequencies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrequencyResponseTableFilter {
    #[serde(flatten)]
    pub base: FilterBase,

    pub frequencies: Vec<Hertz>,
    pub amplitudes: Vec<f64>,

    /// Phase in radians.
    pub phases: Vec<f64>,
}

impl FrequencyResponseTableFilter {
    pub const FIELDS: &'static [&'static str] = &["frequencies", "amplitudes", "phases"];

    pub fn new(base: FilterBase, frequencies: Vec<Hertz>, amplitudes: Vec<f64>, phases: Vec<f64>) -> Self {
        Self {
            base,
            frequencies,
            amplitudes,
            phases,
        }
    }

    /// Lowest and highest tabulated frequency.
    pub fn frequency_range(&self) -> Option<(Hertz, Hertz)> {
        Some((*self.frequencies.first()?, *self.frequencies.last()?))
    }
}

impl FilterStage for FrequencyResponseTableFilter {
    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn filter_type(&self) -> FilterType {
        FilterType::FrequencyResponseTable
    }

    /// A table that fails `validate` evaluates to NaN everywhere.
    fn complex_response(&self, frequencies: &[Hertz], options: &ResponseOptions) -> Array1<Complex64> {
        if let Err(e) = self.validate() {
            tracing::warn!("Cannot evaluate table '{}': {}", self.base.name, e);
            return Array1::from_elem(frequencies.len(), Complex64::new(f64::NAN, f64::NAN));
        }

        let method = options.interpolation;
        let log_amplitudes = method == Interpolation::LogLinear && self.amplitudes.iter().all(|&a| a > 0.0);
        if method == Interpolation::LogLinear && !log_amplitudes {
            tracing::debug!(
                "Table '{}' has non-positive amplitudes, interpolating amplitude linearly",
                self.base.name
            );
        }

        let phases = unwrap_phase(&self.phases);
        let amplitude = interpolate_table(&self.frequencies, &self.amplitudes, frequencies, method, log_amplitudes);
        let phase = interpolate_table(&self.frequencies, &phases, frequencies, method, false);

        amplitude
            .into_iter()
            .zip(phase)
            .map(|(a, p)| Complex64::from_polar(a * self.base.gain, p))
            .collect()
    }

    fn to_response_stage(
        &self,
        stage_number: usize,
        normalization_frequency: Hertz,
        sample_rate: Hertz,
    ) -> ResponseStage {
        let elements = self
            .frequencies
            .iter()
            .zip(&self.amplitudes)
            .zip(&self.phases)
            .map(|((&frequency, &amplitude), &phase)| ResponseListElement {
                frequency,
                amplitude,
                phase: phase.to_degrees(),
            })
            .collect();

        ResponseStage {
            stage_sequence_number: stage_number,
            name: self.base.name.clone(),
            description: self.base.comments.clone(),
            stage_gain: self.base.gain,
            stage_gain_frequency: normalization_frequency,
            input_units: self.base.units_in.clone(),
            output_units: self.base.units_out.clone(),
            decimation: Some(Decimation::unity(sample_rate)),
            kind: StageKind::ResponseList { elements },
        }
    }

    fn validate(&self) -> FilterResult<()> {
        let name = &self.base.name;
        let n = self.frequencies.len();
        if self.amplitudes.len() != n || self.phases.len() != n {
            return Err(FilterError::invalid_filter(
                name,
                format!(
                    "table columns differ in length: {} frequencies, {} amplitudes, {} phases",
                    n,
                    self.amplitudes.len(),
                    self.phases.len()
                ),
            ));
        }
        if n < 2 {
            return Err(FilterError::invalid_filter(name, "table needs at least two rows"));
        }
        if !self.frequencies.iter().all(|f| f.0.is_finite() && f.0 > 0.0) {
            return Err(FilterError::invalid_filter(name, "table frequencies must be positive"));
        }
        if !self.frequencies.windows(2).all(|w| w[0].0 < w[1].0) {
            return Err(FilterError::invalid_filter(
                name,
                "table frequencies must be strictly increasing",
            ));
        }
        if !self.amplitudes.iter().chain(&self.phases).all(|v| v.is_finite()) {
            return Err(FilterError::invalid_filter(name, "amplitudes and phases must be finite"));
        }
        Ok(())
    }
}
