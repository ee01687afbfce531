//! Pure time-delay stage.
//!
//! Delays are usually corrected in the time domain; the engine leaves them
//! out of composed responses unless asked to include them.

use crate::base::{FilterBase, FilterStage, FilterType, ResponseOptions};
use crate::error::{FilterError, FilterResult};
use lib_types::response::{CfTransferFunctionType, Decimation, ResponseStage, StageKind};
use lib_types::units::{Hertz, Seconds};
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Constant delay, `H(f) = exp(-j 2πf τ)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeDelayFilter {
    #[serde(flatten)]
    pub base: FilterBase,

    #[serde(default)]
    pub delay: Seconds,
}

impl TimeDelayFilter {
    pub const FIELDS: &'static [&'static str] = &["delay"];

    pub fn new(base: FilterBase, delay: Seconds) -> Self {
        Self { base, delay }
    }
}

impl FilterStage for TimeDelayFilter {
    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn filter_type(&self) -> FilterType {
        FilterType::TimeDelay
    }

    fn complex_response(&self, frequencies: &[Hertz], _options: &ResponseOptions) -> Array1<Complex64> {
        frequencies
            .iter()
            .map(|f| Complex64::from_polar(1.0, -f.angular() * self.delay.0))
            .collect()
    }

    fn to_response_stage(
        &self,
        stage_number: usize,
        normalization_frequency: Hertz,
        sample_rate: Hertz,
    ) -> ResponseStage {
        let mut decimation = Decimation::unity(sample_rate);
        decimation.delay = self.delay;

        ResponseStage {
            stage_sequence_number: stage_number,
            name: self.base.name.clone(),
            description: self.base.comments.clone(),
            stage_gain: self.base.gain,
            stage_gain_frequency: normalization_frequency,
            input_units: self.base.units_in.clone(),
            output_units: self.base.units_out.clone(),
            decimation: Some(decimation),
            kind: StageKind::Coefficients {
                transfer_function_type: CfTransferFunctionType::Digital,
                numerator: vec![1.0],
                denominator: Vec::new(),
            },
        }
    }

    fn validate(&self) -> FilterResult<()> {
        if !self.delay.0.is_finite() {
            return Err(FilterError::invalid_filter(&self.base.name, "delay must be finite"));
        }
        Ok(())
    }
}
