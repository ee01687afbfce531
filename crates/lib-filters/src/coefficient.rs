//! Frequency-independent gain stage.

use crate::base::{FilterBase, FilterStage, FilterType, ResponseOptions};
use crate::error::{FilterError, FilterResult};
use lib_types::response::{CfTransferFunctionType, Decimation, ResponseStage, StageKind};
use lib_types::units::Hertz;
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Flat gain, typically a digitizer counts-per-volt conversion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoefficientFilter {
    #[serde(flatten)]
    pub base: FilterBase,
}

impl CoefficientFilter {
    pub const FIELDS: &'static [&'static str] = &[];

    pub fn new(base: FilterBase) -> Self {
        Self { base }
    }
}

impl FilterStage for CoefficientFilter {
    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn filter_type(&self) -> FilterType {
        FilterType::Coefficient
    }

    fn complex_response(&self, frequencies: &[Hertz], _options: &ResponseOptions) -> Array1<Complex64> {
        Array1::from_elem(frequencies.len(), Complex64::new(self.base.gain, 0.0))
    }

    fn to_response_stage(
        &self,
        stage_number: usize,
        normalization_frequency: Hertz,
        sample_rate: Hertz,
    ) -> ResponseStage {
        ResponseStage {
            stage_sequence_number: stage_number,
            name: self.base.name.clone(),
            description: self.base.comments.clone(),
            stage_gain: self.base.gain,
            stage_gain_frequency: normalization_frequency,
            input_units: self.base.units_in.clone(),
            output_units: self.base.units_out.clone(),
            decimation: Some(Decimation::unity(sample_rate)),
            kind: StageKind::Coefficients {
                transfer_function_type: CfTransferFunctionType::Digital,
                numerator: vec![1.0],
                denominator: Vec::new(),
            },
        }
    }

    fn validate(&self) -> FilterResult<()> {
        if !self.base.gain.is_finite() {
            return Err(FilterError::invalid_filter(&self.base.name, "gain must be finite"));
        }
        Ok(())
    }
}
