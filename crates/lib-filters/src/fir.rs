//! Digital FIR filter stage.

use crate::base::{FilterBase, FilterStage, FilterType, ResponseOptions};
use crate::error::{FilterError, FilterResult};
use lib_types::response::{Decimation, FirSymmetry, ResponseStage, StageKind};
use lib_types::units::Hertz;
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

fn default_decimation_factor() -> u32 {
    1
}

/// FIR stage evaluated on the unit circle at its input sample rate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FirFilter {
    #[serde(flatten)]
    pub base: FilterBase,

    /// Stored coefficients; only the leading half for symmetric filters.
    pub coefficients: Vec<f64>,

    #[serde(default)]
    pub symmetry: FirSymmetry,

    pub decimation_input_sample_rate: Hertz,

    #[serde(default = "default_decimation_factor")]
    pub decimation_factor: u32,
}

impl FirFilter {
    pub const FIELDS: &'static [&'static str] = &[
        "coefficients",
        "symmetry",
        "decimation_input_sample_rate",
        "decimation_factor",
    ];

    pub fn new(base: FilterBase, coefficients: Vec<f64>, decimation_input_sample_rate: Hertz) -> Self {
        Self {
            base,
            coefficients,
            symmetry: FirSymmetry::None,
            decimation_input_sample_rate,
            decimation_factor: default_decimation_factor(),
        }
    }

    pub fn with_symmetry(mut self, symmetry: FirSymmetry) -> Self {
        self.symmetry = symmetry;
        self
    }

    pub fn with_decimation_factor(mut self, factor: u32) -> Self {
        self.decimation_factor = factor;
        self
    }

    /// All taps, with the mirrored half expanded for symmetric filters.
    pub fn full_coefficients(&self) -> Vec<f64> {
        let c = &self.coefficients;
        match self.symmetry {
            FirSymmetry::None => c.clone(),
            FirSymmetry::Even => c.iter().chain(c.iter().rev()).copied().collect(),
            FirSymmetry::Odd => {
                let mirrored = c.len().saturating_sub(1);
                c.iter().chain(c[..mirrored].iter().rev()).copied().collect()
            }
        }
    }

    /// Sample rate after decimation.
    pub fn output_sample_rate(&self) -> Hertz {
        self.decimation_input_sample_rate / f64::from(self.decimation_factor.max(1))
    }

    /// Sum of all taps (DC gain of the unscaled filter).
    pub fn coefficient_gain(&self) -> f64 {
        self.full_coefficients().iter().sum()
    }
}

impl FilterStage for FirFilter {
    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn filter_type(&self) -> FilterType {
        FilterType::Fir
    }

    fn complex_response(&self, frequencies: &[Hertz], _options: &ResponseOptions) -> Array1<Complex64> {
        let taps = self.full_coefficients();
        let fs = self.decimation_input_sample_rate.0;
        let gain = self.base.gain;

        frequencies
            .iter()
            .map(|f| {
                let w = 2.0 * PI * f.0 / fs;
                let h: Complex64 = taps
                    .iter()
                    .enumerate()
                    .map(|(k, &b)| Complex64::from_polar(b, -w * k as f64))
                    .sum();
                h * gain
            })
            .collect()
    }

    fn to_response_stage(
        &self,
        stage_number: usize,
        normalization_frequency: Hertz,
        _sample_rate: Hertz,
    ) -> ResponseStage {
        let mut decimation = Decimation::unity(self.decimation_input_sample_rate);
        decimation.factor = self.decimation_factor;

        ResponseStage {
            stage_sequence_number: stage_number,
            name: self.base.name.clone(),
            description: self.base.comments.clone(),
            stage_gain: self.base.gain,
            stage_gain_frequency: normalization_frequency,
            input_units: self.base.units_in.clone(),
            output_units: self.base.units_out.clone(),
            decimation: Some(decimation),
            kind: StageKind::Fir {
                symmetry: self.symmetry,
                coefficients: self.coefficients.clone(),
            },
        }
    }

    fn validate(&self) -> FilterResult<()> {
        let name = &self.base.name;
        if self.coefficients.is_empty() {
            return Err(FilterError::invalid_filter(name, "FIR filter needs at least one coefficient"));
        }
        if !self.coefficients.iter().all(|c| c.is_finite()) {
            return Err(FilterError::invalid_filter(name, "FIR coefficients must be finite"));
        }
        let fs = self.decimation_input_sample_rate.0;
        if !(fs.is_finite() && fs > 0.0) {
            return Err(FilterError::invalid_filter(
                name,
                format!("decimation input sample rate must be positive, got {}", fs),
            ));
        }
        if self.decimation_factor == 0 {
            return Err(FilterError::invalid_filter(name, "decimation factor must be at least 1"));
        }
        Ok(())
    }
}
