//! Analog pole-zero filter stage.
//!
//! Poles and zeros live in the Laplace plane in radians per second:
//!
//! ```text
//! H(f) = gain * A0 * Π(s - z_k) / Π(s - p_k),   s = j 2πf
//! ```

use crate::base::{FilterBase, FilterStage, FilterType, ResponseOptions};
use crate::coefficient::CoefficientFilter;
use crate::error::{FilterError, FilterResult};
use lib_types::response::{Decimation, PzTransferFunctionType, ResponseStage, StageKind};
use lib_types::units::Hertz;
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

fn default_normalization_factor() -> f64 {
    1.0
}

/// Pole-zero representation of an analog response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoleZeroFilter {
    #[serde(flatten)]
    pub base: FilterBase,

    #[serde(default)]
    pub poles: Vec<Complex64>,

    #[serde(default)]
    pub zeros: Vec<Complex64>,

    /// A0, scales the rational function so that it is 1 at the
    /// normalization frequency.
    #[serde(default = "default_normalization_factor")]
    pub normalization_factor: f64,
}

impl PoleZeroFilter {
    pub const FIELDS: &'static [&'static str] = &["poles", "zeros", "normalization_factor"];

    /// A flat pole-zero stage with no poles or zeros.
    pub fn new(base: FilterBase) -> Self {
        Self {
            base,
            poles: Vec::new(),
            zeros: Vec::new(),
            normalization_factor: default_normalization_factor(),
        }
    }

    pub fn with_poles(mut self, poles: Vec<Complex64>) -> Self {
        self.poles = poles;
        self
    }

    pub fn with_zeros(mut self, zeros: Vec<Complex64>) -> Self {
        self.zeros = zeros;
        self
    }

    pub fn with_normalization_factor(mut self, factor: f64) -> Self {
        self.normalization_factor = factor;
        self
    }

    /// Equivalent flat stage for a coefficient filter: same name, gain,
    /// units and comments.
    pub fn from_coefficient(filter: &CoefficientFilter) -> Self {
        Self::new(filter.base.clone())
    }

    /// `gain * normalization_factor`.
    pub fn total_gain(&self) -> f64 {
        self.base.gain * self.normalization_factor
    }

    /// Rational function without any gain applied.
    fn rational_response(&self, frequency: Hertz) -> Complex64 {
        let s = Complex64::new(0.0, frequency.angular());
        let numerator: Complex64 = self.zeros.iter().map(|z| s - z).product();
        let denominator: Complex64 = self.poles.iter().map(|p| s - p).product();
        numerator / denominator
    }

    /// Normalization factor that makes the rational function unity at `frequency`.
    pub fn normalization_factor_at(&self, frequency: Hertz) -> f64 {
        1.0 / self.rational_response(frequency).norm()
    }
}

impl FilterStage for PoleZeroFilter {
    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn filter_type(&self) -> FilterType {
        FilterType::PoleZero
    }

    fn complex_response(&self, frequencies: &[Hertz], _options: &ResponseOptions) -> Array1<Complex64> {
        let k = self.total_gain();
        frequencies
            .iter()
            .map(|&f| self.rational_response(f) * k)
            .collect()
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
            kind: StageKind::PolesZeros {
                transfer_function_type: PzTransferFunctionType::LaplaceRadians,
                normalization_factor: self.normalization_factor,
                normalization_frequency,
                zeros: self.zeros.clone(),
                poles: self.poles.clone(),
            },
        }
    }

    fn validate(&self) -> FilterResult<()> {
        let finite = |c: &Complex64| c.re.is_finite() && c.im.is_finite();
        if !self.poles.iter().all(finite) || !self.zeros.iter().all(finite) {
            return Err(FilterError::invalid_filter(
                &self.base.name,
                "poles and zeros must be finite",
            ));
        }
        if !self.normalization_factor.is_finite() {
            return Err(FilterError::invalid_filter(
                &self.base.name,
                "normalization factor must be finite",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn lowpass(corner_hz: f64) -> PoleZeroFilter {
        let wc = 2.0 * PI * corner_hz;
        PoleZeroFilter::new(FilterBase::new("lowpass", "V", "V"))
            .with_poles(vec![Complex64::new(-wc, 0.0)])
            .with_normalization_factor(wc)
    }

    #[test]
    fn test_lowpass_corner_is_minus_3db() {
        let pz = lowpass(10.0);
        let h = pz.complex_response(&[Hertz(0.001), Hertz(10.0)], &ResponseOptions::default());

        assert!((h[0].norm() - 1.0).abs() < 1e-6);
        assert!((h[1].norm() - 1.0 / 2f64.sqrt()).abs() < 1e-9);
        assert!((h[1].arg() + PI / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_poles_or_zeros_is_flat_gain() {
        let pz = PoleZeroFilter::new(FilterBase::new("flat", "V", "mV").with_gain(1000.0));
        let h = pz.complex_response(&[Hertz(0.1), Hertz(100.0)], &ResponseOptions::default());

        assert!(h.iter().all(|v| (v - Complex64::new(1000.0, 0.0)).norm() < 1e-9));
    }

    #[test]
    fn test_normalization_factor_at() {
        let pz = lowpass(1.0).with_normalization_factor(1.0);
        let a0 = pz.normalization_factor_at(Hertz(0.01));
        let normalized = pz.with_normalization_factor(a0);

        let h = normalized.complex_response(&[Hertz(0.01)], &ResponseOptions::default());
        assert!((h[0].norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_response_stage_fields() {
        let pz = lowpass(5.0);
        let stage = pz.to_response_stage(2, Hertz(1.0), Hertz(256.0));

        assert_eq!(stage.stage_sequence_number, 2);
        assert_eq!(stage.stage_gain_frequency, Hertz(1.0));
        assert_eq!(stage.decimation.unwrap().input_sample_rate, Hertz(256.0));
        match stage.kind {
            StageKind::PolesZeros { poles, zeros, .. } => {
                assert_eq!(poles.len(), 1);
                assert!(zeros.is_empty());
            }
            other => panic!("unexpected stage kind {:?}", other),
        }
    }

    #[test]
    fn test_rejects_non_finite_pole() {
        let pz = PoleZeroFilter::new(FilterBase::new("bad", "V", "V"))
            .with_poles(vec![Complex64::new(f64::NAN, 0.0)]);
        assert!(pz.validate().is_err());
    }
}
