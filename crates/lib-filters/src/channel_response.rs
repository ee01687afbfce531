//! Channel response: the cascade of all filters attached to one channel.
//!
//! Combines the stages of a channel into a single frequency-domain transfer
//! function, checks that units chain correctly from stage to stage, and
//! computes the pass band, normalization frequency and total sensitivity.
//!
//! Time-delay stages are left out of composed responses by default; delays
//! are better corrected in the time domain.
//!
//! A `ChannelResponse` is not internally synchronized. Evaluation methods
//! that accept a new frequency grid take `&mut self`, so sharing one
//! instance between threads requires an external lock.

use crate::base::{FilterStage, ResponseOptions};
use crate::error::{FilterError, FilterResult};
use crate::filter::Filter;
use crate::pass_band::PassBand;
use lib_types::units::{default_frequency_grid, Hertz, Seconds};
use ndarray::Array1;
use num_complex::Complex64;
use std::fmt;
use std::sync::Arc;

/// Round to a fixed number of decimal places.
fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn validate_frequencies(values: &[Hertz]) -> FilterResult<()> {
    match values
        .iter()
        .enumerate()
        .find(|(_, f)| !(f.0.is_finite() && f.0 > 0.0))
    {
        Some((index, f)) => Err(FilterError::InvalidFrequency { index, value: f.0 }),
        None => Ok(()),
    }
}

/// Construction parameters for a [`ChannelResponse`].
#[derive(Clone, Debug, Default)]
pub struct ChannelResponseConfig {
    /// Stages in application order.
    pub filters: Vec<Arc<Filter>>,

    /// Evaluation grid; `None` selects the default log-spaced grid.
    pub frequencies: Option<Vec<Hertz>>,

    /// Pinned normalization frequency.
    pub normalization_frequency: Option<Hertz>,
}

/// Flags for [`ChannelResponse::complex_response`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComplexResponseOptions {
    /// Include time-delay stages.
    pub include_delay: bool,

    /// Divide by the peak magnitude so the maximum is 1.
    pub normalize: bool,

    /// Include stages flagged `decimation_active`.
    pub include_decimation: bool,

    /// Forwarded to every stage.
    pub stage: ResponseOptions,
}

impl Default for ComplexResponseOptions {
    fn default() -> Self {
        Self {
            include_delay: false,
            normalize: false,
            include_decimation: true,
            stage: ResponseOptions::default(),
        }
    }
}

/// Ordered filter chain of one channel plus its evaluation state.
#[derive(Clone, Debug)]
pub struct ChannelResponse {
    filters_list: Vec<Arc<Filter>>,
    frequencies: Option<Vec<Hertz>>,
    normalization_frequency: Option<Hertz>,
}

impl Default for ChannelResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelResponse {
    /// Empty chain on the default frequency grid.
    pub fn new() -> Self {
        Self {
            filters_list: Vec::new(),
            frequencies: Some(default_frequency_grid()),
            normalization_frequency: None,
        }
    }

    /// Chain of the given filters on the default frequency grid.
    pub fn with_filters<I>(filters: I) -> Self
    where
        I: IntoIterator<Item = Arc<Filter>>,
    {
        let mut response = Self::new();
        response.set_filters(filters);
        response
    }

    /// Build from a configuration, validating the frequency grid.
    pub fn from_config(config: ChannelResponseConfig) -> FilterResult<Self> {
        let mut response = Self::with_filters(config.filters);
        if let Some(frequencies) = config.frequencies {
            response.set_frequencies(Some(frequencies))?;
        }
        response.normalization_frequency = config.normalization_frequency;
        Ok(response)
    }

    pub fn filters_list(&self) -> &[Arc<Filter>] {
        &self.filters_list
    }

    /// Replace the chain.
    pub fn set_filters<I>(&mut self, filters: I)
    where
        I: IntoIterator<Item = Arc<Filter>>,
    {
        self.filters_list = filters.into_iter().collect();
    }

    pub fn len(&self) -> usize {
        self.filters_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters_list.is_empty()
    }

    /// Names of the stages in chain order.
    pub fn names(&self) -> Vec<&str> {
        self.filters_list.iter().map(|f| f.name()).collect()
    }

    pub fn frequencies(&self) -> Option<&[Hertz]> {
        self.frequencies.as_deref()
    }

    /// Replace the evaluation grid. `None` unsets it.
    ///
    /// Every value must be positive and finite; on error the current grid
    /// is left untouched.
    pub fn set_frequencies(&mut self, frequencies: Option<Vec<Hertz>>) -> FilterResult<()> {
        if let Some(values) = &frequencies {
            validate_frequencies(values)?;
        }
        self.frequencies = frequencies;
        Ok(())
    }

    /// Pin the normalization frequency, or clear the pin with `None`.
    pub fn set_normalization_frequency(&mut self, frequency: Option<Hertz>) {
        self.normalization_frequency = frequency;
    }

    /// All stages that are not time delays.
    pub fn non_delay_filters(&self) -> Vec<&Arc<Filter>> {
        self.filters_list.iter().filter(|f| !f.is_time_delay()).collect()
    }

    /// All time-delay stages.
    pub fn delay_filters(&self) -> Vec<&Arc<Filter>> {
        self.filters_list.iter().filter(|f| f.is_time_delay()).collect()
    }

    /// Sum of all time-delay stages.
    pub fn total_delay(&self) -> Seconds {
        self.delay_filters().into_iter().map(|f| f.delay()).sum()
    }

    /// Intersection of the stage pass bands over the current grid.
    ///
    /// Stages without a pass band are skipped; `None` if no stage has one.
    /// An inverted intersection (`low > high`) is returned as is.
    pub fn pass_band(&self) -> FilterResult<Option<PassBand>> {
        let frequencies = self.frequencies.as_deref().ok_or(FilterError::FrequenciesUnset)?;
        let options = ResponseOptions::default();

        let band = self
            .filters_list
            .iter()
            .filter_map(|f| f.pass_band(frequencies, &options))
            .reduce(|acc, pb| acc.intersect(&pb));

        if let Some(pb) = &band {
            if pb.is_inverted() {
                tracing::warn!(
                    "Pass bands of [{}] do not overlap: low {} Hz > high {} Hz",
                    self.names().join(", "),
                    pb.low.0,
                    pb.high.0
                );
            }
        }

        Ok(band)
    }

    /// Pinned normalization frequency, else the pass-band mean rounded to
    /// three decimals, else `None`.
    pub fn normalization_frequency(&self) -> Option<Hertz> {
        self.normalization_frequency.or_else(|| {
            self.pass_band()
                .ok()
                .flatten()
                .map(|pb| Hertz(round_to(pb.mean().0, 3)))
        })
    }

    /// Composite complex response of the chain.
    ///
    /// Supplying `frequencies` replaces the stored grid. Stages are
    /// multiplied in chain order. An empty working chain yields ones.
    pub fn complex_response(
        &mut self,
        frequencies: Option<Vec<Hertz>>,
        options: &ComplexResponseOptions,
    ) -> FilterResult<Array1<Complex64>> {
        if frequencies.is_some() {
            self.set_frequencies(frequencies)?;
        }
        let grid = self.frequencies.as_deref().ok_or(FilterError::FrequenciesUnset)?;

        let chain: Vec<&Filter> = self
            .filters_list
            .iter()
            .map(|f| f.as_ref())
            .filter(|f| options.include_delay || !f.is_time_delay())
            .filter(|f| options.include_decimation || !f.decimation_active())
            .collect();

        let mut result = Array1::<Complex64>::ones(grid.len());
        if chain.is_empty() {
            tracing::debug!("No filters selected for evaluation, returning unit response");
            return Ok(result);
        }

        for stage in chain {
            result *= &stage.complex_response(grid, &options.stage);
        }

        if options.normalize {
            let peak = result.iter().map(|h| h.norm()).fold(0.0, f64::max);
            if peak > 0.0 && peak.is_finite() {
                result.mapv_inplace(|h| h / peak);
            }
        }

        Ok(result)
    }

    /// Magnitude of the whole chain at the normalization frequency, rounded
    /// to three decimals.
    ///
    /// Supplying a frequency pins it first. Every stage, delays included, is
    /// evaluated at that single frequency.
    pub fn compute_instrument_sensitivity(
        &mut self,
        normalization_frequency: Option<Hertz>,
    ) -> FilterResult<f64> {
        if let Some(frequency) = normalization_frequency {
            validate_frequencies(&[frequency])?;
            self.normalization_frequency = Some(frequency);
        }
        let frequency = self
            .normalization_frequency()
            .ok_or(FilterError::NoNormalizationFrequency)?;

        let options = ResponseOptions::default();
        let one = Complex64::new(1.0, 0.0);
        let sensitivity: Complex64 = self
            .filters_list
            .iter()
            .map(|f| f.complex_response(&[frequency], &options).get(0).copied().unwrap_or(one))
            .product();

        Ok(round_to(sensitivity.norm(), 3))
    }

    /// Input units of the first stage.
    pub fn units_in(&self) -> FilterResult<&str> {
        self.filters_list
            .first()
            .map(|f| f.units_in())
            .ok_or(FilterError::EmptyChain)
    }

    /// Output units of the last stage.
    pub fn units_out(&self) -> FilterResult<&str> {
        self.filters_list
            .last()
            .map(|f| f.units_out())
            .ok_or(FilterError::EmptyChain)
    }

    /// Check that each stage consumes the units the previous one produces.
    pub fn check_consistency_of_units(&self) -> FilterResult<()> {
        for pair in self.filters_list.windows(2) {
            let (previous, next) = (&pair[0], &pair[1]);
            if next.units_in() != previous.units_out() {
                return Err(FilterError::UnitMismatch {
                    filter: next.name().to_string(),
                    expected: previous.units_out().to_string(),
                    found: next.units_in().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for ChannelResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Filters Included:")?;
        writeln!(f, "{}", "=".repeat(25))?;
        for filter in &self.filters_list {
            writeln!(f, "{}", filter)?;
            writeln!(f, "{}", "-".repeat(20))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::FilterBase;
    use crate::coefficient::CoefficientFilter;
    use crate::fir::FirFilter;
    use crate::pole_zero::PoleZeroFilter;
    use crate::time_delay::TimeDelayFilter;
    use lib_types::units::log_frequency_grid;
    use std::f64::consts::PI;

    fn coefficient(name: &str, units_in: &str, units_out: &str, gain: f64) -> Arc<Filter> {
        Arc::new(CoefficientFilter::new(FilterBase::new(name, units_in, units_out).with_gain(gain)).into())
    }

    fn delay(name: &str, seconds: f64) -> Arc<Filter> {
        Arc::new(TimeDelayFilter::new(FilterBase::new(name, "count", "count"), Seconds(seconds)).into())
    }

    fn lowpass(name: &str, corner_hz: f64) -> Arc<Filter> {
        let wc = 2.0 * PI * corner_hz;
        Arc::new(
            PoleZeroFilter::new(FilterBase::new(name, "mV", "mV"))
                .with_poles(vec![Complex64::new(-wc, 0.0)])
                .with_normalization_factor(wc)
                .into(),
        )
    }

    fn highpass(name: &str, corner_hz: f64) -> Arc<Filter> {
        let wc = 2.0 * PI * corner_hz;
        Arc::new(
            PoleZeroFilter::new(FilterBase::new(name, "mV", "mV"))
                .with_zeros(vec![Complex64::new(0.0, 0.0)])
                .with_poles(vec![Complex64::new(-wc, 0.0)])
                .into(),
        )
    }

    fn decimating_fir() -> Arc<Filter> {
        let mut base = FilterBase::new("fir_dec", "count", "count");
        base.decimation_active = true;
        Arc::new(FirFilter::new(base, vec![0.5, 0.5], Hertz(1000.0)).with_decimation_factor(2).into())
    }

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_response_length_matches_grid() {
        let mut cr = ChannelResponse::with_filters(vec![
            lowpass("lp", 10.0),
            coefficient("adc", "mV", "count", 100.0),
            delay("lag", 0.01),
        ]);

        let h = cr.complex_response(None, &ComplexResponseOptions::default()).unwrap();
        assert_eq!(h.len(), 100);

        let grid = log_frequency_grid(-1.0, 1.0, 7);
        let h = cr.complex_response(Some(grid.clone()), &ComplexResponseOptions::default()).unwrap();
        assert_eq!(h.len(), 7);
        // new grid is sticky
        assert_eq!(cr.frequencies().unwrap(), grid.as_slice());
    }

    #[test]
    fn test_empty_chain_is_all_pass() {
        let mut cr = ChannelResponse::new();
        let flag_sets = [
            ComplexResponseOptions::default(),
            ComplexResponseOptions {
                include_delay: true,
                normalize: true,
                include_decimation: false,
                ..Default::default()
            },
        ];

        for options in flag_sets {
            let h = cr.complex_response(None, &options).unwrap();
            assert_eq!(h.len(), 100);
            assert!(h.iter().all(|v| *v == Complex64::new(1.0, 0.0)));
        }
    }

    #[test]
    fn test_single_coefficient_at_one_hertz() {
        let mut cr = ChannelResponse::with_filters(vec![coefficient("gain", "V", "V", 2.0)]);
        let h = cr
            .complex_response(Some(vec![Hertz(1.0)]), &ComplexResponseOptions::default())
            .unwrap();

        assert_eq!(h.len(), 1);
        assert_eq!(h[0], Complex64::new(2.0, 0.0));
    }

    #[test]
    fn test_normalize_peak_is_one() {
        let mut cr = ChannelResponse::with_filters(vec![
            highpass("hp", 0.01),
            lowpass("lp", 100.0),
            coefficient("adc", "mV", "count", 250.0),
        ]);
        let options = ComplexResponseOptions {
            normalize: true,
            ..Default::default()
        };

        let h = cr.complex_response(None, &options).unwrap();
        let peak = h.iter().map(|v| v.norm()).fold(0.0, f64::max);
        assert!(approx(peak, 1.0, 1e-12));
    }

    #[test]
    fn test_delay_excluded_unless_requested() {
        let mut cr = ChannelResponse::with_filters(vec![
            coefficient("gain", "count", "count", 3.0),
            delay("lag", 0.25),
        ]);
        let grid = vec![Hertz(1.0)];

        let without = cr.complex_response(Some(grid), &ComplexResponseOptions::default()).unwrap();
        assert_eq!(without[0], Complex64::new(3.0, 0.0));

        let options = ComplexResponseOptions {
            include_delay: true,
            ..Default::default()
        };
        let with = cr.complex_response(None, &options).unwrap();
        assert!(approx(with[0].norm(), 3.0, 1e-12));
        assert!(approx(with[0].arg(), -PI / 2.0, 1e-12));
    }

    #[test]
    fn test_decimation_stages_can_be_excluded() {
        let mut cr = ChannelResponse::with_filters(vec![
            coefficient("gain", "count", "count", 2.0),
            decimating_fir(),
        ]);
        // 2-tap average nulls at fs/2
        let grid = vec![Hertz(500.0)];

        let with = cr.complex_response(Some(grid), &ComplexResponseOptions::default()).unwrap();
        assert!(with[0].norm() < 1e-9);

        let options = ComplexResponseOptions {
            include_decimation: false,
            ..Default::default()
        };
        let without = cr.complex_response(None, &options).unwrap();
        assert_eq!(without[0], Complex64::new(2.0, 0.0));
    }

    #[test]
    fn test_invalid_grid_leaves_state_untouched() {
        let mut cr = ChannelResponse::with_filters(vec![coefficient("gain", "V", "V", 2.0)]);

        let err = cr
            .complex_response(Some(vec![Hertz(1.0), Hertz(-2.0)]), &ComplexResponseOptions::default())
            .unwrap_err();
        assert!(matches!(err, FilterError::InvalidFrequency { index: 1, .. }));
        assert_eq!(cr.frequencies().unwrap().len(), 100);

        assert!(cr.set_frequencies(Some(vec![Hertz(f64::NAN)])).is_err());
        assert_eq!(cr.frequencies().unwrap().len(), 100);
    }

    #[test]
    fn test_unset_frequencies() {
        let mut cr = ChannelResponse::with_filters(vec![lowpass("lp", 1.0)]);
        cr.set_frequencies(None).unwrap();

        assert!(matches!(cr.pass_band(), Err(FilterError::FrequenciesUnset)));
        assert!(matches!(
            cr.complex_response(None, &ComplexResponseOptions::default()),
            Err(FilterError::FrequenciesUnset)
        ));
        assert_eq!(cr.normalization_frequency(), None);
    }

    #[test]
    fn test_total_delay() {
        let cr = ChannelResponse::with_filters(vec![
            delay("a", 0.1),
            coefficient("gain", "count", "count", 1.0),
            delay("b", 0.25),
        ]);
        assert!(approx(cr.total_delay().0, 0.35, 1e-12));
        assert_eq!(cr.delay_filters().len(), 2);
        assert_eq!(cr.non_delay_filters().len(), 1);

        let no_delay = ChannelResponse::with_filters(vec![coefficient("gain", "V", "V", 1.0)]);
        assert_eq!(no_delay.total_delay(), Seconds::ZERO);
    }

    #[test]
    fn test_pass_band_none_without_contributors() {
        let cr = ChannelResponse::new();
        assert_eq!(cr.pass_band().unwrap(), None);
        assert_eq!(cr.normalization_frequency(), None);
    }

    #[test]
    fn test_pass_band_intersection() {
        let cr = ChannelResponse::with_filters(vec![
            highpass("hp", 0.001),
            lowpass("lp", 100.0),
            coefficient("adc", "mV", "count", 10.0),
        ]);
        let pb = cr.pass_band().unwrap().unwrap();

        assert!(!pb.is_inverted());
        assert!(pb.low.0 > 1e-3 && pb.low.0 < 1.0, "low edge {}", pb.low.0);
        assert!(pb.high.0 > 10.0 && pb.high.0 < 1000.0, "high edge {}", pb.high.0);

        let nf = cr.normalization_frequency().unwrap();
        assert!(approx(nf.0, round_to(pb.mean().0, 3), 1e-12));
    }

    #[test]
    fn test_pass_band_inversion_surfaced() {
        let cr = ChannelResponse::with_filters(vec![highpass("hp", 100.0), lowpass("lp", 0.001)]);
        let pb = cr.pass_band().unwrap().unwrap();
        assert!(pb.is_inverted());
    }

    #[test]
    fn test_pinned_normalization_frequency() {
        let mut cr = ChannelResponse::with_filters(vec![lowpass("lp", 1.0)]);
        cr.set_normalization_frequency(Some(Hertz(0.5)));
        assert_eq!(cr.normalization_frequency(), Some(Hertz(0.5)));

        cr.set_normalization_frequency(None);
        assert_ne!(cr.normalization_frequency(), Some(Hertz(0.5)));
    }

    #[test]
    fn test_sensitivity_independent_of_call_order() {
        let chain = vec![
            lowpass("lp", 10.0),
            coefficient("adc", "mV", "count", 1000.0),
            delay("lag", 0.2),
        ];

        let mut first = ChannelResponse::with_filters(chain.clone());
        let direct = first.compute_instrument_sensitivity(Some(Hertz(10.0))).unwrap();

        let mut second = ChannelResponse::with_filters(chain);
        let _ = second.normalization_frequency();
        let _ = second.compute_instrument_sensitivity(None).unwrap();
        let _ = second
            .complex_response(Some(log_frequency_grid(0.0, 2.0, 20)), &ComplexResponseOptions::default())
            .unwrap();
        let after = second.compute_instrument_sensitivity(Some(Hertz(10.0))).unwrap();

        assert_eq!(direct, after);
        // |1 / (1 + j)| * 1000
        assert!(approx(direct, round_to(1000.0 / 2f64.sqrt(), 3), 1e-9));
    }

    #[test]
    fn test_sensitivity_requires_frequency() {
        let mut cr = ChannelResponse::with_filters(vec![coefficient("gain", "V", "V", 2.0)]);
        cr.set_frequencies(None).unwrap();

        assert!(matches!(
            cr.compute_instrument_sensitivity(None),
            Err(FilterError::NoNormalizationFrequency)
        ));
        assert_eq!(cr.compute_instrument_sensitivity(Some(Hertz(1.0))).unwrap(), 2.0);
    }

    #[test]
    fn test_units_on_empty_chain_fail() {
        let cr = ChannelResponse::new();
        assert!(matches!(cr.units_in(), Err(FilterError::EmptyChain)));
        assert!(matches!(cr.units_out(), Err(FilterError::EmptyChain)));
    }

    #[test]
    fn test_units_consistency() {
        let single = ChannelResponse::with_filters(vec![coefficient("a", "V", "count", 1.0)]);
        assert!(single.check_consistency_of_units().is_ok());
        assert!(ChannelResponse::new().check_consistency_of_units().is_ok());

        let good = ChannelResponse::with_filters(vec![
            coefficient("a", "nT", "mV", 1.0),
            coefficient("b", "mV", "count", 1.0),
        ]);
        assert!(good.check_consistency_of_units().is_ok());
        assert_eq!(good.units_in().unwrap(), "nT");
        assert_eq!(good.units_out().unwrap(), "count");

        let bad = ChannelResponse::with_filters(vec![
            coefficient("a", "nT", "mV", 1.0),
            coefficient("b", "V", "count", 1.0),
        ]);
        match bad.check_consistency_of_units() {
            Err(FilterError::UnitMismatch { filter, expected, found }) => {
                assert_eq!(filter, "b");
                assert_eq!(expected, "mV");
                assert_eq!(found, "V");
            }
            other => panic!("expected unit mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_from_config() {
        let config = ChannelResponseConfig {
            filters: vec![coefficient("gain", "V", "V", 2.0)],
            frequencies: Some(vec![Hertz(1.0), Hertz(2.0)]),
            normalization_frequency: Some(Hertz(1.0)),
        };
        let cr = ChannelResponse::from_config(config).unwrap();

        assert_eq!(cr.names(), vec!["gain"]);
        assert_eq!(cr.frequencies().unwrap().len(), 2);
        assert_eq!(cr.normalization_frequency(), Some(Hertz(1.0)));

        let bad = ChannelResponseConfig {
            frequencies: Some(vec![Hertz(0.0)]),
            ..Default::default()
        };
        assert!(ChannelResponse::from_config(bad).is_err());
    }

    #[test]
    fn test_display_lists_filters() {
        let cr = ChannelResponse::with_filters(vec![coefficient("adc", "V", "count", 2.0)]);
        let text = cr.to_string();

        assert!(text.starts_with("Filters Included:"));
        assert!(text.contains("Filter Name: adc"));
    }
}
