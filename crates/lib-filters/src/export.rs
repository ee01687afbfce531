//! Export of a channel response to StationXML-style response stages.

use crate::base::FilterStage;
use crate::channel_response::ChannelResponse;
use crate::error::{FilterError, FilterResult};
use crate::pole_zero::PoleZeroFilter;
use lib_types::response::{InstrumentSensitivity, Response};
use lib_types::units::{get_unit_object, is_digital_count, Hertz};

/// Sample rate recorded on exported stages when none is given.
pub const DEFAULT_EXPORT_SAMPLE_RATE: Hertz = Hertz(1.0);

/// Build the sensitivity header and ordered stages for a channel.
///
/// A `normalization_frequency` pins the channel's value before the
/// sensitivity is computed. Coefficient stages whose output is not
/// digitizer counts are exported as flat pole-zero stages, since the
/// interchange format has no bare gain stage for analog units.
pub fn export_response(
    channel: &mut ChannelResponse,
    normalization_frequency: Option<Hertz>,
    sample_rate: Hertz,
) -> FilterResult<Response> {
    let total_sensitivity = channel.compute_instrument_sensitivity(normalization_frequency)?;
    let normalization_frequency = channel
        .normalization_frequency()
        .ok_or(FilterError::NoNormalizationFrequency)?;

    let units_in = get_unit_object(channel.units_in()?)?;
    let units_out = get_unit_object(channel.units_out()?)?;

    let mut response = Response::new(InstrumentSensitivity {
        value: total_sensitivity,
        frequency: normalization_frequency,
        input_units: units_in.abbreviation.to_string(),
        output_units: units_out.abbreviation.to_string(),
        input_units_description: units_in.name.to_string(),
        output_units_description: units_out.name.to_string(),
    });

    for (index, filter) in channel.filters_list().iter().enumerate() {
        let stage_number = index + 1;
        let stage = match filter.as_coefficient() {
            Some(coefficient) if !is_digital_count(coefficient.units_out()) => {
                tracing::debug!("converting CoefficientFilter {} to PZ", coefficient.name());
                PoleZeroFilter::from_coefficient(coefficient).to_response_stage(
                    stage_number,
                    normalization_frequency,
                    sample_rate,
                )
            }
            _ => filter.to_response_stage(stage_number, normalization_frequency, sample_rate),
        };
        response.push_stage(stage);
    }

    Ok(response)
}

impl ChannelResponse {
    /// Export using the channel's own normalization frequency.
    pub fn to_response(&mut self, sample_rate: Hertz) -> FilterResult<Response> {
        export_response(self, None, sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::FilterBase;
    use crate::coefficient::CoefficientFilter;
    use crate::filter::Filter;
    use crate::time_delay::TimeDelayFilter;
    use lib_types::response::StageKind;
    use lib_types::units::Seconds;
    use num_complex::Complex64;
    use std::f64::consts::PI;
    use std::sync::Arc;

    fn coil() -> Arc<Filter> {
        let wc = 2.0 * PI * 5.0;
        Arc::new(
            PoleZeroFilter::new(FilterBase::new("coil", "nT", "mV"))
                .with_poles(vec![Complex64::new(-wc, 0.0)])
                .with_normalization_factor(wc)
                .into(),
        )
    }

    fn coefficient(name: &str, units_in: &str, units_out: &str, gain: f64) -> Arc<Filter> {
        Arc::new(
            CoefficientFilter::new(
                FilterBase::new(name, units_in, units_out)
                    .with_gain(gain)
                    .with_comments("gain stage"),
            )
            .into(),
        )
    }

    #[test]
    fn test_coefficient_with_analog_output_promoted() {
        let mut cr = ChannelResponse::with_filters(vec![coefficient("preamp", "mV", "V", 0.001)]);
        let response = export_response(&mut cr, Some(Hertz(1.0)), Hertz(8.0)).unwrap();

        let stage = &response.response_stages[0];
        assert_eq!(stage.stage_sequence_number, 1);
        assert_eq!(stage.name, "preamp");
        assert_eq!(stage.stage_gain, 0.001);
        assert_eq!(stage.input_units, "mV");
        assert_eq!(stage.output_units, "V");
        assert_eq!(stage.description.as_deref(), Some("gain stage"));
        match &stage.kind {
            StageKind::PolesZeros { poles, zeros, normalization_factor, .. } => {
                assert!(poles.is_empty() && zeros.is_empty());
                assert_eq!(*normalization_factor, 1.0);
            }
            other => panic!("expected pole-zero stage, got {:?}", other),
        }
    }

    #[test]
    fn test_coefficient_with_count_output_passes_through() {
        let mut cr = ChannelResponse::with_filters(vec![coefficient("adc", "V", "count", 1e6)]);
        let response = export_response(&mut cr, Some(Hertz(1.0)), DEFAULT_EXPORT_SAMPLE_RATE).unwrap();

        let stage = &response.response_stages[0];
        assert_eq!(stage.stage_gain, 1e6);
        assert!(matches!(stage.kind, StageKind::Coefficients { .. }));
    }

    #[test]
    fn test_full_chain_export() {
        let lag: Arc<Filter> =
            Arc::new(TimeDelayFilter::new(FilterBase::new("lag", "count", "count"), Seconds(0.2)).into());
        let mut cr = ChannelResponse::with_filters(vec![
            coil(),
            coefficient("preamp", "mV", "V", 10.0),
            coefficient("adc", "V", "count", 100.0),
            lag,
        ]);
        cr.check_consistency_of_units().unwrap();

        let response = export_response(&mut cr, Some(Hertz(5.0)), Hertz(256.0)).unwrap();

        let header = &response.instrument_sensitivity;
        assert_eq!(header.input_units, "nT");
        assert_eq!(header.output_units, "count");
        assert_eq!(header.input_units_description, "nanoTesla");
        assert_eq!(header.frequency, Hertz(5.0));
        assert!((header.value - (1000.0 / 2f64.sqrt() * 1000.0).round() / 1000.0).abs() < 1e-9);

        assert_eq!(response.len(), 4);
        for (i, stage) in response.response_stages.iter().enumerate() {
            assert_eq!(stage.stage_sequence_number, i + 1);
            assert_eq!(stage.stage_gain_frequency, Hertz(5.0));
        }
        let labels: Vec<_> = response.response_stages.iter().map(|s| s.kind.label()).collect();
        assert_eq!(labels, vec!["PolesZeros", "PolesZeros", "Coefficients", "Coefficients"]);
        assert_eq!(
            response.response_stages[1].decimation.unwrap().input_sample_rate,
            Hertz(256.0)
        );
    }

    #[test]
    fn test_to_response_uses_derived_normalization() {
        let mut cr = ChannelResponse::with_filters(vec![coefficient("adc", "V", "count", 2.0)]);
        let response = cr.to_response(DEFAULT_EXPORT_SAMPLE_RATE).unwrap();

        // flat chain: pass band is the whole default grid
        let expected = ((1e-4 + 1e4) / 2.0 * 1000.0_f64).round() / 1000.0;
        assert!((response.instrument_sensitivity.frequency.0 - expected).abs() < 1e-6);
        assert_eq!(response.instrument_sensitivity.value, 2.0);
    }

    #[test]
    fn test_unknown_unit_rejected() {
        let mut cr = ChannelResponse::with_filters(vec![coefficient("adc", "furlong", "count", 2.0)]);
        let err = export_response(&mut cr, Some(Hertz(1.0)), DEFAULT_EXPORT_SAMPLE_RATE).unwrap_err();
        assert!(matches!(err, FilterError::UnknownUnit(_)));
    }

    #[test]
    fn test_empty_chain_cannot_export() {
        let mut cr = ChannelResponse::new();
        let err = export_response(&mut cr, Some(Hertz(1.0)), DEFAULT_EXPORT_SAMPLE_RATE).unwrap_err();
        assert!(matches!(err, FilterError::EmptyChain));
    }
}
