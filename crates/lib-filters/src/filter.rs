//! The closed set of filter stages as one sum type.

use crate::base::{FilterBase, FilterStage, FilterType, ResponseOptions};
use crate::coefficient::CoefficientFilter;
use crate::error::FilterResult;
use crate::fir::FirFilter;
use crate::frequency_response_table::FrequencyResponseTableFilter;
use crate::pass_band::PassBand;
use crate::pole_zero::PoleZeroFilter;
use crate::time_delay::TimeDelayFilter;
use lib_types::response::ResponseStage;
use lib_types::units::{Hertz, Seconds};
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Any supported filter stage, tagged by `type` in metadata files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    PoleZero(PoleZeroFilter),
    Coefficient(CoefficientFilter),
    TimeDelay(TimeDelayFilter),
    Fir(FirFilter),
    FrequencyResponseTable(FrequencyResponseTableFilter),
}

impl Filter {
    fn stage(&self) -> &dyn FilterStage {
        match self {
            Self::PoleZero(f) => f,
            Self::Coefficient(f) => f,
            Self::TimeDelay(f) => f,
            Self::Fir(f) => f,
            Self::FrequencyResponseTable(f) => f,
        }
    }

    /// Field names accepted in metadata for a filter type, `type` included.
    pub fn fields(filter_type: FilterType) -> Vec<&'static str> {
        let specific = match filter_type {
            FilterType::PoleZero => PoleZeroFilter::FIELDS,
            FilterType::Coefficient => CoefficientFilter::FIELDS,
            FilterType::TimeDelay => TimeDelayFilter::FIELDS,
            FilterType::Fir => FirFilter::FIELDS,
            FilterType::FrequencyResponseTable => FrequencyResponseTableFilter::FIELDS,
        };
        std::iter::once("type")
            .chain(FilterBase::FIELDS.iter().copied())
            .chain(specific.iter().copied())
            .collect()
    }

    /// Delay in seconds for time-delay stages, zero otherwise.
    pub fn delay(&self) -> Seconds {
        match self {
            Self::TimeDelay(f) => f.delay,
            _ => Seconds::ZERO,
        }
    }

    pub fn is_time_delay(&self) -> bool {
        matches!(self, Self::TimeDelay(_))
    }

    pub fn as_coefficient(&self) -> Option<&CoefficientFilter> {
        match self {
            Self::Coefficient(f) => Some(f),
            _ => None,
        }
    }
}

impl FilterStage for Filter {
    fn base(&self) -> &FilterBase {
        self.stage().base()
    }

    fn filter_type(&self) -> FilterType {
        self.stage().filter_type()
    }

    fn complex_response(&self, frequencies: &[Hertz], options: &ResponseOptions) -> Array1<Complex64> {
        self.stage().complex_response(frequencies, options)
    }

    fn to_response_stage(
        &self,
        stage_number: usize,
        normalization_frequency: Hertz,
        sample_rate: Hertz,
    ) -> ResponseStage {
        self.stage()
            .to_response_stage(stage_number, normalization_frequency, sample_rate)
    }

    fn validate(&self) -> FilterResult<()> {
        self.stage().validate()
    }

    fn pass_band(&self, frequencies: &[Hertz], options: &ResponseOptions) -> Option<PassBand> {
        self.stage().pass_band(frequencies, options)
    }
}

impl From<PoleZeroFilter> for Filter {
    fn from(f: PoleZeroFilter) -> Self {
        Self::PoleZero(f)
    }
}

impl From<CoefficientFilter> for Filter {
    fn from(f: CoefficientFilter) -> Self {
        Self::Coefficient(f)
    }
}

impl From<TimeDelayFilter> for Filter {
    fn from(f: TimeDelayFilter) -> Self {
        Self::TimeDelay(f)
    }
}

impl From<FirFilter> for Filter {
    fn from(f: FirFilter) -> Self {
        Self::Fir(f)
    }
}

impl From<FrequencyResponseTableFilter> for Filter {
    fn from(f: FrequencyResponseTableFilter) -> Self {
        Self::FrequencyResponseTable(f)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.base();
        writeln!(f, "Filter Name: {}", base.name)?;
        writeln!(f, "Filter Type: {}", self.filter_type())?;
        writeln!(f, "Units In:    {}", base.units_in)?;
        writeln!(f, "Units Out:   {}", base.units_out)?;
        write!(f, "Gain:        {}", base.gain)?;
        if let Self::TimeDelay(td) = self {
            write!(f, "\nDelay:       {} s", td.delay.0)?;
        }
        if let Some(comments) = &base.comments {
            write!(f, "\nComments:    {}", comments)?;
        }
        Ok(())
    }
}
