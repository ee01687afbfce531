//! # lib-filters
//!
//! Frequency-domain filter engine for magnetotelluric channel responses.
//!
//! A channel is a cascade of stages, each mapping one physical unit to the
//! next until the signal reaches digitizer counts:
//!
//! - **Stages**: pole-zero, coefficient (gain), time delay, FIR and
//!   frequency/amplitude/phase tables
//! - **Channel response**: composite transfer function, pass band,
//!   normalization frequency and instrument sensitivity
//! - **Export**: StationXML-style sensitivity header and ordered stages

pub mod error;
pub mod base;
pub mod pass_band;
pub mod interpolation;
pub mod pole_zero;
pub mod coefficient;
pub mod time_delay;
pub mod fir;
pub mod frequency_response_table;
pub mod filter;
pub mod channel_response;
pub mod export;

pub use error::{FilterError, FilterResult};
pub use base::{FilterBase, FilterStage, FilterType, Interpolation, ResponseOptions};
pub use pass_band::{PassBand, PassBandOptions};
pub use pole_zero::PoleZeroFilter;
pub use coefficient::CoefficientFilter;
pub use time_delay::TimeDelayFilter;
pub use fir::FirFilter;
pub use frequency_response_table::FrequencyResponseTableFilter;
pub use filter::Filter;
pub use channel_response::{ChannelResponse, ChannelResponseConfig, ComplexResponseOptions};
pub use export::{export_response, DEFAULT_EXPORT_SAMPLE_RATE};
