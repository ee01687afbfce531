//! # lib-metadata
//!
//! Survey filter metadata for magnetotelluric channel responses.
//!
//! This crate provides:
//! - strict construction of filter lists from JSON/TOML values
//! - a survey-level filter registry shared by channels
//! - survey filter files (`.json`, `.toml`)
//! - FAP calibration table parsing, built on `nom`

pub mod error;
pub mod filters_list;
pub mod registry;
pub mod survey;
pub mod fap;

pub use error::{MetadataError, MetadataResult};
pub use filters_list::{build_filter, build_filters_list};
pub use registry::{ChannelFilters, FilterRegistry};
pub use survey::SurveyFilters;
pub use fap::{parse_fap_file, parse_fap_table, FapTable};
