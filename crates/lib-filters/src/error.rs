//! Error types for filter evaluation.

use lib_types::units::UnknownUnit;
use thiserror::Error;

/// Errors that can occur while building or evaluating filter chains.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A frequency grid value is not a positive finite number.
    #[error("Invalid frequency at index {index}: {value}")]
    InvalidFrequency { index: usize, value: f64 },

    /// Evaluation or pass band requested without a frequency grid.
    #[error("Frequencies are unset, must be input to evaluate the channel response")]
    FrequenciesUnset,

    /// Operation needs at least one filter in the chain.
    #[error("No filters in channel response")]
    EmptyChain,

    /// Sensitivity requested but no normalization frequency could be set or derived.
    #[error("No normalization frequency available")]
    NoNormalizationFrequency,

    /// Adjacent stages disagree on units.
    #[error("Unit consistency is incorrect, {expected} != {found} for filter {filter}")]
    UnitMismatch {
        filter: String,
        expected: String,
        found: String,
    },

    /// Filter parameters violate a stage invariant.
    #[error("Invalid filter '{name}': {message}")]
    InvalidFilter { name: String, message: String },

    /// Unit tag not known to the registry.
    #[error(transparent)]
    UnknownUnit(#[from] UnknownUnit),
}

impl FilterError {
    /// Create an invalid filter error.
    pub fn invalid_filter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;
