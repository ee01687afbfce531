//! Error types for survey metadata loading.

use lib_filters::FilterError;
use thiserror::Error;

/// Errors that can occur while loading filters and calibration tables.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// I/O error reading the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed TOML document.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Filter list input is not a sequence of filter records.
    #[error("Invalid filter list: {0}")]
    InvalidFilterList(String),

    /// Unsupported file extension for a survey file.
    #[error("Unsupported survey file format: {0}")]
    UnsupportedFormat(String),

    /// Channel references a filter the registry does not hold.
    #[error("Channel '{channel}' references unknown filter '{filter}'")]
    MissingFilter { channel: String, filter: String },

    /// Channel name not present in the survey.
    #[error("Unknown channel '{0}'")]
    MissingChannel(String),

    /// Two filters share a name.
    #[error("Duplicate filter name '{0}'")]
    DuplicateFilter(String),

    /// Syntax error in a calibration table.
    #[error("Syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Nom parsing error (internal).
    #[error("Parse error: {0}")]
    Nom(String),

    /// Filter construction or evaluation failure.
    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl MetadataError {
    /// Create a syntax error at a specific line.
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }
}

impl<'a> From<nom::Err<nom::error::Error<&'a str>>> for MetadataError {
    fn from(err: nom::Err<nom::error::Error<&'a str>>) -> Self {
        match err {
            nom::Err::Incomplete(_) => MetadataError::Nom("Incomplete input".to_string()),
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                let preview: String = e.input.chars().take(20).collect();
                MetadataError::Nom(format!("{:?} at '{}...'", e.code, preview))
            }
        }
    }
}

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;
