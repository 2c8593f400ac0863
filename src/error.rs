use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to whoever drives the pipeline. Each variant displays as a
/// single user-visible message.
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("No valid data found: {reason}")]
    NoValidData { reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl PulseError {
    pub fn no_valid_data(reason: impl Into<String>) -> Self {
        Self::NoValidData {
            reason: reason.into(),
        }
    }

    pub fn is_no_valid_data(&self) -> bool {
        matches!(self, Self::NoValidData { .. })
    }
}
