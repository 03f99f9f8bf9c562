//! Error types for the Racefuel CLI
//!
//! Messages are user-facing and say what to check next.

use racefuel_common::gpx::GpxParseError;
use racefuel_common::CommonError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// Required file is missing
    #[error("File not found: '{0}'. Verify the file path exists and you have read permissions.")]
    FileNotFound(String),

    /// The file was read but holds no usable track
    #[error("Invalid GPX '{file}': {source}. The server would reject this upload with 422.")]
    InvalidGpx {
        file: String,
        #[source]
        source: GpxParseError,
    },

    /// A flag value is out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions.")]
    Io(#[from] std::io::Error),

    /// JSON rendering failed
    #[error("Failed to render JSON: {0}")]
    JsonRender(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] CommonError),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
