//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Library error
    #[error(transparent)]
    Adprobe(#[from] adprobe::AdprobeError),

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Runtime or logging setup failed
    #[error("Setup failed: {message}")]
    Setup {
        /// Error message
        message: String,
    },

    /// The run completed but some checks failed
    #[error("{failed} of {completed} completed iterations failed their check")]
    ChecksFailed {
        /// Failed iterations
        failed: u64,
        /// Completed iterations
        completed: u64,
    },
}

impl CliError {
    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a setup error
    #[must_use]
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup {
            message: message.into(),
        }
    }
}

impl From<adprobe::ConfigError> for CliError {
    fn from(err: adprobe::ConfigError) -> Self {
        Self::Adprobe(err.into())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::setup(format!("JSON rendering failed: {err}"))
    }
}
