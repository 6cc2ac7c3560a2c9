//! Error types for adprobe.
//!
//! Configuration problems are detected once, when a [`LoadConfig`] is turned
//! into a [`LoadPlan`]. Nothing in this module is raised while a run is in
//! progress: request failures become outcomes, not errors.
//!
//! [`LoadConfig`]: crate::config::LoadConfig
//! [`LoadPlan`]: crate::config::LoadPlan

use thiserror::Error;

/// Result type for adprobe operations
pub type AdprobeResult<T> = Result<T, AdprobeError>;

/// Top-level errors surfaced to callers of the library
#[derive(Debug, Error)]
pub enum AdprobeError {
    /// Scenario failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scenario file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Scenario file is not valid YAML for a scenario
    #[error("Scenario parse error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Validation failures for a scenario.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No filter dimensions were configured
    #[error("at least one dimension is required")]
    NoDimensions,

    /// Too many dimensions to enumerate every combination
    #[error("{count} dimensions configured, at most {max} are supported")]
    TooManyDimensions {
        /// Number of configured dimensions
        count: usize,
        /// Supported maximum
        max: usize,
    },

    /// A dimension has an empty name
    #[error("dimension #{index} has a blank name")]
    BlankDimensionName {
        /// Position in the dimension list
        index: usize,
    },

    /// A dimension name appears twice
    #[error("dimension '{name}' is declared more than once")]
    DuplicateDimension {
        /// Dimension name
        name: String,
    },

    /// A choice dimension has no values
    #[error("dimension '{name}' has an empty value set")]
    EmptyChoices {
        /// Dimension name
        name: String,
    },

    /// A choice dimension contains a blank token
    #[error("dimension '{name}' contains a blank value")]
    BlankChoice {
        /// Dimension name
        name: String,
    },

    /// An integer range dimension has `low > high`
    #[error("dimension '{name}' has an empty range {low}..={high}")]
    EmptyRange {
        /// Dimension name
        name: String,
        /// Lower bound
        low: i64,
        /// Upper bound
        high: i64,
    },

    /// Base URL is not an absolute http(s) URL without query
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// URL as configured
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Flat profile with zero virtual users
    #[error("virtual user count must be at least 1")]
    ZeroVirtualUsers,

    /// Flat profile with zero duration
    #[error("run duration must be greater than zero")]
    ZeroDuration,

    /// Staged profile without stages
    #[error("staged profile has no stages")]
    NoStages,

    /// A stage does not move the schedule forward
    #[error("stage {index} has zero duration, stage boundaries must strictly increase")]
    NonMonotonicStage {
        /// Stage position (0-based)
        index: usize,
    },

    /// Staged profile never has a worker running
    #[error("staged profile never reaches a non-zero virtual user target")]
    NoActiveStage,

    /// A duration string could not be parsed
    #[error("invalid duration '{input}': {reason}")]
    InvalidDuration {
        /// Input text
        input: String,
        /// Parse failure
        reason: String,
    },

    /// A duration is longer than a run can schedule
    #[error("{field} exceeds the maximum of {max_secs}s")]
    DurationTooLarge {
        /// Name of the offending setting
        field: &'static str,
        /// Supported maximum, in seconds
        max_secs: u64,
    },

    /// An interval that must be positive is zero
    #[error("{field} must be greater than zero")]
    ZeroInterval {
        /// Name of the offending setting
        field: &'static str,
    },

    /// Expected status code outside 100..=599
    #[error("invalid HTTP status code {code}")]
    InvalidStatus {
        /// Configured code
        code: u16,
    },

    /// Status range with `min > max`
    #[error("status range {min}..={max} is empty")]
    EmptyStatusRange {
        /// Lower bound
        min: u16,
        /// Upper bound
        max: u16,
    },

    /// Header expectation with an invalid header name
    #[error("invalid header name '{name}'")]
    InvalidHeaderName {
        /// Configured name
        name: String,
    },

    /// A draw was built without any values
    #[error("a draw needs at least one dimension value")]
    EmptyDraw,
}
