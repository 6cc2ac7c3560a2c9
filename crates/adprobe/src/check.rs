//! Response expectations.
//!
//! [`ResultChecker`] is the seam between the iteration runner and whatever
//! "correct" means for a deployment. [`Expectation`] is the configurable
//! implementation read from scenario files.

use crate::error::ConfigError;
use crate::transport::HttpResponse;
use reqwest::header::HeaderName;
use serde::{Deserialize, Serialize};

/// Decides whether a response meets expectations
pub trait ResultChecker: Send + Sync + std::fmt::Debug {
    /// True when the response is acceptable
    fn is_expected_status(&self, response: &HttpResponse) -> bool;

    /// Short description for reports, e.g. `status == 200`
    fn description(&self) -> String;
}

/// Configurable expectation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expectation {
    /// Exact status code
    Status {
        /// Expected status code
        expected: u16,
    },
    /// Status code within an inclusive range
    StatusRange {
        /// Lowest accepted code
        min: u16,
        /// Highest accepted code
        max: u16,
    },
    /// Header equals a value (name is case-insensitive)
    Header {
        /// Header name
        name: String,
        /// Expected value
        expected: String,
    },
}

impl Default for Expectation {
    fn default() -> Self {
        Self::status(200)
    }
}

impl Expectation {
    /// Exact status expectation
    pub fn status(expected: u16) -> Self {
        Self::Status { expected }
    }

    /// Inclusive status range expectation
    pub fn status_range(min: u16, max: u16) -> Self {
        Self::StatusRange { min, max }
    }

    /// Header value expectation
    pub fn header(name: &str, expected: &str) -> Self {
        Self::Header {
            name: name.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Reject expectations that can never match
    pub fn validate(&self) -> Result<(), ConfigError> {
        let check_code = |code: u16| {
            if (100..=599).contains(&code) {
                Ok(())
            } else {
                Err(ConfigError::InvalidStatus { code })
            }
        };
        match self {
            Self::Status { expected } => check_code(*expected),
            Self::StatusRange { min, max } => {
                check_code(*min)?;
                check_code(*max)?;
                if min > max {
                    return Err(ConfigError::EmptyStatusRange {
                        min: *min,
                        max: *max,
                    });
                }
                Ok(())
            }
            Self::Header { name, .. } => HeaderName::from_bytes(name.as_bytes())
                .map(|_| ())
                .map_err(|_| ConfigError::InvalidHeaderName { name: name.clone() }),
        }
    }
}

impl ResultChecker for Expectation {
    fn is_expected_status(&self, response: &HttpResponse) -> bool {
        match self {
            Self::Status { expected } => response.status == *expected,
            Self::StatusRange { min, max } => (*min..=*max).contains(&response.status),
            Self::Header { name, expected } => response
                .headers
                .get(name.as_str())
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == expected),
        }
    }

    fn description(&self) -> String {
        match self {
            Self::Status { expected } => format!("status == {}", expected),
            Self::StatusRange { min, max } => format!("status in {}..={}", min, max),
            Self::Header { name, expected } => format!("{} == {}", name, expected),
        }
    }
}
