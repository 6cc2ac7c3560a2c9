//! Scenario configuration.
//!
//! A scenario is read from YAML into a [`LoadConfig`], then validated once
//! into an immutable [`LoadPlan`]. Every configuration error surfaces here,
//! before any worker starts.

use crate::check::Expectation;
use crate::domain::{Dimension, DimensionSet, Domain};
use crate::error::{AdprobeResult, ConfigError};
use crate::profile::ExecutionProfile;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default scenario name
pub const DEFAULT_NAME: &str = "adprobe";

/// Default grace period for in-flight iterations at the end of a run
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default scheduler tick
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Longest accepted run length, stage total or timeout (30 days)
pub const MAX_DURATION: Duration = Duration::from_secs(30 * 24 * 3600);

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

const fn default_drain_timeout() -> Duration {
    DEFAULT_DRAIN_TIMEOUT
}

const fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

const fn default_tick() -> Duration {
    DEFAULT_TICK
}

// =============================================================================
// Durations
// =============================================================================

/// Parse `500ms`, `30s`, `2m`, `1h`, compound `1m30s`, or bare seconds.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let s = input.trim();
    let invalid = |reason: &str| ConfigError::InvalidDuration {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if s.is_empty() {
        return Err(invalid("empty"));
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(invalid("expected a number"));
        }
        let value: u64 = rest[..digits]
            .parse()
            .map_err(|_| invalid("number out of range"))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.saturating_mul(60)),
            "h" => Duration::from_secs(value.saturating_mul(3600)),
            "" => return Err(invalid("missing unit after number")),
            _ => return Err(invalid("unknown unit, use ms, s, m or h")),
        };
        total = total
            .checked_add(part)
            .ok_or_else(|| invalid("duration out of range"))?;
        rest = &rest[unit_len..];
    }
    Ok(total)
}

/// Render a duration in the shortest unit that represents it exactly.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 1000 != 0 {
        return format!("{}ms", millis);
    }
    let secs = duration.as_secs();
    if secs != 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Serde adapter: durations as human-readable strings (or bare seconds)
pub mod duration_format {
    use super::{format_duration, parse_duration};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
        }
    }
}

// =============================================================================
// Raw configuration
// =============================================================================

/// One dimension as written in a scenario file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionConfig {
    /// Query parameter name
    pub name: String,
    /// Value domain
    pub domain: Domain,
}

impl DimensionConfig {
    /// Create a dimension entry
    pub fn new(name: &str, domain: Domain) -> Self {
        Self {
            name: name.to_string(),
            domain,
        }
    }
}

/// Scenario as read from YAML, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    /// Scenario name used in reports
    #[serde(default = "default_name")]
    pub name: String,
    /// Endpoint URL without query string
    pub base_url: String,
    /// Filter dimensions in canonical order
    pub dimensions: Vec<DimensionConfig>,
    /// Also send the unfiltered base URL
    #[serde(default)]
    pub include_bare_url: bool,
    /// Virtual-user profile
    pub profile: ExecutionProfile,
    /// Response expectation
    #[serde(default)]
    pub expect: Expectation,
    /// Pause between iterations of one worker
    #[serde(default, with = "duration_format")]
    pub think_time: Duration,
    /// Grace period for in-flight iterations when the schedule ends
    #[serde(default = "default_drain_timeout", with = "duration_format")]
    pub drain_timeout: Duration,
    /// Per-request timeout
    #[serde(default = "default_request_timeout", with = "duration_format")]
    pub request_timeout: Duration,
    /// How often the scheduler re-evaluates the profile
    #[serde(default = "default_tick", with = "duration_format")]
    pub tick: Duration,
    /// Seed for reproducible draws
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl LoadConfig {
    /// Create a config with default timing and expectation
    pub fn new(base_url: &str, dimensions: Vec<DimensionConfig>, profile: ExecutionProfile) -> Self {
        Self {
            name: default_name(),
            base_url: base_url.to_string(),
            dimensions,
            include_bare_url: false,
            profile,
            expect: Expectation::default(),
            think_time: Duration::ZERO,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            tick: DEFAULT_TICK,
            seed: None,
        }
    }

    /// The ad banner filter scenario: 200 users for 30 seconds, expecting 200
    pub fn ad_filters(base_url: &str) -> Self {
        let dimensions = DimensionSet::ad_filters()
            .iter()
            .map(|d| DimensionConfig::new(d.name(), d.domain().clone()))
            .collect();
        let mut config = Self::new(
            base_url,
            dimensions,
            ExecutionProfile::flat(200, Duration::from_secs(30)),
        );
        config.name = "ad-filters".to_string();
        config
    }

    /// Set the scenario name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Replace the execution profile
    pub fn with_profile(mut self, profile: ExecutionProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Enable or disable the bare URL variant
    pub fn with_bare_url(mut self, include: bool) -> Self {
        self.include_bare_url = include;
        self
    }

    /// Set the expectation
    pub fn with_expect(mut self, expect: Expectation) -> Self {
        self.expect = expect;
        self
    }

    /// Set the drain timeout
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Set the scheduler tick
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Set the think time
    pub fn with_think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }

    /// Set the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parse from YAML
    pub fn from_yaml(yaml: &str) -> AdprobeResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> AdprobeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Load from file
    pub fn load(path: &Path) -> AdprobeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Save to file
    pub fn save(&self, path: &Path) -> AdprobeResult<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Validate into an immutable plan
    pub fn validate(&self) -> Result<LoadPlan, ConfigError> {
        validate_base_url(&self.base_url)?;

        let dimensions = self
            .dimensions
            .iter()
            .map(|d| Dimension::new(d.name.clone(), d.domain.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let dimensions = DimensionSet::new(dimensions)?;

        self.profile.validate()?;
        self.expect.validate()?;

        for (field, value) in [
            ("think_time", self.think_time),
            ("drain_timeout", self.drain_timeout),
            ("request_timeout", self.request_timeout),
            ("tick", self.tick),
        ] {
            check_max_duration(field, value)?;
        }

        if self.tick.is_zero() {
            return Err(ConfigError::ZeroInterval { field: "tick" });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroInterval {
                field: "request_timeout",
            });
        }

        Ok(LoadPlan {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            dimensions,
            include_bare_url: self.include_bare_url,
            profile: self.profile.clone(),
            expect: self.expect.clone(),
            think_time: self.think_time,
            drain_timeout: self.drain_timeout,
            request_timeout: self.request_timeout,
            tick: self.tick,
            seed: self.seed,
        })
    }
}

pub(crate) fn check_max_duration(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value > MAX_DURATION {
        return Err(ConfigError::DurationTooLarge {
            field,
            max_secs: MAX_DURATION.as_secs(),
        });
    }
    Ok(())
}

fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    let url = url::Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    if url.query().is_some() {
        return Err(invalid("must not contain a query string"));
    }
    if url.fragment().is_some() {
        return Err(invalid("must not contain a fragment"));
    }
    Ok(())
}

// =============================================================================
// Validated plan
// =============================================================================

/// Validated, read-only run configuration shared by every worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    name: String,
    base_url: String,
    dimensions: DimensionSet,
    include_bare_url: bool,
    profile: ExecutionProfile,
    expect: Expectation,
    think_time: Duration,
    drain_timeout: Duration,
    request_timeout: Duration,
    tick: Duration,
    seed: Option<u64>,
}

impl LoadPlan {
    /// Scenario name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoint URL without query string
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Dimensions in canonical order
    pub fn dimensions(&self) -> &DimensionSet {
        &self.dimensions
    }

    /// Whether the bare URL is part of every variant set
    pub fn include_bare_url(&self) -> bool {
        self.include_bare_url
    }

    /// Virtual-user profile
    pub fn profile(&self) -> &ExecutionProfile {
        &self.profile
    }

    /// Response expectation
    pub fn expect(&self) -> &Expectation {
        &self.expect
    }

    /// Pause between iterations
    pub fn think_time(&self) -> Duration {
        self.think_time
    }

    /// Grace period for in-flight iterations
    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Scheduler tick
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Seed for reproducible draws
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}
