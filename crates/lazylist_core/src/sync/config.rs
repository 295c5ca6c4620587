//! Engine configuration: retry profiles and diagnostics sizing.
//!
//! # Responsibility
//! - Provide the two retry profiles used by engine operations.
//! - Load host-provided settings from JSON and reject invalid values.
//!
//! # Invariants
//! - `backoff_multiplier` is finite and `>= 1.0`.
//! - `log_capacity` is non-zero.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DEFAULT_LOG_CAPACITY: usize = 50;
const DEFAULT_USER_ID: &str = "local";

/// Bounded exponential backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    #[serde(rename = "initial_delay_ms", deserialize_with = "deserialize_millis")]
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Profile for add/update and delete.
    pub fn standard() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
        }
    }

    /// Profile for low-risk, frequent actions such as toggling completion.
    pub fn fast() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
        }
    }

    /// Delay slept after failed attempt `attempt` (zero-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self
            .backoff_multiplier
            .powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    /// Total number of attempts this profile allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidMultiplier {
                field,
                value: self.backoff_multiplier,
            });
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Forwarded to the persist collaborator on every call.
    pub user_id: String,
    pub standard_retry: RetryConfig,
    pub fast_retry: RetryConfig,
    /// Ring buffer size of the diagnostic sync log.
    pub log_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_USER_ID.to_string(),
            standard_retry: RetryConfig::standard(),
            fast_retry: RetryConfig::fast(),
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl SyncConfig {
    /// Parses settings from JSON; absent fields keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.standard_retry.validate("standard_retry")?;
        self.fast_retry.validate("fast_retry")?;
        if self.log_capacity == 0 {
            return Err(ConfigError::ZeroLogCapacity);
        }
        Ok(())
    }
}

/// Configuration parsing/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    InvalidMultiplier { field: &'static str, value: f64 },
    ZeroLogCapacity,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid sync config: {err}"),
            Self::InvalidMultiplier { field, value } => {
                write!(f, "{field}.backoff_multiplier must be finite and >= 1, got {value}")
            }
            Self::ZeroLogCapacity => write!(f, "log_capacity must be greater than zero"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let millis = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, RetryConfig, SyncConfig, DEFAULT_LOG_CAPACITY};
    use std::time::Duration;

    #[test]
    fn delay_table_doubles_per_attempt() {
        let config = RetryConfig::standard();
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(config.max_attempts(), 4);
    }

    #[test]
    fn fast_profile_is_shorter_than_standard() {
        let fast = RetryConfig::fast();
        let standard = RetryConfig::standard();
        assert!(fast.max_retries < standard.max_retries);
        assert!(fast.initial_delay < standard.initial_delay);
    }

    #[test]
    fn from_json_keeps_defaults_for_missing_fields() {
        let config = SyncConfig::from_json_str(
            r#"{"user_id":"u-7","fast_retry":{"max_retries":1,"initial_delay_ms":50,"backoff_multiplier":3.0}}"#,
        )
        .expect("config should parse");
        assert_eq!(config.user_id, "u-7");
        assert_eq!(config.fast_retry.max_retries, 1);
        assert_eq!(config.fast_retry.initial_delay, Duration::from_millis(50));
        assert_eq!(config.standard_retry, RetryConfig::standard());
        assert_eq!(config.log_capacity, DEFAULT_LOG_CAPACITY);
    }

    #[test]
    fn from_json_rejects_shrinking_multiplier_and_zero_capacity() {
        let err = SyncConfig::from_json_str(
            r#"{"standard_retry":{"max_retries":3,"initial_delay_ms":10,"backoff_multiplier":0.5}}"#,
        )
        .expect_err("multiplier below one must fail");
        assert!(matches!(err, ConfigError::InvalidMultiplier { .. }));

        let err = SyncConfig::from_json_str(r#"{"log_capacity":0}"#)
            .expect_err("zero capacity must fail");
        assert!(matches!(err, ConfigError::ZeroLogCapacity));
    }
}
