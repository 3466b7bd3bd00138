//! Retry stage configuration.
//!
//! Built through [`RetryConfig::builder`] with a validated `build()`. All
//! options have defaults; the retry predicate defaults to the
//! network-failure check and can be overridden for callers that want to
//! retry on specific remote errors too.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use wireline_core::QueryError;

use crate::constants::{
    DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY, MAX_MAX_ATTEMPTS,
    MIN_MAX_ATTEMPTS,
};

/// Errors produced by configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid retry configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }
}

/// Decides whether a failed result is eligible for re-submission.
pub type RetryPredicate = Arc<dyn Fn(&QueryError) -> bool + Send + Sync>;

/// Configuration for the retry stage.
///
/// Durations (de)serialize as integer milliseconds so the config can be
/// embedded in application settings files. The predicate is not
/// serializable; deserialized configs use the default network-failure
/// check.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Starting backoff delay.
    #[serde(with = "duration_millis", rename = "initial_delay_ms")]
    initial_delay: Duration,
    /// Upper bound for backoff delay growth.
    #[serde(with = "duration_millis", rename = "max_delay_ms")]
    max_delay: Duration,
    /// Whether the jitter multiplier is applied to the delay.
    random_delay: bool,
    /// Total number of attempts, including the first.
    max_attempts: u32,
    /// Overriding retry-eligibility predicate; `None` means the default
    /// network-failure check.
    #[serde(skip)]
    retry_if: Option<RetryPredicate>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            random_delay: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_if: None,
        }
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("random_delay", &self.random_delay)
            .field("max_attempts", &self.max_attempts)
            .field("retry_if", &self.retry_if.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}

impl RetryConfig {
    /// Create a configuration builder.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn random_delay(&self) -> bool {
        self.random_delay
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether a failed result with this error is eligible for retry.
    pub fn should_retry(&self, error: &QueryError) -> bool {
        match &self.retry_if {
            Some(predicate) => predicate(error),
            None => error.is_network_failure(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_MAX_ATTEMPTS..=MAX_MAX_ATTEMPTS).contains(&self.max_attempts) {
            return Err(ConfigError::invalid(format!(
                "max_attempts must be between {} and {}, got {}",
                MIN_MAX_ATTEMPTS, MAX_MAX_ATTEMPTS, self.max_attempts
            )));
        }
        if self.initial_delay.is_zero() {
            return Err(ConfigError::invalid("initial_delay must be greater than zero"));
        }
        if self.max_delay < self.initial_delay {
            return Err(ConfigError::invalid(format!(
                "max_delay ({:?}) must be at least initial_delay ({:?})",
                self.max_delay, self.initial_delay
            )));
        }
        Ok(())
    }
}

/// Builder for [`RetryConfig`] with a fluent API.
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    /// Starting backoff delay. Default 1000 ms.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.config.initial_delay = delay;
        self
    }

    /// Upper bound for backoff delay growth. Default 15000 ms.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    /// Enable or disable the jitter multiplier. Default enabled.
    pub fn random_delay(mut self, enabled: bool) -> Self {
        self.config.random_delay = enabled;
        self
    }

    /// Total number of attempts, including the first. Default 2.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Override the retry-eligibility predicate.
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&QueryError) -> bool + Send + Sync + 'static,
    {
        self.config.retry_if = Some(Arc::new(predicate));
        self
    }

    pub fn build(self) -> Result<RetryConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod duration_millis {
    //! Serialize a `Duration` as integer milliseconds.

    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
