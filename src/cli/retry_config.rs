//! Retry configuration for release service operations.
//!
//! Defaults can be tuned per invocation through environment variables,
//! read from the [`EnvConfig`](crate::EnvConfig) snapshot.

use std::time::Duration;

use crate::EnvConfig;

/// Retry policy applied to asset uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,

    /// Wait after the first failed attempt; doubled after each further failure
    pub initial_delay: Duration,

    /// Upper bound for a single wait
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Environment variable overriding `max_attempts`
    pub const ATTEMPTS_VAR: &'static str = "KODEGEN_RELEASE_RETRY_ATTEMPTS";

    /// Environment variable overriding `initial_delay`, in milliseconds
    pub const DELAY_VAR: &'static str = "KODEGEN_RELEASE_RETRY_DELAY_MS";

    /// Hard ceiling for `max_attempts`
    pub const MAX_ATTEMPTS: u32 = 20;

    /// Parse a number from the environment, falling back to `default`
    /// and clamping to `max`.
    fn parse_env(env: &EnvConfig, var_name: &str, default: u64, max: u64) -> u64 {
        env.get(var_name)
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(|v| v.min(max))
            .unwrap_or(default)
    }

    /// Create config from environment variables with fallback to defaults
    pub fn from_env(env: &EnvConfig) -> Self {
        let defaults = Self::default();
        let max_attempts = Self::parse_env(
            env,
            Self::ATTEMPTS_VAR,
            u64::from(defaults.max_attempts),
            u64::from(Self::MAX_ATTEMPTS),
        ) as u32;
        let initial_delay_ms = Self::parse_env(
            env,
            Self::DELAY_VAR,
            defaults.initial_delay.as_millis() as u64,
            defaults.max_delay.as_millis() as u64,
        );

        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: defaults.max_delay,
        }
    }
}
