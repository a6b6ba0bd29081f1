//! Mock transport configuration
//!
//! The only tunable is the default scheduler delay: how long [`wait`] and the
//! simulated timeouts defer before firing. It can come from code, from the
//! `MOCKLINE_DELAY_MS` environment variable, or from a TOML snippet.
//!
//! [`wait`]: crate::MockTransport::wait

use crate::error::{MockError, MockResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Default scheduler delay in milliseconds
pub const DEFAULT_DELAY_MS: u64 = 100;

/// Largest accepted scheduler delay in milliseconds
pub const MAX_DELAY_MS: u64 = 60_000;

/// Environment variable overriding the default delay
pub const DELAY_ENV_VAR: &str = "MOCKLINE_DELAY_MS";

/// Mock transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MockConfig {
    /// Default scheduler delay in milliseconds
    pub delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY_MS,
        }
    }
}

impl MockConfig {
    /// Configuration with the given delay, capped at [`MAX_DELAY_MS`]
    pub fn with_delay(delay: Duration) -> Self {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        if delay_ms > MAX_DELAY_MS {
            warn!(delay_ms, max = MAX_DELAY_MS, "mock delay capped");
        }
        Self {
            delay_ms: delay_ms.min(MAX_DELAY_MS),
        }
    }

    /// Default delay as a duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Defaults overridden by `MOCKLINE_DELAY_MS` when set
    pub fn from_env() -> MockResult<Self> {
        match std::env::var(DELAY_ENV_VAR) {
            Ok(raw) => Self::from_delay_str(&raw),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(e) => Err(MockError::config(format!("{DELAY_ENV_VAR}: {e}"))),
        }
    }

    /// Parse a TOML document such as `delay_ms = 25`
    pub fn from_toml_str(source: &str) -> MockResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| MockError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the delay is in range
    pub fn validate(&self) -> MockResult<()> {
        if self.delay_ms > MAX_DELAY_MS {
            return Err(MockError::config(format!(
                "delay_ms {} exceeds the maximum of {MAX_DELAY_MS}",
                self.delay_ms
            )));
        }
        Ok(())
    }

    fn from_delay_str(raw: &str) -> MockResult<Self> {
        let delay_ms = raw
            .trim()
            .parse::<u64>()
            .map_err(|e| MockError::config(format!("{DELAY_ENV_VAR}={raw:?}: {e}")))?;
        let config = Self { delay_ms };
        config.validate()?;
        Ok(config)
    }
}
