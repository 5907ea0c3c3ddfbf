use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::ConfigError;

/// Configuration values the manager reads on every use.
///
/// `confirmation_poll` should be well below `tx_timeout`, otherwise a pending
/// transaction is only looked at once or twice before it times out.
pub trait Config: Send + Sync + 'static {
    /// Budget for both submission retries and confirmation.
    fn tx_timeout(&self) -> Duration;
    /// Interval between confirmation polls.
    fn confirmation_poll(&self) -> Duration;
}

/// File-backed configuration.
///
/// ```toml
/// tx_timeout = "10s"
/// confirmation_poll = "1s"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TxmConfig {
    #[serde(with = "crate::utils::serde_helpers::duration", default = "default_tx_timeout")]
    pub tx_timeout: Duration,
    #[serde(with = "crate::utils::serde_helpers::duration", default = "default_confirmation_poll")]
    pub confirmation_poll: Duration,
}

fn default_tx_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_confirmation_poll() -> Duration {
    Duration::from_secs(1)
}

impl Default for TxmConfig {
    fn default() -> Self {
        Self { tx_timeout: default_tx_timeout(), confirmation_poll: default_confirmation_poll() }
    }
}

impl TxmConfig {
    pub fn new(tx_timeout: Duration, confirmation_poll: Duration) -> Self {
        Self { tx_timeout, confirmation_poll }
    }

    /// Load config from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: TxmConfig = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_durations(self.tx_timeout, self.confirmation_poll)
    }
}

impl Config for TxmConfig {
    fn tx_timeout(&self) -> Duration {
        self.tx_timeout
    }

    fn confirmation_poll(&self) -> Duration {
        self.confirmation_poll
    }
}

pub(crate) fn validate_durations(tx_timeout: Duration, confirmation_poll: Duration) -> Result<(), ConfigError> {
    if tx_timeout.is_zero() {
        return Err(ConfigError::Invalid("tx_timeout must be greater than zero".into()));
    }
    if confirmation_poll.is_zero() {
        return Err(ConfigError::Invalid("confirmation_poll must be greater than zero".into()));
    }
    Ok(())
}
