use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use custody_events::BusConfig;

use crate::error::LedgerError;

/// Deployment-time configuration of a custody ledger.
///
/// Fixed at construction; the ledger never exposes a way to change it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Minimum time between a withdrawal request and its confirmation.
    pub confirmation_delay_secs: u64,
    /// Capacity of each event subscriber's channel.
    pub event_channel_capacity: usize,
    /// Number of published events retained for audit queries.
    pub event_history_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            confirmation_delay_secs: 24 * 60 * 60,
            event_channel_capacity: 1024,
            event_history_limit: 10_000,
        }
    }
}

impl LedgerConfig {
    /// Default configuration with a different cooling-off period.
    ///
    /// The delay is kept in whole seconds; a fractional part rounds up so
    /// the lock is never shorter than asked for.
    pub fn with_delay(delay: Duration) -> Self {
        let secs = delay
            .as_secs()
            .saturating_add(u64::from(delay.subsec_nanos() > 0));
        Self {
            confirmation_delay_secs: secs,
            ..Default::default()
        }
    }

    pub fn confirmation_delay(&self) -> Duration {
        Duration::from_secs(self.confirmation_delay_secs)
    }

    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, LedgerError> {
        let config: Self =
            toml::from_str(source).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.confirmation_delay_secs == 0 {
            return Err(LedgerError::Config(
                "confirmation delay must be greater than zero".into(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(LedgerError::Config(
                "event channel capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn bus_config(&self) -> BusConfig {
        BusConfig {
            channel_capacity: self.event_channel_capacity,
            history_limit: self.event_history_limit,
        }
    }
}
