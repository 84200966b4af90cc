use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Polling and delivery parameters for an attribute database instance
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Floor applied to subscriber polling intervals (milliseconds)
    /// Keeps a misbehaving client from busy-polling the hardware
    /// Default value is set via default_min_polling_interval_ms() function
    #[serde(default = "default_min_polling_interval_ms")]
    pub min_polling_interval_ms: u64,

    /// Capacity of subscription channels created through the database
    /// A full channel during a flush is treated as a hard delivery error
    #[serde(default = "default_subscriber_channel_capacity")]
    pub subscriber_channel_capacity: usize,

    /// Upper bound on waiting for the scheduler task to exit (milliseconds)
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            min_polling_interval_ms: default_min_polling_interval_ms(),
            subscriber_channel_capacity: default_subscriber_channel_capacity(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.subscriber_channel_capacity == 0 {
            return Err(Error::Config(ConfigError::Message(
                "subscriber_channel_capacity must be greater than 0".into(),
            )));
        }

        if self.shutdown_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "shutdown_timeout_ms must be at least 1ms".into(),
            )));
        }

        Ok(())
    }

    pub fn min_polling_interval(&self) -> Duration {
        Duration::from_millis(self.min_polling_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

fn default_min_polling_interval_ms() -> u64 {
    10
}

fn default_subscriber_channel_capacity() -> usize {
    128
}

fn default_shutdown_timeout_ms() -> u64 {
    1000
}
