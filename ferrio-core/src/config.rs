use crate::error::{FerrioError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection and policy settings for one blob container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Opaque credential/endpoint descriptor understood by the backend.
    pub connection_string: String,
    /// Name of the container under the account the connection string
    /// describes.
    pub container: String,
    /// Lifetime of a generated read grant.
    #[serde(default = "default_sas_ttl_secs")]
    pub sas_ttl_secs: u64,
    /// Cadence of the background health poll.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_sas_ttl_secs() -> u64 {
    300
}

fn default_poll_interval_secs() -> u64 {
    60
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.container.trim().is_empty() {
            return Err(FerrioError::Config(
                "container name cannot be empty".to_string(),
            ));
        }
        if self.sas_ttl_secs == 0 {
            return Err(FerrioError::Config(
                "sas_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(FerrioError::Config(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sas_ttl(&self) -> Duration {
        Duration::from_secs(self.sas_ttl_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
