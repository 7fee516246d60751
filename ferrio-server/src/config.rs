use ferrio_core::{FerrioError, Result, StorageConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    pub storage: StorageConfig,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path))
            .add_source(::config::Environment::with_prefix("FERRIO").separator("__"))
            .build()
            .map_err(|e| FerrioError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| FerrioError::Config(e.to_string()))?;

        config.storage.validate()?;
        Ok(config)
    }
}
