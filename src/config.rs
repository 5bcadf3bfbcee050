// Coordinator configuration: logging, estimator mode and the simulated backends, loaded from TOML

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

use crate::estimator::EstimateMode;
use crate::simulated::SimulationConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    // "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl LoggingConfig {
    // Install the global tracing subscriber. `RUST_LOG` wins over the configured level.
    pub fn init(&self) -> Result<(), ConfigError> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        let result = match self.format.as_str() {
            "json" => fmt().json().with_env_filter(filter).try_init(),
            _ => fmt().with_env_filter(filter).try_init(),
        };
        result.map_err(|e| ConfigError::Logging(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub mode: EstimateMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub logging: LoggingConfig,
    pub estimator: EstimatorConfig,
    pub simulation: SimulationConfig,
}

impl CoordinatorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: CoordinatorConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.level",
                reason: "cannot be empty".into(),
            });
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidValue {
                field: "logging.format",
                reason: format!("expected \"pretty\" or \"json\", got {:?}", self.logging.format),
            });
        }

        self.simulation.validate()
    }
}
