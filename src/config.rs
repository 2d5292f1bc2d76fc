use crate::filter::UnrecognizedPolicy;
use crate::params::default_reserved_params;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub filters: FilterRules,
    pub events: EventRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    /// Whether unrecognized filter tokens are dropped or rejected.
    pub unrecognized: UnrecognizedPolicy,
    pub reserved_params: Vec<String>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            unrecognized: UnrecognizedPolicy::Ignore,
            reserved_params: default_reserved_params(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRules {
    pub enabled: bool,
    pub exchange: String,
}

impl Default for EventRules {
    fn default() -> Self {
        Self {
            enabled: false,
            exchange: "monrestapi".to_string(),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    if let Some(path) = path {
        load_config_from_path(path)
    } else {
        Ok(default_config().clone())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let path_display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_display.clone(),
        source,
    })?;

    toml::from_str::<ServiceConfig>(&raw).map_err(|source| ConfigError::Parse {
        path: path_display,
        source,
    })
}

pub fn default_config() -> &'static ServiceConfig {
    static DEFAULT_CONFIG: LazyLock<ServiceConfig> = LazyLock::new(ServiceConfig::default);
    &DEFAULT_CONFIG
}
