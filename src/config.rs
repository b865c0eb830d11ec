use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs::File, io::BufReader, path::Path};
use thiserror::Error;

use crate::execution::{DebugGranularity, DebugTargets};
use crate::value_type::Backend;
use crate::{Error, InternalResult};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    Open(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Options of one interpreter run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub backend: Backend,

    /// Logs block results according to `debug_granularity` and
    /// `debug_targets`.
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub debug_granularity: DebugGranularity,

    #[serde(default)]
    pub debug_targets: DebugTargets,

    #[serde(default = "default_peek_rows")]
    pub peek_rows: usize,

    /// Raw values of the runtime parameters, parsed on use.
    #[serde(default = "HashMap::new")]
    pub runtime_parameters: HashMap<String, String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            debug: false,
            debug_granularity: DebugGranularity::default(),
            debug_targets: DebugTargets::default(),
            peek_rows: default_peek_rows(),
            runtime_parameters: HashMap::new(),
        }
    }
}

impl RunConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }

    pub fn with_runtime_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.runtime_parameters.insert(name.into(), value.into());
        self
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path).map_err(|e| Error::from(ConfigError::from(e)))?;
    let reader = BufReader::new(file);
    let config =
        serde_json::from_reader(reader).map_err(|e| Error::from(ConfigError::from(e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s).map_err(|e| Error::from(ConfigError::from(e)))?;
    Ok(config)
}

fn default_peek_rows() -> usize {
    10
}
