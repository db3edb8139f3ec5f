//! Bridge configuration
//!
//! Reads the optional `predict-shell.toml` from the app config directory.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;

/// Config file name inside the app config directory
pub const CONFIG_FILE_NAME: &str = "predict-shell.toml";

/// Script run by the gateway, relative to the shell's resource directory
pub const DEFAULT_SCRIPT: &str = "scripts/predict_stub.py";

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Interpreter program or path (defaults to `python`/`python3` by OS)
    #[serde(default)]
    pub interpreter: Option<String>,

    /// Script path, absolute or relative to the working directory
    #[serde(default)]
    pub script: Option<String>,

    /// Upper bound on live script processes; unset means unbounded.
    /// Zero fails to parse.
    #[serde(default)]
    pub max_concurrent: Option<NonZeroUsize>,
}

impl BridgeConfig {
    pub fn script(&self) -> &str {
        self.script.as_deref().unwrap_or(DEFAULT_SCRIPT)
    }
}

/// Read configuration from `config_dir`, falling back to defaults
pub fn read_config(config_dir: &Path) -> Result<BridgeConfig> {
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!("No bridge config at {:?}, using defaults", config_path);
        return Ok(BridgeConfig::default());
    }

    read_config_from_path(&config_path)
}

/// Read configuration from a specific path
pub fn read_config_from_path(path: &Path) -> Result<BridgeConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

    let config: BridgeConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    tracing::debug!("Loaded bridge config: {:?}", config);

    Ok(config)
}
