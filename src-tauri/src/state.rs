//! Application state management

use std::sync::Arc;
use tauri::{AppHandle, Manager};

use crate::config;
use crate::gateway::PredictGateway;
use crate::Result;

/// Global application state
pub struct AppState {
    /// Gateway serving `predict` requests from the front end
    pub gateway: Arc<PredictGateway>,
}

impl AppState {
    /// Create a new application state
    pub fn new(app_handle: &AppHandle) -> Result<Self> {
        // Scripts ship as bundled resources, so the resource directory is
        // the shell's own directory
        let resource_dir = app_handle
            .path()
            .resource_dir()
            .map_err(|e| crate::Error::Tauri(e.to_string()))?;

        let config_dir = app_handle
            .path()
            .app_config_dir()
            .map_err(|e| crate::Error::Tauri(e.to_string()))?;

        let bridge_config = config::read_config(&config_dir)?;
        let gateway = Arc::new(PredictGateway::new(&resource_dir, &bridge_config)?);

        Ok(Self { gateway })
    }
}
