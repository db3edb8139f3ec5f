//! Predict Shell - a minimal desktop shell for script-backed predictions
//!
//! The front end gets a single `predict` command. Each call runs the bundled
//! prediction script as a subprocess, writes the request as JSON to its stdin
//! and returns the JSON document it prints.

pub mod bridge;
pub mod commands;
pub mod config;
pub mod gateway;

mod error;
mod state;
mod utils;

pub use error::{Error, Result};
pub use gateway::PredictGateway;
pub use state::AppState;

use tauri::Manager;

/// Initialize and run the Tauri application
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("predict_shell_lib=debug".parse().unwrap()),
        )
        .init();

    tracing::info!("Starting Predict Shell");

    tauri::Builder::default()
        .setup(|app| {
            let app_handle = app.handle().clone();

            // Initialize application state
            let state = AppState::new(&app_handle)?;
            app.manage(state);

            tracing::info!("Application state initialized");
            Ok(())
        })
        // The only capability exposed to the front end
        .invoke_handler(tauri::generate_handler![commands::predict::predict])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
