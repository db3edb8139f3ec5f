//! Tauri commands module
//!
//! Exposes Tauri commands for the frontend to invoke.

pub mod predict;
