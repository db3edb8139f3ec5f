//! Prediction command

use serde_json::Value as JsonValue;
use tauri::State;

use crate::state::AppState;
use crate::Result;

/// Run the prediction script on `payload`
///
/// Failures reject the front end's promise with the error message.
#[tauri::command]
pub async fn predict(state: State<'_, AppState>, payload: JsonValue) -> Result<JsonValue> {
    let gateway = state.gateway.clone();
    gateway.predict(payload).await
}
