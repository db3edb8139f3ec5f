//! Error types for Predict Shell

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Interpreter or script could not be started
    #[error("Failed to launch script: {0}")]
    Launch(String),

    /// Script exited 0 but its stdout was not a JSON document
    #[error("Invalid JSON from script: {raw}\n{reason}")]
    MalformedOutput { raw: String, reason: String },

    /// Script exited non-zero and wrote diagnostics; the text is kept verbatim
    #[error("{0}")]
    ScriptFailed(String),

    /// Script exited non-zero without writing diagnostics
    #[error("Script exited with code {0}")]
    ExitCode(i32),

    /// Script was terminated without an exit code (signal on Unix)
    #[error("Script terminated without an exit code: {0}")]
    Terminated(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Tauri error: {0}")]
    Tauri(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

// Tauri rejects the invoke promise with the serialized error, so the
// front end only ever sees the message text.
impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
