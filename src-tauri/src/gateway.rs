//! Prediction gateway
//!
//! The one capability handed to the front end. Every request runs the
//! configured script in the shell's own directory; callers cannot pick the
//! program, script or directory.

use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use tokio::sync::Semaphore;

use crate::bridge::{Interpreter, Invocation};
use crate::config::BridgeConfig;
use crate::utils::canonicalize_dir;
use crate::{Error, Result};

/// Forwards prediction payloads to the bridge script
#[derive(Debug)]
pub struct PredictGateway {
    interpreter: Interpreter,
    script: PathBuf,
    working_dir: PathBuf,
    /// Admission control; `None` means no limit on live processes
    permits: Option<Semaphore>,
}

impl PredictGateway {
    /// Build a gateway rooted at `working_dir`
    pub fn new(working_dir: &Path, config: &BridgeConfig) -> Result<Self> {
        let working_dir = canonicalize_dir(working_dir)?;

        let interpreter = config
            .interpreter
            .as_deref()
            .map(Interpreter::new)
            .unwrap_or_default();

        let permits = config
            .max_concurrent
            .map(|limit| Semaphore::new(limit.get()));

        let script = PathBuf::from(config.script());
        if !working_dir.join(&script).exists() {
            tracing::warn!(
                "Bridge script {:?} not found under {:?}; requests will fail until it exists",
                script,
                working_dir
            );
        }

        tracing::info!(
            "Prediction gateway ready: {} {:?} in {:?} (limit: {:?})",
            interpreter.program(),
            script,
            working_dir,
            config.max_concurrent
        );

        Ok(Self {
            interpreter,
            script,
            working_dir,
            permits,
        })
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Run one prediction and return the script's JSON answer
    pub async fn predict(&self, payload: JsonValue) -> Result<JsonValue> {
        let _permit = match &self.permits {
            Some(permits) => Some(
                permits
                    .acquire()
                    .await
                    .map_err(|_| Error::Other("Prediction gateway is shut down".to_string()))?,
            ),
            None => None,
        };

        Invocation::new(&self.script, &self.working_dir)
            .with_interpreter(self.interpreter.clone())
            .run(&payload)
            .await
    }
}
