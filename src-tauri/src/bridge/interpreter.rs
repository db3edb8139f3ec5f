//! Interpreter selection and lookup

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Interpreter command name for the host OS
pub fn default_interpreter_name() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

/// The program used to run a bridge script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    program: String,
}

impl Interpreter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Interpreter appropriate for the host OS
    pub fn system_default() -> Self {
        Self::new(default_interpreter_name())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Resolve the program to an executable path
    ///
    /// Explicit paths are taken as-is. Bare names are looked up in PATH and
    /// then in common install locations, since apps started from a desktop
    /// launcher often get a minimal PATH.
    pub fn resolve(&self) -> Result<PathBuf> {
        let program = Path::new(&self.program);

        if program.components().count() > 1 {
            if program.exists() {
                return Ok(program.to_path_buf());
            }
            return Err(Error::Launch(format!(
                "Interpreter not found at {}",
                program.display()
            )));
        }

        if let Ok(path) = which::which(&self.program) {
            return Ok(path);
        }

        let mut candidates = Vec::new();
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".local/bin"));
        }
        candidates.extend(
            ["/usr/local/bin", "/opt/homebrew/bin", "/usr/bin"]
                .iter()
                .map(PathBuf::from),
        );

        for dir in candidates {
            let path = dir.join(&self.program);
            if path.is_file() {
                tracing::debug!("Resolved interpreter outside PATH: {:?}", path);
                return Ok(path);
            }
        }

        Err(Error::Launch(format!(
            "Interpreter `{}` not found. Please install it or set `interpreter` in the config.",
            self.program
        )))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::system_default()
    }
}
