//! Utility functions for predict-shell

use std::path::{Path, PathBuf};
use crate::Result;

/// Canonicalize a directory path, rejecting anything that is not an existing directory
pub fn canonicalize_dir(path: &Path) -> Result<PathBuf> {
    let canonical_path = path.canonicalize().map_err(|_| {
        crate::Error::InvalidPath(format!("Invalid or non-existent path: {}", path.display()))
    })?;

    if !canonical_path.is_dir() {
        return Err(crate::Error::InvalidPath(format!(
            "Not a directory: {}",
            canonical_path.display()
        )));
    }

    Ok(canonical_path)
}
