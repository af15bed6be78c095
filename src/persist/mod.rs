mod atomic;
mod table;
mod writer;

use std::path::Path;
use tracing::debug;

use crate::error::{LineageError, LineageResult};

pub use atomic::write_atomic;
pub use table::{Cell, Table, MISSING_SENTINEL};
pub use writer::{Provenance, TableWriter, WriterConfig};

/// Ensure a directory exists, creating it and any missing parents if necessary
pub fn ensure_directory(path: &Path) -> LineageResult<()> {
    if !path.is_dir() {
        debug!("Creating directory: {}", path.display());
        std::fs::create_dir_all(path)
            .map_err(|e| LineageError::DirectoryCreation {
                path: path.to_path_buf(),
                message: format!("Failed to create directory: {}", e),
            })?;
    }

    if path.is_dir() {
        Ok(())
    } else {
        Err(LineageError::DirectoryCreation {
            path: path.to_path_buf(),
            message: "Path exists but is not a directory".to_string(),
        })
    }
}
