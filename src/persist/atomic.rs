// src/persist/atomic.rs
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::trace;

use crate::error::{LineageError, LineageResult};

/// Write `destination` through a temporary file in the same directory, then rename it into place.
///
/// `destination` either keeps its previous content or holds everything `fill` wrote.
/// The temporary file is removed on every failure path.
pub fn write_atomic<F>(destination: &Path, fill: F) -> LineageResult<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let directory = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let failure = |message: String| LineageError::WriteFailure {
        path: destination.to_path_buf(),
        message,
    };

    let mut temp = tempfile::Builder::new()
        .prefix(".lineage-")
        .suffix(".tmp")
        .tempfile_in(directory)
        .map_err(|e| failure(format!("Failed to create temporary file: {}", e)))?;
    trace!("Writing {} via {}", destination.display(), temp.path().display());

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        fill(&mut writer).map_err(|e| failure(format!("Failed to write content: {}", e)))?;
        writer.flush().map_err(|e| failure(format!("Failed to flush content: {}", e)))?;
    }

    temp.as_file()
        .sync_all()
        .map_err(|e| failure(format!("Failed to sync temporary file: {}", e)))?;

    temp.persist(destination)
        .map_err(|e| failure(format!("Failed to replace destination: {}", e.error)))?;

    Ok(())
}
