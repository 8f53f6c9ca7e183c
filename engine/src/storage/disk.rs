use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use messages::Format;
use serde::{Serialize, de::DeserializeOwned};
use tempfile::NamedTempFile;

use crate::error::{EngineErr, Result};

/// Atomically writes `value` to `path` in the compact binary format.
///
/// The payload is first written to a temporary file next to `path` and then
/// renamed over it, a reader never observes a partially written file.
pub(crate) fn write_payload<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    fs::create_dir_all(&parent).map_err(|e| EngineErr::disk(&parent, e))?;

    let bytes = Format::Binary.encode(value)?;
    let mut file = NamedTempFile::new_in(&parent).map_err(|e| EngineErr::disk(&parent, e))?;
    file.write_all(&bytes).map_err(|e| EngineErr::disk(path, e))?;
    file.persist(path)
        .map_err(|e| EngineErr::disk(path, e.error))?;

    Ok(())
}

/// Reads a payload previously written by `write_payload`.
pub(crate) fn read_payload<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| EngineErr::disk(path, e))?;

    Format::Binary.decode(&bytes).map_err(|e| {
        EngineErr::invalid(format!("corrupted file {}: {e}", path.display()))
    })
}
