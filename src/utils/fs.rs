//! Whole-document JSON/YAML file I/O.

use crate::error::{Result, SyncError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
    serde_json::from_str(&content).map_err(|source| SyncError::Json { path: path.into(), source })
}

pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
    serde_yaml::from_str(&content)
        .map_err(|source| SyncError::Yaml { what: path.display().to_string(), source })
}

/// Writes pretty JSON to a sibling temp file, then renames it over `path`.
///
/// Readers see either the previous document or the new one, never a partial write.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .map_err(|source| SyncError::Json { path: path.into(), source })?;
    write_atomic(path, content.as_bytes())
}

pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
    }
    let tmp = temp_sibling(path);
    fs::write(&tmp, content).map_err(|e| SyncError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(SyncError::io(path, e));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("cache");
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}
