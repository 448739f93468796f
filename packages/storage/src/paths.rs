#![allow(clippy::module_name_repetitions)]
//! Canonical locations for on-disk slots.
//!
//! The data directory defaults to `data/` under the working directory and
//! can be moved with `COAST_CONNECT_DATA_DIR`.

use std::path::{Path, PathBuf};

use crate::StorageError;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "COAST_CONNECT_DATA_DIR";

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV).map_or_else(|| PathBuf::from("data"), PathBuf::from)
}

/// Returns the file backing `key` inside `dir`.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] if the key is empty or contains
/// anything other than ASCII letters, digits, `-`, `_`, or `.` (a leading
/// `.` is rejected so temp files can't be addressed).
pub fn slot_path(dir: &Path, key: &str) -> Result<PathBuf, StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if !valid {
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
        });
    }

    Ok(dir.join(format!("{key}.json")))
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
