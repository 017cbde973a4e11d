//! Crash-safe file writes.

use std::path::Path;

use crate::error::DbError;

/// Replace `path` with `bytes` without ever leaving a torn file.
///
/// The data goes to a sibling `.tmp` file first, which is then renamed
/// over the target. A crash mid-write leaves the previous contents intact.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DbError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, bytes).map_err(|e| DbError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| DbError::io(path, e))
}

/// Read a file, treating "not found" as `None`.
pub fn read_optional(path: &Path) -> Result<Option<String>, DbError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DbError::io(path, e)),
    }
}
