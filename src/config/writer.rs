use super::ServerDocument;
use crate::DevbootError;
use chrono::Local;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Directory a file at `path` lives in; `.` for bare file names.
fn containing_dir(path: &Path) -> &Path {
    path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."))
}

/// File the write should land on: `path` itself, or the file a symlink at
/// `path` points to (which may not exist yet).
fn resolve_destination(path: &Path) -> io::Result<PathBuf> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_symlink() => match fs::canonicalize(path) {
            Ok(target) => Ok(target),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Ok(containing_dir(path).join(fs::read_link(path)?))
            },
            Err(e) => Err(e),
        },
        _ => Ok(path.to_path_buf()),
    }
}

/// Atomically replace `path` with `contents`
///
/// The bytes go to a temporary file in the destination directory which is then
/// renamed over `path`, so readers see either the old or the new file. A
/// symlinked `path` stays a symlink; the file it points to is replaced.
///
/// # Errors
///
/// Returns [`DevbootError::Write`] if:
/// - Unable to resolve a symlinked destination
/// - Unable to create parent directories
/// - Unable to create or write the temporary file
/// - Unable to rename the temporary file into place
pub fn write_atomic<P: AsRef<Path>>(path: P, contents: &[u8]) -> Result<(), DevbootError> {
    let path_ref = path.as_ref();
    let write_error = |source| DevbootError::Write { path: path_ref.to_path_buf(), source };

    let target = resolve_destination(path_ref).map_err(write_error)?;
    let dir = containing_dir(&target);
    fs::create_dir_all(dir).map_err(write_error)?;

    let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;
    temp.write_all(contents).map_err(write_error)?;
    if let Ok(metadata) = fs::metadata(&target) {
        temp.as_file().set_permissions(metadata.permissions()).map_err(write_error)?;
    }
    temp.as_file().sync_all().map_err(write_error)?;
    temp.persist(&target).map_err(|e| write_error(e.error))?;

    Ok(())
}

/// Write a plugin-server configuration file as pretty JSON
///
/// # Errors
///
/// Returns an error if:
/// - Unable to serialize the document
/// - Unable to write the file (see [`write_atomic`])
pub fn write_server_document<P: AsRef<Path>>(
    path: P,
    document: &ServerDocument,
) -> anyhow::Result<()> {
    let mut json = serde_json::to_string_pretty(document)?;
    json.push('\n');
    write_atomic(path, json.as_bytes())?;
    Ok(())
}

/// Create a backup of a file with timestamp
///
/// # Errors
///
/// Returns an error if unable to copy the file
pub fn backup_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Option<PathBuf>> {
    let path_ref = path.as_ref();

    if !path_ref.is_file() {
        return Ok(None);
    }

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup_path = path_ref.with_file_name(format!(
        "{}.backup.{}",
        path_ref.file_name().and_then(|n| n.to_str()).unwrap_or("config"),
        timestamp
    ));

    fs::copy(path_ref, &backup_path).map_err(|e| {
        anyhow::anyhow!("Failed to back up {} to {}: {}", path_ref.display(), backup_path.display(), e)
    })?;

    Ok(Some(backup_path))
}
