//! Filesystem side of the pipeline: provisioning, writing and removing artifacts.
//!
//! Every function here takes the output root explicitly and only touches
//! `output_root + record_path`. Record paths are normalized (no `..`, no
//! leading separator once made relative), so nothing is ever written outside
//! the root.
//!
//! ## Write modes
//!
//! [`WriteMode::Atomic`] writes to a temporary file next to the target and
//! renames it into place. A web server reading the webroot while a sweep is
//! running sees either the old artifact or the new one, never a truncated
//! file. [`WriteMode::Direct`] overwrites the target in place.

use crate::path::RecordPath;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("failed to create directory {}: {source}", .path.display())]
    Provision {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("media source not found: {}", .0.display())]
    SourceMissing(PathBuf),
}

impl ArtifactError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Temp file in the target directory, then rename over the target.
    #[default]
    Atomic,
    /// Truncate and write the target in place.
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// Nothing was there; deletion is still a success.
    Absent,
}

/// Ensure `dir` and all of its ancestors exist.
///
/// Safe to call concurrently for the same or overlapping directories: a
/// directory that already exists, or that another worker creates first, is
/// not an error.
pub fn ensure_dir(dir: &Path) -> Result<(), ArtifactError> {
    fs::create_dir_all(dir).map_err(|source| ArtifactError::Provision {
        path: dir.to_path_buf(),
        source,
    })
}

/// Directory that must exist before the artifact for `path` can be written.
pub fn parent_dir(output_root: &Path, path: &RecordPath) -> PathBuf {
    let target = path.output_path(output_root);
    target
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| output_root.to_path_buf())
}

/// Write rendered page content to `output_root + path`, replacing any
/// existing file. The parent directory must already exist.
pub fn write_page(
    output_root: &Path,
    path: &RecordPath,
    content: &str,
    mode: WriteMode,
) -> Result<PathBuf, ArtifactError> {
    let target = path.output_path(output_root);
    match mode {
        WriteMode::Direct => {
            fs::write(&target, content).map_err(|e| ArtifactError::io(&target, e))?;
        }
        WriteMode::Atomic => write_atomic(&target, |file| file.write_all(content.as_bytes()))?,
    }
    Ok(target)
}

/// Copy the bytes of `source` to `output_root + path`, replacing any
/// existing file. The parent directory must already exist.
pub fn write_media(
    output_root: &Path,
    path: &RecordPath,
    source: &Path,
    mode: WriteMode,
) -> Result<PathBuf, ArtifactError> {
    if !source.is_file() {
        return Err(ArtifactError::SourceMissing(source.to_path_buf()));
    }
    let target = path.output_path(output_root);
    match mode {
        WriteMode::Direct => {
            fs::copy(source, &target).map_err(|e| ArtifactError::io(&target, e))?;
        }
        WriteMode::Atomic => write_atomic(&target, |file| {
            let mut input = fs::File::open(source)?;
            io::copy(&mut input, file)?;
            Ok(())
        })?,
    }
    Ok(target)
}

/// Delete exactly the file at `output_root + path`.
///
/// A missing file is [`RemoveOutcome::Absent`]. Directories are never
/// removed, not even ones left empty; a directory at the target path is an
/// error.
pub fn remove(output_root: &Path, path: &RecordPath) -> Result<RemoveOutcome, ArtifactError> {
    let target = path.output_path(output_root);
    match fs::remove_file(&target) {
        Ok(()) => Ok(RemoveOutcome::Removed),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(RemoveOutcome::Absent),
        Err(e) => Err(ArtifactError::io(&target, e)),
    }
}

fn write_atomic(
    target: &Path,
    fill: impl FnOnce(&mut fs::File) -> io::Result<()>,
) -> Result<(), ArtifactError> {
    let dir = target
        .parent()
        .ok_or_else(|| ArtifactError::io(target, io::Error::other("target has no parent")))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ArtifactError::io(target, e))?;
    fill(tmp.as_file_mut()).map_err(|e| ArtifactError::io(target, e))?;
    // Temp files are created owner-only; artifacts must be readable by the web server.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(|e| ArtifactError::io(target, e))?;
    }
    tmp.as_file().sync_all().map_err(|e| ArtifactError::io(target, e))?;
    tmp.persist(target)
        .map_err(|e| ArtifactError::io(target, e.error))?;
    Ok(())
}
