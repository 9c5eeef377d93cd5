#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! File capture and checksum service for pakt
//!
//! After an installer runs, the orchestrator captures the affected
//! directory tree to record the package's footprint: every regular file,
//! fingerprinted by content, in a deterministic order. A file another
//! process holds locked still gets exactly one manifest entry carrying the
//! reserved sentinel checksum; the caller needs the footprint even when
//! some files are transiently busy, so a lock degrades one entry instead
//! of aborting the capture.

use pakt_errors::{CaptureError, Error, Result};
use pakt_events::{EventBus, LockedFileWarning};
use pakt_hash::Hash;
use pakt_manifest::{Checksum, FileEntry, FileManifest};
use pakt_types::PackageId;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Captures package file footprints.
///
/// Holds no mutable state between calls; concurrent captures for different
/// packages are safe. Warnings are published on the event bus handle given
/// at construction.
#[derive(Clone)]
pub struct FileCapture {
    bus: EventBus,
}

impl FileCapture {
    /// Create a capture service publishing warnings to `bus`
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    /// Capture every regular file under `root` into a manifest for
    /// `package`.
    ///
    /// Symbolic links are never followed and never recorded, so link cycles
    /// cannot trap the scan. Entries are ordered lexicographically by path.
    /// The manifest is built fully before returning; later changes to the
    /// directory do not affect it.
    ///
    /// A file that cannot be read (locked by another process, permission
    /// lost, vanished mid-scan) is recorded with the locked sentinel
    /// checksum and a [`LockedFileWarning`] is published; the scan
    /// continues.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError::RootNotFound` / `RootNotADirectory` when
    /// `root` is unusable, and `CaptureError::EnumerationFailed` when a
    /// directory inside the tree cannot be listed. Per-file read failures
    /// are never errors.
    pub async fn capture(&self, root: &Path, package: &PackageId) -> Result<FileManifest> {
        let metadata = match fs::metadata(root).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CaptureError::RootNotFound {
                    path: root.display().to_string(),
                }
                .into());
            }
            Err(e) => {
                return Err(CaptureError::EnumerationFailed {
                    path: root.display().to_string(),
                    message: e.to_string(),
                }
                .into());
            }
        };
        if !metadata.is_dir() {
            return Err(CaptureError::RootNotADirectory {
                path: root.display().to_string(),
            }
            .into());
        }

        let mut paths = Vec::new();
        collect_files(root, &mut paths).await?;
        paths.sort();
        tracing::debug!(
            root = %root.display(),
            files = paths.len(),
            package = %package,
            "capturing package footprint"
        );

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(self.capture_entry(path).await);
        }

        Ok(FileManifest::new(package.clone(), files))
    }

    async fn capture_entry(&self, path: PathBuf) -> FileEntry {
        let size = fs::metadata(&path).await.map_or(0, |m| m.len());

        match Hash::hash_file(&path).await {
            Ok(hash) => FileEntry {
                path,
                checksum: Checksum::Content(hash),
                size,
            },
            Err(error) => {
                let os_error = match &error {
                    Error::Io { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                tracing::warn!(
                    path = %path.display(),
                    error = %os_error,
                    "file unreadable during capture; recording locked sentinel"
                );
                self.bus.publish(LockedFileWarning {
                    path: path.clone(),
                    os_error,
                });
                FileEntry {
                    path,
                    checksum: Checksum::Locked,
                    size,
                }
            }
        }
    }
}

/// Recursively gather regular file paths under `dir`. Symlinks are skipped
/// outright: `DirEntry::file_type` does not follow them, so a link is
/// neither a file nor a directory here.
async fn collect_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| enumeration_failed(dir, &e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| enumeration_failed(dir, &e))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| enumeration_failed(&path, &e))?;

        if file_type.is_dir() {
            Box::pin(collect_files(&path, paths)).await?;
        } else if file_type.is_file() {
            paths.push(path);
        }
    }

    Ok(())
}

fn enumeration_failed(path: &Path, e: &std::io::Error) -> Error {
    CaptureError::EnumerationFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    }
    .into()
}
