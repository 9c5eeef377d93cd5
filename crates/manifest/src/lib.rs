#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Package file manifests for pakt
//!
//! A manifest is the full, ordered list of files and checksums produced by
//! one capture of a package's footprint. It is built once, never mutated
//! after being returned, and persisted by storage outside this core.

use pakt_hash::Hash;
use pakt_types::PackageId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Reserved checksum value recorded when a file's content could not be read
/// because another process held it locked at capture time. Distinguishable
/// from any real hash output (those are 64 hex characters).
pub const LOCKED_CHECKSUM_SENTINEL: &str = "unable-to-compute-checksum";

/// Checksum of one captured file: either real content hash or the reserved
/// locked sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checksum {
    /// BLAKE3 hash of the file contents
    Content(Hash),
    /// File was locked by another process; contents could not be read
    Locked,
}

impl Checksum {
    /// True when this entry carries the locked sentinel
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked)
    }

    /// The content hash, if one was computed
    #[must_use]
    pub fn as_hash(&self) -> Option<&Hash> {
        match self {
            Self::Content(hash) => Some(hash),
            Self::Locked => None,
        }
    }
}

impl From<Hash> for Checksum {
    fn from(hash: Hash) -> Self {
        Self::Content(hash)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content(hash) => write!(f, "{hash}"),
            Self::Locked => write!(f, "{LOCKED_CHECKSUM_SENTINEL}"),
        }
    }
}

impl Serialize for Checksum {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Content(hash) => hash.serialize(serializer),
            Self::Locked => serializer.serialize_str(LOCKED_CHECKSUM_SENTINEL),
        }
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == LOCKED_CHECKSUM_SENTINEL {
            return Ok(Self::Locked);
        }
        Hash::from_hex(&s)
            .map(Self::Content)
            .map_err(serde::de::Error::custom)
    }
}

/// One file recorded under the captured root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Absolute path of the file at capture time
    pub path: PathBuf,
    pub checksum: Checksum,
    /// Size in bytes from filesystem metadata
    pub size: u64,
}

/// Ordered list of every file under a captured root, tied to the package it
/// belongs to. Entries are sorted lexicographically by path so manifests
/// are reproducible and diff-friendly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileManifest {
    pub package: PackageId,
    files: Vec<FileEntry>,
}

impl FileManifest {
    /// Build a manifest from already-sorted entries
    #[must_use]
    pub fn new(package: PackageId, files: Vec<FileEntry>) -> Self {
        Self { package, files }
    }

    /// Number of files recorded
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when the captured root contained no files
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over entries in manifest order
    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter()
    }

    /// All entries in manifest order
    #[must_use]
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Entries whose checksum could not be computed at capture time.
    /// Orchestrators use this to decide whether a later re-capture is worth
    /// attempting once locks are released.
    pub fn locked_files(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter().filter(|entry| entry.checksum.is_locked())
    }

    /// Look up the entry for an exact path
    #[must_use]
    pub fn find(&self, path: &Path) -> Option<&FileEntry> {
        self.files.iter().find(|entry| entry.path == path)
    }
}

impl<'a> IntoIterator for &'a FileManifest {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
