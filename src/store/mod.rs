//! Filesystem-backed artifact store.
//!
//! The artifact directory is the only source of truth: every call enumerates
//! it fresh, there is no index or cache. `list` returns names in directory
//! enumeration order, which is not contractually sorted.
//!
//! Filenames handed to the store must be a single path component. Anything
//! else (separators, `..`, absolute paths) is treated as an attempt to escape
//! the directory.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use glob::Pattern;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// Extensions recognized as artifact images (compared case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Errors from artifact store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Artifact name escapes the artifact directory: {0}")]
    PathEscape(String),

    #[error("Artifact directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// NotFound and PathEscape look the same to callers
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_) | StoreError::PathEscape(_))
    }
}

/// Listing entry with file metadata
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactEntry {
    pub name: String,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// The set of barcode images in one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Wrap a directory without checking it
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Wrap a directory that must already exist
    pub fn open_existing(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::MissingDirectory(root));
        }
        Ok(Self { root })
    }

    /// The artifact directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Image filenames currently in the directory
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if has_image_extension(name) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    /// Image filenames matching a glob pattern
    pub fn list_matching(&self, pattern: &Pattern) -> Result<Vec<String>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|name| pattern.matches(name))
            .collect())
    }

    /// Image files with size and modification time
    pub fn list_entries(&self) -> Result<Vec<ArtifactEntry>, StoreError> {
        let mut entries = Vec::new();
        for name in self.list()? {
            // Deleted between enumeration and stat
            let Ok(metadata) = fs::metadata(self.root.join(&name)) else {
                continue;
            };
            entries.push(ArtifactEntry {
                name,
                size_bytes: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        Ok(entries)
    }

    /// Whether a file with this name is in the directory
    pub fn exists(&self, filename: &str) -> bool {
        is_local_name(filename) && self.root.join(filename).is_file()
    }

    /// Remove a file. A missing file is `NotFound`, not a fault.
    pub fn delete(&self, filename: &str) -> Result<(), StoreError> {
        if !is_local_name(filename) {
            warn!(filename, "Rejected delete outside artifact directory");
            return Err(StoreError::PathEscape(filename.to_string()));
        }

        let path = self.root.join(filename);
        if !path.is_file() {
            info!(filename, "Barcode deletion skipped: not found");
            return Err(StoreError::NotFound(filename.to_string()));
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                info!(filename, "Barcode deleted successfully");
                Ok(())
            }
            // Lost a race with another delete
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(filename, "Barcode deletion skipped: not found");
                Err(StoreError::NotFound(filename.to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Open a file for download, refusing anything that resolves outside
    /// the directory (including through symlinks)
    pub fn open(&self, filename: &str) -> Result<File, StoreError> {
        let path = self.resolve(filename)?;
        Ok(File::open(path)?)
    }

    /// Read a whole file into memory
    pub fn read(&self, filename: &str) -> Result<Vec<u8>, StoreError> {
        let mut file = self.open(filename)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn resolve(&self, filename: &str) -> Result<PathBuf, StoreError> {
        if !is_local_name(filename) {
            warn!(filename, "Rejected path escape");
            return Err(StoreError::PathEscape(filename.to_string()));
        }

        let not_found = || StoreError::NotFound(filename.to_string());

        let root = self.root.canonicalize()?;
        let resolved = self
            .root
            .join(filename)
            .canonicalize()
            .map_err(|_| not_found())?;

        if !resolved.starts_with(&root) {
            warn!(filename, "Rejected path escape through link");
            return Err(StoreError::PathEscape(filename.to_string()));
        }
        if !resolved.is_file() {
            return Err(not_found());
        }

        Ok(resolved)
    }
}

/// True if `name` is a single normal path component.
///
/// Backslash only separates paths on Windows; elsewhere it is an ordinary
/// filename byte.
pub fn is_local_name(name: &str) -> bool {
    if name.contains('/') || (cfg!(windows) && name.contains('\\')) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// True if `name` ends with one of [`IMAGE_EXTENSIONS`]
pub fn has_image_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}
