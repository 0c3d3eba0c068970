use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::export::format::OutputFormat;

/// Extension of the multi-format archive
pub const BUNDLE_EXTENSION: &str = "zip";

/// Per-request file name prefix inside the shared output directory
///
/// Every artifact of a request is `<dir>/<stem>.<ext>`, so concurrent requests
/// never touch each other's files and cleanup never needs a lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStem {
    dir: PathBuf,
    stem: String,
}

impl ArtifactStem {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(dir: P, stem: S) -> Self {
        Self { dir: dir.into(), stem: stem.into() }
    }

    /// Allocate a fresh random stem in `dir`, creating the directory if needed
    pub fn allocate<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self::new(dir, Uuid::new_v4().simple().to_string()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn path_for(&self, format: OutputFormat) -> PathBuf {
        self.with_extension(format.extension())
    }

    pub fn bundle_path(&self) -> PathBuf {
        self.with_extension(BUNDLE_EXTENSION)
    }

    fn with_extension(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.stem, extension))
    }

    /// Files currently on disk whose name starts with the stem
    pub fn existing_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&self.stem))
            .map(|entry| entry.path())
            .collect();
        files.sort();
        files
    }

    /// Delete every file of this request. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let mut removed = 0;
        for path in self.existing_files() {
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed partial artifact {:?}", path);
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove partial artifact {:?}: {}", path, e),
            }
        }
        removed
    }
}
