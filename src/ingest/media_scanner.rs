//! media_scanner.rs
//!
//! Recursively walks a media folder and yields image and video files,
//! classified by extension (case-insensitive).
//!
//! Responsibilities:
//! - Validate the root (must exist and be a directory) before any indexing starts
//! - Use `ignore::WalkBuilder` with every filter disabled so nothing is hidden from the walk
//! - Sort siblings by file name so the output order is stable for a given snapshot
//! - Silently skip unknown extensions
//! - Log and skip entries the walk cannot read (e.g., a locked subfolder)

use crate::config::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::index::entry::{MediaFile, MediaKind};
use ignore::{DirEntry, WalkBuilder};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("media folder not found: {0}")]
    NotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

pub struct MediaScanner;

impl MediaScanner {
    pub fn new() -> Self {
        Self
    }

    /// Checks the precondition on the root; callers run this before any other work.
    pub fn validate_root(&self, root: &Path) -> Result<(), ScanError> {
        if !root.exists() {
            return Err(ScanError::NotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }
        Ok(())
    }

    /// Returns every image and video below `root`, in stable traversal order.
    ///
    /// Unreadable entries are skipped; only the root precondition is fatal.
    pub fn scan(&self, root: &Path) -> Result<Vec<MediaFile>, ScanError> {
        self.validate_root(root)?;

        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut out = Vec::new();
        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(e) => {
                    warn!("[scan] skipping unreadable entry: {e}");
                    continue;
                }
            };
            if let Some(kind) = classify(&entry) {
                out.push(MediaFile {
                    path: entry.into_path(),
                    kind,
                });
            }
        }

        Ok(out)
    }
}

impl Default for MediaScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Media kind for a regular file with a known extension.
fn classify(entry: &DirEntry) -> Option<MediaKind> {
    if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
        return None;
    }
    media_kind(entry.path())
}

pub fn media_kind(path: &Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}
