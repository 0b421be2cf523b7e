//! store.rs
//!
//! Side-car persistence for a built index, one file per media folder.
//!
//! File layout (`<folder>/clip_media_index.json`):
//! - line 1: header `{version, model, dimensions, entry_count, built_at, checksum}`
//! - rest:   JSON array of entries
//!
//! `checksum` is the SHA-256 (hex) of the entries bytes exactly as written.
//! An absent, unreadable, truncated or otherwise inconsistent file loads as "no index".

use crate::config::INDEX_FILE_NAME;
use crate::index::entry::{Index, IndexEntry, IndexInvariantError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("missing header line")]
    MissingHeader,

    #[error("unsupported index version {0}")]
    UnsupportedVersion(u32),

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("header says {expected} entries, found {got}")]
    CountMismatch { expected: usize, got: usize },

    #[error("header says {expected:?} dimensions, entries have {got:?}")]
    DimensionMismatch {
        expected: Option<usize>,
        got: Option<usize>,
    },

    #[error(transparent)]
    Invariant(#[from] IndexInvariantError),
}

/// Load/save capability the index builder is handed.
pub trait IndexStore {
    /// `None` whenever there is no usable index for `folder`.
    fn load(&self, folder: &Path) -> Option<Index>;

    /// Replaces any previous index for `folder`; returns where it was written.
    fn save(&self, folder: &Path, index: &Index) -> Result<PathBuf, StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexHeader {
    version: u32,
    model: String,
    dimensions: Option<usize>,
    entry_count: usize,
    built_at: DateTime<Utc>,
    checksum: String,
}

/// Stores the index as a JSON side-car inside the media folder.
#[derive(Debug, Clone)]
pub struct JsonIndexStore {
    file_name: String,
}

impl Default for JsonIndexStore {
    fn default() -> Self {
        Self {
            file_name: INDEX_FILE_NAME.to_string(),
        }
    }
}

impl JsonIndexStore {
    pub fn index_path(&self, folder: &Path) -> PathBuf {
        folder.join(&self.file_name)
    }

    /// Like `load`, but says why a present file was rejected.
    pub fn try_load(&self, folder: &Path) -> Result<Option<Index>, StoreError> {
        let path = self.index_path(folder);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode(&bytes).map(Some)
    }
}

impl IndexStore for JsonIndexStore {
    fn load(&self, folder: &Path) -> Option<Index> {
        match self.try_load(folder) {
            Ok(Some(index)) => {
                debug!(
                    "[store] loaded {} entries from {}",
                    index.len(),
                    self.index_path(folder).display()
                );
                Some(index)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(
                    "[store] ignoring unusable index {}: {e:#}",
                    self.index_path(folder).display()
                );
                None
            }
        }
    }

    fn save(&self, folder: &Path, index: &Index) -> Result<PathBuf, StoreError> {
        let path = self.index_path(folder);
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, encode(index)?)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(path)
    }
}

fn encode(index: &Index) -> Result<Vec<u8>, StoreError> {
    let body = serde_json::to_vec(index.entries())?;
    let header = IndexHeader {
        version: FORMAT_VERSION,
        model: index.model().to_string(),
        dimensions: index.dimensions(),
        entry_count: index.len(),
        built_at: Utc::now(),
        checksum: checksum(&body),
    };

    let mut out = serde_json::to_vec(&header)?;
    out.push(b'\n');
    out.extend_from_slice(&body);
    Ok(out)
}

fn decode(bytes: &[u8]) -> Result<Index, StoreError> {
    let split = bytes
        .iter()
        .position(|b| *b == b'\n')
        .ok_or(StoreError::MissingHeader)?;
    let (head, body) = (&bytes[..split], &bytes[split + 1..]);

    let header: IndexHeader = serde_json::from_slice(head)?;
    if header.version != FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion(header.version));
    }
    if checksum(body) != header.checksum {
        return Err(StoreError::ChecksumMismatch);
    }

    let entries: Vec<IndexEntry> = serde_json::from_slice(body)?;
    if entries.len() != header.entry_count {
        return Err(StoreError::CountMismatch {
            expected: header.entry_count,
            got: entries.len(),
        });
    }

    let index = Index::from_entries(header.model, entries)?;
    if index.dimensions() != header.dimensions {
        return Err(StoreError::DimensionMismatch {
            expected: header.dimensions,
            got: index.dimensions(),
        });
    }
    Ok(index)
}

fn checksum(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}
