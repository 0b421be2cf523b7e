//! entry.rs
//!
//! Searchable units and the in-memory index.
//!
//! - `MediaFile`: a discovered file, classified by extension
//! - `IndexEntry`: one embedded item; a still image or a frame sampled from a video
//! - `Index`: ordered, append-only collection of entries sharing one dimensionality
//! - `QueryResult`: (score, entry) pair produced by the ranker

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Image,
    VideoFrame,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Image => "image",
            EntryKind::VideoFrame => "video_frame",
        }
    }
}

/// Only video frames carry a timestamp (seconds from clip start).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexEntry {
    Image {
        path: PathBuf,
        embedding: Vec<f32>,
    },
    VideoFrame {
        path: PathBuf,
        timestamp: f64,
        embedding: Vec<f32>,
    },
}

impl IndexEntry {
    pub fn image(path: impl Into<PathBuf>, embedding: Vec<f32>) -> Self {
        IndexEntry::Image {
            path: path.into(),
            embedding,
        }
    }

    pub fn video_frame(path: impl Into<PathBuf>, timestamp: f64, embedding: Vec<f32>) -> Self {
        IndexEntry::VideoFrame {
            path: path.into(),
            timestamp,
            embedding,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            IndexEntry::Image { path, .. } | IndexEntry::VideoFrame { path, .. } => path,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            IndexEntry::Image { .. } => EntryKind::Image,
            IndexEntry::VideoFrame { .. } => EntryKind::VideoFrame,
        }
    }

    pub fn timestamp(&self) -> Option<f64> {
        match self {
            IndexEntry::Image { .. } => None,
            IndexEntry::VideoFrame { timestamp, .. } => Some(*timestamp),
        }
    }

    pub fn embedding(&self) -> &[f32] {
        match self {
            IndexEntry::Image { embedding, .. } | IndexEntry::VideoFrame { embedding, .. } => {
                embedding
            }
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum IndexInvariantError {
    #[error("empty embedding for {0}")]
    EmptyEmbedding(String),

    #[error("dimension mismatch for {path}: index has {expected}, entry has {got}")]
    DimMismatch {
        path: String,
        expected: usize,
        got: usize,
    },
}

/// Ordered collection of entries produced by one embedding model.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    model: String,
    entries: Vec<IndexEntry>,
}

impl Index {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            entries: Vec::new(),
        }
    }

    /// Rebuilds an index from persisted parts, re-checking the dimensionality invariant.
    pub fn from_entries(
        model: impl Into<String>,
        entries: Vec<IndexEntry>,
    ) -> Result<Self, IndexInvariantError> {
        let mut index = Self::new(model);
        for entry in entries {
            index.push(entry)?;
        }
        Ok(index)
    }

    pub fn push(&mut self, entry: IndexEntry) -> Result<(), IndexInvariantError> {
        let got = entry.embedding().len();
        if got == 0 {
            return Err(IndexInvariantError::EmptyEmbedding(
                entry.path().display().to_string(),
            ));
        }
        if let Some(expected) = self.dimensions() {
            if got != expected {
                return Err(IndexInvariantError::DimMismatch {
                    path: entry.path().display().to_string(),
                    expected,
                    got,
                });
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// `None` while the index is empty.
    pub fn dimensions(&self) -> Option<usize> {
        self.entries.first().map(|e| e.embedding().len())
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Cosine similarity in [-1, 1].
    pub score: f32,
    pub entry: IndexEntry,
}
