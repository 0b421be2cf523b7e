//! indexing.rs
//!
//! Builds, or reuses, the embedding index for one media folder:
//! - load the side-car index unless a rebuild is forced
//! - scan folder → images + videos
//! - embed each image; sample frames from each video and embed each frame
//! - save the new index (replacing the old one wholesale)
//!
//! A loaded index is trusted as-is unless it was built by another model;
//! staleness against the folder's current contents is the caller's call.
//! A single bad file is logged and skipped; it never aborts the pass.

use crate::client::embedder_client::{EmbedError, EmbeddingModel};
use crate::index::entry::{Index, IndexEntry, IndexInvariantError, MediaFile, MediaKind};
use crate::index::store::IndexStore;
use crate::ingest::frame_sampler::FrameSampler;
use crate::ingest::media_scanner::{MediaScanner, ScanError};
use crate::media::ffmpeg_backend::{MediaBackend, MediaError};
use crate::transform::embedding_adapter::EmbeddingAdapter;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("scan: {0}")]
    Scan(#[from] ScanError),
}

/// Per-item failure; logged and skipped by the builder.
#[derive(Debug, Error)]
enum ItemError {
    #[error("decode: {0}")]
    Media(#[from] MediaError),

    #[error("embed: {0}")]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    Invariant(#[from] IndexInvariantError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    Loaded,
    Built,
}

#[derive(Debug)]
pub struct BuildOutcome {
    pub index: Index,
    pub source: IndexSource,
}

pub struct IndexBuilder<'a, M, B, S> {
    adapter: &'a EmbeddingAdapter<M>,
    backend: &'a B,
    store: &'a S,
    frames_per_video: usize,
    show_progress: bool,
}

impl<'a, M, B, S> IndexBuilder<'a, M, B, S>
where
    M: EmbeddingModel,
    B: MediaBackend,
    S: IndexStore,
{
    pub fn new(
        adapter: &'a EmbeddingAdapter<M>,
        backend: &'a B,
        store: &'a S,
        frames_per_video: usize,
    ) -> Self {
        Self {
            adapter,
            backend,
            store,
            frames_per_video,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub async fn build_or_load_index(
        &self,
        media_folder: &Path,
        force_rebuild: bool,
    ) -> Result<BuildOutcome, IndexError> {
        MediaScanner::new().validate_root(media_folder)?;

        if !force_rebuild {
            if let Some(index) = self.store.load(media_folder) {
                if self.is_compatible(&index) {
                    info!(
                        "[index] loaded existing index for {} ({} entries)",
                        media_folder.display(),
                        index.len()
                    );
                    return Ok(BuildOutcome {
                        index,
                        source: IndexSource::Loaded,
                    });
                }
            }
        }

        let index = self.build_index(media_folder).await?;
        match self.store.save(media_folder, &index) {
            Ok(path) => info!("[store] index saved to {}", path.display()),
            Err(e) => warn!("[store] could not save index: {e:#}"),
        }

        Ok(BuildOutcome {
            index,
            source: IndexSource::Built,
        })
    }

    /// A persisted index from another model (or of another width) must not be reused.
    fn is_compatible(&self, index: &Index) -> bool {
        if index.model() != self.adapter.model_id() {
            warn!(
                "[index] existing index was built with '{}', current model is '{}'; rebuilding",
                index.model(),
                self.adapter.model_id()
            );
            return false;
        }
        if let (Some(have), Some(want)) = (index.dimensions(), self.adapter.dimensions()) {
            if have != want {
                warn!("[index] existing index has {have} dimensions, expected {want}; rebuilding");
                return false;
            }
        }
        true
    }

    /// Full pass over the folder; never touches the store.
    pub async fn build_index(&self, media_folder: &Path) -> Result<Index, IndexError> {
        info!("[index] building new index for {}", media_folder.display());

        let files = MediaScanner::new().scan(media_folder)?;
        let (images, videos) = files.iter().fold((0, 0), |(i, v), f| match f.kind {
            MediaKind::Image => (i + 1, v),
            MediaKind::Video => (i, v + 1),
        });
        info!("[scan] {} files ({images} images, {videos} videos)", files.len());

        let pb = self.progress_bar(files.len() as u64);
        let sampler = FrameSampler::new(self.backend, self.frames_per_video);
        let mut index = Index::new(self.adapter.model_id());
        let mut failed = 0usize;

        for file in &files {
            pb.set_message(file_label(file));
            failed += match file.kind {
                MediaKind::Image => self.index_image(&mut index, file).await,
                MediaKind::Video => self.index_video(&mut index, file, &sampler).await,
            };
            pb.inc(1);
        }
        pb.finish_and_clear();

        let degenerate = index
            .entries()
            .iter()
            .filter(|e| e.embedding().iter().all(|x| *x == 0.0))
            .count();
        if degenerate > 0 {
            warn!("[index] {degenerate} entries have a zero embedding and will never match");
        }
        if failed > 0 {
            warn!("[index] {failed} items skipped after errors");
        }
        info!("[index] done: {} entries", index.len());

        Ok(index)
    }

    /// Returns the number of failed items (0 or 1).
    async fn index_image(&self, index: &mut Index, file: &MediaFile) -> usize {
        let result = async {
            let image = self.backend.decode_image(&file.path).await?;
            let embedding = self.adapter.embed_image(&image).await?;
            index.push(IndexEntry::image(&file.path, embedding))?;
            Ok::<(), ItemError>(())
        }
        .await;

        match result {
            Ok(()) => 0,
            Err(e) => {
                warn!("[index] error processing image {}: {e:#}", file.path.display());
                1
            }
        }
    }

    /// Returns the number of frames that failed to embed.
    async fn index_video<'b>(
        &self,
        index: &mut Index,
        file: &MediaFile,
        sampler: &FrameSampler<'b, B>,
    ) -> usize {
        let mut failed = 0;
        for frame in sampler.sample(&file.path).await {
            let result = async {
                let embedding = self.adapter.embed_image(&frame.image).await?;
                index.push(IndexEntry::video_frame(&file.path, frame.timestamp, embedding))?;
                Ok::<(), ItemError>(())
            }
            .await;

            if let Err(e) = result {
                warn!(
                    "[index] error processing frame from {} at {:.2}s: {e:#}",
                    file.path.display(),
                    frame.timestamp
                );
                failed += 1;
            }
        }
        failed
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::with_template("{prefix} [{bar:30}] {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb.set_prefix("[index]");
        pb
    }
}

fn file_label(file: &MediaFile) -> String {
    file.path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
