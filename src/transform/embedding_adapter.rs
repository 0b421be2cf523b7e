//! embedding_adapter.rs
//!
//! Uniform vector-producing front for the embedding model.
//!
//! Responsibilities:
//! - Normalize every image to 3-channel RGB before handing it to the model
//! - Pin the dimensionality of the first vector seen and reject any later mismatch
//! - Reject empty vectors
//!
//! Holds nothing but the model handle and the pinned dimension; reuse one adapter
//! for the whole run.

use crate::client::embedder_client::{EmbedError, EmbeddingModel};
use image::DynamicImage;
use std::sync::OnceLock;

pub struct EmbeddingAdapter<M> {
    model: M,
    dimensions: OnceLock<usize>,
}

impl<M: EmbeddingModel> EmbeddingAdapter<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            dimensions: OnceLock::new(),
        }
    }

    /// Starts out pinned to a known dimensionality.
    pub fn with_dimensions(model: M, dimensions: usize) -> Self {
        let adapter = Self::new(model);
        let _ = adapter.dimensions.set(dimensions);
        adapter
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    #[cfg(test)]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// `None` until the first vector has been produced (or pinned up front).
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions.get().copied()
    }

    pub async fn embed_text(&self, query: &str) -> Result<Vec<f32>, EmbedError> {
        let v = self.model.embed_text(query).await?;
        self.check(v)
    }

    pub async fn embed_image(&self, image: &DynamicImage) -> Result<Vec<f32>, EmbedError> {
        let v = match image {
            DynamicImage::ImageRgb8(rgb) => self.model.embed_image(rgb).await?,
            other => self.model.embed_image(&other.to_rgb8()).await?,
        };
        self.check(v)
    }

    fn check(&self, v: Vec<f32>) -> Result<Vec<f32>, EmbedError> {
        if v.is_empty() {
            return Err(EmbedError::EmptyResponse);
        }
        let expected = *self.dimensions.get_or_init(|| v.len());
        if v.len() != expected {
            return Err(EmbedError::DimMismatch {
                expected,
                got: v.len(),
            });
        }
        Ok(v)
    }
}
