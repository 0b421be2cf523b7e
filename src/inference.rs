//! inference.rs
//!
//! Ranks index entries against a free-text query.
//!
//! fn search(query, index, adapter, k) -> Vec<QueryResult>
//!   1. Embeds the query text once
//!   2. Scores every entry by cosine similarity (exhaustive scan)
//!   3. Sorts descending, ties keep index order, and keeps the top k
//!
//! Zero-norm vectors score 0.0. Scores are raw cosine values in [-1, 1].

use crate::client::embedder_client::{EmbedError, EmbeddingModel};
use crate::index::entry::{Index, QueryResult};
use crate::transform::embedding_adapter::EmbeddingAdapter;
use std::cmp::Ordering;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("embed query: {0}")]
    Embed(#[from] EmbedError),

    #[error("query has {query} dimensions, index has {index}")]
    DimensionMismatch { query: usize, index: usize },
}

pub async fn search<M: EmbeddingModel>(
    query_text: &str,
    index: &Index,
    adapter: &EmbeddingAdapter<M>,
    top_k: usize,
) -> Result<Vec<QueryResult>, SearchError> {
    if index.is_empty() || top_k == 0 {
        return Ok(Vec::new());
    }

    let query = adapter.embed_text(query_text).await?;
    let results = rank(&query, index, top_k)?;
    debug!(
        "[search] '{}': {} of {} entries returned",
        query_text,
        results.len(),
        index.len()
    );
    Ok(results)
}

/// Pure ranking step: no model involved.
pub fn rank(query: &[f32], index: &Index, top_k: usize) -> Result<Vec<QueryResult>, SearchError> {
    if let Some(dims) = index.dimensions() {
        if dims != query.len() {
            return Err(SearchError::DimensionMismatch {
                query: query.len(),
                index: dims,
            });
        }
    }

    let mut scored: Vec<(f32, usize)> = index
        .entries()
        .iter()
        .enumerate()
        .map(|(i, e)| (cosine_similarity(query, e.embedding()), i))
        .collect();

    // stable: equal scores keep traversal order
    scored.sort_by(|a, b| descending_nan_last(a.0, b.0));
    scored.truncate(top_k);

    Ok(scored
        .into_iter()
        .map(|(score, i)| QueryResult {
            score,
            entry: index.entries()[i].clone(),
        })
        .collect())
}

/// Dot product over the product of norms; 0.0 when either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    let denom = na.sqrt() * nb.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (dot / denom).clamp(-1.0, 1.0) as f32
}

fn descending_nan_last(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
