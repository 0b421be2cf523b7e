//! embedder_client.rs
//!
//! Client for a CLIP-style model served behind an OpenAI-compatible embeddings
//! endpoint (e.g., LM Studio, infinity). Text and images land in the same space.
//!
//! Assumptions:
//! - Text goes up as a plain `input` string.
//! - Images go up as `data:image/png;base64,...` strings in the same `input` array.
//! - The server lists its models under `GET {base}/models`.
//!
//! Example:
//! ```ignore
//! let client = EmbedderClient::new("http://localhost:1234/v1", "clip-vit-base-patch32", None)?
//!     .connect()
//!     .await?;
//! let vec = client.embed_text("a red car").await?;
//! println!("dim = {}", vec.len());
//! ```

use std::io::Cursor;
use std::time::Duration;

use base64::Engine as _;
use image::{ImageFormat, RgbImage};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::DEFAULT_TIMEOUT_SECS;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("model '{model}' is not served at {base_url}")]
    ModelUnavailable { model: String, base_url: String },

    #[error("empty embedding response")]
    EmptyResponse,

    #[error("embedding count mismatch: sent {sent}, got {got}")]
    CountMismatch { sent: usize, got: usize },

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimMismatch { expected: usize, got: usize },

    #[error("image encode error: {0}")]
    ImageEncode(#[from] image::ImageError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// External embedding capability: one model, two modalities, one vector space.
pub trait EmbeddingModel {
    fn model_id(&self) -> &str;

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Receives 3-channel RGB only; color normalisation happens before this call.
    async fn embed_image(&self, image: &RgbImage) -> Result<Vec<f32>, EmbedError>;
}

/// High-level client for embedding text and images via an OpenAI-compatible server.
pub struct EmbedderClient {
    http: reqwest::Client,
    /// Base URL to the API (e.g., http://localhost:1234/v1).
    base_url: String,
    model: String,
    /// Optional expected vector dimension; if set, responses are validated.
    expected_dim: Option<usize>,
}

impl EmbedderClient {
    pub fn new<S: Into<String>>(
        base_url: S,
        model: S,
        expected_dim: Option<usize>,
    ) -> Result<Self, EmbedError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            expected_dim,
        })
    }

    /// Override the timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Result<Self, EmbedError> {
        self.http = reqwest::Client::builder()
            .timeout(Duration::from_secs(secs))
            .build()?;
        Ok(self)
    }

    /// Checks once that the server actually serves the model; the run depends on it.
    pub async fn connect(self) -> Result<Self, EmbedError> {
        self.ensure_model().await?;
        info!("[embed] model '{}' ready at {}", self.model, self.base_url);
        Ok(self)
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.base_url)
    }

    async fn ensure_model(&self) -> Result<(), EmbedError> {
        let resp = self.http.get(self.models_url()).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Status { status, body });
        }

        let listed: ModelsResponse = resp.json().await?;
        if listed.data.iter().any(|m| m.id == self.model) {
            Ok(())
        } else {
            Err(EmbedError::ModelUnavailable {
                model: self.model.clone(),
                base_url: self.base_url.clone(),
            })
        }
    }

    /// Embed multiple inputs in a single request.
    ///
    /// Returns embeddings in the same order as the inputs.
    pub async fn embed_inputs<T: AsRef<str>>(
        &self,
        inputs: &[T],
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        let n = inputs.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        let data = self.embed_inputs_raw(inputs).await?;
        order_and_validate(data, n, self.expected_dim)
    }

    async fn embed_one(&self, input: String) -> Result<Vec<f32>, EmbedError> {
        self.embed_inputs(std::slice::from_ref(&input))
            .await?
            .pop()
            .ok_or(EmbedError::EmptyResponse)
    }

    /// Low-level call that performs the HTTP request and returns raw data entries.
    async fn embed_inputs_raw<T: AsRef<str>>(
        &self,
        inputs: &[T],
    ) -> Result<Vec<EmbeddingDatum>, EmbedError> {
        let req = EmbeddingsRequest {
            model: &self.model,
            input: inputs.iter().map(|t| t.as_ref()).collect(),
        };

        let resp = self
            .http
            .post(self.embeddings_url())
            .json(&req)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Status { status, body });
        }

        let parsed: EmbeddingsResponse = resp.json().await?;
        if parsed.data.is_empty() {
            return Err(EmbedError::EmptyResponse);
        }
        Ok(parsed.data)
    }
}

impl EmbeddingModel for EmbedderClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.embed_one(text.to_string()).await
    }

    async fn embed_image(&self, image: &RgbImage) -> Result<Vec<f32>, EmbedError> {
        self.embed_one(png_data_url(image)?).await
    }
}

fn png_data_url(image: &RgbImage) -> Result<String, EmbedError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(format!("data:image/png;base64,{b64}"))
}

/// Sorts by `index` (some servers already do this) and checks count and dimension.
fn order_and_validate(
    data: Vec<EmbeddingDatum>,
    sent: usize,
    expected_dim: Option<usize>,
) -> Result<Vec<Vec<f32>>, EmbedError> {
    if data.len() != sent {
        return Err(EmbedError::CountMismatch {
            sent,
            got: data.len(),
        });
    }

    let mut pairs: Vec<(usize, Vec<f32>)> = data
        .into_iter()
        .enumerate()
        .map(|(pos, d)| (d.index.unwrap_or(pos), d.embedding))
        .collect();
    pairs.sort_by_key(|(i, _)| *i);

    let mut result = Vec::with_capacity(sent);
    for (_, emb) in pairs {
        if let Some(expected) = expected_dim {
            if emb.len() != expected {
                return Err(EmbedError::DimMismatch {
                    expected,
                    got: emb.len(),
                });
            }
        }
        result.push(emb);
    }
    Ok(result)
}

/// Request payload compatible with OpenAI-style embeddings API.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

/// Response payload (subset) for embeddings.
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelDatum>,
}

#[derive(Debug, Deserialize)]
struct ModelDatum {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<EmbeddingDatum> {
        serde_json::from_str::<EmbeddingsResponse>(json).unwrap().data
    }

    #[test]
    fn reorders_by_index() {
        let data = parse(
            r#"{"object":"list","data":[
                {"object":"embedding","index":1,"embedding":[0.0,1.0]},
                {"object":"embedding","index":0,"embedding":[1.0,0.0]}
            ],"model":"clip"}"#,
        );
        let out = order_and_validate(data, 2, Some(2)).unwrap();
        assert_eq!(out, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn missing_index_keeps_response_order() {
        let data = parse(r#"{"data":[{"embedding":[1.0]},{"embedding":[2.0]}]}"#);
        let out = order_and_validate(data, 2, None).unwrap();
        assert_eq!(out, vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn rejects_count_and_dimension_mismatch() {
        let data = parse(r#"{"data":[{"index":0,"embedding":[1.0,2.0]}]}"#);
        assert!(matches!(
            order_and_validate(data, 2, None),
            Err(EmbedError::CountMismatch { sent: 2, got: 1 })
        ));

        let data = parse(r#"{"data":[{"index":0,"embedding":[1.0,2.0]}]}"#);
        assert!(matches!(
            order_and_validate(data, 1, Some(512)),
            Err(EmbedError::DimMismatch {
                expected: 512,
                got: 2
            })
        ));
    }

    #[test]
    fn request_carries_model_and_inputs() {
        let req = EmbeddingsRequest {
            model: "clip",
            input: vec!["a red car"],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "clip");
        assert_eq!(json["input"][0], "a red car");
    }

    #[test]
    fn images_become_png_data_urls() {
        let img = RgbImage::from_pixel(2, 2, image::Rgb([10, 20, 30]));
        let url = png_data_url(&img).unwrap();
        let b64 = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = base64::engine::general_purpose::STANDARD.decode(b64).unwrap();
        let back = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(back, img);
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let client = EmbedderClient::new("http://localhost:1234/v1/", "clip", None).unwrap();
        assert_eq!(client.embeddings_url(), "http://localhost:1234/v1/embeddings");
        assert_eq!(client.models_url(), "http://localhost:1234/v1/models");
        assert_eq!(client.model_id(), "clip");
    }
}
