//! ffmpeg_backend.rs
//!
//! Media decoding port plus its ffmpeg/ffprobe implementation.
//!
//! - `probe_duration`: `ffprobe -print_format json`, first video stream's duration,
//!   falling back to the container duration
//! - `decode_frame`: one PNG frame piped out of `ffmpeg -ss <t>`
//! - `decode_image`: still images go straight through the `image` crate, format
//!   sniffed from the file content (extensions lie)
//!
//! Both binaries are looked up by the configured path (defaults to `$PATH`).

use image::{DynamicImage, ImageReader};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("input file does not exist: {0}")]
    InvalidInput(PathBuf),

    #[error("process error: {0}")]
    Process(#[from] std::io::Error),

    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("ffprobe failed: {0}")]
    Probe(String),

    #[error("ffmpeg failed: {0}")]
    Execution(String),

    #[error("ffmpeg produced no frame at {timestamp:.3}s")]
    EmptyFrame { timestamp: f64 },

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("image decode: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decoding capability consumed by the frame sampler and the index builder.
pub trait MediaBackend {
    /// Clip duration in seconds; `None` when it cannot be determined or is not positive.
    async fn probe_duration(&self, path: &Path) -> Result<Option<f64>, MediaError>;

    async fn decode_frame(&self, path: &Path, timestamp: f64) -> Result<DynamicImage, MediaError>;

    async fn decode_image(&self, path: &Path) -> Result<DynamicImage, MediaError> {
        let read_err = |source| MediaError::Read {
            path: path.to_path_buf(),
            source,
        };
        let reader = ImageReader::open(path)
            .map_err(read_err)?
            .with_guessed_format()
            .map_err(read_err)?;
        Ok(reader.decode()?)
    }
}

#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
}

impl FfmpegBackend {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

impl MediaBackend for FfmpegBackend {
    async fn probe_duration(&self, path: &Path) -> Result<Option<f64>, MediaError> {
        if !path.exists() {
            return Err(MediaError::InvalidInput(path.to_path_buf()));
        }

        let output = tokio::process::Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::Probe(stderr.trim().to_string()));
        }

        parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
    }

    async fn decode_frame(&self, path: &Path, timestamp: f64) -> Result<DynamicImage, MediaError> {
        if !path.exists() {
            return Err(MediaError::InvalidInput(path.to_path_buf()));
        }

        // -ss before -i for fast seeking
        let output = tokio::process::Command::new(&self.ffmpeg_path)
            .args(["-loglevel", "error", "-ss", &format!("{timestamp:.3}"), "-i"])
            .arg(path)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "pipe:1"])
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::Execution(stderr.trim().to_string()));
        }
        if output.stdout.is_empty() {
            return Err(MediaError::EmptyFrame { timestamp });
        }

        Ok(image::load_from_memory(&output.stdout)?)
    }
}

/// Subset of ffprobe's JSON output.
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_probe_duration(json_str: &str) -> Result<Option<f64>, MediaError> {
    let probe: ProbeOutput = serde_json::from_str(json_str)?;

    let from_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .and_then(|s| s.duration.as_deref())
        .and_then(parse_seconds);
    let from_format = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_seconds);

    Ok(from_stream.or(from_format))
}

fn parse_seconds(s: &str) -> Option<f64> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}
