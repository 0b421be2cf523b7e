//! config.rs
//!
//! Defaults and the runtime configuration assembled from the CLI.

use std::path::PathBuf;

/// Default base URL for an OpenAI-compatible embeddings server (LM Studio style).
pub const DEFAULT_EMBED_BASE_URL: &str = "http://localhost:1234/v1";
/// Default CLIP-style model; must embed both text and images into one space.
pub const DEFAULT_EMBED_MODEL: &str = "clip-vit-base-patch32";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const FRAMES_PER_VIDEO: usize = 5;
pub const DEFAULT_TOP_K: usize = 5;

/// Side-car file written inside the media folder.
pub const INDEX_FILE_NAME: &str = "clip_media_index.json";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "flv", "wmv"];

pub const DEFAULT_FFMPEG: &str = "ffmpeg";
pub const DEFAULT_FFPROBE: &str = "ffprobe";

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub embed_base_url: String,
    pub embed_model: String,
    /// If set, every returned vector (and any loaded index) must have this length.
    pub expected_dim: Option<usize>,
    pub timeout_secs: u64,
    pub frames_per_video: usize,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
}
