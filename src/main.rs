//! Search a local folder of images and videos with a free-text query:
//! - load or build the CLIP index for the folder (side-car file)
//!   - scan → images + videos
//!   - sample frames from videos (ffmpeg)
//!   - embed images and frames (OpenAI-compatible embeddings endpoint)
//! - embed the query and rank every entry by cosine similarity
//!
//! Run: `cargo run -- --media_folder ~/Pictures --query "a red car" --top_k 3`
//!
//! The index is reused on later runs; pass `--reindex` after the folder changes.

mod client;
mod config;
mod index;
mod indexing;
mod inference;
mod ingest;
mod media;
mod terminal;
mod transform;

use crate::client::embedder_client::EmbedderClient;
use crate::config::{
    DEFAULT_EMBED_BASE_URL, DEFAULT_EMBED_MODEL, DEFAULT_FFMPEG, DEFAULT_FFPROBE,
    DEFAULT_TIMEOUT_SECS, DEFAULT_TOP_K, FRAMES_PER_VIDEO, SearchConfig,
};
use crate::index::store::JsonIndexStore;
use crate::indexing::{IndexBuilder, IndexSource};
use crate::ingest::media_scanner::MediaScanner;
use crate::media::ffmpeg_backend::FfmpegBackend;
use crate::transform::embedding_adapter::EmbeddingAdapter;
use anyhow::{Context, Result};
use clap::Parser;
use clap::builder::TypedValueParser as _;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Search local media using CLIP embeddings and text queries.")]
struct Cli {
    /// Folder containing media files (images/videos).
    #[arg(long = "media_folder")]
    media_folder: PathBuf,

    /// Text query to search for.
    #[arg(long)]
    query: String,

    /// Number of top results to return.
    #[arg(long = "top_k", default_value_t = DEFAULT_TOP_K, value_parser = clap::value_parser!(u64).range(1..).map(|v| v as usize))]
    top_k: usize,

    /// Force re-indexing of the media folder.
    #[arg(long)]
    reindex: bool,

    /// Frames sampled per video.
    #[arg(long = "frames_per_video", default_value_t = FRAMES_PER_VIDEO, value_parser = clap::value_parser!(u64).range(1..).map(|v| v as usize))]
    frames_per_video: usize,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    #[arg(long = "embed_url", env = "MEDIA_SEARCH_EMBED_URL", default_value = DEFAULT_EMBED_BASE_URL)]
    embed_url: String,

    #[arg(long = "embed_model", env = "MEDIA_SEARCH_EMBED_MODEL", default_value = DEFAULT_EMBED_MODEL)]
    embed_model: String,

    /// Per-request timeout for the embeddings server, in seconds.
    #[arg(long = "embed_timeout", env = "MEDIA_SEARCH_EMBED_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    embed_timeout: u64,

    /// Expected embedding width; enforced on every vector and on loaded indexes.
    #[arg(long = "embed_dim", env = "MEDIA_SEARCH_EMBED_DIM")]
    embed_dim: Option<usize>,

    #[arg(long, env = "MEDIA_SEARCH_FFMPEG", default_value = DEFAULT_FFMPEG)]
    ffmpeg: PathBuf,

    #[arg(long, env = "MEDIA_SEARCH_FFPROBE", default_value = DEFAULT_FFPROBE)]
    ffprobe: PathBuf,
}

impl Cli {
    fn config(&self) -> SearchConfig {
        SearchConfig {
            embed_base_url: self.embed_url.clone(),
            embed_model: self.embed_model.clone(),
            expected_dim: self.embed_dim,
            timeout_secs: self.embed_timeout,
            frames_per_video: self.frames_per_video,
            ffmpeg_path: self.ffmpeg.clone(),
            ffprobe_path: self.ffprobe.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli).await
}

async fn run(cli: &Cli) -> Result<()> {
    if let Err(e) = MediaScanner::new().validate_root(&cli.media_folder) {
        println!("Error: {e}");
        return Ok(());
    }
    let config = cli.config();

    info!("[embed] connecting to '{}' at {}", config.embed_model, config.embed_base_url);
    let client = EmbedderClient::new(
        config.embed_base_url.clone(),
        config.embed_model.clone(),
        config.expected_dim,
    )?
    .with_timeout_secs(config.timeout_secs)?
    .connect()
    .await
    .context("failed to load embedding model")?;
    let adapter = match config.expected_dim {
        Some(dim) => EmbeddingAdapter::with_dimensions(client, dim),
        None => EmbeddingAdapter::new(client),
    };

    let backend = FfmpegBackend::new(&config.ffmpeg_path, &config.ffprobe_path);
    let store = JsonIndexStore::default();
    let builder = IndexBuilder::new(&adapter, &backend, &store, config.frames_per_video)
        .with_progress(!cli.json);

    let outcome = builder
        .build_or_load_index(&cli.media_folder, cli.reindex)
        .await
        .context("indexing failed")?;
    if outcome.source == IndexSource::Built {
        debug!("[index] fresh index for {}", cli.media_folder.display());
    }
    if outcome.index.is_empty() {
        println!(
            "No media items were indexed. Ensure your media folder is not empty and contains supported file types."
        );
        return Ok(());
    }

    info!("[search] searching for '{}'", cli.query);
    let results = inference::search(&cli.query, &outcome.index, &adapter, cli.top_k)
        .await
        .context("search failed")?;

    if cli.json {
        println!("{}", terminal::render_json(&results)?);
    } else {
        print!("{}", terminal::render_text(&cli.query, &results));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_underscore_flag_names() {
        let cli = Cli::try_parse_from([
            "media-search",
            "--media_folder",
            "/tmp/media",
            "--query",
            "a red car",
            "--top_k",
            "3",
            "--reindex",
        ])
        .unwrap();
        assert_eq!(cli.media_folder, PathBuf::from("/tmp/media"));
        assert_eq!(cli.query, "a red car");
        assert_eq!(cli.top_k, 3);
        assert!(cli.reindex);
        assert_eq!(cli.frames_per_video, FRAMES_PER_VIDEO);
    }

    #[test]
    fn defaults_and_required_flags() {
        let cli =
            Cli::try_parse_from(["media-search", "--media_folder", ".", "--query", "q"]).unwrap();
        assert_eq!(cli.top_k, DEFAULT_TOP_K);
        assert!(!cli.reindex);
        assert!(!cli.json);

        assert!(Cli::try_parse_from(["media-search", "--query", "q"]).is_err());
        assert!(Cli::try_parse_from(["media-search", "--media_folder", "."]).is_err());
    }

    #[test]
    fn top_k_must_be_positive() {
        assert!(
            Cli::try_parse_from([
                "media-search",
                "--media_folder",
                ".",
                "--query",
                "q",
                "--top_k",
                "0"
            ])
            .is_err()
        );
    }

    #[test]
    fn cli_flags_flow_into_config() {
        let cli = Cli::try_parse_from([
            "media-search",
            "--media_folder",
            ".",
            "--query",
            "q",
            "--embed_dim",
            "512",
            "--frames_per_video",
            "3",
        ])
        .unwrap();
        let config = cli.config();
        assert_eq!(config.expected_dim, Some(512));
        assert_eq!(config.frames_per_video, 3);
    }
}
