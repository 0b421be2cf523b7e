//! terminal.rs
//!
//! Renders ranked results for stdout, as numbered lines or as JSON.

use crate::index::entry::{EntryKind, QueryResult};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ResultRow {
    pub rank: usize,
    pub score: f32,
    pub path: String,
    pub kind: &'static str,
    pub timestamp: Option<f64>,
}

pub fn rows(results: &[QueryResult]) -> Vec<ResultRow> {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| ResultRow {
            rank: i + 1,
            score: r.score,
            path: r.entry.path().display().to_string(),
            kind: r.entry.kind().as_str(),
            timestamp: r.entry.timestamp(),
        })
        .collect()
}

pub fn render_text(query: &str, results: &[QueryResult]) -> String {
    if results.is_empty() {
        return format!("No results found for '{query}'.\n");
    }

    let mut out = format!("Found {} result(s) for '{query}':\n", results.len());
    for (i, r) in results.iter().enumerate() {
        let path = r.entry.path().display();
        let frame = match (r.entry.kind(), r.entry.timestamp()) {
            (EntryKind::VideoFrame, Some(t)) => format!(" (Frame at {t:.2}s)"),
            _ => String::new(),
        };
        out.push_str(&format!("{}. {path}{frame} (Score: {:.4})\n", i + 1, r.score));
    }
    out
}

pub fn render_json(results: &[QueryResult]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&rows(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::entry::IndexEntry;

    fn results() -> Vec<QueryResult> {
        vec![
            QueryResult {
                score: 0.31234,
                entry: IndexEntry::video_frame("/m/c.mp4", 1.666666, vec![1.0]),
            },
            QueryResult {
                score: -0.05,
                entry: IndexEntry::image("/m/a.jpg", vec![1.0]),
            },
        ]
    }

    #[test]
    fn text_lists_frames_with_timestamps() {
        let text = render_text("a red car", &results());
        assert_eq!(
            text,
            "Found 2 result(s) for 'a red car':\n\
             1. /m/c.mp4 (Frame at 1.67s) (Score: 0.3123)\n\
             2. /m/a.jpg (Score: -0.0500)\n"
        );
    }

    #[test]
    fn text_reports_no_results() {
        assert_eq!(
            render_text("cats", &[]),
            "No results found for 'cats'.\n"
        );
    }

    #[test]
    fn json_has_rank_kind_and_null_timestamp_for_images() {
        let json: serde_json::Value =
            serde_json::from_str(&render_json(&results()).unwrap()).unwrap();
        assert_eq!(json[0]["rank"], 1);
        assert_eq!(json[0]["kind"], "video_frame");
        assert_eq!(json[1]["kind"], "image");
        assert!(json[1]["timestamp"].is_null());
    }
}
