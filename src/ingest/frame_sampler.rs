//! frame_sampler.rs
//!
//! Picks `count` timestamps evenly spaced over the interior of a clip,
//! `duration * i / (count + 1)` for `i = 1..=count`, and decodes a frame at each.
//! The first and last instants are never sampled.
//!
//! A clip with no usable duration yields no frames. A frame that fails to decode
//! is logged and skipped; the remaining timestamps are still attempted.

use crate::media::ffmpeg_backend::MediaBackend;
use image::DynamicImage;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub timestamp: f64,
    pub image: DynamicImage,
}

pub fn sample_timestamps(duration: f64, count: usize) -> Vec<f64> {
    if !duration.is_finite() || duration <= 0.0 || count == 0 {
        return Vec::new();
    }
    let interval = duration / (count as f64 + 1.0);
    (1..=count).map(|i| interval * i as f64).collect()
}

pub struct FrameSampler<'a, B> {
    backend: &'a B,
    count: usize,
}

impl<'a, B: MediaBackend> FrameSampler<'a, B> {
    pub fn new(backend: &'a B, count: usize) -> Self {
        Self { backend, count }
    }

    pub async fn sample(&self, video: &Path) -> Vec<SampledFrame> {
        let duration = match self.backend.probe_duration(video).await {
            Ok(Some(d)) => d,
            Ok(None) => {
                warn!("[sample] {}: could not get duration, skipping", video.display());
                return Vec::new();
            }
            Err(e) => {
                warn!("[sample] {}: probe failed: {e:#}", video.display());
                return Vec::new();
            }
        };

        let mut frames = Vec::with_capacity(self.count);
        for timestamp in sample_timestamps(duration, self.count) {
            match self.backend.decode_frame(video, timestamp).await {
                Ok(image) => frames.push(SampledFrame { timestamp, image }),
                Err(e) => warn!(
                    "[sample] {} at {timestamp:.2}s: {e:#}",
                    video.display()
                ),
            }
        }
        debug!(
            "[sample] {}: {} of {} frames decoded",
            video.display(),
            frames.len(),
            self.count
        );
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ffmpeg_backend::MediaError;
    use rstest::rstest;
    use std::cell::RefCell;

    struct FakeVideo {
        duration: Result<Option<f64>, ()>,
        failing_timestamps: Vec<f64>,
        decoded: RefCell<Vec<f64>>,
    }

    impl FakeVideo {
        fn with_duration(duration: Option<f64>) -> Self {
            Self {
                duration: Ok(duration),
                failing_timestamps: Vec::new(),
                decoded: RefCell::new(Vec::new()),
            }
        }
    }

    impl MediaBackend for FakeVideo {
        async fn probe_duration(&self, _path: &Path) -> Result<Option<f64>, MediaError> {
            self.duration
                .map_err(|_| MediaError::Probe("unreadable".into()))
        }

        async fn decode_frame(
            &self,
            _path: &Path,
            timestamp: f64,
        ) -> Result<DynamicImage, MediaError> {
            self.decoded.borrow_mut().push(timestamp);
            if self.failing_timestamps.contains(&timestamp) {
                return Err(MediaError::EmptyFrame { timestamp });
            }
            Ok(DynamicImage::new_rgb8(1, 1))
        }
    }

    #[rstest]
    #[case(10.0, 5, vec![10.0 / 6.0, 20.0 / 6.0, 30.0 / 6.0, 40.0 / 6.0, 50.0 / 6.0])]
    #[case(4.0, 1, vec![2.0])]
    #[case(3.0, 2, vec![1.0, 2.0])]
    #[case(0.0, 5, vec![])]
    #[case(-1.0, 5, vec![])]
    #[case(10.0, 0, vec![])]
    #[case(f64::NAN, 3, vec![])]
    fn interior_timestamps(#[case] duration: f64, #[case] count: usize, #[case] expected: Vec<f64>) {
        let got = sample_timestamps(duration, count);
        assert_eq!(got.len(), expected.len());
        for (g, e) in got.iter().zip(&expected) {
            assert!((g - e).abs() < 1e-9, "{g} != {e}");
        }
    }

    #[test]
    fn timestamps_strictly_increase_inside_clip() {
        let ts = sample_timestamps(10.0, 5);
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
        assert!(ts.iter().all(|t| *t > 0.0 && *t < 10.0));
    }

    #[tokio::test]
    async fn samples_five_frames() {
        let backend = FakeVideo::with_duration(Some(10.0));
        let frames = FrameSampler::new(&backend, 5).sample(Path::new("c.mp4")).await;
        assert_eq!(frames.len(), 5);
        assert!(frames.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn unknown_or_zero_duration_yields_nothing() {
        for backend in [
            FakeVideo::with_duration(None),
            FakeVideo {
                duration: Err(()),
                ..FakeVideo::with_duration(None)
            },
        ] {
            let frames = FrameSampler::new(&backend, 5).sample(Path::new("c.mp4")).await;
            assert!(frames.is_empty());
            assert!(backend.decoded.borrow().is_empty());
        }
    }

    #[tokio::test]
    async fn failed_frame_is_skipped_not_fatal() {
        let mut backend = FakeVideo::with_duration(Some(3.0));
        backend.failing_timestamps = vec![1.0];
        let frames = FrameSampler::new(&backend, 2).sample(Path::new("c.mp4")).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].timestamp, 2.0);
        assert_eq!(backend.decoded.borrow().len(), 2);
    }
}
