// SPDX-License-Identifier: GPL-3.0-only

//! Simulated video sink rendering synthetic frames

use crate::backends::camera::{CameraFrame, ImageOrientation, MediaStream, VideoSink};
use crate::constants::virtual_camera::{FRAME_HEIGHT, FRAME_INTERVAL, FRAME_WIDTH};
use crate::errors::{CameraError, CameraResult};
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Color of the leftmost pixel column of every rendered frame
pub const LEFT_EDGE_MARKER: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Video sink producing one frame per interval while playing
pub struct VirtualVideoSink {
    source: Mutex<Option<Arc<dyn MediaStream>>>,
    playing: AtomicBool,
    reject_play: AtomicBool,
    frame_interval: Duration,
    sequence: AtomicU64,
}

impl Default for VirtualVideoSink {
    fn default() -> Self {
        Self::with_frame_interval(FRAME_INTERVAL)
    }
}

impl VirtualVideoSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame_interval(frame_interval: Duration) -> Self {
        Self {
            source: Mutex::new(None),
            playing: AtomicBool::new(false),
            reject_play: AtomicBool::new(false),
            frame_interval,
            sequence: AtomicU64::new(0),
        }
    }

    /// Reject `play()` calls, like a browser blocking autoplay
    pub fn set_reject_play(&self, reject: bool) {
        self.reject_play.store(reject, Ordering::SeqCst);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Number of frames rendered so far
    pub fn frames_rendered(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Grey frame whose shade follows the sequence number, with a red
    /// leftmost column marking the left edge
    fn render(&self) -> CameraFrame {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let shade = (sequence % 256) as u8;
        let mut image =
            RgbaImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Rgba([shade, shade, shade, 255]));
        for y in 0..FRAME_HEIGHT {
            image.put_pixel(0, y, LEFT_EDGE_MARKER);
        }
        CameraFrame {
            image: Arc::new(image),
            orientation: ImageOrientation::NoRotation,
            sequence,
            captured_at: Instant::now(),
        }
    }
}

#[async_trait]
impl VideoSink for VirtualVideoSink {
    fn set_source(&self, stream: Option<Arc<dyn MediaStream>>) {
        if stream.is_none() {
            self.playing.store(false, Ordering::SeqCst);
        }
        *self.source.lock() = stream;
    }

    fn has_source(&self) -> bool {
        self.source
            .lock()
            .as_ref()
            .is_some_and(|stream| !stream.is_stopped())
    }

    async fn play(&self) -> CameraResult<()> {
        if self.reject_play.load(Ordering::SeqCst) {
            return Err(CameraError::PlaybackFailed(
                "play() request was rejected".into(),
            ));
        }
        if !self.has_source() {
            return Err(CameraError::PlaybackFailed("no source to play".into()));
        }
        self.playing.store(true, Ordering::SeqCst);
        debug!("Virtual sink playing");
        Ok(())
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    async fn next_frame(&self) -> Option<CameraFrame> {
        if !self.is_playing() {
            return None;
        }

        tokio::time::sleep(self.frame_interval).await;

        if !self.is_playing() || !self.has_source() {
            return None;
        }
        Some(self.render())
    }
}
