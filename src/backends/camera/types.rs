// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera backends

use crate::constants::stream::DEFAULT_FRAME_RATE;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Logical camera orientation
///
/// Devices whose orientation cannot be determined (most desktop webcams)
/// carry `None` wherever an `Option<FacingMode>` is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// User-facing camera (selfie)
    Front,
    /// Environment-facing camera
    Back,
}

impl FacingMode {
    /// Map a platform-reported facing value ("user" / "environment")
    pub fn from_platform(value: &str) -> Option<Self> {
        match value {
            "user" => Some(FacingMode::Front),
            "environment" => Some(FacingMode::Back),
            _ => None,
        }
    }

    /// The platform constraint value for this facing
    pub fn platform_value(&self) -> &'static str {
        match self {
            FacingMode::Front => "user",
            FacingMode::Back => "environment",
        }
    }
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::Front => write!(f, "front"),
            FacingMode::Back => write!(f, "back"),
        }
    }
}

impl std::str::FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" | "user" => Ok(FacingMode::Front),
            "back" | "rear" | "environment" => Ok(FacingMode::Back),
            other => Err(format!("unknown facing mode: {other}")),
        }
    }
}

/// Video resolution presets for the camera stream
///
/// The platform falls back to the closest available resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VideoResolution {
    /// 1280x720
    HD,
    /// 1920x1080
    #[default]
    FHD,
    /// 3840x2160
    UHD,
}

impl VideoResolution {
    /// All presets, lowest first
    pub const ALL: [VideoResolution; 3] = [
        VideoResolution::HD,
        VideoResolution::FHD,
        VideoResolution::UHD,
    ];

    /// Get (width, height) in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            VideoResolution::HD => (1280, 720),
            VideoResolution::FHD => (1920, 1080),
            VideoResolution::UHD => (3840, 2160),
        }
    }
}

impl std::fmt::Display for VideoResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (width, height) = self.dimensions();
        write!(f, "{}x{}", width, height)
    }
}

impl std::str::FromStr for VideoResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HD" | "720P" => Ok(VideoResolution::HD),
            "FHD" | "1080P" => Ok(VideoResolution::FHD),
            "UHD" | "4K" | "2160P" => Ok(VideoResolution::UHD),
            other => Err(format!("unknown resolution: {other}")),
        }
    }
}

/// Device information as reported by platform enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable device identifier
    pub device_id: String,
    /// Human-readable label (may be localized by the platform)
    pub label: String,
    /// Group identifier shared by devices of the same physical unit
    pub group_id: Option<String>,
}

/// Capabilities reported by an active video track
///
/// Some platforms only report a rudimentary subset, so every field is
/// treated as a hint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackCapabilities {
    /// Facing values reported by the track ("user", "environment")
    pub facing_modes: Vec<String>,
    /// Focus modes reported by the track ("single-shot", "continuous", ...)
    pub focus_modes: Vec<String>,
    /// Whether the track exposes a torch control
    pub torch: bool,
    /// Maximum width supported by the track
    pub max_width: Option<u32>,
    /// Maximum height supported by the track
    pub max_height: Option<u32>,
}

impl TrackCapabilities {
    /// Check whether the track reports the given facing
    pub fn reports_facing(&self, facing: FacingMode) -> bool {
        self.facing_modes
            .iter()
            .any(|value| value == facing.platform_value())
    }

    /// Check whether the track supports single-shot focus
    pub fn supports_single_shot(&self) -> bool {
        self.focus_modes.iter().any(|mode| mode == "single-shot")
    }
}

/// Constraints for acquiring a camera stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    /// Exact device to open, if any
    pub device_id: Option<String>,
    /// Ideal width
    pub width: u32,
    /// Ideal height
    pub height: u32,
    /// Ideal frame rate
    pub frame_rate: u32,
    /// Ideal facing
    pub facing: Option<FacingMode>,
}

impl StreamConstraints {
    /// Build constraints for a resolution preset
    pub fn new(
        resolution: VideoResolution,
        facing: Option<FacingMode>,
        device_id: Option<&str>,
    ) -> Self {
        let (width, height) = resolution.dimensions();
        Self {
            device_id: device_id.map(str::to_string),
            width,
            height,
            frame_rate: DEFAULT_FRAME_RATE,
            facing,
        }
    }
}

/// Orientation of the captured image contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageOrientation {
    /// Contents rotated 90 degrees left
    RotatedLeft90,
    /// Contents not rotated
    #[default]
    NoRotation,
    /// Contents rotated 90 degrees right
    RotatedRight90,
    /// Contents upside down
    Rotated180,
}

/// A single frame pulled from the video sink
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// RGBA pixels
    pub image: Arc<RgbaImage>,
    /// Orientation of the contents
    pub orientation: ImageOrientation,
    /// Sequence number assigned by the sink
    pub sequence: u64,
    /// When the frame was rendered
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Copy of the frame flipped around its vertical axis
    pub fn mirrored(&self) -> Self {
        Self {
            image: Arc::new(image::imageops::flip_horizontal(self.image.as_ref())),
            ..self.clone()
        }
    }
}

/// Playback mode of the stream lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing is playing
    #[default]
    Idle,
    /// Video is playing, frames are not delivered
    Playback,
    /// Video is playing and frames are delivered to capture callbacks
    Capturing,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Playback => write!(f, "playback"),
            PlaybackState::Capturing => write!(f, "capturing"),
        }
    }
}
