// SPDX-License-Identifier: GPL-3.0-only

//! UI state resolution
//!
//! Maps a [`FrameAnalysisResult`] to one of a fixed set of [`UiStateKey`]s.
//! Rules are checked in priority order and the first match wins:
//!
//! 1. Terminal states (document captured, side captured)
//! 2. Low quality input while searching (front/back)
//! 3. Searching (front/back)
//! 4. Wrong side
//! 5. Barcode scanning
//! 6. Framing problems (angle, too close, too far, frame edge)
//! 7. Occlusion (blur, glare, not fully visible)
//! 8. Processing (front/back)
//! 9. Fallback: [`UiStateKey::SensingFront`]

use crate::constants::timing;
use crate::frame_processor::{CaptureState, FrameAnalysisResult, FramingStatus};
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;

/// Key of a UI state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiStateKey {
    Processing,
    SideCaptured,
    DocumentCaptured,
    SensingFront,
    SensingBack,
    LowQualityFront,
    LowQualityBack,
    DocumentFramingCameraTooFar,
    DocumentFramingCameraTooClose,
    DocumentFramingCameraAngleTooSteep,
    DocumentTooCloseToFrameEdge,
    BlurDetected,
    GlareDetected,
    Occluded,
    ScanBarcode,
    WrongSide,
}

impl UiStateKey {
    pub const ALL: [UiStateKey; 16] = [
        UiStateKey::Processing,
        UiStateKey::SideCaptured,
        UiStateKey::DocumentCaptured,
        UiStateKey::SensingFront,
        UiStateKey::SensingBack,
        UiStateKey::LowQualityFront,
        UiStateKey::LowQualityBack,
        UiStateKey::DocumentFramingCameraTooFar,
        UiStateKey::DocumentFramingCameraTooClose,
        UiStateKey::DocumentFramingCameraAngleTooSteep,
        UiStateKey::DocumentTooCloseToFrameEdge,
        UiStateKey::BlurDetected,
        UiStateKey::GlareDetected,
        UiStateKey::Occluded,
        UiStateKey::ScanBarcode,
        UiStateKey::WrongSide,
    ];

    /// The user is still looking for the document
    ///
    /// Low quality variants count as searching for scan timeout purposes.
    pub fn is_searching(&self) -> bool {
        matches!(
            self,
            UiStateKey::SensingFront
                | UiStateKey::SensingBack
                | UiStateKey::LowQualityFront
                | UiStateKey::LowQualityBack
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UiStateKey::Processing => "PROCESSING",
            UiStateKey::SideCaptured => "SIDE_CAPTURED",
            UiStateKey::DocumentCaptured => "DOCUMENT_CAPTURED",
            UiStateKey::SensingFront => "SENSING_FRONT",
            UiStateKey::SensingBack => "SENSING_BACK",
            UiStateKey::LowQualityFront => "LOW_QUALITY_FRONT",
            UiStateKey::LowQualityBack => "LOW_QUALITY_BACK",
            UiStateKey::DocumentFramingCameraTooFar => "DOCUMENT_FRAMING_CAMERA_TOO_FAR",
            UiStateKey::DocumentFramingCameraTooClose => "DOCUMENT_FRAMING_CAMERA_TOO_CLOSE",
            UiStateKey::DocumentFramingCameraAngleTooSteep => {
                "DOCUMENT_FRAMING_CAMERA_ANGLE_TOO_STEEP"
            }
            UiStateKey::DocumentTooCloseToFrameEdge => "DOCUMENT_TOO_CLOSE_TO_FRAME_EDGE",
            UiStateKey::BlurDetected => "BLUR_DETECTED",
            UiStateKey::GlareDetected => "GLARE_DETECTED",
            UiStateKey::Occluded => "OCCLUDED",
            UiStateKey::ScanBarcode => "SCAN_BARCODE",
            UiStateKey::WrongSide => "WRONG_SIDE",
        }
    }
}

impl std::fmt::Display for UiStateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reticle shown for a UI state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReticleType {
    Searching,
    Processing,
    Error,
    Done,
    Flip,
}

/// One entry of the UI state table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UiState {
    pub key: UiStateKey,
    pub reticle: ReticleType,
    /// Minimum time the state stays on screen
    #[serde(rename = "min_duration_ms", serialize_with = "serialize_millis")]
    pub min_duration: Duration,
    /// Shown once, never re-emitted while it is current
    pub single_emit: bool,
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

impl UiState {
    /// Look up the static table entry for a key
    pub fn for_key(key: UiStateKey) -> Self {
        let (reticle, min_duration, single_emit) = match key {
            UiStateKey::Processing | UiStateKey::ScanBarcode => {
                (ReticleType::Processing, timing::GUIDANCE_MIN_DURATION, false)
            }
            UiStateKey::SideCaptured => {
                (ReticleType::Flip, timing::SIDE_CAPTURED_MIN_DURATION, true)
            }
            UiStateKey::DocumentCaptured => {
                (ReticleType::Done, timing::DOCUMENT_CAPTURED_MIN_DURATION, true)
            }
            UiStateKey::LowQualityFront
            | UiStateKey::LowQualityBack
            | UiStateKey::SensingFront
            | UiStateKey::SensingBack => {
                (ReticleType::Searching, timing::GUIDANCE_MIN_DURATION, false)
            }
            UiStateKey::DocumentFramingCameraTooFar
            | UiStateKey::DocumentFramingCameraTooClose
            | UiStateKey::DocumentFramingCameraAngleTooSteep
            | UiStateKey::DocumentTooCloseToFrameEdge
            | UiStateKey::BlurDetected
            | UiStateKey::GlareDetected
            | UiStateKey::Occluded
            | UiStateKey::WrongSide => (ReticleType::Error, timing::ERROR_MIN_DURATION, false),
        };

        Self {
            key,
            reticle,
            min_duration,
            single_emit,
        }
    }
}

impl From<UiStateKey> for UiState {
    fn from(key: UiStateKey) -> Self {
        UiState::for_key(key)
    }
}

/// Resolve the UI state key for one frame
pub fn resolve_ui_state_key(frame: &FrameAnalysisResult) -> UiStateKey {
    use CaptureState::*;

    let capture = &frame.capture_state;
    let framing = frame.framing_status;
    let searching = framing == FramingStatus::NoDocument
        && frame.blur_detected == Some(false)
        && frame.glare_detected == Some(false);
    let low_quality = searching && frame.low_quality_input == Some(true);

    match capture {
        DocumentCaptured => return UiStateKey::DocumentCaptured,
        SideCaptured => return UiStateKey::SideCaptured,
        FirstSideCaptureInProgress if low_quality => return UiStateKey::LowQualityFront,
        SecondSideCaptureInProgress if low_quality => return UiStateKey::LowQualityBack,
        FirstSideCaptureInProgress if searching => return UiStateKey::SensingFront,
        SecondSideCaptureInProgress if searching => return UiStateKey::SensingBack,
        _ => {}
    }

    if frame.scanning_wrong_side == Some(true) {
        return UiStateKey::WrongSide;
    }
    if *capture == BarcodeScanningInProgress {
        return UiStateKey::ScanBarcode;
    }

    match framing {
        FramingStatus::CameraAngleTooSteep => return UiStateKey::DocumentFramingCameraAngleTooSteep,
        FramingStatus::CameraTooClose => return UiStateKey::DocumentFramingCameraTooClose,
        FramingStatus::CameraTooFar => return UiStateKey::DocumentFramingCameraTooFar,
        FramingStatus::DocumentTooCloseToFrameEdge => {
            return UiStateKey::DocumentTooCloseToFrameEdge;
        }
        _ => {}
    }

    if frame.blur_detected == Some(true) {
        return UiStateKey::BlurDetected;
    }
    if frame.glare_detected == Some(true) {
        return UiStateKey::GlareDetected;
    }
    if framing == FramingStatus::DocumentNotFullyVisible {
        return UiStateKey::Occluded;
    }

    match (capture, framing) {
        (FirstSideCaptureInProgress | SecondSideCaptureInProgress, FramingStatus::Ok) => {
            UiStateKey::Processing
        }
        _ => UiStateKey::SensingFront,
    }
}
