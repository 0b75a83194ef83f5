// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the document capture core
//!
//! Resource, capability and protocol failures are returned as `Err` values
//! to the nearest caller. Session failures (timeouts, unsupported documents)
//! are expected, user-facing events and are delivered to error subscribers
//! as [`ProcessingError`] instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type for camera and stream operations
pub type CameraResult<T> = Result<T, CameraError>;

/// Result type for recognition worker operations
pub type RecognitionResult<T> = Result<T, RecognitionError>;

/// Main application error type
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Camera-related errors
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    /// Recognition worker errors
    #[error("Recognition error: {0}")]
    Recognition(#[from] RecognitionError),
    /// Structurally impossible state combinations
    #[error("Invariant violated: {0}")]
    Invariant(#[from] InvariantError),
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Camera-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    /// The device list handed to the selector was empty
    #[error("No cameras available")]
    NoCamerasAvailable,
    /// The selector could not reach a decision
    #[error("No camera found")]
    NoCameraFound,
    /// The OS denied or could not satisfy the stream constraints
    #[error("Camera device unavailable: {0}")]
    DeviceUnavailable(String),
    /// Camera permission was not granted
    #[error("Camera permission not given")]
    PermissionDenied,
    /// Torch requested on a device without torch support
    #[error("Torch not supported on this device")]
    TorchUnsupported,
    /// Torch is supported but the hardware call failed
    #[error("Failed to toggle torch: {0}")]
    TorchToggleFailed(String),
    /// Operation requires an active stream
    #[error("No active stream on camera {0}")]
    NoActiveStream(String),
    /// Operation requires a mounted video sink
    #[error("No video sink attached")]
    NoVideoSink,
    /// Operation requires a selected camera
    #[error("No camera selected")]
    NoCameraSelected,
    /// The sink refused to start playing (e.g. autoplay rejection)
    #[error("Failed to start playback: {0}")]
    PlaybackFailed(String),
    /// The active stream ended outside of our control (hardware disconnect)
    #[error("Camera stream ended unexpectedly")]
    StreamEnded,
    /// Other platform errors
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Recognition worker protocol errors
///
/// These are programming errors: calling into the worker before it has been
/// initialized, or after it has been terminated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    /// Worker used before `initialize`
    #[error("Recognizer not initialized")]
    NotInitialized,
    /// Worker has no engine to route requests to
    #[error("Active recognizer not initialized")]
    ActiveRecognizerMissing,
    /// The worker task failed (panicked or was cancelled)
    #[error("Recognition worker failed: {0}")]
    WorkerFailed(String),
}

/// Invariant violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    /// A state combination that must never be constructed
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Configuration loading and saving errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed
    #[error("I/O error: {0}")]
    Io(String),
    /// The config file is not valid JSON for [`crate::config::Config`]
    #[error("Parse error: {0}")]
    Parse(String),
    /// No platform config directory could be determined
    #[error("No configuration directory available")]
    NoConfigDir,
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

/// Session error delivered to error subscribers
///
/// Recoverable by user action; capture is paused before the notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "message")]
pub enum ProcessingError {
    /// No progress was made before the scan timeout elapsed
    #[error("Scan timed out")]
    Timeout,
    /// The recognizer rejected the presented document
    #[error("Unsupported document")]
    UnsupportedDocument,
    /// Anything else that interrupted processing
    #[error("{0}")]
    Other(String),
}
