// SPDX-License-Identifier: GPL-3.0-only

//! Recognition worker boundary
//!
//! The recognition engine is opaque and synchronous. The worker runs it on
//! the blocking thread pool, wires the detection metadata into the
//! converter and enforces the init/terminate protocol. Callers keep at most
//! one request outstanding.
//!
//! The engine sits behind an async lock that is held for a whole
//! recognition pass. The converter latches and the configuration have their
//! own short-lived locks, so clearing latches never waits on a pass.

use super::converter::FrameResultConverter;
use super::settings::{RecognizerSettings, ScanningMode, SettingsUpdate};
use super::types::{DetectionStatus, DocumentQuad, DocumentResult, FrameAnalysisResult, RecognizerResult};
use crate::backends::camera::{CameraFrame, ImageOrientation};
use crate::errors::{RecognitionError, RecognitionResult};
use image::RgbaImage;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Kind of image handed to the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Frame from a live video stream
    VideoFrame,
    /// Single still image
    StillImage,
}

/// One recognition request
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub image: Arc<RgbaImage>,
    pub orientation: ImageOrientation,
    pub input: InputKind,
}

impl RecognitionRequest {
    pub fn from_frame(frame: &CameraFrame) -> Self {
        Self {
            image: Arc::clone(&frame.image),
            orientation: frame.orientation,
            input: InputKind::VideoFrame,
        }
    }

    pub fn still_image(image: RgbaImage, orientation: ImageOrientation) -> Self {
        Self {
            image: Arc::new(image),
            orientation,
            input: InputKind::StillImage,
        }
    }
}

/// What the engine reports for one processed image
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub result: RecognizerResult,
    /// Detection status from the metadata channel (`Failed` when silent)
    pub detection_status: DetectionStatus,
    pub quad: Option<DocumentQuad>,
    /// The barcode-scanning-started metadata signal fired during this pass
    pub barcode_scanning_started: bool,
}

/// Opaque recognition engine
pub trait RecognitionEngine: Send {
    /// Run recognition on one image
    fn process_image(&mut self, request: &RecognitionRequest) -> RecognitionResult<EngineOutput>;

    /// Accumulated result of the current session
    fn result(&self) -> RecognizerResult;

    /// Start a new recognition session
    fn reset(&mut self);

    /// Switch between the single-side and multi-side recognizer
    fn select_scanning_mode(&mut self, mode: ScanningMode);

    /// Replace the recognizer configuration
    fn apply_settings(&mut self, settings: &RecognizerSettings);
}

enum EngineSlot {
    Uninitialized,
    Ready(Box<dyn RecognitionEngine>),
    Terminated,
}

impl EngineSlot {
    fn engine(&mut self) -> RecognitionResult<&mut Box<dyn RecognitionEngine>> {
        match self {
            EngineSlot::Ready(engine) => Ok(engine),
            EngineSlot::Uninitialized => Err(RecognitionError::NotInitialized),
            EngineSlot::Terminated => Err(RecognitionError::ActiveRecognizerMissing),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct EngineConfig {
    mode: ScanningMode,
    settings: RecognizerSettings,
}

/// Handle to the recognition worker
///
/// Cheap to clone; clones share the same engine.
#[derive(Clone)]
pub struct RecognitionWorker {
    slot: Arc<tokio::sync::Mutex<EngineSlot>>,
    converter: Arc<Mutex<FrameResultConverter>>,
    config: Arc<Mutex<EngineConfig>>,
}

impl Default for RecognitionWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl RecognitionWorker {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(tokio::sync::Mutex::new(EngineSlot::Uninitialized)),
            converter: Arc::new(Mutex::new(FrameResultConverter::new())),
            config: Arc::new(Mutex::new(EngineConfig::default())),
        }
    }

    /// Worker whose engine will start with `settings` instead of the defaults
    pub fn with_settings(settings: RecognizerSettings) -> Self {
        let worker = Self::new();
        worker.config.lock().settings = settings;
        worker
    }

    /// Install the engine and start a fresh session
    ///
    /// The engine is configured with the current scanning mode and settings.
    pub async fn initialize(&self, mut engine: Box<dyn RecognitionEngine>) {
        let config = self.config.lock().clone();
        engine.select_scanning_mode(config.mode);
        engine.apply_settings(&config.settings);

        let mut slot = self.slot.lock().await;
        *slot = EngineSlot::Ready(engine);
        self.converter.lock().reset();
        info!(mode = %config.mode, "Recognition worker initialized");
    }

    pub async fn is_initialized(&self) -> bool {
        matches!(*self.slot.lock().await, EngineSlot::Ready(_))
    }

    pub fn scanning_mode(&self) -> ScanningMode {
        self.config.lock().mode
    }

    pub fn settings(&self) -> RecognizerSettings {
        self.config.lock().settings.clone()
    }

    /// Choose the recognizer for the next images
    ///
    /// May be called before [`initialize`](Self::initialize); the mode is
    /// applied to the engine once it is installed.
    pub async fn select_scanning_mode(&self, mode: ScanningMode) {
        let mut slot = self.slot.lock().await;
        self.config.lock().mode = mode;
        if let EngineSlot::Ready(engine) = &mut *slot {
            engine.select_scanning_mode(mode);
        }
        debug!(%mode, "Scanning mode selected");
    }

    /// Merge `update` into the current settings and reconfigure the engine
    ///
    /// Starts over from clean converter latches.
    pub async fn update_settings(&self, update: SettingsUpdate) -> RecognitionResult<RecognizerSettings> {
        let mut slot = self.slot.lock().await;
        let engine = slot.engine()?;

        self.converter.lock().reset();
        let settings = {
            let mut config = self.config.lock();
            config.settings = config.settings.merged(&update);
            config.settings.clone()
        };
        engine.apply_settings(&settings);
        debug!(?settings, "Recognizer settings updated");
        Ok(settings)
    }

    /// Process one image and convert the output to a frame analysis result
    pub async fn process_frame(
        &self,
        request: RecognitionRequest,
    ) -> RecognitionResult<FrameAnalysisResult> {
        let converter = Arc::clone(&self.converter);
        self.run_blocking(move |slot| {
            let output = slot.engine()?.process_image(&request)?;

            let mut converter = converter.lock();
            if output.barcode_scanning_started {
                debug!("Barcode scanning started");
                converter.mark_barcode_scanning_started();
            }

            Ok(converter.convert(&output.result, output.detection_status, output.quad))
        })
        .await
    }

    /// Recognize a single still image
    pub async fn process_still_image(
        &self,
        image: RgbaImage,
        orientation: ImageOrientation,
    ) -> RecognitionResult<FrameAnalysisResult> {
        self.process_frame(RecognitionRequest::still_image(image, orientation))
            .await
    }

    /// Accumulated result of the current session
    pub async fn get_result(&self) -> RecognitionResult<DocumentResult> {
        let mut slot = self.slot.lock().await;
        Ok(DocumentResult::from(slot.engine()?.result()))
    }

    /// Clear converter latches and engine state for a new session
    pub async fn reset_session(&self) -> RecognitionResult<()> {
        let converter = Arc::clone(&self.converter);
        self.run_blocking(move |slot| {
            slot.engine()?.reset();
            converter.lock().reset();
            debug!("Scanning session reset");
            Ok(())
        })
        .await
    }

    /// Clear converter latches only
    pub fn reset_latches(&self) {
        self.converter.lock().reset();
    }

    /// Drop the engine; later calls fail with `ActiveRecognizerMissing`
    pub async fn terminate(&self) {
        let mut slot = self.slot.lock().await;
        if matches!(*slot, EngineSlot::Ready(_)) {
            info!("Recognition worker terminated");
        } else {
            warn!("Terminating a recognition worker that was not running");
        }
        *slot = EngineSlot::Terminated;
    }

    async fn run_blocking<T, F>(&self, f: F) -> RecognitionResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut EngineSlot) -> RecognitionResult<T> + Send + 'static,
    {
        let mut slot = Arc::clone(&self.slot).lock_owned().await;
        tokio::task::spawn_blocking(move || f(&mut *slot))
            .await
            .map_err(|e| RecognitionError::WorkerFailed(e.to_string()))?
    }
}
