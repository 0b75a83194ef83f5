// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing
//!
//! Captured frames go to the [`RecognitionWorker`], whose raw output is
//! turned into a discrete [`FrameAnalysisResult`] by the converter.

pub mod converter;
pub mod scripted;
pub mod settings;
pub mod types;
pub mod worker;

pub use converter::{ConverterLatches, FrameResultConverter, convert_to_frame_result};
pub use scripted::{Scenario, ScriptStep, ScriptedEngine};
pub use settings::{RecognizerSettings, ScanningMode, SettingsUpdate, StrictnessLevel};
pub use types::{
    CaptureState, DetectionStatus, DocumentQuad, DocumentResult, FrameAnalysisResult,
    FramingStatus, ImageAnalysisResult, Point, ProcessingStatus, RecognizerResult,
    RecognizerResultState,
};
pub use worker::{EngineOutput, InputKind, RecognitionEngine, RecognitionRequest, RecognitionWorker};
