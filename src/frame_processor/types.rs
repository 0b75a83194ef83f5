// SPDX-License-Identifier: GPL-3.0-only

//! Types for frame processing results
//!
//! Raw recognizer output on one side, the discrete per-frame
//! [`FrameAnalysisResult`] on the other.

use crate::errors::InvariantError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Document detection outcome reported through the detection metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionStatus {
    #[default]
    Failed,
    Success,
    CameraTooFar,
    CameraTooClose,
    CameraAngleTooSteep,
    DocumentTooCloseToCameraEdge,
    DocumentPartiallyVisible,
}

impl DetectionStatus {
    pub const ALL: [DetectionStatus; 7] = [
        DetectionStatus::Failed,
        DetectionStatus::Success,
        DetectionStatus::CameraTooFar,
        DetectionStatus::CameraTooClose,
        DetectionStatus::CameraAngleTooSteep,
        DetectionStatus::DocumentTooCloseToCameraEdge,
        DetectionStatus::DocumentPartiallyVisible,
    ];
}

/// Processing status of the last recognizer pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingStatus {
    #[default]
    Success,
    DetectionFailed,
    ImagePreprocessingFailed,
    StabilityTestFailed,
    ScanningWrongSide,
    FieldIdentificationFailed,
    MandatoryFieldMissing,
    InvalidCharactersFound,
    ImageReturnFailed,
    BarcodeRecognitionFailed,
    MrzParsingFailed,
    ClassFiltered,
    UnsupportedClass,
    UnsupportedByLicense,
    AwaitingOtherSide,
    NotScanned,
}

impl ProcessingStatus {
    /// The document type cannot be scanned with the current setup
    pub fn is_unsupported_document(&self) -> bool {
        matches!(
            self,
            ProcessingStatus::UnsupportedByLicense
                | ProcessingStatus::UnsupportedClass
                | ProcessingStatus::ClassFiltered
        )
    }
}

/// Recognizer result state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecognizerResultState {
    /// Nothing recognized
    #[default]
    Empty,
    /// Something recognized, not yet trustworthy
    Uncertain,
    /// Final side (or the whole document) complete
    Valid,
    /// An intermediate side complete
    StageValid,
}

/// Image quality analysis for one document side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageAnalysisResult {
    pub blur_detected: bool,
    pub glare_detected: bool,
}

impl ImageAnalysisResult {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn blurred() -> Self {
        Self {
            blur_detected: true,
            glare_detected: false,
        }
    }

    pub fn with_glare() -> Self {
        Self {
            blur_detected: false,
            glare_detected: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Detected document corners in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentQuad {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

/// Raw output of the recognizer for the current session
///
/// For multi-side documents `scanning_first_side_done` is `Some`. A
/// `Valid` or `StageValid` state is only constructible once the first side
/// has been marked done.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognizerResult {
    state: RecognizerResultState,
    processing_status: ProcessingStatus,
    scanning_first_side_done: Option<bool>,
    front_image_analysis: ImageAnalysisResult,
    back_image_analysis: ImageAnalysisResult,
    fields: BTreeMap<String, String>,
}

impl RecognizerResult {
    /// Result of a single-side recognizer
    pub fn single_side(
        state: RecognizerResultState,
        processing_status: ProcessingStatus,
        image_analysis: ImageAnalysisResult,
    ) -> Self {
        Self {
            state,
            processing_status,
            scanning_first_side_done: None,
            front_image_analysis: image_analysis,
            back_image_analysis: ImageAnalysisResult::default(),
            fields: BTreeMap::new(),
        }
    }

    /// Result of a multi-side recognizer
    ///
    /// # Errors
    /// `InvariantError::InvalidState` for a complete state on a document
    /// whose first side is not done.
    pub fn multi_side(
        state: RecognizerResultState,
        processing_status: ProcessingStatus,
        scanning_first_side_done: bool,
        front_image_analysis: ImageAnalysisResult,
        back_image_analysis: ImageAnalysisResult,
    ) -> Result<Self, InvariantError> {
        let complete = matches!(
            state,
            RecognizerResultState::Valid | RecognizerResultState::StageValid
        );
        if complete && !scanning_first_side_done {
            return Err(InvariantError::InvalidState(format!(
                "{state:?} result without the first side done"
            )));
        }

        Ok(Self {
            state,
            processing_status,
            scanning_first_side_done: Some(scanning_first_side_done),
            front_image_analysis,
            back_image_analysis,
            fields: BTreeMap::new(),
        })
    }

    /// Attach an extracted field
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn state(&self) -> RecognizerResultState {
        self.state
    }

    pub fn processing_status(&self) -> ProcessingStatus {
        self.processing_status
    }

    pub fn scanning_first_side_done(&self) -> Option<bool> {
        self.scanning_first_side_done
    }

    /// Whether the first side is done (always false for single-side results)
    pub fn first_side_done(&self) -> bool {
        self.scanning_first_side_done.unwrap_or(false)
    }

    /// Image analysis of the side currently being scanned
    pub fn image_analysis(&self) -> &ImageAnalysisResult {
        if self.first_side_done() {
            &self.back_image_analysis
        } else {
            &self.front_image_analysis
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

/// Discrete phase of the scanning workflow
///
/// Parsed leniently: unknown values are kept as [`CaptureState::Unrecognized`]
/// so that externally produced results still resolve to a UI state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CaptureState {
    SideCaptured,
    DocumentCaptured,
    #[default]
    FirstSideCaptureInProgress,
    SecondSideCaptureInProgress,
    BarcodeScanningInProgress,
    Unrecognized(String),
}

impl CaptureState {
    pub fn as_str(&self) -> &str {
        match self {
            CaptureState::SideCaptured => "side-captured",
            CaptureState::DocumentCaptured => "document-captured",
            CaptureState::FirstSideCaptureInProgress => "first-side-capture-in-progress",
            CaptureState::SecondSideCaptureInProgress => "second-side-capture-in-progress",
            CaptureState::BarcodeScanningInProgress => "barcode-scanning-in-progress",
            CaptureState::Unrecognized(value) => value,
        }
    }
}

impl From<String> for CaptureState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "side-captured" => CaptureState::SideCaptured,
            "document-captured" => CaptureState::DocumentCaptured,
            "first-side-capture-in-progress" => CaptureState::FirstSideCaptureInProgress,
            "second-side-capture-in-progress" => CaptureState::SecondSideCaptureInProgress,
            "barcode-scanning-in-progress" => CaptureState::BarcodeScanningInProgress,
            _ => CaptureState::Unrecognized(value),
        }
    }
}

impl From<CaptureState> for String {
    fn from(state: CaptureState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geometric quality of the document within the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FramingStatus {
    #[default]
    NoDocument,
    CameraTooFar,
    CameraTooClose,
    CameraAngleTooSteep,
    DocumentTooCloseToFrameEdge,
    DocumentNotFullyVisible,
    Ok,
}

/// Per-frame analysis produced by the converter
///
/// The optional flags are `None` when the recognizer said nothing about
/// them for this frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameAnalysisResult {
    pub capture_state: CaptureState,
    pub framing_status: FramingStatus,
    #[serde(default)]
    pub blur_detected: Option<bool>,
    #[serde(default)]
    pub glare_detected: Option<bool>,
    #[serde(default)]
    pub scanning_wrong_side: Option<bool>,
    #[serde(default)]
    pub low_quality_input: Option<bool>,
    #[serde(default)]
    pub quad: Option<DocumentQuad>,
    /// Debug information
    #[serde(default)]
    pub processing_status: ProcessingStatus,
}

/// Final scanning result delivered to result subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentResult {
    pub state: RecognizerResultState,
    pub processing_status: ProcessingStatus,
    pub multi_side: bool,
    pub fields: BTreeMap<String, String>,
    pub captured_at: DateTime<Utc>,
}

impl From<RecognizerResult> for DocumentResult {
    fn from(result: RecognizerResult) -> Self {
        Self {
            state: result.state,
            processing_status: result.processing_status,
            multi_side: result.scanning_first_side_done.is_some(),
            fields: result.fields,
            captured_at: Utc::now(),
        }
    }
}
