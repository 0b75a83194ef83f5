// SPDX-License-Identifier: GPL-3.0-only

//! Scripted recognition engine
//!
//! Plays back a fixed sequence of recognizer outputs, one per processed
//! image. The last step repeats once the script is exhausted. Used by the
//! simulation CLI and the tests.
//!
//! In single-side mode every step is reported as a single-side result, and
//! disabled quality filters clear the corresponding image analysis flags.

use super::settings::{RecognizerSettings, ScanningMode};
use super::types::{
    DetectionStatus, DocumentQuad, ImageAnalysisResult, ProcessingStatus, RecognizerResult,
    RecognizerResultState,
};
use super::worker::{EngineOutput, RecognitionEngine, RecognitionRequest};
use crate::errors::{InvariantError, RecognitionError, RecognitionResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

/// One scripted recognizer pass
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptStep {
    pub state: RecognizerResultState,
    pub processing_status: ProcessingStatus,
    /// `None` for single-side documents
    pub first_side_done: Option<bool>,
    pub front: ImageAnalysisResult,
    pub back: ImageAnalysisResult,
    pub detection_status: DetectionStatus,
    pub quad: Option<DocumentQuad>,
    pub barcode_scanning_started: bool,
    pub fields: Vec<(String, String)>,
}

impl ScriptStep {
    fn multi_side(
        state: RecognizerResultState,
        processing_status: ProcessingStatus,
        first_side_done: bool,
        detection_status: DetectionStatus,
    ) -> Self {
        Self {
            state,
            processing_status,
            first_side_done: Some(first_side_done),
            front: ImageAnalysisResult::clean(),
            back: ImageAnalysisResult::clean(),
            detection_status,
            quad: None,
            barcode_scanning_started: false,
            fields: Vec::new(),
        }
    }

    /// No document in frame
    pub fn searching(first_side_done: bool) -> Self {
        Self::multi_side(
            RecognizerResultState::Empty,
            ProcessingStatus::DetectionFailed,
            first_side_done,
            DetectionStatus::Failed,
        )
    }

    /// Image too poor to even detect a document
    pub fn low_quality(first_side_done: bool) -> Self {
        Self::multi_side(
            RecognizerResultState::Empty,
            ProcessingStatus::ImagePreprocessingFailed,
            first_side_done,
            DetectionStatus::Failed,
        )
    }

    /// Document found with a framing problem
    pub fn framing(first_side_done: bool, detection_status: DetectionStatus) -> Self {
        Self::multi_side(
            RecognizerResultState::Uncertain,
            ProcessingStatus::Success,
            first_side_done,
            detection_status,
        )
    }

    /// Document well framed, fields being read
    pub fn processing(first_side_done: bool) -> Self {
        Self::framing(first_side_done, DetectionStatus::Success)
    }

    /// Document well framed but blurry on the current side
    pub fn blurred(first_side_done: bool) -> Self {
        let mut step = Self::processing(first_side_done);
        if first_side_done {
            step.back = ImageAnalysisResult::blurred();
        } else {
            step.front = ImageAnalysisResult::blurred();
        }
        step
    }

    /// The other side of the document is being shown
    pub fn wrong_side(first_side_done: bool) -> Self {
        Self::multi_side(
            RecognizerResultState::Uncertain,
            ProcessingStatus::ScanningWrongSide,
            first_side_done,
            DetectionStatus::Success,
        )
    }

    /// The camera is still moving
    pub fn stability_test_failed(first_side_done: bool) -> Self {
        Self::multi_side(
            RecognizerResultState::Uncertain,
            ProcessingStatus::StabilityTestFailed,
            first_side_done,
            DetectionStatus::Success,
        )
    }

    /// First side of a two-sided document complete
    pub fn side_captured() -> Self {
        Self::multi_side(
            RecognizerResultState::StageValid,
            ProcessingStatus::AwaitingOtherSide,
            true,
            DetectionStatus::Success,
        )
    }

    /// Whole document complete
    pub fn document_captured(multi_side: bool) -> Self {
        let mut step = Self::multi_side(
            RecognizerResultState::Valid,
            ProcessingStatus::Success,
            true,
            DetectionStatus::Success,
        );
        if !multi_side {
            step.first_side_done = None;
        }
        step.with_field("document_number", "123456789")
            .with_field("first_name", "JANE")
            .with_field("last_name", "DOE")
    }

    /// Document recognized but not scannable with this setup
    pub fn unsupported(processing_status: ProcessingStatus) -> Self {
        Self::multi_side(
            RecognizerResultState::Uncertain,
            processing_status,
            false,
            DetectionStatus::Success,
        )
    }

    pub fn barcode_started(mut self) -> Self {
        self.barcode_scanning_started = true;
        self
    }

    pub fn with_quad(mut self, quad: DocumentQuad) -> Self {
        self.quad = Some(quad);
        self
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    fn build(
        &self,
        mode: ScanningMode,
        settings: &RecognizerSettings,
    ) -> Result<RecognizerResult, InvariantError> {
        let filter = |analysis: ImageAnalysisResult| ImageAnalysisResult {
            blur_detected: analysis.blur_detected && settings.enable_blur_filter,
            glare_detected: analysis.glare_detected && settings.enable_glare_filter,
        };
        let front = filter(self.front);

        let result = match (mode, self.first_side_done) {
            (ScanningMode::MultiSide, Some(first_side_done)) => RecognizerResult::multi_side(
                self.state,
                self.processing_status,
                first_side_done,
                front,
                filter(self.back),
            )?,
            _ => RecognizerResult::single_side(self.state, self.processing_status, front),
        };

        Ok(self
            .fields
            .iter()
            .fold(result, |result, (name, value)| result.with_field(name, value)))
    }
}

/// Canned scanning sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Front side, flip, back side, done
    TwoSided,
    /// Single-side document
    SingleSide,
    /// The document never shows up
    Timeout,
    /// The document class is not supported
    Unsupported,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::TwoSided,
        Scenario::SingleSide,
        Scenario::Timeout,
        Scenario::Unsupported,
    ];

    /// Recognizer the scenario is written for
    pub fn scanning_mode(&self) -> ScanningMode {
        match self {
            Scenario::SingleSide => ScanningMode::SingleSide,
            _ => ScanningMode::MultiSide,
        }
    }

    pub fn script(&self) -> Vec<ScriptStep> {
        let mut steps = Vec::new();
        match self {
            Scenario::TwoSided => {
                steps.extend(std::iter::repeat_n(ScriptStep::searching(false), 3));
                steps.extend(std::iter::repeat_n(
                    ScriptStep::framing(false, DetectionStatus::CameraTooFar),
                    2,
                ));
                steps.extend(std::iter::repeat_n(ScriptStep::processing(false), 2));
                steps.push(ScriptStep::side_captured());
                steps.extend(std::iter::repeat_n(ScriptStep::searching(true), 3));
                steps.extend(std::iter::repeat_n(ScriptStep::processing(true), 2));
                steps.push(ScriptStep::document_captured(true));
            }
            Scenario::SingleSide => {
                let mut searching = ScriptStep::searching(false);
                searching.first_side_done = None;
                let mut processing = ScriptStep::processing(false);
                processing.first_side_done = None;

                steps.extend(std::iter::repeat_n(searching, 2));
                steps.extend(std::iter::repeat_n(processing, 2));
                steps.push(ScriptStep::document_captured(false));
            }
            Scenario::Timeout => steps.push(ScriptStep::searching(false)),
            Scenario::Unsupported => {
                steps.extend(std::iter::repeat_n(ScriptStep::searching(false), 2));
                steps.push(ScriptStep::unsupported(ProcessingStatus::UnsupportedClass));
            }
        }
        steps
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Scenario::TwoSided => "two-sided",
            Scenario::SingleSide => "single-side",
            Scenario::Timeout => "timeout",
            Scenario::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.to_string() == s)
            .ok_or_else(|| format!("unknown scenario: {s}"))
    }
}

/// Engine replaying a script
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    steps: Vec<ScriptStep>,
    position: usize,
    last_result: Option<RecognizerResult>,
    processing_delay: Duration,
    mode: ScanningMode,
    settings: RecognizerSettings,
}

impl ScriptedEngine {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            position: 0,
            last_result: None,
            processing_delay: Duration::ZERO,
            mode: ScanningMode::default(),
            settings: RecognizerSettings::default(),
        }
    }

    pub fn for_scenario(scenario: Scenario) -> Self {
        Self::new(scenario.script())
    }

    /// Block for this long on every image, like a real recognizer would
    pub fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }
}

impl RecognitionEngine for ScriptedEngine {
    fn process_image(&mut self, request: &RecognitionRequest) -> RecognitionResult<EngineOutput> {
        let Some(last) = self.steps.len().checked_sub(1) else {
            return Err(RecognitionError::WorkerFailed("empty recognition script".into()));
        };

        let step = &self.steps[self.position.min(last)];
        self.position += 1;

        trace!(
            position = self.position,
            width = request.image.width(),
            input = ?request.input,
            mode = %self.mode,
            state = ?step.state,
            "Scripted recognition pass"
        );

        let result = step
            .build(self.mode, &self.settings)
            .map_err(|e| RecognitionError::WorkerFailed(e.to_string()))?;
        let output = EngineOutput {
            result: result.clone(),
            detection_status: step.detection_status,
            quad: step.quad,
            barcode_scanning_started: step.barcode_scanning_started,
        };
        self.last_result = Some(result);

        if !self.processing_delay.is_zero() {
            std::thread::sleep(self.processing_delay);
        }

        Ok(output)
    }

    fn result(&self) -> RecognizerResult {
        self.last_result.clone().unwrap_or_else(|| {
            RecognizerResult::single_side(
                RecognizerResultState::Empty,
                ProcessingStatus::NotScanned,
                ImageAnalysisResult::clean(),
            )
        })
    }

    fn reset(&mut self) {
        self.position = 0;
        self.last_result = None;
    }

    fn select_scanning_mode(&mut self, mode: ScanningMode) {
        self.mode = mode;
    }

    fn apply_settings(&mut self, settings: &RecognizerSettings) {
        self.settings = settings.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::ImageOrientation;
    use crate::frame_processor::worker::InputKind;
    use image::RgbaImage;
    use std::sync::Arc;

    fn request() -> RecognitionRequest {
        RecognitionRequest {
            image: Arc::new(RgbaImage::new(2, 2)),
            orientation: ImageOrientation::NoRotation,
            input: InputKind::StillImage,
        }
    }

    #[test]
    fn test_last_step_repeats() {
        let mut engine = ScriptedEngine::new(vec![
            ScriptStep::searching(false),
            ScriptStep::document_captured(false),
        ]);

        engine.process_image(&request()).unwrap();
        for _ in 0..3 {
            let output = engine.process_image(&request()).unwrap();
            assert_eq!(output.result.state(), RecognizerResultState::Valid);
        }
        assert_eq!(engine.result().fields().len(), 3);
    }

    #[test]
    fn test_invalid_step_fails_the_pass() {
        let mut step = ScriptStep::side_captured();
        step.first_side_done = Some(false);
        let mut engine = ScriptedEngine::new(vec![step]);

        assert!(matches!(
            engine.process_image(&request()),
            Err(RecognitionError::WorkerFailed(_))
        ));
    }

    #[test]
    fn test_empty_script() {
        let mut engine = ScriptedEngine::new(Vec::new());
        assert!(engine.process_image(&request()).is_err());
        assert_eq!(engine.result().processing_status(), ProcessingStatus::NotScanned);
    }

    #[test]
    fn test_single_side_mode_drops_side_tracking() {
        let mut engine = ScriptedEngine::new(vec![ScriptStep::processing(true)]);
        engine.select_scanning_mode(ScanningMode::SingleSide);

        let output = engine.process_image(&request()).unwrap();
        assert_eq!(output.result.scanning_first_side_done(), None);
    }

    #[test]
    fn test_disabled_filters_clear_flags() {
        let mut step = ScriptStep::blurred(false);
        step.front.glare_detected = true;
        let mut engine = ScriptedEngine::new(vec![step]);

        let output = engine.process_image(&request()).unwrap();
        assert!(output.result.image_analysis().blur_detected);

        engine.apply_settings(&RecognizerSettings {
            enable_blur_filter: false,
            ..Default::default()
        });
        let output = engine.process_image(&request()).unwrap();
        assert!(!output.result.image_analysis().blur_detected);
        assert!(output.result.image_analysis().glare_detected);
    }

    #[test]
    fn test_scenario_names() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.to_string().parse::<Scenario>(), Ok(scenario));
            assert!(!scenario.script().is_empty());
        }
    }
}
