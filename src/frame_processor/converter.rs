// SPDX-License-Identifier: GPL-3.0-only

//! Recognizer output to frame analysis conversion
//!
//! [`convert_to_frame_result`] is a pure transition over
//! `(latches, raw result, detection status)`. [`FrameResultConverter`]
//! owns the latches for one scanning session.

use super::types::{
    CaptureState, DetectionStatus, DocumentQuad, FrameAnalysisResult, FramingStatus,
    ProcessingStatus, RecognizerResult, RecognizerResultState,
};
use serde::Serialize;

/// Session latches carried between frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConverterLatches {
    /// Set by the barcode-scanning-started signal
    pub barcode_scanning_in_progress: bool,
    /// `side-captured` has been reported this session
    pub side_captured_emitted: bool,
}

/// Map a detection status to its framing status
pub fn framing_status_for(detection_status: DetectionStatus) -> FramingStatus {
    match detection_status {
        DetectionStatus::Failed => FramingStatus::NoDocument,
        DetectionStatus::Success => FramingStatus::Ok,
        DetectionStatus::CameraTooFar => FramingStatus::CameraTooFar,
        DetectionStatus::CameraTooClose => FramingStatus::CameraTooClose,
        DetectionStatus::CameraAngleTooSteep => FramingStatus::CameraAngleTooSteep,
        DetectionStatus::DocumentTooCloseToCameraEdge => {
            FramingStatus::DocumentTooCloseToFrameEdge
        }
        DetectionStatus::DocumentPartiallyVisible => FramingStatus::DocumentNotFullyVisible,
    }
}

/// Convert one recognizer pass into a frame analysis result
///
/// Returns the result together with the latches for the next frame.
pub fn convert_to_frame_result(
    latches: ConverterLatches,
    result: &RecognizerResult,
    detection_status: DetectionStatus,
    quad: Option<DocumentQuad>,
) -> (FrameAnalysisResult, ConverterLatches) {
    let mut next = latches;
    let processing_status = result.processing_status();

    let capture_state = match result.state() {
        RecognizerResultState::Valid => CaptureState::DocumentCaptured,
        RecognizerResultState::StageValid if !latches.side_captured_emitted => {
            next.side_captured_emitted = true;
            // A barcode on the front side is done as well
            next.barcode_scanning_in_progress = false;
            CaptureState::SideCaptured
        }
        _ if latches.barcode_scanning_in_progress => CaptureState::BarcodeScanningInProgress,
        _ if result.first_side_done() => CaptureState::SecondSideCaptureInProgress,
        _ => CaptureState::FirstSideCaptureInProgress,
    };

    let framing_status = if processing_status == ProcessingStatus::MandatoryFieldMissing {
        FramingStatus::DocumentNotFullyVisible
    } else {
        framing_status_for(detection_status)
    };

    let image_analysis = result.image_analysis();

    let low_quality_input = (processing_status == ProcessingStatus::ImagePreprocessingFailed
        && detection_status == DetectionStatus::Failed)
        .then_some(true);

    let frame_result = FrameAnalysisResult {
        capture_state,
        framing_status,
        blur_detected: Some(image_analysis.blur_detected),
        glare_detected: Some(image_analysis.glare_detected),
        scanning_wrong_side: Some(processing_status == ProcessingStatus::ScanningWrongSide),
        low_quality_input,
        quad,
        processing_status,
    };

    (frame_result, next)
}

/// Stateful converter for one scanning session
#[derive(Debug, Default)]
pub struct FrameResultConverter {
    latches: ConverterLatches,
}

impl FrameResultConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn convert(
        &mut self,
        result: &RecognizerResult,
        detection_status: DetectionStatus,
        quad: Option<DocumentQuad>,
    ) -> FrameAnalysisResult {
        let (frame_result, latches) =
            convert_to_frame_result(self.latches, result, detection_status, quad);
        self.latches = latches;
        frame_result
    }

    /// The recognizer started reading a barcode
    pub fn mark_barcode_scanning_started(&mut self) {
        self.latches.barcode_scanning_in_progress = true;
    }

    pub fn latches(&self) -> ConverterLatches {
        self.latches
    }

    /// Clear both latches for a new session
    pub fn reset(&mut self) {
        self.latches = ConverterLatches::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_processor::types::ImageAnalysisResult;

    fn multi_side(
        state: RecognizerResultState,
        status: ProcessingStatus,
        first_side_done: bool,
    ) -> RecognizerResult {
        RecognizerResult::multi_side(
            state,
            status,
            first_side_done,
            ImageAnalysisResult::clean(),
            ImageAnalysisResult::clean(),
        )
        .unwrap()
    }

    fn stage_valid() -> RecognizerResult {
        multi_side(
            RecognizerResultState::StageValid,
            ProcessingStatus::AwaitingOtherSide,
            true,
        )
    }

    #[test]
    fn test_initial_and_reset() {
        let mut converter = FrameResultConverter::new();
        assert_eq!(converter.latches(), ConverterLatches::default());

        converter.mark_barcode_scanning_started();
        converter.convert(&stage_valid(), DetectionStatus::Success, None);
        converter.reset();
        assert_eq!(converter.latches(), ConverterLatches::default());
    }

    #[test]
    fn test_waiting_for_document() {
        let result = multi_side(
            RecognizerResultState::Empty,
            ProcessingStatus::DetectionFailed,
            false,
        );
        let mut converter = FrameResultConverter::new();
        let frame = converter.convert(&result, DetectionStatus::Failed, None);

        assert_eq!(frame.capture_state, CaptureState::FirstSideCaptureInProgress);
        assert_eq!(frame.framing_status, FramingStatus::NoDocument);
        assert_eq!(frame.blur_detected, Some(false));
        assert_eq!(frame.low_quality_input, None);
    }

    #[test]
    fn test_side_captured_emitted_once() {
        let mut converter = FrameResultConverter::new();
        let first = converter.convert(&stage_valid(), DetectionStatus::Success, None);
        let second = converter.convert(&stage_valid(), DetectionStatus::Success, None);

        assert_eq!(first.capture_state, CaptureState::SideCaptured);
        assert_eq!(second.capture_state, CaptureState::SecondSideCaptureInProgress);
    }

    #[test]
    fn test_pure_step_returns_latches() {
        let latches = ConverterLatches::default();
        let (frame, next) =
            convert_to_frame_result(latches, &stage_valid(), DetectionStatus::Success, None);

        assert_eq!(frame.capture_state, CaptureState::SideCaptured);
        assert!(next.side_captured_emitted);
        // Input latches are untouched
        assert!(!latches.side_captured_emitted);
    }

    #[test]
    fn test_document_captured_repeats() {
        let valid = multi_side(RecognizerResultState::Valid, ProcessingStatus::Success, true);
        let mut converter = FrameResultConverter::new();

        for _ in 0..2 {
            let frame = converter.convert(&valid, DetectionStatus::Success, None);
            assert_eq!(frame.capture_state, CaptureState::DocumentCaptured);
        }
    }

    #[test]
    fn test_single_side_document_captured() {
        let valid = RecognizerResult::single_side(
            RecognizerResultState::Valid,
            ProcessingStatus::Success,
            ImageAnalysisResult::blurred(),
        );
        let mut converter = FrameResultConverter::new();
        let frame = converter.convert(&valid, DetectionStatus::Success, None);

        assert_eq!(frame.capture_state, CaptureState::DocumentCaptured);
        assert_eq!(frame.blur_detected, Some(true));
    }

    #[test]
    fn test_barcode_scanning_in_progress() {
        let result = multi_side(
            RecognizerResultState::Uncertain,
            ProcessingStatus::BarcodeRecognitionFailed,
            true,
        );
        let mut converter = FrameResultConverter::new();
        converter.mark_barcode_scanning_started();

        let frame = converter.convert(&result, DetectionStatus::Success, None);
        assert_eq!(frame.capture_state, CaptureState::BarcodeScanningInProgress);
    }

    #[test]
    fn test_side_captured_clears_barcode_latch() {
        let mut converter = FrameResultConverter::new();
        converter.mark_barcode_scanning_started();

        let frame = converter.convert(&stage_valid(), DetectionStatus::Success, None);
        assert_eq!(frame.capture_state, CaptureState::SideCaptured);
        assert!(!converter.latches().barcode_scanning_in_progress);
    }

    #[test]
    fn test_framing_status_for_every_detection_status() {
        let expected = [
            FramingStatus::NoDocument,
            FramingStatus::Ok,
            FramingStatus::CameraTooFar,
            FramingStatus::CameraTooClose,
            FramingStatus::CameraAngleTooSteep,
            FramingStatus::DocumentTooCloseToFrameEdge,
            FramingStatus::DocumentNotFullyVisible,
        ];
        for (detection, framing) in DetectionStatus::ALL.into_iter().zip(expected) {
            assert_eq!(framing_status_for(detection), framing);
        }
    }

    #[test]
    fn test_mandatory_field_missing_overrides_detection() {
        let result = multi_side(
            RecognizerResultState::Uncertain,
            ProcessingStatus::MandatoryFieldMissing,
            false,
        );
        let (frame, _) = convert_to_frame_result(
            ConverterLatches::default(),
            &result,
            DetectionStatus::Success,
            None,
        );
        assert_eq!(frame.framing_status, FramingStatus::DocumentNotFullyVisible);
    }

    #[test]
    fn test_low_quality_needs_both_failures() {
        let preprocessing_failed = multi_side(
            RecognizerResultState::Empty,
            ProcessingStatus::ImagePreprocessingFailed,
            false,
        );
        let mut converter = FrameResultConverter::new();

        let both = converter.convert(&preprocessing_failed, DetectionStatus::Failed, None);
        assert_eq!(both.low_quality_input, Some(true));

        let detected = converter.convert(&preprocessing_failed, DetectionStatus::Success, None);
        assert_eq!(detected.low_quality_input, None);
    }

    #[test]
    fn test_scanning_wrong_side() {
        let result = multi_side(
            RecognizerResultState::Uncertain,
            ProcessingStatus::ScanningWrongSide,
            true,
        );
        let mut converter = FrameResultConverter::new();
        let frame = converter.convert(&result, DetectionStatus::Success, None);

        assert_eq!(frame.scanning_wrong_side, Some(true));
        assert_eq!(frame.capture_state, CaptureState::SecondSideCaptureInProgress);
    }

    #[test]
    fn test_quad_is_copied() {
        let quad = DocumentQuad::default();
        let result = multi_side(RecognizerResultState::Empty, ProcessingStatus::Success, false);
        let mut converter = FrameResultConverter::new();
        let frame = converter.convert(&result, DetectionStatus::Success, Some(quad));
        assert_eq!(frame.quad, Some(quad));
    }
}
