// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants and static tables

use document_capture::backends::camera::VideoResolution;
use document_capture::constants::timing;
use document_capture::ui_state::{ReticleType, UiState, UiStateKey};

#[test]
fn test_resolution_presets() {
    assert_eq!(VideoResolution::ALL.len(), 3);

    // Ordered from lowest to highest
    let mut previous = 0;
    for resolution in VideoResolution::ALL {
        let (width, height) = resolution.dimensions();
        assert!(width * height > previous);
        previous = width * height;
    }
}

#[test]
fn test_resolution_parsing() {
    assert_eq!("fhd".parse::<VideoResolution>(), Ok(VideoResolution::FHD));
    assert_eq!("4k".parse::<VideoResolution>(), Ok(VideoResolution::UHD));
    assert!("8k".parse::<VideoResolution>().is_err());
}

#[test]
fn test_terminal_states_use_transition_durations() {
    assert_eq!(
        UiState::for_key(UiStateKey::SideCaptured).min_duration,
        timing::SIDE_CAPTURED_MIN_DURATION
    );
    assert_eq!(
        UiState::for_key(UiStateKey::DocumentCaptured).min_duration,
        timing::DOCUMENT_CAPTURED_MIN_DURATION
    );
}

#[test]
fn test_error_states_share_duration() {
    for key in UiStateKey::ALL {
        let state = UiState::for_key(key);
        if state.reticle == ReticleType::Error {
            assert_eq!(state.min_duration, timing::ERROR_MIN_DURATION, "{key}");
        }
    }
}

#[test]
fn test_only_terminal_states_are_single_emit() {
    let single: Vec<UiStateKey> = UiStateKey::ALL
        .into_iter()
        .filter(|key| UiState::for_key(*key).single_emit)
        .collect();
    assert_eq!(single, vec![UiStateKey::SideCaptured, UiStateKey::DocumentCaptured]);
}
