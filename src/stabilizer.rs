// SPDX-License-Identifier: GPL-3.0-only

//! Feedback stabilizer contract
//!
//! The stabilizer debounces raw UI state keys into the state actually shown
//! to the user. The capture session only relies on this contract; the
//! debounce algorithm is up to the implementation.

use crate::ui_state::{UiState, UiStateKey};

/// Debounces raw UI state keys
pub trait FeedbackStabilizer: Send {
    /// Feed a raw key and get the state to display
    ///
    /// The returned state's key is always one of the keys fed so far, or
    /// the initial key after a reset.
    fn get_new_ui_state(&mut self, key: UiStateKey) -> UiState;

    /// State currently displayed
    fn current_state(&self) -> UiState;

    /// Forget history and go back to the initial state
    fn reset(&mut self);
}

/// Stabilizer that displays every key as soon as it arrives
#[derive(Debug, Clone)]
pub struct PassthroughStabilizer {
    initial: UiStateKey,
    current: UiState,
}

impl PassthroughStabilizer {
    pub fn new() -> Self {
        Self::with_initial(UiStateKey::SensingFront)
    }

    pub fn with_initial(initial: UiStateKey) -> Self {
        Self {
            initial,
            current: UiState::for_key(initial),
        }
    }
}

impl Default for PassthroughStabilizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackStabilizer for PassthroughStabilizer {
    fn get_new_ui_state(&mut self, key: UiStateKey) -> UiState {
        self.current = UiState::for_key(key);
        self.current
    }

    fn current_state(&self) -> UiState {
        self.current
    }

    fn reset(&mut self) {
        self.current = UiState::for_key(self.initial);
    }
}
