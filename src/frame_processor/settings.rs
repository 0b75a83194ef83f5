// SPDX-License-Identifier: GPL-3.0-only

//! Recognizer configuration
//!
//! Settings are replaced as a whole on the engine, but callers usually only
//! change a few fields: [`SettingsUpdate`] carries the changed fields and is
//! merged over the current [`RecognizerSettings`].

use serde::{Deserialize, Serialize};

/// Which recognizer drives the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanningMode {
    /// Only the front side is scanned
    SingleSide,
    /// Front side, flip, back side
    #[default]
    MultiSide,
}

impl std::fmt::Display for ScanningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanningMode::SingleSide => write!(f, "single-side"),
            ScanningMode::MultiSide => write!(f, "multi-side"),
        }
    }
}

impl std::str::FromStr for ScanningMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single-side" | "single" => Ok(ScanningMode::SingleSide),
            "multi-side" | "multi" => Ok(ScanningMode::MultiSide),
            other => Err(format!("unknown scanning mode: {other}")),
        }
    }
}

/// How eagerly a quality filter rejects frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrictnessLevel {
    Strict,
    #[default]
    Normal,
    Relaxed,
}

/// Full recognizer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerSettings {
    /// Report blurry frames instead of reading them
    pub enable_blur_filter: bool,
    /// Report frames with glare instead of reading them
    pub enable_glare_filter: bool,
    pub blur_strictness: StrictnessLevel,
    pub glare_strictness: StrictnessLevel,
    /// Accept documents where only the barcode could be read
    pub allow_barcode_scan_only: bool,
    /// Merge field results over consecutive frames
    pub combine_frame_results: bool,
    /// Move on to the back side even if front side checks failed
    pub allow_uncertain_front_side_scan: bool,
    /// Characters per field allowed to differ between sides
    pub max_allowed_mismatches_per_field: u32,
    /// Finish after the front side when the back side is not supported
    pub skip_unsupported_back: bool,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            enable_blur_filter: true,
            enable_glare_filter: true,
            blur_strictness: StrictnessLevel::Normal,
            glare_strictness: StrictnessLevel::Normal,
            allow_barcode_scan_only: false,
            combine_frame_results: true,
            allow_uncertain_front_side_scan: false,
            max_allowed_mismatches_per_field: 0,
            skip_unsupported_back: false,
        }
    }
}

/// Changed fields of [`RecognizerSettings`]; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsUpdate {
    pub enable_blur_filter: Option<bool>,
    pub enable_glare_filter: Option<bool>,
    pub blur_strictness: Option<StrictnessLevel>,
    pub glare_strictness: Option<StrictnessLevel>,
    pub allow_barcode_scan_only: Option<bool>,
    pub combine_frame_results: Option<bool>,
    pub allow_uncertain_front_side_scan: Option<bool>,
    pub max_allowed_mismatches_per_field: Option<u32>,
    pub skip_unsupported_back: Option<bool>,
}

impl RecognizerSettings {
    /// Current settings with the fields set in `update` replaced
    pub fn merged(&self, update: &SettingsUpdate) -> Self {
        Self {
            enable_blur_filter: update.enable_blur_filter.unwrap_or(self.enable_blur_filter),
            enable_glare_filter: update.enable_glare_filter.unwrap_or(self.enable_glare_filter),
            blur_strictness: update.blur_strictness.unwrap_or(self.blur_strictness),
            glare_strictness: update.glare_strictness.unwrap_or(self.glare_strictness),
            allow_barcode_scan_only: update
                .allow_barcode_scan_only
                .unwrap_or(self.allow_barcode_scan_only),
            combine_frame_results: update
                .combine_frame_results
                .unwrap_or(self.combine_frame_results),
            allow_uncertain_front_side_scan: update
                .allow_uncertain_front_side_scan
                .unwrap_or(self.allow_uncertain_front_side_scan),
            max_allowed_mismatches_per_field: update
                .max_allowed_mismatches_per_field
                .unwrap_or(self.max_allowed_mismatches_per_field),
            skip_unsupported_back: update
                .skip_unsupported_back
                .unwrap_or(self.skip_unsupported_back),
        }
    }
}
