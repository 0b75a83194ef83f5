// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Stream constants
pub mod stream {
    /// Frame rate requested from every camera stream
    pub const DEFAULT_FRAME_RATE: u32 = 30;
}

/// Session timing constants
pub mod timing {
    use super::Duration;

    /// How long a "still searching" UI state may persist before the scan times out
    pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

    /// Minimum on-screen time for regular guidance states
    pub const GUIDANCE_MIN_DURATION: Duration = Duration::from_millis(1000);

    /// Minimum on-screen time for framing and occlusion errors
    pub const ERROR_MIN_DURATION: Duration = Duration::from_millis(1500);

    /// Pause between sides, long enough for the flip animation to play
    pub const SIDE_CAPTURED_MIN_DURATION: Duration = Duration::from_millis(2000);

    /// Pause before the final result is fetched
    pub const DOCUMENT_CAPTURED_MIN_DURATION: Duration = Duration::from_millis(1000);

    /// Log every Nth delivered frame at info level
    pub const FRAME_LOG_INTERVAL: u64 = 30;
}

/// Virtual camera defaults
pub mod virtual_camera {
    use super::Duration;

    /// Time between two rendered frames on the virtual sink (~30fps)
    pub const FRAME_INTERVAL: Duration = Duration::from_millis(33);

    /// Size of the synthetic frames produced by the virtual sink
    pub const FRAME_WIDTH: u32 = 64;
    pub const FRAME_HEIGHT: u32 = 48;
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }

    /// Directory name used under the platform config dir
    pub const CONFIG_DIR_NAME: &str = "document-capture";

    /// Config file name inside [`CONFIG_DIR_NAME`]
    pub const CONFIG_FILE_NAME: &str = "config.json";
}
