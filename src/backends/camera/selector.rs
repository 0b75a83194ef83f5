// SPDX-License-Identifier: GPL-3.0-only

//! Best camera selection
//!
//! Browser-style platforms report camera metadata inconsistently across
//! vendors, so the ranking is heuristic:
//!
//! 1. A dual wide back camera wins outright when the back camera is wanted.
//! 2. The pool is narrowed by label keywords (falling back to all devices).
//! 3. The pool is probed in reverse enumeration order, since the
//!    last-enumerated device tends to be the primary one. Each probe starts
//!    a stream so the facing and capabilities are known.
//! 4. Without an early winner the highest-scoring candidate is used, ties
//!    going to the first maximum visited. The current leader keeps its
//!    stream open while the rest of the pool is probed, so the winner is
//!    never reopened.

use super::device::Camera;
use super::names::{is_back_camera_name, is_back_dual_wide_camera_name, is_front_camera_name};
use super::types::{FacingMode, VideoResolution};
use crate::errors::{CameraError, CameraResult};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Select the camera best suited for document capture
///
/// `requested` defaults to the back camera. On success the returned camera
/// has an active stream; every other probed camera has been stopped.
///
/// # Errors
/// * `CameraError::NoCamerasAvailable` - `cameras` is empty
/// * `CameraError::NoCameraFound` - No device matched the facing
/// * Any stream acquisition error from probing
pub async fn select_best_camera(
    cameras: &[Arc<Camera>],
    resolution: VideoResolution,
    requested: Option<FacingMode>,
) -> CameraResult<Arc<Camera>> {
    if cameras.is_empty() {
        return Err(CameraError::NoCamerasAvailable);
    }

    let requested = requested.unwrap_or(FacingMode::Back);

    if requested == FacingMode::Back
        && let Some(dual_wide) = cameras
            .iter()
            .find(|camera| is_back_dual_wide_camera_name(camera.name()))
    {
        info!(camera = %dual_wide.name(), "Selected dual wide back camera");
        dual_wide.start_stream(resolution).await?;
        return Ok(Arc::clone(dual_wide));
    }

    let mut pool: Vec<&Arc<Camera>> = cameras
        .iter()
        .filter(|camera| match requested {
            FacingMode::Front => is_front_camera_name(camera.name()),
            FacingMode::Back => is_back_camera_name(camera.name()),
        })
        .collect();

    if pool.is_empty() {
        debug!(facing = %requested, "No camera names match, probing all devices");
        pool = cameras.iter().collect();
    }

    // Highest scoring camera so far, with its stream still open
    let mut leader: Option<(&Arc<Camera>, u32)> = None;
    let release = |leader: Option<(&Arc<Camera>, u32)>| {
        if let Some((camera, _)) = leader {
            camera.stop_stream();
        }
    };

    for camera in pool.into_iter().rev() {
        if let Err(e) = camera.start_stream(resolution).await {
            release(leader);
            return Err(e);
        }

        let Some(facing) = camera.facing_mode() else {
            info!(camera = %camera.name(), "Selected camera without facing information");
            release(leader);
            return Ok(Arc::clone(camera));
        };

        if facing != requested {
            debug!(camera = %camera.name(), facing = %facing, "Skipping camera with wrong facing");
            camera.stop_stream();
            continue;
        }

        let torch = camera.torch_supported();
        let single_shot = camera.single_shot_supported();

        if torch && single_shot {
            info!(camera = %camera.name(), "Selected camera with torch and single-shot focus");
            release(leader);
            return Ok(Arc::clone(camera));
        }

        let score = u32::from(torch) + u32::from(single_shot);
        debug!(camera = %camera.name(), score, "Scored camera");

        if leader.is_none_or(|(_, best)| score > best) {
            release(leader.replace((camera, score)));
        } else {
            camera.stop_stream();
        }
    }

    let Some((winner, score)) = leader else {
        error!(facing = %requested, "Camera selection reached no decision");
        return Err(CameraError::NoCameraFound);
    };

    info!(camera = %winner.name(), score, "Selected highest scoring camera");
    Ok(Arc::clone(winner))
}
