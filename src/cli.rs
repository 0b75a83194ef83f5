// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands against the virtual camera platform
//!
//! This module provides command-line functionality for:
//! - Listing the cameras of a device profile
//! - Running camera selection
//! - Simulating a complete scanning session
//!
//! Every command prints JSON to stdout.

use document_capture::backends::camera::{
    Camera, CameraManager, CameraPreference, FacingMode, StartStreamOptions, VideoResolution,
};
use document_capture::backends::virtual_camera::{
    DeviceProfile, VirtualMediaBackend, VirtualVideoSink,
};
use document_capture::config::Config;
use document_capture::errors::ProcessingError;
use document_capture::frame_processor::{
    DocumentResult, RecognitionWorker, Scenario, ScriptedEngine,
};
use document_capture::session::CaptureSession;
use document_capture::stabilizer::PassthroughStabilizer;
use document_capture::ui_state::UiState;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Time the scripted recognizer spends on each frame
const SIMULATED_PROCESSING_TIME: Duration = Duration::from_millis(15);

#[derive(Serialize)]
struct CameraSummary {
    device_id: String,
    label: String,
    facing: Option<FacingMode>,
    streaming: bool,
    torch: bool,
    single_shot: bool,
}

impl From<&Arc<Camera>> for CameraSummary {
    fn from(camera: &Arc<Camera>) -> Self {
        Self {
            device_id: camera.id().to_string(),
            label: camera.name().to_string(),
            facing: camera.facing_mode(),
            streaming: camera.is_streaming(),
            torch: camera.torch_supported(),
            single_shot: camera.single_shot_supported(),
        }
    }
}

#[derive(Serialize)]
struct Selection {
    profile: DeviceProfile,
    requested_facing: FacingMode,
    resolution: VideoResolution,
    selected: CameraSummary,
    mirror_x: bool,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
enum SessionEvent {
    UiState { elapsed_ms: u64, state: UiState },
    Result { elapsed_ms: u64, result: DocumentResult },
    Error { elapsed_ms: u64, error: ProcessingError },
}

impl SessionEvent {
    fn is_terminal(&self) -> bool {
        !matches!(self, SessionEvent::UiState { .. })
    }
}

#[derive(Serialize)]
struct Simulation {
    scenario: Scenario,
    profile: DeviceProfile,
    camera: Option<String>,
    frames_processed: usize,
    events: Vec<SessionEvent>,
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread().enable_all().build()
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// List the cameras of a device profile
pub fn list_cameras(profile: DeviceProfile) -> CliResult {
    runtime()?.block_on(run_list(profile))
}

async fn run_list(profile: DeviceProfile) -> CliResult {
    let manager = CameraManager::new(Arc::new(VirtualMediaBackend::from_profile(profile)));
    manager.refresh_camera_devices().await?;

    let cameras: Vec<CameraSummary> = manager.cameras().iter().map(Into::into).collect();
    print_json(&cameras)
}

/// Run best camera selection for a facing and resolution
pub fn select_camera(
    profile: DeviceProfile,
    facing: Option<FacingMode>,
    resolution: Option<VideoResolution>,
) -> CliResult {
    let config = Config::load()?;
    let facing = facing.unwrap_or(config.preferred_facing);
    let resolution = resolution.unwrap_or(config.resolution);

    runtime()?.block_on(run_select(profile, facing, resolution, config))
}

async fn run_select(
    profile: DeviceProfile,
    facing: FacingMode,
    resolution: VideoResolution,
    config: Config,
) -> CliResult {
    let manager = CameraManager::new(Arc::new(VirtualMediaBackend::from_profile(profile)));
    manager.attach_video_sink(Arc::new(VirtualVideoSink::new()));
    manager.set_facing_filter(config.facing_filter);
    manager.set_resolution(resolution).await?;

    manager
        .start_camera_stream(StartStreamOptions {
            autoplay: false,
            preference: CameraPreference::Facing(facing),
        })
        .await?;

    let state = manager.state();
    let Some(selected) = state.selected_camera.as_ref() else {
        return Err("No camera selected".into());
    };

    let selection = Selection {
        profile,
        requested_facing: facing,
        resolution,
        selected: selected.into(),
        mirror_x: state.mirror_x,
    };
    manager.destroy();
    print_json(&selection)
}

/// Simulate a scanning session and print every event
pub fn simulate(
    scenario: Scenario,
    profile: DeviceProfile,
    timeout: Option<Duration>,
    deadline: Duration,
) -> CliResult {
    let config = Config::load()?;
    let timeout = timeout.unwrap_or_else(|| config.scan_timeout());

    runtime()?.block_on(run_simulation(scenario, profile, timeout, deadline, config))
}

async fn run_simulation(
    scenario: Scenario,
    profile: DeviceProfile,
    timeout: Duration,
    deadline: Duration,
    config: Config,
) -> CliResult {
    let manager = CameraManager::new(Arc::new(VirtualMediaBackend::from_profile(profile)));
    manager.attach_video_sink(Arc::new(VirtualVideoSink::new()));
    manager.set_mirror_front_camera(config.mirror_front_camera);
    manager.set_resolution(config.resolution).await?;
    manager
        .start_camera_stream(StartStreamOptions {
            autoplay: true,
            preference: CameraPreference::Facing(config.preferred_facing),
        })
        .await?;

    let worker = RecognitionWorker::with_settings(config.recognizer.clone());
    worker.select_scanning_mode(scenario.scanning_mode()).await;
    worker
        .initialize(Box::new(
            ScriptedEngine::for_scenario(scenario).with_processing_delay(SIMULATED_PROCESSING_TIME),
        ))
        .await;

    let session = CaptureSession::new(
        manager.clone(),
        worker,
        Box::new(PassthroughStabilizer::new()),
    );
    session.set_timeout_duration(timeout);

    let started = Instant::now();
    let elapsed_ms = move || started.elapsed().as_millis() as u64;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let events = tx.clone();
    session.on_ui_state_changed(move |state| {
        let _ = events.send(SessionEvent::UiState {
            elapsed_ms: elapsed_ms(),
            state: *state,
        });
    });
    let events = tx.clone();
    session.on_result(move |result| {
        let _ = events.send(SessionEvent::Result {
            elapsed_ms: elapsed_ms(),
            result: result.clone(),
        });
    });
    let events = tx;
    session.on_error(move |error| {
        let _ = events.send(SessionEvent::Error {
            elapsed_ms: elapsed_ms(),
            error: error.clone(),
        });
    });

    let frames = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&frames);
    session.on_frame_processed(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    session.start().await?;

    let mut log = Vec::new();
    let collect = async {
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            log.push(event);
            if terminal {
                break;
            }
        }
    };
    if tokio::time::timeout(deadline, collect).await.is_err() {
        tracing::warn!(deadline_ms = deadline.as_millis() as u64, "Simulation deadline reached");
    }

    let simulation = Simulation {
        scenario,
        profile,
        camera: manager.state().selected_id().map(str::to_string),
        frames_processed: frames.load(Ordering::Relaxed),
        events: log,
    };

    session.destroy();
    manager.destroy();
    print_json(&simulation)
}
