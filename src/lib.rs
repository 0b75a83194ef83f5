// SPDX-License-Identifier: GPL-3.0-only

//! Document Capture - live camera document-capture core
//!
//! This library turns a stream of camera frames into a stable, user-facing
//! capture state, and manages the camera that produces those frames.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Media platform boundary, camera selection and stream lifecycle
//! - [`frame_processor`]: Recognition worker boundary and frame result conversion
//! - [`ui_state`]: Frame result to UI state resolution
//! - [`stabilizer`]: UI state debouncing contract
//! - [`session`]: Capture orchestration (timeouts, side effects, results)
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let manager = CameraManager::new(Arc::new(VirtualMediaBackend::from_profile(DeviceProfile::Iphone15)));
//! manager.attach_video_sink(Arc::new(VirtualVideoSink::new()));
//! manager.start_camera_stream(StartStreamOptions::default()).await?;
//!
//! let worker = RecognitionWorker::new();
//! worker.initialize(Box::new(ScriptedEngine::for_scenario(Scenario::TwoSided))).await;
//!
//! let session = CaptureSession::new(manager, worker, Box::new(PassthroughStabilizer::new()));
//! session.on_result(|result| println!("{:?}", result.fields));
//! session.start().await?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod frame_processor;
pub mod observers;
pub mod session;
pub mod stabilizer;
pub mod ui_state;

pub use config::Config;
pub use errors::{AppError, AppResult, CameraError, ProcessingError, RecognitionError};
