// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end capture sessions on the virtual platform

use document_capture::backends::camera::{CameraManager, PlaybackState, StartStreamOptions};
use document_capture::backends::virtual_camera::{
    DeviceProfile, VirtualMediaBackend, VirtualVideoSink,
};
use document_capture::errors::ProcessingError;
use document_capture::frame_processor::{RecognitionWorker, Scenario, ScriptStep, ScriptedEngine};
use document_capture::session::CaptureSession;
use document_capture::stabilizer::PassthroughStabilizer;
use document_capture::ui_state::UiStateKey;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

const FAST_FRAMES: Duration = Duration::from_millis(5);
const DEADLINE: Duration = Duration::from_secs(15);

struct Harness {
    manager: CameraManager,
    sink: Arc<VirtualVideoSink>,
    session: CaptureSession,
}

async fn harness(engine: ScriptedEngine, timeout: Duration) -> Harness {
    let backend = Arc::new(VirtualMediaBackend::from_profile(DeviceProfile::Iphone15));
    let sink = Arc::new(VirtualVideoSink::with_frame_interval(FAST_FRAMES));
    let manager = CameraManager::new(backend);
    manager.attach_video_sink(sink.clone());
    manager
        .start_camera_stream(StartStreamOptions::default())
        .await
        .unwrap();

    let worker = RecognitionWorker::new();
    worker.initialize(Box::new(engine)).await;

    let session = CaptureSession::new(
        manager.clone(),
        worker,
        Box::new(PassthroughStabilizer::new()),
    );
    session.set_timeout_duration(timeout);

    Harness {
        manager,
        sink,
        session,
    }
}

fn collect_errors(session: &CaptureSession) -> mpsc::UnboundedReceiver<ProcessingError> {
    let (tx, rx) = mpsc::unbounded_channel();
    session.on_error(move |error| {
        let _ = tx.send(error.clone());
    });
    rx
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_sided_flow_delivers_result() {
    let h = harness(
        ScriptedEngine::for_scenario(Scenario::TwoSided),
        Duration::from_secs(30),
    )
    .await;

    let keys = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&keys);
    h.session
        .on_ui_state_changed(move |state| seen.lock().push(state.key));

    let (tx, mut results) = mpsc::unbounded_channel();
    h.session.on_result(move |result| {
        let _ = tx.send(result.clone());
    });

    h.session.start().await.unwrap();

    let result = tokio::time::timeout(DEADLINE, results.recv())
        .await
        .expect("no result before the deadline")
        .unwrap();

    assert!(result.multi_side);
    assert_eq!(result.fields.get("last_name").map(String::as_str), Some("DOE"));

    let keys = keys.lock().clone();
    let position = |key| keys.iter().position(|k| *k == key);
    let side = position(UiStateKey::SideCaptured).expect("side captured");
    let back = position(UiStateKey::SensingBack).expect("sensing back");
    let done = position(UiStateKey::DocumentCaptured).expect("document captured");
    assert!(position(UiStateKey::DocumentFramingCameraTooFar).unwrap() < side);
    assert!(side < back && back < done);

    assert_eq!(h.manager.playback_state(), PlaybackState::Playback);
    assert!(!h.session.is_timeout_armed());
    h.session.destroy();
    h.manager.destroy();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_searching_too_long_times_out() {
    let h = harness(
        ScriptedEngine::for_scenario(Scenario::Timeout),
        Duration::from_millis(200),
    )
    .await;
    let mut errors = collect_errors(&h.session);

    h.session.start().await.unwrap();
    assert!(h.session.is_timeout_armed());

    let error = tokio::time::timeout(DEADLINE, errors.recv())
        .await
        .expect("no timeout before the deadline")
        .unwrap();

    assert_eq!(error, ProcessingError::Timeout);
    assert_eq!(h.manager.playback_state(), PlaybackState::Playback);
    assert_eq!(h.session.ui_state().key, UiStateKey::SensingFront);
    h.manager.destroy();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_retry_after_timeout_resumes_capture() {
    let h = harness(
        ScriptedEngine::for_scenario(Scenario::Timeout),
        Duration::from_millis(150),
    )
    .await;
    let mut errors = collect_errors(&h.session);

    h.session.start().await.unwrap();
    tokio::time::timeout(DEADLINE, errors.recv()).await.unwrap();

    h.session.set_timeout_duration(Duration::from_secs(30));
    h.session.retry().await.unwrap();

    assert_eq!(h.manager.playback_state(), PlaybackState::Capturing);
    assert!(h.session.is_timeout_armed());
    h.manager.destroy();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_terminal_state_disarms_timeout() {
    let engine = ScriptedEngine::new(vec![
        ScriptStep::searching(false),
        ScriptStep::processing(false),
        ScriptStep::document_captured(false),
    ]);
    let h = harness(engine, Duration::from_millis(400)).await;
    let mut errors = collect_errors(&h.session);

    let (tx, mut results) = mpsc::unbounded_channel();
    h.session.on_result(move |result| {
        let _ = tx.send(result.clone());
    });

    h.session.start().await.unwrap();
    tokio::time::timeout(DEADLINE, results.recv())
        .await
        .expect("no result before the deadline")
        .unwrap();

    // Well past the timeout duration
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(errors.try_recv().is_err());
    assert!(!h.session.is_timeout_armed());
    h.manager.destroy();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unsupported_document_reports_error() {
    let h = harness(
        ScriptedEngine::for_scenario(Scenario::Unsupported),
        Duration::from_secs(30),
    )
    .await;
    let mut errors = collect_errors(&h.session);

    h.session.start().await.unwrap();

    let error = tokio::time::timeout(DEADLINE, errors.recv())
        .await
        .expect("no error before the deadline")
        .unwrap();

    assert_eq!(error, ProcessingError::UnsupportedDocument);
    assert_eq!(h.manager.playback_state(), PlaybackState::Playback);
    assert_eq!(h.session.ui_state().key, UiStateKey::SensingFront);
    h.manager.destroy();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_frames_dropped_while_busy() {
    let engine = ScriptedEngine::for_scenario(Scenario::Timeout)
        .with_processing_delay(Duration::from_millis(40));
    let h = harness(engine, Duration::from_secs(30)).await;

    let processed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&processed);
    h.session.on_frame_processed(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    h.session.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    h.session.cancel("test over");

    let processed = processed.load(Ordering::SeqCst) as u64;
    assert!(processed > 0);
    assert!(processed < h.sink.frames_rendered());
    h.manager.destroy();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ui_state_stream() {
    let h = harness(
        ScriptedEngine::for_scenario(Scenario::SingleSide),
        Duration::from_secs(30),
    )
    .await;

    let mut states = Box::pin(h.session.ui_state_stream());
    h.session.start().await.unwrap();

    let mut keys = Vec::new();
    let collect = async {
        while let Some(state) = states.next().await {
            keys.push(state.key);
            if state.key == UiStateKey::DocumentCaptured {
                break;
            }
        }
    };
    tokio::time::timeout(DEADLINE, collect).await.unwrap();

    assert_eq!(keys, vec![UiStateKey::Processing, UiStateKey::DocumentCaptured]);
    h.session.destroy();
    h.manager.destroy();
}
