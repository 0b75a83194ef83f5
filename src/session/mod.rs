// SPDX-License-Identifier: GPL-3.0-only

//! Capture session
//!
//! Ties the camera manager, the recognition worker and the stabilizer
//! together:
//!
//! - Single-flight frame processing: frames arriving while one is being
//!   recognized are dropped
//! - Scan timeout armed while the UI shows a searching state and the
//!   manager is capturing
//! - Side effects of UI state transitions (flip pause, final result)
//! - Unsupported documents short-circuit to an error notification

mod timeout;

pub use timeout::ScanTimer;

use crate::backends::camera::{CameraFrame, CameraManager, PlaybackState};
use crate::constants::timing::DEFAULT_SCAN_TIMEOUT;
use crate::errors::{AppResult, ProcessingError, RecognitionResult};
use crate::frame_processor::{
    DocumentResult, FrameAnalysisResult, ProcessingStatus, RecognitionRequest, RecognitionWorker,
};
use crate::observers::{SubscriptionToken, Subscribers};
use crate::stabilizer::FeedbackStabilizer;
use crate::ui_state::{UiState, UiStateKey, resolve_ui_state_key};
use futures::{FutureExt, Stream};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

type UiStateListener = dyn Fn(&UiState) + Send + Sync;
type ResultListener = dyn Fn(&DocumentResult) + Send + Sync;
type FrameListener = dyn Fn(&FrameAnalysisResult) + Send + Sync;
type ErrorListener = dyn Fn(&ProcessingError) + Send + Sync;
type CancelListener = dyn Fn(&str) + Send + Sync;

/// Outward notification channels of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    UiStateChanged,
    Result,
    FrameProcessed,
    Error,
    UserCancel,
}

/// Token returned by the `on_*` methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken {
    pub channel: Channel,
    token: SubscriptionToken,
}

#[derive(Default)]
struct Listeners {
    ui_state: Subscribers<UiStateListener>,
    result: Subscribers<ResultListener>,
    frame: Subscribers<FrameListener>,
    error: Subscribers<ErrorListener>,
    cancel: Subscribers<CancelListener>,
}

impl Listeners {
    fn remove(&self, token: ListenerToken) -> bool {
        match token.channel {
            Channel::UiStateChanged => self.ui_state.remove(token.token),
            Channel::Result => self.result.remove(token.token),
            Channel::FrameProcessed => self.frame.remove(token.token),
            Channel::Error => self.error.remove(token.token),
            Channel::UserCancel => self.cancel.remove(token.token),
        }
    }

    fn clear(&self) {
        self.ui_state.clear();
        self.result.clear();
        self.frame.clear();
        self.error.clear();
        self.cancel.clear();
    }

    fn emit_error(&self, error: &ProcessingError) {
        for listener in self.error.snapshot() {
            listener(error);
        }
    }
}

#[derive(Default)]
struct ManagerSubscriptions {
    frame_callback: Option<SubscriptionToken>,
    playback: Option<SubscriptionToken>,
    sink: Option<SubscriptionToken>,
}

struct SessionInner {
    id: Uuid,
    manager: CameraManager,
    worker: RecognitionWorker,
    stabilizer: Mutex<Box<dyn FeedbackStabilizer>>,
    ui_state: Mutex<UiState>,
    raw_ui_state_key: Mutex<Option<UiStateKey>>,
    busy: AtomicBool,
    timer: ScanTimer,
    timeout_duration: Mutex<Duration>,
    listeners: Listeners,
    subscriptions: Mutex<ManagerSubscriptions>,
}

/// Orchestrates one document capture session
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct CaptureSession {
    inner: Arc<SessionInner>,
}

impl CaptureSession {
    /// Create a session and hook it into the camera manager
    ///
    /// The worker is expected to be initialized already.
    pub fn new(
        manager: CameraManager,
        worker: RecognitionWorker,
        stabilizer: Box<dyn FeedbackStabilizer>,
    ) -> Self {
        let ui_state = stabilizer.current_state();
        let inner = Arc::new(SessionInner {
            id: Uuid::new_v4(),
            manager,
            worker,
            stabilizer: Mutex::new(stabilizer),
            ui_state: Mutex::new(ui_state),
            raw_ui_state_key: Mutex::new(None),
            busy: AtomicBool::new(false),
            timer: ScanTimer::new(),
            timeout_duration: Mutex::new(DEFAULT_SCAN_TIMEOUT),
            listeners: Listeners::default(),
            subscriptions: Mutex::new(ManagerSubscriptions::default()),
        });

        info!(session = %inner.id, "Capture session created");
        let session = Self { inner };
        session.attach();
        session
    }

    fn attach(&self) {
        let manager = &self.inner.manager;

        let weak = Arc::downgrade(&self.inner);
        let frame_callback = manager.add_frame_capture_callback(move |frame| {
            let weak = Weak::clone(&weak);
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_frame(frame).await;
                }
            }
            .boxed()
        });

        let weak = Arc::downgrade(&self.inner);
        let playback = manager.subscribe_playback_state(move |new, _old| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_playback_state(new);
            }
        });

        // Unhook from the manager once its video sink goes away
        let weak = Arc::downgrade(&self.inner);
        let sink = manager.subscribe(move |new, old| {
            if old.video_sink.is_some()
                && new.video_sink.is_none()
                && let Some(inner) = weak.upgrade()
            {
                debug!(session = %inner.id, "Video sink removed, detaching session");
                inner.detach();
            }
        });

        *self.inner.subscriptions.lock() = ManagerSubscriptions {
            frame_callback: Some(frame_callback),
            playback: Some(playback),
            sink: Some(sink),
        };
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn manager(&self) -> &CameraManager {
        &self.inner.manager
    }

    pub fn worker(&self) -> &RecognitionWorker {
        &self.inner.worker
    }

    /// UI state currently displayed
    pub fn ui_state(&self) -> UiState {
        *self.inner.ui_state.lock()
    }

    /// Last key resolved from a frame, before stabilization
    pub fn raw_ui_state_key(&self) -> Option<UiStateKey> {
        *self.inner.raw_ui_state_key.lock()
    }

    pub fn timeout_duration(&self) -> Duration {
        *self.inner.timeout_duration.lock()
    }

    /// Set the scan timeout; applies from the next time the timer is armed
    pub fn set_timeout_duration(&self, duration: Duration) {
        *self.inner.timeout_duration.lock() = duration;
    }

    pub fn is_timeout_armed(&self) -> bool {
        self.inner.timer.is_armed()
    }

    /// Start scanning: fresh recognition session, then frame capture
    pub async fn start(&self) -> AppResult<()> {
        info!(session = %self.inner.id, "Starting capture");
        self.inner.worker.reset_session().await?;
        self.inner.reset_stabilizer();
        self.inner.manager.start_frame_capture().await?;
        Ok(())
    }

    /// Start over after a timeout or error
    pub async fn retry(&self) -> AppResult<()> {
        info!(session = %self.inner.id, "Retrying capture");
        self.inner.timer.clear();
        self.start().await
    }

    /// User aborted the scan
    pub fn cancel(&self, reason: &str) {
        info!(session = %self.inner.id, reason, "Capture cancelled by user");
        self.inner.manager.stop_frame_capture();
        self.inner.timer.clear();

        for listener in self.inner.listeners.cancel.snapshot() {
            listener(reason);
        }
    }

    /// Unhook from the manager and drop every listener
    pub fn destroy(&self) {
        info!(session = %self.inner.id, "Destroying capture session");
        self.inner.detach();
        self.inner.listeners.clear();
    }

    pub fn on_ui_state_changed(
        &self,
        listener: impl Fn(&UiState) + Send + Sync + 'static,
    ) -> ListenerToken {
        ListenerToken {
            channel: Channel::UiStateChanged,
            token: self.inner.listeners.ui_state.add(Arc::new(listener)),
        }
    }

    pub fn on_result(
        &self,
        listener: impl Fn(&DocumentResult) + Send + Sync + 'static,
    ) -> ListenerToken {
        ListenerToken {
            channel: Channel::Result,
            token: self.inner.listeners.result.add(Arc::new(listener)),
        }
    }

    /// Every processed frame, including ones that do not change the UI
    pub fn on_frame_processed(
        &self,
        listener: impl Fn(&FrameAnalysisResult) + Send + Sync + 'static,
    ) -> ListenerToken {
        ListenerToken {
            channel: Channel::FrameProcessed,
            token: self.inner.listeners.frame.add(Arc::new(listener)),
        }
    }

    pub fn on_error(
        &self,
        listener: impl Fn(&ProcessingError) + Send + Sync + 'static,
    ) -> ListenerToken {
        ListenerToken {
            channel: Channel::Error,
            token: self.inner.listeners.error.add(Arc::new(listener)),
        }
    }

    pub fn on_user_cancel(
        &self,
        listener: impl Fn(&str) + Send + Sync + 'static,
    ) -> ListenerToken {
        ListenerToken {
            channel: Channel::UserCancel,
            token: self.inner.listeners.cancel.add(Arc::new(listener)),
        }
    }

    pub fn unsubscribe(&self, token: ListenerToken) -> bool {
        self.inner.listeners.remove(token)
    }

    /// UI state changes as a stream
    ///
    /// The stream ends when the session is destroyed.
    pub fn ui_state_stream(&self) -> impl Stream<Item = UiState> + Send + 'static {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        self.on_ui_state_changed(move |state| {
            let _ = tx.send(*state);
        });

        async_stream::stream! {
            while let Some(state) = rx.recv().await {
                yield state;
            }
        }
    }
}

impl SessionInner {
    async fn handle_frame(self: Arc<Self>, frame: Arc<CameraFrame>) {
        if self.busy.swap(true, Ordering::AcqRel) {
            trace!(sequence = frame.sequence, "Recognizer busy, dropping frame");
            return;
        }

        let processed = self
            .worker
            .process_frame(RecognitionRequest::from_frame(&frame))
            .await;
        self.busy.store(false, Ordering::Release);

        let frame_result = match processed {
            Ok(result) => result,
            Err(e) => {
                error!(session = %self.id, error = %e, "Frame processing failed");
                self.listeners
                    .emit_error(&ProcessingError::Other(e.to_string()));
                return;
            }
        };

        for listener in self.listeners.frame.snapshot() {
            listener(&frame_result);
        }

        // Camera still moving, wait for a steady frame
        if frame_result.processing_status == ProcessingStatus::StabilityTestFailed {
            return;
        }

        if frame_result.processing_status.is_unsupported_document() {
            warn!(
                session = %self.id,
                status = ?frame_result.processing_status,
                "Unsupported document"
            );
            self.manager.stop_frame_capture();
            self.reset_stabilizer();
            self.worker.reset_latches();
            self.listeners
                .emit_error(&ProcessingError::UnsupportedDocument);
            return;
        }

        let key = resolve_ui_state_key(&frame_result);
        *self.raw_ui_state_key.lock() = Some(key);

        let new_state = self.stabilizer.lock().get_new_ui_state(key);
        {
            let mut current = self.ui_state.lock();
            if current.key == new_state.key {
                return;
            }
            *current = new_state;
        }

        for listener in self.listeners.ui_state.snapshot() {
            listener(&new_state);
        }

        self.handle_ui_state_change(new_state).await;
    }

    async fn handle_ui_state_change(self: &Arc<Self>, ui_state: UiState) {
        debug!(session = %self.id, state = %ui_state.key, "UI state changed");

        if ui_state.key.is_searching() {
            if !self.timer.is_armed() && self.manager.playback_state() == PlaybackState::Capturing
            {
                self.arm_timeout(ui_state);
            }
            return;
        }

        self.timer.clear();

        match ui_state.key {
            UiStateKey::SideCaptured => {
                self.manager.stop_frame_capture();
                tokio::time::sleep(ui_state.min_duration).await;
                if let Err(e) = self.manager.start_frame_capture().await {
                    error!(session = %self.id, error = %e, "Failed to resume capture after flip");
                    self.listeners
                        .emit_error(&ProcessingError::Other(e.to_string()));
                }
            }
            UiStateKey::DocumentCaptured => {
                self.manager.stop_frame_capture();
                tokio::time::sleep(ui_state.min_duration).await;

                match self.fetch_result().await {
                    Ok(result) => {
                        info!(session = %self.id, "Document captured");
                        for listener in self.listeners.result.snapshot() {
                            listener(&result);
                        }
                    }
                    Err(e) => {
                        error!(session = %self.id, error = %e, "Failed to fetch result");
                        self.listeners
                            .emit_error(&ProcessingError::Other(e.to_string()));
                    }
                }
            }
            _ => {}
        }
    }

    async fn fetch_result(&self) -> RecognitionResult<DocumentResult> {
        self.worker.get_result().await
    }

    fn handle_playback_state(self: &Arc<Self>, playback_state: PlaybackState) {
        debug!(session = %self.id, state = %playback_state, "Playback state changed");
        self.timer.clear();

        // Initial scan and resume after a pause
        if playback_state == PlaybackState::Capturing {
            let ui_state = *self.ui_state.lock();
            self.arm_timeout(ui_state);
        }
    }

    fn arm_timeout(self: &Arc<Self>, ui_state: UiState) {
        let duration = *self.timeout_duration.lock();
        debug!(session = %self.id, state = %ui_state.key, "Starting scan timeout");

        let weak = Arc::downgrade(self);
        self.timer.arm(duration, move || {
            if let Some(inner) = weak.upgrade() {
                inner.handle_timeout();
            }
        });
    }

    fn handle_timeout(&self) {
        warn!(session = %self.id, "Scan timed out");
        self.manager.stop_frame_capture();
        self.listeners.emit_error(&ProcessingError::Timeout);
        // Treated as a new scan attempt
        self.reset_stabilizer();
    }

    fn reset_stabilizer(&self) {
        let state = {
            let mut stabilizer = self.stabilizer.lock();
            stabilizer.reset();
            stabilizer.current_state()
        };
        *self.ui_state.lock() = state;
    }

    fn detach(&self) {
        self.timer.clear();
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());

        if let Some(token) = subscriptions.frame_callback {
            self.manager.remove_frame_capture_callback(token);
        }
        for token in [subscriptions.playback, subscriptions.sink].into_iter().flatten() {
            self.manager.unsubscribe(token);
        }
    }
}
