// SPDX-License-Identifier: GPL-3.0-only

//! Camera manager lifecycle on the virtual platform

use document_capture::backends::camera::{
    CameraFrame, CameraManager, CameraPreference, FacingMode, PlaybackState, StartStreamOptions,
    VideoResolution, VideoSink,
};
use document_capture::backends::virtual_camera::{
    DeviceProfile, LEFT_EDGE_MARKER, VirtualDeviceSpec, VirtualMediaBackend, VirtualVideoSink,
};
use document_capture::errors::CameraError;
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct Rig {
    manager: CameraManager,
    backend: Arc<VirtualMediaBackend>,
    sink: Arc<VirtualVideoSink>,
}

fn rig(profile: DeviceProfile) -> Rig {
    let backend = Arc::new(VirtualMediaBackend::from_profile(profile));
    let sink = Arc::new(VirtualVideoSink::with_frame_interval(Duration::from_millis(5)));
    let manager = CameraManager::new(backend.clone());
    manager.attach_video_sink(sink.clone());
    Rig {
        manager,
        backend,
        sink,
    }
}

fn count_frames(manager: &CameraManager) -> Arc<AtomicUsize> {
    let frames = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&frames);
    manager.add_frame_capture_callback(move |_frame| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        .boxed()
    });
    frames
}

/// Keep the most recent captured frame
fn last_frame(manager: &CameraManager) -> Arc<Mutex<Option<Arc<CameraFrame>>>> {
    let slot = Arc::new(Mutex::new(None));
    let last = Arc::clone(&slot);
    manager.add_frame_capture_callback(move |frame| {
        *last.lock() = Some(frame);
        async {}.boxed()
    });
    slot
}

async fn capture_one_frame(rig: &Rig, preference: CameraPreference) -> Arc<CameraFrame> {
    let slot = last_frame(&rig.manager);
    rig.manager
        .start_camera_stream(StartStreamOptions {
            autoplay: true,
            preference,
        })
        .await
        .unwrap();
    rig.manager.start_frame_capture().await.unwrap();

    for _ in 0..200 {
        let captured = slot.lock().clone();
        if let Some(frame) = captured {
            rig.manager.stop_frame_capture();
            return frame;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("no frame captured");
}

#[tokio::test]
async fn test_frames_flow_only_while_capturing() {
    let rig = rig(DeviceProfile::Iphone15);
    let frames = count_frames(&rig.manager);

    rig.manager
        .start_camera_stream(StartStreamOptions::default())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(frames.load(Ordering::SeqCst), 0);

    rig.manager.start_frame_capture().await.unwrap();
    assert_eq!(rig.manager.playback_state(), PlaybackState::Capturing);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(frames.load(Ordering::SeqCst) > 0);

    rig.manager.stop_frame_capture();
    assert_eq!(rig.manager.playback_state(), PlaybackState::Playback);
    // Let an in-flight delivery settle
    tokio::time::sleep(Duration::from_millis(30)).await;
    let stopped_at = frames.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(frames.load(Ordering::SeqCst), stopped_at);
    assert!(rig.sink.is_playing());
}

#[tokio::test]
async fn test_start_frame_capture_is_idempotent() {
    let rig = rig(DeviceProfile::Desktop);
    rig.manager
        .start_camera_stream(StartStreamOptions::default())
        .await
        .unwrap();
    rig.manager.start_frame_capture().await.unwrap();

    let version = rig.manager.state_version();
    rig.manager.start_frame_capture().await.unwrap();

    assert_eq!(rig.manager.state_version(), version);
    assert_eq!(rig.backend.open_count(), 1);
}

#[tokio::test]
async fn test_frame_capture_requires_selected_camera() {
    let rig = rig(DeviceProfile::Desktop);
    assert_eq!(
        rig.manager.start_frame_capture().await,
        Err(CameraError::NoCameraSelected)
    );
    assert_eq!(rig.manager.playback_state(), PlaybackState::Idle);
}

#[tokio::test]
async fn test_unplugging_selected_camera_ends_stream() {
    let rig = rig(DeviceProfile::Iphone15);
    rig.manager
        .start_camera_stream(StartStreamOptions::default())
        .await
        .unwrap();
    rig.manager.start_frame_capture().await.unwrap();

    rig.backend.disconnect("iphone15-back-dual-wide");

    let state = rig.manager.state();
    assert_eq!(state.playback_state, PlaybackState::Idle);
    assert_eq!(state.error_state, Some(CameraError::StreamEnded));
    assert!(!rig.sink.has_source());
    assert_eq!(rig.backend.active_stream_count(), 0);
}

#[tokio::test]
async fn test_swap_resumes_capture_on_new_camera() {
    let rig = rig(DeviceProfile::SamsungS21Fe);
    rig.manager
        .start_camera_stream(StartStreamOptions::default())
        .await
        .unwrap();
    rig.manager.start_frame_capture().await.unwrap();

    let front = rig
        .manager
        .cameras()
        .into_iter()
        .find(|camera| camera.id() == "s21fe-1")
        .unwrap();
    assert!(rig.manager.select_camera(front).await.unwrap());

    let state = rig.manager.state();
    assert_eq!(state.selected_id(), Some("s21fe-1"));
    assert_eq!(state.playback_state, PlaybackState::Capturing);
    assert!(!state.is_swapping_camera);
    assert_eq!(rig.backend.active_stream_count(), 1);
    assert!(rig.sink.is_playing());
}

#[tokio::test]
async fn test_explicit_camera_preference() {
    let rig = rig(DeviceProfile::Iphone15);
    rig.manager.refresh_camera_devices().await.unwrap();
    let front = rig.manager.cameras().into_iter().next().unwrap();

    rig.manager
        .start_camera_stream(StartStreamOptions {
            autoplay: true,
            preference: CameraPreference::Camera(front),
        })
        .await
        .unwrap();

    let state = rig.manager.state();
    assert_eq!(state.selected_id(), Some("iphone15-front"));
    assert!(state.mirror_x);
    assert_eq!(state.playback_state, PlaybackState::Playback);
}

#[tokio::test]
async fn test_visibility_round_trip() {
    let rig = rig(DeviceProfile::Desktop);

    // Nothing selected yet, nothing to restart
    rig.manager.handle_visibility_change(false).await.unwrap();
    assert_eq!(rig.backend.open_count(), 0);

    rig.manager
        .start_camera_stream(StartStreamOptions::default())
        .await
        .unwrap();

    rig.manager.handle_visibility_change(true).await.unwrap();
    assert_eq!(rig.manager.playback_state(), PlaybackState::Idle);
    assert_eq!(rig.backend.active_stream_count(), 0);

    rig.manager.handle_visibility_change(false).await.unwrap();
    assert_eq!(rig.manager.playback_state(), PlaybackState::Playback);
    assert_eq!(rig.manager.state().selected_id(), Some("desktop-0"));
    assert_eq!(rig.backend.active_stream_count(), 1);
}

#[tokio::test]
async fn test_refresh_picks_up_hotplug() {
    let rig = rig(DeviceProfile::Desktop);
    rig.manager.refresh_camera_devices().await.unwrap();
    assert_eq!(rig.manager.cameras().len(), 1);

    rig.backend.add_device(
        VirtualDeviceSpec::new("USB Document Camera")
            .with_id("usb-doc")
            .reporting(FacingMode::Back),
    );
    rig.manager.refresh_camera_devices().await.unwrap();
    assert_eq!(rig.manager.cameras().len(), 2);

    rig.backend.disconnect("desktop-0");
    rig.manager.refresh_camera_devices().await.unwrap();
    let cameras = rig.manager.cameras();
    assert_eq!(cameras.len(), 1);
    assert_eq!(cameras[0].id(), "usb-doc");
}

#[tokio::test]
async fn test_resolution_change_reopens_stream() {
    let rig = rig(DeviceProfile::Desktop);
    rig.manager
        .start_camera_stream(StartStreamOptions::default())
        .await
        .unwrap();

    rig.manager.set_resolution(VideoResolution::UHD).await.unwrap();

    assert_eq!(rig.manager.resolution(), VideoResolution::UHD);
    assert_eq!(rig.manager.playback_state(), PlaybackState::Playback);
    assert_eq!(rig.backend.open_count(), 2);
    assert_eq!(rig.backend.active_stream_count(), 1);
}

#[tokio::test]
async fn test_front_camera_frames_are_mirrored() {
    let rig = rig(DeviceProfile::SamsungS21Fe);
    let frame = capture_one_frame(&rig, CameraPreference::Facing(FacingMode::Front)).await;

    assert!(rig.manager.state().mirror_x);
    let right_edge = frame.width() - 1;
    assert_eq!(*frame.image.get_pixel(right_edge, 0), LEFT_EDGE_MARKER);
    assert_ne!(*frame.image.get_pixel(0, 0), LEFT_EDGE_MARKER);
}

#[tokio::test]
async fn test_back_camera_frames_keep_orientation() {
    let rig = rig(DeviceProfile::SamsungS21Fe);
    let frame = capture_one_frame(&rig, CameraPreference::Facing(FacingMode::Back)).await;

    assert!(!rig.manager.state().mirror_x);
    assert_eq!(*frame.image.get_pixel(0, 0), LEFT_EDGE_MARKER);
}

#[tokio::test]
async fn test_front_camera_mirroring_can_be_disabled() {
    let rig = rig(DeviceProfile::SamsungS21Fe);
    rig.manager.set_mirror_front_camera(false);
    let frame = capture_one_frame(&rig, CameraPreference::Facing(FacingMode::Front)).await;

    assert!(!rig.manager.state().mirror_x);
    assert_eq!(*frame.image.get_pixel(0, 0), LEFT_EDGE_MARKER);
}
