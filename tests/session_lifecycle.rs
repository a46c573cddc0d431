// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the capture session controller
//!
//! Run against a scripted in-memory capture session, so every lifecycle
//! rule is observable without hardware. The fake records call counts and
//! exposes the registered metadata sink, letting tests inject detection
//! batches exactly the way the capture thread would.

use std::sync::{Arc, Mutex};

use qr_mirror::backends::camera::types::{
    CaptureError, CaptureResult, FrameReceiver, InputToken, MetadataObject, Orientation,
    Symbology, VideoDevice,
};
use qr_mirror::backends::camera::{CaptureSession, MetadataSink};
use qr_mirror::encode::{self, EncodeProfile};
use qr_mirror::session::{CaptureSessionController, EventReceiver, SessionError, SessionEvent};

#[derive(Default)]
struct FakeState {
    device: Option<VideoDevice>,
    fail_create: bool,
    reject_input: bool,
    fail_add_input: bool,
    reject_output: bool,
    stop_times_out: bool,

    sink: Option<Arc<dyn MetadataSink>>,
    input_attached: bool,
    output_attached: bool,
    running: bool,
    orientation: Option<Orientation>,

    create_calls: u32,
    start_calls: u32,
    stop_calls: u32,
    release_calls: u32,
}

struct FakeSession {
    state: Arc<Mutex<FakeState>>,
    pending: Option<InputToken>,
    next_token: u32,
}

/// Test-side view of the fake, for scripting failures and injecting batches
#[derive(Clone)]
struct FakeHandle {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSession {
    fn build(device: Option<VideoDevice>) -> (Box<dyn CaptureSession>, FakeHandle) {
        let state = Arc::new(Mutex::new(FakeState {
            device,
            ..FakeState::default()
        }));
        let session = Box::new(Self {
            state: Arc::clone(&state),
            pending: None,
            next_token: 0,
        });
        (session, FakeHandle { state })
    }

    fn with_device() -> (Box<dyn CaptureSession>, FakeHandle) {
        Self::build(Some(VideoDevice {
            name: "Fake Camera".to_string(),
            path: "42".to_string(),
        }))
    }

    fn without_device() -> (Box<dyn CaptureSession>, FakeHandle) {
        Self::build(None)
    }
}

impl CaptureSession for FakeSession {
    fn default_device(&mut self) -> Option<VideoDevice> {
        self.state.lock().unwrap().device.clone()
    }

    fn create_input(&mut self, device: &VideoDevice) -> CaptureResult<InputToken> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        if state.fail_create {
            return Err(CaptureError::OpenFailed(format!("{} is busy", device.name)));
        }
        self.next_token += 1;
        let token = InputToken::new(self.next_token);
        self.pending = Some(token);
        Ok(token)
    }

    fn can_add_input(&self, token: InputToken) -> bool {
        let state = self.state.lock().unwrap();
        !state.reject_input && !state.input_attached && self.pending == Some(token)
    }

    fn add_input(&mut self, token: InputToken) -> CaptureResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_add_input {
            return Err(CaptureError::Pipeline("negotiation failed".to_string()));
        }
        if self.pending != Some(token) {
            return Err(CaptureError::Pipeline("unknown input token".to_string()));
        }
        state.input_attached = true;
        self.pending = None;
        Ok(())
    }

    fn can_add_output(&self) -> bool {
        let state = self.state.lock().unwrap();
        !state.reject_output && !state.output_attached
    }

    fn add_metadata_output(
        &mut self,
        _symbologies: Vec<Symbology>,
        sink: Arc<dyn MetadataSink>,
    ) -> CaptureResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.reject_output {
            return Err(CaptureError::Pipeline("output refused".to_string()));
        }
        state.sink = Some(sink);
        state.output_attached = true;
        Ok(())
    }

    fn start_running(&mut self) -> CaptureResult<()> {
        let mut state = self.state.lock().unwrap();
        state.start_calls += 1;
        if !state.input_attached {
            return Err(CaptureError::StartFailed("nothing attached".to_string()));
        }
        state.running = true;
        Ok(())
    }

    fn stop_running(&mut self) -> CaptureResult<()> {
        let mut state = self.state.lock().unwrap();
        state.stop_calls += 1;
        state.running = false;
        if state.stop_times_out {
            return Err(CaptureError::StopTimeout);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    fn supports_orientation(&self) -> bool {
        true
    }

    fn set_orientation(&mut self, orientation: Orientation) {
        self.state.lock().unwrap().orientation = Some(orientation);
    }

    fn take_preview_receiver(&mut self) -> Option<FrameReceiver> {
        None
    }

    fn release(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.release_calls += 1;
        state.input_attached = false;
        state.output_attached = false;
        state.sink = None;
        state.running = false;
    }
}

impl FakeHandle {
    /// Inject a detection batch the way the capture thread would
    ///
    /// The sink is cloned out before the call so the sink's own locking
    /// never nests inside the fake's lock.
    fn deliver(&self, objects: &[MetadataObject]) {
        let sink = self.state.lock().unwrap().sink.clone();
        if let Some(sink) = sink {
            sink.on_metadata_objects(objects);
        }
    }

    fn set_fail_create(&self) {
        self.state.lock().unwrap().fail_create = true;
    }

    fn set_reject_input(&self) {
        self.state.lock().unwrap().reject_input = true;
    }

    fn set_fail_add_input(&self) {
        self.state.lock().unwrap().fail_add_input = true;
    }

    fn set_reject_output(&self) {
        self.state.lock().unwrap().reject_output = true;
    }

    fn set_stop_times_out(&self) {
        self.state.lock().unwrap().stop_times_out = true;
    }

    fn input_attached(&self) -> bool {
        self.state.lock().unwrap().input_attached
    }

    fn orientation(&self) -> Option<Orientation> {
        self.state.lock().unwrap().orientation
    }

    fn create_calls(&self) -> u32 {
        self.state.lock().unwrap().create_calls
    }

    fn start_calls(&self) -> u32 {
        self.state.lock().unwrap().start_calls
    }

    fn stop_calls(&self) -> u32 {
        self.state.lock().unwrap().stop_calls
    }

    fn release_calls(&self) -> u32 {
        self.state.lock().unwrap().release_calls
    }
}

fn qr(payload: &str) -> MetadataObject {
    MetadataObject {
        symbology: Symbology::QrCode,
        payload: payload.to_string(),
    }
}

fn aztec(payload: &str) -> MetadataObject {
    MetadataObject {
        symbology: Symbology::Aztec,
        payload: payload.to_string(),
    }
}

fn ready_controller() -> (CaptureSessionController, EventReceiver, FakeHandle) {
    let (session, handle) = FakeSession::with_device();
    let (controller, events) = CaptureSessionController::new(session);
    controller.initialize().expect("initialize");
    (controller, events, handle)
}

fn drain(events: &mut EventReceiver) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(Some(event)) = events.try_next() {
        out.push(event);
    }
    out
}

#[test]
fn test_start_and_stop_are_idempotent() {
    let (controller, _events, handle) = ready_controller();
    assert!(!controller.is_running());

    controller.start().expect("start");
    controller.start().expect("repeated start");
    assert!(controller.is_running());
    assert_eq!(handle.start_calls(), 1);

    controller.stop().expect("stop");
    controller.stop().expect("repeated stop");
    assert!(!controller.is_running());
    assert_eq!(handle.stop_calls(), 1);
}

#[test]
fn test_toggle_flips_between_runs() {
    let (controller, _events, handle) = ready_controller();

    controller.toggle().expect("toggle on");
    assert!(controller.is_running());
    controller.toggle().expect("toggle off");
    assert!(!controller.is_running());

    assert_eq!(handle.start_calls(), 1);
    assert_eq!(handle.stop_calls(), 1);
}

#[test]
fn test_batch_yields_one_event_from_first_match() {
    let (controller, mut events, handle) = ready_controller();
    controller.start().expect("start");

    handle.deliver(&[qr("first"), qr("second"), qr("third")]);

    let delivered = drain(&mut events);
    assert_eq!(delivered.len(), 1);
    let SessionEvent::CodeDetected(code) = &delivered[0];
    assert_eq!(code.payload, "first");

    // Later batches in the same run are suppressed
    handle.deliver(&[qr("fourth")]);
    assert!(drain(&mut events).is_empty());
}

#[test]
fn test_session_is_stopped_when_event_is_observable() {
    let (controller, mut events, handle) = ready_controller();
    controller.start().expect("start");

    handle.deliver(&[qr("payload")]);

    assert!(!controller.is_running());
    assert_eq!(handle.stop_calls(), 1);
    assert_eq!(drain(&mut events).len(), 1);
}

#[test]
fn test_resume_detects_again_without_reinitialize() {
    let (controller, mut events, handle) = ready_controller();
    controller.start().expect("start");
    handle.deliver(&[qr("one")]);
    assert_eq!(drain(&mut events).len(), 1);
    assert!(!controller.is_running());

    // Returning from the display screen calls start() only
    controller.start().expect("resume");
    assert!(controller.is_running());
    assert_eq!(handle.create_calls(), 1);

    handle.deliver(&[qr("two")]);
    let delivered = drain(&mut events);
    assert_eq!(delivered.len(), 1);
    let SessionEvent::CodeDetected(code) = &delivered[0];
    assert_eq!(code.payload, "two");
}

#[test]
fn test_detection_outside_a_run_is_ignored() {
    let (controller, mut events, handle) = ready_controller();

    // Before the first start
    handle.deliver(&[qr("early")]);
    assert!(drain(&mut events).is_empty());

    // After a manual stop, with a callback still in flight
    controller.start().expect("start");
    controller.stop().expect("stop");
    handle.deliver(&[qr("late")]);
    assert!(drain(&mut events).is_empty());
}

#[test]
fn test_unrecognized_symbologies_never_fire() {
    let (controller, mut events, handle) = ready_controller();
    controller.start().expect("start");

    handle.deliver(&[aztec("not-this")]);
    assert!(drain(&mut events).is_empty());
    assert!(controller.is_running());

    handle.deliver(&[aztec("skip"), qr("https://example.com")]);
    let delivered = drain(&mut events);
    assert_eq!(delivered.len(), 1);
    let SessionEvent::CodeDetected(code) = &delivered[0];
    assert_eq!(code.symbology, Symbology::QrCode);
    assert_eq!(code.payload, "https://example.com");
}

#[test]
fn test_teardown_is_exactly_once() {
    let (controller, _events, handle) = ready_controller();

    // Safe on an already-stopped session
    controller.teardown().expect("teardown");
    assert_eq!(handle.release_calls(), 1);

    assert!(matches!(
        controller.teardown(),
        Err(SessionError::AlreadyTornDown)
    ));
    assert_eq!(handle.release_calls(), 1);
}

#[test]
fn test_operations_after_teardown_fail_fast() {
    let (controller, _events, _handle) = ready_controller();
    controller.teardown().expect("teardown");

    assert!(matches!(controller.start(), Err(SessionError::AlreadyTornDown)));
    assert!(matches!(controller.stop(), Err(SessionError::AlreadyTornDown)));
    assert!(matches!(controller.toggle(), Err(SessionError::AlreadyTornDown)));
    assert!(matches!(
        controller.on_layout_changed(100, 100),
        Err(SessionError::AlreadyTornDown)
    ));
    assert!(matches!(
        controller.initialize(),
        Err(SessionError::AlreadyTornDown)
    ));
}

#[test]
fn test_teardown_stops_a_running_session() {
    let (controller, _events, handle) = ready_controller();
    controller.start().expect("start");

    controller.teardown().expect("teardown");
    assert!(!controller.is_running());
    assert_eq!(handle.stop_calls(), 1);
    assert_eq!(handle.release_calls(), 1);
}

#[test]
fn test_queries_stay_safe_after_teardown() {
    let (controller, _events, _handle) = ready_controller();
    controller.teardown().expect("teardown");

    assert!(!controller.is_running());
    assert!(controller.preview().is_none());
    controller.pump_preview();
    assert!(controller.device_name().is_some());
}

#[test]
fn test_orientation_follows_surface_bounds() {
    let (controller, _events, handle) = ready_controller();

    controller.on_layout_changed(800, 400).expect("layout");
    assert_eq!(handle.orientation(), Some(Orientation::Landscape));

    controller.on_layout_changed(400, 800).expect("layout");
    assert_eq!(handle.orientation(), Some(Orientation::Portrait));

    // Tie selects portrait
    controller.on_layout_changed(500, 500).expect("layout");
    assert_eq!(handle.orientation(), Some(Orientation::Portrait));
}

#[test]
fn test_layout_before_initialize_carries_over() {
    let (session, handle) = FakeSession::with_device();
    let (controller, _events) = CaptureSessionController::new(session);

    controller.on_layout_changed(800, 400).expect("layout");
    assert_eq!(handle.orientation(), None);

    controller.initialize().expect("initialize");
    assert_eq!(handle.orientation(), Some(Orientation::Landscape));
}

#[test]
fn test_initialize_without_device() {
    let (session, _handle) = FakeSession::without_device();
    let (controller, _events) = CaptureSessionController::new(session);
    assert!(matches!(
        controller.initialize(),
        Err(SessionError::DeviceUnavailable)
    ));
}

#[test]
fn test_configured_device_overrides_the_default() {
    let (session, _handle) = FakeSession::with_device();
    let pinned = VideoDevice::from_path("77");
    let (controller, _events) =
        CaptureSessionController::with_preferred_device(session, Some(pinned));

    controller.initialize().expect("initialize");
    assert_eq!(controller.device_name().as_deref(), Some("77"));
}

#[test]
fn test_configured_device_works_without_a_default() {
    // A pinned device must not depend on enumeration finding anything
    let (session, _handle) = FakeSession::without_device();
    let (controller, _events) = CaptureSessionController::with_preferred_device(
        session,
        Some(VideoDevice::from_path("77")),
    );

    controller.initialize().expect("initialize");
    assert!(controller.device_name().is_some());
}

#[test]
fn test_initialize_surfaces_driver_error() {
    let (session, handle) = FakeSession::with_device();
    handle.set_fail_create();
    let (controller, _events) = CaptureSessionController::new(session);

    let err = controller.initialize().expect_err("must fail");
    assert!(matches!(err, SessionError::InputConstruction(_)));
    assert!(err.to_string().contains("busy"));
}

#[test]
fn test_rejected_input_leaves_session_empty() {
    let (session, handle) = FakeSession::with_device();
    handle.set_reject_input();
    let (controller, _events) = CaptureSessionController::new(session);

    assert!(matches!(
        controller.initialize(),
        Err(SessionError::InputRejected)
    ));
    assert!(!handle.input_attached());
}

#[test]
fn test_rejected_output_releases_the_input() {
    let (session, handle) = FakeSession::with_device();
    handle.set_reject_output();
    let (controller, _events) = CaptureSessionController::new(session);

    assert!(matches!(
        controller.initialize(),
        Err(SessionError::OutputRejected)
    ));
    assert!(!handle.input_attached());
    assert_eq!(handle.release_calls(), 1);
}

#[test]
fn test_attach_failure_releases_the_session() {
    let (session, handle) = FakeSession::with_device();
    handle.set_fail_add_input();
    let (controller, _events) = CaptureSessionController::new(session);

    assert!(matches!(
        controller.initialize(),
        Err(SessionError::InputConstruction(_))
    ));
    assert!(!handle.input_attached());
    assert_eq!(handle.release_calls(), 1);
}

#[test]
fn test_stop_timeout_still_counts_as_stopped() {
    let (controller, _events, handle) = ready_controller();
    handle.set_stop_times_out();

    controller.start().expect("start");
    assert!(matches!(controller.stop(), Err(SessionError::StopTimeout)));
    assert!(!controller.is_running());

    // The controller is not wedged; a later run works
    controller.start().expect("restart");
    assert!(controller.is_running());
}

#[test]
fn test_reinitialize_releases_the_previous_attachment() {
    let (controller, _events, handle) = ready_controller();
    controller.start().expect("start");

    controller.initialize().expect("reinitialize");
    assert_eq!(handle.release_calls(), 1);
    assert!(!controller.is_running());
    assert_eq!(handle.create_calls(), 2);
    assert!(handle.input_attached());
}

#[test]
fn test_start_before_initialize_is_ignored() {
    let (session, handle) = FakeSession::with_device();
    let (controller, _events) = CaptureSessionController::new(session);

    controller.start().expect("ignored");
    assert!(!controller.is_running());
    assert_eq!(handle.start_calls(), 0);
}

#[test]
fn test_detection_from_the_capture_thread() {
    let (controller, mut events, handle) = ready_controller();
    controller.start().expect("start");

    let worker = std::thread::spawn(move || {
        handle.deliver(&[qr("threaded")]);
    });
    worker.join().expect("join");

    assert!(!controller.is_running());
    let delivered = drain(&mut events);
    assert_eq!(delivered.len(), 1);
    let SessionEvent::CodeDetected(code) = &delivered[0];
    assert_eq!(code.payload, "threaded");
}

#[test]
fn test_end_to_end_detection_to_display() {
    let (controller, mut events, handle) = ready_controller();
    controller.start().expect("start");

    handle.deliver(&[qr("https://example.com")]);

    assert!(!controller.is_running());
    let delivered = drain(&mut events);
    assert_eq!(delivered.len(), 1);
    let SessionEvent::CodeDetected(code) = &delivered[0];
    assert_eq!(code.payload, "https://example.com");

    // The display side renders this payload without an encoding error
    let image = encode::generate(&code.payload, &EncodeProfile::default()).expect("encode");
    assert!(image.width() > 0);
}
