// SPDX-License-Identifier: GPL-3.0-only

//! Capture session lifecycle controller
//!
//! The controller owns one capture session and enforces its lifecycle:
//!
//! ```text
//!   initialize() ──> start() <──> stop() ──> teardown()
//!                      │                        │
//!                      └── detection fires ─────┘
//!                          (stop + one event)
//! ```
//!
//! Two callers race on this state: the UI thread (start/stop/toggle/layout/
//! teardown) and the capture-processing thread (detection callbacks). A
//! single mutex serializes them. Detection is one-shot per run: the first
//! recognized code stops the session and emits exactly one event; start()
//! arms the next run. UI-visible reactions to a detection happen on the UI
//! thread, which drains the event channel; the callback thread never touches
//! the terminal.

pub mod bridge;
pub mod surface;

use std::sync::{Arc, Mutex};

use futures::channel::mpsc;
use tracing::{debug, info, trace, warn};

use crate::backends::camera::CaptureSession;
use crate::backends::camera::types::{Orientation, Symbology, VideoDevice};

pub use bridge::{DetectionTarget, MetadataDetectionBridge};
pub use surface::{PreviewSnapshot, PreviewSurface};

/// A decoded machine-readable code, produced at most once per session run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCode {
    pub symbology: Symbology,
    pub payload: String,
}

/// Events the controller delivers to its owning screen
///
/// Emitted from the capture-processing thread; the owner drains them on the
/// UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    CodeDetected(DetectedCode),
}

pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Result type for controller operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Error types for controller operations
#[derive(Debug, Clone)]
pub enum SessionError {
    /// No capture device is present or accessible
    DeviceUnavailable,
    /// An input could not be constructed or the driver refused to deliver
    InputConstruction(String),
    /// The session refused the constructed input
    InputRejected,
    /// The session refused the metadata output
    OutputRejected,
    /// The controller was already torn down
    AlreadyTornDown,
    /// The session did not acknowledge a stop within the bounded wait
    StopTimeout,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::DeviceUnavailable => write!(f, "No capture device available"),
            SessionError::InputConstruction(msg) => {
                write!(f, "Input construction failed: {}", msg)
            }
            SessionError::InputRejected => write!(f, "Session rejected the video input"),
            SessionError::OutputRejected => write!(f, "Session rejected the metadata output"),
            SessionError::AlreadyTornDown => write!(f, "Session already torn down"),
            SessionError::StopTimeout => write!(f, "Session stop timed out"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Internal controller state, serialized by one mutex
struct ControllerState {
    session: Box<dyn CaptureSession>,
    surface: PreviewSurface,
    /// Device pinned by configuration, attached instead of the default
    preferred: Option<VideoDevice>,
    device: Option<VideoDevice>,
    initialized: bool,
    running: bool,
    /// One-shot latch; set by the first detection of a run, cleared by
    /// start() and initialize()
    fired: bool,
    torn_down: bool,
}

struct ControllerInner {
    state: Mutex<ControllerState>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

/// Owns a capture session and enforces the lifecycle/detection contract
///
/// Thread-safe: operations may be invoked from the UI thread while detection
/// callbacks arrive on the capture-processing thread.
pub struct CaptureSessionController {
    inner: Arc<ControllerInner>,
}

impl CaptureSessionController {
    /// Create a controller around a session, plus the event stream the
    /// owning screen drains
    pub fn new(session: Box<dyn CaptureSession>) -> (Self, EventReceiver) {
        Self::with_preferred_device(session, None)
    }

    /// A controller that attaches `preferred` instead of the platform
    /// default device
    pub fn with_preferred_device(
        session: Box<dyn CaptureSession>,
        preferred: Option<VideoDevice>,
    ) -> (Self, EventReceiver) {
        let (events, receiver) = mpsc::unbounded();

        let state = ControllerState {
            session,
            surface: PreviewSurface::bound_to(None),
            preferred,
            device: None,
            initialized: false,
            running: false,
            fired: false,
            torn_down: false,
        };

        let inner = Arc::new(ControllerInner {
            state: Mutex::new(state),
            events,
        });

        (Self { inner }, receiver)
    }

    /// Attach a capture device and the metadata output, bind the preview
    ///
    /// Does not start the session; start is separate so screens can defer
    /// activation until they are visible. On any failure nothing stays
    /// attached. Reinitializing an attached controller releases the previous
    /// attachment first, and arms a fresh detection run.
    pub fn initialize(&self) -> SessionResult<()> {
        let weak = Arc::downgrade(&self.inner);
        let target: DetectionTarget = Box::new(move |code| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_detected(code);
            }
        });

        let mut state = self.inner.state.lock().unwrap();
        if state.torn_down {
            return Err(SessionError::AlreadyTornDown);
        }
        if state.initialized {
            debug!("Reinitializing; releasing the previous attachment");
            state.surface.detach();
            state.session.release();
            state.initialized = false;
            state.running = false;
            state.device = None;
        }

        let device = state
            .preferred
            .clone()
            .or_else(|| state.session.default_device())
            .ok_or(SessionError::DeviceUnavailable)?;
        info!(device = %device, "Initializing capture session");

        let token = state
            .session
            .create_input(&device)
            .map_err(|err| SessionError::InputConstruction(err.to_string()))?;
        if !state.session.can_add_input(token) {
            warn!(device = %device, "Session cannot accept the video input");
            return Err(SessionError::InputRejected);
        }
        if let Err(err) = state.session.add_input(token) {
            state.session.release();
            return Err(SessionError::InputConstruction(err.to_string()));
        }

        if !state.session.can_add_output() {
            warn!("Session cannot accept the metadata output");
            state.session.release();
            return Err(SessionError::OutputRejected);
        }
        let bridge = MetadataDetectionBridge::new(vec![Symbology::QrCode], target);
        if let Err(err) = state
            .session
            .add_metadata_output(vec![Symbology::QrCode], Arc::new(bridge))
        {
            warn!(error = %err, "Metadata output attachment failed");
            state.session.release();
            return Err(SessionError::OutputRejected);
        }

        // Rebind the preview, carrying layout state over to the new stream
        let (width, height) = state.surface.bounds();
        let orientation = state.surface.orientation();
        let mut surface = PreviewSurface::bound_to(state.session.take_preview_receiver());
        surface.resize(width, height);
        surface.set_orientation(orientation);
        if state.session.supports_orientation() {
            state.session.set_orientation(orientation);
        }
        state.surface = surface;

        state.device = Some(device);
        state.initialized = true;
        state.fired = false;
        Ok(())
    }

    /// Begin frame delivery; no-op if already running
    ///
    /// Arms a new detection run, so a session resumed after a detection can
    /// detect again.
    pub fn start(&self) -> SessionResult<()> {
        let mut state = self.inner.state.lock().unwrap();
        if state.torn_down {
            return Err(SessionError::AlreadyTornDown);
        }
        ControllerInner::start_locked(&mut state)
    }

    /// Halt frame delivery; no-op if already stopped
    ///
    /// Safe to call from the detection-callback thread. Returns
    /// `StopTimeout` when the session never acknowledges, in which case the
    /// controller still counts as stopped.
    pub fn stop(&self) -> SessionResult<()> {
        let mut state = self.inner.state.lock().unwrap();
        if state.torn_down {
            return Err(SessionError::AlreadyTornDown);
        }
        ControllerInner::stop_locked(&mut state)
    }

    /// Flip between running and stopped under a single lock acquisition
    ///
    /// A detection firing concurrently either wins the lock first (the
    /// toggle then restarts a stopped session) or loses it (the run is over
    /// before the callback checks its guards). No interleaving observes a
    /// half-toggled state.
    pub fn toggle(&self) -> SessionResult<()> {
        let mut state = self.inner.state.lock().unwrap();
        if state.torn_down {
            return Err(SessionError::AlreadyTornDown);
        }
        if state.running {
            ControllerInner::stop_locked(&mut state)
        } else {
            ControllerInner::start_locked(&mut state)
        }
    }

    /// Propagate new surface bounds (pixels) from a layout pass
    ///
    /// Recomputed on every pass: rotation changes bounds without recreating
    /// the session. A strictly wider surface selects landscape.
    pub fn on_layout_changed(&self, width: u32, height: u32) -> SessionResult<()> {
        let mut state = self.inner.state.lock().unwrap();
        if state.torn_down {
            return Err(SessionError::AlreadyTornDown);
        }

        state.surface.resize(width, height);
        let orientation = Orientation::from_bounds(width, height);
        if orientation != state.surface.orientation() {
            debug!(%orientation, width, height, "Preview orientation changed");
        }
        state.surface.set_orientation(orientation);
        if state.initialized && state.session.supports_orientation() {
            state.session.set_orientation(orientation);
        }
        Ok(())
    }

    /// Stop if running, detach the preview, release all session resources
    ///
    /// Exactly once: the second call fails with `AlreadyTornDown`. A stop
    /// timeout is logged, not propagated; teardown always completes.
    pub fn teardown(&self) -> SessionResult<()> {
        let mut state = self.inner.state.lock().unwrap();
        if state.torn_down {
            return Err(SessionError::AlreadyTornDown);
        }

        if state.running && let Err(err) = ControllerInner::stop_locked(&mut state) {
            warn!(error = %err, "Teardown proceeding after stop timeout");
        }
        state.surface.detach();
        state.session.release();
        state.initialized = false;
        state.torn_down = true;
        info!("Capture session torn down");
        Ok(())
    }

    /// Drain pending preview frames, keeping the newest
    ///
    /// Safe after teardown; a detached surface pumps nothing.
    pub fn pump_preview(&self) {
        self.inner.state.lock().unwrap().surface.pump();
    }

    /// Latest preview frame plus orientation
    pub fn preview(&self) -> Option<PreviewSnapshot> {
        self.inner.state.lock().unwrap().surface.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().unwrap().running
    }

    /// Name of the attached device, for status display
    pub fn device_name(&self) -> Option<String> {
        self.inner
            .state
            .lock()
            .unwrap()
            .device
            .as_ref()
            .map(|device| device.name.clone())
    }
}

impl std::fmt::Debug for CaptureSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock().unwrap();
        f.debug_struct("CaptureSessionController")
            .field("initialized", &state.initialized)
            .field("running", &state.running)
            .field("fired", &state.fired)
            .field("torn_down", &state.torn_down)
            .finish()
    }
}

impl ControllerInner {
    fn start_locked(state: &mut ControllerState) -> SessionResult<()> {
        if !state.initialized {
            warn!("Start requested before initialization; ignoring");
            return Ok(());
        }
        if state.running {
            debug!("Start requested while already running");
            return Ok(());
        }

        state
            .session
            .start_running()
            .map_err(|err| SessionError::InputConstruction(err.to_string()))?;
        state.running = true;
        state.fired = false;
        info!("Capture session running");
        Ok(())
    }

    fn stop_locked(state: &mut ControllerState) -> SessionResult<()> {
        if !state.initialized {
            warn!("Stop requested before initialization; ignoring");
            return Ok(());
        }
        if !state.running {
            debug!("Stop requested while already stopped");
            return Ok(());
        }

        // Stopped either way; a wedged session must not wedge the controller
        state.running = false;
        match state.session.stop_running() {
            Ok(()) => {
                info!("Capture session stopped");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Stop not acknowledged; treating session as stopped");
                Err(SessionError::StopTimeout)
            }
        }
    }

    /// Detection entry point, invoked on the capture-processing thread
    ///
    /// Guards make late callbacks harmless: anything arriving after a stop,
    /// after the run's first detection, or after teardown is dropped. The
    /// session is stopped before the event becomes observable.
    fn handle_detected(&self, code: DetectedCode) {
        let mut state = self.state.lock().unwrap();
        if state.torn_down || !state.initialized || !state.running || state.fired {
            trace!("Ignoring detection outside an active run");
            return;
        }

        state.fired = true;
        info!(symbology = %code.symbology, "Code detected; stopping session");
        if let Err(err) = Self::stop_locked(&mut state) {
            warn!(error = %err, "Stop after detection timed out");
        }
        drop(state);

        if self
            .events
            .unbounded_send(SessionEvent::CodeDetected(code))
            .is_err()
        {
            debug!("Detection event dropped; receiver is gone");
        }
    }
}
