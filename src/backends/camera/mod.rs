// SPDX-License-Identifier: MPL-2.0

//! Capture session abstraction
//!
//! This module provides the trait boundary between the session controller and
//! the platform capture stack.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │  CaptureSessionController│  ← Lifecycle state machine
//! └───────────┬──────────────┘
//!             │
//!             ▼
//! ┌──────────────────────────┐
//! │   CaptureSession trait   │  ← Input/output attachment, start/stop
//! └───────────┬──────────────┘
//!             │
//!             ▼
//!       ┌───────────┐
//!       │ GStreamer │  ← Concrete implementation (pipewiresrc)
//!       └───────────┘
//! ```
//!
//! Attachment is a two-step handshake on both sides: `create_input` produces
//! a token, `can_add_input` asks whether the session will take it, and only
//! then does `add_input` attach. A rejected attachment leaves the session
//! exactly as it was.

pub mod gst;
pub mod types;

pub use types::*;

use std::sync::Arc;
use std::time::Duration;

/// Receiver for recognized-object batches
///
/// Invoked on the capture-processing thread, never on the UI thread; an
/// implementation that mutates UI state must hop threads itself. Batches
/// arrive strictly one at a time.
pub trait MetadataSink: Send + Sync {
    /// One ordered batch of objects recognized in a single frame
    fn on_metadata_objects(&self, objects: &[MetadataObject]);
}

/// Platform capture session
///
/// Holds at most one video input and at most one metadata output. The
/// session starts and stops frame delivery without losing its attachments;
/// `release` detaches everything and frees the hardware.
pub trait CaptureSession: Send {
    /// Default video device, or None when the platform has no camera
    fn default_device(&mut self) -> Option<VideoDevice>;

    /// Construct a platform input for the device
    ///
    /// The returned token must be attached (or forgotten) before another
    /// input can be created.
    fn create_input(&mut self, device: &VideoDevice) -> CaptureResult<InputToken>;

    /// Ask whether the session would accept this input
    fn can_add_input(&self, token: InputToken) -> bool;

    /// Attach a previously created input
    fn add_input(&mut self, token: InputToken) -> CaptureResult<()>;

    /// Ask whether the session would accept a metadata output
    fn can_add_output(&self) -> bool;

    /// Attach the metadata output
    ///
    /// `symbologies` restricts recognition; objects of other types are never
    /// delivered to the sink.
    fn add_metadata_output(
        &mut self,
        symbologies: Vec<Symbology>,
        sink: Arc<dyn MetadataSink>,
    ) -> CaptureResult<()>;

    /// Begin frame delivery; a no-op when already running
    fn start_running(&mut self) -> CaptureResult<()>;

    /// Pause frame delivery, keeping the device configured
    ///
    /// Bounded wait; on timeout the session records itself as stopped and
    /// returns `CaptureError::StopTimeout`.
    fn stop_running(&mut self) -> CaptureResult<()>;

    fn is_running(&self) -> bool;

    /// Whether the preview connection accepts an orientation setting
    fn supports_orientation(&self) -> bool;

    /// Apply the preview orientation; ignored when unsupported
    fn set_orientation(&mut self, orientation: Orientation);

    /// Hand out the preview frame stream (once)
    fn take_preview_receiver(&mut self) -> Option<FrameReceiver>;

    /// Detach everything and free the hardware; safe to call repeatedly
    fn release(&mut self);
}

/// Get a concrete capture session (GStreamer/PipeWire)
///
/// `scan_interval` paces decode attempts on the analyzer thread.
pub fn create_session(scan_interval: Duration) -> Box<dyn CaptureSession> {
    Box::new(gst::GstCaptureSession::with_scan_interval(scan_interval))
}
