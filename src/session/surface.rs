// SPDX-License-Identifier: GPL-3.0-only

//! Preview surface bound to a capture session
//!
//! The surface owns the preview frame stream for exactly one session. It is
//! resized on every layout pass and detached exactly once during teardown;
//! it never outlives its session's controller.

use tracing::debug;

use crate::backends::camera::types::{CameraFrame, FrameReceiver, Orientation};

/// Everything a renderer needs for one draw of the preview
#[derive(Debug, Clone)]
pub struct PreviewSnapshot {
    pub frame: CameraFrame,
    pub orientation: Orientation,
}

/// Screen-space rendering surface for the live preview
pub struct PreviewSurface {
    receiver: Option<FrameReceiver>,
    latest: Option<CameraFrame>,
    bounds: (u32, u32),
    orientation: Orientation,
}

impl PreviewSurface {
    /// Bind the surface to a session's frame stream
    ///
    /// A session without a preview stream still gets a surface; it simply
    /// never produces snapshots.
    pub fn bound_to(receiver: Option<FrameReceiver>) -> Self {
        Self {
            receiver,
            latest: None,
            bounds: (0, 0),
            orientation: Orientation::default(),
        }
    }

    /// Drain the stream, keeping only the newest frame
    pub fn pump(&mut self) {
        let mut closed = false;
        if let Some(receiver) = self.receiver.as_mut() {
            loop {
                match receiver.try_next() {
                    Ok(Some(frame)) => self.latest = Some(frame),
                    Ok(None) => {
                        closed = true;
                        break;
                    }
                    Err(_) => break, // empty, channel still open
                }
            }
        }
        if closed {
            debug!("Preview stream closed");
            self.receiver = None;
        }
    }

    /// Update the surface bounds (pixels) from a layout pass
    pub fn resize(&mut self, width: u32, height: u32) {
        self.bounds = (width, height);
    }

    pub fn bounds(&self) -> (u32, u32) {
        self.bounds
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Latest frame plus orientation, cloned out for rendering
    pub fn snapshot(&self) -> Option<PreviewSnapshot> {
        self.latest.as_ref().map(|frame| PreviewSnapshot {
            frame: frame.clone(),
            orientation: self.orientation,
        })
    }

    /// Drop the stream and the retained frame
    pub fn detach(&mut self) {
        self.receiver = None;
        self.latest = None;
    }
}
