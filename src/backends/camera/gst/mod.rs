// SPDX-License-Identifier: MPL-2.0

//! GStreamer implementation of the capture session
//!
//! The pipeline is built when the input is attached and parked in READY;
//! `start_running`/`stop_running` move it between PLAYING and PAUSED, so a
//! stopped session keeps its negotiated device. The metadata output is a
//! dedicated analyzer thread fed from a bounded frame channel.

pub mod analyzer;
pub mod enumeration;
pub mod pipeline;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use self::analyzer::AnalyzerHandle;
use self::pipeline::CameraPipeline;
use super::{CaptureSession, MetadataSink};
use crate::backends::camera::types::*;
use crate::constants::timing;

struct PendingInput {
    token: InputToken,
    device: VideoDevice,
}

/// Capture session backed by a GStreamer pipeline
pub struct GstCaptureSession {
    pending: Option<PendingInput>,
    attached: Option<VideoDevice>,
    pipeline: Option<CameraPipeline>,
    analyzer: Option<AnalyzerHandle>,
    analyze_receiver: Option<FrameReceiver>,
    preview_receiver: Option<FrameReceiver>,
    running: bool,
    orientation: Orientation,
    scan_interval: Duration,
    next_token: u32,
}

impl GstCaptureSession {
    pub fn new() -> Self {
        Self::with_scan_interval(Duration::from_millis(timing::SCAN_INTERVAL_MS))
    }

    /// A session whose analyzer decodes at most once per `scan_interval`
    pub fn with_scan_interval(scan_interval: Duration) -> Self {
        Self {
            pending: None,
            attached: None,
            pipeline: None,
            analyzer: None,
            analyze_receiver: None,
            preview_receiver: None,
            running: false,
            orientation: Orientation::default(),
            scan_interval,
            next_token: 0,
        }
    }
}

impl Default for GstCaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession for GstCaptureSession {
    fn default_device(&mut self) -> Option<VideoDevice> {
        enumeration::default_device()
    }

    fn create_input(&mut self, device: &VideoDevice) -> CaptureResult<InputToken> {
        if !enumeration::is_capture_available() {
            return Err(CaptureError::NotAvailable(
                "pipewiresrc element missing".to_string(),
            ));
        }

        // A new token supersedes any input that was never attached.
        self.next_token += 1;
        let token = InputToken::new(self.next_token);
        self.pending = Some(PendingInput {
            token,
            device: device.clone(),
        });
        debug!(device = %device.name, token = token.id(), "Created input");
        Ok(token)
    }

    fn can_add_input(&self, token: InputToken) -> bool {
        self.attached.is_none()
            && self
                .pending
                .as_ref()
                .is_some_and(|pending| pending.token == token)
    }

    fn add_input(&mut self, token: InputToken) -> CaptureResult<()> {
        if !self.can_add_input(token) {
            return Err(CaptureError::Pipeline(
                "input token not accepted by this session".to_string(),
            ));
        }
        let pending = match self.pending.take() {
            Some(p) => p,
            None => {
                return Err(CaptureError::Pipeline("no pending input".to_string()));
            }
        };

        let (preview_sender, preview_receiver) = frame_channel();
        let (analyze_sender, analyze_receiver) = frame_channel();

        let pipeline = CameraPipeline::new(&pending.device, preview_sender, analyze_sender)?;

        info!(device = %pending.device.name, "Input attached");
        self.attached = Some(pending.device);
        self.pipeline = Some(pipeline);
        self.preview_receiver = Some(preview_receiver);
        self.analyze_receiver = Some(analyze_receiver);
        Ok(())
    }

    fn can_add_output(&self) -> bool {
        self.analyzer.is_none() && self.analyze_receiver.is_some()
    }

    fn add_metadata_output(
        &mut self,
        symbologies: Vec<Symbology>,
        sink: Arc<dyn MetadataSink>,
    ) -> CaptureResult<()> {
        let receiver = self.analyze_receiver.take().ok_or_else(|| {
            CaptureError::Pipeline("metadata output requires an attached input".to_string())
        })?;

        info!(symbologies = ?symbologies, "Metadata output attached");
        self.analyzer = Some(AnalyzerHandle::spawn(
            receiver,
            symbologies,
            sink,
            self.scan_interval,
        ));
        Ok(())
    }

    fn start_running(&mut self) -> CaptureResult<()> {
        if self.running {
            return Ok(());
        }
        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or_else(|| CaptureError::StartFailed("session has no input".to_string()))?;

        pipeline.play()?;
        self.running = true;
        info!("Capture session running");
        Ok(())
    }

    fn stop_running(&mut self) -> CaptureResult<()> {
        if !self.running {
            return Ok(());
        }
        // Stopped either way; a timeout is reported, not retried.
        self.running = false;

        let Some(pipeline) = self.pipeline.as_ref() else {
            return Ok(());
        };
        match pipeline.pause() {
            Ok(()) => {
                info!("Capture session stopped");
                Ok(())
            }
            Err(CaptureError::StopTimeout) => {
                warn!("Capture session stop timed out, assuming stopped");
                Err(CaptureError::StopTimeout)
            }
            Err(other) => Err(other),
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn supports_orientation(&self) -> bool {
        true
    }

    fn set_orientation(&mut self, orientation: Orientation) {
        if self.orientation != orientation {
            debug!(orientation = %orientation, "Preview orientation changed");
            self.orientation = orientation;
        }
    }

    fn take_preview_receiver(&mut self) -> Option<FrameReceiver> {
        self.preview_receiver.take()
    }

    fn release(&mut self) {
        // Stop flag only; joining here could deadlock against a sink
        // callback blocked on the caller's lock. The loop also exits on its
        // own once the pipeline drops the frame senders.
        if let Some(analyzer) = self.analyzer.take() {
            analyzer.request_stop();
        }
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.shutdown();
        }
        self.pending = None;
        self.attached = None;
        self.analyze_receiver = None;
        self.preview_receiver = None;
        if self.running {
            info!("Capture session released while running");
            self.running = false;
        }
    }
}
