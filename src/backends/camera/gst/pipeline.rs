// SPDX-License-Identifier: MPL-2.0

//! GStreamer capture pipeline
//!
//! Built once per attached input and driven through three states: READY
//! while the session is configured but idle, PLAYING while frames are
//! delivered, PAUSED while the session is stopped but keeps the device.

use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::backends::camera::types::*;
use crate::constants::{pipeline, timing};

static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Camera capture pipeline feeding the preview and analyzer channels
pub struct CameraPipeline {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
}

impl CameraPipeline {
    /// Build the pipeline for a device and park it in READY
    ///
    /// Frames fan out into both senders from the streaming thread; a full
    /// channel drops the frame rather than blocking.
    pub fn new(
        device: &VideoDevice,
        preview_sender: FrameSender,
        analyze_sender: FrameSender,
    ) -> CaptureResult<Self> {
        info!(device = %device.name, "Creating capture pipeline");

        gstreamer::init().map_err(|e| CaptureError::NotAvailable(e.to_string()))?;

        let source = if device.path.is_empty() {
            "pipewiresrc do-timestamp=true".to_string()
        } else {
            format!("pipewiresrc target-object={} do-timestamp=true", device.path)
        };

        let launch = format!(
            "{} ! queue ! videoconvert n-threads={} ! video/x-raw,format={} ! appsink name=sink",
            source,
            pipeline::videoconvert_threads(),
            pipeline::OUTPUT_FORMAT,
        );
        debug!(launch = %launch, "Pipeline description");

        let pipeline = gstreamer::parse::launch(&launch)
            .map_err(|e| CaptureError::Pipeline(e.to_string()))?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| CaptureError::Pipeline("Launch did not produce a pipeline".to_string()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CaptureError::Pipeline("Failed to get appsink".to_string()))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| CaptureError::Pipeline("Failed to cast appsink".to_string()))?;

        appsink.set_property("emit-signals", true);
        appsink.set_property("sync", false); // Disable sync for lowest latency
        appsink.set_property("max-buffers", pipeline::MAX_BUFFERS);
        appsink.set_property("drop", true); // Drop old frames if processing is slow
        appsink.set_property("enable-last-sample", false); // Don't keep last sample in memory

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let frame_start = Instant::now();
                    let frame_num = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);

                    let sample = match appsink.pull_sample() {
                        Ok(s) => s,
                        Err(e) => {
                            if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                                error!(frame = frame_num, error = ?e, "Failed to pull sample");
                            }
                            return Err(gstreamer::FlowError::Eos);
                        }
                    };

                    let buffer = sample.buffer().ok_or_else(|| {
                        if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                            error!(frame = frame_num, "No buffer in sample");
                        }
                        gstreamer::FlowError::Error
                    })?;

                    let caps = sample.caps().ok_or_else(|| {
                        if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                            error!(frame = frame_num, "No caps in sample");
                        }
                        gstreamer::FlowError::Error
                    })?;

                    let video_info = VideoInfo::from_caps(caps).map_err(|e| {
                        if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                            error!(frame = frame_num, error = ?e, "Failed to get video info");
                        }
                        gstreamer::FlowError::Error
                    })?;

                    let map = buffer.map_readable().map_err(|e| {
                        if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                            error!(frame = frame_num, error = ?e, "Failed to map buffer");
                        }
                        gstreamer::FlowError::Error
                    })?;

                    let frame = CameraFrame {
                        width: video_info.width(),
                        height: video_info.height(),
                        stride: video_info.stride()[0] as u32,
                        data: Arc::from(map.as_slice()),
                        captured_at: frame_start,
                    };

                    // Fan out; dropping on a full channel keeps the streaming
                    // thread from ever blocking.
                    let mut preview = preview_sender.clone();
                    if let Err(e) = preview.try_send(frame.clone())
                        && frame_num % timing::FRAME_LOG_INTERVAL == 0
                    {
                        debug!(frame = frame_num, error = %e, "Preview frame dropped");
                    }
                    let mut analyze = analyze_sender.clone();
                    if let Err(e) = analyze.try_send(frame)
                        && frame_num % timing::FRAME_LOG_INTERVAL == 0
                    {
                        debug!(frame = frame_num, error = %e, "Analyzer frame dropped");
                    }

                    if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                        debug!(
                            frame = frame_num,
                            width = video_info.width(),
                            height = video_info.height(),
                            total_us = frame_start.elapsed().as_micros(),
                            "Frame delivered"
                        );
                    }

                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        pipeline
            .set_state(gstreamer::State::Ready)
            .map_err(|e| CaptureError::Pipeline(format!("Failed to reach READY: {}", e)))?;

        info!(device = %device.name, "Capture pipeline ready");

        Ok(Self { pipeline, appsink })
    }

    /// Begin frame delivery
    pub fn play(&self) -> CaptureResult<()> {
        debug!("Setting pipeline to PLAYING state");
        self.pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| CaptureError::StartFailed(e.to_string()))?;

        let (result, state, pending) = self
            .pipeline
            .state(gstreamer::ClockTime::from_seconds(timing::START_TIMEOUT_SECS));
        debug!(result = ?result, state = ?state, pending = ?pending, "Pipeline state after start");

        // Device-open failures (busy, permission) arrive as bus errors
        if let Some(message) = self.bus_error() {
            let _ = self.pipeline.set_state(gstreamer::State::Null);
            return Err(CaptureError::StartFailed(message));
        }
        if result.is_err() {
            return Err(CaptureError::StartFailed(format!(
                "Pipeline stuck in {:?}",
                state
            )));
        }
        if state != gstreamer::State::Playing {
            warn!(state = ?state, "Pipeline is not yet in PLAYING state");
        }

        Ok(())
    }

    /// Pause frame delivery, keeping the device configured
    pub fn pause(&self) -> CaptureResult<()> {
        debug!("Setting pipeline to PAUSED state");
        if self.pipeline.set_state(gstreamer::State::Paused).is_err() {
            return Err(CaptureError::StopTimeout);
        }

        let (result, state, _) = self
            .pipeline
            .state(gstreamer::ClockTime::from_seconds(timing::STOP_TIMEOUT_SECS));
        if result.is_err() || state == gstreamer::State::Playing {
            warn!(state = ?state, "Pipeline did not acknowledge pause in time");
            return Err(CaptureError::StopTimeout);
        }

        debug!(state = ?state, "Pipeline paused");
        Ok(())
    }

    /// Tear the pipeline down and free the device
    pub fn shutdown(&self) {
        debug!("Clearing appsink callbacks");
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());

        let _ = self.pipeline.set_state(gstreamer::State::Null);
        let (result, state, _) = self
            .pipeline
            .state(gstreamer::ClockTime::from_seconds(timing::STOP_TIMEOUT_SECS));
        match result {
            Ok(_) => info!("Capture pipeline shut down"),
            Err(e) => debug!(error = ?e, state = ?state, "Pipeline state change had issues"),
        }
    }

    /// Drain the bus and return the first error message, if any
    fn bus_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        while let Some(message) = bus.pop() {
            if let gstreamer::MessageView::Error(err) = message.view() {
                return Some(format!(
                    "{} ({})",
                    err.error(),
                    err.debug().unwrap_or_default()
                ));
            }
        }
        None
    }
}

impl Drop for CameraPipeline {
    fn drop(&mut self) {
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        let _ = self.pipeline.set_state(gstreamer::State::Null);
    }
}
