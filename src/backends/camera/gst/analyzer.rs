// SPDX-License-Identifier: GPL-3.0-only

//! Metadata analyzer thread
//!
//! A single worker drains the analyzer frame channel, decodes QR codes with
//! rqrr and invokes the registered sink with one ordered batch per analyzed
//! frame. The worker is the only caller of the sink, so batches are strictly
//! serialized.

use image::GrayImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::backends::camera::types::*;
use crate::backends::camera::MetadataSink;
use crate::constants::{analyzer, timing};

/// Handle to the analyzer worker thread
///
/// `request_stop` never joins: the loop observes the flag within one idle
/// interval, and a join could deadlock against a sink callback that is
/// waiting on a lock held by the caller.
pub struct AnalyzerHandle {
    stop_signal: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl AnalyzerHandle {
    /// Spawn the worker on `receiver`
    ///
    /// `symbologies` restricts what may be reported; frames decode to
    /// nothing when QR is not among them.
    pub fn spawn(
        receiver: FrameReceiver,
        symbologies: Vec<Symbology>,
        sink: Arc<dyn MetadataSink>,
        scan_interval: Duration,
    ) -> Self {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_signal);

        info!(interval_ms = scan_interval.as_millis() as u64, "Starting metadata analyzer");

        let thread = thread::spawn(move || {
            analyze_loop(receiver, symbologies, sink, scan_interval, stop);
        });

        Self {
            stop_signal,
            thread: Some(thread),
        }
    }

    /// Signal the loop to stop (non-blocking)
    pub fn request_stop(&self) {
        debug!("Requesting analyzer stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Check if the worker thread is still alive
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for AnalyzerHandle {
    fn drop(&mut self) {
        self.request_stop();
    }
}

fn analyze_loop(
    mut receiver: FrameReceiver,
    symbologies: Vec<Symbology>,
    sink: Arc<dyn MetadataSink>,
    scan_interval: Duration,
    stop: Arc<AtomicBool>,
) {
    debug!("Analyzer thread started");
    let mut last_scan: Option<Instant> = None;

    loop {
        if stop.load(Ordering::SeqCst) {
            debug!("Analyzer stop signal received");
            break;
        }

        // Drain to the newest frame; stale frames are useless for scanning.
        let mut latest = None;
        let mut closed = false;
        loop {
            match receiver.try_next() {
                Ok(Some(frame)) => latest = Some(frame),
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break, // empty, channel still open
            }
        }

        if closed && latest.is_none() {
            debug!("Frame channel closed, analyzer exiting");
            break;
        }

        let Some(frame) = latest else {
            thread::sleep(Duration::from_millis(timing::ANALYZE_IDLE_MS));
            continue;
        };

        if let Some(at) = last_scan
            && at.elapsed() < scan_interval
        {
            // Not due yet; the frame is dropped, a newer one will arrive.
            thread::sleep(Duration::from_millis(timing::ANALYZE_IDLE_MS));
            continue;
        }
        last_scan = Some(Instant::now());

        let objects = decode_frame(&frame, &symbologies);
        if !objects.is_empty() {
            debug!(count = objects.len(), "Reporting recognized objects");
            sink.on_metadata_objects(&objects);
        }
    }

    info!("Analyzer thread exiting");
}

/// Decode all QR codes in a frame, in grid-detection order
fn decode_frame(frame: &CameraFrame, symbologies: &[Symbology]) -> Vec<MetadataObject> {
    if !symbologies.contains(&Symbology::QrCode) {
        return Vec::new();
    }

    let start = Instant::now();
    let gray = if frame.width.max(frame.height) > analyzer::MAX_DIMENSION {
        let scale = (frame.width as f32 / analyzer::MAX_DIMENSION as f32)
            .max(frame.height as f32 / analyzer::MAX_DIMENSION as f32);
        let width = (frame.width as f32 / scale) as u32;
        let height = (frame.height as f32 / scale) as u32;
        downscale_luma(frame, width.max(1), height.max(1))
    } else {
        luma_plane(frame)
    };

    let mut prepared = rqrr::PreparedImage::prepare(gray);
    let grids = prepared.detect_grids();

    let mut objects = Vec::with_capacity(grids.len());
    for grid in grids {
        match grid.decode() {
            Ok((meta, payload)) => {
                debug!(
                    ecc = meta.ecc_level,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Decoded QR code"
                );
                objects.push(MetadataObject {
                    symbology: Symbology::QrCode,
                    payload,
                });
            }
            Err(e) => {
                debug!(error = %e, "Failed to decode QR grid");
            }
        }
    }

    if objects.is_empty() && start.elapsed() > scan_budget() {
        warn!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Slow empty scan"
        );
    }

    objects
}

fn scan_budget() -> Duration {
    Duration::from_millis(timing::SCAN_INTERVAL_MS * 2)
}

/// Extract the luma plane from an RGBA frame, dropping stride padding
fn luma_plane(frame: &CameraFrame) -> GrayImage {
    let mut pixels = Vec::with_capacity((frame.width * frame.height) as usize);

    for y in 0..frame.height {
        if let Some(row) = frame.row(y) {
            for px in row.chunks_exact(4) {
                pixels.push(luma(px[0], px[1], px[2]));
            }
        } else {
            // Short buffer; pad so the dimensions stay consistent
            pixels.resize(pixels.len() + frame.width as usize, 0);
        }
    }

    GrayImage::from_raw(frame.width, frame.height, pixels)
        .unwrap_or_else(|| GrayImage::new(frame.width, frame.height))
}

/// Downscale an RGBA frame to a luma image using bilinear interpolation
fn downscale_luma(frame: &CameraFrame, dst_width: u32, dst_height: u32) -> GrayImage {
    let src_width = frame.width as usize;
    let src_height = frame.height as usize;
    let stride = frame.stride as usize;

    let mut pixels = Vec::with_capacity((dst_width * dst_height) as usize);

    let x_ratio = src_width as f32 / dst_width as f32;
    let y_ratio = src_height as f32 / dst_height as f32;

    let sample = |px: usize, py: usize| -> f32 {
        let offset = py * stride + px * 4;
        match frame.data.get(offset..offset + 3) {
            Some(rgb) => luma(rgb[0], rgb[1], rgb[2]) as f32,
            None => 0.0,
        }
    };

    for y in 0..dst_height {
        for x in 0..dst_width {
            let src_x = x as f32 * x_ratio;
            let src_y = y as f32 * y_ratio;

            let x0 = src_x as usize;
            let y0 = src_y as usize;
            let x1 = (x0 + 1).min(src_width - 1);
            let y1 = (y0 + 1).min(src_height - 1);

            let x_frac = src_x - x0 as f32;
            let y_frac = src_y - y0 as f32;

            let p00 = sample(x0, y0);
            let p01 = sample(x1, y0);
            let p10 = sample(x0, y1);
            let p11 = sample(x1, y1);

            let value = p00 * (1.0 - x_frac) * (1.0 - y_frac)
                + p01 * x_frac * (1.0 - y_frac)
                + p10 * (1.0 - x_frac) * y_frac
                + p11 * x_frac * y_frac;

            pixels.push(value as u8);
        }
    }

    GrayImage::from_raw(dst_width, dst_height, pixels)
        .unwrap_or_else(|| GrayImage::new(dst_width, dst_height))
}

/// BT.601 luma weights in 8-bit fixed point
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
}
