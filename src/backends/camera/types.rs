// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for capture session implementations

use std::sync::Arc;
use std::time::Instant;

use crate::constants::pipeline;

/// A hardware video source the session can attach to
///
/// `path` is the platform node identifier (PipeWire object path or node id).
/// An empty path means "let the platform pick", which is what the fallback
/// device uses when enumeration is unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDevice {
    pub name: String,
    pub path: String,
}

impl VideoDevice {
    /// Device pinned by its node path alone; the path doubles as the name
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: path.clone(),
            path,
        }
    }
}

impl std::fmt::Display for VideoDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() || self.name == self.path {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.path)
        }
    }
}

/// Token produced by `CaptureSession::create_input`
///
/// The token is only meaningful to the session that issued it. Attachment is
/// a two-step handshake: acceptance check first, then the attach itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputToken(u32);

impl InputToken {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Machine-readable code symbologies the metadata pipeline can be asked for
///
/// Only `QrCode` is ever configured for recognition here; the other variants
/// exist because the platform surface is generic and sinks must be able to
/// filter what they did not ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbology {
    QrCode,
    Aztec,
    Pdf417,
}

impl Symbology {
    /// Platform identifier string for this symbology
    pub fn label(&self) -> &'static str {
        match self {
            Symbology::QrCode => "org.iso.QRCode",
            Symbology::Aztec => "org.iso.Aztec",
            Symbology::Pdf417 => "org.iso.PDF417",
        }
    }
}

impl std::fmt::Display for Symbology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One recognized object within a frame's metadata batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataObject {
    pub symbology: Symbology,
    pub payload: String,
}

/// Preview orientation derived from the hosting surface
///
/// Square surfaces count as portrait; only a strictly wider surface selects
/// landscape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// Derive the orientation from surface bounds in pixels
    pub fn from_bounds(width: u32, height: u32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Orientation::Portrait => write!(f, "portrait"),
            Orientation::Landscape => write!(f, "landscape"),
        }
    }
}

/// A single frame from the camera
///
/// Always RGBA (4 bytes per pixel); rows may carry stride padding. The pixel
/// data is shared, so cloning a frame is cheap.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes (>= width * 4)
    pub stride: u32,
    pub data: Arc<[u8]>,
    /// Timestamp when the frame left the pipeline (for latency diagnostics)
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Pixel row `y` without stride padding, or None when the buffer is short
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        let start = y as usize * self.stride as usize;
        let end = start + self.width as usize * 4;
        self.data.get(start..end)
    }
}

/// Frame receiver handed to the preview surface
pub type FrameReceiver = futures::channel::mpsc::Receiver<CameraFrame>;

/// Frame sender used by pipeline callbacks
pub type FrameSender = futures::channel::mpsc::Sender<CameraFrame>;

/// Create a bounded frame channel
///
/// Senders must use `try_send` and drop the frame when the channel is full;
/// the streaming thread never blocks on a slow consumer.
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    futures::channel::mpsc::channel(pipeline::FRAME_CHANNEL_CAPACITY)
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Error types for capture operations
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// Capture stack is not available on this system
    NotAvailable(String),
    /// Device exists but could not be opened
    OpenFailed(String),
    /// Pipeline construction or negotiation failed
    Pipeline(String),
    /// Pipeline refused to start delivering frames
    StartFailed(String),
    /// Pipeline did not acknowledge the stop within the bounded wait
    StopTimeout,
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::NotAvailable(msg) => write!(f, "Capture not available: {}", msg),
            CaptureError::OpenFailed(msg) => write!(f, "Device open failed: {}", msg),
            CaptureError::Pipeline(msg) => write!(f, "Pipeline error: {}", msg),
            CaptureError::StartFailed(msg) => write!(f, "Start failed: {}", msg),
            CaptureError::StopTimeout => write!(f, "Stop timed out"),
        }
    }
}

impl std::error::Error for CaptureError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_from_bounds() {
        assert_eq!(Orientation::from_bounds(800, 400), Orientation::Landscape);
        assert_eq!(Orientation::from_bounds(400, 800), Orientation::Portrait);
    }

    #[test]
    fn test_orientation_tie_is_portrait() {
        assert_eq!(Orientation::from_bounds(500, 500), Orientation::Portrait);
    }

    #[test]
    fn test_symbology_labels() {
        assert_eq!(Symbology::QrCode.label(), "org.iso.QRCode");
        assert_ne!(Symbology::QrCode.label(), Symbology::Aztec.label());
    }

    #[test]
    fn test_frame_row_bounds() {
        let frame = CameraFrame {
            width: 2,
            height: 2,
            stride: 12, // 4 bytes padding per row
            data: Arc::from(vec![7u8; 24].as_slice()),
            captured_at: Instant::now(),
        };
        assert_eq!(frame.row(0).map(<[u8]>::len), Some(8));
        assert_eq!(frame.row(1).map(<[u8]>::len), Some(8));
        assert_eq!(frame.row(2), None);
    }
}
