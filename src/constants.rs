// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// GStreamer pipeline constants
pub mod pipeline {
    /// Maximum appsink buffer queue size (keep small for low latency)
    pub const MAX_BUFFERS: u32 = 2;

    /// Capacity of the bounded frame channels (preview and analyzer)
    ///
    /// Full channels drop frames instead of blocking the streaming thread.
    pub const FRAME_CHANNEL_CAPACITY: usize = 4;

    /// Output pixel format for appsink
    /// RGBA uses 4 bytes/pixel - every consumer samples the same layout
    pub const OUTPUT_FORMAT: &str = "RGBA";

    /// Get number of threads for videoconvert based on available CPU threads
    pub fn videoconvert_threads() -> u32 {
        std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(4) // Fallback to 4 if detection fails
    }
}

/// Timing constants
pub mod timing {
    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// Pipeline state change timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Pipeline playing state timeout on start
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// Terminal event poll interval (~60fps)
    pub const EVENT_POLL_MS: u64 = 16;

    /// Analyzer idle sleep when no frame is queued
    pub const ANALYZE_IDLE_MS: u64 = 10;

    /// Default pause between two decode attempts
    pub const SCAN_INTERVAL_MS: u64 = 100;

    /// Upper bound on waiting for the feedback cue to finish
    pub const CUE_TIMEOUT_SECS: u64 = 5;
}

/// Frame analysis constants
pub mod analyzer {
    /// Frames larger than this are downscaled before decoding
    ///
    /// QR detection does not benefit from full-resolution frames and the
    /// decoder cost grows with the pixel count.
    pub const MAX_DIMENSION: u32 = 640;
}

/// QR generation profile
///
/// Matches the parameters the scanner was tuned against: low error
/// correction keeps the module count small for a given payload, the module
/// size and quiet zone keep the image readable from another screen.
pub mod encoding {
    /// Rendered pixels per QR module
    pub const MODULE_PIXELS: u32 = 10;

    /// Quiet zone width in modules
    pub const QUIET_ZONE_MODULES: u32 = 4;
}

/// Audio feedback constants
pub mod audio {
    /// Default detection cue when the config does not name one
    pub const DEFAULT_CUE: &str = "/usr/share/sounds/freedesktop/stereo/complete.oga";
}

/// Terminal UI constants
pub mod ui {
    /// Displayed QR image side as a fraction of the shorter screen dimension
    pub const DISPLAY_FRACTION: f32 = 0.9;

    /// Rows reserved for the status bar
    pub const STATUS_BAR_HEIGHT: u16 = 1;

    /// Row the display-screen caption is centered on
    pub const CAPTION_ROW: u16 = 1;
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
