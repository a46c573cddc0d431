// SPDX-License-Identifier: MPL-2.0

//! qr-mirror - a terminal QR code scanner and magnifier
//!
//! Points a camera at the world, recognizes the first QR code it sees, and
//! presents the decoded payload as a freshly rendered, screen-filling code.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Terminal UI, screen stack, and rendering
//! - [`backends`]: Camera and audio backend abstraction
//! - [`session`]: Capture session lifecycle and detection handling
//! - [`encode`]: QR raster generation and saving
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! // This is a terminal application, typically run via:
//! // qr-mirror
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod encode;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use session::{CaptureSessionController, DetectedCode, SessionError, SessionEvent};
