// SPDX-License-Identifier: MPL-2.0

//! Backend layer for hardware access
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Session Layer                  │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐   │
//! │  │    Audio    │    │     Camera       │   │
//! │  │  (playbin)  │    │   (pipewiresrc)  │   │
//! │  └─────────────┘    └──────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! - [`audio`]: fire-and-forget feedback cue playback
//! - [`camera`]: capture session trait and its GStreamer implementation

pub mod audio;
pub mod camera;
