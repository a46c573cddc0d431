// SPDX-License-Identifier: MPL-2.0

//! Detection feedback cue
//!
//! Plays a short sound file through a fire-and-forget playbin. Audio is pure
//! feedback: every failure here is logged and swallowed, scanning never
//! depends on it.

use gstreamer::prelude::*;
use std::path::Path;
use std::thread;
use tracing::{debug, warn};

use crate::constants::timing;

/// Play a sound file without blocking the caller
pub fn play_cue(path: &Path) {
    if gstreamer::init().is_err() {
        debug!("GStreamer init failed, cue skipped");
        return;
    }

    let uri = match gstreamer::glib::filename_to_uri(path, None) {
        Ok(uri) => uri,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cue path is not playable");
            return;
        }
    };

    let playbin = match gstreamer::parse::launch(&format!("playbin uri={}", uri)) {
        Ok(element) => match element.downcast::<gstreamer::Pipeline>() {
            Ok(pipeline) => pipeline,
            Err(_) => {
                warn!("Failed to downcast playbin");
                return;
            }
        },
        Err(e) => {
            warn!(error = %e, "Failed to create cue pipeline");
            return;
        }
    };

    if let Err(e) = playbin.set_state(gstreamer::State::Playing) {
        warn!(error = %e, "Failed to start cue playback");
        let _ = playbin.set_state(gstreamer::State::Null);
        return;
    }

    debug!(uri = %uri, "Cue playing");

    // Watch for completion off-thread so the UI never waits on audio.
    thread::spawn(move || {
        if let Some(bus) = playbin.bus() {
            let message = bus.timed_pop_filtered(
                gstreamer::ClockTime::from_seconds(timing::CUE_TIMEOUT_SECS),
                &[gstreamer::MessageType::Eos, gstreamer::MessageType::Error],
            );
            if let Some(message) = message
                && let gstreamer::MessageView::Error(err) = message.view()
            {
                debug!(error = %err.error(), "Cue playback error");
            }
        }
        let _ = playbin.set_state(gstreamer::State::Null);
    });
}
