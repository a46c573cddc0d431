// SPDX-License-Identifier: GPL-3.0-only

//! Video source discovery
//!
//! Devices come from `pw-cli ls Node` when the tool is present. When it is
//! not, a single auto-select device (empty path) is offered and PipeWire
//! picks the camera itself.

use tracing::{debug, info, warn};

use crate::backends::camera::types::VideoDevice;

/// Test if the capture stack is available on this system
pub fn is_capture_available() -> bool {
    if gstreamer::init().is_err() {
        return false;
    }

    gstreamer::ElementFactory::make("pipewiresrc")
        .build()
        .is_ok()
}

/// Enumerate video sources
///
/// Returns None when the capture stack itself is missing; an empty result
/// never occurs because the auto-select fallback is always offered.
pub fn discover_devices() -> Option<Vec<VideoDevice>> {
    debug!("Attempting to enumerate video sources");

    if gstreamer::init().is_err() {
        warn!("GStreamer init failed");
        return None;
    }

    if gstreamer::ElementFactory::make("pipewiresrc")
        .build()
        .is_err()
    {
        debug!("pipewiresrc not available");
        return None;
    }

    if let Some(devices) = try_enumerate_with_pw_cli() {
        debug!(count = devices.len(), "Found video sources via pw-cli");
        return Some(devices);
    }

    info!("Using PipeWire auto-selection (default camera)");
    Some(vec![VideoDevice {
        name: "Default Camera (PipeWire)".to_string(),
        path: String::new(), // Empty path = PipeWire auto-selects
    }])
}

/// Default device: the first discovered source
pub fn default_device() -> Option<VideoDevice> {
    discover_devices()?.into_iter().next()
}

fn try_enumerate_with_pw_cli() -> Option<Vec<VideoDevice>> {
    debug!("Trying pw-cli for video source enumeration");

    let output = std::process::Command::new("pw-cli")
        .args(["ls", "Node"])
        .output()
        .ok()?;

    if !output.status.success() {
        debug!("pw-cli command failed");
        return None;
    }

    let devices = parse_pw_cli_nodes(&String::from_utf8_lossy(&output.stdout));
    if devices.is_empty() {
        debug!("No video sources found via pw-cli");
        None
    } else {
        Some(devices)
    }
}

/// Parse `pw-cli ls Node` output into video source devices
///
/// A node qualifies when its media.class is Video/Source. The device path is
/// the object.serial (preferred, stable across reconnects) or the node id,
/// both of which pipewiresrc accepts as target-object.
fn parse_pw_cli_nodes(stdout: &str) -> Vec<VideoDevice> {
    struct Node {
        id: Option<String>,
        serial: Option<String>,
        name: Option<String>,
        is_video_source: bool,
    }

    impl Node {
        fn empty() -> Self {
            Self {
                id: None,
                serial: None,
                name: None,
                is_video_source: false,
            }
        }

        fn into_device(self) -> Option<VideoDevice> {
            if !self.is_video_source {
                return None;
            }
            let path = self.serial.or(self.id)?;
            let name = self.name.unwrap_or_else(|| format!("Camera {}", path));
            debug!(name = %name, path = %path, "Found video source");
            Some(VideoDevice { name, path })
        }
    }

    let mut devices = Vec::new();
    let mut node = Node::empty();

    for line in stdout.lines() {
        let trimmed = line.trim();

        // New node header: "id 76, type PipeWire:Interface:Node/3"
        if trimmed.starts_with("id ") && trimmed.contains("type PipeWire:Interface:Node") {
            if let Some(device) = std::mem::replace(&mut node, Node::empty()).into_device() {
                devices.push(device);
            }
            if let Some(id_str) = trimmed.strip_prefix("id ")
                && let Some(id_num) = id_str.split(',').next()
            {
                node.id = Some(id_num.trim().to_string());
            }
        }

        if trimmed.contains("media.class") && trimmed.contains("\"Video/Source\"") {
            node.is_video_source = true;
        }

        if trimmed.contains("object.serial")
            && let Some(value) = extract_quoted_value(trimmed)
        {
            node.serial = Some(value);
        }

        if trimmed.contains("node.description")
            && let Some(value) = extract_quoted_value(trimmed)
        {
            node.name = Some(value);
        }
    }

    if let Some(device) = node.into_device() {
        devices.push(device);
    }

    devices
}

/// Extract quoted value from a property line (e.g., 'property = "value"' -> "value")
fn extract_quoted_value(line: &str) -> Option<String> {
    let start = line.find('"')?;
    let end = line[start + 1..].find('"')?;
    Some(line[start + 1..start + 1 + end].to_string())
}
