// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for scanner utilities
//!
//! This module provides command-line functionality for:
//! - Listing available capture devices
//! - Encoding payloads to image files without a camera

use qr_mirror::backends::camera::gst::enumeration::{discover_devices, is_capture_available};
use qr_mirror::encode::{self, EncodeProfile};
use std::path::PathBuf;

/// List all available capture devices
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize GStreamer
    gstreamer::init()?;

    if !is_capture_available() {
        println!("Capture stack not available (gstreamer pipewiresrc missing).");
        return Ok(());
    }

    let devices = discover_devices().unwrap_or_default();
    if devices.is_empty() {
        println!("No capture devices found.");
        return Ok(());
    }

    println!("Available devices:");
    println!();
    for (index, device) in devices.iter().enumerate() {
        println!("  [{}] {}", index, device);
    }
    println!();
    println!("The scanner uses the first device.");

    Ok(())
}

/// Encode a payload and write it to disk as PNG
pub fn encode_file(text: &str, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let image = encode::generate(text, &EncodeProfile::default())?;

    let path = match output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            path
        }
        None => encode::timestamped_path(&PathBuf::from(".")),
    };

    encode::save_png(&image, &path)?;
    println!("QR image saved: {}", path.display());

    Ok(())
}
