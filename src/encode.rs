// SPDX-License-Identifier: GPL-3.0-only

//! QR code generation
//!
//! Produces grayscale rasters from text payloads with a fixed structural
//! profile: low error correction, ten pixels per module, the standard
//! four-module quiet zone. The display screen magnifies whatever comes out
//! of here; generation happens once per payload.

use std::path::{Path, PathBuf};

use image::GrayImage;
use qrcode::QrCode;
use tracing::{debug, info};

use crate::constants::encoding;

pub use qrcode::EcLevel;

/// Result type for encoding operations
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Error types for encoding operations
#[derive(Debug, Clone)]
pub enum EncodeError {
    /// The payload does not fit any code version under the profile
    Encode(String),
    /// The raster could not be written to disk
    Save(String),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::Encode(msg) => write!(f, "Encoding failed: {}", msg),
            EncodeError::Save(msg) => write!(f, "Save failed: {}", msg),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Structural parameters of generated codes
///
/// The quiet zone rendered by the default profile is
/// [`encoding::QUIET_ZONE_MODULES`] wide on every side, the standard border
/// for full-size codes.
#[derive(Debug, Clone)]
pub struct EncodeProfile {
    pub ec_level: EcLevel,
    pub module_pixels: u32,
    pub quiet_zone: bool,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            ec_level: EcLevel::L,
            module_pixels: encoding::MODULE_PIXELS,
            quiet_zone: true,
        }
    }
}

/// Render a payload as a grayscale raster
///
/// Dark modules are 0, light modules and the quiet zone are 255. The code
/// version (and so the raster size) grows with the payload.
pub fn generate(text: &str, profile: &EncodeProfile) -> EncodeResult<GrayImage> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), profile.ec_level)
        .map_err(|err| EncodeError::Encode(err.to_string()))?;

    let image = code
        .render::<image::Luma<u8>>()
        .module_dimensions(profile.module_pixels, profile.module_pixels)
        .quiet_zone(profile.quiet_zone)
        .build();

    debug!(
        payload_len = text.len(),
        width = image.width(),
        "Rendered QR raster"
    );
    Ok(image)
}

/// Write a raster to disk as PNG
///
/// The parent directory must already exist; callers create it.
pub fn save_png(image: &GrayImage, path: &Path) -> EncodeResult<()> {
    image
        .save(path)
        .map_err(|err| EncodeError::Save(err.to_string()))?;
    info!(path = %path.display(), "QR image saved");
    Ok(())
}

/// Timestamped output path in `dir` for a saved code
pub fn timestamped_path(dir: &Path) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("QR_{}.png", timestamp))
}

/// Default folder name for saved codes
const SAVE_FOLDER: &str = "qr-mirror";

/// Default save directory for codes captured interactively
pub fn default_save_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(SAVE_FOLDER)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Version 1 codes are 21 modules on a side
    const VERSION_1_MODULES: u32 = 21;

    #[test]
    fn test_version1_geometry() {
        let img = generate("HELLO", &EncodeProfile::default()).expect("encode");

        let modules = VERSION_1_MODULES + 2 * encoding::QUIET_ZONE_MODULES;
        assert_eq!(img.width(), modules * encoding::MODULE_PIXELS);
        assert_eq!(img.height(), img.width());
    }

    #[test]
    fn test_module_pixels_scale_the_raster() {
        let profile = EncodeProfile {
            module_pixels: 2,
            ..EncodeProfile::default()
        };
        let img = generate("HELLO", &profile).expect("encode");
        assert_eq!(
            img.width(),
            (VERSION_1_MODULES + 2 * encoding::QUIET_ZONE_MODULES) * 2
        );
    }

    #[test]
    fn test_quiet_zone_is_light() {
        let img = generate("HELLO", &EncodeProfile::default()).expect("encode");

        assert_eq!(img.get_pixel(0, 0).0[0], 255);
        // One quiet zone in, the top-left finder corner is always dark
        let offset = encoding::QUIET_ZONE_MODULES * encoding::MODULE_PIXELS;
        assert_eq!(img.get_pixel(offset, offset).0[0], 0);
    }

    #[test]
    fn test_larger_payload_grows_raster() {
        let small = generate("A", &EncodeProfile::default()).expect("encode");
        let large = generate(&"0123456789".repeat(10), &EncodeProfile::default()).expect("encode");
        assert!(large.width() > small.width());
    }

    #[test]
    fn test_oversized_payload_is_an_error() {
        let payload = "x".repeat(4000);
        assert!(matches!(
            generate(&payload, &EncodeProfile::default()),
            Err(EncodeError::Encode(_))
        ));
    }

    #[test]
    fn test_save_to_missing_directory_fails() {
        let img = generate("HELLO", &EncodeProfile::default()).expect("encode");
        // /dev/null is never a directory, whatever user the tests run as
        let result = save_png(&img, Path::new("/dev/null/out.png"));
        assert!(matches!(result, Err(EncodeError::Save(_))));
    }

    #[test]
    fn test_timestamped_path_shape() {
        let path = timestamped_path(Path::new("/tmp"));
        let name = path.file_name().expect("name").to_string_lossy().into_owned();
        assert!(name.starts_with("QR_"));
        assert!(name.ends_with(".png"));
    }
}
