//! Shared test utilities for the proofsheet test suite.
//!
//! Generates real image files with the `image` crate so engine and pipeline
//! tests decode actual pixels, plus a small photo tree fixture.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_gallery();
//! let base = tmp.path().join("photos");
//! assert_dimensions(&std::fs::read(base.join("2024/wide.jpg")).unwrap(), 3000, 500);
//! ```

use image::{ImageBuffer, ImageFormat, Rgb, Rgba};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// =========================================================================
// Image writers
// =========================================================================

/// Write a `width × height` gradient JPEG, creating parent directories.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    img.save_with_format(path, ImageFormat::Jpeg).unwrap();
}

/// Write a gradient JPEG carrying an EXIF orientation tag (1-8).
///
/// The APP1 segment is spliced in right after SOI: a big-endian TIFF header
/// and a one-entry IFD0 holding tag 0x0112.
pub fn write_jpeg_oriented(path: &Path, width: u32, height: u32, orientation: u16) {
    write_jpeg(path, width, height);
    let jpeg = fs::read(path).unwrap();

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\x00\x2a");
    tiff.extend_from_slice(&8u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x0112u16.to_be_bytes());
    tiff.extend_from_slice(&3u16.to_be_bytes()); // SHORT
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&0u32.to_be_bytes()); // no IFD1

    let payload_len = (2 + 6 + tiff.len()) as u16;
    let mut out = Vec::with_capacity(jpeg.len() + payload_len as usize + 2);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&payload_len.to_be_bytes());
    out.extend_from_slice(b"Exif\x00\x00");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    fs::write(path, out).unwrap();
}

/// Write a half-transparent RGBA PNG.
pub fn write_png_rgba(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let img = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_fn(width, height, |x, _| {
        Rgba([200, 40, 40, if x < width / 2 { 0 } else { 255 }])
    });
    img.save_with_format(path, ImageFormat::Png).unwrap();
}

// =========================================================================
// Fixtures
// =========================================================================

/// A temp dir holding `photos/` with a few real images:
///
/// ```text
/// photos/
/// ├── 2024/
/// │   ├── landscape.jpg   1600×1200
/// │   └── wide.jpg        3000×500
/// └── small.jpg           60×40
/// ```
pub fn setup_gallery() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().join("photos");
    write_jpeg(&base.join("2024/landscape.jpg"), 1600, 1200);
    write_jpeg(&base.join("2024/wide.jpg"), 3000, 500);
    write_jpeg(&base.join("small.jpg"), 60, 40);
    tmp
}

// =========================================================================
// Assertions
// =========================================================================

/// Assert encoded bytes decode to exactly `width × height`.
pub fn assert_dimensions(bytes: &[u8], width: u32, height: u32) {
    let img = image::load_from_memory(bytes).expect("derivative should decode");
    assert_eq!(
        (img.width(), img.height()),
        (width, height),
        "expected {width}x{height}, got {}x{}",
        img.width(),
        img.height()
    );
}

/// Assert bytes start with the JPEG SOI marker.
pub fn assert_jpeg(bytes: &[u8]) {
    assert!(
        bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        "not a JPEG: {:02x?}",
        &bytes[..bytes.len().min(4)]
    );
}
