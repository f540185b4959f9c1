//! In-process resize engine built on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` (pure Rust decoders) |
//! | EXIF orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Fit resize | `image::imageops::resize` to [`calculate_fit_dimensions`] |
//! | Square crop + resize | `crop_imm` to [`calculate_square_crop`], then `resize_exact` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::calculations::{calculate_fit_dimensions, calculate_square_crop};
use super::engine::{CropMode, DerivativeSpec, Dimensions, ResizeEngine, ResizeError};
use super::params::{Filter, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use std::path::Path;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Whether `name` has a supported image extension (case-insensitive).
pub fn is_supported_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// Read image dimensions from the file header without a full decode.
pub fn identify(path: &Path) -> Result<Dimensions, ResizeError> {
    let (width, height) = image::image_dimensions(path).map_err(|e| ResizeError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(Dimensions { width, height })
}

/// Pure Rust engine: decode, resample, re-encode as JPEG.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine {
    filter: Filter,
    quality: Quality,
}

impl NativeEngine {
    pub fn new(filter: Filter, quality: Quality) -> Self {
        Self { filter, quality }
    }

    /// Apply Fit or Square sizing to an already decoded image.
    pub fn transform(&self, img: &DynamicImage, max_dim: u32, crop: CropMode) -> DynamicImage {
        let source = (img.width(), img.height());
        let filter = self.filter.filter_type();

        match crop {
            CropMode::Fit => {
                let (w, h) = calculate_fit_dimensions(source, max_dim);
                if (w, h) == source {
                    img.clone()
                } else {
                    img.resize_exact(w, h, filter)
                }
            }
            CropMode::Square => {
                let (x, y, side) = calculate_square_crop(source);
                let square = img.crop_imm(x, y, side, side);
                if side == max_dim {
                    square
                } else {
                    square.resize_exact(max_dim, max_dim, filter)
                }
            }
        }
    }

    /// Encode as baseline JPEG. Alpha and high bit depths are flattened to RGB8.
    pub fn encode(&self, img: &DynamicImage) -> Result<Vec<u8>, ResizeError> {
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut buf = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buf, self.quality.value());
        rgb.write_with_encoder(encoder)
            .map_err(|e| ResizeError::Encode(e.to_string()))?;
        Ok(buf)
    }
}

/// Load and decode an image from disk, sniffing the format from content.
///
/// EXIF orientation is applied so the pixels come out upright, matching
/// ImageMagick's `-auto-orient`.
fn load_image(path: &Path) -> Result<DynamicImage, ResizeError> {
    let decode_error = |e: image::ImageError| ResizeError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()
        .map_err(decode_error)?;
    // Malformed EXIF decodes as upright.
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder).map_err(decode_error)?;
    img.apply_orientation(orientation);
    Ok(img)
}

impl ResizeEngine for NativeEngine {
    fn name(&self) -> &'static str {
        "native"
    }

    fn generate(&self, spec: &DerivativeSpec) -> Result<Vec<u8>, ResizeError> {
        let img = load_image(&spec.source)?;
        let resized = self.transform(&img, spec.max_dim, spec.crop);
        self.encode(&resized)
    }
}
