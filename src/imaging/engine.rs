//! Resize engine trait and shared types.
//!
//! The [`ResizeEngine`] trait is the single capability the cache layer needs:
//! turn a [`DerivativeSpec`] into encoded JPEG bytes. Two implementations
//! exist and are selected by configuration:
//!
//! | Engine | Decode | Resample | Encode |
//! |---|---|---|---|
//! | [`NativeEngine`](super::native::NativeEngine) | `image` crate | `image::imageops` | `JpegEncoder` |
//! | [`ExternalEngine`](super::external::ExternalEngine) | ImageMagick | ImageMagick | ImageMagick (`jpg:-`) |
//!
//! Cache-key derivation and persistence never look at which engine ran, so
//! swapping engines only changes how bytes are produced, not where they live.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("Failed to encode derivative: {0}")]
    Encode(String),
    #[error("External tool `{command}` failed: {reason}")]
    ExternalTool { command: String, reason: String },
}

/// How a derivative is fitted to its maximum dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropMode {
    /// Scale down so the longer edge is at most `max_dim`; never upscale.
    Fit,
    /// Scale to cover a `max_dim × max_dim` box, then center-crop to it.
    Square,
}

impl CropMode {
    /// Stable discriminator byte used in cache-key derivation.
    pub fn tag(self) -> u8 {
        match self {
            CropMode::Fit => b'F',
            CropMode::Square => b'S',
        }
    }
}

impl fmt::Display for CropMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CropMode::Fit => f.write_str("fit"),
            CropMode::Square => f.write_str("square"),
        }
    }
}

/// Everything that determines a derivative's bytes.
///
/// Two specs are equal iff source path, dimension, and crop mode are equal.
/// `source` is the resolved absolute path of the source image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivativeSpec {
    pub source: PathBuf,
    pub max_dim: u32,
    pub crop: CropMode,
}

impl fmt::Display for DerivativeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @{} {}", self.source.display(), self.max_dim, self.crop)
    }
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A strategy for producing derivative bytes.
///
/// Implementations must be deterministic for a given spec and source file
/// contents, and free of side effects beyond reading the source. The cache
/// relies on this when it serves one generation's bytes to every waiter.
pub trait ResizeEngine: Send + Sync {
    /// Short name used in logs (`native`, `external`).
    fn name(&self) -> &'static str;

    /// Produce the JPEG-encoded derivative described by `spec`.
    fn generate(&self, spec: &DerivativeSpec) -> Result<Vec<u8>, ResizeError>;
}
