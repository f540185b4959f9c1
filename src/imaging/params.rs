//! Parameter types for derivative generation.
//!
//! These are small value types shared by both engines and by the config
//! layer, so the engine implementations never see raw config integers.
//!
//! - [`Quality`] — JPEG encoding quality (1–100, default 75). Clamped on construction.
//! - [`Filter`] — Resampling filter used by the native engine.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Quality setting for lossy JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

/// Resampling filter for the native engine.
///
/// Nearest-neighbour is the default: derivatives are small previews and
/// decode/resample time dominates first-request latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Filter {
    #[default]
    Nearest,
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl Filter {
    pub fn filter_type(self) -> FilterType {
        match self {
            Filter::Nearest => FilterType::Nearest,
            Filter::Triangle => FilterType::Triangle,
            Filter::CatmullRom => FilterType::CatmullRom,
            Filter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}
