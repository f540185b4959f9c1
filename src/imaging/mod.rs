//! Derivative generation: turn a source image into resized JPEG bytes.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Fit** | shrink-only resize, aspect preserved |
//! | **Square** | center square crop, then resize to `M×M` |
//! | **Encode** | `JpegEncoder` (native) or `convert ... jpg:-` (external) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Quality and filter value types
//! - **Engine**: [`ResizeEngine`] trait + [`NativeEngine`] and [`ExternalEngine`]

mod calculations;
pub mod engine;
pub mod external;
pub mod native;
mod params;

use crate::config::{EngineKind, ServerConfig};
use std::sync::Arc;

pub use calculations::{
    calculate_center_crop, calculate_fit_dimensions, calculate_square_crop,
};
pub use engine::{CropMode, DerivativeSpec, Dimensions, ResizeEngine, ResizeError};
pub use external::ExternalEngine;
pub use native::{NativeEngine, identify, is_supported_image, supported_input_extensions};
pub use params::{Filter, Quality};

/// Build the engine selected by configuration.
pub fn build_engine(config: &ServerConfig) -> Arc<dyn ResizeEngine> {
    match config.engine.kind {
        EngineKind::Native => Arc::new(NativeEngine::new(config.engine.filter, config.quality())),
        EngineKind::External => Arc::new(ExternalEngine::new(
            config.engine.command.clone(),
            config.quality(),
        )),
    }
}
