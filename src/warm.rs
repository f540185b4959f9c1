//! Cache pre-warming.
//!
//! Walks a directory tree under the base and fetches both derivatives of
//! every image through the normal coordinator path, in parallel on the rayon
//! pool. Already-cached derivatives are a file read; the rest are generated
//! and persisted exactly as a live request would. Running it twice is cheap.

use crate::coordinator::{RequestCoordinator, ServeError, Variant};
use crate::imaging::is_supported_image;
use crate::listing::is_listed;
use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Outcome of a warm run. Per-derivative counts live in the cache stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmReport {
    /// Images found under the walked directory.
    pub images: usize,
    /// Derivative fetches that failed.
    pub failed: usize,
}

/// Request paths of every supported image under `rel`, sorted.
pub fn collect_images(coordinator: &RequestCoordinator, rel: &str) -> Result<Vec<String>, ServeError> {
    let resolver = coordinator.resolver();
    let root = resolver.resolve_dir(rel)?;
    let cache_dir = coordinator.cache().dir().canonicalize().ok();

    let mut images = Vec::new();
    let walker = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || is_listed(e, cache_dir.as_deref()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_file() && is_supported_image(&entry.file_name().to_string_lossy()) {
            images.push(resolver.relative(entry.path()));
        }
    }
    Ok(images)
}

/// Fetch thumb and small derivatives for every image under `rel`.
pub fn warm(coordinator: &RequestCoordinator, rel: &str) -> Result<WarmReport, ServeError> {
    let images = collect_images(coordinator, rel)?;
    debug!("Warming {} images", images.len());

    let jobs: Vec<(Variant, &str)> = images
        .iter()
        .flat_map(|path| [(Variant::Thumb, path.as_str()), (Variant::Small, path.as_str())])
        .collect();

    let failed = jobs
        .par_iter()
        .filter(|(variant, path)| match coordinator.derivative(*variant, path) {
            Ok(_) => false,
            Err(e) => {
                warn!("Could not warm {:?} {}: {}", variant, path, e);
                true
            }
        })
        .count();

    Ok(WarmReport {
        images: images.len(),
        failed,
    })
}
