//! Pure calculation functions for derivative dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//! Both engines agree on these numbers: the native engine uses them
//! directly, the external engine encodes the same two modes as ImageMagick
//! geometry flags.

/// Calculate Fit-mode output dimensions.
///
/// Scales so the longer edge equals `max_dim`, preserving aspect ratio.
/// Never upscales: a source whose longer edge is already `<= max_dim` keeps
/// its native size.
///
/// # Examples
/// ```
/// # use proofsheet::imaging::calculate_fit_dimensions;
/// assert_eq!(calculate_fit_dimensions((3000, 500), 480), (480, 80));
/// assert_eq!(calculate_fit_dimensions((300, 200), 480), (300, 200));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), max_dim: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    let longer_edge = src_w.max(src_h);

    if longer_edge <= max_dim || longer_edge == 0 {
        return source;
    }

    let ratio = max_dim as f64 / longer_edge as f64;
    if src_w >= src_h {
        // Landscape or square
        (max_dim, scale(src_h, ratio))
    } else {
        // Portrait
        (scale(src_w, ratio), max_dim)
    }
}

/// Centered square region of a source, in source coordinates.
///
/// Returns `(x, y, side)` where `side` is the shorter source edge. Square
/// mode crops this region first and resizes it to `M×M` afterwards, so the
/// working image is never larger than the source or the output.
///
/// # Examples
/// ```
/// # use proofsheet::imaging::calculate_square_crop;
/// assert_eq!(calculate_square_crop((1600, 1200)), (200, 0, 1200));
/// ```
pub fn calculate_square_crop(source: (u32, u32)) -> (u32, u32, u32) {
    let side = source.0.min(source.1);
    let (x, y) = calculate_center_crop(source, (side, side));
    (x, y, side)
}

/// Top-left offset of a centered `target` crop inside `outer`.
pub fn calculate_center_crop(outer: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    (
        outer.0.saturating_sub(target.0) / 2,
        outer.1.saturating_sub(target.1) / 2,
    )
}

fn scale(edge: u32, ratio: f64) -> u32 {
    ((edge as f64 * ratio).round() as u32).max(1)
}
