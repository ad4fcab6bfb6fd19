//! Pure calculation functions for output geometry and size reporting.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use super::params::{Anchor, Edge};

/// Resolve the output dimensions for one image.
///
/// # Arguments
/// * `source` - Decoded source dimensions
/// * `desired_width` / `desired_height` - Requested size per axis, if any
/// * `lock_aspect` - Keep the source width:height ratio
///
/// # Rules
/// * Nothing requested: the source dimensions are returned unchanged.
/// * Aspect locked, one axis requested: the other axis is derived from the
///   source ratio and rounded to the nearest pixel.
/// * Aspect locked, both axes requested: **width wins**. Height is recomputed
///   from width and the requested height is ignored.
/// * Aspect unlocked: each missing axis keeps the source value.
///
/// Resolved axes never drop below one pixel.
///
/// # Examples
/// ```
/// # use imgbatch::imaging::{Dimensions, resolve_target_dimensions};
/// let src = Dimensions::new(400, 200);
/// assert_eq!(resolve_target_dimensions(src, Some(100), None, true), Dimensions::new(100, 50));
/// assert_eq!(resolve_target_dimensions(src, Some(300), Some(999), true), Dimensions::new(300, 150));
/// ```
pub fn resolve_target_dimensions(
    source: Dimensions,
    desired_width: Option<u32>,
    desired_height: Option<u32>,
    lock_aspect: bool,
) -> Dimensions {
    // A zero-sized axis has no usable ratio; fall back to per-axis defaults.
    let can_lock = lock_aspect && source.width > 0 && source.height > 0;

    let (width, height) = match (desired_width, desired_height) {
        (None, None) => return source,
        (Some(w), _) if can_lock => (w, scale_axis(w, source.height, source.width)),
        (None, Some(h)) if can_lock => (scale_axis(h, source.width, source.height), h),
        (w, h) => (w.unwrap_or(source.width), h.unwrap_or(source.height)),
    };

    Dimensions {
        width: width.max(1),
        height: height.max(1),
    }
}

/// `desired * (other / this)`, rounded.
fn scale_axis(desired: u32, other: u32, this: u32) -> u32 {
    (desired as f64 * other as f64 / this as f64).round() as u32
}

/// Where a watermark lands on the output surface.
///
/// The origin is signed so a watermark wider than the target (or pushed out by
/// padding) is clipped rather than wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkBox {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Compute the watermark rectangle for a target surface.
///
/// # Arguments
/// * `target` - Output surface dimensions
/// * `watermark_aspect` - Watermark width / height
/// * `scale_percent` - Watermark width as a percentage of the target width
/// * `anchor` - Grid position
/// * `padding` - Inward offset from each edge the anchor touches
///
/// Centered axes ignore padding.
///
/// # Examples
/// ```
/// # use imgbatch::imaging::{Anchor, Dimensions, resolve_watermark_box};
/// let b = resolve_watermark_box(Dimensions::new(1000, 1000), 2.0, 20.0, Anchor::BottomRight, 20);
/// assert_eq!((b.x, b.y, b.width, b.height), (780, 880, 200, 100));
/// ```
pub fn resolve_watermark_box(
    target: Dimensions,
    watermark_aspect: f64,
    scale_percent: f64,
    anchor: Anchor,
    padding: u32,
) -> WatermarkBox {
    let width = (target.width as f64 * scale_percent / 100.0).round().max(1.0) as u32;
    let height = if watermark_aspect > 0.0 {
        (width as f64 / watermark_aspect).round().max(1.0) as u32
    } else {
        width
    };

    let (horizontal, vertical) = anchor.edges();
    WatermarkBox {
        x: place_on_axis(horizontal, target.width, width, padding),
        y: place_on_axis(vertical, target.height, height, padding),
        width,
        height,
    }
}

fn place_on_axis(edge: Edge, extent: u32, size: u32, padding: u32) -> i64 {
    let free = extent as i64 - size as i64;
    match edge {
        Edge::Start => padding as i64,
        Edge::Middle => free.div_euclid(2),
        Edge::End => free - padding as i64,
    }
}

/// Percentage of the original size saved by the result, rounded.
///
/// Negative when the result grew. Zero for an empty original.
pub fn percent_saved(original: u64, result: u64) -> i64 {
    if original == 0 {
        return 0;
    }
    ((original as f64 - result as f64) / original as f64 * 100.0).round() as i64
}
