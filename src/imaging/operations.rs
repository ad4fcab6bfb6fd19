//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They take a
//! transform description, compute the geometry, and call the backend. The
//! batch controller runs [`transform`] once per job.

use super::backend::{BackendError, Dimensions, ImageBackend, Surface};
use super::calculations::{WatermarkBox, resolve_target_dimensions, resolve_watermark_box};
use super::params::{Anchor, OutputFormat, Quality};
use thiserror::Error;

/// Which stage of a transform failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    Encode(String),
}

impl From<BackendError> for TransformError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Decode(msg) => Self::Decode(msg),
            BackendError::Encode(msg) => Self::Encode(msg),
        }
    }
}

/// Everything a single-image transform needs, minus the watermark pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub lock_aspect: bool,
    pub format: OutputFormat,
    pub quality: Quality,
    pub watermark: Option<WatermarkPlacement>,
}

/// How to place a watermark, independent of the watermark image itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkPlacement {
    pub opacity: f32,
    pub scale_percent: f64,
    pub anchor: Anchor,
    pub padding: u32,
}

/// Geometry decided before any pixels move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformPlan {
    pub target: Dimensions,
    pub watermark: Option<WatermarkBox>,
}

/// Plan a transform without executing it.
///
/// The watermark box is only planned when both a placement and the
/// watermark's own dimensions are known.
pub fn plan_transform(
    source: Dimensions,
    spec: &TransformSpec,
    watermark_dims: Option<Dimensions>,
) -> TransformPlan {
    let target = resolve_target_dimensions(source, spec.width, spec.height, spec.lock_aspect);
    let watermark = spec
        .watermark
        .zip(watermark_dims)
        .map(|(placement, dims)| {
            resolve_watermark_box(
                target,
                dims.aspect(),
                placement.scale_percent,
                placement.anchor,
                placement.padding,
            )
        });
    TransformPlan { target, watermark }
}

/// Result of a successful transform.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
    pub encoded: Vec<u8>,
    pub source_dimensions: Dimensions,
    pub dimensions: Dimensions,
}

/// Decode → resize → watermark → encode.
///
/// `watermark` is the decoded watermark surface; it is only used when
/// `spec.watermark` is set. The source bytes are never modified.
pub fn transform(
    backend: &impl ImageBackend,
    source: &[u8],
    spec: &TransformSpec,
    watermark: Option<&Surface>,
) -> Result<TransformOutput, TransformError> {
    let surface = backend.decode(source)?;
    let source_dimensions = surface.dimensions();

    let plan = plan_transform(source_dimensions, spec, watermark.map(Surface::dimensions));

    let mut surface = if plan.target == source_dimensions {
        surface
    } else {
        backend.resize(surface, plan.target.width, plan.target.height)
    };

    if let (Some(placement), Some(wm_box), Some(wm)) = (spec.watermark, plan.watermark, watermark)
    {
        backend.composite(&mut surface, wm, wm_box, placement.opacity);
    }

    let encoded = backend.encode(&surface, spec.format, spec.quality)?;

    Ok(TransformOutput {
        encoded,
        source_dimensions,
        dimensions: plan.target,
    })
}
