//! Image processing in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Decode** | `image` decoders → RGBA8 [`Surface`] |
//! | **Resize** | Lanczos3 |
//! | **Watermark** | scaled overlay with opacity |
//! | **Encode** | JPEG / PNG / WebP |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and placement math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, Surface};
pub use calculations::{
    WatermarkBox, percent_saved, resolve_target_dimensions, resolve_watermark_box,
};
pub use operations::{
    TransformError, TransformOutput, TransformPlan, TransformSpec, WatermarkPlacement,
    plan_transform, transform,
};
pub use params::{Anchor, OutputFormat, Quality};
pub use rust_backend::{RustBackend, is_supported_mime, supported_input_mime_types};
