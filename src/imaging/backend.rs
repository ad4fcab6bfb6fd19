//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the five operations the batch pipeline
//! needs: identify, decode, resize, composite, and encode. Everything works on
//! in-memory byte payloads and [`Surface`]s; no backend touches the disk.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust, on top of
//! the `image` crate.

use super::calculations::WatermarkBox;
use super::params::{OutputFormat, Quality};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width / height. Zero for a degenerate height.
    pub fn aspect(self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f64 / self.height as f64
        }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

/// A decoded raster: an owned RGBA buffer with known dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// A fully transparent surface.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbaImage::new(width, height))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can serve every rayon worker in a dispatch.
pub trait ImageBackend: Sync {
    /// Read dimensions from the header without decoding pixels.
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode an encoded payload into a surface.
    fn decode(&self, bytes: &[u8]) -> Result<Surface, BackendError>;

    /// Resize to exactly `width`×`height`.
    fn resize(&self, surface: Surface, width: u32, height: u32) -> Surface;

    /// Blend `overlay`, scaled into `placement`, onto `base` at `opacity` (0–1).
    fn composite(
        &self,
        base: &mut Surface,
        overlay: &Surface,
        placement: WatermarkBox,
        opacity: f32,
    );

    /// Encode a surface. `quality` is ignored by lossless formats.
    fn encode(
        &self,
        surface: &Surface,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}
