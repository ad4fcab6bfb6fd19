//! Pure Rust image processing backend built on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders), normalized to RGBA8 |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | Watermark | `imageops::resize` + alpha scaling + `imageops::overlay` |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → PNG | `PngEncoder` (best compression, adaptive filter) |
//! | Encode → WebP | palette quantization + `WebPEncoder::new_lossless` |
//!
//! The `image` crate only ships a lossless WebP encoder. To make WebP output
//! respond to quality, RGB channels are snapped to a coarser palette first,
//! which the lossless encoder then compresses far better. Quality 100 skips
//! quantization entirely.

use super::backend::{BackendError, Dimensions, ImageBackend, Surface};
use super::calculations::WatermarkBox;
use super::params::{OutputFormat, Quality};
use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, ImageFormat, ImageReader, RgbImage};
use std::io::Cursor;
use std::sync::LazyLock;
use tracing::trace;

/// Formats whose decoders are compiled in via the `image` crate features.
const INPUT_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::WebP,
    ImageFormat::Tiff,
];

static SUPPORTED_MIME_TYPES: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_FORMATS
        .iter()
        .filter(|fmt| fmt.reading_enabled())
        .map(|fmt| fmt.to_mime_type())
        .collect()
});

/// MIME types accepted at intake.
pub fn supported_input_mime_types() -> &'static [&'static str] {
    &SUPPORTED_MIME_TYPES
}

/// Whether a declared MIME type names a raster format we can decode.
///
/// The type must carry the `image/` prefix; the non-standard `image/jpg` is
/// treated as `image/jpeg`.
pub fn is_supported_mime(mime: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    if !mime.starts_with("image/") {
        return false;
    }
    let mime = if mime == "image/jpg" {
        "image/jpeg"
    } else {
        mime.as_str()
    };
    supported_input_mime_types().contains(&mime)
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Sniff the format from magic bytes and reject anything we don't decode.
fn open_reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(e.to_string()))?;
    match reader.format() {
        Some(fmt) if INPUT_FORMATS.contains(&fmt) => Ok(reader),
        Some(fmt) => Err(BackendError::Decode(format!("unsupported format {fmt:?}"))),
        None => Err(BackendError::Decode("unrecognized image data".into())),
    }
}

/// Snap RGB channels to `levels_for_quality(quality)` evenly spaced values.
/// Alpha is untouched so transparency edges stay crisp.
fn quantize_rgb(data: &mut [u8], quality: u8) {
    if quality >= 100 {
        return;
    }
    let levels = levels_for_quality(quality);
    let step = 255.0 / (levels as f32 - 1.0);
    for pixel in data.chunks_exact_mut(4) {
        for channel in pixel.iter_mut().take(3) {
            let bucket = (f32::from(*channel) / step).round();
            *channel = (bucket * step).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Quadratic curve: fine palettes at high quality, very coarse at the bottom.
fn levels_for_quality(quality: u8) -> u16 {
    if quality >= 100 {
        return 256;
    }
    let normalized = f32::from(quality) / 100.0;
    (2.0 + normalized * normalized * 254.0).round().clamp(2.0, 256.0) as u16
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = open_reader(bytes)?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Dimensions { width, height })
    }

    fn decode(&self, bytes: &[u8]) -> Result<Surface, BackendError> {
        let img = open_reader(bytes)?
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Surface::new(img.into_rgba8()))
    }

    fn resize(&self, surface: Surface, width: u32, height: u32) -> Surface {
        if surface.dimensions() == Dimensions::new(width, height) {
            return surface;
        }
        Surface::new(imageops::resize(
            surface.pixels(),
            width,
            height,
            FilterType::Lanczos3,
        ))
    }

    fn composite(
        &self,
        base: &mut Surface,
        overlay: &Surface,
        placement: WatermarkBox,
        opacity: f32,
    ) {
        let opacity = opacity.clamp(0.0, 1.0);
        if opacity <= f32::EPSILON || placement.width == 0 || placement.height == 0 {
            return;
        }
        let mut stamp = imageops::resize(
            overlay.pixels(),
            placement.width,
            placement.height,
            FilterType::Lanczos3,
        );
        if opacity < 1.0 {
            for pixel in stamp.pixels_mut() {
                pixel.0[3] = (f32::from(pixel.0[3]) * opacity).round() as u8;
            }
        }
        // overlay() clips to the base bounds, including negative origins.
        imageops::overlay(base.pixels_mut(), &stamp, placement.x, placement.y);
    }

    fn encode(
        &self,
        surface: &Surface,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let (width, height) = (surface.width(), surface.height());
        let mut buffer = Vec::new();
        let result = match format {
            OutputFormat::Jpeg => {
                let rgb: RgbImage = surface.pixels().convert();
                JpegEncoder::new_with_quality(&mut buffer, quality.value().max(1)).write_image(
                    rgb.as_raw(),
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )
            }
            OutputFormat::Png => PngEncoder::new_with_quality(
                &mut buffer,
                CompressionType::Best,
                image::codecs::png::FilterType::Adaptive,
            )
            .write_image(
                surface.pixels().as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            ),
            OutputFormat::WebP => {
                let mut rgba = surface.pixels().clone();
                quantize_rgb(&mut rgba, quality.value());
                WebPEncoder::new_lossless(&mut buffer).write_image(
                    rgba.as_raw(),
                    width,
                    height,
                    ExtendedColorType::Rgba8,
                )
            }
        };
        result.map_err(|e| BackendError::Encode(format!("{format}: {e}")))?;
        trace!(%format, width, height, bytes = buffer.len(), "encoded");
        Ok(buffer)
    }
}
