//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are the
//! interface between the batch layer (which decides what each job produces)
//! and the [`backend`](super::backend) (which does the pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (0–100, default 80). Clamped on construction.
//! - [`OutputFormat`]: the fixed set of raster formats a batch can produce.
//! - [`Anchor`]: one of the nine grid positions used to place a watermark.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality setting for lossy image encoding (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Output encoding for a batch.
///
/// Only JPEG is truly lossy at the encoder level. WebP goes through the
/// pure-Rust lossless encoder after a quality-driven palette reduction, so
/// it still responds to [`Quality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    #[default]
    WebP,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    /// Whether [`Quality`] has any effect on the encoded output.
    pub fn uses_quality(self) -> bool {
        !matches!(self, Self::Png)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::WebP => "WebP",
        };
        f.write_str(label)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            other => Err(format!("unsupported output format: {other}")),
        }
    }
}

/// Watermark placement on a 3×3 grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
}

/// Placement of an anchor along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edge {
    Start,
    Middle,
    End,
}

impl Anchor {
    pub const ALL: [Anchor; 9] = [
        Self::TopLeft,
        Self::TopCenter,
        Self::TopRight,
        Self::CenterLeft,
        Self::Center,
        Self::CenterRight,
        Self::BottomLeft,
        Self::BottomCenter,
        Self::BottomRight,
    ];

    /// Horizontal and vertical edge this anchor sticks to.
    pub(crate) fn edges(self) -> (Edge, Edge) {
        use Edge::*;
        match self {
            Self::TopLeft => (Start, Start),
            Self::TopCenter => (Middle, Start),
            Self::TopRight => (End, Start),
            Self::CenterLeft => (Start, Middle),
            Self::Center => (Middle, Middle),
            Self::CenterRight => (End, Middle),
            Self::BottomLeft => (Start, End),
            Self::BottomCenter => (Middle, End),
            Self::BottomRight => (End, End),
        }
    }
}

impl FromStr for Anchor {
    type Err = String;

    /// Accepts kebab-case names (`bottom-right`) and two-letter grid codes (`br`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let anchor = match s.trim().to_ascii_lowercase().as_str() {
            "tl" | "top-left" => Self::TopLeft,
            "tc" | "top-center" | "top" => Self::TopCenter,
            "tr" | "top-right" => Self::TopRight,
            "cl" | "center-left" | "left" => Self::CenterLeft,
            "c" | "cc" | "center" => Self::Center,
            "cr" | "center-right" | "right" => Self::CenterRight,
            "bl" | "bottom-left" => Self::BottomLeft,
            "bc" | "bottom-center" | "bottom" => Self::BottomCenter,
            "br" | "bottom-right" => Self::BottomRight,
            other => return Err(format!("unknown anchor: {other}")),
        };
        Ok(anchor)
    }
}
