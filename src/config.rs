//! Pipeline configuration.
//!
//! Handles loading and validating an `imgbatch.toml` file. Every key is
//! optional: missing keys take the stock defaults, and command-line flags
//! override whatever the file says.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [resize]
//! # width = 1200            # Target width in pixels (omit to keep)
//! # height = 800            # Target height in pixels (omit to keep)
//! lock_aspect = true        # Derive the missing side from the source ratio
//!
//! [output]
//! format = "webp"           # "jpeg" | "png" | "webp"
//! quality = 80              # 0-100, ignored for PNG
//!
//! [watermark]               # Omit the whole section for no watermark
//! path = "logo.png"
//! opacity = 0.5             # 0.0 (invisible) - 1.0 (opaque)
//! scale = 20.0              # Percent of the output width
//! anchor = "bottom-right"
//! padding = 20              # Pixels from the anchored edges
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Anchor, OutputFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Cannot read watermark {}: {source}", path.display())]
    Watermark {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration loaded from `imgbatch.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Target geometry.
    pub resize: ResizeConfig,
    /// Output encoding.
    pub output: OutputConfig,
    /// Optional watermark applied to every output.
    pub watermark: Option<WatermarkConfig>,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resize.width == Some(0) || self.resize.height == Some(0) {
            return Err(ConfigError::Validation(
                "resize.width and resize.height must be non-zero".into(),
            ));
        }
        if self.output.quality > 100 {
            return Err(ConfigError::Validation(
                "output.quality must be 0-100".into(),
            ));
        }
        if let Some(wm) = &self.watermark {
            if wm.path.as_os_str().is_empty() {
                return Err(ConfigError::Validation(
                    "watermark.path is required".into(),
                ));
            }
            if !(0.0..=1.0).contains(&wm.opacity) {
                return Err(ConfigError::Validation(
                    "watermark.opacity must be 0.0-1.0".into(),
                ));
            }
            if !(wm.scale > 0.0 && wm.scale <= 100.0) {
                return Err(ConfigError::Validation(
                    "watermark.scale must be greater than 0 and at most 100".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Target geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// When set, a missing or conflicting side is derived from the source
    /// aspect ratio (width wins when both are given).
    pub lock_aspect: bool,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            lock_aspect: true,
        }
    }
}

/// Output encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Lossy encoding quality (0 = worst, 100 = best).
    pub quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::WebP,
            quality: 80,
        }
    }
}

/// Watermark settings. Only `path` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    pub path: PathBuf,
    pub opacity: f32,
    /// Watermark width as a percentage of the output width.
    pub scale: f64,
    pub anchor: Anchor,
    pub padding: u32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            opacity: 0.5,
            scale: 20.0,
            anchor: Anchor::BottomRight,
            padding: 20,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Parse and validate a config from TOML text.
pub fn parse_config(content: &str) -> Result<PipelineConfig, ConfigError> {
    let config: PipelineConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file.
///
/// A missing file yields the stock defaults; a present one must parse and
/// validate. Relative watermark paths are resolved against the file's
/// directory.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    if !path.exists() {
        return Ok(PipelineConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    if let (Some(wm), Some(dir)) = (config.watermark.as_mut(), path.parent())
        && wm.path.is_relative()
    {
        wm.path = dir.join(&wm.path);
    }
    Ok(config)
}

/// Returns a fully-commented stock `imgbatch.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgbatch configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags override anything set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Resize
# ---------------------------------------------------------------------------
[resize]
# Target size in pixels. Omit both to keep the source size.
# width = 1200
# height = 800

# Keep the source aspect ratio. When both width and height are set,
# width wins and height is derived from it.
lock_aspect = true

# ---------------------------------------------------------------------------
# Output encoding
# ---------------------------------------------------------------------------
[output]
# One of "jpeg", "png", "webp".
format = "webp"

# Encoding quality (0 = smallest, 100 = best). PNG is always lossless.
quality = 80

# ---------------------------------------------------------------------------
# Watermark (uncomment the section to enable)
# ---------------------------------------------------------------------------
# [watermark]
# Image to overlay, relative to this file.
# path = "logo.png"
# 0.0 (invisible) to 1.0 (opaque).
# opacity = 0.5
# Watermark width as a percentage of the output width.
# scale = 20.0
# One of: top-left, top-center, top-right, center-left, center,
# center-right, bottom-left, bottom-center, bottom-right.
# anchor = "bottom-right"
# Offset from the anchored edges, in pixels.
# padding = 20

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.resize.width, None);
        assert!(config.resize.lock_aspect);
        assert_eq!(config.output.format, OutputFormat::WebP);
        assert_eq!(config.output.quality, 80);
        assert_eq!(config.watermark, None);
    }

    #[test]
    fn parse_partial_config() {
        let config = parse_config(
            r#"
[resize]
width = 500
"#,
        )
        .unwrap();
        assert_eq!(config.resize.width, Some(500));
        // Defaults preserved
        assert!(config.resize.lock_aspect);
        assert_eq!(config.output.quality, 80);
    }

    #[test]
    fn parse_output_format_alias() {
        let config = parse_config(
            r#"
[output]
format = "jpg"
quality = 65
"#,
        )
        .unwrap();
        assert_eq!(config.output.format, OutputFormat::Jpeg);
        assert_eq!(config.output.quality, 65);
    }

    #[test]
    fn parse_watermark_section_fills_defaults() {
        let config = parse_config(
            r#"
[watermark]
path = "logo.png"
anchor = "top-left"
"#,
        )
        .unwrap();
        let wm = config.watermark.unwrap();
        assert_eq!(wm.path, PathBuf::from("logo.png"));
        assert_eq!(wm.anchor, Anchor::TopLeft);
        assert_eq!(wm.opacity, 0.5);
        assert_eq!(wm.padding, 20);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_boundary_ok() {
        let mut config = PipelineConfig::default();
        config.output.quality = 100;
        assert!(config.validate().is_ok());
        config.output.quality = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_quality_too_high() {
        let mut config = PipelineConfig::default();
        config.output.quality = 101;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quality"));
    }

    #[test]
    fn validate_zero_dimension() {
        let mut config = PipelineConfig::default();
        config.resize.height = Some(0);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_watermark_ranges() {
        let base = WatermarkConfig {
            path: "logo.png".into(),
            ..WatermarkConfig::default()
        };
        let check = |wm: WatermarkConfig| PipelineConfig {
            watermark: Some(wm),
            ..PipelineConfig::default()
        }
        .validate();

        assert!(check(base.clone()).is_ok());
        assert!(
            check(WatermarkConfig {
                opacity: 1.5,
                ..base.clone()
            })
            .is_err()
        );
        assert!(
            check(WatermarkConfig {
                scale: 0.0,
                ..base.clone()
            })
            .is_err()
        );
        assert!(
            check(WatermarkConfig {
                scale: 100.0,
                ..base.clone()
            })
            .is_ok()
        );
        assert!(check(WatermarkConfig::default()).is_err(), "path required");
    }

    #[test]
    fn unknown_key_rejected() {
        let result = parse_config(
            r#"
[output]
qualty = 90
"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        assert!(parse_config("[outptu]\nquality = 90\n").is_err());
    }

    #[test]
    fn unknown_anchor_rejected() {
        assert!(parse_config("[watermark]\npath = \"a.png\"\nanchor = \"middle\"\n").is_err());
    }

    // =========================================================================
    // load_config
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("imgbatch.toml")).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("imgbatch.toml");
        fs::write(&path, "[output]\nformat = \"png\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.output.format, OutputFormat::Png);
    }

    #[test]
    fn load_config_resolves_watermark_relative_to_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("imgbatch.toml");
        fs::write(&path, "[watermark]\npath = \"logo.png\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.watermark.unwrap().path, tmp.path().join("logo.png"));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("imgbatch.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("imgbatch.toml");
        fs::write(&path, "[output]\nquality = 200\n").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    // =========================================================================
    // effective_threads
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_zero_means_one() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // stock_config_toml
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config = parse_config(stock_config_toml()).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[resize]"));
        assert!(content.contains("[output]"));
        assert!(content.contains("# [watermark]"));
        assert!(content.contains("[processing]"));
    }
}
