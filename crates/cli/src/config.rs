//! Run configuration stored in TOML format.

use anyhow::{Context, Result};
use rollcall_core::resolve::{DEFAULT_EXTRA_HEIGHT, DEFAULT_MARGIN_ABOVE};
use rollcall_tesseract::{PreprocessConfig, TesseractConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for one `rollcall` run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ocr: OcrConfig,
    pub preprocess: PreprocessConfig,
    pub refine: RefineConfig,
    pub output: OutputConfig,
}

/// OCR engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    #[serde(flatten)]
    pub tesseract: TesseractConfig,
    /// Extra attempts for a whole-image recognition that fails.
    pub retries: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract: TesseractConfig::default(),
            retries: 2,
        }
    }
}

/// Margins turning a month's line into a crop band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    pub margin_above: i32,
    pub extra_height: i32,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            margin_above: DEFAULT_MARGIN_ABOVE,
            extra_height: DEFAULT_EXTRA_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for preprocessed and cropped images.
    pub work_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("rollcall-work"),
        }
    }
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}
