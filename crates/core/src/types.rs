//! Domain types for terminals, OCR'd slides and resolved dates.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A physical location that posts flight-status boards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terminal {
    /// Unique terminal title, used as the lookup key.
    pub title: String,

    /// Geographic position of the terminal.
    pub location: Location,

    /// IANA time zone name, derived from `location` when the list omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Geographic coordinates in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// The preprocessing pipeline that produced a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveType {
    /// The photograph as taken.
    Raw,
    /// Luma-only conversion.
    Grayscale,
    /// Binarized at a fixed luma cut-off.
    Threshold,
    /// Contrast-stretched.
    Contrast,
    /// Full-width band around a located month name.
    #[serde(rename = "cropped")]
    CroppedForDate,
}

impl SaveType {
    /// File-name suffix for images written by this pipeline.
    pub fn suffix(&self) -> &'static str {
        match self {
            SaveType::Raw => "raw",
            SaveType::Grayscale => "gray",
            SaveType::Threshold => "thresh",
            SaveType::Contrast => "contrast",
            SaveType::CroppedForDate => "cropped",
        }
    }
}

impl std::fmt::Display for SaveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Plain text and hOCR markup recognized from one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrOutput {
    pub plain_text: String,
    pub hocr: String,
}

impl OcrOutput {
    pub fn new(plain_text: impl Into<String>, hocr: impl Into<String>) -> Self {
        Self {
            plain_text: plain_text.into(),
            hocr: hocr.into(),
        }
    }
}

/// One OCR'd variant of a photograph.
///
/// Text fields are filled once from an [`OcrOutput`] and never change.
/// Refinement builds a new slide with [`Slide::refined`].
#[derive(Debug, Clone)]
pub struct Slide {
    terminal: String,
    save_type: SaveType,
    plain_text: String,
    hocr: String,
    path: PathBuf,
}

impl Slide {
    /// Create a slide from the OCR output of the image at `path`.
    pub fn recognized(
        terminal: impl Into<String>,
        save_type: SaveType,
        path: impl Into<PathBuf>,
        output: OcrOutput,
    ) -> Self {
        Self {
            terminal: terminal.into(),
            save_type,
            plain_text: output.plain_text,
            hocr: output.hocr,
            path: path.into(),
        }
    }

    /// Derive a new slide for a re-OCR'd image, keeping the terminal.
    pub fn refined(&self, save_type: SaveType, path: impl Into<PathBuf>, output: OcrOutput) -> Self {
        Self::recognized(self.terminal.clone(), save_type, path, output)
    }

    /// Title of the terminal this slide was photographed at.
    pub fn terminal(&self) -> &str {
        &self.terminal
    }

    pub fn save_type(&self) -> SaveType {
        self.save_type
    }

    pub fn plain_text(&self) -> &str {
        &self.plain_text
    }

    pub fn hocr(&self) -> &str {
        &self.hocr
    }

    /// Image file this slide was recognized from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Integer pixel rectangle, inclusive min corner and max corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingRect {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
}

impl BoundingRect {
    /// Build a rectangle, or `None` when a min coordinate exceeds its max
    /// or a side length does not fit in `i32`.
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Option<Self> {
        if min_x > max_x || min_y > max_y {
            return None;
        }
        max_x.checked_sub(min_x)?;
        max_y.checked_sub(min_y)?;
        Some(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    pub fn min_x(&self) -> i32 {
        self.min_x
    }

    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    pub fn max_x(&self) -> i32 {
        self.max_x
    }

    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y
    }

    /// Full-width horizontal band covering this rectangle, starting
    /// `margin_above` pixels above it and `extra_height` pixels taller.
    ///
    /// Fails with [`Error::MalformedMarkup`] when the band leaves `i32` range.
    pub fn band(&self, margin_above: i32, extra_height: i32) -> Result<CropBand> {
        let top = self.min_y.checked_sub(margin_above);
        let height = self.height().checked_add(extra_height);
        match (top, height) {
            (Some(top), Some(height)) => Ok(CropBand { top, height }),
            _ => Err(Error::MalformedMarkup(format!(
                "Crop band around rows {}..{} overflows",
                self.min_y, self.max_y
            ))),
        }
    }
}

/// A full-width horizontal strip of an image, in pixels.
///
/// `top` may be negative when the margin reaches past the image edge;
/// croppers clamp it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBand {
    pub top: i32,
    pub height: i32,
}

/// A calendar date extracted from one slide's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateCandidate {
    /// The date at midnight UTC.
    pub date: DateTime<Utc>,

    /// Index of the preprocessed slide the date traces back to.
    pub slide_index: usize,

    /// Save type of that slide.
    pub source_save_type: SaveType,

    /// Save type of the text the date was read from; `CroppedForDate` when
    /// it came from a refined copy of the source slide.
    pub save_type: SaveType,

    /// Month spelling the date patterns were built from.
    pub spelling: String,
}
