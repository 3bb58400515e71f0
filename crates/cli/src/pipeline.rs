//! Per-photo processing: preprocess, recognize, resolve.

use crate::config::Config;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rollcall_core::{
    month_keywords, CropAndRecognize, DateResolver, FuzzyModelRegistry, Location, OcrOutput,
    OcrProvider, Resolution, SaveType, Slide, Terminal,
};
use rollcall_hocr::HocrRegionLocator;
use rollcall_tesseract::{ImageBandCropper, Preprocessor};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One output row per photograph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub terminal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    pub photo: PathBuf,
    pub roll_call: Option<DateTime<Utc>>,
    /// Preprocessing variant the date traces back to.
    pub source_save_type: Option<SaveType>,
    /// Whether the date was read from a cropped re-recognition.
    pub refined: bool,
    pub spelling: Option<String>,
}

impl Record {
    /// `listed` is the terminal's entry when terminal lists were loaded.
    pub fn new(
        terminal: &str,
        listed: Option<&Terminal>,
        photo: &Path,
        resolution: &Resolution,
    ) -> Self {
        let found = resolution.date.as_ref();
        Self {
            terminal: terminal.to_string(),
            location: listed.map(|t| t.location),
            timezone: listed.and_then(|t| t.timezone.clone()),
            photo: photo.to_path_buf(),
            roll_call: resolution.roll_call(),
            source_save_type: found.map(|d| d.source_save_type),
            refined: found.is_some_and(|d| d.save_type == SaveType::CroppedForDate),
            spelling: found.map(|d| d.spelling.clone()),
        }
    }
}

/// Turns photographs into resolved roll-call dates.
pub struct Pipeline<P> {
    ocr: P,
    registry: FuzzyModelRegistry,
    preprocessor: Preprocessor,
    work_dir: PathBuf,
    retries: u32,
    margin_above: i32,
    extra_height: i32,
}

impl<P: OcrProvider> Pipeline<P> {
    pub fn new(ocr: P, config: &Config) -> Self {
        let work_dir = config.output.work_dir.clone();
        Self {
            ocr,
            registry: FuzzyModelRegistry::build(month_keywords()),
            preprocessor: Preprocessor::new(&work_dir, config.preprocess.clone()),
            work_dir,
            retries: config.ocr.retries,
            margin_above: config.refine.margin_above,
            extra_height: config.refine.extra_height,
        }
    }

    /// Resolve the roll-call date shown in `photo`, taken at `terminal`.
    pub fn process_photo(
        &self,
        terminal: &str,
        photo: &Path,
        reference: DateTime<Utc>,
    ) -> Result<Resolution> {
        let variants = self
            .preprocessor
            .write_variants(photo)
            .with_context(|| format!("Failed to preprocess {}", photo.display()))?;

        let mut slides = Vec::with_capacity(variants.len());
        for (save_type, path) in variants {
            match self.recognize(&path) {
                Ok(output) => {
                    if output.plain_text.trim().is_empty() {
                        log::debug!("[{}] No text in save type {}", terminal, save_type);
                    }
                    slides.push(Slide::recognized(terminal, save_type, path, output));
                }
                Err(e) => {
                    log::warn!("[{}] Skipping save type {}: {}", terminal, save_type, e);
                }
            }
        }
        if slides.is_empty() {
            bail!("No variant of {} could be recognized", photo.display());
        }
        log::debug!("[{}] Recognized {} slides", terminal, slides.len());

        let refiner = CropAndRecognize::new(ImageBandCropper::new(&self.work_dir), &self.ocr);
        let resolver = DateResolver::new(&self.registry, HocrRegionLocator::new(), refiner)
            .with_band_margins(self.margin_above, self.extra_height);

        let resolution = resolver
            .resolve(&slides, reference)
            .with_context(|| format!("Failed to resolve date in {}", photo.display()))?;
        Ok(resolution)
    }

    /// Recognize a whole image, retrying failed attempts.
    fn recognize(&self, image: &Path) -> rollcall_core::Result<OcrOutput> {
        let mut attempt = 0;
        loop {
            match self.ocr.recognize(image) {
                Ok(output) => return Ok(output),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    log::warn!(
                        "OCR of {} failed ({}), retry {}/{}",
                        image.display(),
                        e,
                        attempt,
                        self.retries
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}
