//! Interfaces to the side-effecting collaborators of date resolution.
//!
//! The resolver only decides; recognizing images, searching markup and
//! cropping happen behind these traits so the decision logic can run against
//! fakes.

use crate::error::Result;
use crate::types::{BoundingRect, CropBand, OcrOutput, SaveType, Slide};
use std::path::{Path, PathBuf};

/// Recognizes text in an image.
pub trait OcrProvider {
    /// Plain text and positional markup for the image at `image`.
    fn recognize(&self, image: &Path) -> Result<OcrOutput>;
}

/// Writes a cropped copy of an image.
pub trait ImageCropper {
    /// Crop `band` out of `image`, returning the path of the new image.
    fn crop(&self, image: &Path, band: CropBand) -> Result<PathBuf>;
}

/// Maps a recognized spelling back to the pixel region it occupies.
pub trait RegionLocator {
    /// Bounding rectangle of the element containing `spelling` in `markup`.
    ///
    /// `Ok(None)` when no element contains the spelling.
    fn locate_region(&self, markup: &str, spelling: &str) -> Result<Option<BoundingRect>>;
}

/// Produces a tighter, re-recognized variant of a slide.
pub trait RegionRefiner {
    /// A new slide for `band` of `slide`'s image, freshly recognized.
    fn refine(&self, slide: &Slide, band: CropBand) -> Result<Slide>;
}

/// Refines by cropping with `C` and recognizing the crop with `P`.
#[derive(Debug, Clone)]
pub struct CropAndRecognize<C, P> {
    cropper: C,
    ocr: P,
}

impl<C: ImageCropper, P: OcrProvider> CropAndRecognize<C, P> {
    pub fn new(cropper: C, ocr: P) -> Self {
        Self { cropper, ocr }
    }
}

impl<C: ImageCropper, P: OcrProvider> RegionRefiner for CropAndRecognize<C, P> {
    fn refine(&self, slide: &Slide, band: CropBand) -> Result<Slide> {
        let cropped = self.cropper.crop(slide.path(), band)?;
        let output = self.ocr.recognize(&cropped)?;
        if output.plain_text.trim().is_empty() {
            log::debug!(
                "[{}] No plain text extracted from cropped {}",
                slide.terminal(),
                cropped.display()
            );
        }
        Ok(slide.refined(SaveType::CroppedForDate, cropped, output))
    }
}

impl<T: OcrProvider + ?Sized> OcrProvider for &T {
    fn recognize(&self, image: &Path) -> Result<OcrOutput> {
        (**self).recognize(image)
    }
}

impl<T: ImageCropper + ?Sized> ImageCropper for &T {
    fn crop(&self, image: &Path, band: CropBand) -> Result<PathBuf> {
        (**self).crop(image, band)
    }
}

impl<T: RegionLocator + ?Sized> RegionLocator for &T {
    fn locate_region(&self, markup: &str, spelling: &str) -> Result<Option<BoundingRect>> {
        (**self).locate_region(markup, spelling)
    }
}

impl<T: RegionRefiner + ?Sized> RegionRefiner for &T {
    fn refine(&self, slide: &Slide, band: CropBand) -> Result<Slide> {
        (**self).refine(slide, band)
    }
}
