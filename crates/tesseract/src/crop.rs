//! Full-width band cropping.

use crate::preprocess::{open_image, save_image, variant_path};
use rollcall_core::{CropBand, Error, ImageCropper, Result, SaveType};
use std::fs;
use std::path::{Path, PathBuf};

/// Crops horizontal bands out of images into a work directory.
#[derive(Debug, Clone)]
pub struct ImageBandCropper {
    work_dir: PathBuf,
}

impl ImageBandCropper {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }
}

impl ImageCropper for ImageBandCropper {
    fn crop(&self, image: &Path, band: CropBand) -> Result<PathBuf> {
        let source = open_image(image)?;
        let (top, height) = clamp_band(band, source.height()).ok_or_else(|| {
            Error::Crop(format!(
                "Band at {} with height {} lies outside {} ({} rows)",
                band.top,
                band.height,
                image.display(),
                source.height()
            ))
        })?;

        let cropped = source.crop_imm(0, top, source.width(), height);

        fs::create_dir_all(&self.work_dir)?;
        let path = variant_path(&self.work_dir, image, SaveType::CroppedForDate.suffix());
        save_image(&cropped, &path)?;
        log::debug!(
            "Cropped rows {}..{} of {} into {}",
            top,
            top + height,
            image.display(),
            path.display()
        );
        Ok(path)
    }
}

/// Intersect `band` with rows `0..image_height`, as `(top, height)`.
///
/// `None` when nothing of the band is left.
fn clamp_band(band: CropBand, image_height: u32) -> Option<(u32, u32)> {
    let top = i64::from(band.top).max(0);
    let bottom = (i64::from(band.top) + i64::from(band.height)).min(i64::from(image_height));
    if bottom <= top {
        return None;
    }
    let top = u32::try_from(top).ok()?;
    let bottom = u32::try_from(bottom).ok()?;
    Some((top, bottom - top))
}
