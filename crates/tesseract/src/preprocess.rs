//! Image variants written ahead of OCR.

use image::{imageops, DynamicImage, GrayImage};
use rollcall_core::{Error, Result, SaveType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for the preprocessing variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Variants recognized per photo, in order.
    pub variants: Vec<SaveType>,
    /// Luma cut-off for [`SaveType::Threshold`]; pixels at or above become white.
    pub threshold: u8,
    /// Contrast adjustment in percent for [`SaveType::Contrast`].
    pub contrast: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            variants: vec![
                SaveType::Raw,
                SaveType::Grayscale,
                SaveType::Threshold,
                SaveType::Contrast,
            ],
            threshold: 140,
            contrast: 40.0,
        }
    }
}

/// Path of the `suffix` variant of `source` inside `work_dir`.
pub fn variant_path(work_dir: &Path, source: &Path, suffix: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    work_dir.join(format!("{}-{}.png", stem, suffix))
}

/// Writes preprocessed copies of photographs into a work directory.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    work_dir: PathBuf,
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(work_dir: impl Into<PathBuf>, config: PreprocessConfig) -> Self {
        Self {
            work_dir: work_dir.into(),
            config,
        }
    }

    /// Write every configured variant of `photo`.
    ///
    /// [`SaveType::Raw`] is the photo itself and is not copied.
    pub fn write_variants(&self, photo: &Path) -> Result<Vec<(SaveType, PathBuf)>> {
        let needs_decode = self.config.variants.iter().any(|v| *v != SaveType::Raw);
        let image = if needs_decode {
            Some(open_image(photo)?)
        } else {
            None
        };

        let mut written = Vec::with_capacity(self.config.variants.len());
        for &save_type in &self.config.variants {
            let path = match (&image, save_type) {
                (_, SaveType::Raw) => photo.to_path_buf(),
                (Some(image), _) => self.write_variant(image, photo, save_type)?,
                (None, _) => continue,
            };
            written.push((save_type, path));
        }
        Ok(written)
    }

    fn write_variant(&self, image: &DynamicImage, photo: &Path, save_type: SaveType) -> Result<PathBuf> {
        let output = match save_type {
            SaveType::Grayscale => DynamicImage::ImageLuma8(image.to_luma8()),
            SaveType::Threshold => DynamicImage::ImageLuma8(threshold(image.to_luma8(), self.config.threshold)),
            SaveType::Contrast => DynamicImage::ImageRgba8(imageops::contrast(image, self.config.contrast)),
            SaveType::Raw | SaveType::CroppedForDate => {
                return Err(Error::Image(format!(
                    "'{}' is not a preprocessing variant",
                    save_type
                )));
            }
        };

        fs::create_dir_all(&self.work_dir)?;
        let path = variant_path(&self.work_dir, photo, save_type.suffix());
        save_image(&output, &path)?;
        log::debug!("Wrote {} variant {}", save_type, path.display());
        Ok(path)
    }
}

/// Binarize at `cutoff`.
fn threshold(mut image: GrayImage, cutoff: u8) -> GrayImage {
    for pixel in image.pixels_mut() {
        pixel.0[0] = if pixel.0[0] >= cutoff { 255 } else { 0 };
    }
    image
}

pub(crate) fn open_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| Error::Image(format!("Failed to read {}: {}", path.display(), e)))
}

pub(crate) fn save_image(image: &DynamicImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .map_err(|e| Error::Image(format!("Failed to write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_photo(dir: &Path) -> PathBuf {
        let mut photo = RgbImage::new(8, 4);
        for (x, _, pixel) in photo.enumerate_pixels_mut() {
            let v = (x * 32) as u8;
            *pixel = Rgb([v, v, v]);
        }
        let path = dir.join("board.png");
        photo.save(&path).unwrap();
        path
    }

    #[test]
    fn test_variant_path() {
        assert_eq!(
            variant_path(Path::new("/work"), Path::new("/photos/board.jpg"), "gray"),
            PathBuf::from("/work/board-gray.png")
        );
    }

    #[test]
    fn test_writes_each_variant() {
        let dir = TempDir::new().unwrap();
        let photo = write_photo(dir.path());
        let work = dir.path().join("work");

        let variants = Preprocessor::new(&work, PreprocessConfig::default())
            .write_variants(&photo)
            .unwrap();

        let types: Vec<SaveType> = variants.iter().map(|(t, _)| *t).collect();
        assert_eq!(
            types,
            vec![
                SaveType::Raw,
                SaveType::Grayscale,
                SaveType::Threshold,
                SaveType::Contrast
            ]
        );
        assert_eq!(variants[0].1, photo);
        assert_eq!(variants[1].1, work.join("board-gray.png"));
        assert_eq!(variants[2].1, work.join("board-thresh.png"));
        assert_eq!(variants[3].1, work.join("board-contrast.png"));
        for (_, path) in &variants {
            assert!(path.exists(), "{} missing", path.display());
        }
    }

    #[test]
    fn test_threshold_binarizes() {
        let dir = TempDir::new().unwrap();
        let photo = write_photo(dir.path());
        let config = PreprocessConfig {
            variants: vec![SaveType::Threshold],
            threshold: 100,
            ..Default::default()
        };

        let variants = Preprocessor::new(dir.path(), config)
            .write_variants(&photo)
            .unwrap();
        let written = image::open(&variants[0].1).unwrap().to_luma8();

        // Columns are 0, 32, 64, 96, 128, ...
        assert_eq!(written.get_pixel(3, 0), &Luma([0]));
        assert_eq!(written.get_pixel(4, 0), &Luma([255]));
        assert!(written.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_raw_only_skips_decode() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("not-an-image.png");
        let config = PreprocessConfig {
            variants: vec![SaveType::Raw],
            ..Default::default()
        };

        let variants = Preprocessor::new(dir.path(), config)
            .write_variants(&missing)
            .unwrap();
        assert_eq!(variants, vec![(SaveType::Raw, missing)]);
    }

    #[test]
    fn test_unreadable_photo_is_image_error() {
        let dir = TempDir::new().unwrap();
        let bogus = dir.path().join("board.png");
        fs::write(&bogus, b"not a png").unwrap();

        let err = Preprocessor::new(dir.path(), PreprocessConfig::default())
            .write_variants(&bogus)
            .unwrap_err();
        assert!(matches!(err, Error::Image(_)));
    }

    #[test]
    fn test_cropped_is_not_a_preprocessing_variant() {
        let dir = TempDir::new().unwrap();
        let photo = write_photo(dir.path());
        let config = PreprocessConfig {
            variants: vec![SaveType::CroppedForDate],
            ..Default::default()
        };

        let err = Preprocessor::new(dir.path(), config)
            .write_variants(&photo)
            .unwrap_err();
        assert!(matches!(err, Error::Image(_)));
    }
}
