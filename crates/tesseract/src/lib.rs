//! Tesseract-backed recognition and image handling for roll-call boards.

pub mod crop;
pub mod ocr;
pub mod preprocess;

pub use crop::ImageBandCropper;
pub use ocr::{run_with_timeout, TesseractConfig, TesseractOcr, DEFAULT_WHITELIST};
pub use preprocess::{variant_path, PreprocessConfig, Preprocessor};
