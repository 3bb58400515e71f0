//! Error types for roll-call date resolution.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving a roll-call date.
///
/// "Not found" outcomes (keyword absent, no date pattern in a text) are not
/// errors; they are reported through `Option` and [`crate::Extraction`].
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The positional markup could not be parsed at all.
    #[error("Markup parsing error: {0}")]
    MarkupParse(String),

    /// A keyword matched in the markup, but its container lacks usable geometry.
    #[error("Malformed markup: {0}")]
    MalformedMarkup(String),

    /// A matched numeric group could not be turned into a number.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The OCR engine failed on an image.
    #[error("OCR error: {0}")]
    Ocr(String),

    /// The OCR engine did not finish within the allowed time.
    #[error("OCR timed out after {timeout:?} on {image}")]
    OcrTimeout { image: String, timeout: Duration },

    /// Cropping an image region failed.
    #[error("Crop error: {0}")]
    Crop(String),

    /// Image decoding or encoding failed.
    #[error("Image error: {0}")]
    Image(String),

    /// A fuzzy model was requested for a keyword that was never trained.
    #[error("No fuzzy model trained for keyword '{0}'")]
    MissingFuzzyModel(String),
}

impl Error {
    /// Whether resolution may carry on after this error, treating the
    /// affected slide as yielding nothing.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::OcrTimeout { .. })
    }
}
