//! Core domain types, fuzzy keyword location and date resolution
//! for reading roll-call dates off photographed flight boards.

pub mod error;
pub mod extract;
pub mod fuzzy;
pub mod keyword;
pub mod provider;
pub mod resolve;
pub mod types;

pub use error::{Error, Result};
pub use extract::{DateExtractor, Extraction};
pub use fuzzy::{FuzzyModel, FuzzyModelRegistry};
pub use keyword::{KeywordLocator, KeywordMatch};
pub use provider::{CropAndRecognize, ImageCropper, OcrProvider, RegionLocator, RegionRefiner};
pub use resolve::{closer_date, month_keywords, BestDate, DateResolver, Resolution};
pub use types::{
    BoundingRect, CropBand, DateCandidate, Location, OcrOutput, SaveType, Slide, Terminal,
};
