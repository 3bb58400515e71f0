//! hOCR backend for locating recognized text on the page.
//!
//! Parses the XHTML markup Tesseract emits for `hocr` output and maps a
//! spelling back to the pixel rectangle of the element that contains it.

pub mod locator;

pub use locator::{parse_bbox, HocrRegionLocator};
