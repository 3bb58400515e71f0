//! Keyword region lookup over hOCR markup.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use rollcall_core::{BoundingRect, Error, RegionLocator, Result};
use std::sync::LazyLock;

/// Regex for the geometry property of an hOCR `title` attribute.
static BBOX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"bbox ([0-9]+) ([0-9]+) ([0-9]+) ([0-9]+);").unwrap());

/// Finds the rectangle of the element containing a spelling in hOCR.
#[derive(Debug, Clone, Copy, Default)]
pub struct HocrRegionLocator;

impl HocrRegionLocator {
    /// Create a new hOCR region locator.
    pub fn new() -> Self {
        Self
    }
}

impl RegionLocator for HocrRegionLocator {
    /// Search the markup in document order for the first element whose own
    /// text contains `spelling`, ignoring case, and return the `bbox` of that
    /// element's parent. For a Tesseract word span this is its line.
    fn locate_region(&self, markup: &str, spelling: &str) -> Result<Option<BoundingRect>> {
        let needle = spelling.to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }

        let mut reader = Reader::from_str(markup);
        reader.trim_text(true);

        let mut open: Vec<OpenElement> = Vec::new();
        let mut saw_root = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    saw_root = true;
                    open.push(OpenElement::from_start(e));
                }
                Ok(Event::Empty(_)) => {
                    saw_root = true;
                }
                Ok(Event::End(_)) => {
                    open.pop();
                }
                Ok(Event::Text(ref e)) => {
                    // Only the first text node of an element is compared.
                    let Some(current) = open.last_mut() else {
                        continue;
                    };
                    if current.seen_text {
                        continue;
                    }
                    current.seen_text = true;

                    let text = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(e).into_owned());
                    if !text.to_lowercase().contains(&needle) {
                        continue;
                    }

                    let parent = open.len().checked_sub(2).and_then(|i| open.get(i));
                    return container_rect(parent, spelling).map(Some);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::MarkupParse(format!(
                        "Error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
                _ => {}
            }
        }

        if !saw_root {
            return Err(Error::MarkupParse(
                "No root element in document".to_string(),
            ));
        }

        log::debug!("No element containing '{}' in markup", spelling);
        Ok(None)
    }
}

/// An element whose end tag has not been seen yet.
#[derive(Debug)]
struct OpenElement {
    name: String,
    title: Option<String>,
    seen_text: bool,
}

impl OpenElement {
    fn from_start(e: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(local_name(e.name().as_ref())).to_string();
        let title = e
            .attributes()
            .flatten()
            .find(|attr| attr.key.as_ref() == b"title")
            .map(|attr| {
                attr.unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned())
            });

        Self {
            name,
            title,
            seen_text: false,
        }
    }
}

/// Rectangle from the `title` of the element containing a match.
fn container_rect(parent: Option<&OpenElement>, spelling: &str) -> Result<BoundingRect> {
    let parent = parent.ok_or_else(|| {
        Error::MalformedMarkup(format!("'{}' matched an element with no parent", spelling))
    })?;
    let title = parent.title.as_deref().ok_or_else(|| {
        Error::MalformedMarkup(format!(
            "<{}> containing '{}' has no title attribute",
            parent.name, spelling
        ))
    })?;
    parse_bbox(title)
}

/// Parse the `bbox minX minY maxX maxY;` property of an hOCR title.
pub fn parse_bbox(title: &str) -> Result<BoundingRect> {
    let caps = BBOX_REGEX
        .captures(title)
        .ok_or_else(|| Error::MalformedMarkup(format!("No bbox in title '{}'", title)))?;

    let mut coords = [0i32; 4];
    for (i, coord) in coords.iter_mut().enumerate() {
        let digits = caps.get(i + 1).map_or("", |m| m.as_str());
        *coord = digits.parse().map_err(|e| {
            Error::MalformedMarkup(format!("Bad bbox coordinate '{}': {}", digits, e))
        })?;
    }

    let [min_x, min_y, max_x, max_y] = coords;
    BoundingRect::new(min_x, min_y, max_x, max_y).ok_or_else(|| {
        Error::MalformedMarkup(format!("Inverted bbox in title '{}'", title))
    })
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}
