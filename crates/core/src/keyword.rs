//! Locating the most plausible OCR spelling of a keyword across slides.

use crate::error::Result;
use crate::fuzzy::{edit_distance, FuzzyModel, FuzzyModelRegistry};
use crate::types::Slide;

/// The closest spelling of a keyword found in a set of slides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch {
    /// The OCR token, lowercased, as it appears in the slide text.
    pub spelling: String,

    /// Index of the slide the spelling was found in.
    pub slide_index: usize,

    /// Edit distance between the spelling and the keyword.
    pub distance: usize,
}

/// Finds keyword spellings with the registry's fuzzy models.
#[derive(Debug, Clone, Copy)]
pub struct KeywordLocator<'a> {
    registry: &'a FuzzyModelRegistry,
}

impl<'a> KeywordLocator<'a> {
    pub fn new(registry: &'a FuzzyModelRegistry) -> Self {
        Self { registry }
    }

    /// Find the token across all slides that best spells `keyword`.
    ///
    /// Every slide is searched independently, since each preprocessing
    /// variant garbles the text differently. The globally closest spelling
    /// wins; on equal distance the first one seen (by slide order, then token
    /// order) is kept. `Ok(None)` means the keyword is not legible anywhere.
    ///
    /// Fails only when no model was trained for `keyword`.
    pub fn locate(&self, keyword: &str, slides: &[Slide]) -> Result<Option<KeywordMatch>> {
        let keyword = keyword.to_lowercase();
        let model = self.registry.model(&keyword)?;

        let mut best: Option<KeywordMatch> = None;
        for (slide_index, slide) in slides.iter().enumerate() {
            let Some((spelling, distance)) =
                closest_spelling_in_text(model, &keyword, slide.plain_text())
            else {
                log::debug!(
                    "[{}] No close spelling of '{}' in save type {}",
                    slide.terminal(),
                    keyword,
                    slide.save_type()
                );
                continue;
            };

            if best.as_ref().map_or(true, |b| distance < b.distance) {
                best = Some(KeywordMatch {
                    spelling,
                    slide_index,
                    distance,
                });
            }
        }

        if let Some(found) = &best {
            let slide = &slides[found.slide_index];
            log::info!(
                "[{}] Close spelling '{}' of '{}' found in save type {} (distance {})",
                slide.terminal(),
                found.spelling,
                keyword,
                slide.save_type(),
                found.distance
            );
        }

        Ok(best)
    }
}

/// Split OCR text into lowercase tokens on spaces and line breaks.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c| c == ' ' || c == '\r' || c == '\n')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Closest token in `text` that the model suggests `keyword` for.
fn closest_spelling_in_text(
    model: &FuzzyModel,
    keyword: &str,
    text: &str,
) -> Option<(String, usize)> {
    let mut best: Option<(String, usize)> = None;
    for token in tokenize(text) {
        if !model.suggestions(&token).iter().any(|s| s == keyword) {
            continue;
        }
        let distance = edit_distance(&token, keyword);
        if best.as_ref().map_or(true, |(_, d)| distance < *d) {
            best = Some((token, distance));
        }
    }
    best
}
