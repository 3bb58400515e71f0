//! Roll-call date resolution across OCR'd slides.
//!
//! Month names are tried in a fixed order: the current and next month in
//! long form, then the same two in short form. For each, the best fuzzy
//! spelling is located, its line is cropped and re-recognized on every slide,
//! and every date found is weighed against the reference time. A legitimate
//! roll-call date sits within a few days of "now"; OCR misreads scatter
//! further, so the date closest to the reference wins.

use crate::error::Result;
use crate::extract::{DateExtractor, Extraction};
use crate::fuzzy::FuzzyModelRegistry;
use crate::keyword::KeywordLocator;
use crate::provider::{RegionLocator, RegionRefiner};
use crate::types::{DateCandidate, Slide};
use chrono::{DateTime, Datelike, Month, Utc};

/// Pixels added above a located month line before cropping.
pub const DEFAULT_MARGIN_ABOVE: i32 = 5;

/// Pixels added to the height of a located month line before cropping.
pub const DEFAULT_EXTRA_HEIGHT: i32 = 10;

const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

/// Lowercase long and short forms of a month ("january", "jan").
pub fn month_spellings(month: Month) -> (String, String) {
    let long = month.name().to_lowercase();
    let short = long.chars().take(3).collect();
    (long, short)
}

/// Every long and short month name; the master keyword list for the registry.
pub fn month_keywords() -> Vec<String> {
    let (long, short): (Vec<String>, Vec<String>) =
        MONTHS.iter().map(|&m| month_spellings(m)).unzip();
    long.into_iter().chain(short).collect()
}

/// The four keyword candidates for `reference`, in resolution order.
pub fn month_candidates(reference: DateTime<Utc>) -> [(String, Month); 4] {
    let current = MONTHS[reference.month0() as usize];
    let next = current.succ();
    let (current_long, current_short) = month_spellings(current);
    let (next_long, next_short) = month_spellings(next);
    [
        (current_long, current),
        (next_long, next),
        (current_short, current),
        (next_short, next),
    ]
}

/// Whichever of `first` and `second` is closer to `reference`.
///
/// Equal distances return `first`.
pub fn closer_date(
    reference: DateTime<Utc>,
    first: DateTime<Utc>,
    second: DateTime<Utc>,
) -> DateTime<Utc> {
    if distance(reference, second) < distance(reference, first) {
        second
    } else {
        first
    }
}

fn distance(reference: DateTime<Utc>, date: DateTime<Utc>) -> u64 {
    reference
        .signed_duration_since(date)
        .num_milliseconds()
        .unsigned_abs()
}

/// Running best date candidate.
#[derive(Debug, Clone)]
pub struct BestDate {
    reference: DateTime<Utc>,
    best: Option<DateCandidate>,
}

impl BestDate {
    pub fn new(reference: DateTime<Utc>) -> Self {
        Self {
            reference,
            best: None,
        }
    }

    /// Keep `candidate` if it is the first, or strictly closer than the
    /// current best. Returns whether it was kept.
    pub fn offer(&mut self, candidate: DateCandidate) -> bool {
        let replace = match &self.best {
            None => true,
            Some(best) => closer_date(self.reference, best.date, candidate.date) != best.date,
        };
        if replace {
            self.best = Some(candidate);
        }
        replace
    }

    pub fn get(&self) -> Option<&DateCandidate> {
        self.best.as_ref()
    }

    pub fn into_inner(self) -> Option<DateCandidate> {
        self.best
    }
}

/// Outcome of resolving one photograph's slides.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// The chosen date, if any text yielded one.
    pub date: Option<DateCandidate>,

    /// Cleaned texts no date pattern matched, for diagnostics.
    pub unmatched: Vec<String>,

    /// Cleaned texts that matched a pattern but named no real calendar day.
    pub rejected: Vec<String>,
}

impl Resolution {
    pub fn roll_call(&self) -> Option<DateTime<Utc>> {
        self.date.as_ref().map(|d| d.date)
    }
}

/// Resolves a single roll-call date from a photograph's slides.
pub struct DateResolver<'a, L, R> {
    registry: &'a FuzzyModelRegistry,
    regions: L,
    refiner: R,
    margin_above: i32,
    extra_height: i32,
}

impl<'a, L: RegionLocator, R: RegionRefiner> DateResolver<'a, L, R> {
    /// Create a resolver with the default crop margins.
    pub fn new(registry: &'a FuzzyModelRegistry, regions: L, refiner: R) -> Self {
        Self {
            registry,
            regions,
            refiner,
            margin_above: DEFAULT_MARGIN_ABOVE,
            extra_height: DEFAULT_EXTRA_HEIGHT,
        }
    }

    /// Set the margins used to turn a month's rectangle into a crop band.
    pub fn with_band_margins(mut self, margin_above: i32, extra_height: i32) -> Self {
        self.margin_above = margin_above;
        self.extra_height = extra_height;
        self
    }

    /// Resolve the date printed on `slides`, preferring dates near `reference`.
    ///
    /// All four month candidates and all slides are always tried. A refinement
    /// that times out is skipped; any other collaborator failure aborts.
    pub fn resolve(&self, slides: &[Slide], reference: DateTime<Utc>) -> Result<Resolution> {
        let locator = KeywordLocator::new(self.registry);
        let mut state = ResolveState::new(reference);

        for (keyword, month) in month_candidates(reference) {
            if let Some(found) = locator.locate(&keyword, slides)? {
                let source = &slides[found.slide_index];
                let region = self.regions.locate_region(source.hocr(), &found.spelling)?;
                if region.is_none() {
                    log::debug!(
                        "[{}] '{}' not in markup of save type {}, skipping refinement",
                        source.terminal(),
                        found.spelling,
                        source.save_type()
                    );
                }

                let band = region
                    .map(|rect| rect.band(self.margin_above, self.extra_height))
                    .transpose()?;

                for (index, slide) in slides.iter().enumerate() {
                    state.attempt(index, slide, slide, &found.spelling, month)?;

                    let Some(band) = band else { continue };
                    match self.refiner.refine(slide, band) {
                        Ok(refined) => state.attempt(index, slide, &refined, &found.spelling, month)?,
                        Err(e) if e.is_recoverable() => {
                            log::warn!(
                                "[{}] Refinement of save type {} skipped: {}",
                                slide.terminal(),
                                slide.save_type(),
                                e
                            );
                        }
                        Err(e) => return Err(e),
                    }
                }
            }

            // The fuzzy matcher misses month names glued to other letters.
            for (index, slide) in slides.iter().enumerate() {
                state.attempt(index, slide, slide, &keyword, month)?;
            }
        }

        let resolution = state.finish();
        if let Some(slide) = slides.first() {
            match &resolution.date {
                Some(found) => log::info!(
                    "[{}] Resolved roll-call date {} from save type {} via {} ('{}')",
                    slide.terminal(),
                    found.date.format("%Y-%m-%d"),
                    found.source_save_type,
                    found.save_type,
                    found.spelling
                ),
                None => log::info!("[{}] No roll-call date resolved", slide.terminal()),
            }
        }
        Ok(resolution)
    }
}

/// Mutable bookkeeping for one `resolve` call.
struct ResolveState {
    extractor: DateExtractor,
    best: BestDate,
    unmatched: Vec<String>,
    rejected: Vec<String>,
}

impl ResolveState {
    fn new(reference: DateTime<Utc>) -> Self {
        Self {
            extractor: DateExtractor::new(),
            best: BestDate::new(reference),
            unmatched: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Extract from `text`, which is `source` (slide `index`) or a refined
    /// copy of it.
    fn attempt(
        &mut self,
        index: usize,
        source: &Slide,
        text: &Slide,
        spelling: &str,
        month: Month,
    ) -> Result<()> {
        match self.extractor.extract(text.plain_text(), spelling, month)? {
            Extraction::Found(date) => {
                self.best.offer(DateCandidate {
                    date,
                    slide_index: index,
                    source_save_type: source.save_type(),
                    save_type: text.save_type(),
                    spelling: spelling.to_string(),
                });
            }
            Extraction::NoMatch { cleaned } => self.unmatched.push(cleaned),
            Extraction::InvalidDate { cleaned, year, day } => {
                log::debug!(
                    "[{}] Rejected day {} of {} {} in save type {}",
                    text.terminal(),
                    day,
                    month.name(),
                    year,
                    text.save_type()
                );
                self.rejected.push(cleaned);
            }
        }
        Ok(())
    }

    fn finish(self) -> Resolution {
        Resolution {
            date: self.best.into_inner(),
            unmatched: self.unmatched,
            rejected: self.rejected,
        }
    }
}
