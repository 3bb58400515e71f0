//! Date extraction from OCR text around a month spelling.
//!
//! Flight boards print dates as `14 JAN 2024` or `JAN 14, 2024`, and OCR
//! sprinkles stray dots, commas and spaces through them. Text is cleaned of
//! those characters and matched against two patterns built around the month
//! spelling; the first pattern that matches decides.

use crate::error::{Error, Result};
use chrono::{DateTime, Month, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Characters removed from OCR text before matching.
const OCR_NOISE_CHARS: &[char] = &['.', ',', ' '];

/// Outcome of one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A complete date was matched.
    Found(DateTime<Utc>),

    /// Neither pattern matched the cleaned text.
    NoMatch { cleaned: String },

    /// A pattern matched, but the numbers do not form a calendar date.
    InvalidDate {
        cleaned: String,
        year: i32,
        day: u32,
    },
}

/// The day-month-year and month-day-year patterns for one spelling.
#[derive(Debug, Clone)]
struct MonthPatterns {
    day_month_year: Regex,
    month_day_year: Regex,
}

impl MonthPatterns {
    fn compile(spelling: &str) -> Result<Self> {
        let escaped = regex::escape(spelling);
        let day_month_year = Regex::new(&format!(
            "([0-9]{{1,2}})[a-z]{{0,3}}{}([0-9]{{2,4}})",
            escaped
        ))
        .map_err(|e| Error::MalformedInput(format!("Bad date pattern for '{}': {}", spelling, e)))?;
        let month_day_year = Regex::new(&format!(
            "{}([0-9]{{2}})[a-z]{{0,3}}([0-9]{{4}})",
            escaped
        ))
        .map_err(|e| Error::MalformedInput(format!("Bad date pattern for '{}': {}", spelling, e)))?;

        Ok(Self {
            day_month_year,
            month_day_year,
        })
    }

    /// Captured (day, year) digits from the first pattern that matches.
    fn captures<'t>(&self, cleaned: &'t str) -> Option<(&'t str, &'t str)> {
        [&self.day_month_year, &self.month_day_year]
            .into_iter()
            .find_map(|pattern| {
                let caps = pattern.captures(cleaned)?;
                Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
            })
    }
}

/// Extracts dates, compiling each spelling's patterns only once.
#[derive(Debug, Default)]
pub struct DateExtractor {
    patterns: HashMap<String, MonthPatterns>,
}

impl DateExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract a date for `month` from `text`, using `spelling` as the
    /// month's printed form.
    ///
    /// The day and year come from the matched digits; the month is the one
    /// the caller expects. The result is midnight UTC.
    pub fn extract(&mut self, text: &str, spelling: &str, month: Month) -> Result<Extraction> {
        let cleaned = clean_ocr_text(text);
        let spelling = clean_ocr_text(spelling);
        if spelling.is_empty() {
            return Ok(Extraction::NoMatch { cleaned });
        }

        let patterns = match self.patterns.entry(spelling) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let compiled = MonthPatterns::compile(entry.key())?;
                entry.insert(compiled)
            }
        };

        let Some((day_digits, year_digits)) = patterns.captures(&cleaned) else {
            return Ok(Extraction::NoMatch { cleaned });
        };

        let day: u32 = day_digits
            .parse()
            .map_err(|e| Error::MalformedInput(format!("Day '{}': {}", day_digits, e)))?;
        let year: i32 = year_digits
            .parse()
            .map_err(|e| Error::MalformedInput(format!("Year '{}': {}", year_digits, e)))?;

        match NaiveDate::from_ymd_opt(year, month.number_from_month(), day) {
            Some(date) => Ok(Extraction::Found(
                Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)),
            )),
            None => Ok(Extraction::InvalidDate { cleaned, year, day }),
        }
    }

    /// Number of spellings with compiled patterns.
    pub fn cached_spellings(&self) -> usize {
        self.patterns.len()
    }
}

/// Lowercase and strip the dots, commas and spaces OCR tends to insert.
pub fn clean_ocr_text(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| !OCR_NOISE_CHARS.contains(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_clean_ocr_text() {
        assert_eq!(clean_ocr_text("14 JAN. 2024, Gate"), "14jan2024gate");
        assert_eq!(clean_ocr_text("Roll\nCall"), "roll\ncall");
    }

    #[test]
    fn test_day_month_year() {
        let mut extractor = DateExtractor::new();
        let result = extractor
            .extract("14jan2024 flight info", "jan", Month::January)
            .unwrap();
        assert_eq!(result, Extraction::Found(utc(2024, 1, 14)));
    }

    #[test]
    fn test_day_month_year_with_ocr_noise() {
        let mut extractor = DateExtractor::new();
        let result = extractor
            .extract("ROLL CALL 3 rd. JANUARY, 2024", "January", Month::January)
            .unwrap();
        assert_eq!(result, Extraction::Found(utc(2024, 1, 3)));
    }

    #[test]
    fn test_month_day_year() {
        let mut extractor = DateExtractor::new();
        let result = extractor.extract("jan142024", "jan", Month::January).unwrap();
        assert_eq!(result, Extraction::Found(utc(2024, 1, 14)));
    }

    #[test]
    fn test_month_day_year_with_ordinal_suffix() {
        let mut extractor = DateExtractor::new();
        let result = extractor
            .extract("FEB 02nd, 2025", "feb", Month::February)
            .unwrap();
        assert_eq!(result, Extraction::Found(utc(2025, 2, 2)));
    }

    #[test]
    fn test_day_month_year_wins_over_month_day_year() {
        // Both shapes are present; the day-month-year reading must be used.
        let mut extractor = DateExtractor::new();
        let result = extractor
            .extract("05mar2024 mar 20 2025", "mar", Month::March)
            .unwrap();
        assert_eq!(result, Extraction::Found(utc(2024, 3, 5)));
    }

    #[test]
    fn test_month_comes_from_caller() {
        let mut extractor = DateExtractor::new();
        let result = extractor
            .extract("14 januarv 2024", "januarv", Month::January)
            .unwrap();
        assert_eq!(result, Extraction::Found(utc(2024, 1, 14)));
    }

    #[test]
    fn test_two_digit_year_is_kept_as_is() {
        let mut extractor = DateExtractor::new();
        let result = extractor.extract("9 jun 24", "jun", Month::June).unwrap();
        assert_eq!(result, Extraction::Found(utc(24, 6, 9)));
    }

    #[test]
    fn test_no_match_keeps_cleaned_input() {
        let mut extractor = DateExtractor::new();
        let result = extractor
            .extract("Seats: 12 T, Dest. Ramstein", "jan", Month::January)
            .unwrap();
        assert_eq!(
            result,
            Extraction::NoMatch {
                cleaned: "seats:12tdestramstein".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_calendar_date_is_reported() {
        let mut extractor = DateExtractor::new();
        let result = extractor.extract("31 feb 2024", "feb", Month::February).unwrap();
        assert_eq!(
            result,
            Extraction::InvalidDate {
                cleaned: "31feb2024".to_string(),
                year: 2024,
                day: 31,
            }
        );
    }

    #[test]
    fn test_spelling_with_regex_metacharacters() {
        let mut extractor = DateExtractor::new();
        let result = extractor.extract("7 ja(n 2024", "ja(n", Month::January).unwrap();
        assert_eq!(result, Extraction::Found(utc(2024, 1, 7)));
    }

    #[test]
    fn test_empty_spelling_never_matches() {
        let mut extractor = DateExtractor::new();
        let result = extractor.extract("14 2024", " . ", Month::January).unwrap();
        assert!(matches!(result, Extraction::NoMatch { .. }));
    }

    #[test]
    fn test_patterns_are_cached_per_spelling() {
        let mut extractor = DateExtractor::new();
        extractor.extract("1 jan 2024", "JAN", Month::January).unwrap();
        extractor.extract("2 jan 2024", "jan", Month::January).unwrap();
        extractor.extract("2 january 2024", "january", Month::January).unwrap();
        assert_eq!(extractor.cached_spellings(), 2);
    }
}
