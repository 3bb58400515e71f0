//! Approximate keyword matching.
//!
//! Each keyword gets its own [`FuzzyModel`], a symmetric-delete index in the
//! style of SymSpell: every word is stored under all of its delete variants up
//! to `depth`, and a token is looked up through its own delete variants.
//! Candidates are then confirmed with a real Levenshtein distance.

use crate::error::{Error, Result};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

/// Minimum training count for a word to be suggested.
pub const DEFAULT_THRESHOLD: usize = 1;

/// Maximum edit distance searched for suggestions.
pub const DEFAULT_DEPTH: usize = 5;

/// Levenshtein distance between two strings, counted in characters.
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// A spelling-suggestion model trained on a small vocabulary.
#[derive(Debug, Clone)]
pub struct FuzzyModel {
    /// Trained words and how many times each was trained.
    counts: HashMap<String, usize>,
    /// Delete variant -> words it was derived from.
    deletes: HashMap<String, HashSet<String>>,
    threshold: usize,
    depth: usize,
}

impl FuzzyModel {
    /// Create an empty model with the default threshold and depth.
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
            deletes: HashMap::new(),
            threshold: DEFAULT_THRESHOLD,
            depth: DEFAULT_DEPTH,
        }
    }

    /// Set the minimum training count a word needs to be suggested.
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the maximum edit distance searched. Train words after this.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Minimum training count a word needs to be suggested.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Maximum edit distance searched for suggestions.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Add one occurrence of `word` to the model.
    pub fn train_word(&mut self, word: &str) {
        *self.counts.entry(word.to_string()).or_default() += 1;
        for variant in delete_variants(word, self.depth) {
            self.deletes
                .entry(variant)
                .or_default()
                .insert(word.to_string());
        }
    }

    /// Trained words close to `token`, best first.
    ///
    /// Ranked by edit distance, then training count (descending), then
    /// alphabetically so equal candidates always come back in the same order.
    pub fn suggestions(&self, token: &str) -> Vec<String> {
        if token.is_empty() {
            return Vec::new();
        }

        // Levenshtein distance is never below the length difference.
        let token_len = token.chars().count();
        let reachable = self
            .counts
            .keys()
            .any(|word| word.chars().count().abs_diff(token_len) <= self.depth);
        if !reachable {
            return Vec::new();
        }

        let mut candidates: HashSet<&str> = HashSet::new();
        for variant in delete_variants(token, self.depth) {
            if let Some(words) = self.deletes.get(&variant) {
                candidates.extend(words.iter().map(String::as_str));
            }
        }

        let mut ranked: Vec<(usize, usize, &str)> = candidates
            .into_iter()
            .filter_map(|word| {
                let count = self.counts.get(word).copied().unwrap_or(0);
                if count < self.threshold {
                    return None;
                }
                let distance = edit_distance(token, word);
                (distance <= self.depth).then_some((distance, count, word))
            })
            .collect();

        ranked.sort_by_key(|&(distance, count, word)| (distance, Reverse(count), word));
        ranked.into_iter().map(|(_, _, word)| word.to_string()).collect()
    }
}

impl Default for FuzzyModel {
    fn default() -> Self {
        Self::new()
    }
}

/// All strings reachable from `word` by deleting up to `depth` characters,
/// including `word` itself.
fn delete_variants(word: &str, depth: usize) -> HashSet<String> {
    let mut variants = HashSet::new();
    variants.insert(word.to_string());

    let mut frontier = variants.clone();
    for _ in 0..depth {
        let mut next = HashSet::new();
        for variant in &frontier {
            let chars: Vec<char> = variant.chars().collect();
            for skip in 0..chars.len() {
                let shorter: String = chars
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| i != skip)
                    .map(|(_, c)| c)
                    .collect();
                if !variants.contains(&shorter) {
                    next.insert(shorter);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        variants.extend(next.iter().cloned());
        frontier = next;
    }

    variants
}

/// One fuzzy model per keyword of interest.
///
/// Built once from the master keyword list, then shared read-only.
/// Keywords are stored lowercase; lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct FuzzyModelRegistry {
    models: HashMap<String, FuzzyModel>,
}

impl FuzzyModelRegistry {
    /// Train a model with threshold 1 and depth 5 for every keyword.
    pub fn build<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut models = HashMap::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().to_lowercase();
            if keyword.is_empty() || models.contains_key(&keyword) {
                continue;
            }
            let mut model = FuzzyModel::new()
                .with_threshold(DEFAULT_THRESHOLD)
                .with_depth(DEFAULT_DEPTH);
            model.train_word(&keyword);
            models.insert(keyword, model);
        }
        log::debug!("Built fuzzy models for {} keywords", models.len());
        Self { models }
    }

    /// The model trained on `keyword`.
    ///
    /// A missing model means the caller asked for a keyword that was never
    /// part of the master list; that is a programming error, reported as
    /// [`Error::MissingFuzzyModel`] and never recovered from.
    pub fn model(&self, keyword: &str) -> Result<&FuzzyModel> {
        self.models
            .get(&keyword.to_lowercase())
            .ok_or_else(|| Error::MissingFuzzyModel(keyword.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn model_for(word: &str) -> FuzzyModel {
        let mut model = FuzzyModel::new();
        model.train_word(word);
        model
    }

    #[test]
    fn test_exact_word_is_suggested() {
        let model = model_for("january");
        assert_eq!(model.suggestions("january"), vec!["january"]);
    }

    #[test]
    fn test_ocr_misreads_are_suggested() {
        let model = model_for("january");
        assert_eq!(model.suggestions("janvary"), vec!["january"]);
        assert_eq!(model.suggestions("jan0ary"), vec!["january"]);
        assert_eq!(model.suggestions("jauary"), vec!["january"]);
        assert_eq!(model.suggestions("jan"), vec!["january"]);
    }

    #[test]
    fn test_distant_tokens_are_not_suggested() {
        let model = model_for("january");
        assert!(model.suggestions("14jan2024").is_empty());
        assert!(model.suggestions("departure").is_empty());
        assert!(model.suggestions("").is_empty());
    }

    #[test]
    fn test_length_difference_short_circuits() {
        let model = model_for("may");
        assert!(model
            .suggestions("seatsavailableforthisflight")
            .is_empty());
    }

    #[test]
    fn test_depth_limits_distance() {
        let mut model = FuzzyModel::new().with_depth(1);
        model.train_word("march");
        assert_eq!(model.suggestions("marcb"), vec!["march"]);
        assert!(model.suggestions("mrcb").is_empty());
    }

    #[test]
    fn test_threshold_hides_rare_words() {
        let mut model = FuzzyModel::new().with_threshold(2);
        model.train_word("june");
        assert!(model.suggestions("june").is_empty());
        model.train_word("june");
        assert_eq!(model.suggestions("june"), vec!["june"]);
    }

    #[test]
    fn test_ranking_prefers_closer_then_frequent() {
        let mut model = FuzzyModel::new();
        model.train_word("june");
        model.train_word("july");
        model.train_word("july");
        // "juny" is one edit from both; july was trained more often.
        assert_eq!(model.suggestions("juny"), vec!["july", "june"]);
        assert_eq!(model.suggestions("jun"), vec!["june", "july"]);
    }

    #[test]
    fn test_delete_variants_handle_multibyte() {
        let variants = delete_variants("jän", 1);
        assert!(variants.contains("jn"));
        assert!(variants.contains("än"));
        assert_eq!(variants.len(), 4);
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("january", "january"), 0);
        assert_eq!(edit_distance("janvary", "january"), 1);
        assert_eq!(edit_distance("jan", "january"), 4);
    }

    #[test]
    fn test_registry_builds_one_model_per_keyword() {
        let registry = FuzzyModelRegistry::build(["January", "jan", "january", "Feb"]);
        assert_eq!(registry.models.len(), 3);
        assert!(registry.model("JANUARY").is_ok());
        assert!(registry.model("feb").is_ok());

        let model = registry.model("January").unwrap();
        assert_eq!(model.threshold(), 1);
        assert_eq!(model.depth(), 5);
        assert_eq!(model.suggestions("january"), vec!["january"]);
    }

    #[test]
    fn test_registry_missing_model_is_an_error() {
        let registry = FuzzyModelRegistry::build(["march"]);
        let err = registry.model("april").unwrap_err();
        assert!(matches!(err, Error::MissingFuzzyModel(ref k) if k == "april"));
    }
}
