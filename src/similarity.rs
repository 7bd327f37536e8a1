// Pluggable string-similarity scoring
// All methods return a score in [0, 1] where 1 means the strings are equal.
// The matching engine passes the configured method through verbatim.

use serde::{Deserialize, Serialize};
use strsim::{
    jaro, normalized_damerau_levenshtein, normalized_levenshtein, sorensen_dice,
};

/// Default Jaro-Winkler prefix scaling factor.
pub const DEFAULT_PREFIX_WEIGHT: f64 = 0.1;

/// Default maximum common-prefix length rewarded by Jaro-Winkler.
pub const DEFAULT_MAX_PREFIX: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimilarityMethod {
    /// Jaro similarity boosted for a shared prefix. The default.
    JaroWinkler { prefix_weight: f64, max_prefix: usize },
    Jaro,
    Levenshtein,
    DamerauLevenshtein,
    SorensenDice,
}

impl Default for SimilarityMethod {
    fn default() -> Self {
        SimilarityMethod::JaroWinkler {
            prefix_weight: DEFAULT_PREFIX_WEIGHT,
            max_prefix: DEFAULT_MAX_PREFIX,
        }
    }
}

impl SimilarityMethod {
    pub fn name(&self) -> &'static str {
        match self {
            SimilarityMethod::JaroWinkler { .. } => "jaro_winkler",
            SimilarityMethod::Jaro => "jaro",
            SimilarityMethod::Levenshtein => "levenshtein",
            SimilarityMethod::DamerauLevenshtein => "damerau_levenshtein",
            SimilarityMethod::SorensenDice => "sorensen_dice",
        }
    }

    /// Score two strings in [0, 1].
    pub fn score(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }
        match self {
            SimilarityMethod::JaroWinkler {
                prefix_weight,
                max_prefix,
            } => jaro_winkler_weighted(a, b, *prefix_weight, *max_prefix),
            SimilarityMethod::Jaro => jaro(a, b),
            SimilarityMethod::Levenshtein => normalized_levenshtein(a, b),
            SimilarityMethod::DamerauLevenshtein => normalized_damerau_levenshtein(a, b),
            SimilarityMethod::SorensenDice => sorensen_dice(a, b),
        }
    }
}

/// Jaro-Winkler with a configurable prefix weight. `strsim` hard-codes the
/// canonical 0.1 weight, so the boost is applied on top of plain Jaro here.
fn jaro_winkler_weighted(a: &str, b: &str, prefix_weight: f64, max_prefix: usize) -> f64 {
    let base = jaro(a, b);
    let prefix_len = a
        .chars()
        .zip(b.chars())
        .take(max_prefix)
        .take_while(|(x, y)| x == y)
        .count();
    (base + prefix_len as f64 * prefix_weight * (1.0 - base)).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings_score_one() {
        for method in [
            SimilarityMethod::default(),
            SimilarityMethod::Jaro,
            SimilarityMethod::Levenshtein,
            SimilarityMethod::DamerauLevenshtein,
            SimilarityMethod::SorensenDice,
        ] {
            assert_eq!(method.score("acme widgets", "acme widgets"), 1.0);
        }
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let method = SimilarityMethod::JaroWinkler {
            prefix_weight: 0.25,
            max_prefix: 8,
        };
        let score = method.score("alpha energy", "alpha engines");
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn test_prefix_weight_raises_score() {
        let plain = SimilarityMethod::Jaro.score("martha", "marhta");
        let boosted = SimilarityMethod::default().score("martha", "marhta");
        assert!(boosted > plain);
    }

    #[test]
    fn test_methods_disagree_on_nontrivial_pairs() {
        let a = "pacific rim steel";
        let b = "rim steel pacific";
        let jw = SimilarityMethod::default().score(a, b);
        let dice = SimilarityMethod::SorensenDice.score(a, b);
        assert_ne!(jw, dice);
    }

    #[test]
    fn test_dissimilar_strings_score_low() {
        let score = SimilarityMethod::default().score("acme widgets", "zzz unrelated");
        assert!(score < 0.8);
    }
}
