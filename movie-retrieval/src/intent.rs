use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::contains_year;

/// What the user is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    /// Facts about a single movie
    General,
    /// Other movies sharing a genre with a named one
    SimilarMovies,
    /// Movies released in a given year
    RecommendByYear,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::General => "GENERAL",
            Intent::SimilarMovies => "SIMILAR_MOVIES",
            Intent::RecommendByYear => "RECOMMEND_BY_YEAR",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SIMILAR_KEYWORDS: &[&str] = &["similar", "like", "movies like"];
const RECOMMEND_KEYWORDS: &[&str] = &["recommend", "suggest"];

/// A classification rule sees the original text and its normalized form
type Rule = fn(original: &str, normalized: &str) -> bool;

/// Evaluated top to bottom, first match wins. Anything unmatched is `General`.
const RULES: &[(Rule, Intent)] = &[
    (asks_for_similar, Intent::SimilarMovies),
    (asks_for_year, Intent::RecommendByYear),
];

fn asks_for_similar(_original: &str, normalized: &str) -> bool {
    SIMILAR_KEYWORDS.iter().any(|k| normalized.contains(k))
}

fn asks_for_year(original: &str, normalized: &str) -> bool {
    contains_year(original) && RECOMMEND_KEYWORDS.iter().any(|k| normalized.contains(k))
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Map free text onto an [`Intent`] using the keyword rules above
pub fn classify(text: &str) -> Intent {
    let normalized = normalize(text);
    RULES
        .iter()
        .find(|(rule, _)| rule(text, &normalized))
        .map(|(_, intent)| *intent)
        .unwrap_or(Intent::General)
}
