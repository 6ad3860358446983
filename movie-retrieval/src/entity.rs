//! Entity extraction from raw query text.
//!
//! Both extractors work on the original, non-normalized query. Movie names are found with a
//! capitalized-token heuristic rather than a real entity linker, so any capitalized word can
//! be picked up. Callers only depend on [`extract_movie_name`] and [`extract_year`].

use std::sync::LazyLock;

use regex::Regex;

static CAPITALIZED_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][\w'’-]*").expect("valid capitalized token regex"));

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"));

const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?'];

/// True when the capitalized token starting at `start` opens a sentence.
fn is_sentence_initial(text: &str, start: usize) -> bool {
    match text[..start].trim_end().chars().last() {
        None => true,
        Some(c) => SENTENCE_TERMINATORS.contains(&c),
    }
}

fn is_first_person(token: &str) -> bool {
    token == "I" || token.starts_with("I'") || token.starts_with("I’")
}

/// Pull a candidate movie title out of the query, or an empty string if there is none.
///
/// Prefers the first capitalized token that is neither sentence-initial nor the pronoun
/// "I". When every candidate is one of those, the first capitalized token is returned.
pub fn extract_movie_name(text: &str) -> String {
    let mut fallback = None;
    for m in CAPITALIZED_TOKEN_RE.find_iter(text) {
        let token = m.as_str();
        if !is_sentence_initial(text, m.start()) && !is_first_person(token) {
            return token.to_string();
        }
        fallback.get_or_insert(token);
    }
    fallback.map(str::to_string).unwrap_or_default()
}

/// First standalone `19xx`/`20xx` token in the query.
pub fn extract_year(text: &str) -> Option<i32> {
    YEAR_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

pub(crate) fn contains_year(text: &str) -> bool {
    YEAR_RE.is_match(text)
}
