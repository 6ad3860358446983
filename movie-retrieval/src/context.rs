use serde::{Deserialize, Serialize};

use crate::catalog::{Movie, MovieInfo};
use crate::intent::Intent;

/// Retrieved catalog data for one query, shaped by the intent that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetrievalContext {
    General {
        movie: String,
        /// `None` when no catalog title matched the extracted name
        info: Option<MovieInfo>,
    },
    SimilarMovies {
        movie: String,
        similar_movies: Vec<Movie>,
    },
    RecommendByYear {
        year: i32,
        movies_by_year: Vec<Movie>,
    },
}

impl RetrievalContext {
    pub fn intent(&self) -> Intent {
        match self {
            RetrievalContext::General { .. } => Intent::General,
            RetrievalContext::SimilarMovies { .. } => Intent::SimilarMovies,
            RetrievalContext::RecommendByYear { .. } => Intent::RecommendByYear,
        }
    }

    /// Whether the catalog returned nothing for this query
    pub fn is_empty(&self) -> bool {
        match self {
            RetrievalContext::General { info, .. } => info.is_none(),
            RetrievalContext::SimilarMovies { similar_movies, .. } => similar_movies.is_empty(),
            RetrievalContext::RecommendByYear { movies_by_year, .. } => movies_by_year.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialized_context_carries_intent_tag() {
        let ctx = RetrievalContext::RecommendByYear {
            year: 1999,
            movies_by_year: vec![],
        };
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(
            value,
            json!({ "intent": "RECOMMEND_BY_YEAR", "year": 1999, "movies_by_year": [] })
        );
        assert_eq!(ctx.intent(), Intent::RecommendByYear);
        assert!(ctx.is_empty());
    }

    #[test]
    fn general_without_match_is_empty() {
        let ctx = RetrievalContext::General {
            movie: "Nope".to_string(),
            info: None,
        };
        assert_eq!(ctx.intent(), Intent::General);
        assert!(ctx.is_empty());
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["intent"], "GENERAL");
        assert_eq!(value["info"], serde_json::Value::Null);
    }
}
