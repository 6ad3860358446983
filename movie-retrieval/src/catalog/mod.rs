mod ingest;
pub(crate) mod memory;
pub(crate) mod sqlite;

pub use ingest::{LoadMode, LoadReport, split_title_year};
pub use memory::InMemoryCatalog;
pub use sqlite::SqliteCatalog;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

pub type MovieId = i64;

/// Placeholder genre used by the source data for movies without genres
pub const NO_GENRES: &str = "(no genres listed)";

/// A catalog movie. The title never includes the release year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub year: Option<i32>,
    pub genres: Vec<String>,
}

/// A movie together with the distinct tags users gave it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieInfo {
    #[serde(flatten)]
    pub movie: Movie,
    pub tags: Vec<String>,
}

/// Read side of the movie catalog used by the retrieval layer
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Case-insensitive substring match on titles. Ties go to an exact title match, then the
    /// shortest title, then the lowest id.
    async fn find_id_by_title_substring(&self, text: &str)
    -> Result<Option<MovieId>, CatalogError>;

    async fn get_full_info(&self, id: MovieId) -> Result<Option<MovieInfo>, CatalogError>;

    /// Movies sharing at least one genre with `id`, excluding `id` itself, ordered by id.
    async fn get_same_genre(&self, id: MovieId) -> Result<Vec<Movie>, CatalogError>;

    /// Movies released in `year`, ordered by title.
    async fn get_by_year(&self, year: i32) -> Result<Vec<Movie>, CatalogError>;

    /// Movies rated at least `min_rating` by someone, best average first.
    async fn get_by_min_rating(&self, min_rating: f64) -> Result<Vec<Movie>, CatalogError>;
}

/// Split a pipe-delimited genre field
pub fn split_genres(field: &str) -> Vec<String> {
    field
        .split('|')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

/// Genres usable for similarity matching: everything but the placeholder
pub(crate) fn similarity_genres(genres: &[String]) -> Vec<&str> {
    genres
        .iter()
        .map(String::as_str)
        .filter(|g| *g != NO_GENRES)
        .collect()
}
