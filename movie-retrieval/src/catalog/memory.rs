use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{CatalogStore, Movie, MovieId, MovieInfo, similarity_genres};
use crate::error::CatalogError;

/// In-memory catalog with the same query semantics as [`super::SqliteCatalog`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    movies: Vec<Movie>,
    ratings: Vec<(MovieId, f64)>,
    tags: Vec<(MovieId, String)>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_movie(mut self, movie: Movie) -> Self {
        self.movies.push(movie);
        self
    }

    pub fn with_rating(mut self, movie_id: MovieId, rating: f64) -> Self {
        self.ratings.push((movie_id, rating));
        self
    }

    pub fn with_tag(mut self, movie_id: MovieId, tag: impl Into<String>) -> Self {
        self.tags.push((movie_id, tag.into()));
        self
    }

    fn movie(&self, id: MovieId) -> Option<&Movie> {
        self.movies.iter().find(|m| m.id == id)
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn find_id_by_title_substring(
        &self,
        text: &str,
    ) -> Result<Option<MovieId>, CatalogError> {
        let needle = text.to_lowercase();
        let best = self
            .movies
            .iter()
            .filter(|m| m.title.to_lowercase().contains(&needle))
            .min_by_key(|m| {
                (
                    m.title.to_lowercase() != needle,
                    m.title.chars().count(),
                    m.id,
                )
            });
        Ok(best.map(|m| m.id))
    }

    async fn get_full_info(&self, id: MovieId) -> Result<Option<MovieInfo>, CatalogError> {
        let Some(movie) = self.movie(id) else {
            return Ok(None);
        };
        let mut tags: Vec<String> = Vec::new();
        for (_, tag) in self.tags.iter().filter(|(movie_id, _)| *movie_id == id) {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        Ok(Some(MovieInfo {
            movie: movie.clone(),
            tags,
        }))
    }

    async fn get_same_genre(&self, id: MovieId) -> Result<Vec<Movie>, CatalogError> {
        let Some(source) = self.movie(id) else {
            return Ok(Vec::new());
        };
        let wanted: Vec<String> = similarity_genres(&source.genres)
            .into_iter()
            .map(str::to_lowercase)
            .collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let mut similar: Vec<Movie> = self
            .movies
            .iter()
            .filter(|m| m.id != id)
            .filter(|m| {
                let field = m.genres.join("|").to_lowercase();
                wanted.iter().any(|g| field.contains(g.as_str()))
            })
            .cloned()
            .collect();
        similar.sort_by_key(|m| m.id);
        Ok(similar)
    }

    async fn get_by_year(&self, year: i32) -> Result<Vec<Movie>, CatalogError> {
        let mut movies: Vec<Movie> = self
            .movies
            .iter()
            .filter(|m| m.year == Some(year))
            .cloned()
            .collect();
        movies.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(movies)
    }

    async fn get_by_min_rating(&self, min_rating: f64) -> Result<Vec<Movie>, CatalogError> {
        let mut sums: BTreeMap<MovieId, (f64, u32)> = BTreeMap::new();
        for (movie_id, rating) in self.ratings.iter().filter(|(_, r)| *r >= min_rating) {
            let entry = sums.entry(*movie_id).or_insert((0.0, 0));
            entry.0 += rating;
            entry.1 += 1;
        }

        let mut ranked: Vec<(f64, &Movie)> = sums
            .into_iter()
            .filter_map(|(id, (sum, n))| self.movie(id).map(|m| (sum / n as f64, m)))
            .collect();
        ranked.sort_by(|(a_avg, a), (b_avg, b)| {
            b_avg
                .partial_cmp(a_avg)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        Ok(ranked.into_iter().map(|(_, m)| m.clone()).collect())
    }
}
