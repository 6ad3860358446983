use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::{CatalogStore, MovieId};
use crate::context::RetrievalContext;
use crate::entity::{extract_movie_name, extract_year};
use crate::error::{EntityKind, Result, RetrievalError};
use crate::intent::{Intent, classify};

/// Turns a free-text movie question into an intent-tagged [`RetrievalContext`].
///
/// Holds no mutable state, so one instance can serve any number of concurrent requests as
/// long as the catalog's read path is safe to share.
#[derive(Clone)]
pub struct Retrieval {
    catalog: Arc<dyn CatalogStore>,
}

impl Retrieval {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogStore> {
        &self.catalog
    }

    /// Classify `query`, extract the entity its intent needs and query the catalog.
    ///
    /// Fails with [`RetrievalError::MissingEntity`] when the entity is absent. A catalog that
    /// simply has no matching rows is not an error; the context comes back empty.
    pub async fn process(&self, query: &str) -> Result<RetrievalContext> {
        let intent = classify(query);
        info!(%intent, "Classified query");

        let context = match intent {
            Intent::General => self.general(query).await?,
            Intent::SimilarMovies => self.similar_movies(query).await?,
            Intent::RecommendByYear => self.recommend_by_year(query).await?,
        };

        if context.is_empty() {
            info!(%intent, "Catalog returned no data for query");
        }
        Ok(context)
    }

    async fn resolve_movie(&self, query: &str) -> Result<(String, Option<MovieId>)> {
        let movie = extract_movie_name(query);
        if movie.is_empty() {
            return Err(RetrievalError::MissingEntity(EntityKind::MovieName));
        }
        let movie_id = self.catalog.find_id_by_title_substring(&movie).await?;
        debug!(movie = %movie, movie_id = ?movie_id, "Resolved movie name");
        Ok((movie, movie_id))
    }

    async fn general(&self, query: &str) -> Result<RetrievalContext> {
        let (movie, movie_id) = self.resolve_movie(query).await?;
        let info = match movie_id {
            Some(id) => self.catalog.get_full_info(id).await?,
            None => None,
        };
        Ok(RetrievalContext::General { movie, info })
    }

    async fn similar_movies(&self, query: &str) -> Result<RetrievalContext> {
        let (movie, movie_id) = self.resolve_movie(query).await?;
        let similar_movies = match movie_id {
            Some(id) => self.catalog.get_same_genre(id).await?,
            None => Vec::new(),
        };
        info!(movie = %movie, count = similar_movies.len(), "Found similar movies");
        Ok(RetrievalContext::SimilarMovies {
            movie,
            similar_movies,
        })
    }

    async fn recommend_by_year(&self, query: &str) -> Result<RetrievalContext> {
        let year = extract_year(query).ok_or(RetrievalError::MissingEntity(EntityKind::Year))?;
        let movies_by_year = self.catalog.get_by_year(year).await?;
        info!(year, count = movies_by_year.len(), "Found movies by year");
        Ok(RetrievalContext::RecommendByYear {
            year,
            movies_by_year,
        })
    }
}
