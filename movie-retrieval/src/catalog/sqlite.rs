use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use super::{CatalogStore, Movie, MovieId, MovieInfo, similarity_genres, split_genres};
use crate::error::CatalogError;

type MovieRow = (MovieId, String, Option<i32>, String);

const MOVIE_COLUMNS: &str = "movie_id, title, year, genres";

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS movies (
        movie_id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        year INTEGER,
        genres TEXT NOT NULL DEFAULT ''
    )"#,
    r#"CREATE TABLE IF NOT EXISTS ratings (
        user_id INTEGER NOT NULL,
        movie_id INTEGER NOT NULL,
        rating REAL NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS tags (
        user_id INTEGER NOT NULL,
        movie_id INTEGER NOT NULL,
        tag TEXT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_movies_year ON movies (year)",
    "CREATE INDEX IF NOT EXISTS idx_ratings_movie ON ratings (movie_id)",
    "CREATE INDEX IF NOT EXISTS idx_tags_movie ON tags (movie_id)",
];

fn into_movie((id, title, year, genres): MovieRow) -> Movie {
    Movie {
        id,
        title,
        year,
        genres: split_genres(&genres),
    }
}

/// Escape `LIKE` wildcards so user text matches literally (used with `ESCAPE '\'`)
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// SQLite-backed movie catalog
#[derive(Clone)]
pub struct SqliteCatalog {
    pub(super) pool: SqlitePool,
}

impl SqliteCatalog {
    /// Connect to `database_url` (e.g. `sqlite:movies.db?mode=rwc`) and create missing tables
    pub async fn connect(database_url: &str) -> Result<Self, CatalogError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Self::from_pool(pool).await
    }

    /// A private in-memory database. Limited to one connection so every query sees the
    /// same database.
    pub async fn in_memory() -> Result<Self, CatalogError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, CatalogError> {
        let catalog = Self { pool };
        catalog.create_tables().await?;
        Ok(catalog)
    }

    async fn create_tables(&self) -> Result<(), CatalogError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn fetch_movie(&self, id: MovieId) -> Result<Option<Movie>, CatalogError> {
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE movie_id = ?");
        let row = sqlx::query_as::<_, MovieRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(into_movie))
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn find_id_by_title_substring(
        &self,
        text: &str,
    ) -> Result<Option<MovieId>, CatalogError> {
        let id = sqlx::query_scalar::<_, MovieId>(
            r#"SELECT movie_id FROM movies
               WHERE title LIKE ? ESCAPE '\'
               ORDER BY LOWER(title) = LOWER(?) DESC, LENGTH(title) ASC, movie_id ASC
               LIMIT 1"#,
        )
        .bind(format!("%{}%", escape_like(text)))
        .bind(text)
        .fetch_optional(&self.pool)
        .await?;

        debug!(title = %text, movie_id = ?id, "Resolved title");
        Ok(id)
    }

    async fn get_full_info(&self, id: MovieId) -> Result<Option<MovieInfo>, CatalogError> {
        let Some(movie) = self.fetch_movie(id).await? else {
            return Ok(None);
        };

        let tags = sqlx::query_scalar::<_, String>(
            "SELECT tag FROM tags WHERE movie_id = ? GROUP BY tag ORDER BY MIN(rowid)",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(MovieInfo { movie, tags }))
    }

    async fn get_same_genre(&self, id: MovieId) -> Result<Vec<Movie>, CatalogError> {
        let Some(source) = self.fetch_movie(id).await? else {
            return Ok(Vec::new());
        };
        let genres = similarity_genres(&source.genres);
        if genres.is_empty() {
            debug!(movie_id = id, "Source movie has no usable genres");
            return Ok(Vec::new());
        }

        let clauses = vec![r"genres LIKE ? ESCAPE '\'"; genres.len()].join(" OR ");
        let sql = format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE ({clauses}) AND movie_id != ? ORDER BY movie_id"
        );
        let mut query = sqlx::query_as::<_, MovieRow>(&sql);
        for genre in &genres {
            query = query.bind(format!("%{}%", escape_like(genre)));
        }
        let rows = query.bind(id).fetch_all(&self.pool).await?;

        debug!(movie_id = id, genres = ?genres, matches = rows.len(), "Same genre lookup");
        Ok(rows.into_iter().map(into_movie).collect())
    }

    async fn get_by_year(&self, year: i32) -> Result<Vec<Movie>, CatalogError> {
        let sql =
            format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE year = ? ORDER BY title, movie_id");
        let rows = sqlx::query_as::<_, MovieRow>(&sql)
            .bind(year)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(into_movie).collect())
    }

    async fn get_by_min_rating(&self, min_rating: f64) -> Result<Vec<Movie>, CatalogError> {
        let rows = sqlx::query_as::<_, MovieRow>(
            r#"SELECT m.movie_id, m.title, m.year, m.genres
               FROM movies m
               JOIN ratings r ON m.movie_id = r.movie_id
               WHERE r.rating >= ?
               GROUP BY m.movie_id
               ORDER BY AVG(r.rating) DESC, m.movie_id ASC"#,
        )
        .bind(min_rating)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_movie).collect())
    }
}
