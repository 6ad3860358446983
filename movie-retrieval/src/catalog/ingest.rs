use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::info;

use super::{MovieId, SqliteCatalog};
use crate::error::CatalogError;

static TITLE_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d{4})\)\s*$").expect("valid title year regex"));

/// Whether a load replaces the catalog contents or adds to them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    #[default]
    Replace,
    Append,
}

/// Row counts inserted by [`SqliteCatalog::load_data`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub movies: usize,
    pub ratings: usize,
    pub tags: usize,
}

#[derive(Debug, Deserialize)]
struct MovieRecord {
    #[serde(rename = "movieId")]
    movie_id: MovieId,
    title: String,
    genres: String,
}

#[derive(Debug, Deserialize)]
struct RatingRecord {
    #[serde(rename = "userId")]
    user_id: i64,
    #[serde(rename = "movieId")]
    movie_id: MovieId,
    rating: f64,
}

#[derive(Debug, Deserialize)]
struct TagRecord {
    #[serde(rename = "userId")]
    user_id: i64,
    #[serde(rename = "movieId")]
    movie_id: MovieId,
    tag: String,
}

struct ParsedData {
    movies: Vec<(MovieId, String, Option<i32>, String)>,
    ratings: Vec<RatingRecord>,
    tags: Vec<TagRecord>,
}

/// Split `"Heat (1995)"` into `("Heat", Some(1995))`. Titles without a trailing year are
/// returned unchanged.
pub fn split_title_year(raw_title: &str) -> (String, Option<i32>) {
    match TITLE_YEAR_RE.captures(raw_title) {
        Some(caps) => {
            let year = caps[1].parse().ok();
            let start = caps.get(0).map(|m| m.start()).unwrap_or(raw_title.len());
            (raw_title[..start].trim().to_string(), year)
        }
        None => (raw_title.to_string(), None),
    }
}

fn read_csv<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, CatalogError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

/// Path of `name` inside `dir`; a missing file is an I/O error, not a CSV one
fn data_file(dir: &Path, name: &str) -> Result<PathBuf, CatalogError> {
    let path = dir.join(name);
    if !path.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("data file {} does not exist", path.display()),
        )
        .into());
    }
    Ok(path)
}

fn parse_data_dir(dir: &Path) -> Result<ParsedData, CatalogError> {
    let movies = read_csv::<MovieRecord>(&data_file(dir, "movies.csv")?)?
        .into_iter()
        .map(|record| {
            let (title, year) = split_title_year(&record.title);
            (record.movie_id, title, year, record.genres)
        })
        .collect();
    let ratings = read_csv(&data_file(dir, "ratings.csv")?)?;
    let tags = read_csv(&data_file(dir, "tags.csv")?)?;
    Ok(ParsedData {
        movies,
        ratings,
        tags,
    })
}

impl SqliteCatalog {
    /// Load `movies.csv`, `ratings.csv` and `tags.csv` from `data_dir` in one transaction.
    pub async fn load_data(
        &self,
        data_dir: impl AsRef<Path>,
        mode: LoadMode,
    ) -> Result<LoadReport, CatalogError> {
        let dir: PathBuf = data_dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("data directory {} does not exist", dir.display()),
            )
            .into());
        }

        info!(data_dir = %dir.display(), ?mode, "Loading catalog data");

        // CSV parsing is blocking work, keep it off the async workers
        let data = tokio::task::spawn_blocking(move || parse_data_dir(&dir))
            .await
            .map_err(io::Error::other)??;

        let mut tx = self.pool.begin().await?;
        if mode == LoadMode::Replace {
            for table in ["movies", "ratings", "tags"] {
                sqlx::query(&format!("DELETE FROM {table}"))
                    .execute(&mut *tx)
                    .await?;
            }
        }

        for (id, title, year, genres) in &data.movies {
            sqlx::query("INSERT INTO movies (movie_id, title, year, genres) VALUES (?, ?, ?, ?)")
                .bind(id)
                .bind(title)
                .bind(year)
                .bind(genres)
                .execute(&mut *tx)
                .await?;
        }
        for rating in &data.ratings {
            sqlx::query("INSERT INTO ratings (user_id, movie_id, rating) VALUES (?, ?, ?)")
                .bind(rating.user_id)
                .bind(rating.movie_id)
                .bind(rating.rating)
                .execute(&mut *tx)
                .await?;
        }
        for tag in &data.tags {
            sqlx::query("INSERT INTO tags (user_id, movie_id, tag) VALUES (?, ?, ?)")
                .bind(tag.user_id)
                .bind(tag.movie_id)
                .bind(&tag.tag)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        let report = LoadReport {
            movies: data.movies.len(),
            ratings: data.ratings.len(),
            tags: data.tags.len(),
        };
        info!(
            movies = report.movies,
            ratings = report.ratings,
            tags = report.tags,
            "Catalog data loaded"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogStore;
    use std::fs;

    const MOVIES_CSV: &str = "movieId,title,genres\n\
        1,Toy Story (1995),Adventure|Animation|Children|Comedy|Fantasy\n\
        2,\"American President, The (1995)\",Comedy|Drama|Romance\n\
        3,Untitled Project,(no genres listed)\n";
    const RATINGS_CSV: &str = "userId,movieId,rating,timestamp\n\
        1,1,4.0,964982703\n\
        2,1,5.0,964982931\n\
        1,2,3.5,964983815\n";
    const TAGS_CSV: &str = "userId,movieId,tag,timestamp\n\
        2,1,pixar,1445714994\n\
        3,1,pixar,1445714996\n\
        3,1,fun,1445715000\n";

    fn data_dir_with(movies: &str, ratings: &str, tags: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("movies.csv"), movies).unwrap();
        fs::write(dir.path().join("ratings.csv"), ratings).unwrap();
        fs::write(dir.path().join("tags.csv"), tags).unwrap();
        dir
    }

    fn write_data_dir() -> tempfile::TempDir {
        data_dir_with(MOVIES_CSV, RATINGS_CSV, TAGS_CSV)
    }

    #[test]
    fn title_year_is_split_off() {
        assert_eq!(split_title_year("Heat (1995)"), ("Heat".to_string(), Some(1995)));
        assert_eq!(
            split_title_year("Postman, The (Postino, Il) (1994) "),
            ("Postman, The (Postino, Il)".to_string(), Some(1994))
        );
        assert_eq!(split_title_year("Babylon 5"), ("Babylon 5".to_string(), None));
        assert_eq!(split_title_year("(1995) Heat"), ("(1995) Heat".to_string(), None));
    }

    #[tokio::test]
    async fn loads_movielens_files() {
        let dir = write_data_dir();
        let catalog = SqliteCatalog::in_memory().await.unwrap();

        let report = catalog.load_data(dir.path(), LoadMode::Replace).await.unwrap();
        assert_eq!(
            report,
            LoadReport {
                movies: 3,
                ratings: 3,
                tags: 3
            }
        );

        let info = catalog.get_full_info(1).await.unwrap().unwrap();
        assert_eq!(info.movie.title, "Toy Story");
        assert_eq!(info.movie.year, Some(1995));
        assert_eq!(info.tags, vec!["pixar", "fun"]);

        let untitled = catalog.get_full_info(3).await.unwrap().unwrap();
        assert_eq!(untitled.movie.year, None);

        let by_year = catalog.get_by_year(1995).await.unwrap();
        assert_eq!(by_year[0].title, "American President, The");
    }

    #[tokio::test]
    async fn replace_clears_previous_load() {
        let dir = write_data_dir();
        let catalog = SqliteCatalog::in_memory().await.unwrap();

        catalog.load_data(dir.path(), LoadMode::Replace).await.unwrap();
        catalog.load_data(dir.path(), LoadMode::Replace).await.unwrap();
        assert_eq!(catalog.get_by_min_rating(0.0).await.unwrap().len(), 2);
        assert_eq!(catalog.get_full_info(1).await.unwrap().unwrap().tags.len(), 2);
    }

    #[tokio::test]
    async fn append_keeps_existing_rows() {
        let first = data_dir_with(
            "movieId,title,genres\n1,Heat (1995),Action\n",
            "userId,movieId,rating\n1,1,4.0\n",
            "userId,movieId,tag\n",
        );
        let second = data_dir_with(
            "movieId,title,genres\n2,Casino (1995),Crime\n",
            "userId,movieId,rating\n1,2,4.5\n",
            "userId,movieId,tag\n1,2,vegas\n",
        );

        let catalog = SqliteCatalog::in_memory().await.unwrap();
        catalog.load_data(first.path(), LoadMode::Replace).await.unwrap();
        let report = catalog.load_data(second.path(), LoadMode::Append).await.unwrap();
        assert_eq!(report.movies, 1);

        let titles: Vec<String> = catalog
            .get_by_year(1995)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["Casino", "Heat"]);
        assert_eq!(catalog.get_by_min_rating(0.0).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn conflicting_append_rolls_back() {
        let dir = write_data_dir();
        let catalog = SqliteCatalog::in_memory().await.unwrap();
        catalog.load_data(dir.path(), LoadMode::Replace).await.unwrap();

        // movie ids are primary keys, so appending the same movies fails
        let err = catalog.load_data(dir.path(), LoadMode::Append).await;
        assert!(matches!(err, Err(CatalogError::Database(_))));
        assert_eq!(catalog.get_by_year(1995).await.unwrap().len(), 2);
        assert_eq!(catalog.get_full_info(1).await.unwrap().unwrap().tags.len(), 2);
    }

    #[tokio::test]
    async fn missing_directory_is_an_io_error() {
        let catalog = SqliteCatalog::in_memory().await.unwrap();
        let err = catalog
            .load_data("/definitely/not/here", LoadMode::Replace)
            .await;
        assert!(matches!(err, Err(CatalogError::Io(_))));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = write_data_dir();
        fs::remove_file(dir.path().join("tags.csv")).unwrap();
        let catalog = SqliteCatalog::in_memory().await.unwrap();
        let err = catalog.load_data(dir.path(), LoadMode::Replace).await;
        assert!(matches!(err, Err(CatalogError::Io(e)) if e.kind() == io::ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn malformed_rows_fail_the_load() {
        let dir = write_data_dir();
        fs::write(
            dir.path().join("ratings.csv"),
            "userId,movieId,rating\n1,1,great\n",
        )
        .unwrap();
        let catalog = SqliteCatalog::in_memory().await.unwrap();
        let err = catalog.load_data(dir.path(), LoadMode::Replace).await;
        assert!(matches!(err, Err(CatalogError::Csv(_))));
    }
}
