use std::fmt;

use thiserror::Error;

/// The kind of entity an intent needs from the query text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    MovieName,
    Year,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::MovieName => write!(f, "movie name"),
            EntityKind::Year => write!(f, "year"),
        }
    }
}

/// Failures of the catalog backend
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to read data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Failures surfaced by [`crate::Retrieval::process`]
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The intent needed an entity that could not be found in the query.
    #[error("No {0} found in input")]
    MissingEntity(EntityKind),

    #[error("Catalog lookup failed: {0}")]
    Catalog(#[from] CatalogError),
}

impl RetrievalError {
    pub fn is_missing_entity(&self) -> bool {
        matches!(self, RetrievalError::MissingEntity(_))
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
