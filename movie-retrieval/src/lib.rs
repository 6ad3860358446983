pub mod catalog;
pub mod context;
pub mod entity;
pub mod error;
pub mod intent;
pub mod retrieval;

// Re-export commonly used types
pub use catalog::{
    CatalogStore, InMemoryCatalog, LoadMode, LoadReport, Movie, MovieId, MovieInfo,
    SqliteCatalog,
};
pub use context::RetrievalContext;
pub use entity::{extract_movie_name, extract_year};
pub use error::{CatalogError, EntityKind, Result, RetrievalError};
pub use intent::{Intent, classify};
pub use retrieval::Retrieval;
