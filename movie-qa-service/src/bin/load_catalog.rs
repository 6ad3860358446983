use std::path::PathBuf;

use clap::Parser;
use movie_qa_service::{config::DEFAULT_CATALOG_URL, logging::init_tracing};
use movie_retrieval::{LoadMode, SqliteCatalog};
use tracing::info;

/// Load MovieLens CSV files (movies.csv, ratings.csv, tags.csv) into the movie catalog
#[derive(Parser, Debug)]
#[command(name = "load-catalog", version)]
struct Args {
    /// Directory holding movies.csv, ratings.csv and tags.csv
    #[arg(long, env = "MOVIE_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// SQLite URL of the catalog database
    #[arg(long, env = "CATALOG_DATABASE_URL", default_value = DEFAULT_CATALOG_URL)]
    database_url: String,

    /// Keep existing rows instead of replacing them
    #[arg(long)]
    append: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let mode = if args.append {
        LoadMode::Append
    } else {
        LoadMode::Replace
    };

    let catalog = SqliteCatalog::connect(&args.database_url).await?;
    let report = catalog.load_data(&args.data_dir, mode).await?;

    info!(
        movies = report.movies,
        ratings = report.ratings,
        tags = report.tags,
        database_url = %args.database_url,
        "Catalog ready"
    );
    Ok(())
}
