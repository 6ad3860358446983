use std::sync::Arc;

use movie_qa_service::{
    AppState, MovieAssistant, OpenRouterGenerator, ServiceConfig, create_app,
    logging::init_tracing,
};
use movie_retrieval::{Retrieval, SqliteCatalog};
use tokio::net::TcpListener;
use tracing::{error, info};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    info!(?config, "Starting movie Q&A service");

    let catalog = SqliteCatalog::connect(&config.catalog_database_url).await?;
    info!(url = %config.catalog_database_url, "Connected to movie catalog");

    let retrieval = Retrieval::new(Arc::new(catalog));
    let generator = OpenRouterGenerator::new(
        &config.openrouter_api_key,
        &config.model_name,
        config.max_new_tokens,
    );
    let assistant = MovieAssistant::new(retrieval, Arc::new(generator));

    let app = create_app(AppState::new(assistant));
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    let addr = listener.local_addr()?;

    info!("Server running on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /health       - Health check");
    info!("  POST /chat         - Answer a movie question");
    info!("  POST /retrieve     - Show retrieved catalog context");
    info!("  GET  /movies/top   - Top rated movies");
    info!("    Example: POST /chat {{\"query\": \"movies similar to Inception\"}}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
