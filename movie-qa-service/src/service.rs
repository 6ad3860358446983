use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use movie_retrieval::{Movie, RetrievalContext, RetrievalError};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::{
    generator::MovieAssistant,
    models::{ChatRequest, ChatResponse, TopMoviesQuery},
};

pub const CORRELATION_HEADER: &str = "x-correlation-id";
const DEFAULT_MIN_RATING: f64 = 4.0;
const DEFAULT_TOP_LIMIT: usize = 25;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn unprocessable_error(message: &str) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": message })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn bad_gateway_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub assistant: MovieAssistant,
}

impl AppState {
    pub fn new(assistant: MovieAssistant) -> Self {
        Self { assistant }
    }
}

pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/chat", post(chat))
        .route("/retrieve", post(retrieve))
        .route("/movies/top", get(top_movies))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Tags every request with a fresh correlation id, in a tracing span and on the response
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();
    let header = HeaderValue::from_str(&correlation_id).ok();

    if let Some(value) = &header {
        request.headers_mut().insert(CORRELATION_HEADER, value.clone());
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Movie Q&A Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Answers movie questions from a movie catalog and a language model",
        "endpoints": {
            "POST /chat": "Answer a movie question",
            "POST /retrieve": "Show the catalog context retrieved for a question",
            "GET /movies/top": "Movies rated at least min_rating, best average first",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

fn validate_query(query: &str) -> Result<(), ApiError> {
    if query.trim().is_empty() {
        return Err(bad_request_error("Query cannot be empty"));
    }
    Ok(())
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    info!(query_length = request.query.len(), "Received chat request");
    validate_query(&request.query)?;

    let response = state
        .assistant
        .answer(&request.query)
        .await
        .map_err(|e| bad_gateway_error("Failed to generate an answer", &e.to_string()))?;

    Ok(Json(ChatResponse { response }))
}

async fn retrieve(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<RetrievalContext> {
    info!(query_length = request.query.len(), "Received retrieve request");
    validate_query(&request.query)?;

    match state.assistant.retrieval().process(&request.query).await {
        Ok(context) => Ok(Json(context)),
        Err(e @ RetrievalError::MissingEntity(_)) => {
            warn!(error = %e, "Query is missing a required entity");
            Err(unprocessable_error(&e.to_string()))
        }
        Err(e) => {
            error!(error = %e, "Retrieval failed");
            Err(internal_error("Catalog lookup failed", &e.to_string()))
        }
    }
}

async fn top_movies(
    State(state): State<AppState>,
    Query(params): Query<TopMoviesQuery>,
) -> ApiResult<Vec<Movie>> {
    let min_rating = params.min_rating.unwrap_or(DEFAULT_MIN_RATING);
    if !(0.0..=5.0).contains(&min_rating) {
        return Err(bad_request_error("min_rating must be between 0.0 and 5.0"));
    }
    let limit = params.limit.unwrap_or(DEFAULT_TOP_LIMIT);

    let mut movies = state
        .assistant
        .retrieval()
        .catalog()
        .get_by_min_rating(min_rating)
        .await
        .map_err(|e| {
            error!(error = %e, "Rating lookup failed");
            internal_error("Catalog lookup failed", &e.to_string())
        })?;
    movies.truncate(limit);

    info!(min_rating, count = movies.len(), "Returning top movies");
    Ok(Json(movies))
}
