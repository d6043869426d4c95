use anyhow::{bail, Result};
use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use keyrank_core::export::to_csv_string;
use keyrank_core::persist::{load_meta, load_model, ModelMeta, ModelPaths};
use keyrank_core::source::{PdfBytes, TextSource};
use keyrank_core::{rank, ExportError, ExtractionError, RankError, RankedKeyword, TermWeightModel, DEFAULT_TOP_N};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const CSV_FILE_NAME: &str = "keywords_with_confidence.csv";

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    /// Used when a request carries no `top_n`.
    pub default_top_n: usize,
    /// Requests above this are rejected, not clamped.
    pub max_top_n: usize,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { default_top_n: DEFAULT_TOP_N, max_top_n: 20, max_upload_bytes: 16 * 1024 * 1024 }
    }
}

#[derive(Deserialize)]
pub struct KeywordRequest {
    pub text: String,
    pub top_n: Option<usize>,
}

#[derive(Deserialize)]
pub struct PdfParams {
    pub top_n: Option<usize>,
}

#[derive(Serialize)]
pub struct KeywordResponse {
    pub top_n: usize,
    pub took_s: f64,
    pub keywords: Vec<RankedKeyword>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_chars: Option<usize>,
}

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<TermWeightModel>,
    pub meta: Arc<ModelMeta>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(model: TermWeightModel, meta: ModelMeta, config: ServerConfig) -> Self {
        Self { model: Arc::new(model), meta: Arc::new(meta), config }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Rank(#[from] RankError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("invalid request body: {0}")]
    Body(#[from] JsonRejection),
    #[error("invalid query string: {0}")]
    Query(#[from] QueryRejection),
    #[error("top_n {requested} exceeds the maximum of {max}")]
    TopNTooLarge { requested: usize, max: usize },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ApiError::Rank(RankError::EmptyResult) => (StatusCode::UNPROCESSABLE_ENTITY, "empty_result"),
            ApiError::Rank(e) => (StatusCode::BAD_REQUEST, e.kind()),
            ApiError::Extraction(_) => (StatusCode::BAD_REQUEST, "extraction"),
            ApiError::Body(rejection) => (rejection.status(), "invalid_request"),
            ApiError::Query(rejection) => (rejection.status(), "invalid_request"),
            ApiError::TopNTooLarge { .. } => (StatusCode::BAD_REQUEST, "invalid_top_n"),
            ApiError::Export(_) => (StatusCode::INTERNAL_SERVER_ERROR, "export"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string(), "kind": kind }))).into_response()
    }
}

/// Load the model once and build the router. A model that fails to load
/// aborts startup.
pub fn build_app(model_dir: &str, config: ServerConfig) -> Result<Router> {
    if config.default_top_n == 0 || config.default_top_n > config.max_top_n {
        bail!("default top_n {} must be within 1..={}", config.default_top_n, config.max_top_n);
    }
    let paths = ModelPaths::new(model_dir);
    let model = load_model(&paths)?;
    let meta = load_meta(&paths)?.unwrap_or_else(|| ModelMeta::for_model(&model, ""));
    Ok(router(AppState::new(model, meta, config)))
}

pub fn router(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/model", get(model_handler))
        .route("/keywords", post(keywords_handler))
        .route("/keywords/csv", post(keywords_csv_handler))
        .route("/keywords/pdf", post(keywords_pdf_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn resolve_top_n(config: &ServerConfig, requested: Option<usize>) -> Result<usize, ApiError> {
    let top_n = requested.unwrap_or(config.default_top_n);
    if top_n > config.max_top_n {
        return Err(ApiError::TopNTooLarge { requested: top_n, max: config.max_top_n });
    }
    Ok(top_n)
}

pub async fn model_handler(State(state): State<AppState>) -> Json<ModelMeta> {
    Json(state.meta.as_ref().clone())
}

pub async fn keywords_handler(
    State(state): State<AppState>,
    payload: Result<Json<KeywordRequest>, JsonRejection>,
) -> Result<Json<KeywordResponse>, ApiError> {
    let start = Instant::now();
    let Json(req) = payload?;
    let top_n = resolve_top_n(&state.config, req.top_n)?;
    let keywords = rank(&req.text, top_n, &state.model)?;
    Ok(Json(KeywordResponse { top_n, took_s: start.elapsed().as_secs_f64(), keywords, extracted_chars: None }))
}

pub async fn keywords_csv_handler(
    State(state): State<AppState>,
    payload: Result<Json<KeywordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let top_n = resolve_top_n(&state.config, req.top_n)?;
    let keywords = rank(&req.text, top_n, &state.model)?;
    let csv = to_csv_string(&keywords)?;
    let disposition = format!("attachment; filename=\"{CSV_FILE_NAME}\"");
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()), (header::CONTENT_DISPOSITION, disposition)], csv))
}

pub async fn keywords_pdf_handler(
    State(state): State<AppState>,
    params: Result<Query<PdfParams>, QueryRejection>,
    body: Bytes,
) -> Result<Json<KeywordResponse>, ApiError> {
    let start = Instant::now();
    let Query(params) = params?;
    let top_n = resolve_top_n(&state.config, params.top_n)?;
    let source = PdfBytes(body.to_vec());
    let text = tokio::task::spawn_blocking(move || source.extract_text())
        .await
        .map_err(|_| ApiError::Extraction(ExtractionError::Panicked))??;
    let keywords = rank(&text, top_n, &state.model)?;
    Ok(Json(KeywordResponse {
        top_n,
        took_s: start.elapsed().as_secs_f64(),
        keywords,
        extracted_chars: Some(text.chars().count()),
    }))
}
