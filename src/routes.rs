use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::error;

use crate::aggregator::Aggregator;
use crate::item::NewsItem;

/// Shared caches may serve for 60s and stale for up to 300s more.
pub const NEWS_CACHE_CONTROL: &str = "public, s-maxage=60, stale-while-revalidate=300";

pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/news", get(news))
        .route("/api/news/:id", get(news_item))
        .route("/api/refresh", post(refresh))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Serialize)]
pub struct NewsResponse {
    pub ok: bool,
    pub count: usize,
    pub items: Vec<NewsItem>,
}

#[derive(Serialize)]
pub struct NewsItemResponse {
    pub ok: bool,
    pub item: NewsItem,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

impl ErrorResponse {
    fn new(error: &str) -> Self {
        Self {
            ok: false,
            error: error.to_string(),
        }
    }
}

// Logs the cause, never exposes it to the client
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Failed to load news")),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

// Route handlers
pub async fn news(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let items = state.aggregator.fetch_aggregated_news().await?;

    let body = NewsResponse {
        ok: true,
        count: items.len(),
        items,
    };
    Ok(([(header::CACHE_CONTROL, NEWS_CACHE_CONTROL)], Json(body)).into_response())
}

pub async fn news_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let response = match state.aggregator.find(&id).await? {
        Some(item) => Json(NewsItemResponse { ok: true, item }).into_response(),
        None => (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Not found"))).into_response(),
    };
    Ok(response)
}

pub async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.aggregator.invalidate_all().await;
    Json(serde_json::json!({ "ok": true }))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
