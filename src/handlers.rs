use crate::errors::AppError;
use crate::models::{SearchRequest, SearchResponse};
use crate::orchestrator::SearchUseCase;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub use_case: Arc<SearchUseCase>,
    pub metrics_handle: PrometheusHandle,
    pub started_at: Instant,
}

/// POST /api/search
///
/// Syntactic validation (presence of `query` and `type`) is an HTTP 400;
/// everything else, including "nothing found", is a 200 with
/// `success: false` in the body.
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    counter!("search_requests_total").increment(1);

    if request.query.trim().is_empty() || request.search_type.trim().is_empty() {
        counter!("search_requests_invalid").increment(1);
        return Err(AppError::BadRequest(
            "query and type are required".to_string(),
        ));
    }

    tracing::info!(
        "Search request: type={} query_len={}",
        request.search_type,
        request.query.len()
    );

    Ok(Json(state.use_case.execute(&request).await))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut body = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    if let Some(rss_kb) = resident_memory_kb() {
        body["memory_rss_kb"] = json!(rss_kb);
    }

    Json(body)
}

/// GET /metrics — Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics_handle.render(),
    )
}

/// GET /api/info
pub async fn info(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": "person-finder-api",
        "version": env!("CARGO_PKG_VERSION"),
        "searchTypes": ["email", "company"],
        "providers": state.use_case.provider_names(),
        "cacheFreshnessMinutes": crate::store::FRESHNESS_MINUTES,
    }))
}

/// Best-effort resident set size from /proc; absent on non-Linux hosts.
fn resident_memory_kb() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()
}
