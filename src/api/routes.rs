use axum::{
    routing::{get, post},
    Router,
    extract::{ConnectInfo, DefaultBodyLimit, Json, Request, State, rejection::JsonRejection},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::{Result, AppError};
use crate::api::models::{AnalyzeRequest, AnalyzeResponse, HealthResponse, ReadableRequest};
use crate::pipeline;
use crate::readable::{ReadableView, to_readable_view};
use crate::AppState;

/// Room for the JSON envelope and the base URL around the markup.
const READABLE_BODY_OVERHEAD: usize = 64 * 1024;

pub fn create_router(app_state: AppState) -> Router {
    let api = Router::new()
        .route("/api/analyze", post(analyze_handler))
        .route(
            "/api/readable",
            post(readable_handler).layer(DefaultBodyLimit::max(readable_body_limit(&app_state))),
        )
        .route_layer(middleware::from_fn_with_state(app_state.clone(), throttle_requests));

    Router::new()
        .route("/health", get(health_handler))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

/// Largest `/api/readable` body: any `originalHtml` the analyze route can
/// return, with every byte JSON-escaped once.
fn readable_body_limit(state: &AppState) -> usize {
    state
        .config
        .max_response_bytes
        .saturating_mul(2)
        .saturating_add(READABLE_BODY_OVERHEAD)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn throttle_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let client = client_key(&request);
    if !state.throttle.admit(&client) {
        warn!(%client, "Rate limit exceeded");
        return AppError::RateLimited.into_response();
    }
    next.run(request).await
}

/// Peer IP when the server was started with connect info.
fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!(reason = %rejection.body_text(), "Request body too large");
            Err(AppError::PayloadTooLarge)
        }
        Err(rejection) => Err(AppError::InvalidRequest(rejection.body_text())),
    }
}

async fn analyze_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>> {
    let req = json_body(payload)?;
    info!(url = ?req.url, "Processing analyze request");
    let start_time = std::time::Instant::now();

    let result = pipeline::analyze(&state, req).await;

    let elapsed = start_time.elapsed();
    match &result {
        Ok(response) => info!(?elapsed, title = %response.title, "Request completed successfully"),
        Err(err) => error!(?elapsed, error = %err, "Request failed"),
    }

    result.map(Json)
}

async fn readable_handler(
    payload: std::result::Result<Json<ReadableRequest>, JsonRejection>,
) -> Result<Json<ReadableView>> {
    let req = json_body(payload)?;
    info!(html_bytes = req.html.len(), "Building readable view");

    let view = tokio::task::spawn_blocking(move || {
        to_readable_view(&req.html, req.url.as_deref().unwrap_or_default())
    })
    .await
    .map_err(|e| AppError::ExtractionError(e.to_string()))?;

    Ok(Json(view))
}
