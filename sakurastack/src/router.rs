//! HTTP router for SakuraStack services

use axum::{
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info_span, Instrument};

use sakurastack_core::{ApiError, RequestId, REQUEST_ID_HEADER};
use sakurastack_secretmanager::{error_response, SecretManagerState};

/// Service state for the main router
pub struct AppState {
    secretmanager: Arc<SecretManagerState>,
}

impl AppState {
    pub fn new(prefix: &str) -> Self {
        Self {
            secretmanager: Arc::new(SecretManagerState::new(prefix)),
        }
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(sakurastack_secretmanager::router(state.secretmanager))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(tag_request_id))
}

/// Tag every request with a fresh id: logged through the span, echoed in
/// the `X-Request-Id` response header
async fn tag_request_id(request: Request, next: Next) -> Response {
    let request_id = RequestId::new();
    let span = info_span!("request", request_id = %request_id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        r#"{"status":"running","services":["secretmanager"]}"#,
    )
}

async fn not_found() -> Response {
    error_response(&ApiError::route_not_found())
}
