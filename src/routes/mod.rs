//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::gateway::ContentModel;
use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers); tighten for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router<M: ContentModel + 'static>(state: Arc<AppState<M>>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade::<M>))
        // HTTP API
        .route("/api/v1/health", get(http::http_health::<M>))
        .route("/api/v1/catalog", get(http::http_catalog))
        .route("/api/v1/sessions", post(http::http_create_session::<M>))
        .route(
            "/api/v1/sessions/:id",
            get(http::http_get_session::<M>).delete(http::http_delete_session::<M>),
        )
        .route("/api/v1/sessions/:id/intents", post(http::http_post_intent::<M>))
        .route("/api/v1/explain", post(http::http_post_explain::<M>))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
