//! DL Tutor · deep-learning coding exercise backend
//!
//! - Axum HTTP + WebSocket API over a per-learner workflow session
//! - Gemini integration for exercise generation and grading (via environment variables)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   GEMINI_API_KEY      : credential; without it generation reports a missing key
//!   GEMINI_MODEL        : default "gemini-2.5-flash"
//!   GEMINI_BASE_URL     : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_TIMEOUT_SECS : optional transport timeout (unset = none)
//!   TUTOR_CONFIG_PATH   : path to TOML config (prompt overrides)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod config;
mod domain;
mod error;
mod gateway;
mod gemini;
mod locale;
mod prompts;
mod protocol;
mod routes;
mod state;
mod telemetry;
mod util;
mod workflow;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // One gateway for the whole process; sessions are created on demand.
  let state = Arc::new(AppState::from_env()?);

  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "dl_tutor_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "dl_tutor_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "dl_tutor_backend", "Shutdown signal received");
}
