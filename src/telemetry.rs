//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! Behavior:
//! - LOG_LEVEL controls the filter (e.g. "debug" or detailed directives like
//!   "info,tutor=debug,dl_tutor_backend=debug,tower_http=info,axum=info").
//! - LOG_FORMAT selects "pretty" (default) or "json" structured logs.
//!
//! Targets in use: `dl_tutor_backend` (startup, sockets) and `tutor` (workflow and
//! model calls). Tower HTTP TraceLayer adds per-request spans on top.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,tutor=debug,dl_tutor_backend=debug,tower_http=info,axum=info";

#[derive(Debug, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

fn log_format(value: Option<&str>) -> LogFormat {
    match value.map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    }
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match log_format(std::env::var("LOG_FORMAT").ok().as_deref()) {
        LogFormat::Json => builder.json().flatten_event(true).init(),
        LogFormat::Pretty => builder.init(),
    }
}
