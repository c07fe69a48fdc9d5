//! HTTP endpoint handlers. These are thin wrappers that forward to the session workflow.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::TutorError;
use crate::gateway::ContentModel;
use crate::locale::topic_label;
use crate::protocol::*;
use crate::state::AppState;
use crate::workflow::Intent;

/// Errors a handler can return; rendered as `{ "error": ... }`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unknown session: {0}")]
  SessionNotFound(Uuid),
  #[error("model is not configured")]
  NotConfigured,
  #[error("upstream model call failed")]
  Upstream(#[source] TutorError),
}

impl From<TutorError> for ApiError {
  fn from(e: TutorError) -> Self {
    match e {
      TutorError::MissingCredential => ApiError::NotConfigured,
      other => ApiError::Upstream(other),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
      ApiError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(ErrorOut { error: self.to_string() })).into_response()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health<M: ContentModel>(State(state): State<Arc<AppState<M>>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, model_configured: state.gateway.is_configured() })
}

#[instrument(level = "info")]
pub async fn http_catalog() -> impl IntoResponse {
  Json(catalog())
}

#[instrument(level = "info", skip(state))]
pub async fn http_create_session<M: ContentModel>(State(state): State<Arc<AppState<M>>>) -> impl IntoResponse {
  let (session_id, session) = state.create_session().await;
  let view = to_view(&session.snapshot().await);
  (StatusCode::CREATED, Json(SessionCreatedOut { session_id, view }))
}

#[instrument(level = "info", skip_all, fields(%id))]
pub async fn http_get_session<M: ContentModel>(
  State(state): State<Arc<AppState<M>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
  let session = state.get_session(id).await.ok_or(ApiError::SessionNotFound(id))?;
  Ok(Json(to_view(&session.snapshot().await)))
}

#[instrument(level = "info", skip_all, fields(%id))]
pub async fn http_delete_session<M: ContentModel>(
  State(state): State<Arc<AppState<M>>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if state.remove_session(id).await {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::SessionNotFound(id))
  }
}

/// Apply one intent. Generation and submission return once the model call is done;
/// the call itself runs on its own task, so a client hanging up cannot strand the session.
#[instrument(level = "info", skip_all, fields(%id))]
pub async fn http_post_intent<M: ContentModel + 'static>(
  State(state): State<Arc<AppState<M>>>,
  Path(id): Path<Uuid>,
  Json(intent): Json<Intent>,
) -> Result<Json<IntentOut>, ApiError> {
  let session = state.get_session(id).await.ok_or(ApiError::SessionNotFound(id))?;
  let (outcome, after) = session.dispatch(intent).await;
  info!(target: "tutor", session_id = %id, ?outcome, status = ?after.status, failed = after.last_error.is_some(), "HTTP intent applied");
  Ok(Json(IntentOut { outcome, view: to_view(&after) }))
}

#[instrument(level = "info", skip(state, body), fields(topic = ?body.topic, concept_len = body.concept.len()))]
pub async fn http_post_explain<M: ContentModel>(
  State(state): State<Arc<AppState<M>>>,
  Json(body): Json<ExplainIn>,
) -> Result<Json<ExplainOut>, ApiError> {
  let text = state
    .gateway
    .explain_concept(topic_label(body.topic), &body.concept)
    .await
    .map_err(|e| {
      warn!(target: "tutor", error = %e, "HTTP explain failed");
      ApiError::from(e)
    })?;
  Ok(Json(ExplainOut { text }))
}

#[cfg(test)]
mod tests {
  use axum::body::{to_bytes, Body};
  use axum::http::Request;
  use serde_json::{json, Value};
  use tower::ServiceExt;

  use crate::config::Prompts;
  use std::time::Duration;

  use crate::gateway::testing::{GatedModel, Reply, ScriptedModel, EVALUATION_JSON, EXERCISE_JSON};
  use crate::routes::build_router;
  use crate::state::AppState;
  use super::*;

  fn router(model: ScriptedModel) -> axum::Router {
    build_router(Arc::new(AppState::new(model, Prompts::default())))
  }

  async fn call(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(b) => builder
        .header("content-type", "application/json")
        .body(Body::from(b.to_string()))
        .expect("request"),
      None => builder.body(Body::empty()).expect("request"),
    };
    let res = app.clone().oneshot(req).await.expect("infallible");
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json body") };
    (status, value)
  }

  #[tokio::test]
  async fn health_reports_model_configuration() {
    let (status, body) = call(&router(ScriptedModel::unconfigured()), "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "modelConfigured": false }));
  }

  #[tokio::test]
  async fn catalog_is_served() {
    let (status, body) = call(&router(ScriptedModel::new(vec![])), "GET", "/api/v1/catalog", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["topics"].as_array().map(Vec::len), Some(7));
  }

  #[tokio::test]
  async fn full_session_flow_over_http() {
    let app = router(ScriptedModel::new(vec![
      ScriptedModel::text(EXERCISE_JSON),
      ScriptedModel::text(EVALUATION_JSON),
    ]));
    let (status, created) = call(&app, "POST", "/api/v1/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["view"]["status"], "idle");
    let id = created["sessionId"].as_str().expect("session id").to_string();
    let intents = format!("/api/v1/sessions/{id}/intents");

    let (_, r) = call(&app, "POST", &intents, Some(json!({ "type": "select_topic", "topic": "cnn" }))).await;
    assert_eq!(r["view"]["topicLabel"], "합성곱 신경망 (CNN)");

    let (status, r) = call(&app, "POST", &intents, Some(json!({ "type": "request_generation" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(r["outcome"], "applied");
    assert_eq!(r["view"]["exercise"]["title"], "T");
    assert_eq!(r["view"]["code"], "S");
    assert_eq!(r["view"]["exercise"]["hints"], json!([]));

    let (_, r) = call(&app, "POST", &intents, Some(json!({ "type": "reveal_hint" }))).await;
    assert_eq!(r["view"]["exercise"]["hints"], json!(["a"]));

    let (_, r) = call(&app, "POST", &intents, Some(json!({ "type": "edit_code", "code": "mine" }))).await;
    assert_eq!(r["view"]["code"], "mine");

    let (_, r) = call(&app, "POST", &intents, Some(json!({ "type": "submit" }))).await;
    assert_eq!(r["view"]["evaluation"], json!({ "feedback": "F", "score": 87, "isCorrect": true }));
    assert_eq!(r["view"]["exercise"]["solutionCode"], "X");

    let (status, view) = call(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "idle");

    let (status, _) = call(&app, "DELETE", &format!("/api/v1/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = call(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some());
  }

  #[tokio::test]
  async fn submit_without_exercise_is_reported_as_ignored() {
    let app = router(ScriptedModel::new(vec![]));
    let (_, created) = call(&app, "POST", "/api/v1/sessions", None).await;
    let id = created["sessionId"].as_str().expect("session id").to_string();
    let (status, r) = call(&app, "POST", &format!("/api/v1/sessions/{id}/intents"), Some(json!({ "type": "submit" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(r["outcome"], "ignored");
    assert_eq!(r["view"]["evaluation"], Value::Null);
  }

  #[tokio::test]
  async fn missing_key_surfaces_fixed_message() {
    let app = router(ScriptedModel::unconfigured());
    let (_, created) = call(&app, "POST", "/api/v1/sessions", None).await;
    let id = created["sessionId"].as_str().expect("session id").to_string();
    let (_, r) =
      call(&app, "POST", &format!("/api/v1/sessions/{id}/intents"), Some(json!({ "type": "request_generation" }))).await;
    assert_eq!(r["view"]["lastError"], crate::locale::MSG_MISSING_API_KEY);
    assert_eq!(r["view"]["status"], "idle");
  }

  #[tokio::test]
  async fn explain_returns_text_and_maps_errors() {
    let app = router(ScriptedModel::new(vec![ScriptedModel::text("설명"), Reply::Fail]));
    let req = json!({ "topic": "transformers", "concept": "attention" });
    let (status, body) = call(&app, "POST", "/api/v1/explain", Some(req.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "설명");
    let (status, _) = call(&app, "POST", "/api/v1/explain", Some(req)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let unconfigured = router(ScriptedModel::unconfigured());
    let (status, _) =
      call(&unconfigured, "POST", "/api/v1/explain", Some(json!({ "topic": "gan", "concept": "mode collapse" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  }

  #[tokio::test]
  async fn dropped_generation_request_still_frees_the_session() {
    let model = Arc::new(GatedModel::new());
    let app = build_router(Arc::new(AppState::new(model.clone(), Prompts::default())));
    let (_, created) = call(&app, "POST", "/api/v1/sessions", None).await;
    let id = created["sessionId"].as_str().expect("session id").to_string();
    let intents = format!("/api/v1/sessions/{id}/intents");
    let session_uri = format!("/api/v1/sessions/{id}");
    let generate = json!({ "type": "request_generation" });

    let abandoned = tokio::time::timeout(Duration::from_millis(20), call(&app, "POST", &intents, Some(generate.clone()))).await;
    assert!(abandoned.is_err());
    let (_, view) = call(&app, "GET", &session_uri, None).await;
    assert_eq!(view["status"], "generating_exercise");

    model.release();
    let mut view = Value::Null;
    for _ in 0..200 {
      let (_, v) = call(&app, "GET", &session_uri, None).await;
      if v["status"] == "idle" {
        view = v;
        break;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(view["status"], "idle");
    assert_eq!(view["exercise"]["title"], "T");

    model.release();
    let (_, r) = call(&app, "POST", &intents, Some(generate)).await;
    assert_eq!(r["outcome"], "applied");
    assert_eq!(r["view"]["status"], "idle");
    assert_eq!(model.call_count(), 2);
  }

  #[tokio::test]
  async fn unknown_session_is_404() {
    let app = router(ScriptedModel::new(vec![]));
    let uri = format!("/api/v1/sessions/{}/intents", Uuid::new_v4());
    let (status, _) = call(&app, "POST", &uri, Some(json!({ "type": "reveal_hint" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }
}
