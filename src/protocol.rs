//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Difficulty, EvaluationResult, Topic};
use crate::locale::{difficulty_label, topic_label};
use crate::workflow::{Intent, Outcome, Status, WorkflowState};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    GetState,
    Intent { intent: Intent },
    Explain { topic: Topic, concept: String },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    State { outcome: Outcome, view: SessionView },
    Explanation { text: String },
    Error { message: String },
}

/// Snapshot of a session as the frontend renders it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub topic: Topic,
    pub topic_label: &'static str,
    pub difficulty: Difficulty,
    pub difficulty_label: &'static str,
    pub status: Status,
    pub code: String,
    pub last_error: Option<String>,
    pub exercise: Option<ExerciseView>,
    pub evaluation: Option<EvaluationResult>,
}

/// Exercise as shown to the learner: only unlocked hints, and the reference
/// solution only once a submission has been graded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseView {
    pub title: String,
    pub description: String,
    pub starter_code: String,
    pub hints: Vec<String>,
    pub hint_count: usize,
    pub hints_remaining: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution_code: Option<String>,
}

/// Convert workflow state (internal) to the public view.
pub fn to_view(state: &WorkflowState) -> SessionView {
    let exercise = state.exercise.as_ref().map(|e| {
        let hints = state.revealed_hints().to_vec();
        ExerciseView {
            title: e.title.clone(),
            description: e.description.clone(),
            starter_code: e.starter_code.clone(),
            hint_count: e.hints.len(),
            hints_remaining: e.hints.len() - hints.len(),
            hints,
            solution_code: state.evaluation.as_ref().map(|_| e.solution_code.clone()),
        }
    });
    SessionView {
        topic: state.topic,
        topic_label: topic_label(state.topic),
        difficulty: state.difficulty,
        difficulty_label: difficulty_label(state.difficulty),
        status: state.status,
        code: state.code.clone(),
        last_error: state.last_error.clone(),
        exercise,
        evaluation: state.evaluation.clone(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOut {
    pub ok: bool,
    pub model_configured: bool,
}

#[derive(Serialize)]
pub struct CatalogEntry<T> {
    pub id: T,
    pub label: &'static str,
}

#[derive(Serialize)]
pub struct CatalogOut {
    pub topics: Vec<CatalogEntry<Topic>>,
    pub difficulties: Vec<CatalogEntry<Difficulty>>,
}

pub fn catalog() -> CatalogOut {
    CatalogOut {
        topics: Topic::ALL.iter().map(|&t| CatalogEntry { id: t, label: topic_label(t) }).collect(),
        difficulties: Difficulty::ALL
            .iter()
            .map(|&d| CatalogEntry { id: d, label: difficulty_label(d) })
            .collect(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreatedOut {
    pub session_id: Uuid,
    pub view: SessionView,
}

#[derive(Serialize)]
pub struct IntentOut {
    pub outcome: Outcome,
    pub view: SessionView,
}

#[derive(Deserialize)]
pub struct ExplainIn {
    pub topic: Topic,
    pub concept: String,
}
#[derive(Serialize)]
pub struct ExplainOut {
    pub text: String,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}
