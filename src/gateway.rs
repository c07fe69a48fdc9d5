//! AI gateway: the one boundary to the generative model.
//!
//! `ContentModel` is the raw transport (Gemini in production, a scripted double in
//! tests). `Gateway` builds prompts, calls the transport once per operation and
//! strictly decodes the reply. No retry, caching or timeout handling happens here.

use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::{Difficulty, EvaluationResult, Exercise, Topic};
use crate::error::{DecodeError, GatewayError, TutorError};
use crate::locale::MSG_EXPLAIN_FALLBACK;
use crate::prompts::{build_evaluation_request, build_explain_request, build_generation_request, PromptRequest};

#[async_trait]
pub trait ContentModel: Send + Sync {
  /// Whether a credential is available. Callers check this before issuing work.
  fn is_configured(&self) -> bool;

  /// Issue one request. `Ok(None)` means the model answered without any text.
  async fn generate(&self, request: &PromptRequest) -> Result<Option<String>, GatewayError>;
}

pub struct Gateway<M> {
  model: M,
  prompts: Prompts,
}

impl<M: ContentModel> Gateway<M> {
  pub fn new(model: M, prompts: Prompts) -> Self {
    Self { model, prompts }
  }

  pub fn is_configured(&self) -> bool {
    self.model.is_configured()
  }

  #[instrument(level = "info", skip_all, fields(?topic, ?difficulty))]
  pub async fn generate_exercise(&self, topic: Topic, difficulty: Difficulty) -> Result<Exercise, TutorError> {
    let request = build_generation_request(&self.prompts, topic, difficulty);
    let start = Instant::now();
    let result = self.call_text(&request).await.and_then(|t| decode_exercise(&t).map_err(GatewayError::from));
    let elapsed = start.elapsed();

    match result {
      Ok(exercise) => {
        info!(
          target: "tutor",
          ?elapsed,
          title_preview = %exercise.title.chars().take(40).collect::<String>(),
          hint_count = exercise.hints.len(),
          "Exercise generated"
        );
        Ok(exercise)
      }
      Err(e) => {
        error!(target: "tutor", ?elapsed, error = %e, "Exercise generation failed");
        Err(TutorError::Generation(e))
      }
    }
  }

  #[instrument(level = "info", skip(self, exercise, code), fields(title_len = exercise.title.len(), code_len = code.len()))]
  pub async fn evaluate_submission(&self, exercise: &Exercise, code: &str) -> Result<EvaluationResult, TutorError> {
    let request = build_evaluation_request(&self.prompts, exercise, code);
    let start = Instant::now();
    let result = self.call_text(&request).await.and_then(|t| decode_evaluation(&t).map_err(GatewayError::from));
    let elapsed = start.elapsed();

    match result {
      Ok(evaluation) => {
        info!(target: "tutor", ?elapsed, score = evaluation.score, is_correct = evaluation.is_correct, "Submission evaluated");
        Ok(evaluation)
      }
      Err(e) => {
        error!(target: "tutor", ?elapsed, error = %e, "Submission evaluation failed");
        Err(TutorError::Evaluation(e))
      }
    }
  }

  /// Free-form explanation of `concept` within `topic_label`. Falls back to a fixed
  /// message when the model answers without text.
  #[instrument(level = "info", skip(self, topic_label, concept), fields(topic_len = topic_label.len(), concept_len = concept.len()))]
  pub async fn explain_concept(&self, topic_label: &str, concept: &str) -> Result<String, TutorError> {
    if !self.model.is_configured() {
      return Err(TutorError::MissingCredential);
    }
    let request = build_explain_request(&self.prompts, topic_label, concept);
    match self.model.generate(&request).await {
      Ok(Some(text)) if !text.is_empty() => Ok(text),
      Ok(_) => Ok(MSG_EXPLAIN_FALLBACK.to_string()),
      Err(e) => {
        error!(target: "tutor", error = %e, "Concept explanation failed");
        Err(TutorError::Explain(e))
      }
    }
  }

  /// One schema-constrained call. Absent text is an error here, unlike `explain_concept`.
  async fn call_text(&self, request: &PromptRequest) -> Result<String, GatewayError> {
    if !self.model.is_configured() {
      return Err(GatewayError::MissingCredential);
    }
    self.model.generate(request).await?.ok_or(GatewayError::EmptyResponse)
  }
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, DecodeError> {
  if text.trim().is_empty() {
    return Err(DecodeError::Empty);
  }
  Ok(serde_json::from_str::<T>(text)?)
}

/// Strict decode of a generation reply. All five fields are required; the hint
/// count is not checked.
pub fn decode_exercise(text: &str) -> Result<Exercise, DecodeError> {
  decode(text)
}

/// Strict decode of a grading reply. `score` is not clamped to 0-100.
pub fn decode_evaluation(text: &str) -> Result<EvaluationResult, DecodeError> {
  decode(text)
}


#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::testing::*;
  use super::*;

  fn gateway(model: ScriptedModel) -> (Arc<ScriptedModel>, Gateway<Arc<ScriptedModel>>) {
    let model = Arc::new(model);
    (model.clone(), Gateway::new(model, Prompts::default()))
  }

  fn sample_exercise() -> Exercise {
    Exercise {
      title: "T".into(),
      description: "D".into(),
      starter_code: "S".into(),
      solution_code: "X".into(),
      hints: vec!["a".into(), "b".into(), "c".into()],
    }
  }

  #[test]
  fn decode_exercise_keeps_fields_verbatim() {
    let text = r###"{"title":"  제목 ","description":"## 설명\n- `x`","starterCode":"import torch\n","solutionCode":"x = 1","hints":["하나","둘","셋"]}"###;
    let ex = decode_exercise(text).expect("valid exercise");
    assert_eq!(ex.title, "  제목 ");
    assert_eq!(ex.description, "## 설명\n- `x`");
    assert_eq!(ex.starter_code, "import torch\n");
    assert_eq!(ex.solution_code, "x = 1");
    assert_eq!(ex.hints, vec!["하나", "둘", "셋"]);
  }

  #[test]
  fn decode_exercise_requires_every_field() {
    let missing_hints = r#"{"title":"T","description":"D","starterCode":"S","solutionCode":"X"}"#;
    assert!(matches!(decode_exercise(missing_hints), Err(DecodeError::Malformed(_))));
    assert!(matches!(decode_exercise("   "), Err(DecodeError::Empty)));
    assert!(matches!(decode_exercise("not json"), Err(DecodeError::Malformed(_))));
  }

  #[test]
  fn decode_exercise_accepts_any_hint_count() {
    let text = r#"{"title":"T","description":"D","starterCode":"S","solutionCode":"X","hints":["only one"]}"#;
    assert_eq!(decode_exercise(text).expect("valid").hints.len(), 1);
  }

  #[test]
  fn decode_evaluation_passes_score_through() {
    let ev = decode_evaluation(r#"{"feedback":"F","score":150,"isCorrect":false}"#).expect("valid");
    assert_eq!(ev.score, 150);
    let ev = decode_evaluation(r#"{"feedback":"F","score":-3,"isCorrect":false}"#).expect("valid");
    assert_eq!(ev.score, -3);
    assert!(decode_evaluation(r#"{"feedback":"F","score":"high","isCorrect":true}"#).is_err());
  }

  #[tokio::test]
  async fn generate_exercise_round_trips_schema_reply() {
    let (model, gw) = gateway(ScriptedModel::new(vec![ScriptedModel::text(EXERCISE_JSON)]));
    let ex = gw.generate_exercise(Topic::Cnn, Difficulty::Junior).await.expect("generated");
    assert_eq!(ex, sample_exercise());

    let requests = model.requests.lock().expect("lock not poisoned");
    assert_eq!(requests.len(), 1);
    assert!(requests[0].response_schema.is_some());
  }

  #[tokio::test]
  async fn generate_exercise_without_credential_makes_no_call() {
    let (model, gw) = gateway(ScriptedModel::unconfigured());
    let err = gw.generate_exercise(Topic::Gan, Difficulty::Senior).await.expect_err("must fail");
    assert!(matches!(err, TutorError::Generation(GatewayError::MissingCredential)));
    assert_eq!(model.request_count(), 0);
  }

  #[tokio::test]
  async fn generate_exercise_failure_modes_are_generation_errors() {
    let (_, gw) = gateway(ScriptedModel::new(vec![
      Reply::NoText,
      ScriptedModel::text(""),
      ScriptedModel::text("{\"title\":\"T\"}"),
      Reply::Fail,
    ]));
    for _ in 0..4 {
      let err = gw.generate_exercise(Topic::Basics, Difficulty::Mid).await.expect_err("must fail");
      assert!(matches!(err, TutorError::Generation(_)), "unexpected {err:?}");
    }
  }

  #[tokio::test]
  async fn evaluate_submission_decodes_result() {
    let (model, gw) = gateway(ScriptedModel::new(vec![ScriptedModel::text(EVALUATION_JSON)]));
    let ev = gw.evaluate_submission(&sample_exercise(), "").await.expect("evaluated");
    assert_eq!(ev, EvaluationResult { feedback: "F".into(), score: 87, is_correct: true });
    assert_eq!(model.request_count(), 1);
  }

  #[tokio::test]
  async fn evaluate_submission_failure_is_evaluation_error() {
    let (_, gw) = gateway(ScriptedModel::new(vec![ScriptedModel::text("{\"feedback\":\"F\"}")]));
    let err = gw.evaluate_submission(&sample_exercise(), "x").await.expect_err("must fail");
    assert!(matches!(err, TutorError::Evaluation(GatewayError::Decode(_))));
  }

  #[tokio::test]
  async fn explain_concept_returns_text_or_fallback() {
    let (model, gw) = gateway(ScriptedModel::new(vec![ScriptedModel::text("설명"), Reply::NoText]));
    assert_eq!(gw.explain_concept("CNN", "stride").await.expect("text"), "설명");
    assert_eq!(gw.explain_concept("CNN", "padding").await.expect("fallback"), MSG_EXPLAIN_FALLBACK);

    let requests = model.requests.lock().expect("lock not poisoned");
    assert!(requests.iter().all(|r| r.response_schema.is_none()));
  }

  #[tokio::test]
  async fn explain_concept_requires_credential() {
    let (_, gw) = gateway(ScriptedModel::unconfigured());
    assert!(matches!(gw.explain_concept("CNN", "stride").await, Err(TutorError::MissingCredential)));
  }
}
