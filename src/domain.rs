//! Domain models used by the backend: topic/difficulty catalog, exercises and grading results.
//!
//! The enums here carry no display text; Korean labels live in `locale`.

use serde::{Deserialize, Serialize};

/// Deep-learning area an exercise is drawn from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
  #[default]
  Basics,
  Cnn,
  Rnn,
  Transformers,
  Optimization,
  CustomLayers,
  Gan,
}

impl Topic {
  pub const ALL: [Topic; 7] = [
    Topic::Basics,
    Topic::Cnn,
    Topic::Rnn,
    Topic::Transformers,
    Topic::Optimization,
    Topic::CustomLayers,
    Topic::Gan,
  ];
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  #[default]
  Junior,
  Mid,
  Senior,
}

impl Difficulty {
  pub const ALL: [Difficulty; 3] = [Difficulty::Junior, Difficulty::Mid, Difficulty::Senior];
}

/// A generated coding problem. Field names on the wire match the response schema
/// the model is asked to fill, so decoding is a straight serde pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
  pub title: String,
  /// Markdown.
  pub description: String,
  pub starter_code: String,
  pub solution_code: String,
  /// Usually three entries; the count is whatever the model returned.
  pub hints: Vec<String>,
}

/// Grading outcome for one submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
  /// Markdown.
  pub feedback: String,
  /// Requested as 0-100 but passed through as returned.
  pub score: i64,
  pub is_correct: bool,
}
