//! Prompt builder: turns a tutor request into a model request (system instruction,
//! user prompt, optional response schema). Pure functions, no I/O.

use serde_json::{json, Value};

use crate::config::Prompts;
use crate::domain::{Difficulty, Exercise, Topic};
use crate::locale::{difficulty_label, topic_label};
use crate::util::fill_template;

/// One request to the model, independent of the transport.
#[derive(Clone, Debug, PartialEq)]
pub struct PromptRequest {
  pub system_instruction: Option<String>,
  pub prompt: String,
  /// When present the model is put in JSON mode and constrained to this schema.
  pub response_schema: Option<Value>,
}

/// Schema for a generated exercise. The prompt asks for 3 hints; the schema
/// does not pin the array length.
pub fn exercise_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "title": { "type": "STRING" },
      "description": { "type": "STRING" },
      "starterCode": { "type": "STRING" },
      "solutionCode": { "type": "STRING" },
      "hints": { "type": "ARRAY", "items": { "type": "STRING" } }
    },
    "required": ["title", "description", "starterCode", "solutionCode", "hints"]
  })
}

pub fn evaluation_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "feedback": { "type": "STRING", "description": "Markdown formatted detailed feedback in Korean" },
      "score": { "type": "INTEGER", "description": "Score from 0 to 100" },
      "isCorrect": { "type": "BOOLEAN", "description": "Whether the code functionally solves the problem" }
    },
    "required": ["feedback", "score", "isCorrect"]
  })
}

pub fn build_generation_request(prompts: &Prompts, topic: Topic, difficulty: Difficulty) -> PromptRequest {
  let pairs = [("topic", topic_label(topic)), ("difficulty", difficulty_label(difficulty))];
  PromptRequest {
    system_instruction: Some(prompts.generation_system.clone()),
    prompt: fill_template(&prompts.generation_user_template, &pairs),
    response_schema: Some(exercise_schema()),
  }
}

/// Empty `code` is embedded as-is; judging it is the model's job.
pub fn build_evaluation_request(prompts: &Prompts, exercise: &Exercise, code: &str) -> PromptRequest {
  let pairs = [
    ("title", exercise.title.as_str()),
    ("description", exercise.description.as_str()),
    ("solution", exercise.solution_code.as_str()),
    ("code", code),
  ];
  PromptRequest {
    system_instruction: Some(prompts.evaluation_system.clone()),
    prompt: fill_template(&prompts.evaluation_user_template, &pairs),
    response_schema: Some(evaluation_schema()),
  }
}

pub fn build_explain_request(prompts: &Prompts, topic_label: &str, concept: &str) -> PromptRequest {
  PromptRequest {
    system_instruction: None,
    prompt: fill_template(&prompts.explain_user_template, &[("topic", topic_label), ("concept", concept)]),
    response_schema: None,
  }
}
