//! Error types for the model gateway and the workflow boundary.
//!
//! Raw detail stays in these types and in the logs; learners only ever see the
//! fixed messages from `locale`.

use thiserror::Error;

/// Strict decoding of a model reply into a typed record failed.
#[derive(Debug, Error)]
pub enum DecodeError {
  #[error("reply text was empty")]
  Empty,
  #[error("reply does not match the declared schema: {0}")]
  Malformed(#[from] serde_json::Error),
}

/// Failures talking to the generative model.
#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("no API credential configured")]
  MissingCredential,
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("model HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("model returned no text")]
  EmptyResponse,
  #[error(transparent)]
  Decode(#[from] DecodeError),
}

/// Errors surfaced by the tutor operations.
#[derive(Debug, Error)]
pub enum TutorError {
  #[error("no API credential configured")]
  MissingCredential,
  #[error("exercise generation failed: {0}")]
  Generation(#[source] GatewayError),
  #[error("submission evaluation failed: {0}")]
  Evaluation(#[source] GatewayError),
  #[error("concept explanation failed: {0}")]
  Explain(#[source] GatewayError),
}
