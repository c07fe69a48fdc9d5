//! Minimal Gemini client for our use-cases.
//!
//! We only call `models/{model}:generateContent` and request either plain text or a
//! JSON reply constrained by a response schema. Calls are instrumented and log the
//! model name, latency and token usage (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::GatewayError;
use crate::gateway::ContentModel;
use crate::prompts::PromptRequest;
use crate::util::trunc_for_log;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GeminiClient {
  pub client: reqwest::Client,
  api_key: Option<String>,
  pub base_url: String,
  pub model: String,
}

impl GeminiClient {
  /// Construct the client from the environment. A missing GEMINI_API_KEY is not an
  /// error here: the client is still built and reports itself unconfigured.
  pub fn from_env() -> Result<Self, reqwest::Error> {
    let api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty());
    let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    let timeout = std::env::var("GEMINI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .map(Duration::from_secs);
    Self::new(api_key, base_url, model, timeout)
  }

  pub fn new(
    api_key: Option<String>,
    base_url: String,
    model: String,
    timeout: Option<Duration>,
  ) -> Result<Self, reqwest::Error> {
    let mut builder = reqwest::Client::builder();
    if let Some(t) = timeout {
      builder = builder.timeout(t);
    }
    let client = builder.build()?;
    Ok(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
  }

  fn endpoint(&self) -> String {
    format!("{}/models/{}:generateContent", self.base_url, self.model)
  }
}

#[async_trait]
impl ContentModel for GeminiClient {
  fn is_configured(&self) -> bool {
    self.api_key.is_some()
  }

  #[instrument(level = "info", skip(self, request), fields(model = %self.model, json_mode = request.response_schema.is_some(), prompt_len = request.prompt.len()))]
  async fn generate(&self, request: &PromptRequest) -> Result<Option<String>, GatewayError> {
    let api_key = self.api_key.as_deref().ok_or(GatewayError::MissingCredential)?;
    let body = GenerateContentRequest::from_prompt(request);

    let start = Instant::now();
    let res = self
      .client
      .post(self.endpoint())
      .header(USER_AGENT, "dl-tutor-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(API_KEY_HEADER, api_key)
      .json(&body)
      .send()
      .await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_gemini_error(&body).unwrap_or_else(|| trunc_for_log(&body, 300));
      warn!(status, elapsed = ?start.elapsed(), "Gemini returned an error status");
      return Err(GatewayError::Http { status, message });
    }

    let body: GenerateContentResponse = res.json().await?;
    if let Some(usage) = &body.usage_metadata {
      info!(
        elapsed = ?start.elapsed(),
        prompt_tokens = ?usage.prompt_token_count,
        candidates_tokens = ?usage.candidates_token_count,
        total_tokens = ?usage.total_token_count,
        "Gemini usage"
      );
    }
    let text = body.text();
    debug!(reply_len = ?text.as_ref().map(String::len), "Gemini reply received");
    Ok(text)
  }
}

// --- Wire DTOs ---

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<Content>,
  #[serde(skip_serializing_if = "Option::is_none")]
  system_instruction: Option<Content>,
  #[serde(skip_serializing_if = "Option::is_none")]
  generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
  fn from_prompt(request: &PromptRequest) -> Self {
    Self {
      contents: vec![Content::text(Some("user"), &request.prompt)],
      system_instruction: request.system_instruction.as_deref().map(|s| Content::text(None, s)),
      generation_config: request.response_schema.as_ref().map(|schema| GenerationConfig {
        response_mime_type: "application/json".into(),
        response_schema: schema.clone(),
      }),
    }
  }
}

#[derive(Serialize, Deserialize, Debug)]
struct Content {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  #[serde(default)]
  parts: Vec<Part>,
}

impl Content {
  fn text(role: Option<&str>, text: &str) -> Self {
    Self { role: role.map(str::to_string), parts: vec![Part { text: Some(text.to_string()) }] }
  }
}

#[derive(Serialize, Deserialize, Debug)]
struct Part {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  text: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  response_mime_type: String,
  response_schema: Value,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  #[serde(default)]
  usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
  /// Concatenated text parts of the first candidate; `None` when there is no text.
  fn text(&self) -> Option<String> {
    let content = self.candidates.first()?.content.as_ref()?;
    let text: String = content.parts.iter().filter_map(|p| p.text.as_deref()).collect();
    if text.is_empty() { None } else { Some(text) }
  }
}

#[derive(Deserialize, Debug)]
struct Candidate {
  #[serde(default)]
  content: Option<Content>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)]
  prompt_token_count: Option<u32>,
  #[serde(default)]
  candidates_token_count: Option<u32>,
  #[serde(default)]
  total_token_count: Option<u32>,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap {
    error: EObj,
  }
  #[derive(Deserialize)]
  struct EObj {
    message: String,
  }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
