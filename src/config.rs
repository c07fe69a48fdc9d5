//! Loading tutor configuration (prompt overrides) from TOML.
//!
//! See `TutorConfig` and `Prompts` for the expected schema. Every prompt key is
//! optional in the file; missing keys keep their built-in default.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TutorConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompt templates used by the prompt builder. `{key}` placeholders are filled by
/// `util::fill_template`.
///
/// Placeholders:
/// - generation: `{topic}`, `{difficulty}`
/// - evaluation: `{title}`, `{description}`, `{solution}`, `{code}`
/// - explain: `{topic}`, `{concept}`
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub generation_system: String,
  pub generation_user_template: String,
  pub evaluation_system: String,
  pub evaluation_user_template: String,
  pub explain_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generation_system: "당신은 시니어 딥러닝 엔지니어 면접관입니다. 모든 응답은 한국어로 작성되어야 합니다.".into(),
      generation_user_template: "Create a deep learning coding interview problem using PyTorch in Korean (한국어).\n\
Topic: {topic}\n\
Difficulty: {difficulty}\n\
\n\
The problem should focus on implementation details relevant to the topic.\n\
Make the description state input/output tensor shapes and the expected behavior.\n\
Provide a starter code snippet with imports and the class structure, leaving the logic empty (pass).\n\
Provide the full solution code.\n\
Provide exactly 3 helpful hints in Korean.\n\
\n\
IMPORTANT: All text (title, description, hints) must be in Korean. Variable names and code comments may be in English or Korean.".into(),
      evaluation_system: "당신은 엄격하지만 도움이 되는 코드 리뷰어입니다. 피드백은 한국어로 마크다운 형식을 사용하여 제공하세요.".into(),
      evaluation_user_template: "Evaluate the following deep learning coding solution in Korean (한국어).\n\
\n\
Problem Title: {title}\n\
Problem Description: {description}\n\
\n\
Reference Solution:\n\
{solution}\n\
\n\
User Submission:\n\
{code}\n\
\n\
Provide a detailed code review in Korean.\n\
1. Check correctness (tensor shapes, logic, autograd usage).\n\
2. Check efficiency and PyTorch best practices.\n\
3. Give a score from 0 to 100.\n\
4. State explicitly whether it is functionally correct.".into(),
      explain_user_template: "\"{topic}\" (Deep Learning) 문맥에서 \"{concept}\" 개념을 한국어로 간결하고 명확하게 설명해주세요.".into(),
    }
  }
}

/// Attempt to load `TutorConfig` from TUTOR_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_tutor_config_from_env() -> Option<TutorConfig> {
  let path = std::env::var("TUTOR_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_tutor_config(&s) {
      Ok(cfg) => {
        info!(target: "dl_tutor_backend", %path, "Loaded tutor config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "dl_tutor_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "dl_tutor_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_tutor_config(s: &str) -> Result<TutorConfig, toml::de::Error> {
  toml::from_str::<TutorConfig>(s)
}
