//! Learner-facing Korean text: catalog labels and the fixed status/error messages.
//!
//! The locale is fixed at build time; nothing here is configurable at runtime.

use crate::domain::{Difficulty, Topic};

pub const MSG_MISSING_API_KEY: &str = "API 키가 누락되었습니다. 설정을 확인해주세요.";
pub const MSG_GENERATION_FAILED: &str = "문제 생성에 실패했습니다. 다시 시도해주세요.";
pub const MSG_EVALUATION_FAILED: &str = "채점에 실패했습니다.";
pub const MSG_EXPLAIN_FALLBACK: &str = "설명을 가져올 수 없습니다.";

pub fn topic_label(topic: Topic) -> &'static str {
  match topic {
    Topic::Basics => "PyTorch 기초",
    Topic::Cnn => "합성곱 신경망 (CNN)",
    Topic::Rnn => "순환 신경망 (RNN/LSTM/GRU)",
    Topic::Transformers => "트랜스포머 & 어텐션",
    Topic::Optimization => "최적화 & 손실 함수",
    Topic::CustomLayers => "커스텀 레이어 & Autograd",
    Topic::Gan => "생성적 적대 신경망 (GAN)",
  }
}

pub fn difficulty_label(difficulty: Difficulty) -> &'static str {
  match difficulty {
    Difficulty::Junior => "초급",
    Difficulty::Mid => "중급",
    Difficulty::Senior => "고급",
  }
}
