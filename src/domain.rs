//! Domain models: radicals, quiz/game modes, quiz questions and session results.

use serde::{Deserialize, Serialize};

/// One entry of the radical catalog. Immutable at runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Radical {
  pub character: String,
  /// How the radical looks when embedded in a compound (e.g. 氵 for 水).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub variant: Option<String>,
  /// Hanyu pinyin with tone marks.
  #[serde(alias = "pinyin")]
  pub reading: String,
  /// Gloss, possibly with slash-separated alternatives ("mouth/opening").
  pub meaning: String,
  #[serde(default)]
  pub difficulty: u8,
  #[serde(default)]
  pub examples: Vec<String>,
}

impl Radical {
  /// True when the compound form differs from the standalone glyph.
  pub fn has_variant(&self) -> bool {
    matches!(&self.variant, Some(v) if !v.is_empty() && *v != self.character)
  }
}

/// Quiz flavour picked by the learner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizMode {
  /// Four-option multiple choice.
  #[default]
  #[serde(alias = "normal")]
  Choice,
  /// Free-text meaning entry.
  #[serde(alias = "hard")]
  Typed,
}

impl QuizMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      QuizMode::Choice => "choice",
      QuizMode::Typed => "typed",
    }
  }
}

/// Top-level view the learner is looking at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
  #[default]
  Home,
  Study,
  Quiz,
  Result,
}

/// A generated question. Lives only as long as its quiz session.
#[derive(Clone, Debug, Serialize)]
pub struct QuizQuestion {
  pub radical: Radical,
  /// Glyph actually shown; typed mode sometimes shows the variant form.
  pub display: String,
  /// Empty in typed mode.
  pub options: Vec<String>,
  pub correct_answer: String,
}

/// Tally produced once per completed quiz.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionResult {
  pub score: usize,
  pub total: usize,
  pub answered_symbols: Vec<String>,
  pub mode: QuizMode,
}

impl SessionResult {
  /// Rounded percentage of correct answers.
  pub fn success_rate(&self) -> u32 {
    if self.total == 0 { return 0; }
    ((self.score as f64 / self.total as f64) * 100.0).round() as u32
  }
}
