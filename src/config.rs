//! Loading app configuration (prompts, quiz tuning, optional catalog) from TOML.
//!
//! See `AppConfig`, `Prompts` and `QuizConfig` for the expected schema.

use serde::Deserialize;
use tracing::{info, error};

use crate::domain::Radical;
use crate::session::DEFAULT_QUIZ_LENGTH;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub quiz: QuizConfig,
  /// Replaces the built-in catalog when non-empty.
  #[serde(default)]
  pub radicals: Vec<Radical>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
  /// Initial value of the learner's quiz length slider (clamped to 5..=20).
  pub default_length: u8,
  /// How long answer feedback stays on screen before the next question.
  pub feedback_delay_ms: u64,
}

impl Default for QuizConfig {
  fn default() -> Self {
    Self { default_length: DEFAULT_QUIZ_LENGTH, feedback_delay_ms: 1200 }
  }
}

/// Prompts and fallback texts for the mnemonic provider.
/// Template keys: {character} {reading} {meaning} {variant_info} {compound_form} {examples}.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub mnemonic_system: String,
  pub mnemonic_user_template: String,
  pub mnemonic_variant_info_template: String,
  pub mnemonic_temperature: f32,
  pub mnemonic_max_tokens: u32,
  /// Shown when the provider answers with an empty text.
  pub mnemonic_empty_fallback: String,
  /// Shown when the provider call fails.
  pub mnemonic_error_fallback: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      mnemonic_system: "You are an expert Chinese etymology teacher.".into(),
      mnemonic_user_template: "Create a rich, detailed mnemonic story to help remember the Chinese radical \"{character}\" ({reading}), which means \"{meaning}\".\n{variant_info}\nRULES:\n1. The story must be at least 150 characters long.\n2. Explain the visual shape of the character and how it relates to the meaning.\n3. Mention how it transforms into \"{compound_form}\" in actual characters.\n4. Use at least one of these example characters in your story explanation: {examples}.\n5. Make the tone helpful, encouraging, and slightly legendary.".into(),
      mnemonic_variant_info_template: "Important: it also appears as the variant form \"{variant}\" (the 'side' or 'radical' version).".into(),
      mnemonic_temperature: 0.8,
      mnemonic_max_tokens: 1000,
      mnemonic_empty_fallback: "Sorry, no story could be generated right now. Please try again!".into(),
      mnemonic_error_fallback: "The spirits of the radicals are quiet today. Please try again later.".into(),
    }
  }
}

/// Attempt to load `AppConfig` from HANZI_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("HANZI_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "hanzi_hero", %path, radicals = cfg.radicals.len(), "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "hanzi_hero", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "hanzi_hero", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
