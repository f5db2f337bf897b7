//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Mnemonic stories (OpenAI, with fallback texts; local template when disabled)
//!   - Pronunciation audio (OpenAI TTS; silently absent on any failure)
//!   - Local pinyin conversion
//!
//! None of these ever return an error to the caller: external failures are
//! logged here and replaced by a fallback.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::{debug, error, instrument, warn};

use crate::domain::Radical;
use crate::pinyin::to_pinyin_diacritics;
use crate::state::AppState;
use crate::util::{is_cjk, trunc_for_log};

pub const AUDIO_MIME: &str = "audio/mpeg";

/// Encoded pronunciation clip ready for the browser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeechAudio {
  pub mime: &'static str,
  pub audio_base64: String,
}

#[instrument(level = "info", skip(state, radical), fields(character = %radical.character))]
pub async fn do_mnemonic(state: &AppState, radical: &Radical) -> String {
  let Some(oa) = &state.openai else {
    debug!(target: "hanzi_hero", "Mnemonic via local template.");
    return local_mnemonic(radical);
  };
  match oa.mnemonic(&state.prompts, radical).await {
    Ok(text) if text.trim().is_empty() => {
      warn!(target: "hanzi_hero", "Empty mnemonic from OpenAI; using fallback text.");
      state.prompts.mnemonic_empty_fallback.clone()
    }
    Ok(text) => {
      debug!(target: "hanzi_hero", preview = %trunc_for_log(&text, 40), "Mnemonic via OpenAI.");
      text
    }
    Err(e) => {
      error!(target: "hanzi_hero", error = %e, "OpenAI mnemonic failed; using fallback text.");
      state.prompts.mnemonic_error_fallback.clone()
    }
  }
}

/// Pronounce a romanized reading. `None` means "play nothing".
#[instrument(level = "info", skip(state), fields(reading_len = reading.len()))]
pub async fn do_pronounce(state: &AppState, reading: &str) -> Option<SpeechAudio> {
  let reading = reading.trim();
  if reading.is_empty() {
    return None;
  }
  let oa = state.openai.as_ref()?;
  match oa.speech(reading).await {
    Ok(bytes) if !bytes.is_empty() => Some(SpeechAudio { mime: AUDIO_MIME, audio_base64: BASE64.encode(bytes) }),
    Ok(_) => {
      warn!(target: "hanzi_hero", "Empty audio from OpenAI; staying silent.");
      None
    }
    Err(e) => {
      warn!(target: "hanzi_hero", error = %e, "Pronunciation failed; staying silent.");
      None
    }
  }
}

#[instrument(level = "info", skip(text), fields(text_len = text.len()))]
pub fn do_pinyin(text: &str) -> String {
  let p = to_pinyin_diacritics(text);
  debug!(target: "hanzi_hero", han = text.chars().filter(|c| is_cjk(*c)).count(), "pinyin conversion.");
  p
}

// -------- Local fallbacks --------

/// Offline mnemonic assembled from the catalog record.
fn local_mnemonic(r: &Radical) -> String {
  let mut out = format!("{} ({}) means \"{}\".", r.character, r.reading, r.meaning.replace('/', "\" or \""));
  if let (true, Some(v)) = (r.has_variant(), &r.variant) {
    out.push_str(&format!(" Inside other characters it shrinks to {}, so watch for that side form.", v));
  }
  if !r.examples.is_empty() {
    let examples: Vec<String> = r
      .examples
      .iter()
      .map(|e| format!("{} ({})", e, to_pinyin_diacritics(e)))
      .collect();
    out.push_str(&format!(" Spot it in {} and let each one remind you of its meaning.", examples.join(", ")));
  }
  out
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::config::AppConfig;
  use crate::progress::MemoryStore;

  fn offline_state() -> AppState {
    AppState::with_parts(AppConfig::default(), Arc::new(MemoryStore::default()), None).unwrap()
  }

  #[tokio::test]
  async fn offline_mnemonic_uses_catalog_fields() {
    let state = offline_state();
    let water = state.catalog.get("水").unwrap().clone();
    let text = do_mnemonic(&state, &water).await;
    assert!(text.starts_with("水 (shuǐ) means \"water\"."));
    assert!(text.contains("氵"));
    assert!(text.contains("河 (hé)"));
  }

  #[tokio::test]
  async fn offline_pronunciation_is_silent() {
    let state = offline_state();
    assert_eq!(do_pronounce(&state, "kǒu").await, None);
    assert_eq!(do_pronounce(&state, "   ").await, None);
  }

  #[test]
  fn slash_meanings_read_naturally() {
    let mouth = Radical {
      character: "口".into(),
      variant: None,
      reading: "kǒu".into(),
      meaning: "mouth/opening".into(),
      difficulty: 1,
      examples: vec![],
    };
    assert_eq!(local_mnemonic(&mouth), "口 (kǒu) means \"mouth\" or \"opening\".");
  }
}
