//! Minimal OpenAI-compatible client for the two external collaborators:
//! mnemonic stories (chat.completions) and pronunciation (audio.speech).
//!
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{instrument, info, error};

use crate::config::Prompts;
use crate::domain::Radical;
use crate::util::fill_template;

const CLIENT_UA: &str = "hanzi-hero-backend/0.1";

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub tts_model: String,
  pub tts_voice: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let fast_model =
      std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let tts_model =
      std::env::var("OPENAI_TTS_MODEL").unwrap_or_else(|_| "gpt-4o-mini-tts".into());
    let tts_voice =
      std::env::var("OPENAI_TTS_VOICE").unwrap_or_else(|_| "alloy".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, fast_model, tts_model, tts_voice })
  }

  /// Plain-text chat completion.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_plain(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
    max_tokens: Option<u32>,
  ) -> Result<String, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      max_tokens,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, CLIENT_UA)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    Ok(text)
  }

  /// Generate a mnemonic story for one radical. May return an empty string.
  #[instrument(level = "info", skip(self, prompts, radical), fields(character = %radical.character, model = %self.fast_model))]
  pub async fn mnemonic(&self, prompts: &Prompts, radical: &Radical) -> Result<String, String> {
    let user = mnemonic_user_prompt(prompts, radical);
    let start = Instant::now();
    let result = self
      .chat_plain(&self.fast_model, &prompts.mnemonic_system, &user, prompts.mnemonic_temperature, Some(prompts.mnemonic_max_tokens))
      .await;
    match &result {
      Ok(t) => info!(elapsed = ?start.elapsed(), chars = t.chars().count(), "Mnemonic received"),
      Err(e) => error!(elapsed = ?start.elapsed(), error = %e, "Mnemonic generation failed"),
    }
    result
  }

  /// Text-to-speech for a romanized reading. Returns the encoded audio bytes (mp3).
  #[instrument(level = "info", skip(self), fields(model = %self.tts_model))]
  pub async fn speech(&self, reading: &str) -> Result<Vec<u8>, String> {
    let url = format!("{}/audio/speech", self.base_url);
    let req = SpeechRequest {
      model: self.tts_model.clone(),
      input: reading.to_string(),
      voice: self.tts_voice.clone(),
      response_format: "mp3".into(),
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, CLIENT_UA)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let bytes = res.bytes().await.map_err(|e| e.to_string())?;
    info!(elapsed = ?start.elapsed(), bytes = bytes.len(), "Speech audio received");
    Ok(bytes.to_vec())
  }
}

/// Fill the mnemonic prompt from the radical's fields.
pub fn mnemonic_user_prompt(prompts: &Prompts, radical: &Radical) -> String {
  let variant_info = match &radical.variant {
    Some(v) if radical.has_variant() => fill_template(&prompts.mnemonic_variant_info_template, &[("variant", v.as_str())]),
    _ => String::new(),
  };
  let compound_form = radical.variant.as_deref().unwrap_or(&radical.character);
  let examples = radical.examples.join(", ");
  fill_template(
    &prompts.mnemonic_user_template,
    &[
      ("character", radical.character.as_str()),
      ("reading", radical.reading.as_str()),
      ("meaning", radical.meaning.as_str()),
      ("variant_info", variant_info.as_str()),
      ("compound_form", compound_form),
      ("examples", examples.as_str()),
    ],
  )
}

// --- DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Serialize)]
struct SpeechRequest {
  model: String,
  input: String,
  voice: String,
  response_format: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn water() -> Radical {
    Radical {
      character: "水".into(),
      variant: Some("氵".into()),
      reading: "shuǐ".into(),
      meaning: "water".into(),
      difficulty: 1,
      examples: vec!["河".into(), "海".into()],
    }
  }

  #[test]
  fn prompt_mentions_variant_and_examples() {
    let p = mnemonic_user_prompt(&Prompts::default(), &water());
    assert!(p.contains("\"水\" (shuǐ)"));
    assert!(p.contains("variant form \"氵\""));
    assert!(p.contains("transforms into \"氵\""));
    assert!(p.contains("河, 海"));
  }

  #[test]
  fn prompt_without_variant_uses_character() {
    let mut r = water();
    r.variant = None;
    let p = mnemonic_user_prompt(&Prompts::default(), &r);
    assert!(!p.contains("variant form"));
    assert!(p.contains("transforms into \"水\""));
  }

  #[test]
  fn extracts_error_message() {
    let body = r#"{"error":{"message":"bad key","type":"invalid_request_error"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("bad key"));
    assert_eq!(extract_openai_error("nope"), None);
  }
}
