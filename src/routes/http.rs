//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Stateless reads of the catalog and progress, plus the provider helpers.

use std::sync::Arc;
use axum::{extract::{Path, State}, http::StatusCode, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::logic::{do_mnemonic, do_pinyin, do_pronounce};
use crate::protocol::*;
use crate::session::StudyCard;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_radicals(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(state.catalog.radicals().to_vec())
}

#[instrument(level = "info", skip_all, fields(%character))]
pub async fn http_get_radical(
  State(state): State<Arc<AppState>>,
  Path(character): Path<String>,
) -> Result<Json<StudyCard>, AppError> {
  state
    .catalog
    .get(&character)
    .map(|r| Json(StudyCard::from_radical(r)))
    .ok_or_else(|| AppError::NotFound(format!("Unknown radical: {}", character)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let tracker = state.progress();
  Json(ProgressOut {
    seen: tracker.seen().into_iter().collect(),
    seen_count: tracker.seen_count(),
    total: state.catalog.len(),
  })
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_progress(State(state): State<Arc<AppState>>) -> Result<StatusCode, AppError> {
  state.progress().reset()?;
  info!(target: "progress", "Progress reset over HTTP");
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state, body), fields(character = %body.character))]
pub async fn http_post_mnemonic(
  State(state): State<Arc<AppState>>,
  Json(body): Json<MnemonicIn>,
) -> Result<Json<MnemonicOut>, AppError> {
  let radical = state
    .catalog
    .get(&body.character)
    .cloned()
    .ok_or_else(|| AppError::NotFound(format!("Unknown radical: {}", body.character)))?;
  let text = do_mnemonic(&state, &radical).await;
  Ok(Json(MnemonicOut { character: radical.character, text }))
}

#[instrument(level = "info", skip(state, body), fields(reading_len = body.reading.len()))]
pub async fn http_post_pronounce(
  State(state): State<Arc<AppState>>,
  Json(body): Json<PronounceIn>,
) -> Result<Json<PronounceOut>, AppError> {
  if body.reading.trim().is_empty() {
    return Err(AppError::BadRequest("reading must not be empty".into()));
  }
  let audio = do_pronounce(&state, &body.reading).await;
  Ok(Json(PronounceOut {
    mime: audio.as_ref().map(|a| a.mime.to_string()),
    audio_base64: audio.map(|a| a.audio_base64),
  }))
}

#[instrument(level = "info", skip(body), fields(text_len = body.text.len()))]
pub async fn http_post_pinyin(Json(body): Json<PinyinIn>) -> impl IntoResponse {
  Json(PinyinOut { pinyin: do_pinyin(&body.text) })
}
