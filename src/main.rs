//! Hanzi Hero · Radical Trainer Backend
//!
//! - Axum HTTP + WebSocket API (one learner session per socket)
//! - Optional OpenAI integration for mnemonics and pronunciation
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT              : u16 (default 3000)
//!   OPENAI_API_KEY    : enables OpenAI integration if present
//!   OPENAI_BASE_URL   : default "https://api.openai.com/v1"
//!   OPENAI_FAST_MODEL : default "gpt-4o-mini" (mnemonics)
//!   OPENAI_TTS_MODEL  : default "gpt-4o-mini-tts"
//!   OPENAI_TTS_VOICE  : default "alloy"
//!   HANZI_CONFIG_PATH : path to TOML config (prompts, quiz tuning, optional radical list)
//!   PROGRESS_DIR      : where seen-radical progress is persisted (default "./data")
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use hanzi_hero_backend::routes::build_router;
use hanzi_hero_backend::state::AppState;
use hanzi_hero_backend::telemetry;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Catalog, progress store, OpenAI client and prompts.
  let state = Arc::new(AppState::new()?);
  info!(target: "hanzi_hero", radicals = state.catalog.len(), openai = state.openai.is_some(), "State ready");

  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "hanzi_hero", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "hanzi_hero", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "hanzi_hero", error = %e, "Failed to listen for ctrl-c");
  }
}
