//! Router assembly. The learner session runs over `/ws`; `/api/v1` carries
//! stateless catalog/progress reads and the provider helpers; anything else
//! falls through to the SPA in `./static`.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

const STATIC_DIR: &str = "./static";

pub fn build_router(state: Arc<AppState>) -> Router {
    let spa = ServeDir::new(STATIC_DIR)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(format!("{STATIC_DIR}/index.html")));

    // Local single-user tool: any origin may talk to it.
    let cors = CorsLayer::permissive();

    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(cors)
        .layer(trace)
        .fallback_service(spa)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(http::http_health))
        .route("/radicals", get(http::http_get_radicals))
        .route("/radicals/:character", get(http::http_get_radical))
        .route("/progress", get(http::http_get_progress).delete(http::http_delete_progress))
        .route("/mnemonic", post(http::http_post_mnemonic))
        .route("/pronounce", post(http::http_post_pronounce))
        .route("/pinyin", post(http::http_post_pinyin))
}
