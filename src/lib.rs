//! Radical flashcard trainer: catalog, study navigation, quizzes, persisted
//! progress and optional AI helpers, served over HTTP and WebSocket.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod logic;
pub mod openai;
pub mod pinyin;
pub mod progress;
pub mod protocol;
pub mod quiz;
pub mod routes;
pub mod seeds;
pub mod session;
pub mod state;
pub mod study;
pub mod tasks;
pub mod telemetry;
pub mod util;
