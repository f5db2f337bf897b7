//! Application state: radical catalog, progress store, prompts and the optional OpenAI client.
//!
//! This module owns:
//!   - the validated catalog (from TOML or the built-in table)
//!   - the learner's seen-set, shared by every session and HTTP handler
//!   - prompts / quiz tuning (from TOML or defaults)
//!   - optional OpenAI client for mnemonics and pronunciation
//!
//! Per-learner UI state is not here: each WebSocket connection owns its own
//! `SessionController`, created through `new_session`.

use std::{path::PathBuf, sync::Arc};
use tracing::{error, info, instrument};

use crate::catalog::{Catalog, CatalogError};
use crate::config::{load_app_config_from_env, AppConfig, Prompts, QuizConfig};
use crate::openai::OpenAI;
use crate::progress::{FileStore, KeyValueStore, ProgressTracker};
use crate::session::SessionController;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    progress: ProgressTracker,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
    pub quiz: QuizConfig,
}

impl AppState {
    /// Build state from env: load config, pick the catalog, open the progress store, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Result<Self, CatalogError> {
        let cfg = load_app_config_from_env().unwrap_or_default();

        let progress_dir = std::env::var("PROGRESS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        info!(target: "hanzi_hero", dir = %progress_dir.display(), "Progress store");
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(progress_dir));

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "hanzi_hero", base_url = %oa.base_url, fast_model = %oa.fast_model, tts_model = %oa.tts_model, "OpenAI enabled.");
        } else {
            info!(target: "hanzi_hero", "OpenAI disabled (no OPENAI_API_KEY). Using local mnemonics, no audio.");
        }

        Self::with_parts(cfg, store, openai)
    }

    /// Assemble state from already-loaded parts. A configured catalog that fails
    /// validation is logged and replaced by the built-in table.
    pub fn with_parts(
        cfg: AppConfig,
        store: Arc<dyn KeyValueStore>,
        openai: Option<OpenAI>,
    ) -> Result<Self, CatalogError> {
        let catalog = if cfg.radicals.is_empty() {
            Catalog::builtin()?
        } else {
            match Catalog::new(cfg.radicals) {
                Ok(c) => c,
                Err(e) => {
                    error!(target: "hanzi_hero", error = %e, "Configured catalog rejected; using built-in radicals");
                    Catalog::builtin()?
                }
            }
        };
        info!(target: "hanzi_hero", radicals = catalog.len(), meanings = catalog.distinct_meanings().len(), "Catalog ready");

        Ok(Self {
            catalog: Arc::new(catalog),
            progress: ProgressTracker::load(store),
            openai,
            prompts: cfg.prompts,
            quiz: cfg.quiz,
        })
    }

    /// Handle to the one seen-set; writes through it are visible to every session.
    pub fn progress(&self) -> ProgressTracker {
        self.progress.clone()
    }

    /// One controller per connected learner view.
    pub fn new_session(&self) -> SessionController {
        SessionController::new(self.catalog.clone(), self.progress(), self.quiz.default_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::r;
    use crate::progress::{MemoryStore, SEEN_SLOT};
    use crate::study::StudyStep;

    #[test]
    fn invalid_configured_catalog_falls_back_to_builtin() {
        let cfg = AppConfig {
            radicals: vec![r("口", "a"), r("口", "b"), r("人", "c"), r("女", "d")],
            ..AppConfig::default()
        };
        let state = AppState::with_parts(cfg, Arc::new(MemoryStore::default()), None).unwrap();
        assert_eq!(state.catalog.len(), Catalog::builtin().unwrap().len());
    }

    #[test]
    fn valid_configured_catalog_replaces_builtin() {
        let cfg = AppConfig {
            radicals: vec![r("口", "a"), r("人", "b"), r("女", "c"), r("水", "d")],
            ..AppConfig::default()
        };
        let state = AppState::with_parts(cfg, Arc::new(MemoryStore::default()), None).unwrap();
        assert_eq!(state.catalog.len(), 4);
        assert_eq!(state.new_session().quiz_length(), 10);
    }

    #[test]
    fn reset_elsewhere_is_not_undone_by_a_live_session() {
        let store = Arc::new(MemoryStore::default());
        let state = AppState::with_parts(AppConfig::default(), store.clone(), None).unwrap();
        let mut session = state.new_session();

        session.start_study();
        assert_eq!(session.study_next().unwrap(), StudyStep::Moved);
        assert_eq!(session.study_next().unwrap(), StudyStep::Moved);
        assert_eq!(state.progress().seen_count(), 2);

        // What DELETE /api/v1/progress does.
        state.progress().reset().unwrap();
        assert_eq!(session.seen_count(), 0);

        session.study_next().unwrap();
        let third = state.catalog.at(2).unwrap().character.clone();
        assert_eq!(store.get(SEEN_SLOT).unwrap(), Some(format!("[\"{third}\"]")));
    }

    #[test]
    fn two_sessions_merge_their_progress() {
        let store = Arc::new(MemoryStore::default());
        let state = AppState::with_parts(AppConfig::default(), store, None).unwrap();
        let mut a = state.new_session();
        let mut b = state.new_session();

        a.start_study();
        a.study_next().unwrap();
        b.start_study();
        b.study_next().unwrap();
        b.study_next().unwrap();

        assert_eq!(a.seen_count(), 2);
        assert_eq!(state.progress().seen_count(), 2);
    }
}
