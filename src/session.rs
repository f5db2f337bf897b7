//! Session controller: the one owner of a learner's UI state.
//!
//! It holds the active mode (home / study / quiz / result), the requested
//! quiz length, the running quiz (and its result) or study deck, and it
//! is the only component that writes to the progress tracker on behalf of
//! the learner. Transports (WebSocket) own one controller per connection.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::domain::{GameMode, QuizMode, Radical, SessionResult};
use crate::pinyin::to_pinyin_diacritics;
use crate::progress::ProgressTracker;
use crate::quiz::{QuizError, QuizProgress, QuizSession};
use crate::study::{StudyNavigator, StudyStep};

pub const MIN_QUIZ_LENGTH: u8 = 5;
pub const MAX_QUIZ_LENGTH: u8 = 20;
pub const DEFAULT_QUIZ_LENGTH: u8 = 10;

pub const EXHAUSTED_NOTICE: &str = "You have already seen every radical! Resetting your progress...";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
  #[error("action not available in {0:?} mode")]
  WrongMode(GameMode),
  #[error(transparent)]
  Quiz(#[from] QuizError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizStart {
  pub quiz_id: Uuid,
  pub total: usize,
  /// Learner-visible message, e.g. when the unseen pool ran out.
  pub notice: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerFeedback {
  pub quiz_id: Uuid,
  pub correct: bool,
  pub correct_answer: String,
  pub score: usize,
  /// The quiz is over and the controller is now in `result` mode.
  pub finished: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExampleOut {
  pub glyph: String,
  pub reading: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct StudyCard {
  pub character: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub variant: Option<String>,
  pub reading: String,
  pub meaning: String,
  pub difficulty: u8,
  pub examples: Vec<ExampleOut>,
}

impl StudyCard {
  pub fn from_radical(r: &Radical) -> Self {
    Self {
      character: r.character.clone(),
      variant: if r.has_variant() { r.variant.clone() } else { None },
      reading: r.reading.clone(),
      meaning: r.meaning.clone(),
      difficulty: r.difficulty,
      examples: r
        .examples
        .iter()
        .map(|g| ExampleOut { glyph: g.clone(), reading: to_pinyin_diacritics(g) })
        .collect(),
    }
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct QuestionView {
  pub display: String,
  pub options: Vec<String>,
  /// Revealed once the current question has been answered.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub correct_answer: Option<String>,
}

/// Snapshot of what the learner should see right now.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SessionView {
  Home {
    seen: usize,
    total: usize,
    quiz_length: u8,
  },
  Study {
    index: usize,
    total: usize,
    is_last: bool,
    card: StudyCard,
  },
  Quiz {
    quiz_id: Uuid,
    quiz_mode: QuizMode,
    progress: QuizProgress,
    question: QuestionView,
  },
  Result {
    score: usize,
    total: usize,
    success_rate: u32,
    quiz_mode: QuizMode,
  },
}

pub struct SessionController {
  catalog: Arc<Catalog>,
  tracker: ProgressTracker,
  mode: GameMode,
  quiz_length: u8,
  quiz_mode: QuizMode,
  quiz: QuizSession,
  study: StudyNavigator,
  rng: StdRng,
}

impl SessionController {
  pub fn new(catalog: Arc<Catalog>, tracker: ProgressTracker, quiz_length: u8) -> Self {
    Self::with_rng(catalog, tracker, quiz_length, StdRng::from_entropy())
  }

  pub fn with_rng(catalog: Arc<Catalog>, tracker: ProgressTracker, quiz_length: u8, rng: StdRng) -> Self {
    Self {
      catalog,
      tracker,
      mode: GameMode::Home,
      quiz_length: clamp_quiz_length(quiz_length as u32),
      quiz_mode: QuizMode::default(),
      quiz: QuizSession::default(),
      study: StudyNavigator::new(),
      rng,
    }
  }

  pub fn mode(&self) -> GameMode {
    self.mode
  }

  pub fn quiz_length(&self) -> u8 {
    self.quiz_length
  }

  pub fn quiz_mode(&self) -> QuizMode {
    self.quiz_mode
  }

  pub fn quiz(&self) -> &QuizSession {
    &self.quiz
  }

  pub fn study(&self) -> &StudyNavigator {
    &self.study
  }

  pub fn last_result(&self) -> Option<&SessionResult> {
    self.quiz.result()
  }

  pub fn tracker(&self) -> &ProgressTracker {
    &self.tracker
  }

  pub fn catalog(&self) -> &Catalog {
    &self.catalog
  }

  /// Clamp and store the learner's quiz length. Returns the stored value.
  pub fn set_quiz_length(&mut self, requested: u32) -> u8 {
    self.quiz_length = clamp_quiz_length(requested);
    self.quiz_length
  }

  /// Leave whatever is running. An unfinished quiz is dropped.
  pub fn go_home(&mut self) {
    if self.mode == GameMode::Quiz {
      info!(target: "quiz", quiz_id = %self.quiz.id(), "Quiz abandoned");
    }
    self.quiz = QuizSession::default();
    self.mode = GameMode::Home;
  }

  pub fn start_study(&mut self) {
    self.quiz = QuizSession::default();
    self.study = StudyNavigator::new();
    self.mode = GameMode::Study;
  }

  /// Mark the current card seen and move on; finishing the deck returns home.
  pub fn study_next(&mut self) -> Result<StudyStep, SessionError> {
    self.require(GameMode::Study)?;
    let step = self.study.advance(&self.catalog, &self.tracker);
    if step == StudyStep::Complete {
      self.mode = GameMode::Home;
    }
    Ok(step)
  }

  pub fn study_prev(&mut self) -> Result<(), SessionError> {
    self.require(GameMode::Study)?;
    self.study.retreat();
    Ok(())
  }

  /// Start a fresh quiz. With `only_new`, only unseen radicals are drawn; an
  /// exhausted unseen pool resets progress, falls back to the whole catalog
  /// and reports a notice.
  #[instrument(level = "info", skip(self, mode), fields(mode = mode.as_str()))]
  pub fn start_quiz(&mut self, mode: QuizMode, only_new: bool) -> Result<QuizStart, SessionError> {
    let mut notice = None;
    let mut pool: Vec<Radical> = if only_new {
      self.catalog.unseen(&self.tracker.seen())
    } else {
      self.catalog.radicals().to_vec()
    };

    if pool.is_empty() {
      if only_new {
        warn!(target: "quiz", seen = self.tracker.seen_count(), "Unseen pool exhausted; resetting progress");
        notice = Some(EXHAUSTED_NOTICE.to_string());
        if let Err(e) = self.tracker.reset() {
          error!(target: "progress", error = %e, "Failed to clear persisted progress");
        }
      }
      pool = self.catalog.radicals().to_vec();
    }

    let quiz = QuizSession::start(&pool, &self.catalog, self.quiz_length as usize, mode, &mut self.rng)?;
    let start = QuizStart { quiz_id: quiz.id(), total: quiz.total(), notice };

    self.quiz = quiz;
    self.quiz_mode = mode;
    self.mode = GameMode::Quiz;
    info!(target: "quiz", quiz_id = %start.quiz_id, total = start.total, only_new, pool = pool.len(), "Quiz started");
    Ok(start)
  }

  /// Same quiz mode, whole catalog, freshly sampled questions.
  pub fn retry(&mut self) -> Result<QuizStart, SessionError> {
    self.require(GameMode::Result)?;
    self.start_quiz(self.quiz_mode, false)
  }

  /// Score the current question. `Ok(None)` means it was already answered.
  #[instrument(level = "info", skip(self, raw), fields(raw_len = raw.len()))]
  pub fn submit_answer(&mut self, raw: &str) -> Result<Option<AnswerFeedback>, SessionError> {
    self.require(GameMode::Quiz)?;
    let Some(outcome) = self.quiz.submit_answer(raw)? else {
      return Ok(None);
    };

    let feedback = AnswerFeedback {
      quiz_id: self.quiz.id(),
      correct: outcome.correct,
      correct_answer: outcome.correct_answer,
      score: outcome.score,
      finished: outcome.result.is_some(),
    };
    if feedback.finished {
      self.finish_quiz();
    }
    Ok(Some(feedback))
  }

  /// Move to the next question if `quiz_id` is still the running quiz.
  /// Stale timers from abandoned quizzes are ignored.
  pub fn advance_quiz(&mut self, quiz_id: Uuid) -> bool {
    if self.mode != GameMode::Quiz || self.quiz.id() != quiz_id {
      return false;
    }
    self.quiz.advance().unwrap_or(false)
  }

  pub fn reset_progress(&mut self) {
    if let Err(e) = self.tracker.reset() {
      error!(target: "progress", error = %e, "Failed to clear persisted progress");
    }
  }

  pub fn seen_count(&self) -> usize {
    self.tracker.seen_count()
  }

  pub fn view(&self) -> SessionView {
    match self.mode {
      GameMode::Home => self.home_view(),
      GameMode::Study => match self.study.current(&self.catalog) {
        Some(r) => SessionView::Study {
          index: self.study.index(),
          total: self.catalog.len(),
          is_last: self.study.is_last(&self.catalog),
          card: StudyCard::from_radical(r),
        },
        None => self.home_view(),
      },
      GameMode::Quiz => match self.quiz.current_question() {
        Ok(q) => {
          let progress = self.quiz.progress();
          SessionView::Quiz {
            quiz_id: self.quiz.id(),
            quiz_mode: self.quiz.mode(),
            progress,
            question: QuestionView {
              display: q.display.clone(),
              options: q.options.clone(),
              correct_answer: progress.answered.then(|| q.correct_answer.clone()),
            },
          }
        }
        Err(_) => self.home_view(),
      },
      GameMode::Result => match self.quiz.result() {
        Some(r) => SessionView::Result {
          score: r.score,
          total: r.total,
          success_rate: r.success_rate(),
          quiz_mode: r.mode,
        },
        None => self.home_view(),
      },
    }
  }

  fn home_view(&self) -> SessionView {
    SessionView::Home {
      seen: self.seen_count(),
      total: self.catalog.len(),
      quiz_length: self.quiz_length,
    }
  }

  fn finish_quiz(&mut self) {
    if let Some(result) = self.quiz.result() {
      if let Err(e) = self.tracker.mark_seen(result.answered_symbols.iter().map(String::as_str)) {
        error!(target: "progress", error = %e, "Failed to persist quiz progress");
      }
      info!(target: "quiz", score = result.score, total = result.total, rate = result.success_rate(), "Quiz result stored");
    }
    self.mode = GameMode::Result;
  }

  fn require(&self, mode: GameMode) -> Result<(), SessionError> {
    if self.mode == mode { Ok(()) } else { Err(SessionError::WrongMode(self.mode)) }
  }
}

fn clamp_quiz_length(requested: u32) -> u8 {
  requested.clamp(MIN_QUIZ_LENGTH as u32, MAX_QUIZ_LENGTH as u32) as u8
}
