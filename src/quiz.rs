//! Quiz engine: question generation, answer checking and scoring.
//!
//! A `QuizSession` walks `Idle -> Generating -> InProgress -> Finished`.
//! `InProgress` remembers whether the current question was already answered,
//! so repeated submissions are ignored until the caller advances (after the
//! feedback delay in interactive transports, immediately otherwise).
//! A finished session is never re-entered; retrying builds a new one.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::domain::{QuizMode, QuizQuestion, Radical, SessionResult};

/// Options shown per multiple-choice question.
pub const OPTION_COUNT: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
  #[error("quiz has not started")]
  NotStarted,
  #[error("quiz already started")]
  AlreadyStarted,
  #[error("quiz is finished")]
  Finished,
  #[error("no radicals to quiz on")]
  EmptyPool,
  #[error("answer is empty")]
  EmptyAnswer,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QuizState {
  #[default]
  Idle,
  Generating,
  InProgress { index: usize, answered: bool },
  Finished,
}

/// What the learner gets back for one submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerOutcome {
  pub correct: bool,
  pub correct_answer: String,
  /// Running score including this answer.
  pub score: usize,
  /// Present when this was the final question.
  pub result: Option<SessionResult>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct QuizProgress {
  pub index: usize,
  pub total: usize,
  pub score: usize,
  pub answered: bool,
}

#[derive(Clone, Debug, Default)]
pub struct QuizSession {
  id: Uuid,
  mode: QuizMode,
  questions: Vec<QuizQuestion>,
  state: QuizState,
  score: usize,
  result: Option<SessionResult>,
}

impl QuizSession {
  /// Build and start a quiz of `min(length, pool.len())` questions.
  pub fn start<R: Rng + ?Sized>(
    pool: &[Radical],
    catalog: &Catalog,
    length: usize,
    mode: QuizMode,
    rng: &mut R,
  ) -> Result<Self, QuizError> {
    let mut session = Self::default();
    session.generate(pool, catalog, length, mode, rng)?;
    Ok(session)
  }

  /// Generate the question batch for an idle session.
  #[instrument(level = "debug", skip(self, pool, catalog, mode, rng), fields(pool = pool.len(), mode = mode.as_str()))]
  pub fn generate<R: Rng + ?Sized>(
    &mut self,
    pool: &[Radical],
    catalog: &Catalog,
    length: usize,
    mode: QuizMode,
    rng: &mut R,
  ) -> Result<(), QuizError> {
    if self.state != QuizState::Idle {
      return Err(QuizError::AlreadyStarted);
    }
    if pool.is_empty() {
      return Err(QuizError::EmptyPool);
    }
    self.state = QuizState::Generating;

    let mut sampled = pool.to_vec();
    sampled.shuffle(rng);
    sampled.truncate(length.min(pool.len()));

    let meanings = catalog.distinct_meanings();
    self.questions = sampled
      .into_iter()
      .map(|radical| {
        let options = match mode {
          QuizMode::Choice => build_options(&radical.meaning, &meanings, rng),
          QuizMode::Typed => Vec::new(),
        };
        let display = match (&radical.variant, mode) {
          (Some(v), QuizMode::Typed) if radical.has_variant() && rng.gen_bool(0.5) => v.clone(),
          _ => radical.character.clone(),
        };
        QuizQuestion { correct_answer: radical.meaning.clone(), display, options, radical }
      })
      .collect();

    self.id = Uuid::new_v4();
    self.mode = mode;
    self.score = 0;
    self.result = None;
    self.state = QuizState::InProgress { index: 0, answered: false };
    info!(target: "quiz", quiz_id = %self.id, mode = mode.as_str(), total = self.questions.len(), "Quiz generated");
    Ok(())
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn mode(&self) -> QuizMode {
    self.mode
  }

  pub fn state(&self) -> QuizState {
    self.state
  }

  pub fn total(&self) -> usize {
    self.questions.len()
  }

  pub fn score(&self) -> usize {
    self.score
  }

  pub fn questions(&self) -> &[QuizQuestion] {
    &self.questions
  }

  pub fn result(&self) -> Option<&SessionResult> {
    self.result.as_ref()
  }

  pub fn progress(&self) -> QuizProgress {
    let (index, answered) = match self.state {
      QuizState::InProgress { index, answered } => (index, answered),
      QuizState::Finished => (self.questions.len().saturating_sub(1), true),
      _ => (0, false),
    };
    QuizProgress { index, total: self.questions.len(), score: self.score, answered }
  }

  pub fn current_question(&self) -> Result<&QuizQuestion, QuizError> {
    match self.state {
      QuizState::Idle | QuizState::Generating => Err(QuizError::NotStarted),
      QuizState::Finished => Err(QuizError::Finished),
      QuizState::InProgress { index, .. } => self.questions.get(index).ok_or(QuizError::NotStarted),
    }
  }

  /// Score an answer for the current question.
  ///
  /// Returns `Ok(None)` if this question was already answered. On the last
  /// question the session finishes and the outcome carries the result.
  #[instrument(level = "debug", skip(self, raw), fields(quiz_id = %self.id, raw_len = raw.len()))]
  pub fn submit_answer(&mut self, raw: &str) -> Result<Option<AnswerOutcome>, QuizError> {
    let index = match self.state {
      QuizState::Idle | QuizState::Generating => return Err(QuizError::NotStarted),
      QuizState::Finished => return Err(QuizError::Finished),
      QuizState::InProgress { answered: true, .. } => {
        debug!(target: "quiz", "Answer already submitted for this question; ignoring");
        return Ok(None);
      }
      QuizState::InProgress { index, answered: false } => index,
    };
    let question = self.questions.get(index).ok_or(QuizError::NotStarted)?;

    let correct = match self.mode {
      QuizMode::Choice => raw == question.correct_answer,
      QuizMode::Typed => {
        if raw.trim().is_empty() {
          return Err(QuizError::EmptyAnswer);
        }
        typed_answer_matches(raw, &question.correct_answer)
      }
    };
    let correct_answer = question.correct_answer.clone();
    if correct {
      self.score += 1;
    }

    let result = if index + 1 >= self.questions.len() {
      let result = SessionResult {
        score: self.score,
        total: self.questions.len(),
        answered_symbols: self.questions.iter().map(|q| q.radical.character.clone()).collect(),
        mode: self.mode,
      };
      self.state = QuizState::Finished;
      self.result = Some(result.clone());
      info!(target: "quiz", quiz_id = %self.id, score = result.score, total = result.total, "Quiz finished");
      Some(result)
    } else {
      self.state = QuizState::InProgress { index, answered: true };
      None
    };

    debug!(target: "quiz", index, correct, score = self.score, "Answer scored");
    Ok(Some(AnswerOutcome { correct, correct_answer, score: self.score, result }))
  }

  /// Move past an answered question. `Ok(false)` if the current one is still open.
  pub fn advance(&mut self) -> Result<bool, QuizError> {
    match self.state {
      QuizState::Idle | QuizState::Generating => Err(QuizError::NotStarted),
      QuizState::Finished => Err(QuizError::Finished),
      QuizState::InProgress { answered: false, .. } => Ok(false),
      QuizState::InProgress { index, answered: true } => {
        self.state = QuizState::InProgress { index: index + 1, answered: false };
        Ok(true)
      }
    }
  }
}

/// Correct meaning plus up to three distinct distractors, shuffled.
/// Distractors are drawn without replacement, so this always terminates.
fn build_options<R: Rng + ?Sized>(correct: &str, meanings: &[&str], rng: &mut R) -> Vec<String> {
  let mut distractors: Vec<&str> = meanings.iter().copied().filter(|m| *m != correct).collect();
  distractors.shuffle(rng);

  let mut options = Vec::with_capacity(OPTION_COUNT);
  options.push(correct.to_string());
  options.extend(distractors.into_iter().take(OPTION_COUNT - 1).map(String::from));
  options.shuffle(rng);
  options
}

/// Typed answers are compared trimmed and case-insensitively against each
/// slash-separated alternative and against the whole meaning.
pub fn typed_answer_matches(raw: &str, correct_answer: &str) -> bool {
  let input = raw.trim().to_lowercase();
  let full = correct_answer.trim().to_lowercase();
  input == full || full.split('/').any(|alt| alt.trim() == input)
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use rand::rngs::StdRng;
  use rand::SeedableRng;

  use super::*;
  use crate::catalog::tests::{r, small_catalog};

  fn rng() -> StdRng {
    StdRng::seed_from_u64(7)
  }

  #[test]
  fn question_count_is_capped_by_pool() {
    let catalog = Catalog::builtin().unwrap();
    let pool = catalog.radicals();
    let mut rng = rng();
    for (length, expected) in [(5, 5), (20, 20), (500, pool.len())] {
      let quiz = QuizSession::start(pool, &catalog, length, QuizMode::Choice, &mut rng).unwrap();
      assert_eq!(quiz.total(), expected);
      let unique: HashSet<_> = quiz.questions().iter().map(|q| &q.radical.character).collect();
      assert_eq!(unique.len(), expected);
    }
  }

  #[test]
  fn empty_pool_is_rejected() {
    let catalog = small_catalog();
    let err = QuizSession::start(&[], &catalog, 5, QuizMode::Choice, &mut rng()).unwrap_err();
    assert_eq!(err, QuizError::EmptyPool);
  }

  #[test]
  fn choice_options_are_four_distinct_with_one_correct() {
    let catalog = Catalog::builtin().unwrap();
    let mut rng = rng();
    for _ in 0..20 {
      let quiz = QuizSession::start(catalog.radicals(), &catalog, 10, QuizMode::Choice, &mut rng).unwrap();
      for q in quiz.questions() {
        assert_eq!(q.options.len(), OPTION_COUNT);
        let distinct: HashSet<_> = q.options.iter().collect();
        assert_eq!(distinct.len(), OPTION_COUNT);
        assert_eq!(q.options.iter().filter(|o| **o == q.correct_answer).count(), 1);
      }
    }
  }

  #[test]
  fn distractors_come_from_the_full_catalog() {
    let catalog = small_catalog();
    let pool = vec![r("口", "mouth/opening")];
    let pool_catalog_meanings: HashSet<_> = catalog.distinct_meanings().into_iter().map(String::from).collect();
    let quiz = QuizSession::start(&pool, &catalog, 10, QuizMode::Choice, &mut rng()).unwrap();
    assert_eq!(quiz.total(), 1);
    let q = quiz.current_question().unwrap();
    assert_eq!(q.options.len(), OPTION_COUNT);
    assert!(q.options.iter().all(|o| pool_catalog_meanings.contains(o)));
  }

  #[test]
  fn typed_questions_have_no_options() {
    let catalog = small_catalog();
    let quiz = QuizSession::start(catalog.radicals(), &catalog, 3, QuizMode::Typed, &mut rng()).unwrap();
    assert!(quiz.questions().iter().all(|q| q.options.is_empty()));
  }

  #[test]
  fn typed_display_is_character_or_variant() {
    let catalog = Catalog::builtin().unwrap();
    let quiz = QuizSession::start(catalog.radicals(), &catalog, 100, QuizMode::Typed, &mut rng()).unwrap();
    for q in quiz.questions() {
      let allowed = q.display == q.radical.character || Some(&q.display) == q.radical.variant.as_ref();
      assert!(allowed, "unexpected display {} for {}", q.display, q.radical.character);
    }
  }

  #[test]
  fn typed_matching_accepts_alternatives_case_and_whitespace() {
    assert!(typed_answer_matches(" Mouth ", "mouth/opening"));
    assert!(typed_answer_matches("opening ", "mouth/opening"));
    assert!(typed_answer_matches("MOUTH/OPENING", "mouth/opening"));
    assert!(typed_answer_matches("mouth", "mouth/opening"));
    assert!(!typed_answer_matches("open", "mouth/opening"));
    assert!(!typed_answer_matches("fire", "mouth/opening"));
  }

  #[test]
  fn current_question_before_start_fails() {
    let quiz = QuizSession::default();
    assert_eq!(quiz.current_question().unwrap_err(), QuizError::NotStarted);
    assert_eq!(quiz.state(), QuizState::Idle);
  }

  #[test]
  fn repeat_submissions_are_ignored_until_advance() {
    let catalog = small_catalog();
    let mut quiz = QuizSession::start(catalog.radicals(), &catalog, 3, QuizMode::Choice, &mut rng()).unwrap();
    let answer = quiz.current_question().unwrap().correct_answer.clone();

    let first = quiz.submit_answer(&answer).unwrap().unwrap();
    assert!(first.correct);
    assert_eq!(first.score, 1);
    assert_eq!(quiz.submit_answer(&answer).unwrap(), None);
    assert_eq!(quiz.score(), 1);

    assert!(quiz.advance().unwrap());
    assert!(!quiz.advance().unwrap());
    assert_eq!(quiz.progress().index, 1);
  }

  #[test]
  fn choice_mode_requires_exact_match() {
    let catalog = small_catalog();
    let mut quiz = QuizSession::start(catalog.radicals(), &catalog, 1, QuizMode::Choice, &mut rng()).unwrap();
    let answer = quiz.current_question().unwrap().correct_answer.to_uppercase();
    let outcome = quiz.submit_answer(&answer).unwrap().unwrap();
    assert!(!outcome.correct);
  }

  #[test]
  fn blank_typed_answer_is_rejected_without_consuming_question() {
    let catalog = small_catalog();
    let mut quiz = QuizSession::start(catalog.radicals(), &catalog, 2, QuizMode::Typed, &mut rng()).unwrap();
    assert_eq!(quiz.submit_answer("   ").unwrap_err(), QuizError::EmptyAnswer);
    assert!(!quiz.progress().answered);
  }

  #[test]
  fn final_answer_finishes_with_result() {
    let catalog = small_catalog();
    let mut quiz = QuizSession::start(catalog.radicals(), &catalog, 5, QuizMode::Typed, &mut rng()).unwrap();
    let mut last = None;
    for i in 0..5 {
      let q = quiz.current_question().unwrap().clone();
      let answer = if i < 3 { q.correct_answer.clone() } else { "nope".to_string() };
      let outcome = quiz.submit_answer(&answer).unwrap().unwrap();
      if i < 4 {
        assert!(outcome.result.is_none());
        quiz.advance().unwrap();
      } else {
        last = outcome.result;
      }
    }
    let result = last.unwrap();
    assert_eq!((result.score, result.total), (3, 5));
    assert_eq!(result.success_rate(), 60);
    let presented: Vec<_> = quiz.questions().iter().map(|q| q.radical.character.clone()).collect();
    assert_eq!(result.answered_symbols, presented);
    assert_eq!(quiz.state(), QuizState::Finished);
    assert_eq!(quiz.submit_answer("x").unwrap_err(), QuizError::Finished);
    assert_eq!(quiz.advance().unwrap_err(), QuizError::Finished);
  }

  #[test]
  fn started_session_cannot_be_regenerated() {
    let catalog = small_catalog();
    let mut quiz = QuizSession::start(catalog.radicals(), &catalog, 2, QuizMode::Choice, &mut rng()).unwrap();
    let err = quiz.generate(catalog.radicals(), &catalog, 2, QuizMode::Choice, &mut rng()).unwrap_err();
    assert_eq!(err, QuizError::AlreadyStarted);
  }
}
