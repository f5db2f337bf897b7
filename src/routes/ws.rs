//! WebSocket upgrade + session loop. Each connection owns one `SessionController`.
//!
//! Client messages are parsed as JSON and applied to the controller; replies
//! go back in order. Provider calls (mnemonic, pronunciation) run as
//! view-scoped tasks and the answer-feedback delay runs as a timer; both post
//! back into this loop through a channel, so the loop never blocks on them.

use std::{sync::Arc, time::Duration};
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::mpsc;
use tracing::{info, error, instrument, debug};
use uuid::Uuid;

use crate::domain::GameMode;
use crate::logic::{do_mnemonic, do_pronounce};
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::session::{QuizStart, SessionController, SessionError};
use crate::state::AppState;
use crate::tasks::ViewTasks;

/// Events produced off the loop and delivered back into it.
#[derive(Debug)]
enum Internal {
  /// Result of a view-scoped provider task.
  Reply { generation: u64, msg: ServerWsMessage },
  /// The answer feedback for `quiz_id` has been shown long enough.
  FeedbackElapsed { quiz_id: Uuid, finished: bool },
}

/// Identity of what the learner is looking at; a change ends the view scope.
#[derive(PartialEq, Eq)]
struct ViewKey {
  mode: GameMode,
  study_index: usize,
  quiz_id: Uuid,
}

fn view_key(session: &SessionController) -> ViewKey {
  ViewKey { mode: session.mode(), study_index: session.study().index(), quiz_id: session.quiz().id() }
}

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "hanzi_hero", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state), fields(session_id = %Uuid::new_v4()))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "hanzi_hero", "WebSocket connected");
  let mut session = state.new_session();
  let mut tasks = ViewTasks::new();
  let (tx, mut rx) = mpsc::unbounded_channel::<Internal>();

  if send(&mut socket, &ServerWsMessage::View { view: session.view() }).await.is_err() {
    return;
  }

  'conn: loop {
    let replies = tokio::select! {
      incoming = socket.recv() => match incoming {
        Some(Ok(Message::Text(txt))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(msg) => {
            debug!(target: "hanzi_hero", "WS received: {:?}", &msg);
            dispatch(msg, &state, &mut session, &mut tasks, &tx)
          }
          Err(e) => vec![ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }],
        },
        Some(Ok(Message::Ping(payload))) => {
          let _ = socket.send(Message::Pong(payload)).await;
          continue;
        }
        Some(Ok(Message::Close(_))) | None => break,
        Some(Ok(_)) => continue,
        Some(Err(e)) => {
          error!(target: "hanzi_hero", error = %e, "WS receive error");
          break;
        }
      },
      Some(event) = rx.recv() => handle_internal(event, &mut session, &tasks),
    };

    for reply in replies {
      if send(&mut socket, &reply).await.is_err() {
        break 'conn;
      }
    }
  }
  info!(target: "hanzi_hero", pending = tasks.pending(), "WebSocket disconnected");
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await.map_err(|e| {
    error!(target: "hanzi_hero", error = %e, "WS send error");
    e
  })
}

/// Apply one client message; leaving the current view ends its task scope.
fn dispatch(
  msg: ClientWsMessage,
  state: &Arc<AppState>,
  session: &mut SessionController,
  tasks: &mut ViewTasks,
  tx: &mpsc::UnboundedSender<Internal>,
) -> Vec<ServerWsMessage> {
  let before = view_key(session);
  let replies = handle_client_ws(msg, state, session, tasks, tx);
  if view_key(session) != before {
    tasks.reset();
  }
  replies
}

fn handle_client_ws(
  msg: ClientWsMessage,
  state: &Arc<AppState>,
  session: &mut SessionController,
  tasks: &mut ViewTasks,
  tx: &mpsc::UnboundedSender<Internal>,
) -> Vec<ServerWsMessage> {
  let view = |s: &SessionController| ServerWsMessage::View { view: s.view() };

  match msg {
    ClientWsMessage::Ping => vec![ServerWsMessage::Pong],

    ClientWsMessage::State => vec![view(session)],

    ClientWsMessage::Home => {
      session.go_home();
      vec![view(session)]
    }

    ClientWsMessage::StartStudy => {
      session.start_study();
      vec![view(session)]
    }

    ClientWsMessage::StudyNext => match session.study_next() {
      Ok(step) => {
        debug!(target: "study", ?step, index = session.study().index(), "WS study_next");
        vec![view(session)]
      }
      Err(e) => vec![error_msg(e)],
    },

    ClientWsMessage::StudyPrev => match session.study_prev() {
      Ok(()) => vec![view(session)],
      Err(e) => vec![error_msg(e)],
    },

    ClientWsMessage::SetQuizLength { length } => {
      let stored = session.set_quiz_length(length);
      debug!(target: "quiz", requested = length, stored, "WS quiz length set");
      vec![view(session)]
    }

    ClientWsMessage::StartQuiz { mode, only_new } => quiz_started(session.start_quiz(mode, only_new), session),

    ClientWsMessage::Retry => quiz_started(session.retry(), session),

    ClientWsMessage::SubmitAnswer { answer } => match session.submit_answer(&answer) {
      Ok(Some(fb)) => {
        info!(target: "quiz", quiz_id = %fb.quiz_id, correct = fb.correct, score = fb.score, finished = fb.finished, "WS answer evaluated");
        let delay = Duration::from_millis(state.quiz.feedback_delay_ms);
        let timer_tx = tx.clone();
        let (quiz_id, finished) = (fb.quiz_id, fb.finished);
        tokio::spawn(async move {
          tokio::time::sleep(delay).await;
          let _ = timer_tx.send(Internal::FeedbackElapsed { quiz_id, finished });
        });
        vec![ServerWsMessage::AnswerResult {
          correct: fb.correct,
          correct_answer: fb.correct_answer,
          score: fb.score,
          finished: fb.finished,
        }]
      }
      Ok(None) => {
        debug!(target: "quiz", "Duplicate answer ignored");
        vec![]
      }
      Err(e) => vec![error_msg(e)],
    },

    ClientWsMessage::Mnemonic { character } => {
      let Some(radical) = state.catalog.get(&character).cloned() else {
        return vec![ServerWsMessage::Error { message: format!("Unknown radical: {}", character) }];
      };
      let (state, tx, generation) = (state.clone(), tx.clone(), tasks.generation());
      tasks.spawn(async move {
        let text = do_mnemonic(&state, &radical).await;
        let msg = ServerWsMessage::Mnemonic { character: radical.character, text };
        let _ = tx.send(Internal::Reply { generation, msg });
      });
      vec![]
    }

    ClientWsMessage::Pronounce { reading } => {
      let (state, tx, generation) = (state.clone(), tx.clone(), tasks.generation());
      tasks.spawn(async move {
        let audio = do_pronounce(&state, &reading).await;
        let msg = ServerWsMessage::Audio {
          reading,
          mime: audio.as_ref().map(|a| a.mime.to_string()),
          audio_base64: audio.map(|a| a.audio_base64),
        };
        let _ = tx.send(Internal::Reply { generation, msg });
      });
      vec![]
    }

    ClientWsMessage::ResetProgress => {
      session.reset_progress();
      info!(target: "progress", "WS progress reset");
      vec![view(session)]
    }
  }
}

fn handle_internal(event: Internal, session: &mut SessionController, tasks: &ViewTasks) -> Vec<ServerWsMessage> {
  match event {
    Internal::Reply { generation, msg } => {
      if tasks.is_current(generation) {
        vec![msg]
      } else {
        debug!(target: "hanzi_hero", generation, "Dropping reply for a closed view");
        vec![]
      }
    }
    Internal::FeedbackElapsed { quiz_id, finished } => {
      let show = if finished {
        session.mode() == GameMode::Result && session.quiz().id() == quiz_id
      } else {
        session.advance_quiz(quiz_id)
      };
      if show { vec![ServerWsMessage::View { view: session.view() }] } else { vec![] }
    }
  }
}

fn quiz_started(started: Result<QuizStart, SessionError>, session: &SessionController) -> Vec<ServerWsMessage> {
  match started {
    Ok(start) => {
      let mut out = Vec::with_capacity(2);
      if let Some(message) = start.notice {
        out.push(ServerWsMessage::Notice { message });
      }
      out.push(ServerWsMessage::View { view: session.view() });
      out
    }
    Err(e) => vec![error_msg(e)],
  }
}

fn error_msg(e: SessionError) -> ServerWsMessage {
  ServerWsMessage::Error { message: e.to_string() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::tests::r;
  use crate::config::AppConfig;
  use crate::domain::QuizMode;
  use crate::progress::MemoryStore;
  use crate::session::{SessionView, EXHAUSTED_NOTICE};

  fn state() -> Arc<AppState> {
    let mut cfg = AppConfig {
      radicals: vec![r("人", "person"), r("口", "mouth/opening"), r("女", "woman"), r("水", "water"), r("火", "fire")],
      ..AppConfig::default()
    };
    cfg.quiz.feedback_delay_ms = 0;
    Arc::new(AppState::with_parts(cfg, Arc::new(MemoryStore::default()), None).unwrap())
  }

  fn quiz_index(replies: &[ServerWsMessage]) -> Option<usize> {
    match replies {
      [ServerWsMessage::View { view: SessionView::Quiz { progress, .. } }] => Some(progress.index),
      _ => None,
    }
  }

  #[test]
  fn feedback_elapsed_advances_then_shows_result() {
    let state = state();
    let mut session = state.new_session();
    let tasks = ViewTasks::new();
    let start = session.start_quiz(QuizMode::Choice, false).unwrap();
    assert_eq!(start.total, 5);

    for i in 0..start.total {
      let answer = session.quiz().current_question().unwrap().correct_answer.clone();
      let fb = session.submit_answer(&answer).unwrap().unwrap();
      let replies = handle_internal(
        Internal::FeedbackElapsed { quiz_id: fb.quiz_id, finished: fb.finished },
        &mut session,
        &tasks,
      );
      if i + 1 < start.total {
        assert_eq!(quiz_index(&replies), Some(i + 1));
      } else {
        assert!(matches!(
          replies.as_slice(),
          [ServerWsMessage::View { view: SessionView::Result { score: 5, total: 5, success_rate: 100, .. } }]
        ));
      }
    }
  }

  #[test]
  fn feedback_for_an_abandoned_quiz_is_ignored() {
    let state = state();
    let mut session = state.new_session();
    let tasks = ViewTasks::new();
    let first = session.start_quiz(QuizMode::Choice, false).unwrap();
    let answer = session.quiz().current_question().unwrap().correct_answer.clone();
    session.submit_answer(&answer).unwrap();
    session.go_home();
    session.start_quiz(QuizMode::Choice, false).unwrap();

    let replies = handle_internal(Internal::FeedbackElapsed { quiz_id: first.quiz_id, finished: false }, &mut session, &tasks);
    assert!(replies.is_empty());
    let replies = handle_internal(Internal::FeedbackElapsed { quiz_id: first.quiz_id, finished: true }, &mut session, &tasks);
    assert!(replies.is_empty());
    assert_eq!(session.quiz().progress().index, 0);
  }

  #[test]
  fn replies_from_an_older_view_are_dropped() {
    let state = state();
    let mut session = state.new_session();
    let mut tasks = ViewTasks::new();
    let old = tasks.generation();
    tasks.reset();

    let stale = handle_internal(Internal::Reply { generation: old, msg: ServerWsMessage::Pong }, &mut session, &tasks);
    assert!(stale.is_empty());
    let current = tasks.generation();
    let fresh = handle_internal(Internal::Reply { generation: current, msg: ServerWsMessage::Pong }, &mut session, &tasks);
    assert!(matches!(fresh.as_slice(), [ServerWsMessage::Pong]));
  }

  #[test]
  fn exhausted_pool_sends_notice_before_view() {
    let state = state();
    let all: Vec<String> = state.catalog.radicals().iter().map(|r| r.character.clone()).collect();
    state.progress().mark_seen(all).unwrap();
    let mut session = state.new_session();

    let replies = quiz_started(session.start_quiz(QuizMode::Typed, true), &session);
    match replies.as_slice() {
      [ServerWsMessage::Notice { message }, ServerWsMessage::View { view: SessionView::Quiz { .. } }] => {
        assert_eq!(message, EXHAUSTED_NOTICE);
      }
      other => panic!("unexpected replies {other:?}"),
    }
    assert_eq!(state.progress().seen_count(), 0);
  }

  #[test]
  fn retry_outside_result_is_an_error_message() {
    let state = state();
    let mut session = state.new_session();
    let replies = quiz_started(session.retry(), &session);
    assert!(matches!(replies.as_slice(), [ServerWsMessage::Error { .. }]));
  }

  #[tokio::test]
  async fn leaving_a_view_starts_a_new_task_generation() {
    let state = state();
    let mut session = state.new_session();
    let mut tasks = ViewTasks::new();
    let (tx, _rx) = mpsc::unbounded_channel();

    let g0 = tasks.generation();
    dispatch(ClientWsMessage::State, &state, &mut session, &mut tasks, &tx);
    dispatch(ClientWsMessage::SetQuizLength { length: 7 }, &state, &mut session, &mut tasks, &tx);
    assert_eq!(tasks.generation(), g0);

    dispatch(ClientWsMessage::StartStudy, &state, &mut session, &mut tasks, &tx);
    assert_eq!(tasks.generation(), g0 + 1);
    dispatch(ClientWsMessage::StudyNext, &state, &mut session, &mut tasks, &tx);
    assert_eq!(tasks.generation(), g0 + 2);
    dispatch(ClientWsMessage::Home, &state, &mut session, &mut tasks, &tx);
    assert_eq!(tasks.generation(), g0 + 3);
  }

  #[tokio::test]
  async fn mnemonic_reply_comes_back_tagged_with_the_view() {
    let state = state();
    let mut session = state.new_session();
    let mut tasks = ViewTasks::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let replies = dispatch(ClientWsMessage::Mnemonic { character: "口".into() }, &state, &mut session, &mut tasks, &tx);
    assert!(replies.is_empty());

    let event = rx.recv().await.unwrap();
    let out = handle_internal(event, &mut session, &tasks);
    match out.as_slice() {
      [ServerWsMessage::Mnemonic { character, text }] => {
        assert_eq!(character, "口");
        assert!(text.starts_with("口"));
      }
      other => panic!("unexpected replies {other:?}"),
    }

    let replies = dispatch(ClientWsMessage::Mnemonic { character: "龘".into() }, &state, &mut session, &mut tasks, &tx);
    assert!(matches!(replies.as_slice(), [ServerWsMessage::Error { .. }]));
  }

  #[tokio::test]
  async fn answer_feedback_timer_advances_the_quiz() {
    let state = state();
    let mut session = state.new_session();
    let mut tasks = ViewTasks::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    dispatch(ClientWsMessage::StartQuiz { mode: QuizMode::Choice, only_new: false }, &state, &mut session, &mut tasks, &tx);
    let answer = session.quiz().current_question().unwrap().correct_answer.clone();
    let replies = dispatch(ClientWsMessage::SubmitAnswer { answer: answer.clone() }, &state, &mut session, &mut tasks, &tx);
    assert!(matches!(
      replies.as_slice(),
      [ServerWsMessage::AnswerResult { correct: true, score: 1, finished: false, .. }]
    ));

    // A second submit for the same question is ignored.
    let again = dispatch(ClientWsMessage::SubmitAnswer { answer }, &state, &mut session, &mut tasks, &tx);
    assert!(again.is_empty());

    let event = rx.recv().await.unwrap();
    assert!(matches!(event, Internal::FeedbackElapsed { finished: false, .. }));
    let out = handle_internal(event, &mut session, &tasks);
    assert_eq!(quiz_index(&out), Some(1));
  }
}
