//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::QuizMode;
use crate::session::SessionView;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    /// Ask for the current view again.
    State,
    Home,
    StartStudy,
    StudyNext,
    StudyPrev,
    SetQuizLength {
        length: u32,
    },
    StartQuiz {
        mode: QuizMode,
        #[serde(default, rename = "onlyNew")]
        only_new: bool,
    },
    SubmitAnswer {
        answer: String,
    },
    Retry,
    Mnemonic {
        character: String,
    },
    Pronounce {
        reading: String,
    },
    ResetProgress,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    View {
        view: SessionView,
    },
    /// Learner-visible notice (e.g. unseen pool exhausted).
    Notice {
        message: String,
    },
    AnswerResult {
        correct: bool,
        #[serde(rename = "correctAnswer")]
        correct_answer: String,
        score: usize,
        finished: bool,
    },
    Mnemonic {
        character: String,
        text: String,
    },
    /// `audioBase64` is absent when nothing should be played.
    Audio {
        reading: String,
        #[serde(rename = "audioBase64", skip_serializing_if = "Option::is_none")]
        audio_base64: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        mime: Option<String>,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct ProgressOut {
    pub seen: Vec<String>,
    pub seen_count: usize,
    pub total: usize,
}

#[derive(Deserialize)]
pub struct MnemonicIn {
    pub character: String,
}
#[derive(Serialize)]
pub struct MnemonicOut {
    pub character: String,
    pub text: String,
}

#[derive(Deserialize)]
pub struct PronounceIn {
    pub reading: String,
}
#[derive(Serialize)]
pub struct PronounceOut {
    #[serde(rename = "audioBase64")]
    pub audio_base64: Option<String>,
    pub mime: Option<String>,
}

#[derive(Deserialize)]
pub struct PinyinIn {
    pub text: String,
}
#[derive(Serialize)]
pub struct PinyinOut {
    pub pinyin: String,
}
