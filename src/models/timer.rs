// src/models/timer.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events of the per-session countdown stream.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TimerEvent {
    TimerTick(TimerTick),
    TimeExpired(QuestionClosed),
    QuestionClosed(QuestionClosed),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TimerTick {
    pub session_id: Uuid,
    pub question_index: usize,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct QuestionClosed {
    pub session_id: Uuid,
    pub question_index: usize,
    /// Session state the question closed into.
    pub state: String,
}

impl TimerEvent {
    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            TimerEvent::TimerTick(_) => "timer-tick",
            TimerEvent::TimeExpired(_) => "time-expired",
            TimerEvent::QuestionClosed(_) => "question-closed",
        }
    }

    /// Whether the stream ends after this event.
    pub fn is_final(&self) -> bool {
        !matches!(self, TimerEvent::TimerTick(_))
    }
}
