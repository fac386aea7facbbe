use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Idle,
    Running,
    Stopped,
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Idle
    }
}

/// Mutable state of one polling session, shared between the controller
/// surface and the polling loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: SessionStatus,
    /// True while a recognition request is in flight. At most one attempt
    /// is ever pending per session.
    pub pending_attempt: bool,
    pub last_message: String,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            pending_attempt: false,
            last_message: String::new(),
            session_id: None,
            started_at: None,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, session_id: String, started_at: DateTime<Utc>) {
        *self = Self {
            status: SessionStatus::Running,
            pending_attempt: false,
            last_message: "Looking for a face...".into(),
            session_id: Some(session_id),
            started_at: Some(started_at),
        };
    }

    /// Idempotent; keeps the last message and session id for rendering.
    pub fn stop(&mut self) {
        self.status = SessionStatus::Stopped;
        self.pending_attempt = false;
    }

    pub fn record_message(&mut self, message: impl Into<String>) {
        self.last_message = message.into();
    }
}
