use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn begin_session(&mut self, session_id: String, started_at: DateTime<Utc>) {
        *self = Self {
            status: SessionStatus::Running,
            session_id: Some(session_id),
            started_at: Some(started_at),
            stopped_at: None,
        };
    }

    /// Marks the session stopped, keeping its id and start time for reporting.
    pub fn stop(&mut self, stopped_at: DateTime<Utc>) {
        self.status = SessionStatus::Stopped;
        self.stopped_at = Some(stopped_at);
    }
}

/// What a session amounted to, reported when it stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub frames_processed: u64,
    pub confirmed_cards: usize,
    pub total: f64,
}
