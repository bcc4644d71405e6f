//! Pomodoro session and round models.
//!
//! A session is one day's worth of rounds. A round's `total_seconds` runs along
//! the combined work+break timeline: the first `work_seconds` belong to the
//! work phase, the following `break_seconds` to the break.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: String,
    /// 1-based position within the session. Rounds coming from a server that
    /// does not send a sequence deserialize as 0 and are ordered by creation time.
    #[serde(default)]
    pub sequence: u32,
    pub total_seconds: u64,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Round {
    pub fn new(id: String, sequence: u32, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            sequence,
            total_seconds: 0,
            is_completed: false,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSession {
    pub id: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub rounds: Vec<Round>,
}

impl PomodoroSession {
    pub fn completed_round_count(&self) -> u32 {
        self.rounds.iter().filter(|round| round.is_completed).count() as u32
    }
}

/// Progress written back for a single round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoundUpdate {
    pub total_seconds: u64,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub is_completed: bool,
}
