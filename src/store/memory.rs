use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDate, Utc};
use uuid::Uuid;

use super::{SessionStore, StoreKind};
use crate::db::{PomodoroSession, Round, RoundUpdate, SessionUpdate};

struct StoredSession {
    day: NaiveDate,
    session: PomodoroSession,
}

/// Process-local store used when nothing should be written to disk or network.
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<Vec<StoredSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_sessions<T>(&self, f: impl FnOnce(&mut Vec<StoredSession>) -> Result<T>) -> Result<T> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        f(&mut *guard)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Local
    }

    async fn get_today_session(&self) -> Result<Option<PomodoroSession>> {
        let today = Local::now().date_naive();
        self.with_sessions(|sessions| {
            Ok(sessions
                .iter()
                .rev()
                .find(|stored| stored.day == today)
                .map(|stored| stored.session.clone()))
        })
    }

    async fn create_session(&self) -> Result<PomodoroSession> {
        let now = Utc::now();
        let session = PomodoroSession {
            id: Uuid::new_v4().to_string(),
            is_completed: false,
            created_at: now,
            rounds: vec![Round::new(Uuid::new_v4().to_string(), 1, now)],
        };

        self.with_sessions(|sessions| {
            sessions.push(StoredSession {
                day: Local::now().date_naive(),
                session: session.clone(),
            });
            Ok(())
        })?;
        Ok(session)
    }

    async fn insert_round(&self, session_id: &str, round: &Round) -> Result<()> {
        self.with_sessions(|sessions| {
            let stored = sessions
                .iter_mut()
                .find(|stored| stored.session.id == session_id)
                .ok_or_else(|| anyhow!("Session {session_id} not found"))?;
            if stored.session.rounds.iter().any(|r| r.id == round.id) {
                return Err(anyhow!("Round {} already exists", round.id));
            }
            stored.session.rounds.push(round.clone());
            Ok(())
        })
    }

    async fn update_round(&self, round_id: &str, update: RoundUpdate) -> Result<Round> {
        self.with_sessions(|sessions| {
            let round = sessions
                .iter_mut()
                .flat_map(|stored| stored.session.rounds.iter_mut())
                .find(|round| round.id == round_id)
                .ok_or_else(|| anyhow!("Round {round_id} not found"))?;
            round.total_seconds = update.total_seconds;
            round.is_completed = update.is_completed;
            Ok(round.clone())
        })
    }

    async fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> Result<PomodoroSession> {
        self.with_sessions(|sessions| {
            let stored = sessions
                .iter_mut()
                .find(|stored| stored.session.id == session_id)
                .ok_or_else(|| anyhow!("Session {session_id} not found"))?;
            stored.session.is_completed = update.is_completed;
            Ok(stored.session.clone())
        })
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.with_sessions(|sessions| {
            let before = sessions.len();
            sessions.retain(|stored| stored.session.id != session_id);
            if sessions.len() == before {
                return Err(anyhow!("Session {session_id} not found"));
            }
            Ok(())
        })
    }
}
