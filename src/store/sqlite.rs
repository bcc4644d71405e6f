use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Local, Utc};
use uuid::Uuid;

use super::{SessionStore, StoreKind};
use crate::db::{Database, PomodoroSession, Round, RoundUpdate, SessionUpdate};

/// Sessions kept in the application database, keyed by local calendar day.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Local
    }

    async fn get_today_session(&self) -> Result<Option<PomodoroSession>> {
        self.db
            .get_pomodoro_session_for_day(Local::now().date_naive())
            .await
    }

    async fn create_session(&self) -> Result<PomodoroSession> {
        let now = Utc::now();
        let session = PomodoroSession {
            id: Uuid::new_v4().to_string(),
            is_completed: false,
            created_at: now,
            rounds: vec![Round::new(Uuid::new_v4().to_string(), 1, now)],
        };

        self.db
            .insert_pomodoro_session(&session, Local::now().date_naive())
            .await?;
        Ok(session)
    }

    async fn insert_round(&self, session_id: &str, round: &Round) -> Result<()> {
        self.db.insert_round(session_id, round).await
    }

    async fn update_round(&self, round_id: &str, update: RoundUpdate) -> Result<Round> {
        self.db
            .update_round_progress(round_id, update, Utc::now())
            .await
    }

    async fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> Result<PomodoroSession> {
        self.db
            .mark_pomodoro_session_completed(session_id, update.is_completed, Utc::now())
            .await
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        if self.db.get_pomodoro_session(session_id).await?.is_none() {
            return Err(anyhow!("Session {session_id} not found"));
        }
        self.db.delete_pomodoro_session(session_id).await
    }
}
