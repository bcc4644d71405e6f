//! Where Pomodoro sessions live.
//!
//! The timer talks to exactly one [`SessionStore`], chosen once when the
//! application starts. Local stores always answer; the remote store may fail,
//! and the timer reacts differently to an unreachable remote at start-up (see
//! [`StoreKind`]).

pub mod http;
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::db::{Database, PomodoroSession, Round, RoundUpdate, SessionUpdate};
use crate::settings::{BackendMode, BackendSettings};

pub use http::HttpStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// State is kept on this machine. A failed load falls back to a fresh
    /// in-memory round.
    Local,
    /// State belongs to a server. A failed load leaves the timer loading.
    Remote,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    /// Today's session, if one has been created.
    async fn get_today_session(&self) -> Result<Option<PomodoroSession>>;

    /// Create today's session. The new session carries its first round.
    async fn create_session(&self) -> Result<PomodoroSession>;

    /// Persist a round created on the client side.
    async fn insert_round(&self, session_id: &str, round: &Round) -> Result<()>;

    async fn update_round(&self, round_id: &str, update: RoundUpdate) -> Result<Round>;

    async fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> Result<PomodoroSession>;

    /// Remove a session and its rounds. An unknown id is an error.
    async fn delete_session(&self, session_id: &str) -> Result<()>;
}

pub fn from_settings(settings: &BackendSettings, db: &Database) -> Result<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match settings.mode {
        BackendMode::Memory => Arc::new(MemoryStore::new()),
        BackendMode::Sqlite => Arc::new(SqliteStore::new(db.clone())),
        BackendMode::Remote => Arc::new(HttpStore::new(
            &settings.api_url,
            settings.access_token.as_deref(),
        )?),
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn builds_store_matching_mode() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("store.sqlite3")).unwrap();

        let mut settings = BackendSettings::default();
        settings.mode = BackendMode::Memory;
        assert_eq!(from_settings(&settings, &db).unwrap().kind(), StoreKind::Local);

        settings.mode = BackendMode::Sqlite;
        assert_eq!(from_settings(&settings, &db).unwrap().kind(), StoreKind::Local);

        settings.mode = BackendMode::Remote;
        assert_eq!(from_settings(&settings, &db).unwrap().kind(), StoreKind::Remote);
    }
}
