use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{format_date, parse_datetime, to_i64, to_u32, to_u64},
    models::{PomodoroSession, Round, RoundUpdate},
};

const SESSION_COLUMNS: &str = "id, is_completed, created_at";
const ROUND_COLUMNS: &str = "id, sequence, total_seconds, is_completed, created_at";

fn row_to_session(row: &Row) -> Result<PomodoroSession> {
    let created_at: String = row.get("created_at")?;

    Ok(PomodoroSession {
        id: row.get("id")?,
        is_completed: row.get("is_completed")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        rounds: Vec::new(),
    })
}

fn row_to_round(row: &Row) -> Result<Round> {
    let created_at: String = row.get("created_at")?;
    let sequence: i64 = row.get("sequence")?;
    let total_seconds: i64 = row.get("total_seconds")?;

    Ok(Round {
        id: row.get("id")?,
        sequence: to_u32(sequence, "sequence")?,
        total_seconds: to_u64(total_seconds, "total_seconds")?,
        is_completed: row.get("is_completed")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn load_rounds(conn: &Connection, session_id: &str) -> Result<Vec<Round>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ROUND_COLUMNS}
         FROM pomodoro_rounds
         WHERE session_id = ?1
         ORDER BY sequence ASC"
    ))?;

    let mut rows = stmt.query(params![session_id])?;
    let mut rounds = Vec::new();
    while let Some(row) = rows.next()? {
        rounds.push(row_to_round(row)?);
    }
    Ok(rounds)
}

fn load_session(conn: &Connection, session_id: &str) -> Result<Option<PomodoroSession>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM pomodoro_sessions WHERE id = ?1"
    ))?;

    let mut rows = stmt.query(params![session_id])?;
    let mut session = match rows.next()? {
        Some(row) => row_to_session(row)?,
        None => return Ok(None),
    };
    session.rounds = load_rounds(conn, &session.id)?;
    Ok(Some(session))
}

fn insert_round_row(conn: &Connection, session_id: &str, round: &Round) -> Result<()> {
    conn.execute(
        "INSERT INTO pomodoro_rounds (id, session_id, sequence, total_seconds, is_completed, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            round.id,
            session_id,
            round.sequence,
            to_i64(round.total_seconds)?,
            round.is_completed,
            round.created_at.to_rfc3339(),
            round.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl Database {
    /// Insert a session together with the rounds it already carries.
    pub async fn insert_pomodoro_session(
        &self,
        session: &PomodoroSession,
        day: NaiveDate,
    ) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO pomodoro_sessions (id, day, is_completed, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    format_date(day),
                    record.is_completed,
                    record.created_at.to_rfc3339(),
                    record.created_at.to_rfc3339(),
                ],
            )?;
            for round in &record.rounds {
                insert_round_row(&tx, &record.id, round)?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Most recently created session for `day`, with its rounds.
    pub async fn get_pomodoro_session_for_day(
        &self,
        day: NaiveDate,
    ) -> Result<Option<PomodoroSession>> {
        self.execute(move |conn| {
            let session_id: Option<String> = {
                let mut stmt = conn.prepare(
                    "SELECT id FROM pomodoro_sessions
                     WHERE day = ?1
                     ORDER BY created_at DESC
                     LIMIT 1",
                )?;
                let mut rows = stmt.query(params![format_date(day)])?;
                let id = match rows.next()? {
                    Some(row) => Some(row.get(0)?),
                    None => None,
                };
                id
            };

            match session_id {
                Some(id) => load_session(conn, &id),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn get_pomodoro_session(&self, session_id: &str) -> Result<Option<PomodoroSession>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| load_session(conn, &session_id))
            .await
    }

    pub async fn mark_pomodoro_session_completed(
        &self,
        session_id: &str,
        is_completed: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<PomodoroSession> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE pomodoro_sessions
                 SET is_completed = ?1,
                     updated_at = ?2
                 WHERE id = ?3",
                params![is_completed, updated_at.to_rfc3339(), session_id],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("Session {session_id} not found"));
            }

            load_session(conn, &session_id)?
                .ok_or_else(|| anyhow!("Session {session_id} not found after update"))
        })
        .await
    }

    /// Delete a session and its rounds.
    ///
    /// Rounds go with it through `ON DELETE CASCADE`. Deleting a session that
    /// is already gone is not an error.
    pub async fn delete_pomodoro_session(&self, session_id: &str) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM pomodoro_sessions WHERE id = ?1",
                params![session_id],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn insert_round(&self, session_id: &str, round: &Round) -> Result<()> {
        let session_id = session_id.to_string();
        let record = round.clone();
        self.execute(move |conn| insert_round_row(conn, &session_id, &record))
            .await
    }

    pub async fn update_round_progress(
        &self,
        round_id: &str,
        update: RoundUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Round> {
        let round_id = round_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE pomodoro_rounds
                 SET total_seconds = ?1,
                     is_completed = ?2,
                     updated_at = ?3
                 WHERE id = ?4",
                params![
                    to_i64(update.total_seconds)?,
                    update.is_completed,
                    updated_at.to_rfc3339(),
                    round_id,
                ],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("Round {round_id} not found"));
            }

            let mut stmt = conn.prepare(&format!(
                "SELECT {ROUND_COLUMNS} FROM pomodoro_rounds WHERE id = ?1"
            ))?;
            let mut rows = stmt.query(params![round_id])?;
            let round = match rows.next()? {
                Some(row) => row_to_round(row)?,
                None => return Err(anyhow!("Round {round_id} not found after update")),
            };
            Ok(round)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn open() -> (TempDir, Database) {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("sessions.sqlite3")).unwrap();
        (dir, db)
    }

    fn session_with_round(id: &str, created_at: DateTime<Utc>) -> PomodoroSession {
        PomodoroSession {
            id: id.to_string(),
            is_completed: false,
            created_at,
            rounds: vec![Round::new(format!("{id}-r1"), 1, created_at)],
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[tokio::test]
    async fn stores_and_loads_session_with_rounds() {
        let (_dir, db) = open();
        let session = session_with_round("s1", Utc::now());
        db.insert_pomodoro_session(&session, day()).await.unwrap();

        let loaded = db.get_pomodoro_session_for_day(day()).await.unwrap().unwrap();
        assert_eq!(loaded.id, "s1");
        assert_eq!(loaded.rounds.len(), 1);
        assert_eq!(loaded.rounds[0].sequence, 1);
        assert_eq!(loaded.rounds[0].total_seconds, 0);

        let other_day = day().succ_opt().unwrap();
        assert!(db.get_pomodoro_session_for_day(other_day).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn picks_latest_session_for_day() {
        let (_dir, db) = open();
        let earlier = Utc::now() - chrono::Duration::hours(2);
        db.insert_pomodoro_session(&session_with_round("old", earlier), day())
            .await
            .unwrap();
        db.insert_pomodoro_session(&session_with_round("new", Utc::now()), day())
            .await
            .unwrap();

        let loaded = db.get_pomodoro_session_for_day(day()).await.unwrap().unwrap();
        assert_eq!(loaded.id, "new");
    }

    #[tokio::test]
    async fn updates_round_progress() {
        let (_dir, db) = open();
        db.insert_pomodoro_session(&session_with_round("s1", Utc::now()), day())
            .await
            .unwrap();

        let round = db
            .update_round_progress(
                "s1-r1",
                RoundUpdate {
                    total_seconds: 1500,
                    is_completed: false,
                },
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(round.total_seconds, 1500);
        assert!(!round.is_completed);

        let missing = db
            .update_round_progress(
                "nope",
                RoundUpdate {
                    total_seconds: 1,
                    is_completed: false,
                },
                Utc::now(),
            )
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn inserts_follow_up_round_and_completes_session() {
        let (_dir, db) = open();
        let now = Utc::now();
        db.insert_pomodoro_session(&session_with_round("s1", now), day())
            .await
            .unwrap();
        db.insert_round("s1", &Round::new("s1-r2".into(), 2, now))
            .await
            .unwrap();

        let session = db
            .mark_pomodoro_session_completed("s1", true, Utc::now())
            .await
            .unwrap();
        assert!(session.is_completed);
        let ids: Vec<_> = session.rounds.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["s1-r1", "s1-r2"]);
    }

    #[tokio::test]
    async fn duplicate_sequence_is_rejected() {
        let (_dir, db) = open();
        let now = Utc::now();
        db.insert_pomodoro_session(&session_with_round("s1", now), day())
            .await
            .unwrap();

        let result = db.insert_round("s1", &Round::new("dup".into(), 1, now)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn delete_cascades_to_rounds() {
        let (_dir, db) = open();
        db.insert_pomodoro_session(&session_with_round("s1", Utc::now()), day())
            .await
            .unwrap();

        db.delete_pomodoro_session("s1").await.unwrap();
        assert!(db.get_pomodoro_session("s1").await.unwrap().is_none());

        let orphans: i64 = db
            .execute(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM pomodoro_rounds", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(orphans, 0);

        // Deleting twice is tolerated.
        db.delete_pomodoro_session("s1").await.unwrap();
    }
}
