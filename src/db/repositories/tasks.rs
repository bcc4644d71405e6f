use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{format_date, parse_datetime, parse_optional_date, parse_priority},
    models::{Task, TaskPatch},
};

const TASK_COLUMNS: &str = "id, name, priority, is_completed, scheduled_date, created_at";

// Unscheduled tasks sort after every dated task.
const TASK_ORDER: &str = "ORDER BY scheduled_date IS NULL, scheduled_date ASC, created_at ASC";

fn row_to_task(row: &Row) -> Result<Task> {
    let priority: String = row.get("priority")?;
    let scheduled_date: Option<String> = row.get("scheduled_date")?;
    let created_at: String = row.get("created_at")?;

    Ok(Task {
        id: row.get("id")?,
        name: row.get("name")?,
        priority: parse_priority(&priority)?,
        is_completed: row.get("is_completed")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        scheduled_date: parse_optional_date(scheduled_date, "scheduled_date")?,
    })
}

fn load_task(conn: &Connection, task_id: &str) -> Result<Task> {
    let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;
    let mut rows = stmt.query(params![task_id])?;
    let task = match rows.next()? {
        Some(row) => row_to_task(row)?,
        None => return Err(anyhow!("Task {task_id} not found")),
    };
    Ok(task)
}

impl Database {
    pub async fn insert_task(&self, task: &Task) -> Result<()> {
        let record = task.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO tasks (id, name, priority, is_completed, scheduled_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.name,
                    record.priority.as_str(),
                    record.is_completed,
                    record.scheduled_date.map(format_date),
                    record.created_at.to_rfc3339(),
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        let task_id = task_id.to_string();
        self.execute(move |conn| load_task(conn, &task_id)).await
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks {TASK_ORDER}"))?;
            let mut rows = stmt.query([])?;
            let mut tasks = Vec::new();
            while let Some(row) = rows.next()? {
                tasks.push(row_to_task(row)?);
            }
            Ok(tasks)
        })
        .await
    }

    /// Tasks scheduled in the inclusive range `[from, to]`.
    pub async fn list_tasks_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Task>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE scheduled_date BETWEEN ?1 AND ?2
                 {TASK_ORDER}"
            ))?;
            let mut rows = stmt.query(params![format_date(from), format_date(to)])?;
            let mut tasks = Vec::new();
            while let Some(row) = rows.next()? {
                tasks.push(row_to_task(row)?);
            }
            Ok(tasks)
        })
        .await
    }

    pub async fn update_task(
        &self,
        task_id: &str,
        patch: TaskPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Task> {
        let task_id = task_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE tasks
                 SET name = COALESCE(?1, name),
                     priority = COALESCE(?2, priority),
                     is_completed = COALESCE(?3, is_completed),
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    patch.name,
                    patch.priority.map(|p| p.as_str()),
                    patch.is_completed,
                    updated_at.to_rfc3339(),
                    task_id,
                ],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("Task {task_id} not found"));
            }

            load_task(conn, &task_id)
        })
        .await
    }

    /// Flip completion in a single statement so concurrent toggles don't race.
    pub async fn toggle_task(&self, task_id: &str, updated_at: DateTime<Utc>) -> Result<Task> {
        let task_id = task_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE tasks
                 SET is_completed = NOT is_completed,
                     updated_at = ?1
                 WHERE id = ?2",
                params![updated_at.to_rfc3339(), task_id],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("Task {task_id} not found"));
            }

            load_task(conn, &task_id)
        })
        .await
    }

    pub async fn set_task_date(
        &self,
        task_id: &str,
        scheduled_date: Option<NaiveDate>,
        updated_at: DateTime<Utc>,
    ) -> Result<Task> {
        let task_id = task_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE tasks
                 SET scheduled_date = ?1,
                     updated_at = ?2
                 WHERE id = ?3",
                params![
                    scheduled_date.map(format_date),
                    updated_at.to_rfc3339(),
                    task_id,
                ],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("Task {task_id} not found"));
            }

            load_task(conn, &task_id)
        })
        .await
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<()> {
        let task_id = task_id.to_string();
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;

            if rows_affected == 0 {
                return Err(anyhow!("Task {task_id} not found"));
            }

            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::TaskPriority;
    use tempfile::{tempdir, TempDir};

    fn open() -> (TempDir, Database) {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("tasks.sqlite3")).unwrap();
        (dir, db)
    }

    fn task(id: &str, date: Option<NaiveDate>) -> Task {
        Task {
            id: id.to_string(),
            name: format!("task {id}"),
            priority: TaskPriority::Medium,
            is_completed: false,
            created_at: Utc::now(),
            scheduled_date: date,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
    }

    #[tokio::test]
    async fn lists_dated_tasks_before_unscheduled() {
        let (_dir, db) = open();
        db.insert_task(&task("floating", None)).await.unwrap();
        db.insert_task(&task("later", Some(date(21)))).await.unwrap();
        db.insert_task(&task("sooner", Some(date(19)))).await.unwrap();

        let ids: Vec<_> = db
            .list_tasks()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["sooner", "later", "floating"]);
    }

    #[tokio::test]
    async fn filters_by_date_range() {
        let (_dir, db) = open();
        db.insert_task(&task("a", Some(date(19)))).await.unwrap();
        db.insert_task(&task("b", Some(date(25)))).await.unwrap();
        db.insert_task(&task("c", None)).await.unwrap();

        let tasks = db.list_tasks_between(date(19), date(20)).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "a");
    }

    #[tokio::test]
    async fn patch_leaves_unset_fields_alone() {
        let (_dir, db) = open();
        db.insert_task(&task("a", None)).await.unwrap();

        let updated = db
            .update_task(
                "a",
                TaskPatch {
                    priority: Some(TaskPriority::High),
                    ..TaskPatch::default()
                },
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(updated.priority, TaskPriority::High);
        assert_eq!(updated.name, "task a");
        assert!(!updated.is_completed);
    }

    #[tokio::test]
    async fn toggles_and_moves_tasks() {
        let (_dir, db) = open();
        db.insert_task(&task("a", Some(date(19)))).await.unwrap();

        assert!(db.toggle_task("a", Utc::now()).await.unwrap().is_completed);
        assert!(!db.toggle_task("a", Utc::now()).await.unwrap().is_completed);

        let moved = db.set_task_date("a", Some(date(22)), Utc::now()).await.unwrap();
        assert_eq!(moved.scheduled_date, Some(date(22)));
    }

    #[tokio::test]
    async fn missing_tasks_are_errors() {
        let (_dir, db) = open();
        assert!(db.get_task("ghost").await.is_err());
        assert!(db.toggle_task("ghost", Utc::now()).await.is_err());
        assert!(db.delete_task("ghost").await.is_err());
        assert!(db
            .set_task_date("ghost", Some(date(1)), Utc::now())
            .await
            .is_err());
    }
}
