//! Planner tasks: CRUD, scheduling by date and the calendar views built on them.

pub mod calendar;
pub mod commands;

use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::db::{
    models::{NewTask, TaskPatch, TaskStatistics},
    Database, Task,
};

pub const MAX_TASK_NAME_CHARS: usize = 200;

/// Tasks scheduled on one calendar day.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskColumn {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
}

#[derive(Clone)]
pub struct TaskService {
    db: Database,
}

fn normalize_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("task name cannot be empty");
    }
    if trimmed.chars().count() > MAX_TASK_NAME_CHARS {
        bail!("task name cannot be longer than {MAX_TASK_NAME_CHARS} characters");
    }
    Ok(trimmed.to_string())
}

impl TaskService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: NewTask) -> Result<Task> {
        let task = Task {
            id: Uuid::new_v4().to_string(),
            name: normalize_name(&input.name)?,
            priority: input.priority.unwrap_or_default(),
            is_completed: false,
            created_at: Utc::now(),
            scheduled_date: input.scheduled_date,
        };
        self.db.insert_task(&task).await?;
        Ok(task)
    }

    pub async fn get(&self, id: &str) -> Result<Task> {
        self.db.get_task(id).await
    }

    /// All tasks, scheduled ones first by date, then by creation time.
    pub async fn list(&self) -> Result<Vec<Task>> {
        self.db.list_tasks().await
    }

    pub async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<Task>> {
        self.db.list_tasks_between(date, date).await
    }

    pub async fn update(&self, id: &str, mut patch: TaskPatch) -> Result<Task> {
        if let Some(name) = patch.name.take() {
            patch.name = Some(normalize_name(&name)?);
        }
        if patch.is_empty() {
            return self.db.get_task(id).await;
        }
        self.db.update_task(id, patch, Utc::now()).await
    }

    pub async fn toggle(&self, id: &str) -> Result<Task> {
        self.db.toggle_task(id, Utc::now()).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.db.delete_task(id).await
    }

    /// Move a task to another day, or unschedule it with `None`.
    pub async fn reassign_date(&self, id: &str, date: Option<NaiveDate>) -> Result<Task> {
        self.db.set_task_date(id, date, Utc::now()).await
    }

    pub async fn statistics(&self, today: NaiveDate) -> Result<TaskStatistics> {
        let tasks = self.db.list_tasks().await?;
        let Some(week) = calendar::week_days(today, 0) else {
            bail!("no calendar week around {today}");
        };
        let (week_start, week_end) = (week[0], week[6]);

        Ok(TaskStatistics {
            total: tasks.len(),
            completed: tasks.iter().filter(|task| task.is_completed).count(),
            today: tasks
                .iter()
                .filter(|task| task.scheduled_date == Some(today))
                .count(),
            week: tasks
                .iter()
                .filter_map(|task| task.scheduled_date)
                .filter(|date| (week_start..=week_end).contains(date))
                .count(),
        })
    }

    /// One column per day, in the order given.
    pub async fn columns(&self, days: &[NaiveDate]) -> Result<Vec<TaskColumn>> {
        let (Some(&first), Some(&last)) = (days.iter().min(), days.iter().max()) else {
            return Ok(Vec::new());
        };
        let tasks = self.db.list_tasks_between(first, last).await?;

        Ok(days
            .iter()
            .map(|&date| TaskColumn {
                date,
                tasks: tasks
                    .iter()
                    .filter(|task| task.scheduled_date == Some(date))
                    .cloned()
                    .collect(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::TaskPriority;
    use tempfile::{tempdir, TempDir};

    fn service() -> (TempDir, TaskService) {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("tasks.sqlite3")).unwrap();
        (dir, TaskService::new(db))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn named(name: &str, scheduled_date: Option<NaiveDate>) -> NewTask {
        NewTask {
            name: name.into(),
            priority: None,
            scheduled_date,
        }
    }

    #[tokio::test]
    async fn create_trims_and_defaults() {
        let (_dir, tasks) = service();
        let task = tasks.create(named("  write report  ", None)).await.unwrap();

        assert_eq!(task.name, "write report");
        assert_eq!(task.priority, TaskPriority::Medium);
        assert!(!task.is_completed);
        assert_eq!(tasks.get(&task.id).await.unwrap(), task);
    }

    #[tokio::test]
    async fn rejects_blank_and_overlong_names() {
        let (_dir, tasks) = service();
        assert!(tasks.create(named("   ", None)).await.is_err());
        assert!(tasks
            .create(named(&"x".repeat(MAX_TASK_NAME_CHARS + 1), None))
            .await
            .is_err());
        assert!(tasks
            .create(named(&"x".repeat(MAX_TASK_NAME_CHARS), None))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn update_toggle_and_delete() {
        let (_dir, tasks) = service();
        let task = tasks.create(named("plan", None)).await.unwrap();

        let updated = tasks
            .update(
                &task.id,
                TaskPatch {
                    name: Some(" plan week ".into()),
                    priority: Some(TaskPriority::High),
                    is_completed: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "plan week");
        assert_eq!(updated.priority, TaskPriority::High);

        assert!(tasks.toggle(&task.id).await.unwrap().is_completed);
        assert!(!tasks.toggle(&task.id).await.unwrap().is_completed);

        tasks.delete(&task.id).await.unwrap();
        assert!(tasks.delete(&task.id).await.is_err());
        assert!(tasks.update(&task.id, TaskPatch::default()).await.is_err());
    }

    #[tokio::test]
    async fn reassigning_moves_task_between_days() {
        let (_dir, tasks) = service();
        let monday = date(2026, 10, 19);
        let tuesday = date(2026, 10, 20);
        let task = tasks.create(named("review", Some(monday))).await.unwrap();

        tasks.reassign_date(&task.id, Some(tuesday)).await.unwrap();
        assert!(tasks.list_for_date(monday).await.unwrap().is_empty());
        assert_eq!(tasks.list_for_date(tuesday).await.unwrap()[0].id, task.id);

        let unscheduled = tasks.reassign_date(&task.id, None).await.unwrap();
        assert_eq!(unscheduled.scheduled_date, None);
        assert!(tasks.reassign_date("missing", Some(monday)).await.is_err());
    }

    #[tokio::test]
    async fn statistics_count_today_and_week() {
        let (_dir, tasks) = service();
        let today = date(2026, 10, 21);
        tasks.create(named("a", Some(today))).await.unwrap();
        let b = tasks.create(named("b", Some(date(2026, 10, 25)))).await.unwrap();
        tasks.create(named("c", Some(date(2026, 10, 26)))).await.unwrap();
        tasks.create(named("d", None)).await.unwrap();
        tasks.toggle(&b.id).await.unwrap();

        let stats = tasks.statistics(today).await.unwrap();
        assert_eq!(
            stats,
            TaskStatistics {
                total: 4,
                completed: 1,
                today: 1,
                week: 2,
            }
        );
    }

    #[tokio::test]
    async fn columns_group_tasks_per_day() {
        let (_dir, tasks) = service();
        let days = calendar::five_days_from(date(2026, 10, 19)).unwrap();
        tasks.create(named("first", Some(days[0]))).await.unwrap();
        tasks.create(named("third", Some(days[2]))).await.unwrap();
        tasks.create(named("later", Some(date(2026, 12, 1)))).await.unwrap();

        let columns = tasks.columns(&days).await.unwrap();
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[0].tasks[0].name, "first");
        assert!(columns[1].tasks.is_empty());
        assert_eq!(columns[2].tasks[0].name, "third");
        assert!(tasks.columns(&[]).await.unwrap().is_empty());
    }
}
