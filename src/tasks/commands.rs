use chrono::{Datelike, Local, NaiveDate};

use crate::{
    db::models::{NewTask, TaskPriority, TaskStatistics},
    db::Task,
    tasks::{calendar, TaskColumn},
    AppState,
};

pub async fn create_task(
    state: &AppState,
    name: String,
    priority: Option<TaskPriority>,
    scheduled_date: Option<NaiveDate>,
) -> Result<Task, String> {
    state
        .tasks
        .create(NewTask {
            name,
            priority,
            scheduled_date,
        })
        .await
        .map_err(|e| e.to_string())
}

pub async fn list_tasks(state: &AppState, date: Option<NaiveDate>) -> Result<Vec<Task>, String> {
    let tasks = &state.tasks;
    let listed = match date {
        Some(date) => tasks.list_for_date(date).await,
        None => tasks.list().await,
    };
    listed.map_err(|e| e.to_string())
}

pub async fn toggle_task(state: &AppState, task_id: String) -> Result<Task, String> {
    state.tasks.toggle(&task_id).await.map_err(|e| e.to_string())
}

pub async fn delete_task(state: &AppState, task_id: String) -> Result<(), String> {
    state.tasks.delete(&task_id).await.map_err(|e| e.to_string())
}

pub async fn move_task(state: &AppState, task_id: String, date: NaiveDate) -> Result<Task, String> {
    state
        .tasks
        .reassign_date(&task_id, Some(date))
        .await
        .map_err(|e| e.to_string())
}

pub async fn show_task(state: &AppState, task_id: String) -> Result<Task, String> {
    state.tasks.get(&task_id).await.map_err(|e| e.to_string())
}

pub async fn get_week(state: &AppState, offset: i64) -> Result<(String, Vec<TaskColumn>), String> {
    let days = calendar::week_days(Local::now().date_naive(), offset)
        .ok_or_else(|| format!("week offset {offset} is outside the supported calendar"))?;
    let columns = state.tasks.columns(&days).await.map_err(|e| e.to_string())?;
    Ok((calendar::format_week_range(&days), columns))
}

/// Five consecutive days starting at `from` (today if absent).
pub async fn get_days(
    state: &AppState,
    from: Option<NaiveDate>,
) -> Result<(String, Vec<TaskColumn>), String> {
    let start = from.unwrap_or_else(|| Local::now().date_naive());
    let days = calendar::five_days_from(start)
        .ok_or_else(|| format!("five days from {start} run past the supported calendar"))?;
    let columns = state.tasks.columns(&days).await.map_err(|e| e.to_string())?;
    Ok((calendar::format_week_range(&days), columns))
}

/// The month grid around `date` (today if absent), one column per cell.
pub async fn get_month(
    state: &AppState,
    date: Option<NaiveDate>,
) -> Result<(NaiveDate, Vec<TaskColumn>), String> {
    let anchor = date.unwrap_or_else(|| Local::now().date_naive());
    let grid = calendar::month_grid(anchor)
        .ok_or_else(|| format!("the month of {anchor} is outside the supported calendar"))?;
    let columns = state.tasks.columns(&grid).await.map_err(|e| e.to_string())?;
    Ok((anchor, columns))
}

pub async fn get_statistics(state: &AppState) -> Result<TaskStatistics, String> {
    state
        .tasks
        .statistics(Local::now().date_naive())
        .await
        .map_err(|e| e.to_string())
}

pub fn render_task(task: &Task) -> String {
    let mark = if task.is_completed { "x" } else { " " };
    let date = task
        .scheduled_date
        .map(|date| date.to_string())
        .unwrap_or_else(|| "unscheduled".into());
    format!(
        "[{mark}] {} {:<6} {:<11} {}",
        task.id, task.priority, date, task.name
    )
}

pub fn render_week(range: &str, columns: &[TaskColumn]) -> String {
    let today = Local::now().date_naive();
    let mut out = format!("{range}\n");
    for column in columns {
        out.push_str(&format!(
            "\n{} ({})\n",
            calendar::day_label(column.date, today),
            column.date.format("%A")
        ));
        if column.tasks.is_empty() {
            out.push_str("  -\n");
        }
        for task in &column.tasks {
            out.push_str(&format!("  {}\n", render_task(task)));
        }
    }
    out
}

/// Seven cells per row. Days outside the month are dimmed with `.`; a day's
/// task count follows its number.
pub fn render_month(anchor: NaiveDate, columns: &[TaskColumn]) -> String {
    let mut out = format!("{}\nMon   Tue   Wed   Thu   Fri   Sat   Sun\n", anchor.format("%B %Y"));
    for week in columns.chunks(7) {
        let cells: Vec<String> = week
            .iter()
            .map(|column| {
                if column.date.month() != anchor.month() {
                    return format!("{:<5}", ".");
                }
                match column.tasks.len() {
                    0 => format!("{:<5}", column.date.day()),
                    count => format!("{:<5}", format!("{}:{count}", column.date.day())),
                }
            })
            .collect();
        out.push_str(cells.join(" ").trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn renders_task_line() {
        let task = Task {
            id: "t1".into(),
            name: "Write notes".into(),
            priority: TaskPriority::High,
            is_completed: true,
            created_at: Utc::now(),
            scheduled_date: NaiveDate::from_ymd_opt(2026, 10, 19),
        };
        assert_eq!(render_task(&task), "[x] t1 high   2026-10-19  Write notes");
    }

    #[test]
    fn month_view_marks_counts_and_outside_days() {
        let anchor = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let mut columns: Vec<TaskColumn> = calendar::month_grid(anchor)
            .unwrap()
            .into_iter()
            .map(|date| TaskColumn {
                date,
                tasks: Vec::new(),
            })
            .collect();
        let first_of_month = columns[3].date;
        columns[3].tasks.push(Task {
            id: "t1".into(),
            name: "Kickoff".into(),
            priority: TaskPriority::Low,
            is_completed: false,
            created_at: Utc::now(),
            scheduled_date: Some(first_of_month),
        });

        let rendered = render_month(anchor, &columns);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "October 2026");
        assert_eq!(lines.len(), 2 + 6);
        assert!(lines[2].starts_with(".     .     .     1:1   2     3     4"));
    }

    #[test]
    fn empty_days_are_marked() {
        let columns = vec![TaskColumn {
            date: NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(),
            tasks: Vec::new(),
        }];
        let rendered = render_week("6-12 Jan", &columns);
        assert!(rendered.starts_with("6-12 Jan\n"));
        assert!(rendered.contains("6 Jan (Monday)\n  -\n"));
    }
}
