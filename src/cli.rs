use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::{db::models::TaskPriority, settings::BackendMode};

/// About a century either way.
const MAX_WEEK_OFFSET: i64 = 5200;

/// Task planner with a resumable Pomodoro timer.
#[derive(Parser, Debug)]
#[command(name = "pomoplan", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the database and settings file.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Session backend for this run, overriding the saved setting.
    #[arg(long, global = true)]
    pub backend: Option<BackendMode>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pomodoro timer.
    #[command(subcommand)]
    Timer(TimerCommand),
    /// Planner tasks.
    #[command(subcommand)]
    Task(TaskCommand),
    /// Saved preferences.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand, Debug)]
pub enum TimerCommand {
    /// Show today's session.
    Status,
    /// Run the countdown until the session is finished or Ctrl-C.
    Run,
    /// Discard today's session and start a new one.
    Reset,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create a task.
    Add {
        name: String,
        #[arg(long)]
        priority: Option<TaskPriority>,
        /// Day to schedule it on (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List tasks, optionally for a single day.
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show a single task.
    Show { id: String },
    /// Flip a task between done and open.
    Toggle { id: String },
    /// Delete a task.
    Rm { id: String },
    /// Schedule a task on another day.
    Move { id: String, date: NaiveDate },
    /// Tasks for each day of a week.
    Week {
        /// Weeks relative to the current one.
        #[arg(
            long,
            default_value_t = 0,
            allow_hyphen_values = true,
            value_parser = clap::value_parser!(i64).range(-MAX_WEEK_OFFSET..=MAX_WEEK_OFFSET)
        )]
        offset: i64,
    },
    /// Tasks for five consecutive days.
    Days {
        /// First day of the strip; defaults to today.
        #[arg(long)]
        from: Option<NaiveDate>,
    },
    /// Month view with the number of tasks on each day.
    Month {
        /// Any day of the month to show; defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Task counts.
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    Show,
    Set(SettingsArgs),
}

#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// Work interval in minutes.
    #[arg(long)]
    pub work: Option<u32>,
    /// Break interval in minutes.
    #[arg(long = "break")]
    pub break_minutes: Option<u32>,
    /// Rounds per session.
    #[arg(long)]
    pub intervals: Option<u32>,
    #[arg(long)]
    pub backend: Option<BackendMode>,
    #[arg(long)]
    pub api_url: Option<String>,
}
