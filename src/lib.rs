pub mod cli;
pub mod db;
pub mod settings;
mod settings_commands;
pub mod store;
pub mod tasks;
pub mod timer;
mod utils;

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use cli::{Cli, Commands, SettingsCommand, TaskCommand, TimerCommand};
use db::Database;
use settings::SettingsStore;
use tasks::{commands as task_commands, TaskService};
use timer::{commands as timer_commands, TimerConfig, TimerController};

pub struct AppState {
    pub(crate) db: Database,
    pub(crate) timer: TimerController,
    pub(crate) settings: SettingsStore,
    pub(crate) tasks: TaskService,
}

fn resolve_data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => dirs::data_dir()
            .map(|dir| dir.join("pomoplan"))
            .ok_or_else(|| anyhow!("could not determine a data directory; pass --data-dir")),
    }
}

fn build_state(cli: &Cli) -> anyhow::Result<AppState> {
    let data_dir = resolve_data_dir(cli)?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let database = Database::new(data_dir.join("pomoplan.sqlite3"))?;
    let settings_store = SettingsStore::new(data_dir.join("settings.json"))?;

    let mut backend = settings_store.backend().with_env_overrides();
    if let Some(mode) = cli.backend {
        backend.mode = mode;
    }
    log::info!("Using {} session backend", backend.mode);

    let store = store::from_settings(&backend, &database)?;
    let timer_controller =
        TimerController::new(store, TimerConfig::from(settings_store.timer()));

    Ok(AppState {
        tasks: TaskService::new(database.clone()),
        db: database,
        timer: timer_controller,
        settings: settings_store,
    })
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    // RUST_LOG overrides; the default keeps the countdown output readable.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();

    let state = build_state(&cli)?;
    log::debug!("Database at {}", state.db.path().display());

    let outcome = match cli.command {
        Commands::Timer(command) => run_timer_command(&state, command).await,
        Commands::Task(command) => run_task_command(&state, command).await,
        Commands::Settings(command) => run_settings_command(&state, command).await,
    };
    outcome.map_err(|message| anyhow!(message))
}

async fn run_timer_command(state: &AppState, command: TimerCommand) -> Result<(), String> {
    let snapshot = match command {
        TimerCommand::Status => timer_commands::get_timer_state(state).await?,
        TimerCommand::Run => timer_commands::run_timer(state).await?,
        TimerCommand::Reset => timer_commands::reset_timer(state).await?,
    };
    println!("{}", timer_commands::render_line(&snapshot));
    Ok(())
}

async fn run_task_command(state: &AppState, command: TaskCommand) -> Result<(), String> {
    match command {
        TaskCommand::Add {
            name,
            priority,
            date,
        } => {
            let task = task_commands::create_task(state, name, priority, date).await?;
            println!("{}", task_commands::render_task(&task));
        }
        TaskCommand::List { date } => {
            for task in task_commands::list_tasks(state, date).await? {
                println!("{}", task_commands::render_task(&task));
            }
        }
        TaskCommand::Show { id } => {
            let task = task_commands::show_task(state, id).await?;
            println!("{}", task_commands::render_task(&task));
        }
        TaskCommand::Toggle { id } => {
            let task = task_commands::toggle_task(state, id).await?;
            println!("{}", task_commands::render_task(&task));
        }
        TaskCommand::Rm { id } => {
            task_commands::delete_task(state, id.clone()).await?;
            println!("Deleted {id}");
        }
        TaskCommand::Move { id, date } => {
            let task = task_commands::move_task(state, id, date).await?;
            println!("{}", task_commands::render_task(&task));
        }
        TaskCommand::Week { offset } => {
            let (range, columns) = task_commands::get_week(state, offset).await?;
            print!("{}", task_commands::render_week(&range, &columns));
        }
        TaskCommand::Days { from } => {
            let (range, columns) = task_commands::get_days(state, from).await?;
            print!("{}", task_commands::render_week(&range, &columns));
        }
        TaskCommand::Month { date } => {
            let (anchor, columns) = task_commands::get_month(state, date).await?;
            print!("{}", task_commands::render_month(anchor, &columns));
        }
        TaskCommand::Stats => {
            let stats = task_commands::get_statistics(state).await?;
            println!(
                "total {}  completed {}  today {}  this week {}",
                stats.total, stats.completed, stats.today, stats.week
            );
        }
    }
    Ok(())
}

async fn run_settings_command(state: &AppState, command: SettingsCommand) -> Result<(), String> {
    let view = match command {
        SettingsCommand::Show => settings_commands::get_settings(state).await?,
        SettingsCommand::Set(args) => settings_commands::update_settings(state, args).await?,
    };
    let rendered = serde_json::to_string_pretty(&view).map_err(|e| e.to_string())?;
    println!("{rendered}");
    Ok(())
}
