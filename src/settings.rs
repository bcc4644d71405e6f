use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::PathBuf, str::FromStr, sync::RwLock};

pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";

const MAX_INTERVAL_MINUTES: u32 = 180;
const MAX_INTERVALS_COUNT: u32 = 24;

/// Pomodoro durations as the user edits them, in minutes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    pub work_interval: u32,
    pub break_interval: u32,
    pub intervals_count: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_interval: 50,
            break_interval: 10,
            intervals_count: 7,
        }
    }
}

impl TimerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.work_interval == 0 || self.work_interval > MAX_INTERVAL_MINUTES {
            bail!("work interval must be between 1 and {MAX_INTERVAL_MINUTES} minutes");
        }
        if self.break_interval == 0 || self.break_interval > MAX_INTERVAL_MINUTES {
            bail!("break interval must be between 1 and {MAX_INTERVAL_MINUTES} minutes");
        }
        if self.intervals_count == 0 || self.intervals_count > MAX_INTERVALS_COUNT {
            bail!("intervals count must be between 1 and {MAX_INTERVALS_COUNT}");
        }
        Ok(())
    }
}

/// Where timer sessions are persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Nothing outlives the process.
    Memory,
    #[default]
    Sqlite,
    Remote,
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendMode::Memory => "memory",
            BackendMode::Sqlite => "sqlite",
            BackendMode::Remote => "remote",
        };
        f.write_str(name)
    }
}

impl FromStr for BackendMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendMode::Memory),
            "sqlite" => Ok(BackendMode::Sqlite),
            "remote" => Ok(BackendMode::Remote),
            other => Err(anyhow!("unknown backend mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackendSettings {
    pub mode: BackendMode,
    pub api_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            mode: BackendMode::default(),
            api_url: DEFAULT_API_URL.into(),
            access_token: None,
        }
    }
}

impl BackendSettings {
    /// `POMOPLAN_API_URL` / `POMOPLAN_ACCESS_TOKEN` take precedence over the file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("POMOPLAN_API_URL") {
            if !url.trim().is_empty() {
                self.api_url = url;
            }
        }
        if let Ok(token) = std::env::var("POMOPLAN_ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                self.access_token = Some(token);
            }
        }
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSettings {
    #[serde(default)]
    timer: TimerSettings,
    #[serde(default)]
    backend: BackendSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            let mut loaded: UserSettings = serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring unreadable settings file {}: {err}",
                    path.display()
                );
                UserSettings::default()
            });
            if let Err(err) = loaded.timer.validate() {
                log::warn!(
                    "Ignoring timer settings in {}: {err}",
                    path.display()
                );
                loaded.timer = TimerSettings::default();
            }
            loaded
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn timer(&self) -> TimerSettings {
        match self.data.read() {
            Ok(guard) => guard.timer,
            Err(poisoned) => poisoned.into_inner().timer,
        }
    }

    pub fn backend(&self) -> BackendSettings {
        match self.data.read() {
            Ok(guard) => guard.backend.clone(),
            Err(poisoned) => poisoned.into_inner().backend.clone(),
        }
    }

    pub fn update_timer(&self, settings: TimerSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        guard.timer = settings;
        self.persist(&guard)
    }

    pub fn update_backend(&self, settings: BackendSettings) -> Result<()> {
        if settings.mode == BackendMode::Remote && settings.api_url.trim().is_empty() {
            bail!("remote backend requires an API url");
        }
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        guard.backend = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
