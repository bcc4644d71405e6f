use serde::Serialize;

use crate::{
    cli::SettingsArgs,
    settings::{BackendSettings, TimerSettings},
    AppState,
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub timer: TimerSettings,
    pub backend: BackendSettings,
}

fn current(state: &AppState) -> SettingsView {
    let mut backend = state.settings.backend();
    if backend.access_token.is_some() {
        backend.access_token = Some("********".into());
    }
    SettingsView {
        timer: state.settings.timer(),
        backend,
    }
}

pub async fn get_settings(state: &AppState) -> Result<SettingsView, String> {
    Ok(current(state))
}

/// Apply the given fields and keep the others. Timer changes are pushed to the
/// running controller.
pub async fn update_settings(state: &AppState, args: SettingsArgs) -> Result<SettingsView, String> {
    let previous = state.settings.timer();
    let timer = TimerSettings {
        work_interval: args.work.unwrap_or(previous.work_interval),
        break_interval: args.break_minutes.unwrap_or(previous.break_interval),
        intervals_count: args.intervals.unwrap_or(previous.intervals_count),
    };
    if timer != previous {
        state
            .settings
            .update_timer(timer)
            .map_err(|e| e.to_string())?;
        state.timer.reconfigure(timer.into()).await;
        state.timer.shutdown().await;
    }

    if args.backend.is_some() || args.api_url.is_some() {
        let mut backend = state.settings.backend();
        if let Some(mode) = args.backend {
            backend.mode = mode;
        }
        if let Some(url) = args.api_url {
            backend.api_url = url;
        }
        state
            .settings
            .update_backend(backend)
            .map_err(|e| e.to_string())?;
    }

    Ok(current(state))
}
