//! Read-only values derived from [`TimerState`] for display.

use serde::Serialize;

use super::state::TimerState;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SquareStatus {
    Completed,
    Active,
    Empty,
}

/// `MM:SS`, zero padded. Minutes are not wrapped into hours.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Completed fraction of the current phase, in `[0, 1]`.
pub fn progress(state: &TimerState) -> f64 {
    let duration = state.phase_duration();
    if duration == 0 {
        return 0.0;
    }
    let left = state.time_left.min(duration) as f64;
    (1.0 - left / duration as f64).clamp(0.0, 1.0)
}

pub fn square_status(state: &TimerState, index: u32) -> SquareStatus {
    if index < state.completed_rounds {
        SquareStatus::Completed
    } else if index == state.completed_rounds && state.is_running() {
        SquareStatus::Active
    } else {
        SquareStatus::Empty
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub time_left: u64,
    pub formatted_time: String,
    pub is_running: bool,
    pub is_break: bool,
    pub is_loading: bool,
    pub is_session_complete: bool,
    pub completed_rounds: u32,
    pub progress: f64,
    pub total_intervals: u32,
    pub work_seconds: u64,
    pub break_seconds: u64,
    pub session_id: Option<String>,
    pub current_round_id: Option<String>,
    pub squares: Vec<SquareStatus>,
}

impl From<&TimerState> for TimerSnapshot {
    fn from(state: &TimerState) -> Self {
        Self {
            time_left: state.time_left,
            formatted_time: format_clock(state.time_left),
            is_running: state.is_running(),
            is_break: state.is_break(),
            is_loading: state.is_loading(),
            is_session_complete: state.is_session_complete(),
            completed_rounds: state.completed_rounds,
            progress: progress(state),
            total_intervals: state.config.total_intervals,
            work_seconds: state.config.work_seconds,
            break_seconds: state.config.break_seconds,
            session_id: state.session_id.clone(),
            current_round_id: state.current_round_id.clone(),
            squares: (0..state.config.total_intervals)
                .map(|index| square_status(state, index))
                .collect(),
        }
    }
}

impl TimerSnapshot {
    pub fn square_status(&self, index: u32) -> SquareStatus {
        self.squares
            .get(index as usize)
            .copied()
            .unwrap_or(SquareStatus::Empty)
    }
}
