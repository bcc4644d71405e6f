use serde::{Deserialize, Serialize};

use crate::settings::TimerSettings;

/// Interval lengths the engine counts down, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
    pub work_seconds: u64,
    pub break_seconds: u64,
    /// Rounds needed to finish the day's session.
    pub total_intervals: u32,
}

impl From<TimerSettings> for TimerConfig {
    fn from(settings: TimerSettings) -> Self {
        Self {
            work_seconds: u64::from(settings.work_interval) * 60,
            break_seconds: u64::from(settings.break_interval) * 60,
            total_intervals: settings.intervals_count,
        }
    }
}

impl TimerConfig {
    /// Length of one full work+break cycle.
    pub fn cycle_seconds(&self) -> u64 {
        self.work_seconds + self.break_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_minutes_to_seconds() {
        let config = TimerConfig::from(TimerSettings {
            work_interval: 25,
            break_interval: 10,
            intervals_count: 4,
        });
        assert_eq!(config.work_seconds, 1500);
        assert_eq!(config.break_seconds, 600);
        assert_eq!(config.total_intervals, 4);
        assert_eq!(config.cycle_seconds(), 2100);
    }
}
