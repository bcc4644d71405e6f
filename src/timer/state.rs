use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{PomodoroSession, Round, RoundUpdate};

use super::{
    config::TimerConfig,
    persist::StoreWrite,
    reconcile::{elapsed_seconds, reconcile, select_active_round, select_next_round},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    /// No session loaded yet, or the remote store could not be reached.
    #[default]
    Loading,
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Work,
    Break,
}

impl Phase {
    pub fn is_break(self) -> bool {
        self == Phase::Break
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer was not running; nothing changed.
    Ignored,
    Counted,
    BreakStarted,
    RoundCompleted {
        round_id: String,
        completed_rounds: u32,
    },
    SessionCompleted {
        round_id: String,
        session_id: Option<String>,
        completed_rounds: u32,
    },
}

/// Result of one tick: what happened, and what has to be written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub outcome: TickOutcome,
    pub writes: Vec<StoreWrite>,
}

impl Tick {
    fn only(outcome: TickOutcome) -> Self {
        Self {
            outcome,
            writes: Vec::new(),
        }
    }
}

/// Countdown engine state.
///
/// All transitions are plain synchronous methods; persistence is returned as
/// [`StoreWrite`]s for the caller to hand to the store, so nothing here ever
/// waits on I/O.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: TimerStatus,
    pub phase: Phase,
    pub time_left: u64,
    pub completed_rounds: u32,
    pub session_id: Option<String>,
    pub current_round_id: Option<String>,
    pub config: TimerConfig,
    /// Local copy of the session's rounds, used to pick the next round.
    #[serde(skip)]
    rounds: Vec<Round>,
    /// Bumped whenever a ticker must no longer affect this state.
    #[serde(skip)]
    generation: u64,
}

impl TimerState {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            status: TimerStatus::Loading,
            phase: Phase::Work,
            time_left: config.work_seconds,
            completed_rounds: 0,
            session_id: None,
            current_round_id: None,
            config,
            rounds: Vec::new(),
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn is_loading(&self) -> bool {
        self.status == TimerStatus::Loading
    }

    pub fn is_break(&self) -> bool {
        self.phase.is_break()
    }

    pub fn is_session_complete(&self) -> bool {
        self.completed_rounds >= self.config.total_intervals
    }

    pub fn phase_duration(&self) -> u64 {
        match self.phase {
            Phase::Work => self.config.work_seconds,
            Phase::Break => self.config.break_seconds,
        }
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    fn invalidate_tickers(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn reset_countdown(&mut self) {
        self.phase = Phase::Work;
        self.time_left = self.config.work_seconds;
    }

    /// Load a session and resume its active round. Always ends stopped.
    ///
    /// An unfinished session without an open round gets a new one, returned as
    /// the write that persists it.
    pub fn apply_session(&mut self, session: &PomodoroSession) -> Option<StoreWrite> {
        self.invalidate_tickers();
        self.status = TimerStatus::Stopped;
        self.session_id = Some(session.id.clone());
        self.rounds = session.rounds.clone();
        self.completed_rounds = session.completed_round_count();

        let active = select_active_round(&self.rounds)
            .map(|round| (round.id.clone(), reconcile(round.total_seconds, &self.config)));
        if let Some((round_id, resumed)) = active {
            self.current_round_id = Some(round_id);
            self.phase = resumed.phase;
            self.time_left = resumed.time_left;
            return None;
        }

        self.current_round_id = None;
        self.reset_countdown();
        if self.is_session_complete() {
            return None;
        }
        Some(self.open_round())
    }

    /// Fresh state that only lives in memory, used when a local store fails.
    pub fn apply_local_fallback(&mut self) {
        self.invalidate_tickers();
        let round = Round::new(format!("local-{}", Uuid::new_v4()), 1, Utc::now());
        self.status = TimerStatus::Stopped;
        self.session_id = None;
        self.current_round_id = Some(round.id.clone());
        self.rounds = vec![round];
        self.completed_rounds = 0;
        self.reset_countdown();
    }

    /// Back to the loading state with nothing to count down.
    pub fn mark_loading(&mut self) {
        self.invalidate_tickers();
        self.status = TimerStatus::Loading;
        self.session_id = None;
        self.current_round_id = None;
        self.rounds.clear();
        self.completed_rounds = 0;
        self.reset_countdown();
    }

    pub fn set_config(&mut self, config: TimerConfig) {
        self.invalidate_tickers();
        self.config = config;
        if self.is_running() {
            self.status = TimerStatus::Stopped;
        }
    }

    /// Stop and wipe progress ahead of replacing the session. Returns the
    /// session that should be discarded.
    pub fn begin_reset(&mut self) -> Option<String> {
        self.invalidate_tickers();
        if self.status == TimerStatus::Running {
            self.status = TimerStatus::Stopped;
        }
        self.completed_rounds = 0;
        self.current_round_id = None;
        self.rounds.clear();
        self.reset_countdown();
        self.session_id.take()
    }

    /// Returns `true` if the timer went from stopped to running.
    pub fn start(&mut self) -> bool {
        if self.status != TimerStatus::Stopped
            || self.current_round_id.is_none()
            || self.is_session_complete()
        {
            return false;
        }
        self.invalidate_tickers();
        self.status = TimerStatus::Running;
        true
    }

    /// Stop counting. Returns the progress write for the active round.
    pub fn pause(&mut self) -> Option<StoreWrite> {
        if self.is_loading() {
            return None;
        }
        if self.is_running() {
            self.invalidate_tickers();
            self.status = TimerStatus::Stopped;
        }
        self.progress_write()
    }

    /// Elapsed position of the active round, for periodic saves.
    pub fn progress_write(&self) -> Option<StoreWrite> {
        self.session_id.as_ref()?;
        let round_id = self.current_round_id.clone()?;
        let finished = self
            .rounds
            .iter()
            .any(|round| round.id == round_id && round.is_completed);
        if finished {
            return None;
        }

        Some(StoreWrite::SaveRound {
            round_id,
            update: RoundUpdate {
                total_seconds: elapsed_seconds(self.phase, self.time_left, &self.config),
                is_completed: false,
            },
        })
    }

    pub fn tick(&mut self) -> Tick {
        if !self.is_running() {
            return Tick::only(TickOutcome::Ignored);
        }
        if self.time_left <= 1 {
            return self.finish_phase();
        }
        self.time_left -= 1;
        Tick::only(TickOutcome::Counted)
    }

    /// Append a fresh round after the highest sequence and make it current.
    fn open_round(&mut self) -> StoreWrite {
        let sequence = self.rounds.iter().map(|r| r.sequence).max().unwrap_or(0) + 1;
        let round = Round::new(Uuid::new_v4().to_string(), sequence, Utc::now());
        self.current_round_id = Some(round.id.clone());
        self.rounds.push(round.clone());
        StoreWrite::InsertRound {
            session_id: self.session_id.clone().unwrap_or_default(),
            round,
        }
    }

    fn record_round(&mut self, round_id: &str, update: RoundUpdate) {
        if let Some(round) = self.rounds.iter_mut().find(|round| round.id == round_id) {
            round.total_seconds = update.total_seconds;
            round.is_completed = update.is_completed;
        }
    }

    fn finish_phase(&mut self) -> Tick {
        let Some(round_id) = self.current_round_id.clone() else {
            self.status = TimerStatus::Stopped;
            return Tick::only(TickOutcome::Ignored);
        };
        let persisted = self.session_id.is_some();
        let mut writes = Vec::new();

        if self.phase == Phase::Work {
            self.phase = Phase::Break;
            self.time_left = self.config.break_seconds;

            let update = RoundUpdate {
                total_seconds: self.config.work_seconds,
                is_completed: false,
            };
            self.record_round(&round_id, update);
            if persisted {
                writes.push(StoreWrite::SaveRound { round_id, update });
            }
            return Tick {
                outcome: TickOutcome::BreakStarted,
                writes,
            };
        }

        self.completed_rounds += 1;
        let update = RoundUpdate {
            total_seconds: self.config.cycle_seconds(),
            is_completed: true,
        };
        self.record_round(&round_id, update);
        if persisted {
            writes.push(StoreWrite::SaveRound {
                round_id: round_id.clone(),
                update,
            });
        }

        self.reset_countdown();

        if self.is_session_complete() {
            self.status = TimerStatus::Stopped;
            if let Some(session_id) = &self.session_id {
                writes.push(StoreWrite::CompleteSession {
                    session_id: session_id.clone(),
                });
            }
            return Tick {
                outcome: TickOutcome::SessionCompleted {
                    round_id,
                    session_id: self.session_id.clone(),
                    completed_rounds: self.completed_rounds,
                },
                writes,
            };
        }

        match select_next_round(&self.rounds, &round_id) {
            Some(next) => self.current_round_id = Some(next.id.clone()),
            None => {
                let insert = self.open_round();
                if persisted {
                    writes.push(insert);
                }
            }
        }

        Tick {
            outcome: TickOutcome::RoundCompleted {
                round_id,
                completed_rounds: self.completed_rounds,
            },
            writes,
        }
    }
}
