//! Turning a persisted round back into a running countdown.
//!
//! A round stores a single `total_seconds` counter along the combined
//! work+break timeline. Work occupies `[0, work_seconds)`, break occupies
//! `[work_seconds, work_seconds + break_seconds)`. A value of exactly
//! `work_seconds` is the moment the break began, which is what the engine
//! writes at the work→break transition.

use std::cmp::Ordering;

use crate::db::Round;

use super::{config::TimerConfig, state::Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub phase: Phase,
    pub time_left: u64,
}

pub fn reconcile(total_seconds: u64, config: &TimerConfig) -> Reconciled {
    if total_seconds == 0 {
        Reconciled {
            phase: Phase::Work,
            time_left: config.work_seconds,
        }
    } else if total_seconds >= config.work_seconds {
        let into_break = total_seconds - config.work_seconds;
        Reconciled {
            phase: Phase::Break,
            time_left: config.break_seconds.saturating_sub(into_break),
        }
    } else {
        Reconciled {
            phase: Phase::Work,
            time_left: config.work_seconds - total_seconds,
        }
    }
}

/// Inverse of [`reconcile`]: position on the round timeline for a phase and
/// remaining time.
pub fn elapsed_seconds(phase: Phase, time_left: u64, config: &TimerConfig) -> u64 {
    match phase {
        Phase::Work => config.work_seconds.saturating_sub(time_left),
        Phase::Break => config.work_seconds + config.break_seconds.saturating_sub(time_left),
    }
}

fn round_order(a: &&Round, b: &&Round) -> Ordering {
    a.sequence
        .cmp(&b.sequence)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Earliest unfinished round.
pub fn select_active_round(rounds: &[Round]) -> Option<&Round> {
    rounds
        .iter()
        .filter(|round| !round.is_completed)
        .min_by(round_order)
}

/// Earliest unfinished round other than `finished_id`.
pub fn select_next_round<'a>(rounds: &'a [Round], finished_id: &str) -> Option<&'a Round> {
    rounds
        .iter()
        .filter(|round| !round.is_completed && round.id != finished_id)
        .min_by(round_order)
}
