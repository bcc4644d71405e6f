use std::{ops::ControlFlow, sync::Arc, time::Duration};

use anyhow::Result;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

use crate::{
    db::PomodoroSession,
    log_error, log_info, log_warn,
    store::{SessionStore, StoreKind},
};

use super::{
    config::TimerConfig,
    facade::TimerSnapshot,
    persist::PersistQueue,
    state::{TickOutcome, TimerState},
    ticker::Ticker,
};

const ENABLE_LOGS: bool = true;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum TimerEvent {
    StateChanged(TimerSnapshot),
    Heartbeat(TimerSnapshot),
    #[serde(rename_all = "camelCase")]
    RoundCompleted {
        round_id: String,
        completed_rounds: u32,
    },
    #[serde(rename_all = "camelCase")]
    SessionCompleted { session_id: Option<String> },
}

#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<TimerState>>,
    store: Arc<dyn SessionStore>,
    persist: PersistQueue,
    ticker: Arc<Mutex<Option<Ticker>>>,
    events: broadcast::Sender<TimerEvent>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
}

/// What a running ticker needs. Kept apart from the controller so the tick
/// task does not hold the ticker slot it lives in.
#[derive(Clone)]
struct TickContext {
    state: Arc<Mutex<TimerState>>,
    persist: PersistQueue,
    events: broadcast::Sender<TimerEvent>,
    heartbeat_every_ticks: u32,
    generation: u64,
}

impl TimerController {
    /// Must be called from within a tokio runtime.
    pub fn new(store: Arc<dyn SessionStore>, config: TimerConfig) -> Self {
        let debug_mode = std::env::var("POMOPLAN_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let (persist, _worker) = PersistQueue::spawn(store.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            state: Arc::new(Mutex::new(TimerState::new(config))),
            store,
            persist,
            ticker: Arc::new(Mutex::new(None)),
            events,
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: if debug_mode { 1 } else { 10 },
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        TimerSnapshot::from(&*self.state.lock().await)
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }

    /// Load (or create) today's session and resume its active round, stopped.
    ///
    /// Store failures are logged. A local store then continues with an
    /// in-memory round; a remote store leaves the timer loading.
    pub async fn initialize(&self) -> TimerSnapshot {
        self.cancel_ticker().await;
        let generation = {
            let mut state = self.state.lock().await;
            state.mark_loading();
            state.generation()
        };
        self.emit_state_changed().await;

        let loaded = self.load_today_session().await;
        self.apply_loaded(generation, loaded).await
    }

    pub async fn start(&self) -> TimerSnapshot {
        let started = {
            let mut state = self.state.lock().await;
            state.start().then(|| state.generation())
        };

        if let Some(generation) = started {
            self.spawn_ticker(generation).await;
            log_info!("Timer started");
        }
        self.emit_state_changed().await
    }

    pub async fn pause(&self) -> TimerSnapshot {
        {
            let mut state = self.state.lock().await;
            if let Some(write) = state.pause() {
                self.persist.enqueue(write);
            }
        }
        self.cancel_ticker().await;
        self.emit_state_changed().await
    }

    /// Discard today's session and start over with a fresh one.
    ///
    /// Best effort: a failed delete is logged and a new session is created
    /// regardless.
    pub async fn reset(&self) -> TimerSnapshot {
        self.cancel_ticker().await;
        let (previous, generation) = {
            let mut state = self.state.lock().await;
            let previous = state.begin_reset();
            state.mark_loading();
            (previous, state.generation())
        };
        self.emit_state_changed().await;

        // Anything still queued for the old session must land before it goes.
        self.persist.flush().await;
        if let Some(session_id) = previous {
            match self.store.delete_session(&session_id).await {
                Ok(()) => log_info!("Deleted session {} on reset", session_id),
                Err(err) => log_error!("Failed to delete session {} on reset: {:#}", session_id, err),
            }
        }

        let created = self.store.create_session().await;
        self.apply_loaded(generation, created).await
    }

    /// Apply new interval lengths. Stops the timer, saves progress and
    /// reloads today's session under the new durations.
    pub async fn reconfigure(&self, config: TimerConfig) -> TimerSnapshot {
        {
            let mut state = self.state.lock().await;
            if let Some(write) = state.pause() {
                self.persist.enqueue(write);
            }
            state.set_config(config);
        }
        self.cancel_ticker().await;
        self.persist.flush().await;
        self.initialize().await
    }

    /// Stop ticking and wait for every pending write.
    pub async fn shutdown(&self) {
        self.cancel_ticker().await;
        {
            let mut state = self.state.lock().await;
            if state.is_running() {
                if let Some(write) = state.pause() {
                    self.persist.enqueue(write);
                }
            }
        }
        self.persist.flush().await;
    }

    pub async fn flush(&self) {
        self.persist.flush().await;
    }

    async fn load_today_session(&self) -> Result<PomodoroSession> {
        if let Some(session) = self.store.get_today_session().await? {
            return Ok(session);
        }
        let session = self.store.create_session().await?;
        log_info!("Created session {} for today", session.id);
        Ok(session)
    }

    async fn apply_loaded(
        &self,
        generation: u64,
        loaded: Result<PomodoroSession>,
    ) -> TimerSnapshot {
        {
            let mut state = self.state.lock().await;
            if state.generation() != generation {
                log_warn!("Timer changed while the session was loading; ignoring the result");
                return TimerSnapshot::from(&*state);
            }

            match loaded {
                Ok(session) => {
                    if let Some(write) = state.apply_session(&session) {
                        self.persist.enqueue(write);
                    }
                    log_info!(
                        "Loaded session {} ({} of {} rounds completed)",
                        session.id,
                        state.completed_rounds,
                        state.config.total_intervals
                    );
                }
                Err(err) => match self.store.kind() {
                    StoreKind::Local => {
                        log_error!("Failed to load session, continuing in memory: {:#}", err);
                        state.apply_local_fallback();
                    }
                    StoreKind::Remote => {
                        log_error!("Failed to load session from server: {:#}", err);
                    }
                },
            }
        }
        self.emit_state_changed().await
    }

    async fn spawn_ticker(&self, generation: u64) {
        let context = TickContext {
            state: self.state.clone(),
            persist: self.persist.clone(),
            events: self.events.clone(),
            heartbeat_every_ticks: self.heartbeat_every_ticks.max(1),
            generation,
        };

        let ticker = Ticker::spawn(self.tick_interval, move |ticks| {
            let context = context.clone();
            async move { context.handle_tick(ticks).await }
        });

        // Replacing the slot drops (and cancels) any previous ticker.
        *self.ticker.lock().await = Some(ticker);
    }

    async fn cancel_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel();
        }
    }

    async fn emit_state_changed(&self) -> TimerSnapshot {
        let snapshot = self.get_snapshot().await;
        let _ = self.events.send(TimerEvent::StateChanged(snapshot.clone()));
        snapshot
    }
}

impl TickContext {
    async fn handle_tick(&self, ticks: u64) -> ControlFlow<()> {
        let (outcome, snapshot, heartbeat) = {
            let mut state = self.state.lock().await;
            // A pause, reset or reconfigure since this ticker started.
            if state.generation() != self.generation || !state.is_running() {
                return ControlFlow::Break(());
            }

            let tick = state.tick();
            self.persist.enqueue_all(tick.writes);

            let mut heartbeat = false;
            if tick.outcome == TickOutcome::Counted
                && ticks % u64::from(self.heartbeat_every_ticks) == 0
            {
                if let Some(write) = state.progress_write() {
                    self.persist.enqueue(write);
                    heartbeat = true;
                }
            }
            (tick.outcome, TimerSnapshot::from(&*state), heartbeat)
        };

        let _ = self.events.send(TimerEvent::StateChanged(snapshot.clone()));
        if heartbeat {
            let _ = self.events.send(TimerEvent::Heartbeat(snapshot));
        }

        match outcome {
            TickOutcome::RoundCompleted {
                round_id,
                completed_rounds,
            } => {
                log_info!("Round {} completed ({} done)", round_id, completed_rounds);
                let _ = self.events.send(TimerEvent::RoundCompleted {
                    round_id,
                    completed_rounds,
                });
                ControlFlow::Continue(())
            }
            TickOutcome::SessionCompleted {
                round_id,
                session_id,
                completed_rounds,
            } => {
                log_info!(
                    "Session completed after {} rounds (last round {})",
                    completed_rounds,
                    round_id
                );
                let _ = self.events.send(TimerEvent::RoundCompleted {
                    round_id,
                    completed_rounds,
                });
                let _ = self.events.send(TimerEvent::SessionCompleted { session_id });
                ControlFlow::Break(())
            }
            TickOutcome::Ignored => ControlFlow::Break(()),
            TickOutcome::Counted | TickOutcome::BreakStarted => ControlFlow::Continue(()),
        }
    }
}
