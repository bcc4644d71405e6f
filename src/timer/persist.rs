use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    db::{Round, RoundUpdate, SessionUpdate},
    log_debug, log_error, log_info,
    store::SessionStore,
};

const ENABLE_LOGS: bool = true;

/// A store mutation produced by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    SaveRound { round_id: String, update: RoundUpdate },
    InsertRound { session_id: String, round: Round },
    CompleteSession { session_id: String },
}

enum Command {
    Write(StoreWrite),
    Flush(oneshot::Sender<()>),
}

/// Applies [`StoreWrite`]s one at a time, in the order they were enqueued.
///
/// Failures are logged and dropped; enqueueing never blocks the caller.
#[derive(Clone)]
pub struct PersistQueue {
    sender: mpsc::UnboundedSender<Command>,
}

impl PersistQueue {
    pub fn spawn(store: Arc<dyn SessionStore>) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Command>();

        let handle = tokio::spawn(async move {
            while let Some(command) = receiver.recv().await {
                match command {
                    Command::Write(write) => apply(store.as_ref(), write).await,
                    Command::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        (Self { sender }, handle)
    }

    pub fn enqueue(&self, write: StoreWrite) {
        if self.sender.send(Command::Write(write)).is_err() {
            log_error!("Persistence queue is closed; dropping store write");
        }
    }

    pub fn enqueue_all(&self, writes: impl IntoIterator<Item = StoreWrite>) {
        for write in writes {
            self.enqueue(write);
        }
    }

    /// Wait until everything enqueued before this call has been applied.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(Command::Flush(done)).is_err() {
            return;
        }
        let _ = wait.await;
    }
}

async fn apply(store: &dyn SessionStore, write: StoreWrite) {
    match write {
        StoreWrite::SaveRound { round_id, update } => {
            match store.update_round(&round_id, update).await {
                Ok(_) => log_debug!("Saved round {} at {}s", round_id, update.total_seconds),
                Err(err) => log_error!(
                    "Failed to save progress for round {} ({}s, completed={}): {:#}",
                    round_id,
                    update.total_seconds,
                    update.is_completed,
                    err
                ),
            }
        }
        StoreWrite::InsertRound { session_id, round } => {
            if let Err(err) = store.insert_round(&session_id, &round).await {
                log_error!(
                    "Failed to insert round {} into session {}: {:#}",
                    round.id,
                    session_id,
                    err
                );
            }
        }
        StoreWrite::CompleteSession { session_id } => {
            match store
                .update_session(&session_id, SessionUpdate { is_completed: true })
                .await
            {
                Ok(_) => log_info!("Session {} marked completed", session_id),
                Err(err) => {
                    log_error!("Failed to mark session {} completed: {:#}", session_id, err)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::db::PomodoroSession;
    use crate::store::StoreKind;

    /// Records the order of calls and fails every round update.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl SessionStore for Recorder {
        fn kind(&self) -> StoreKind {
            StoreKind::Local
        }

        async fn get_today_session(&self) -> Result<Option<PomodoroSession>> {
            Ok(None)
        }

        async fn create_session(&self) -> Result<PomodoroSession> {
            Err(anyhow!("unused"))
        }

        async fn insert_round(&self, session_id: &str, round: &Round) -> Result<()> {
            self.push(format!("insert {session_id} {}", round.id));
            Ok(())
        }

        async fn update_round(&self, round_id: &str, update: RoundUpdate) -> Result<Round> {
            self.push(format!("round {round_id} {}", update.total_seconds));
            Err(anyhow!("backend offline"))
        }

        async fn update_session(
            &self,
            session_id: &str,
            _update: SessionUpdate,
        ) -> Result<PomodoroSession> {
            self.push(format!("complete {session_id}"));
            Err(anyhow!("backend offline"))
        }

        async fn delete_session(&self, _session_id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn save(round_id: &str, total_seconds: u64) -> StoreWrite {
        StoreWrite::SaveRound {
            round_id: round_id.into(),
            update: RoundUpdate {
                total_seconds,
                is_completed: false,
            },
        }
    }

    #[tokio::test]
    async fn applies_writes_in_order_and_survives_failures() {
        let recorder = Arc::new(Recorder::default());
        let (queue, _handle) = PersistQueue::spawn(recorder.clone());

        queue.enqueue(save("r1", 10));
        queue.enqueue(StoreWrite::InsertRound {
            session_id: "s1".into(),
            round: Round::new("r2".into(), 2, chrono::Utc::now()),
        });
        queue.enqueue(save("r1", 20));
        queue.enqueue(StoreWrite::CompleteSession {
            session_id: "s1".into(),
        });
        queue.flush().await;

        let calls = recorder.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec!["round r1 10", "insert s1 r2", "round r1 20", "complete s1"]
        );
    }

    #[tokio::test]
    async fn writes_reach_the_store() {
        let store = Arc::new(MemoryStore::new());
        let session = store.create_session().await.unwrap();
        let round_id = session.rounds[0].id.clone();

        let (queue, _handle) = PersistQueue::spawn(store.clone());
        queue.enqueue(save(&round_id, 321));
        queue.flush().await;

        let today = store.get_today_session().await.unwrap().unwrap();
        assert_eq!(today.rounds[0].total_seconds, 321);
    }

    #[tokio::test]
    async fn flush_after_worker_stops_returns() {
        let (queue, handle) = PersistQueue::spawn(Arc::new(MemoryStore::new()));
        handle.abort();
        let _ = handle.await;

        queue.enqueue(save("gone", 1));
        queue.flush().await;
    }
}
