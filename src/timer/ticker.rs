use std::{future::Future, ops::ControlFlow, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

/// Owned handle to a repeating tick task.
///
/// The first tick fires one period after spawning. The task stops when the
/// handler returns [`ControlFlow::Break`], when [`Ticker::cancel`] is called,
/// or when the handle is dropped.
pub struct Ticker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn spawn<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u64 = 0;

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {}
                }

                ticks = ticks.wrapping_add(1);
                if on_tick(ticks).await.is_break() {
                    break;
                }
            }
        });

        Self { token, handle }
    }

    pub fn cancel(&self) {
        self.token.cancel();
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    };

    fn counting(period: Duration, limit: Option<u64>) -> (Ticker, Arc<AtomicU64>) {
        let count = Arc::new(AtomicU64::new(0));
        let seen = count.clone();
        let ticker = Ticker::spawn(period, move |tick| {
            seen.store(tick, Ordering::SeqCst);
            async move {
                match limit {
                    Some(limit) if tick >= limit => ControlFlow::Break(()),
                    _ => ControlFlow::Continue(()),
                }
            }
        });
        (ticker, count)
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_period() {
        let (_ticker, count) = counting(Duration::from_secs(1), None);

        time::sleep(Duration::from_millis(900)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(2_200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn no_tick_after_cancel() {
        let (ticker, count) = counting(Duration::from_secs(1), None);

        time::sleep(Duration::from_millis(2_500)).await;
        ticker.cancel();
        let at_cancel = count.load(Ordering::SeqCst);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), at_cancel);
        assert_eq!(at_cancel, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_ticking() {
        let (ticker, count) = counting(Duration::from_secs(1), None);
        time::sleep(Duration::from_millis(1_500)).await;
        drop(ticker);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn handler_can_stop_the_ticker() {
        let (ticker, count) = counting(Duration::from_secs(1), Some(3));

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(ticker.is_finished());
    }
}
