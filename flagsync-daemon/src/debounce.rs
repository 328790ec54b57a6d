//! Trailing-edge debouncer.
//!
//! Coalesces bursts of trigger signals into one action invocation per
//! quiet period: the action fires exactly once per burst, the full
//! quiet interval after the *last* trigger in the burst.
//!
//! A single worker task owns the pending-timer slot; `trigger` and
//! `cancel` are non-blocking sends on an unbounded channel, safe from
//! any concurrent context. The worker awaits the action before
//! re-arming, so at most one debounced invocation is ever in flight.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

enum Command {
    Trigger,
    Cancel,
    Shutdown,
}

/// Coalesces rapid triggers into one delayed action per quiet period.
pub struct Debouncer {
    tx: UnboundedSender<Command>,
    worker: JoinHandle<()>,
}

impl Debouncer {
    /// Start the worker. `action` is invoked once per coalesced burst;
    /// with a zero delay it still runs asynchronously, never inline on
    /// the triggering caller.
    pub fn spawn<F, Fut>(delay: Duration, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(worker_loop(delay, rx, action));
        Self { tx, worker }
    }

    /// Schedule the action to run after the quiet interval; re-arms
    /// from zero if a firing is already pending.
    pub fn trigger(&self) {
        let _ = self.tx.send(Command::Trigger);
    }

    /// Discard any pending firing without running it. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(Command::Cancel);
    }

    /// Cancel pending work and stop the worker.
    pub async fn shutdown(self) {
        let _ = self.tx.send(Command::Shutdown);
        let _ = self.worker.await;
    }
}

async fn worker_loop<F, Fut>(delay: Duration, mut rx: UnboundedReceiver<Command>, action: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        // Idle until the first trigger of a burst.
        let Some(command) = rx.recv().await else { return };
        match command {
            Command::Cancel => continue,
            Command::Shutdown => return,
            Command::Trigger => {}
        }

        // Armed: each further trigger re-arms the timer from zero.
        'armed: loop {
            let quiet = tokio::time::sleep(delay);
            tokio::pin!(quiet);
            tokio::select! {
                _ = &mut quiet => {
                    run_action(&action).await;
                    break 'armed;
                }
                command = rx.recv() => match command {
                    Some(Command::Trigger) => continue 'armed,
                    Some(Command::Cancel) => break 'armed,
                    Some(Command::Shutdown) | None => return,
                },
            }
        }
    }
}

async fn run_action<F, Fut>(action: &F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    // The action runs on its own task so a panic cannot take down the
    // worker or suppress future triggers.
    if let Err(err) = tokio::spawn(action()).await {
        tracing::error!(error = %err, "debounced action failed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::{advance, Instant};

    /// Let the worker task drain its channel and re-arm before the
    /// paused clock moves.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn counting_debouncer(delay: Duration) -> (Debouncer, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let action_count = count.clone();
        let debouncer = Debouncer::spawn(delay, move || {
            let count = action_count.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
            }
        });
        (debouncer, count)
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn burst_of_triggers_coalesces_to_one_invocation() {
        let (debouncer, count) = counting_debouncer(Duration::from_millis(100));

        for _ in 0..5 {
            debouncer.trigger();
            settle().await;
            advance(Duration::from_millis(10)).await;
        }

        advance(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1, "burst must coalesce");

        debouncer.shutdown().await;
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn separated_bursts_fire_once_each() {
        let (debouncer, count) = counting_debouncer(Duration::from_millis(100));

        debouncer.trigger();
        settle().await;
        advance(Duration::from_millis(150)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        debouncer.trigger();
        settle().await;
        advance(Duration::from_millis(150)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 2, "bursts must not merge");

        debouncer.shutdown().await;
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn action_fires_quiet_interval_after_last_trigger() {
        // D = 100ms, triggers at t=0, 50, 90: one firing at t≈190ms.
        let fired_at = Arc::new(Mutex::new(Vec::<Instant>::new()));
        let action_fired = fired_at.clone();
        let debouncer = Debouncer::spawn(Duration::from_millis(100), move || {
            let fired = action_fired.clone();
            async move {
                fired.lock().expect("lock").push(Instant::now());
            }
        });
        let start = Instant::now();

        debouncer.trigger();
        settle().await;
        advance(Duration::from_millis(50)).await;
        debouncer.trigger();
        settle().await;
        advance(Duration::from_millis(40)).await;
        debouncer.trigger();
        settle().await;

        advance(Duration::from_millis(200)).await;
        settle().await;

        let fired = fired_at.lock().expect("lock");
        assert_eq!(fired.len(), 1, "exactly one firing per burst");
        let elapsed = fired[0] - start;
        assert!(
            elapsed >= Duration::from_millis(190) && elapsed < Duration::from_millis(200),
            "fired at {elapsed:?}, expected ≈190ms"
        );

        drop(fired);
        debouncer.shutdown().await;
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn cancel_discards_pending_firing() {
        let (debouncer, count) = counting_debouncer(Duration::from_millis(100));

        debouncer.trigger();
        settle().await;
        debouncer.cancel();
        debouncer.cancel(); // idempotent
        settle().await;
        advance(Duration::from_millis(300)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0, "cancelled firing must not run");

        // Cancelling does not break future triggers.
        debouncer.trigger();
        settle().await;
        advance(Duration::from_millis(150)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        debouncer.shutdown().await;
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn zero_delay_still_runs_asynchronously() {
        let (debouncer, count) = counting_debouncer(Duration::ZERO);

        debouncer.trigger();
        // Nothing has run inline on this caller yet.
        assert_eq!(count.load(Ordering::SeqCst), 0);

        settle().await;
        advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        debouncer.shutdown().await;
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn panicking_action_does_not_stop_future_triggers() {
        let count = Arc::new(AtomicUsize::new(0));
        let action_count = count.clone();
        let debouncer = Debouncer::spawn(Duration::from_millis(10), move || {
            let count = action_count.clone();
            async move {
                if count.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("first invocation fails");
                }
            }
        });

        debouncer.trigger();
        settle().await;
        advance(Duration::from_millis(50)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        debouncer.trigger();
        settle().await;
        advance(Duration::from_millis(50)).await;
        settle().await;
        assert_eq!(
            count.load(Ordering::SeqCst),
            2,
            "worker must survive a panicking action"
        );

        debouncer.shutdown().await;
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn shutdown_discards_pending_firing() {
        let (debouncer, count) = counting_debouncer(Duration::from_millis(100));

        debouncer.trigger();
        settle().await;
        debouncer.shutdown().await;

        advance(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
