//! Bounded-admission task scheduler used to throttle LLM calls.
//!
//! A limiter admits at most `max_concurrency` tasks at once. Tasks beyond
//! that wait in a FIFO queue and are admitted strictly in the order
//! [`ConcurrencyLimiter::execute`] was called, regardless of how quickly
//! earlier tasks finish. Completion order is unconstrained.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimiterError {
    #[error("max_concurrency must be greater than zero")]
    ZeroConcurrency,
}

#[derive(Debug, Default)]
struct LimiterState {
    running: usize,
    waiting: VecDeque<oneshot::Sender<()>>,
}

#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    max_concurrency: usize,
    state: Arc<Mutex<LimiterState>>,
}

impl ConcurrencyLimiter {
    pub fn new(max_concurrency: usize) -> Result<Self, LimiterError> {
        if max_concurrency == 0 {
            return Err(LimiterError::ZeroConcurrency);
        }
        Ok(Self {
            max_concurrency,
            state: Arc::new(Mutex::new(LimiterState::default())),
        })
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Tasks currently holding a slot.
    pub fn in_flight(&self) -> usize {
        lock(&self.state).running
    }

    /// Tasks waiting for a slot.
    pub fn queued(&self) -> usize {
        lock(&self.state).waiting.len()
    }

    /// Runs `task` once a slot is free and resolves to the task's own output.
    ///
    /// Admission is decided when `execute` is called, not when the returned
    /// future is first polled, so a batch of calls made in order is admitted
    /// in that order. The slot is released when the task finishes, fails or
    /// is dropped.
    pub fn execute<F, Fut, T>(&self, task: F) -> impl Future<Output = T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let admission = self.admit();
        async move {
            let _slot = match admission {
                Admission::Immediate(slot) => slot,
                Admission::Queued(mut waiter) => waiter.admitted().await,
            };
            task().await
        }
    }

    fn admit(&self) -> Admission {
        let mut state = lock(&self.state);
        if state.running < self.max_concurrency {
            state.running += 1;
            return Admission::Immediate(Slot {
                state: Arc::clone(&self.state),
            });
        }

        let (tx, rx) = oneshot::channel();
        state.waiting.push_back(tx);
        Admission::Queued(Waiter {
            rx: Some(rx),
            state: Arc::clone(&self.state),
        })
    }
}

fn lock(state: &Mutex<LimiterState>) -> MutexGuard<'_, LimiterState> {
    // The state is two counters; a panic mid-update cannot leave it torn.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Hands a finished task's slot to the oldest live waiter, or frees it.
fn release(state: &Mutex<LimiterState>) {
    let mut state = lock(state);
    while let Some(next) = state.waiting.pop_front() {
        if next.send(()).is_ok() {
            return;
        }
        // receiver dropped while queued; try the next one
    }
    state.running = state.running.saturating_sub(1);
}

enum Admission {
    Immediate(Slot),
    Queued(Waiter),
}

/// An occupied slot. Dropping it releases the slot.
struct Slot {
    state: Arc<Mutex<LimiterState>>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        release(&self.state);
    }
}

struct Waiter {
    rx: Option<oneshot::Receiver<()>>,
    state: Arc<Mutex<LimiterState>>,
}

impl Waiter {
    async fn admitted(&mut self) -> Slot {
        if let Some(rx) = self.rx.as_mut() {
            // Senders live in the shared queue until they are signalled,
            // so this only resolves once the slot has been handed over.
            let _ = rx.await;
        }
        self.rx = None;
        Slot {
            state: Arc::clone(&self.state),
        }
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        // Closing first makes any later `send` fail, so a hand-off either
        // lands here and is released, or goes to the next waiter.
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            if rx.try_recv().is_ok() {
                release(&self.state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::future::join_all;
    use tokio::time::{sleep, Instant};

    #[derive(Default)]
    struct Probe {
        active: AtomicUsize,
        peak: AtomicUsize,
        starts: Mutex<Vec<usize>>,
        spans: Mutex<Vec<(Instant, Instant)>>,
    }

    impl Probe {
        async fn run(&self, id: usize, work: Duration) -> usize {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.starts.lock().unwrap().push(id);
            let entered = Instant::now();
            sleep(work).await;
            self.spans.lock().unwrap().push((entered, Instant::now()));
            self.active.fetch_sub(1, Ordering::SeqCst);
            id
        }
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        assert_eq!(
            ConcurrencyLimiter::new(0).unwrap_err(),
            LimiterError::ZeroConcurrency
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_slot_runs_one_at_a_time_in_order() {
        let limiter = ConcurrencyLimiter::new(1).unwrap();
        let probe = Probe::default();

        // later tasks are faster; they must still wait their turn
        let results = join_all((0..6).map(|i| {
            let probe = &probe;
            limiter.execute(move || probe.run(i, Duration::from_millis(60 - 10 * i as u64)))
        }))
        .await;

        assert_eq!(results, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(probe.peak.load(Ordering::SeqCst), 1);
        assert_eq!(*probe.starts.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.queued(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_max_concurrency() {
        let limiter = ConcurrencyLimiter::new(3).unwrap();
        let probe = Probe::default();

        join_all((0..10).map(|i| {
            let probe = &probe;
            limiter.execute(move || probe.run(i, Duration::from_millis(10 + (i as u64 % 4) * 7)))
        }))
        .await;

        assert_eq!(probe.peak.load(Ordering::SeqCst), 3);

        let spans = probe.spans.lock().unwrap();
        assert_eq!(spans.len(), 10);
        for (entered, _) in spans.iter() {
            let overlapping = spans
                .iter()
                .filter(|(start, end)| start <= entered && entered < end)
                .count();
            assert!(overlapping <= 3, "{overlapping} tasks running at once");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_admission_is_fifo_with_several_slots() {
        let limiter = ConcurrencyLimiter::new(2).unwrap();
        let probe = Probe::default();

        join_all((0..8).map(|i| {
            let probe = &probe;
            limiter.execute(move || probe.run(i, Duration::from_millis(80 - 10 * i as u64)))
        }))
        .await;

        assert_eq!(*probe.starts.lock().unwrap(), (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_errors_propagate_and_release_the_slot() {
        let limiter = ConcurrencyLimiter::new(1).unwrap();

        let failed: Result<u32, String> = limiter
            .execute(|| async { Err("upstream timeout".to_string()) })
            .await;
        assert_eq!(failed.unwrap_err(), "upstream timeout");
        assert_eq!(limiter.in_flight(), 0);

        let ok: Result<u32, String> = limiter.execute(|| async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_waiter_does_not_leak_a_slot() {
        let limiter = ConcurrencyLimiter::new(1).unwrap();

        let first = limiter.execute(|| sleep(Duration::from_millis(50)));
        let abandoned = limiter.execute(|| async {});
        assert_eq!(limiter.in_flight(), 1);
        assert_eq!(limiter.queued(), 1);
        drop(abandoned);

        first.await;
        assert_eq!(limiter.in_flight(), 0);

        limiter.execute(|| async {}).await;
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_waiter_dropped_after_hand_off_returns_the_slot() {
        let limiter = ConcurrencyLimiter::new(1).unwrap();

        let first = limiter.execute(|| async {});
        let handed_over = limiter.execute(|| async {});
        assert_eq!(limiter.queued(), 1);

        // finishing `first` signals the queued waiter, which never runs
        first.await;
        assert_eq!(limiter.queued(), 0);
        assert_eq!(limiter.in_flight(), 1);

        drop(handed_over);
        assert_eq!(limiter.in_flight(), 0);

        let ran: u32 = limiter.execute(|| async { 3 }).await;
        assert_eq!(ran, 3);
    }
}
