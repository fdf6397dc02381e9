//! Cancellable timers on the tokio clock.
//!
//! [`start_countdown`] drives the memorize and play phases: it ticks once per
//! elapsed second with the seconds remaining (`duration - 1` down to `0`) and
//! then fires its expiry callback exactly once. [`schedule`] is the one-shot
//! variant used for the mismatch presentation delay.
//!
//! Both return a [`TimerHandle`]. Cancelling a handle (explicitly or by
//! dropping it) guarantees that no further callback runs. Tests drive these
//! timers with tokio's paused clock (`#[tokio::test(start_paused = true)]`),
//! so nothing waits on wall-clock time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// Process-unique timer identifier, used to recognise stale signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Owner of a running timer. Dropping the handle cancels the timer.
#[derive(Debug)]
pub struct TimerHandle {
    id: TimerId,
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Stops future ticks and suppresses a pending expiry.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// True once the timer has expired or been torn down.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Starts a countdown of `duration_secs` seconds.
///
/// `on_tick` receives the seconds remaining after each elapsed second;
/// `on_expire` runs once, right after the final `0` tick, unless the handle
/// was cancelled first. Both callbacks get the timer's id so receivers can
/// drop signals from a timer they no longer own. Must be called from within
/// a tokio runtime.
pub fn start_countdown<T, E>(duration_secs: u32, mut on_tick: T, on_expire: E) -> TimerHandle
where
    T: FnMut(TimerId, u32) + Send + 'static,
    E: FnOnce(TimerId) + Send + 'static,
{
    let id = TimerId::next();
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);

    let task = tokio::spawn(async move {
        let start = Instant::now();
        for elapsed in 1..=duration_secs {
            time::sleep_until(start + Duration::from_secs(u64::from(elapsed))).await;
            if flag.load(Ordering::Acquire) {
                return;
            }
            on_tick(id, duration_secs - elapsed);
        }
        if flag.load(Ordering::Acquire) {
            return;
        }
        on_expire(id);
    });

    tracing::debug!(%id, duration_secs, "countdown started");
    TimerHandle {
        id,
        cancelled,
        task,
    }
}

/// Runs `on_fire` once after `delay`, unless cancelled first.
pub fn schedule<F>(delay: Duration, on_fire: F) -> TimerHandle
where
    F: FnOnce(TimerId) + Send + 'static,
{
    let id = TimerId::next();
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);

    let task = tokio::spawn(async move {
        time::sleep(delay).await;
        if !flag.load(Ordering::Acquire) {
            on_fire(id);
        }
    });

    TimerHandle {
        id,
        cancelled,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct Recorder {
        ticks: Arc<Mutex<Vec<u32>>>,
        expired: Arc<AtomicUsize>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                ticks: Arc::new(Mutex::new(Vec::new())),
                expired: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn start(&self, duration_secs: u32) -> TimerHandle {
            let ticks = Arc::clone(&self.ticks);
            let expired = Arc::clone(&self.expired);
            start_countdown(
                duration_secs,
                move |_, remaining| ticks.lock().unwrap().push(remaining),
                move |_| {
                    expired.fetch_add(1, Ordering::SeqCst);
                },
            )
        }

        fn ticks(&self) -> Vec<u32> {
            self.ticks.lock().unwrap().clone()
        }

        fn expired(&self) -> usize {
            self.expired.load(Ordering::SeqCst)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_down_to_zero_then_expires_once() {
        let recorder = Recorder::new();
        let handle = recorder.start(3);

        time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(recorder.ticks(), vec![2, 1]);
        assert_eq!(recorder.expired(), 0);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(recorder.ticks(), vec![2, 1, 0]);
        assert_eq!(recorder.expired(), 1);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_countdown_never_expires() {
        let recorder = Recorder::new();
        let handle = recorder.start(3);

        time::sleep(Duration::from_millis(1500)).await;
        handle.cancel();
        assert!(handle.is_cancelled());

        // Wait well past the original duration.
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(recorder.ticks(), vec![2]);
        assert_eq!(recorder.expired(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels() {
        let recorder = Recorder::new();
        drop(recorder.start(2));

        time::sleep(Duration::from_secs(10)).await;
        assert!(recorder.ticks().is_empty());
        assert_eq!(recorder.expired(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_callback_fires_after_delay_unless_cancelled() {
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        let _kept = schedule(Duration::from_millis(800), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&fired);
        let cancelled = schedule(Duration::from_millis(800), move |_| {
            counter.fetch_add(10, Ordering::SeqCst);
        });
        cancelled.cancel();

        time::sleep(Duration::from_millis(799)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn callbacks_receive_their_timer_id() {
        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        let handle = schedule(Duration::from_millis(10), move |id| {
            *slot.lock().unwrap() = Some(id);
        });

        time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*seen.lock().unwrap(), Some(handle.id()));
    }

    #[test]
    fn timer_ids_are_unique() {
        let a = TimerId::next();
        let b = TimerId::next();
        assert_ne!(a, b);
    }
}
