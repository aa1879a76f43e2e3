//! Time source used by the batcher's quiet-period timer.
//!
//! Production code runs on [`SystemClock`]. Tests inject a [`FakeClock`] whose
//! time only moves when [`FakeClock::step`] is called, so quiet-period flushes
//! can be driven without real delays.

use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// One-shot timer returned by [`Clock::sleep`]. Dropping it cancels the timer.
pub type ClockSleep = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Timer resolving once `duration` has elapsed from [`Clock::now`]. The
    /// deadline is fixed when this is called, not when the future is polled.
    fn sleep(&self, duration: Duration) -> ClockSleep;
}

/// Wall clock backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> ClockSleep {
        Box::pin(tokio::time::sleep(duration))
    }
}

struct Waiter {
    deadline: Instant,
    notify: oneshot::Sender<()>,
}

struct FakeClockState {
    now: Instant,
    waiters: Vec<Waiter>,
}

/// Manually driven clock for deterministic tests.
pub struct FakeClock {
    state: Mutex<FakeClockState>,
}

impl std::fmt::Debug for FakeClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FakeClock")
            .field("now", &state.now)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl FakeClock {
    pub fn new(now: Instant) -> Self {
        Self {
            state: Mutex::new(FakeClockState {
                now,
                waiters: Vec::new(),
            }),
        }
    }

    /// Advance time by `duration` and fire every timer that is now due.
    pub fn step(&self, duration: Duration) {
        let due = {
            let mut state = self.state.lock();
            state.now += duration;
            let now = state.now;
            let (due, pending): (Vec<Waiter>, Vec<Waiter>) = std::mem::take(&mut state.waiters)
                .into_iter()
                .partition(|waiter| waiter.deadline <= now);
            state.waiters = pending;
            due
        };
        for waiter in due {
            let _ = waiter.notify.send(());
        }
    }

    /// Whether any timer handed out by this clock is still pending.
    pub fn has_waiters(&self) -> bool {
        self.waiter_count() > 0
    }

    pub fn waiter_count(&self) -> usize {
        let mut state = self.state.lock();
        state.waiters.retain(|waiter| !waiter.notify.is_closed());
        state.waiters.len()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().now
    }

    fn sleep(&self, duration: Duration) -> ClockSleep {
        let mut state = self.state.lock();
        let deadline = state.now + duration;
        if deadline <= state.now {
            return Box::pin(std::future::ready(()));
        }
        let (notify, fired) = oneshot::channel();
        state.waiters.retain(|waiter| !waiter.notify.is_closed());
        state.waiters.push(Waiter { deadline, notify });
        Box::pin(async move {
            // Clock dropped: the deadline can never be reached.
            if fired.await.is_err() {
                std::future::pending::<()>().await;
            }
        })
    }
}
