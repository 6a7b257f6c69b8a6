//! Rate limiting for a single send target.
//!
//! A [`ThrottleGate`] lets at most one send through per configured interval.
//! An interval of zero disables the gate entirely.
//!
//! The check and the timestamp update happen under one lock, so two threads
//! sharing a gate can never both pass inside the same window. The lock is
//! released before the guarded action runs.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Returned when a send is attempted inside the throttle window.
///
/// This is a policy rejection, not a delivery failure: nothing was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttled;

impl fmt::Display for Throttled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sending too fast: throttled")
    }
}

impl std::error::Error for Throttled {}

#[derive(Debug, Default)]
struct State {
    interval: Duration,
    last_sent: Option<Instant>,
}

impl State {
    fn admits(&self, now: Instant) -> bool {
        if self.interval.is_zero() {
            return true;
        }
        match self.last_sent {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }
}

/// Interval-based gate: one accepted call per `interval`.
#[derive(Debug, Default)]
pub struct ThrottleGate {
    state: Mutex<State>,
}

impl ThrottleGate {
    /// Creates a disabled gate (interval zero).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gate with the given interval.
    pub fn with_interval(interval: Duration) -> Self {
        let gate = Self::new();
        gate.set_interval(interval);
        gate
    }

    /// A panic in another holder cannot leave `State` half-written, so a
    /// poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Currently configured interval.
    pub fn interval(&self) -> Duration {
        self.lock().interval
    }

    /// Changes the interval and forgets the last send.
    ///
    /// The next call after reconfiguration is always accepted.
    pub fn set_interval(&self, interval: Duration) {
        let mut state = self.lock();
        state.interval = interval;
        state.last_sent = None;
    }

    /// Forgets the last send, keeping the interval.
    pub fn reset(&self) {
        self.lock().last_sent = None;
    }

    /// Whether the gate is active.
    pub fn is_enabled(&self) -> bool {
        !self.lock().interval.is_zero()
    }

    /// Tries to pass the gate now.
    ///
    /// On success the current instant is recorded as the last send.
    pub fn try_acquire(&self) -> Result<(), Throttled> {
        self.try_acquire_at(Instant::now())
    }

    /// Tries to pass the gate at `now`.
    ///
    /// Rejections leave the state untouched. An elapsed time exactly equal
    /// to the interval is accepted.
    pub(crate) fn try_acquire_at(&self, now: Instant) -> Result<(), Throttled> {
        let mut state = self.lock();
        if !state.admits(now) {
            log::trace!("[Throttle] Rejected, interval {:?}", state.interval);
            return Err(Throttled);
        }
        state.last_sent = Some(now);
        Ok(())
    }

    /// Runs `action` if the gate admits it, returning its output.
    ///
    /// The send time is recorded before `action` runs. When throttled,
    /// `action` is never called.
    pub fn run<T>(&self, action: impl FnOnce() -> T) -> Result<T, Throttled> {
        self.try_acquire()?;
        Ok(action())
    }
}
