//! Reusable send targets.
//!
//! A [`Channel`] binds an application key to a receiver key and carries its
//! own [`ThrottleGate`]. Channels are cheap to keep around and may be shared
//! between threads behind an `Arc`; every method takes `&self`.
//!
//! # Usage
//!
//! ```ignore
//! let channel = keys.resolve("HomeControl", "InfoGroup")?;
//! channel.set_throttle(Duration::from_secs(60));
//! dispatcher.send(&channel, "Door", "Front door opened")?;
//! ```

use std::fmt;
use std::time::Duration;

use crate::throttle::{ThrottleGate, Throttled};

/// Application/receiver key pair with optional rate limiting.
pub struct Channel {
    application: String,
    receiver: String,
    gate: ThrottleGate,
}

impl Channel {
    /// Builds a channel directly from raw keys, bypassing the key store.
    ///
    /// Throttling starts disabled.
    pub fn from_keys(application: impl Into<String>, receiver: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            receiver: receiver.into(),
            gate: ThrottleGate::new(),
        }
    }

    /// Limits this channel to one send per `interval`.
    ///
    /// Clears the send history, so the next send is always accepted.
    /// `Duration::ZERO` disables throttling.
    pub fn set_throttle(&self, interval: Duration) {
        self.gate.set_interval(interval);
    }

    /// Forgets the last send; the next one goes through unconditionally.
    pub fn reset_throttle(&self) {
        self.gate.reset();
    }

    /// Configured throttle interval (zero when disabled).
    pub fn throttle(&self) -> Duration {
        self.gate.interval()
    }

    /// Runs `action` if the throttle admits it.
    ///
    /// The send time is recorded before `action` runs; when throttled,
    /// `action` is not called and nothing changes.
    pub fn gate<T>(&self, action: impl FnOnce() -> T) -> Result<T, Throttled> {
        self.gate.run(action)
    }

    pub(crate) fn application_key(&self) -> &str {
        &self.application
    }

    pub(crate) fn receiver_key(&self) -> &str {
        &self.receiver
    }

    #[cfg(test)]
    pub(crate) fn gate_ref(&self) -> &ThrottleGate {
        &self.gate
    }
}

/// Shows only the first few characters of a secret.
pub(crate) fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    format!("{prefix}…")
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("application", &redact(&self.application))
            .field("receiver", &redact(&self.receiver))
            .field("throttle", &self.gate.interval())
            .finish()
    }
}
