//! # Clock
//!
//! The exchange compares the Caller's `Now` against the Issuer's own clock
//! and stamps issued tokens with it. Reading time through [`Clock`] lets tests
//! pin "now" instead of racing the wall clock.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

/// Source of the current time in Unix seconds.
pub trait Clock: Send + Sync {
    /// Current time in whole seconds since 1970-01-01T00:00:00Z.
    fn now_unix(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// A clock under test control.
///
/// Each read returns the current value and then advances it by `step`
/// seconds; a step of zero gives a frozen clock.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
    step: i64,
}

impl ManualClock {
    /// A clock frozen at `now`.
    pub fn fixed(now: i64) -> Self {
        Self::stepping(now, 0)
    }

    /// A clock starting at `start` that moves forward by `step` on every read.
    pub fn stepping(start: i64, step: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
            step,
        }
    }

    /// Jump the clock to `now`.
    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move the clock by `delta` seconds without counting as a read.
    pub fn advance(&self, delta: i64) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> i64 {
        self.now.fetch_add(self.step, Ordering::SeqCst)
    }
}

/// Render Unix seconds as an RFC 7231 HTTP-date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
///
/// Returns `None` for timestamps chrono cannot represent.
pub fn http_date(unix: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(unix, 0)
        .map(|dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}
