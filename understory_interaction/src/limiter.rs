// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rate limiters: debounce and throttle as clock-driven state machines.
//!
//! A limiter never owns a timer. It is asked [`RateLimiter::should_fire_now`]
//! with the current time and answers with a [`Verdict`]:
//!
//! - [`Verdict::Fire`]: invoke now.
//! - [`Verdict::Defer`]: invoke later, at the given time, with the most recent
//!   call's arguments. A new `Defer` replaces any earlier one.
//!
//! Whoever schedules the deferred call reports back with
//! [`RateLimiter::on_deferred`] once it actually runs.
//!
//! Times are milliseconds on any monotonic clock.
//!
//! ## Debounce
//!
//! Every call pushes the deadline out to `now + wait`; only the last call of a
//! burst runs, after a quiet period.
//!
//! ```
//! use understory_interaction::limiter::{RateLimit, Verdict};
//!
//! let mut debounce = RateLimit::Debounce { wait: 100 }.limiter();
//! assert_eq!(debounce.should_fire_now(0), Verdict::Defer { at: 100 });
//! assert_eq!(debounce.should_fire_now(10), Verdict::Defer { at: 110 });
//! assert_eq!(debounce.should_fire_now(20), Verdict::Defer { at: 120 });
//! debounce.on_deferred(120);
//! ```
//!
//! ## Throttle
//!
//! The first call in a window fires immediately; later calls inside the window
//! collapse into one trailing call at the window boundary.
//!
//! ```
//! use understory_interaction::limiter::{RateLimit, Verdict};
//!
//! let mut throttle = RateLimit::Throttle { interval: 250 }.limiter();
//! assert_eq!(throttle.should_fire_now(0), Verdict::Fire);
//! assert_eq!(throttle.should_fire_now(40), Verdict::Defer { at: 250 });
//! assert_eq!(throttle.should_fire_now(90), Verdict::Defer { at: 250 });
//! throttle.on_deferred(250);
//! assert_eq!(throttle.should_fire_now(260), Verdict::Defer { at: 500 });
//! ```

/// What to do with a call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Invoke immediately.
    Fire,
    /// Invoke at `at` with the latest arguments, replacing any earlier deferral.
    Defer {
        /// Absolute time of the deferred invocation.
        at: u64,
    },
}

/// Rate-limit configuration. Debounce and throttle are mutually exclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RateLimit {
    /// Coalesce bursts; fire `wait` ms after the last call.
    Debounce {
        /// Quiet period in milliseconds.
        wait: u64,
    },
    /// Fire at most once per `interval` ms, keeping the trailing call.
    Throttle {
        /// Window length in milliseconds.
        interval: u64,
    },
}

impl RateLimit {
    /// Create fresh limiter state for this configuration.
    pub fn limiter(self) -> RateLimiter {
        match self {
            Self::Debounce { wait } => RateLimiter::Debounce(Debounce::new(wait)),
            Self::Throttle { interval } => RateLimiter::Throttle(Throttle::new(interval)),
        }
    }
}

/// Debounce state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Debounce {
    wait: u64,
    deadline: Option<u64>,
}

impl Debounce {
    /// Create a debouncer with the given quiet period.
    pub fn new(wait: u64) -> Self {
        Self {
            wait,
            deadline: None,
        }
    }

    /// Record a call at `now`. Always defers.
    pub fn should_fire_now(&mut self, now: u64) -> Verdict {
        let at = now.saturating_add(self.wait);
        self.deadline = Some(at);
        Verdict::Defer { at }
    }

    /// The deferred call scheduled for `at` ran.
    pub fn on_deferred(&mut self, at: u64) {
        if self.deadline == Some(at) {
            self.deadline = None;
        }
    }

    /// The pending deadline, if a call is waiting.
    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }
}

/// Throttle state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Throttle {
    interval: u64,
    last: Option<u64>,
    deferred: Option<u64>,
}

impl Throttle {
    /// Create a throttle with the given window length.
    pub fn new(interval: u64) -> Self {
        Self {
            interval,
            last: None,
            deferred: None,
        }
    }

    /// Record a call at `now`.
    pub fn should_fire_now(&mut self, now: u64) -> Verdict {
        match self.last {
            Some(last) if now < last.saturating_add(self.interval) => {
                let at = last.saturating_add(self.interval);
                self.deferred = Some(at);
                Verdict::Defer { at }
            }
            _ => {
                self.last = Some(now);
                self.deferred = None;
                Verdict::Fire
            }
        }
    }

    /// The trailing call scheduled for `at` ran; it opens the next window.
    pub fn on_deferred(&mut self, at: u64) {
        if self.deferred == Some(at) {
            self.deferred = None;
            self.last = Some(at);
        }
    }

    /// Start of the current window, if any call has fired.
    pub fn last_fired(&self) -> Option<u64> {
        self.last
    }
}

/// Runtime limiter state for one bound (anchor, event) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimiter {
    /// Debounced.
    Debounce(Debounce),
    /// Throttled.
    Throttle(Throttle),
}

impl RateLimiter {
    /// Decide whether a call at `now` runs immediately or is deferred.
    pub fn should_fire_now(&mut self, now: u64) -> Verdict {
        match self {
            Self::Debounce(d) => d.should_fire_now(now),
            Self::Throttle(t) => t.should_fire_now(now),
        }
    }

    /// Report that the deferred call scheduled for `at` ran.
    pub fn on_deferred(&mut self, at: u64) {
        match self {
            Self::Debounce(d) => d.on_deferred(at),
            Self::Throttle(t) => t.on_deferred(at),
        }
    }
}
