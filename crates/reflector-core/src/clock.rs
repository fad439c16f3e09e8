//! Countdown timer used throughout the reflector loop.

use std::time::Duration;

/// A countdown timer with millisecond resolution.
///
/// The upstream implementation this is grounded on constructs timers from a
/// tick granularity plus a `(seconds, extra_milliseconds)` pair; since those
/// two components are only ever combined into one total before the timer is
/// ever ticked, [`Timer`] collapses them into a single `timeout`. Re-starting
/// a running timer reloads `remaining` to `timeout` rather than accumulating.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    timeout: Duration,
    remaining: Duration,
    running: bool,
}

impl Timer {
    /// Create a new, stopped timer with the given timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            remaining: timeout,
            running: false,
        }
    }

    /// Start (or restart) the timer: `remaining` is reloaded to `timeout`.
    pub fn start(&mut self) {
        self.remaining = self.timeout;
        self.running = true;
    }

    /// Stop the timer. A stopped timer never expires.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether the timer is currently running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance the timer by `elapsed`. No-op if stopped.
    pub fn tick(&mut self, elapsed: Duration) {
        if self.running {
            self.remaining = self.remaining.saturating_sub(elapsed);
        }
    }

    /// True when running and the remaining time has reached zero.
    pub fn expired(&self) -> bool {
        self.running && self.remaining.is_zero()
    }

    /// Time left before expiry (meaningless if not running).
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_timer_never_expires() {
        let mut t = Timer::new(Duration::from_millis(100));
        t.tick(Duration::from_secs(10));
        assert!(!t.expired());
    }

    #[test]
    fn expires_once_remaining_reaches_zero() {
        let mut t = Timer::new(Duration::from_millis(100));
        t.start();
        t.tick(Duration::from_millis(60));
        assert!(!t.expired());
        t.tick(Duration::from_millis(40));
        assert!(t.expired());
    }

    #[test]
    fn restart_reloads_remaining() {
        let mut t = Timer::new(Duration::from_millis(100));
        t.start();
        t.tick(Duration::from_millis(90));
        t.start();
        assert_eq!(t.remaining(), Duration::from_millis(100));
        assert!(!t.expired());
    }

    #[test]
    fn stop_clears_running_and_suppresses_expiry() {
        let mut t = Timer::new(Duration::from_millis(10));
        t.start();
        t.tick(Duration::from_millis(10));
        assert!(t.expired());
        t.stop();
        assert!(!t.is_running());
        assert!(!t.expired());
    }
}
