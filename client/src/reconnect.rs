use std::time::Duration;

use crate::config::ReconnectPolicy;

/// Reconnection state machine.
///
/// Owns the attempt counter. The driver asks for the next delay after every
/// close, resets after every successful open, and stops it on `disconnect`.
#[derive(Debug, Clone)]
pub struct Reconnector {
    policy: ReconnectPolicy,
    attempts: u32,
    stopped: bool,
}

impl Reconnector {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            stopped: false,
        }
    }

    /// Re-arm after a `stop`, with a fresh counter.
    pub fn start(&mut self) {
        self.stopped = false;
        self.attempts = 0;
    }

    /// Suppress all further attempts.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Called after a successful open.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.policy.enabled && !self.stopped && self.attempts >= self.policy.max_attempts
    }

    /// Delay before the next attempt, counting it; `None` once the policy
    /// says to give up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.stopped || !self.policy.enabled || self.attempts >= self.policy.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.policy.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy {
            enabled: true,
            interval: Duration::from_millis(250),
            max_attempts,
        }
    }

    #[test]
    fn test_bounded_by_max_attempts() {
        let mut r = Reconnector::new(policy(2));
        assert_eq!(r.next_delay(), Some(Duration::from_millis(250)));
        assert_eq!(r.next_delay(), Some(Duration::from_millis(250)));
        assert_eq!(r.next_delay(), None);
        assert_eq!(r.attempts(), 2);
        assert!(r.is_exhausted());
    }

    #[test]
    fn test_reset_after_open() {
        let mut r = Reconnector::new(policy(1));
        assert!(r.next_delay().is_some());
        assert!(r.next_delay().is_none());
        r.reset();
        assert!(r.next_delay().is_some());
    }

    #[test]
    fn test_stop_suppresses_and_start_rearms() {
        let mut r = Reconnector::new(policy(3));
        r.stop();
        assert_eq!(r.next_delay(), None);
        assert!(!r.is_exhausted());
        r.start();
        assert!(r.next_delay().is_some());
    }

    #[test]
    fn test_disabled_policy_never_retries() {
        let mut r = Reconnector::new(ReconnectPolicy::disabled());
        assert_eq!(r.next_delay(), None);
        assert!(!r.is_exhausted());
    }
}
