//! How often, and for how long, run statuses are polled.

use std::time::Duration;

use backoff::Clock;
use backoff::backoff::Backoff;
use backoff::exponential::ExponentialBackoff;

/// Controls the polling of a run until it reaches a terminal status.
///
/// Polls happen at a fixed interval. The first poll is issued right after
/// the run is created. When either cap is exceeded the exchange fails with
/// [`ExchangeErrorKind::RunTimeout`].
///
/// [`ExchangeErrorKind::RunTimeout`]: crate::ExchangeErrorKind::RunTimeout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    max_attempts: Option<u32>,
    max_elapsed: Option<Duration>,
}

impl PollPolicy {
    /// The default delay between two polls.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
    /// The default number of polls before giving up.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 600;

    /// A policy that polls forever.
    #[inline]
    pub fn unbounded() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            max_attempts: None,
            max_elapsed: None,
        }
    }

    /// Sets the delay between two polls.
    #[inline]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Caps the number of polls.
    #[inline]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Caps the time spent polling.
    #[inline]
    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = Some(max_elapsed);
        self
    }

    /// Returns the delay between two polls.
    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the maximum number of polls, if capped.
    #[inline]
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Returns the maximum time spent polling, if capped.
    #[inline]
    pub fn max_elapsed(&self) -> Option<Duration> {
        self.max_elapsed
    }

    pub(crate) fn schedule(&self) -> PollSchedule {
        // An exponential backoff without growth and jitter is a constant
        // schedule that still honors the elapsed cap.
        let backoff = ExponentialBackoff {
            current_interval: self.interval,
            initial_interval: self.interval,
            randomization_factor: 0.0,
            multiplier: 1.0,
            max_interval: self.interval,
            start_time: TokioClock.now(),
            max_elapsed_time: self.max_elapsed,
            clock: TokioClock,
        };
        PollSchedule {
            backoff,
            attempts: 0,
            max_attempts: self.max_attempts,
        }
    }
}

impl Default for PollPolicy {
    #[inline]
    fn default() -> Self {
        Self::unbounded().with_max_attempts(Self::DEFAULT_MAX_ATTEMPTS)
    }
}

/// Reads time from tokio, so paused test clocks apply to the elapsed cap.
#[derive(Clone, Copy, Debug, Default)]
struct TokioClock;

impl Clock for TokioClock {
    #[inline]
    fn now(&self) -> std::time::Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// The state of one polling loop.
pub(crate) struct PollSchedule {
    backoff: ExponentialBackoff<TokioClock>,
    attempts: u32,
    max_attempts: Option<u32>,
}

impl PollSchedule {
    /// Records a poll that didn't reach a terminal status, and returns how
    /// long to wait before the next one. Returns `None` once the policy is
    /// exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempts += 1;
        if self
            .max_attempts
            .is_some_and(|max_attempts| self.attempts >= max_attempts)
        {
            return None;
        }
        self.backoff.next_backoff()
    }

    /// Returns how many polls have been recorded.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval(), Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), Some(600));
        assert_eq!(policy.max_elapsed(), None);
    }

    #[test]
    fn test_attempt_cap() {
        let mut schedule = PollPolicy::unbounded()
            .with_interval(Duration::from_millis(250))
            .with_max_attempts(3)
            .schedule();

        for _ in 0..2 {
            let delay = schedule.next_delay().unwrap();
            // Jitter is disabled, up to float rounding.
            let drift = delay.abs_diff(Duration::from_millis(250));
            assert!(drift < Duration::from_millis(1));
        }
        assert_eq!(schedule.next_delay(), None);
        assert_eq!(schedule.attempts(), 3);
    }

    #[test]
    fn test_unbounded() {
        let mut schedule = PollPolicy::unbounded().schedule();
        for _ in 0..1000 {
            assert!(schedule.next_delay().is_some());
        }
    }
}
