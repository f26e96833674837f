//! Fixed retry schedules.
//!
//! Retries follow a fixed ordered list of delays rather than computed
//! exponential backoff: several immediate-ish retries absorb transient
//! connection resets, and the tail entries back off hard so a struggling
//! source is not amplified.

use std::time::Duration;

/// An ordered list of delays applied between failed attempts.
///
/// A schedule of length `n` allows `n + 1` total attempts. Index `i` is the
/// delay slept after attempt `i + 1` fails.
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
}

impl RetrySchedule {
    /// Builds a schedule from explicit delays.
    #[must_use]
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Schedule for structured metadata API calls: six quick retries, then
    /// two long backoff tiers (3 s, 10 s).
    #[must_use]
    pub fn api() -> Self {
        let mut delays = vec![Duration::from_millis(100); 6];
        delays.push(Duration::from_secs(3));
        delays.push(Duration::from_secs(10));
        Self { delays }
    }

    /// Schedule for publisher page fetches: six quick retries, no long tail.
    #[must_use]
    pub fn page() -> Self {
        Self {
            delays: vec![Duration::from_millis(100); 6],
        }
    }

    /// Short per-source schedule used inside the identifier fallback chain,
    /// where the next source is a better bet than hammering the current one.
    #[must_use]
    pub fn probe() -> Self {
        Self {
            delays: vec![Duration::from_millis(100); 2],
        }
    }

    /// No retries: a single attempt.
    #[must_use]
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    /// Number of retries (total attempts minus one).
    #[must_use]
    pub fn retries(&self) -> usize {
        self.delays.len()
    }

    /// Delay to sleep after the given failed attempt (0-indexed), or `None`
    /// when the schedule is exhausted.
    #[must_use]
    pub fn delay_after(&self, failed_attempt: usize) -> Option<Duration> {
        self.delays.get(failed_attempt).copied()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_schedule_shape() {
        let schedule = RetrySchedule::api();
        assert_eq!(schedule.retries(), 8);
        assert_eq!(schedule.delay_after(0).unwrap(), Duration::from_millis(100));
        assert_eq!(schedule.delay_after(5).unwrap(), Duration::from_millis(100));
        assert_eq!(schedule.delay_after(6).unwrap(), Duration::from_secs(3));
        assert_eq!(schedule.delay_after(7).unwrap(), Duration::from_secs(10));
        assert!(schedule.delay_after(8).is_none());
    }

    #[test]
    fn test_page_schedule_shape() {
        let schedule = RetrySchedule::page();
        assert_eq!(schedule.retries(), 6);
        assert!(schedule.delay_after(6).is_none());
    }

    #[test]
    fn test_probe_schedule_is_short() {
        assert_eq!(RetrySchedule::probe().retries(), 2);
    }

    #[test]
    fn test_none_schedule_allows_single_attempt() {
        let schedule = RetrySchedule::none();
        assert_eq!(schedule.retries(), 0);
        assert!(schedule.delay_after(0).is_none());
    }
}
