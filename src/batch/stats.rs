//! Per-batch counters.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for one batch file, incremented by concurrently running record
/// tasks.
#[derive(Debug, Default)]
pub struct BatchStats {
    total_records: AtomicUsize,
    already_had_abstract: AtomicUsize,
    missing_identifiers: AtomicUsize,
    fetched: AtomicUsize,
    failed: AtomicUsize,
}

impl BatchStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_total(&self, count: usize) {
        self.total_records.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_already_had(&self) {
        self.already_had_abstract.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_missing_identifiers(&self) {
        self.missing_identifiers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetched(&self) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_records: self.total_records.load(Ordering::Relaxed),
            already_had_abstract: self.already_had_abstract.load(Ordering::Relaxed),
            missing_identifiers: self.missing_identifiers.load(Ordering::Relaxed),
            fetched: self.fetched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Plain-value view of [`BatchStats`], also used to aggregate across files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Records seen in the batch.
    pub total_records: usize,
    /// Records skipped because they already had an abstract.
    pub already_had_abstract: usize,
    /// Records with neither a DOI nor a URL.
    pub missing_identifiers: usize,
    /// Records whose abstract was fetched this run.
    pub fetched: usize,
    /// Records attempted but left without an abstract.
    pub failed: usize,
}

impl StatsSnapshot {
    /// Element-wise accumulation for the end-of-run summary.
    pub fn accumulate(&mut self, other: StatsSnapshot) {
        self.total_records += other.total_records;
        self.already_had_abstract += other.already_had_abstract;
        self.missing_identifiers += other.missing_identifiers;
        self.fetched += other.fetched;
        self.failed += other.failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = BatchStats::new();
        stats.add_total(5);
        stats.record_already_had();
        stats.record_fetched();
        stats.record_fetched();
        stats.record_failed();

        let snap = stats.snapshot();
        assert_eq!(snap.total_records, 5);
        assert_eq!(snap.already_had_abstract, 1);
        assert_eq!(snap.fetched, 2);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.missing_identifiers, 0);
    }

    #[test]
    fn test_snapshot_accumulate() {
        let mut total = StatsSnapshot::default();
        total.accumulate(StatsSnapshot {
            total_records: 3,
            fetched: 2,
            ..StatsSnapshot::default()
        });
        total.accumulate(StatsSnapshot {
            total_records: 4,
            failed: 1,
            ..StatsSnapshot::default()
        });
        assert_eq!(total.total_records, 7);
        assert_eq!(total.fetched, 2);
        assert_eq!(total.failed, 1);
    }
}
