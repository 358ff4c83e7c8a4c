//! Run progress accounting.
//!
//! [`ProgressTracker`] is a plain accumulator owned by the orchestrator's
//! worker; it is never shared, so it needs no atomics or locks.
//! [`ProgressSnapshot`] values are recomputed on demand from its counters.

use std::time::{Duration, Instant};

use tracing::warn;

/// Point-in-time view of a run's progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    /// Tasks that finished successfully (including already-present files).
    pub completed: usize,
    /// Tasks that failed after retries.
    pub failed: usize,
    /// Tasks in the run.
    pub total: usize,
    /// `floor((completed + failed) / total * 100)`, or 0 for an empty run.
    pub percentage: u8,
    /// Completed tasks per elapsed second.
    pub throughput: f64,
    /// Projected seconds until every remaining task is processed.
    pub eta_seconds: f64,
}

impl ProgressSnapshot {
    /// Tasks processed so far (`completed + failed`).
    #[must_use]
    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }

    /// Tasks not yet processed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed())
    }
}

/// Counts outcomes and timing for one run.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    completed: usize,
    failed: usize,
    total: usize,
    started_at: Option<Instant>,
}

impl ProgressTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the reference time for throughput.
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Adds `n` expected tasks. Called once, when the task list is built.
    pub fn add_total(&mut self, n: usize) {
        self.total = self.total.saturating_add(n);
    }

    /// Records one task outcome.
    ///
    /// Outcomes beyond `total` are dropped so `completed + failed <= total` always holds.
    pub fn record_outcome(&mut self, success: bool) {
        if self.completed + self.failed >= self.total {
            warn!(
                total = self.total,
                success, "outcome recorded past expected total; ignoring"
            );
            return;
        }
        if success {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Successful task count.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Failed task count.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Expected task count.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Time since [`start`](Self::start), or zero if never started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.map_or(Duration::ZERO, |started| started.elapsed())
    }

    /// Snapshot using the wall-clock time elapsed since [`start`](Self::start).
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot_with_elapsed(self.elapsed())
    }

    /// Snapshot computed for an explicit elapsed duration.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn snapshot_with_elapsed(&self, elapsed: Duration) -> ProgressSnapshot {
        let processed = self.completed + self.failed;
        let percentage = if self.total == 0 {
            0
        } else {
            // processed <= total, so this is at most 100.
            u8::try_from(processed.saturating_mul(100) / self.total).unwrap_or(100)
        };

        let elapsed_secs = elapsed.as_secs_f64();
        let throughput = if elapsed_secs > 0.0 {
            self.completed as f64 / elapsed_secs
        } else {
            0.0
        };

        let remaining = self.total.saturating_sub(processed);
        let eta_seconds = if throughput > 0.0 {
            remaining as f64 / throughput
        } else {
            0.0
        };

        ProgressSnapshot {
            completed: self.completed,
            failed: self.failed,
            total: self.total,
            percentage,
            throughput,
            eta_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tracker_snapshot_is_zero() {
        let tracker = ProgressTracker::new();
        let snapshot = tracker.snapshot_with_elapsed(Duration::from_secs(10));
        assert_eq!(snapshot.percentage, 0);
        assert_eq!(snapshot.total, 0);
        assert!(snapshot.throughput.abs() < f64::EPSILON);
        assert!(snapshot.eta_seconds.abs() < f64::EPSILON);
    }

    #[test]
    fn test_percentage_floors() {
        let mut tracker = ProgressTracker::new();
        tracker.add_total(3);
        tracker.record_outcome(true);
        assert_eq!(tracker.snapshot_with_elapsed(Duration::ZERO).percentage, 33);
        tracker.record_outcome(false);
        assert_eq!(tracker.snapshot_with_elapsed(Duration::ZERO).percentage, 66);
        tracker.record_outcome(true);
        assert_eq!(tracker.snapshot_with_elapsed(Duration::ZERO).percentage, 100);
    }

    #[test]
    fn test_percentage_matches_formula_for_all_states() {
        for total in 1..=12usize {
            let mut tracker = ProgressTracker::new();
            tracker.add_total(total);
            for i in 0..total {
                tracker.record_outcome(i % 3 != 0);
                let processed = tracker.completed() + tracker.failed();
                assert!(processed <= tracker.total());
                let expected = (processed * 100 / total) as u8;
                assert_eq!(tracker.snapshot_with_elapsed(Duration::ZERO).percentage, expected);
            }
        }
    }

    #[test]
    fn test_throughput_and_eta() {
        let mut tracker = ProgressTracker::new();
        tracker.add_total(10);
        for _ in 0..4 {
            tracker.record_outcome(true);
        }
        tracker.record_outcome(false);
        let snapshot = tracker.snapshot_with_elapsed(Duration::from_secs(2));
        assert!((snapshot.throughput - 2.0).abs() < 1e-9);
        // 5 remaining at 2 items/sec
        assert!((snapshot.eta_seconds - 2.5).abs() < 1e-9);
        assert_eq!(snapshot.remaining(), 5);
    }

    #[test]
    fn test_zero_elapsed_gives_zero_throughput() {
        let mut tracker = ProgressTracker::new();
        tracker.add_total(2);
        tracker.record_outcome(true);
        let snapshot = tracker.snapshot_with_elapsed(Duration::ZERO);
        assert!(snapshot.throughput.abs() < f64::EPSILON);
        assert!(snapshot.eta_seconds.abs() < f64::EPSILON);
    }

    #[test]
    fn test_only_failures_gives_zero_eta() {
        let mut tracker = ProgressTracker::new();
        tracker.add_total(4);
        tracker.record_outcome(false);
        let snapshot = tracker.snapshot_with_elapsed(Duration::from_secs(3));
        assert!(snapshot.throughput.abs() < f64::EPSILON);
        assert!(snapshot.eta_seconds.abs() < f64::EPSILON);
    }

    #[test]
    fn test_outcomes_past_total_are_ignored() {
        let mut tracker = ProgressTracker::new();
        tracker.add_total(1);
        tracker.record_outcome(true);
        tracker.record_outcome(true);
        tracker.record_outcome(false);
        assert_eq!(tracker.completed(), 1);
        assert_eq!(tracker.failed(), 0);
    }

    #[test]
    fn test_unstarted_tracker_has_zero_elapsed() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.elapsed(), Duration::ZERO);
    }
}
