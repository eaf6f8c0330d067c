// ============================================================================
// Book Monitor
// Samples whole snapshots and checks them for torn or stale state
// ============================================================================

use crate::clock::Clock;
use crate::domain::SyncStrategy;
use crate::engine::StopSignal;
use crate::interfaces::SharedOrderBook;
use crate::metrics::MetricsRecorder;
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use super::{ReaderExit, ReaderReport};

/// Checks on every sample:
/// - the snapshot is internally consistent (ordered, uncrossed, no empty levels)
/// - versions never go backwards
/// - under a versioned-snapshot strategy, staleness stays within `max_lag`
pub struct BookMonitor {
    book: Weak<dyn SharedOrderBook>,
    interval: Duration,
    deep_checks: bool,
    clock: Clock,
    metrics: Option<MetricsRecorder>,
    report: ReaderReport,
}

impl BookMonitor {
    pub fn new(book: &Arc<dyn SharedOrderBook>) -> Self {
        Self {
            book: Arc::downgrade(book),
            interval: Duration::from_millis(10),
            deep_checks: false,
            clock: Clock::monotonic(),
            metrics: None,
            report: ReaderReport::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Also walk the index against the levels on every sample. Takes the
    /// writer-side lock under the coarse-lock and versioned strategies.
    pub fn with_deep_checks(mut self, enabled: bool) -> Self {
        self.deep_checks = enabled;
        self
    }

    /// Record snapshot latency into this recorder's slot.
    pub fn with_metrics(mut self, recorder: MetricsRecorder) -> Self {
        self.metrics = Some(recorder);
        self
    }

    pub fn violations(&self) -> u64 {
        self.report.violations
    }

    /// Take and check one sample. Returns the number of new violations, or
    /// `None` once the book is gone.
    pub fn check_once(&mut self) -> Option<u64> {
        let book = self.book.upgrade()?;
        let started = self.clock.now();
        let snapshot = book.snapshot();
        if let Some(metrics) = &self.metrics {
            metrics.record_latency(self.clock.elapsed_nanos(started));
        }
        self.report.reads += 1;

        let mut found = 0;
        if let Err(detail) = snapshot.check_consistency() {
            tracing::error!(version = snapshot.version, detail, "inconsistent snapshot observed");
            found += 1;
        }
        if snapshot.version < self.report.last_version {
            tracing::error!(
                version = snapshot.version,
                previous = self.report.last_version,
                "snapshot version went backwards"
            );
            found += 1;
        }
        self.report.last_version = self.report.last_version.max(snapshot.version);

        if let SyncStrategy::VersionedSnapshot { max_lag } = book.strategy() {
            let staleness = book.staleness();
            if staleness > max_lag {
                tracing::error!(staleness, max_lag, "reader lag exceeds bound");
                found += 1;
            }
        }
        if self.deep_checks {
            if let Err(err) = book.check_invariants() {
                tracing::error!(%err, "book invariant violated");
                found += 1;
            }
        }

        self.report.violations += found;
        Some(found)
    }

    pub fn run(&mut self, stop: &StopSignal) -> ReaderReport {
        loop {
            if stop.is_stopped() {
                self.report.exit = ReaderExit::Stopped;
                break;
            }
            if self.check_once().is_none() {
                self.report.exit = ReaderExit::BookDropped;
                break;
            }
            if self.interval.is_zero() {
                std::hint::spin_loop();
            } else if stop.sleep(self.interval) {
                self.report.exit = ReaderExit::Stopped;
                break;
            }
        }
        if self.report.violations > 0 {
            tracing::error!(violations = self.report.violations, "book monitor stopped");
        } else {
            tracing::debug!(reads = self.report.reads, "book monitor stopped");
        }
        self.report.clone()
    }

    pub fn spawn(mut self, stop: StopSignal) -> std::io::Result<JoinHandle<ReaderReport>> {
        std::thread::Builder::new()
            .name("book-monitor".into())
            .spawn(move || self.run(&stop))
    }
}
