// ============================================================================
// Market Data Publisher
// Polls the top of book and forwards changes as quotes
// ============================================================================

use crate::clock::Clock;
use crate::domain::Quote;
use crate::engine::StopSignal;
use crate::interfaces::{QuoteSink, SharedOrderBook};
use crate::metrics::MetricsRecorder;
use crate::numeric::Price;
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use super::{ReaderExit, ReaderReport};

pub struct MarketDataPublisher<S: QuoteSink> {
    book: Weak<dyn SharedOrderBook>,
    sink: S,
    interval: Duration,
    clock: Clock,
    metrics: Option<MetricsRecorder>,
    last: Option<(Option<Price>, Option<Price>)>,
    report: ReaderReport,
}

impl<S: QuoteSink> MarketDataPublisher<S> {
    pub fn new(book: &Arc<dyn SharedOrderBook>, sink: S) -> Self {
        Self {
            book: Arc::downgrade(book),
            sink,
            interval: Duration::from_millis(1),
            clock: Clock::monotonic(),
            metrics: None,
            last: None,
            report: ReaderReport::new(),
        }
    }

    /// Poll cadence; zero spins.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Record top-of-book read latency into this recorder's slot.
    pub fn with_metrics(mut self, recorder: MetricsRecorder) -> Self {
        self.metrics = Some(recorder);
        self
    }

    /// Read the top of book once and publish it if it changed. Returns
    /// `None` once the book is gone.
    pub fn poll_once(&mut self) -> Option<bool> {
        let book = self.book.upgrade()?;
        let started = self.clock.now();
        let top = book.top_of_book();
        if let Some(metrics) = &self.metrics {
            metrics.record_latency(self.clock.elapsed_nanos(started));
        }
        self.report.reads += 1;
        self.report.last_version = top.version;

        let current = (top.best_bid, top.best_ask);
        if self.last == Some(current) {
            return Some(false);
        }
        self.last = Some(current);

        let quote = Quote {
            best_bid: top.best_bid,
            best_ask: top.best_ask,
            version: top.version,
            timestamp: self.clock.now_nanos(),
        };
        if self.sink.publish(quote) {
            self.report.published += 1;
        } else {
            self.report.sink_rejected += 1;
        }
        Some(true)
    }

    pub fn run(&mut self, stop: &StopSignal) -> ReaderReport {
        loop {
            if stop.is_stopped() {
                self.report.exit = ReaderExit::Stopped;
                break;
            }
            if self.poll_once().is_none() {
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
        tracing::debug!(
            reads = self.report.reads,
            published = self.report.published,
            exit = ?self.report.exit,
            "market data publisher stopped"
        );
        self.report.clone()
    }
}

impl<S: QuoteSink + 'static> MarketDataPublisher<S> {
    pub fn spawn(mut self, stop: StopSignal) -> std::io::Result<JoinHandle<ReaderReport>> {
        std::thread::Builder::new()
            .name("market-data".into())
            .spawn(move || self.run(&stop))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::OrderedMapBook;
    use crate::domain::{Order, OrderId, Side, SyncStrategy};
    use crate::interfaces::ChannelSink;
    use crate::sync::wrap_with_sync;

    fn book() -> Arc<dyn SharedOrderBook> {
        wrap_with_sync(Box::new(OrderedMapBook::new(16)), SyncStrategy::Rcu)
    }

    #[test]
    fn test_publishes_only_on_change() {
        let book = book();
        let (tx, rx) = crossbeam::channel::bounded(16);
        let mut publisher = MarketDataPublisher::new(&book, ChannelSink(tx));

        assert_eq!(publisher.poll_once(), Some(true));
        assert_eq!(publisher.poll_once(), Some(false));

        let bid = Order::limit(OrderId(1), Side::Bid, "10.00".parse().unwrap(), 5, 1);
        book.execute(bid.into(), 0).unwrap();
        assert_eq!(publisher.poll_once(), Some(true));

        let quotes: Vec<Quote> = rx.try_iter().collect();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[1].best_bid, Some("10.00".parse().unwrap()));
        assert_eq!(quotes[1].version, 1);
    }

    #[test]
    fn test_counts_sink_refusals() {
        let book = book();
        let mut publisher = MarketDataPublisher::new(&book, |_quote: Quote| false);
        publisher.poll_once();
        let stop = StopSignal::new();
        stop.stop();
        let report = publisher.run(&stop);
        assert_eq!(report.sink_rejected, 1);
        assert_eq!(report.exit, ReaderExit::Stopped);
    }

    #[test]
    fn test_exits_when_book_dropped() {
        let book = book();
        let publisher = MarketDataPublisher::new(&book, |_quote: Quote| true)
            .with_interval(Duration::from_millis(1));
        drop(book);
        let report = publisher.spawn(StopSignal::new()).unwrap().join().unwrap();
        assert_eq!(report.exit, ReaderExit::BookDropped);
        assert_eq!(report.reads, 0);
    }
}
