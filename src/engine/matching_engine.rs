// ============================================================================
// Matching Engine
// The single writer: dequeue, apply and match, publish trades
// ============================================================================

use crate::clock::Clock;
use crate::domain::{ExecutionOutcome, OrderCommand, ShutdownPolicy};
use crate::error::{EngineError, SyncError};
use crate::interfaces::{EngineEvent, EventHandler, SharedOrderBook};
use crate::metrics::MetricsRecorder;
use crate::queue::{OrderReceiver, PublishOutcome, TradeSender};
use crossbeam::utils::Backoff;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::StopSignal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Engine State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum EngineState {
    Idle = 0,
    Dequeue = 1,
    /// Cancel being applied
    Apply = 2,
    /// New order being inserted and matched as one mutation
    Match = 3,
    Publish = 4,
    Shutdown = 5,
    Halted = 6,
}

impl EngineState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => EngineState::Dequeue,
            2 => EngineState::Apply,
            3 => EngineState::Match,
            4 => EngineState::Publish,
            5 => EngineState::Shutdown,
            6 => EngineState::Halted,
            _ => EngineState::Idle,
        }
    }
}

/// Read-only view of the engine state for monitors on other threads.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    state: Arc<AtomicU8>,
}

impl EngineStatus {
    fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(EngineState::Idle as u8)),
        }
    }

    #[inline]
    pub fn get(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    fn set(&self, state: EngineState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

// ============================================================================
// Report
// ============================================================================

/// What the engine did over its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineReport {
    pub processed: u64,
    pub orders: u64,
    pub cancels: u64,
    pub unknown_cancels: u64,
    pub rejected: u64,
    pub trades: u64,
    /// Sum of price × quantity over every trade
    pub notional: Decimal,
    /// Trades that missed at least one consumer
    pub dropped_trades: u64,
    /// Commands thrown away by a `Discard` shutdown
    pub discarded_on_shutdown: u64,
    pub last_sequence: Option<u64>,
    pub fatal: Option<EngineError>,
}

/// Result of one `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Input channel was empty
    Idle,
    /// One command was applied
    Processed,
    /// Engine is halted; nothing was done
    Halted,
}

// ============================================================================
// Engine
// ============================================================================

/// Owns the consuming end of the input channel and the producing end of the
/// trade channel. Exactly one engine drives a book.
pub struct MatchingEngine {
    book: Arc<dyn SharedOrderBook>,
    orders: OrderReceiver,
    trades: TradeSender,
    handler: Arc<dyn EventHandler>,
    metrics: Option<MetricsRecorder>,
    clock: Clock,
    status: EngineStatus,
    shutdown: ShutdownPolicy,
    engine_core: Option<usize>,
    report: EngineReport,
}

impl MatchingEngine {
    pub fn new(
        book: Arc<dyn SharedOrderBook>,
        orders: OrderReceiver,
        trades: TradeSender,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            book,
            orders,
            trades,
            handler,
            metrics: None,
            clock: Clock::monotonic(),
            status: EngineStatus::new(),
            shutdown: ShutdownPolicy::Drain,
            engine_core: None,
            report: EngineReport::default(),
        }
    }

    pub fn with_metrics(mut self, recorder: MetricsRecorder) -> Self {
        self.metrics = Some(recorder);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_shutdown(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown = policy;
        self
    }

    pub fn with_engine_core(mut self, core: Option<usize>) -> Self {
        self.engine_core = core;
        self
    }

    pub fn book(&self) -> &Arc<dyn SharedOrderBook> {
        &self.book
    }

    pub fn status(&self) -> EngineStatus {
        self.status.clone()
    }

    pub fn state(&self) -> EngineState {
        self.status.get()
    }

    pub fn report(&self) -> &EngineReport {
        &self.report
    }

    /// One engine cycle: take at most one command and apply it.
    ///
    /// An empty input channel flushes pending publication and reports
    /// `Idle`, unless that publication failed. A fatal error halts the book
    /// and is returned; every later call reports `Halted`.
    pub fn step(&mut self) -> Result<StepOutcome, EngineError> {
        if self.report.fatal.is_some() {
            return Ok(StepOutcome::Halted);
        }
        self.status.set(EngineState::Dequeue);
        match self.orders.try_dequeue() {
            Some(command) => {
                self.process(command)?;
                self.status.set(EngineState::Dequeue);
                Ok(StepOutcome::Processed)
            },
            None => {
                self.book.flush();
                if self.book.is_halted() {
                    // publication on flush failed
                    return Err(self.fail(SyncError::Halted.into()));
                }
                self.status.set(EngineState::Idle);
                Ok(StepOutcome::Idle)
            },
        }
    }

    /// Loop until `stop` fires, the producer disconnects with nothing left
    /// queued, or a fatal error halts the engine. Applies the shutdown policy
    /// on the way out.
    pub fn run(&mut self, stop: &StopSignal) -> EngineReport {
        tracing::info!(
            variant = self.book.variant(),
            strategy = self.book.strategy().name(),
            "matching engine started"
        );
        let backoff = Backoff::new();
        loop {
            if stop.is_stopped() {
                break;
            }
            match self.step() {
                Ok(StepOutcome::Processed) => backoff.reset(),
                Ok(StepOutcome::Idle) => {
                    if self.orders.is_disconnected() && self.orders.is_empty() {
                        break;
                    }
                    if backoff.is_completed() {
                        std::thread::yield_now();
                    } else {
                        backoff.snooze();
                    }
                },
                Ok(StepOutcome::Halted) | Err(_) => return self.report.clone(),
            }
        }

        self.shut_down();
        self.report.clone()
    }

    /// Move the engine onto its own thread.
    pub fn spawn(mut self, stop: StopSignal) -> std::io::Result<EngineHandle> {
        let status = self.status.clone();
        let thread_stop = stop.clone();
        let join = std::thread::Builder::new()
            .name("matching-engine".into())
            .spawn(move || {
                if let Some(core) = self.engine_core {
                    if !crate::utils::pin_current_thread_to_core(core) {
                        tracing::warn!(core, "could not pin engine thread");
                    }
                }
                self.run(&thread_stop)
            })?;
        Ok(EngineHandle { join, status, stop })
    }

    fn shut_down(&mut self) {
        self.status.set(EngineState::Shutdown);
        match self.shutdown {
            ShutdownPolicy::Drain => {
                while let Some(command) = self.orders.try_dequeue() {
                    if self.process(command).is_err() {
                        return;
                    }
                }
            },
            ShutdownPolicy::Discard => {
                while self.orders.try_dequeue().is_some() {
                    self.report.discarded_on_shutdown += 1;
                }
                if self.report.discarded_on_shutdown > 0 {
                    tracing::warn!(
                        discarded = self.report.discarded_on_shutdown,
                        "queued commands discarded at shutdown"
                    );
                }
            },
        }
        self.book.flush();
        self.status.set(EngineState::Shutdown);
        tracing::info!(
            processed = self.report.processed,
            trades = self.report.trades,
            dropped_trades = self.report.dropped_trades,
            "matching engine stopped"
        );
    }

    fn process(&mut self, command: OrderCommand) -> Result<(), EngineError> {
        let started = self.clock.now();
        let sequence = command.sequence();
        if let Some(previous) = self.report.last_sequence {
            if sequence <= previous {
                return Err(self.fail(EngineError::OutOfOrderSequence {
                    previous,
                    received: sequence,
                }));
            }
        }
        self.report.last_sequence = Some(sequence);
        self.report.processed += 1;

        let timestamp = self.clock.now_nanos();
        match command {
            OrderCommand::New(order) => {
                self.report.orders += 1;
                if let Some(metrics) = &self.metrics {
                    metrics.record_order();
                }
                self.handler.on_event(EngineEvent::Accepted {
                    order_id: order.id,
                    sequence,
                    timestamp,
                });
                self.status.set(EngineState::Match);
            },
            OrderCommand::Cancel { .. } => self.status.set(EngineState::Apply),
        }

        let execution = match self.book.execute(command, timestamp) {
            Ok(execution) => execution,
            Err(err) if err.is_fatal() => return Err(self.fail(err.into())),
            Err(err) => {
                self.reject(command, err.to_string(), timestamp);
                return Ok(());
            },
        };

        self.status.set(EngineState::Publish);
        for trade in &execution.trades {
            self.report.trades += 1;
            if let Some(total) = trade.notional().and_then(|n| self.report.notional.checked_add(n)) {
                self.report.notional = total;
            }
            if let PublishOutcome::Dropped { missed_consumers } = self.trades.publish(*trade) {
                self.report.dropped_trades += 1;
                if let Some(metrics) = &self.metrics {
                    metrics.record_dropped_trade();
                }
                tracing::warn!(
                    taker = %trade.taker_order_id,
                    maker = %trade.maker_order_id,
                    missed_consumers,
                    "trade consumer channel full, trade dropped"
                );
                self.handler.on_event(EngineEvent::TradeDropped {
                    trade: *trade,
                    missed_consumers,
                });
            }
            self.handler.on_event(EngineEvent::Matched { trade: *trade });
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_trades(execution.trades.len() as u64);
        }

        let order_id = command.order_id();
        match execution.outcome {
            ExecutionOutcome::Rested { remaining } => {
                if let OrderCommand::New(order) = command {
                    self.handler.on_event(EngineEvent::Rested {
                        order_id,
                        side: order.side,
                        price: order.price,
                        remaining,
                        timestamp,
                    });
                }
            },
            ExecutionOutcome::Filled => {
                self.handler.on_event(EngineEvent::Filled {
                    order_id,
                    timestamp,
                });
            },
            ExecutionOutcome::Unfilled { discarded } => {
                self.handler.on_event(EngineEvent::Unfilled {
                    order_id,
                    discarded,
                    timestamp,
                });
            },
            ExecutionOutcome::Rejected { reason } => self.reject(command, reason, timestamp),
            ExecutionOutcome::Cancelled => {
                self.report.cancels += 1;
                if let Some(metrics) = &self.metrics {
                    metrics.record_cancel(true);
                }
                self.handler.on_event(EngineEvent::Cancelled {
                    order_id,
                    timestamp,
                });
            },
            ExecutionOutcome::UnknownOrder => {
                self.report.cancels += 1;
                self.report.unknown_cancels += 1;
                if let Some(metrics) = &self.metrics {
                    metrics.record_cancel(false);
                }
                tracing::debug!(%order_id, "cancel for unknown order");
                self.handler.on_event(EngineEvent::CancelRejected {
                    order_id,
                    timestamp,
                });
            },
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_latency(self.clock.elapsed_nanos(started));
        }
        Ok(())
    }

    fn reject(&mut self, command: OrderCommand, reason: String, timestamp: u64) {
        self.report.rejected += 1;
        if let Some(metrics) = &self.metrics {
            metrics.record_rejected();
        }
        tracing::debug!(order_id = %command.order_id(), %reason, "order rejected");
        self.handler.on_event(EngineEvent::Rejected {
            order_id: command.order_id(),
            reason,
            timestamp,
        });
    }

    /// Halt the book and the engine on a fatal error.
    fn fail(&mut self, err: EngineError) -> EngineError {
        let reason = err.to_string();
        self.book.halt(&reason);
        self.status.set(EngineState::Halted);
        tracing::error!(%reason, "matching engine halted");
        self.handler.on_event(EngineEvent::Halted {
            reason,
            timestamp: self.clock.now_nanos(),
        });
        self.report.fatal = Some(err.clone());
        err
    }
}

/// Handle on an engine running on its own thread.
pub struct EngineHandle {
    join: JoinHandle<EngineReport>,
    status: EngineStatus,
    stop: StopSignal,
}

impl EngineHandle {
    pub fn state(&self) -> EngineState {
        self.status.get()
    }

    pub fn status(&self) -> EngineStatus {
        self.status.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signal the engine to stop and wait for its report.
    pub fn stop(self) -> std::thread::Result<EngineReport> {
        self.stop.stop();
        self.join.join()
    }

    /// Wait without signalling; returns once the producer disconnects or
    /// the engine halts.
    pub fn join(self) -> std::thread::Result<EngineReport> {
        self.join.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::OrderedMapBook;
    use crate::domain::{BackpressurePolicy, Order, OrderId, Side, SyncStrategy};
    use crate::interfaces::{NoOpEventHandler, RecordingEventHandler};
    use crate::queue::{order_channel, trade_channel, OrderSender, TradeReceiver};
    use crate::sync::wrap_with_sync;

    fn engine(handler: Arc<dyn EventHandler>) -> (MatchingEngine, OrderSender, Vec<TradeReceiver>) {
        let book = wrap_with_sync(Box::new(OrderedMapBook::new(64)), SyncStrategy::CoarseLock);
        let (tx, rx) = order_channel(64);
        let (trades, receivers) = trade_channel(64, 1, BackpressurePolicy::DropAndCount);
        (MatchingEngine::new(book, rx, trades, handler), tx, receivers)
    }

    fn limit(id: u64, side: Side, px: &str, qty: u64) -> OrderCommand {
        Order::limit(OrderId(id), side, px.parse().unwrap(), qty, id).into()
    }

    #[test]
    fn test_step_applies_and_publishes() {
        let (mut engine, tx, receivers) = engine(Arc::new(NoOpEventHandler));
        tx.try_enqueue(limit(1, Side::Bid, "10.00", 100)).unwrap();
        tx.try_enqueue(limit(2, Side::Bid, "10.00", 50)).unwrap();
        tx.try_enqueue(limit(3, Side::Ask, "10.00", 120)).unwrap();

        for _ in 0..3 {
            assert_eq!(engine.step().unwrap(), StepOutcome::Processed);
        }
        assert_eq!(engine.step().unwrap(), StepOutcome::Idle);
        assert_eq!(engine.state(), EngineState::Idle);

        let mut trades = Vec::new();
        receivers[0].drain_into(&mut trades);
        let quantities: Vec<_> = trades.iter().map(|t| t.quantity).collect();
        assert_eq!(quantities, vec![100, 20]);
        assert_eq!(engine.book().snapshot().total_bid_quantity(), 30);
        assert_eq!(engine.report().trades, 2);
        assert_eq!(engine.report().notional, Decimal::from(1200));
    }

    #[test]
    fn test_out_of_order_sequence_halts() {
        let handler = Arc::new(RecordingEventHandler::new());
        let (mut engine, tx, _receivers) = engine(handler.clone());
        tx.try_enqueue(limit(5, Side::Bid, "10.00", 1)).unwrap();
        tx.try_enqueue(limit(3, Side::Bid, "10.00", 1)).unwrap();
        tx.try_enqueue(limit(9, Side::Bid, "10.00", 1)).unwrap();

        engine.step().unwrap();
        let err = engine.step().unwrap_err();
        assert_eq!(
            err,
            EngineError::OutOfOrderSequence {
                previous: 5,
                received: 3
            }
        );
        assert_eq!(engine.state(), EngineState::Halted);
        assert!(engine.book().is_halted());
        assert_eq!(engine.step().unwrap(), StepOutcome::Halted);
        // last good state still readable
        assert_eq!(engine.book().order_count(), 1);
        assert!(handler
            .events()
            .iter()
            .any(|e| matches!(e, EngineEvent::Halted { .. })));
    }

    #[test]
    fn test_cancel_events_and_counts() {
        let handler = Arc::new(RecordingEventHandler::new());
        let (mut engine, tx, _receivers) = engine(handler.clone());
        tx.try_enqueue(limit(1, Side::Bid, "10.00", 1)).unwrap();
        tx.try_enqueue(OrderCommand::Cancel {
            id: OrderId(1),
            sequence: 2,
        })
        .unwrap();
        tx.try_enqueue(OrderCommand::Cancel {
            id: OrderId(1),
            sequence: 3,
        })
        .unwrap();
        while engine.step().unwrap() == StepOutcome::Processed {}

        assert_eq!(engine.report().cancels, 2);
        assert_eq!(engine.report().unknown_cancels, 1);
        let events = handler.events();
        assert!(events.iter().any(|e| matches!(e, EngineEvent::Cancelled { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, EngineEvent::CancelRejected { .. })));
    }

    #[test]
    fn test_run_exits_when_producer_disconnects() {
        let (mut engine, tx, _receivers) = engine(Arc::new(NoOpEventHandler));
        tx.try_enqueue(limit(1, Side::Bid, "10.00", 1)).unwrap();
        drop(tx);
        let report = engine.run(&StopSignal::new());
        assert_eq!(report.processed, 1);
        assert!(report.fatal.is_none());
        assert_eq!(engine.state(), EngineState::Shutdown);
    }

    #[test]
    fn test_discard_shutdown_counts_queued() {
        let (engine, tx, _receivers) = engine(Arc::new(NoOpEventHandler));
        let mut engine = engine.with_shutdown(ShutdownPolicy::Discard);
        for id in 1..=4 {
            tx.try_enqueue(limit(id, Side::Bid, "10.00", 1)).unwrap();
        }
        let stop = StopSignal::new();
        stop.stop();
        let report = engine.run(&stop);
        assert_eq!(report.processed, 0);
        assert_eq!(report.discarded_on_shutdown, 4);
    }

    #[test]
    fn test_drain_shutdown_processes_queued() {
        let (mut engine, tx, _receivers) = engine(Arc::new(NoOpEventHandler));
        for id in 1..=4 {
            tx.try_enqueue(limit(id, Side::Bid, "10.00", 1)).unwrap();
        }
        let stop = StopSignal::new();
        stop.stop();
        let report = engine.run(&stop);
        assert_eq!(report.processed, 4);
        assert_eq!(engine.book().order_count(), 4);
    }

    #[test]
    fn test_spawned_engine_stops() {
        let (engine, tx, receivers) = engine(Arc::new(NoOpEventHandler));
        let handle = engine.spawn(StopSignal::new()).unwrap();
        tx.enqueue(limit(1, Side::Ask, "10.00", 5)).unwrap();
        tx.enqueue(limit(2, Side::Bid, "10.00", 5)).unwrap();
        while receivers[0].is_empty() {
            std::thread::yield_now();
        }
        let report = handle.stop().unwrap();
        assert_eq!(report.trades, 1);
    }
}
