// ============================================================================
// Contention Example
// Engine, market data reader, invariant monitor and metrics reporter running
// on their own threads against one book
// ============================================================================
//
// Usage: cargo run --example contention --features logging -- [rcu|coarse|versioned]

use book_core::domain::{BookVariant, CoreConfig, SyncStrategy};
use book_core::interfaces::ChannelSink;
use book_core::metrics::{spawn_reporter, TracingExporter};
use book_core::prelude::*;
use book_core::utils::{pin_current_thread_to_core, CorePlan};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::thread;
use std::time::Duration;
use tracing::info;

const ORDERS: u64 = 200_000;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let sync = match std::env::args().nth(1).as_deref() {
        Some("coarse") => SyncStrategy::CoarseLock,
        Some("versioned") => SyncStrategy::VersionedSnapshot { max_lag: 32 },
        _ => SyncStrategy::Rcu,
    };

    let plan = CorePlan::detect(2);
    info!(?plan, "thread placement");

    let mut config = CoreConfig::new(BookVariant::SkipList, sync)
        .with_queues(4_096, 1 << 16)
        .with_backpressure(BackpressurePolicy::DropAndCount);
    config.metrics.report_interval = Duration::from_millis(250);
    if let Some(core) = plan.engine {
        config = config.with_engine_core(core);
    }
    let report_interval = config.metrics.report_interval;

    let TradingCore {
        book,
        orders,
        trade_receivers,
        engine,
        metrics,
        ..
    } = CoreBuilder::from_config(config)
        .with_event_handler(std::sync::Arc::new(LoggingEventHandler))
        .build()?;

    let stop = StopSignal::new();
    let engine = engine.spawn(stop.clone())?;
    let reporter = spawn_reporter(metrics.clone(), TracingExporter, report_interval, stop.clone())?;

    // Market data: quotes go out over a crossbeam channel
    let (quote_tx, quote_rx) = crossbeam::channel::bounded(1_024);
    let mut publisher = MarketDataPublisher::new(&book, ChannelSink(quote_tx))
        .with_interval(Duration::from_micros(50))
        .with_metrics(metrics.register("market-data")?);
    let mut monitor = BookMonitor::new(&book)
        .with_interval(Duration::from_millis(5))
        .with_metrics(metrics.register("monitor")?);

    let reader_cores = plan.readers.clone();
    let publisher_stop = stop.clone();
    let publisher = thread::spawn(move || {
        if let Some(core) = reader_cores[0] {
            pin_current_thread_to_core(core);
        }
        publisher.run(&publisher_stop)
    });
    let monitor_stop = stop.clone();
    let monitor = thread::spawn(move || {
        if let Some(core) = plan.readers[1] {
            pin_current_thread_to_core(core);
        }
        monitor.run(&monitor_stop)
    });

    let quotes = thread::spawn(move || quote_rx.iter().count());
    let trades = thread::spawn(move || {
        let receiver = &trade_receivers[0];
        let mut received = 0u64;
        while !(receiver.is_disconnected() && receiver.is_empty()) {
            match receiver.try_dequeue() {
                Some(_) => received += 1,
                None => thread::yield_now(),
            }
        }
        received
    });

    // Producer: random limits around 100.00 with occasional cancels
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    for sequence in 1..=ORDERS {
        let command = if rng.gen_ratio(1, 10) && sequence > 1 {
            OrderCommand::Cancel {
                id: OrderId(rng.gen_range(1..sequence)),
                sequence,
            }
        } else {
            let side = if rng.gen_bool(0.5) { Side::Bid } else { Side::Ask };
            let price = Price::from_raw(rng.gen_range(9_950..=10_050) * 100);
            Order::limit(OrderId(sequence), side, price, rng.gen_range(1..50), sequence).into()
        };
        if orders.enqueue(command).is_err() {
            break;
        }
    }
    drop(orders);

    while !engine.is_finished() {
        thread::sleep(Duration::from_millis(5));
    }
    stop.stop();

    let report = engine.join().map_err(|_| "engine thread panicked")?;
    let publisher = publisher.join().map_err(|_| "publisher thread panicked")?;
    let monitor = monitor.join().map_err(|_| "monitor thread panicked")?;
    let exported = reporter.join().map_err(|_| "reporter thread panicked")??;
    let quotes = quotes.join().map_err(|_| "quote consumer panicked")?;
    let trades = trades.join().map_err(|_| "trade consumer panicked")?;

    info!(
        strategy = sync.name(),
        processed = report.processed,
        trades = report.trades,
        dropped = report.dropped_trades,
        received = trades,
        "engine finished"
    );
    info!(
        reads = publisher.reads,
        published = publisher.published,
        quotes,
        "market data finished"
    );
    info!(checks = monitor.reads, violations = monitor.violations, "monitor finished");
    info!(exported, final_version = book.version(), resting = book.order_count(), "done");

    Ok(())
}
