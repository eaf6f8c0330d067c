// ============================================================================
// Basic Usage Example
// ============================================================================

use book_core::prelude::*;
use std::sync::Arc;

fn price(s: &str) -> Price {
    s.parse().expect("valid price")
}

fn main() {
    println!("=== Order Book Core Example ===\n");

    // Ordered map under a coarse lock, driven one step at a time
    let TradingCore {
        book,
        orders,
        trade_receivers,
        mut engine,
        ..
    } = CoreBuilder::new()
        .ordered_map()
        .coarse_lock()
        .with_event_handler(Arc::new(LoggingEventHandler))
        .build()
        .expect("valid configuration");

    println!("Created {} book under {}\n", book.variant(), book.strategy().name());

    let mut sequence = 0;
    let mut next = || {
        sequence += 1;
        sequence
    };

    // Add sell orders at different prices
    println!("Adding sell orders...");
    for i in 0..5u64 {
        let seq = next();
        let ask = Order::limit(OrderId(seq), Side::Ask, Price::from_raw(100_000 + i as i64 * 100), 10, seq);
        orders.try_enqueue(ask.into()).expect("input channel has room");
    }

    // Add buy orders
    println!("Adding buy orders...");
    for i in 0..5u64 {
        let seq = next();
        let bid = Order::limit(OrderId(seq), Side::Bid, Price::from_raw(99_900 - i as i64 * 100), 10, seq);
        orders.try_enqueue(bid.into()).expect("input channel has room");
    }

    while let Ok(StepOutcome::Processed) = engine.step() {}

    // Get order book snapshot
    println!("\n=== Order Book Snapshot ===");
    let snapshot = book.snapshot().depth(5);

    println!("\nBids:");
    for level in &snapshot.bids {
        println!("  {} @ {} ({} orders)", level.quantity, level.price, level.order_count);
    }

    println!("\nAsks:");
    for level in &snapshot.asks {
        println!("  {} @ {} ({} orders)", level.quantity, level.price, level.order_count);
    }

    if let Some(spread) = snapshot.spread() {
        println!("\nSpread: {}", spread);
    }

    // Submit an aggressive buy that sweeps two ask levels
    println!("\n=== Submitting aggressive buy 15 @ {} ===", price("10.01"));
    let seq = next();
    orders
        .try_enqueue(Order::limit(OrderId(seq), Side::Bid, price("10.01"), 15, seq).into())
        .expect("input channel has room");

    // Cancel the worst bid
    let seq = next();
    orders
        .try_enqueue(OrderCommand::Cancel { id: OrderId(10), sequence: seq })
        .expect("input channel has room");

    while let Ok(StepOutcome::Processed) = engine.step() {}

    println!("\nTrades:");
    while let Some(trade) = trade_receivers[0].try_dequeue() {
        println!(
            "  {} bought {} @ {} from {}",
            trade.taker_order_id, trade.quantity, trade.price, trade.maker_order_id
        );
    }

    let top = book.top_of_book();
    println!(
        "\nBest bid: {:?}  Best ask: {:?}  Version: {}",
        top.best_bid.map(|p| p.to_string()),
        top.best_ask.map(|p| p.to_string()),
        top.version
    );

    let report = engine.report();
    println!(
        "\nProcessed {} commands: {} orders, {} cancels, {} trades, notional {}",
        report.processed, report.orders, report.cancels, report.trades, report.notional
    );
}
