// ============================================================================
// Order Book Benchmarks
// ============================================================================
//
// Benchmark Categories:
// 1. Book Structure - Coarse lock, no readers, every variant
//    - book_add / book_cancel / book_match: one operation timed on its own,
//      over depth (sparse 10 levels, dense 1000) x price distribution
//      (uniform, concentrated near the inside)
//    - cancel_ratio: command streams with 0%, 50% and 90% cancels
// 2. Synchronization - Skip list book, every strategy
//    - writer_under_readers: writer latency with 0, 1, 2, 5 and 10 reader
//      threads, readers either polling best bid or taking full snapshots
//    - reader_under_writer: top-of-book latency with and without a writer
// 3. Mixed Workload - Seeded stream of limits, markets and cancels across
//    every variant and strategy
// 4. Snapshots - Full ladder copy cost per sync strategy
// ============================================================================

use book_core::book::create_book;
use book_core::domain::{BookConfig, BookVariant, SyncStrategy};
use book_core::prelude::*;
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::hint::black_box;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const BEST_BID: i64 = 9_999;
const BEST_ASK: i64 = 10_001;

fn price(cents: i64) -> Price {
    Price::from_raw(cents * 100)
}

fn variants() -> [BookVariant; 3] {
    [
        BookVariant::OrderedMap,
        BookVariant::SkipList,
        BookVariant::BucketedArray {
            min_price: price(8_900),
            max_price: price(11_100),
            tick: price(1),
        },
    ]
}

fn strategies() -> [SyncStrategy; 3] {
    [
        SyncStrategy::CoarseLock,
        SyncStrategy::Rcu,
        SyncStrategy::VersionedSnapshot { max_lag: 64 },
    ]
}

fn shared_book(variant: BookVariant, sync: SyncStrategy) -> Arc<dyn SharedOrderBook> {
    let config = BookConfig::new(variant).with_expected_orders(16_384);
    wrap_with_sync(create_book(&config).unwrap(), sync)
}

// ============================================================================
// Workload Shapes
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Depth {
    Sparse,
    Dense,
}

impl Depth {
    fn levels(self) -> i64 {
        match self {
            Depth::Sparse => 10,
            Depth::Dense => 1_000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Spread {
    Uniform,
    Concentrated,
}

#[derive(Debug, Clone, Copy)]
struct Shape {
    depth: Depth,
    spread: Spread,
}

impl Shape {
    const DEFAULT: Shape = Shape {
        depth: Depth::Dense,
        spread: Spread::Uniform,
    };

    fn all() -> [Shape; 4] {
        [
            Shape { depth: Depth::Sparse, spread: Spread::Uniform },
            Shape { depth: Depth::Sparse, spread: Spread::Concentrated },
            Shape { depth: Depth::Dense, spread: Spread::Uniform },
            Shape { depth: Depth::Dense, spread: Spread::Concentrated },
        ]
    }

    fn name(self) -> String {
        let depth = match self.depth {
            Depth::Sparse => "sparse",
            Depth::Dense => "dense",
        };
        let spread = match self.spread {
            Spread::Uniform => "uniform",
            Spread::Concentrated => "concentrated",
        };
        format!("{depth}/{spread}")
    }

    /// Ticks away from the inside of the book.
    fn offset(self, rng: &mut ChaCha8Rng) -> i64 {
        let levels = self.depth.levels();
        match self.spread {
            Spread::Uniform => rng.gen_range(0..levels),
            Spread::Concentrated => {
                // cubed uniform: most orders land on the few best levels
                let u: f64 = rng.gen();
                ((u * u * u) * levels as f64) as i64
            },
        }
    }
}

/// A populated book plus the seeded order source that keeps feeding it.
struct Bench {
    book: Arc<dyn SharedOrderBook>,
    rng: ChaCha8Rng,
    shape: Shape,
    /// ids and sequences keep growing across iterations
    next: u64,
    resting: Vec<OrderId>,
}

impl Bench {
    /// Every level holds at least one order per side, then the shape's
    /// distribution adds three more orders per level.
    fn new(variant: BookVariant, sync: SyncStrategy, shape: Shape) -> Self {
        let mut bench = Self {
            book: shared_book(variant, sync),
            rng: ChaCha8Rng::seed_from_u64(0x5EED),
            shape,
            next: 0,
            resting: Vec::new(),
        };
        for offset in 0..shape.depth.levels() {
            bench.rest(Side::Bid, offset);
            bench.rest(Side::Ask, offset);
        }
        for _ in 0..shape.depth.levels() * 3 {
            let command = bench.random_passive();
            bench.apply(command);
        }
        bench
    }

    fn limit(&mut self, side: Side, cents: i64, quantity: Quantity) -> OrderCommand {
        self.next += 1;
        Order::limit(OrderId(self.next), side, price(cents), quantity, self.next).into()
    }

    fn cancel(&mut self, id: OrderId) -> OrderCommand {
        self.next += 1;
        OrderCommand::Cancel {
            id,
            sequence: self.next,
        }
    }

    fn passive(&mut self, side: Side, offset: i64) -> OrderCommand {
        let cents = match side {
            Side::Bid => BEST_BID - offset,
            Side::Ask => BEST_ASK + offset,
        };
        self.limit(side, cents, 10)
    }

    /// Non-crossing limit on a random side at a price drawn from the shape.
    fn random_passive(&mut self) -> OrderCommand {
        let side = if self.rng.gen_bool(0.5) { Side::Bid } else { Side::Ask };
        let offset = self.shape.offset(&mut self.rng);
        self.passive(side, offset)
    }

    fn rest(&mut self, side: Side, offset: i64) {
        let command = self.passive(side, offset);
        self.apply(command);
    }

    fn apply(&mut self, command: OrderCommand) {
        if let OrderCommand::New(order) = command {
            self.resting.push(order.id);
        }
        self.book.execute(command, 0).unwrap();
    }

    /// Cancel for a random order added earlier.
    fn random_cancel(&mut self) -> OrderCommand {
        let index = self.rng.gen_range(0..self.resting.len());
        let id = self.resting.swap_remove(index);
        self.cancel(id)
    }

    /// Take one unit off the best ask, then put it back at the end of the
    /// queue so depth stays constant.
    fn take_and_refill(&mut self) {
        let take = self.limit(Side::Bid, BEST_ASK, 1);
        black_box(self.book.execute(take, 0).unwrap());
        let refill = self.limit(Side::Ask, BEST_ASK, 1);
        black_box(self.book.execute(refill, 0).unwrap());
    }

    /// Commands with `cancel_pct` percent cancels of live orders; the rest
    /// are mostly passive limits with one in ten a small market order.
    fn stream(&mut self, cancel_pct: u32, len: usize) -> Vec<OrderCommand> {
        let mut commands = Vec::with_capacity(len);
        for _ in 0..len {
            let roll = self.rng.gen_range(0..100);
            let command = if roll < cancel_pct && !self.resting.is_empty() {
                self.random_cancel()
            } else if self.rng.gen_ratio(1, 10) {
                self.next += 1;
                let side = if self.rng.gen_bool(0.5) { Side::Bid } else { Side::Ask };
                let quantity = self.rng.gen_range(1..5);
                Order::market(OrderId(self.next), side, quantity, self.next).into()
            } else {
                let command = self.random_passive();
                self.resting.push(command.order_id());
                command
            };
            commands.push(command);
        }
        commands
    }
}

// ============================================================================
// Book Structure
// ============================================================================

fn benchmark_book_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("book_add");

    for variant in variants() {
        for shape in Shape::all() {
            let id = BenchmarkId::new(variant.name(), shape.name());
            group.bench_function(id, |b| {
                let mut bench = Bench::new(variant, SyncStrategy::CoarseLock, shape);
                b.iter_custom(|iters| {
                    let mut elapsed = Duration::ZERO;
                    for _ in 0..iters {
                        let add = bench.random_passive();
                        let start = Instant::now();
                        black_box(bench.book.execute(add, 0).unwrap());
                        elapsed += start.elapsed();

                        bench.resting.push(add.order_id());
                        let cancel = bench.random_cancel();
                        bench.book.execute(cancel, 0).unwrap();
                    }
                    elapsed
                });
            });
        }
    }

    group.finish();
}

fn benchmark_book_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("book_cancel");

    for variant in variants() {
        for shape in Shape::all() {
            let id = BenchmarkId::new(variant.name(), shape.name());
            group.bench_function(id, |b| {
                let mut bench = Bench::new(variant, SyncStrategy::CoarseLock, shape);
                b.iter_custom(|iters| {
                    let mut elapsed = Duration::ZERO;
                    for _ in 0..iters {
                        let cancel = bench.random_cancel();
                        let start = Instant::now();
                        black_box(bench.book.execute(cancel, 0).unwrap());
                        elapsed += start.elapsed();

                        let replacement = bench.random_passive();
                        bench.apply(replacement);
                    }
                    elapsed
                });
            });
        }
    }

    group.finish();
}

fn benchmark_book_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("book_match");

    for variant in variants() {
        for shape in Shape::all() {
            let id = BenchmarkId::new(variant.name(), shape.name());
            group.bench_function(id, |b| {
                let mut bench = Bench::new(variant, SyncStrategy::CoarseLock, shape);
                b.iter_custom(|iters| {
                    let mut elapsed = Duration::ZERO;
                    for _ in 0..iters {
                        let take = bench.limit(Side::Bid, BEST_ASK, 1);
                        let start = Instant::now();
                        black_box(bench.book.execute(take, 0).unwrap());
                        elapsed += start.elapsed();

                        let refill = bench.limit(Side::Ask, BEST_ASK, 1);
                        bench.book.execute(refill, 0).unwrap();
                    }
                    elapsed
                });
            });
        }
    }

    group.finish();
}

fn benchmark_cancel_ratio(c: &mut Criterion) {
    const COMMANDS: usize = 2_000;

    let mut group = c.benchmark_group("cancel_ratio");
    group.throughput(Throughput::Elements(COMMANDS as u64));
    group.sample_size(10);

    for variant in variants() {
        for shape in Shape::all() {
            for cancel_pct in [0, 50, 90] {
                let id = BenchmarkId::new(
                    format!("{}/{}", variant.name(), shape.name()),
                    format!("{cancel_pct}%"),
                );
                group.bench_function(id, |b| {
                    b.iter_batched(
                        || {
                            let mut bench = Bench::new(variant, SyncStrategy::CoarseLock, shape);
                            let stream = bench.stream(cancel_pct, COMMANDS);
                            (bench.book, stream)
                        },
                        |(book, stream)| {
                            for command in stream {
                                black_box(book.execute(command, 0).unwrap());
                            }
                            book
                        },
                        BatchSize::LargeInput,
                    );
                });
            }
        }
    }

    group.finish();
}

// ============================================================================
// Synchronization
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum ReaderLoad {
    BestBid,
    Snapshot,
}

impl ReaderLoad {
    fn name(self) -> &'static str {
        match self {
            ReaderLoad::BestBid => "best_bid",
            ReaderLoad::Snapshot => "snapshot",
        }
    }
}

fn spawn_readers(
    book: &Arc<dyn SharedOrderBook>,
    count: usize,
    load: ReaderLoad,
    stop: &Arc<AtomicBool>,
) -> Vec<thread::JoinHandle<()>> {
    (0..count)
        .map(|_| {
            let book = Arc::clone(book);
            let stop = Arc::clone(stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    match load {
                        ReaderLoad::BestBid => {
                            black_box(book.best_bid());
                        },
                        ReaderLoad::Snapshot => {
                            black_box(book.snapshot());
                        },
                    }
                }
            })
        })
        .collect()
}

fn benchmark_writer_under_readers(c: &mut Criterion) {
    let mut group = c.benchmark_group("writer_under_readers");
    group.sample_size(30);

    for sync in strategies() {
        for load in [ReaderLoad::BestBid, ReaderLoad::Snapshot] {
            for readers in [0usize, 1, 2, 5, 10] {
                // with no readers the load makes no difference
                if readers == 0 && matches!(load, ReaderLoad::Snapshot) {
                    continue;
                }
                let id = BenchmarkId::new(format!("{}/{}", sync.name(), load.name()), readers);
                group.bench_function(id, |b| {
                    let mut bench = Bench::new(BookVariant::SkipList, sync, Shape::DEFAULT);
                    let stop = Arc::new(AtomicBool::new(false));
                    let threads = spawn_readers(&bench.book, readers, load, &stop);

                    b.iter(|| bench.take_and_refill());

                    stop.store(true, Ordering::Relaxed);
                    for reader in threads {
                        reader.join().unwrap();
                    }
                });
            }
        }
    }

    group.finish();
}

fn benchmark_reader_under_writer(c: &mut Criterion) {
    let mut group = c.benchmark_group("reader_under_writer");

    for sync in strategies() {
        for writing in [false, true] {
            let id = BenchmarkId::new(sync.name(), if writing { "writer" } else { "idle" });
            group.bench_function(id, |b| {
                let mut bench = Bench::new(BookVariant::SkipList, sync, Shape::DEFAULT);
                let book = Arc::clone(&bench.book);

                let stop = Arc::new(AtomicBool::new(false));
                let writer = writing.then(|| {
                    let stop = Arc::clone(&stop);
                    thread::spawn(move || {
                        while !stop.load(Ordering::Relaxed) {
                            bench.take_and_refill();
                        }
                    })
                });

                b.iter(|| black_box(book.top_of_book()));

                stop.store(true, Ordering::Relaxed);
                if let Some(writer) = writer {
                    writer.join().unwrap();
                }
            });
        }
    }

    group.finish();
}

// ============================================================================
// Mixed Workload
// ============================================================================

fn mixed_stream(seed: u64, len: usize) -> Vec<OrderCommand> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (1..=len as u64)
        .map(|sequence| {
            let roll: u8 = rng.gen_range(0..100);
            if roll < 20 && sequence > 1 {
                OrderCommand::Cancel {
                    id: OrderId(rng.gen_range(1..sequence)),
                    sequence,
                }
            } else {
                let side = if rng.gen_bool(0.5) { Side::Bid } else { Side::Ask };
                let quantity = rng.gen_range(1..100);
                if roll < 25 {
                    Order::market(OrderId(sequence), side, quantity, sequence).into()
                } else {
                    let cents = rng.gen_range(9_950..=10_050);
                    Order::limit(OrderId(sequence), side, price(cents), quantity, sequence).into()
                }
            }
        })
        .collect()
}

fn benchmark_mixed_workload(c: &mut Criterion) {
    const COMMANDS: usize = 10_000;
    let stream = mixed_stream(0xB00C, COMMANDS);

    let mut group = c.benchmark_group("mixed_workload");
    group.throughput(Throughput::Elements(COMMANDS as u64));
    group.sample_size(20);

    for variant in variants() {
        for sync in strategies() {
            let id = format!("{}/{}", variant.name(), sync.name());
            group.bench_with_input(BenchmarkId::from_parameter(id), &stream, |b, stream| {
                b.iter_batched(
                    || shared_book(variant, sync),
                    |book| {
                        for command in stream {
                            black_box(book.execute(*command, 0).unwrap());
                        }
                        book
                    },
                    BatchSize::LargeInput,
                );
            });
        }
    }

    group.finish();
}

// ============================================================================
// Snapshots
// ============================================================================

fn benchmark_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for sync in strategies() {
        for shape in [
            Shape { depth: Depth::Sparse, spread: Spread::Uniform },
            Shape::DEFAULT,
        ] {
            let id = BenchmarkId::new(sync.name(), shape.name());
            group.bench_function(id, |b| {
                let bench = Bench::new(BookVariant::SkipList, sync, shape);
                bench.book.flush();

                b.iter(|| black_box(bench.book.snapshot()));
            });
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_book_add,
    benchmark_book_cancel,
    benchmark_book_match,
    benchmark_cancel_ratio,
    benchmark_writer_under_readers,
    benchmark_reader_under_writer,
    benchmark_mixed_workload,
    benchmark_snapshot,
);
criterion_main!(benches);
