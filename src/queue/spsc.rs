// ============================================================================
// Order Input Channel
// Bounded single-producer single-consumer queue of order commands
// ============================================================================

use crate::domain::OrderCommand;
use crossbeam::queue::ArrayQueue;
use crossbeam::utils::Backoff;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

struct Shared {
    queue: ArrayQueue<OrderCommand>,
    sender_closed: AtomicBool,
    receiver_closed: AtomicBool,
    enqueued: AtomicU64,
    rejected_full: AtomicU64,
}

/// Producing half. Not `Clone`: the admission collaborator is the only
/// producer, which is what keeps arrival order equal to sequence order.
pub struct OrderSender {
    shared: Arc<Shared>,
}

/// Consuming half, owned by the engine thread.
pub struct OrderReceiver {
    shared: Arc<Shared>,
}

/// Create the input channel.
///
/// # Example
/// ```
/// use book_core::domain::{Order, OrderId, Side};
/// use book_core::queue::order_channel;
///
/// let (tx, rx) = order_channel(2);
/// let order = Order::limit(OrderId(1), Side::Bid, "10.00".parse().unwrap(), 5, 1);
/// tx.try_enqueue(order.into()).unwrap();
/// assert_eq!(rx.try_dequeue().map(|c| c.sequence()), Some(1));
/// ```
pub fn order_channel(capacity: usize) -> (OrderSender, OrderReceiver) {
    let shared = Arc::new(Shared {
        queue: ArrayQueue::new(capacity.max(1)),
        sender_closed: AtomicBool::new(false),
        receiver_closed: AtomicBool::new(false),
        enqueued: AtomicU64::new(0),
        rejected_full: AtomicU64::new(0),
    });
    (
        OrderSender {
            shared: Arc::clone(&shared),
        },
        OrderReceiver { shared },
    )
}

impl OrderSender {
    /// Non-blocking enqueue. A full queue hands the command back so the
    /// caller can retry or reject upstream.
    #[inline]
    pub fn try_enqueue(&self, command: OrderCommand) -> Result<(), OrderCommand> {
        match self.shared.queue.push(command) {
            Ok(()) => {
                self.shared.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            Err(command) => {
                self.shared.rejected_full.fetch_add(1, Ordering::Relaxed);
                Err(command)
            },
        }
    }

    /// Spin, then yield, until there is room. Fails only once the receiver
    /// is gone.
    pub fn enqueue(&self, mut command: OrderCommand) -> Result<(), OrderCommand> {
        let backoff = Backoff::new();
        loop {
            if self.shared.receiver_closed.load(Ordering::Acquire) {
                return Err(command);
            }
            match self.shared.queue.push(command) {
                Ok(()) => {
                    self.shared.enqueued.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                },
                Err(back) => {
                    command = back;
                    backoff.snooze();
                    if backoff.is_completed() {
                        std::thread::yield_now();
                    }
                },
            }
        }
    }

    pub fn len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    /// Commands accepted so far
    pub fn enqueued(&self) -> u64 {
        self.shared.enqueued.load(Ordering::Relaxed)
    }

    /// `try_enqueue` calls refused because the queue was full
    pub fn rejected_full(&self) -> u64 {
        self.shared.rejected_full.load(Ordering::Relaxed)
    }

    pub fn is_disconnected(&self) -> bool {
        self.shared.receiver_closed.load(Ordering::Acquire)
    }
}

impl Drop for OrderSender {
    fn drop(&mut self) {
        self.shared.sender_closed.store(true, Ordering::Release);
    }
}

impl OrderReceiver {
    #[inline]
    pub fn try_dequeue(&self) -> Option<OrderCommand> {
        self.shared.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    /// The sender is gone; whatever is still queued is all there will be.
    pub fn is_disconnected(&self) -> bool {
        self.shared.sender_closed.load(Ordering::Acquire)
    }
}

impl Drop for OrderReceiver {
    fn drop(&mut self) {
        self.shared.receiver_closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Order, OrderId, Side};
    use crate::numeric::Price;

    fn command(seq: u64) -> OrderCommand {
        Order::limit(OrderId(seq), Side::Bid, Price::ONE, 1, seq).into()
    }

    #[test]
    fn test_full_queue_returns_command() {
        let (tx, rx) = order_channel(2);
        tx.try_enqueue(command(1)).unwrap();
        tx.try_enqueue(command(2)).unwrap();
        let back = tx.try_enqueue(command(3)).unwrap_err();
        assert_eq!(back.sequence(), 3);
        assert_eq!(tx.rejected_full(), 1);
        assert_eq!(tx.enqueued(), 2);

        assert_eq!(rx.try_dequeue().map(|c| c.sequence()), Some(1));
        assert_eq!(rx.try_dequeue().map(|c| c.sequence()), Some(2));
        assert!(rx.try_dequeue().is_none());
    }

    #[test]
    fn test_disconnect_flags() {
        let (tx, rx) = order_channel(4);
        assert!(!rx.is_disconnected());
        drop(tx);
        assert!(rx.is_disconnected());

        let (tx, rx) = order_channel(1);
        tx.try_enqueue(command(1)).unwrap();
        drop(rx);
        assert!(tx.is_disconnected());
        assert!(tx.enqueue(command(2)).is_err());
    }

    #[test]
    fn test_fifo_across_threads() {
        let (tx, rx) = order_channel(8);
        let producer = std::thread::spawn(move || {
            for seq in 1..=1_000 {
                tx.enqueue(command(seq)).unwrap();
            }
        });
        let mut expected = 1;
        while expected <= 1_000 {
            if let Some(cmd) = rx.try_dequeue() {
                assert_eq!(cmd.sequence(), expected);
                expected += 1;
            }
        }
        producer.join().unwrap();
    }
}
