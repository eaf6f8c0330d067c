// ============================================================================
// Quote Sink Interface
// ============================================================================

use crate::domain::Quote;

/// Receives top-of-book changes from a market data reader.
pub trait QuoteSink: Send {
    /// Deliver a quote. Returns `false` when the quote could not be taken;
    /// the reader counts it and moves on.
    fn publish(&mut self, quote: Quote) -> bool;
}

impl<F> QuoteSink for F
where
    F: FnMut(Quote) -> bool + Send,
{
    fn publish(&mut self, quote: Quote) -> bool {
        self(quote)
    }
}

/// Forwards quotes into a bounded crossbeam channel without blocking.
pub struct ChannelSink(pub crossbeam::channel::Sender<Quote>);

impl QuoteSink for ChannelSink {
    fn publish(&mut self, quote: Quote) -> bool {
        self.0.try_send(quote).is_ok()
    }
}
