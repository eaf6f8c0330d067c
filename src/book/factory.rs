// ============================================================================
// Order Book Factory
// ============================================================================

use crate::domain::{BookConfig, BookVariant};
use crate::error::ConfigError;
use crate::interfaces::OrderBook;

use super::{BucketedArrayBook, OrderedMapBook, SkipListBook};

/// Build an empty book of the configured variant.
///
/// # Example
/// ```
/// use book_core::book::create_book;
/// use book_core::domain::{BookConfig, BookVariant};
///
/// let book = create_book(&BookConfig::new(BookVariant::SkipList)).unwrap();
/// assert_eq!(book.variant(), "skip-list");
/// assert_eq!(book.order_count(), 0);
/// ```
pub fn create_book(config: &BookConfig) -> Result<Box<dyn OrderBook>, ConfigError> {
    config.validate()?;

    let book: Box<dyn OrderBook> = match config.variant {
        BookVariant::OrderedMap => Box::new(OrderedMapBook::new(config.expected_orders)),
        BookVariant::SkipList => Box::new(SkipListBook::new(config.expected_orders)),
        BookVariant::BucketedArray {
            min_price,
            max_price,
            tick,
        } => Box::new(BucketedArrayBook::new(
            min_price,
            max_price,
            tick,
            config.expected_orders,
        )?),
    };

    tracing::debug!(variant = book.variant(), "order book created");
    Ok(book)
}
