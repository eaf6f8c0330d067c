// ============================================================================
// Book Module
// Order book variants sharing one ladder implementation
// ============================================================================

mod bucketed;
mod factory;
mod ladder;
mod ordered_map;
mod price_level;
mod skip_list;

pub use bucketed::{BucketLevels, BucketedArrayBook};
pub use factory::create_book;
pub use ladder::{LadderBook, LevelMap, OrderLocation};
pub use ordered_map::{OrderedMapBook, TreeLevels};
pub use price_level::PriceLevel;
pub use skip_list::{SkipLevels, SkipListBook};
