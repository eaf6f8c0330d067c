// ============================================================================
// Bucketed Array Book
// Direct-indexed price buckets over a bounded range on a tick grid
// ============================================================================
//
// Bucket `i` holds the level at `min_price + i * tick`. The lowest and
// highest occupied bucket indices are cached so best-price lookup is O(1);
// when the cached bucket drains, the cursor walks to the next occupied one.
//
// Prices outside `[min_price, max_price]` or off the tick grid are still
// accepted: they rest in an ordered overflow map and are merged back in on
// every ordered walk, so behaviour never depends on the configured range.

use crate::error::ConfigError;
use crate::numeric::Price;
use std::collections::BTreeMap;
use std::iter::Peekable;

use super::{LadderBook, LevelMap, PriceLevel};

#[derive(Debug, Clone)]
pub struct BucketLevels {
    min_price: Price,
    tick: Price,
    buckets: Vec<Option<PriceLevel>>,
    occupied: usize,
    lowest: Option<usize>,
    highest: Option<usize>,
    overflow: BTreeMap<Price, PriceLevel>,
}

impl BucketLevels {
    pub fn new(min_price: Price, max_price: Price, tick: Price) -> Result<Self, ConfigError> {
        if !tick.is_positive() {
            return Err(ConfigError::InvalidTick(tick));
        }
        if min_price >= max_price {
            return Err(ConfigError::InvalidBucketRange {
                min: min_price,
                max: max_price,
            });
        }
        let steps = max_price
            .steps_from(min_price, tick)
            .ok_or(ConfigError::InvalidBucketRange {
                min: min_price,
                max: max_price,
            })?;
        let count = steps + 1;
        if count > crate::domain::config::MAX_BUCKETS {
            return Err(ConfigError::TooManyBuckets {
                buckets: count,
                limit: crate::domain::config::MAX_BUCKETS,
            });
        }

        let mut buckets = Vec::new();
        buckets.resize_with(count as usize, || None);
        Ok(Self {
            min_price,
            tick,
            buckets,
            occupied: 0,
            lowest: None,
            highest: None,
            overflow: BTreeMap::new(),
        })
    }

    /// Bucket index for an in-range, on-grid price.
    #[inline]
    fn bucket_of(&self, price: Price) -> Option<usize> {
        let steps = price.steps_from(self.min_price, self.tick)?;
        let index = usize::try_from(steps).ok()?;
        (index < self.buckets.len()).then_some(index)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Levels parked outside the bucket array
    pub fn overflow_level_count(&self) -> usize {
        self.overflow.len()
    }

    fn occupied_range(&self) -> &[Option<PriceLevel>] {
        match (self.lowest, self.highest) {
            (Some(lo), Some(hi)) => &self.buckets[lo..=hi],
            _ => &[],
        }
    }

    fn next_occupied_up(&self, from: usize, to: usize) -> Option<usize> {
        (from..=to).find(|&i| self.buckets[i].is_some())
    }

    fn next_occupied_down(&self, from: usize, to: usize) -> Option<usize> {
        (to..=from).rev().find(|&i| self.buckets[i].is_some())
    }
}

/// Merge two price-ordered level streams. Both sides hold distinct prices.
fn merge_levels<'a, A, B>(a: A, b: B, ascending: bool) -> impl Iterator<Item = &'a PriceLevel>
where
    A: Iterator<Item = &'a PriceLevel>,
    B: Iterator<Item = &'a PriceLevel>,
{
    let mut a: Peekable<A> = a.peekable();
    let mut b: Peekable<B> = b.peekable();
    std::iter::from_fn(move || {
        let take_a = match (a.peek(), b.peek()) {
            (Some(x), Some(y)) => {
                if ascending {
                    x.price() < y.price()
                } else {
                    x.price() > y.price()
                }
            },
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return None,
        };
        if take_a {
            a.next()
        } else {
            b.next()
        }
    })
}

impl LevelMap for BucketLevels {
    const NAME: &'static str = "bucketed-array";

    fn level(&self, price: Price) -> Option<&PriceLevel> {
        match self.bucket_of(price) {
            Some(index) => self.buckets[index].as_ref(),
            None => self.overflow.get(&price),
        }
    }

    fn level_mut(&mut self, price: Price) -> Option<&mut PriceLevel> {
        match self.bucket_of(price) {
            Some(index) => self.buckets[index].as_mut(),
            None => self.overflow.get_mut(&price),
        }
    }

    fn level_or_insert(&mut self, price: Price) -> &mut PriceLevel {
        let Some(index) = self.bucket_of(price) else {
            return self
                .overflow
                .entry(price)
                .or_insert_with(|| PriceLevel::new(price));
        };
        if self.buckets[index].is_none() {
            self.occupied += 1;
            self.lowest = Some(self.lowest.map_or(index, |lo| lo.min(index)));
            self.highest = Some(self.highest.map_or(index, |hi| hi.max(index)));
        }
        self.buckets[index].get_or_insert_with(|| PriceLevel::new(price))
    }

    fn remove_level(&mut self, price: Price) -> Option<PriceLevel> {
        let Some(index) = self.bucket_of(price) else {
            return self.overflow.remove(&price);
        };
        let level = self.buckets[index].take()?;
        self.occupied -= 1;

        if self.occupied == 0 {
            self.lowest = None;
            self.highest = None;
        } else if let (Some(lo), Some(hi)) = (self.lowest, self.highest) {
            if index == lo {
                self.lowest = self.next_occupied_up(lo, hi);
            }
            if index == hi {
                self.highest = self.next_occupied_down(hi, lo);
            }
        }
        Some(level)
    }

    fn lowest(&self) -> Option<&PriceLevel> {
        let bucket = self.lowest.and_then(|i| self.buckets[i].as_ref());
        let spill = self.overflow.values().next();
        match (bucket, spill) {
            (Some(b), Some(s)) => Some(if s.price() < b.price() { s } else { b }),
            (b, s) => b.or(s),
        }
    }

    fn highest(&self) -> Option<&PriceLevel> {
        let bucket = self.highest.and_then(|i| self.buckets[i].as_ref());
        let spill = self.overflow.values().next_back();
        match (bucket, spill) {
            (Some(b), Some(s)) => Some(if s.price() > b.price() { s } else { b }),
            (b, s) => b.or(s),
        }
    }

    fn ascending(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        let buckets = self.occupied_range().iter().filter_map(Option::as_ref);
        if self.overflow.is_empty() {
            return Box::new(buckets);
        }
        Box::new(merge_levels(buckets, self.overflow.values(), true))
    }

    fn descending(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        let buckets = self.occupied_range().iter().rev().filter_map(Option::as_ref);
        if self.overflow.is_empty() {
            return Box::new(buckets);
        }
        Box::new(merge_levels(buckets, self.overflow.values().rev(), false))
    }

    fn len(&self) -> usize {
        self.occupied + self.overflow.len()
    }
}

pub type BucketedArrayBook = LadderBook<BucketLevels>;

impl BucketedArrayBook {
    pub fn new(
        min_price: Price,
        max_price: Price,
        tick: Price,
        expected_orders: usize,
    ) -> Result<Self, ConfigError> {
        Ok(Self::with_levels(
            BucketLevels::new(min_price, max_price, tick)?,
            BucketLevels::new(min_price, max_price, tick)?,
            expected_orders,
        ))
    }
}
