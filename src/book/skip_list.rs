// ============================================================================
// Skip List Book
// Prices ordered by a skip list, levels stored in a hash map
// ============================================================================
//
// `SkipSet` hands out shared entries only, so the mutable levels cannot live
// inside it. Prices go in the set and levels in a `HashMap` beside it. The
// cost shows on the read side: every `front`, `back` and `iter` pins a
// crossbeam epoch, and each level reached that way takes one more hash
// lookup. Best-price reads pay one pin and one lookup; a snapshot walk pays
// one lookup per level. Inserts, cancels and fills go straight to the map and
// only touch the set when a level appears or drains.

use crate::numeric::Price;
use crossbeam_skiplist::SkipSet;
use std::collections::HashMap;
use std::fmt;

use super::{LadderBook, LevelMap, PriceLevel};

/// Price levels whose ordering comes from a `SkipSet`.
///
/// Level lookup by price is a hash lookup; only best-price discovery and
/// ordered walks go through the skip list.
pub struct SkipLevels {
    prices: SkipSet<Price>,
    levels: HashMap<Price, PriceLevel>,
}

impl SkipLevels {
    pub fn new() -> Self {
        Self {
            prices: SkipSet::new(),
            levels: HashMap::new(),
        }
    }
}

impl Default for SkipLevels {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SkipLevels {
    fn clone(&self) -> Self {
        let prices = SkipSet::new();
        for entry in self.prices.iter() {
            prices.insert(*entry.value());
        }
        Self {
            prices,
            levels: self.levels.clone(),
        }
    }
}

impl fmt::Debug for SkipLevels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipLevels")
            .field("levels", &self.levels.len())
            .finish()
    }
}

impl LevelMap for SkipLevels {
    const NAME: &'static str = "skip-list";

    fn level(&self, price: Price) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    fn level_mut(&mut self, price: Price) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&price)
    }

    fn level_or_insert(&mut self, price: Price) -> &mut PriceLevel {
        let prices = &self.prices;
        self.levels.entry(price).or_insert_with(|| {
            prices.insert(price);
            PriceLevel::new(price)
        })
    }

    fn remove_level(&mut self, price: Price) -> Option<PriceLevel> {
        let level = self.levels.remove(&price)?;
        self.prices.remove(&price);
        Some(level)
    }

    fn lowest(&self) -> Option<&PriceLevel> {
        let entry = self.prices.front()?;
        self.levels.get(entry.value())
    }

    fn highest(&self) -> Option<&PriceLevel> {
        let entry = self.prices.back()?;
        self.levels.get(entry.value())
    }

    fn ascending(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        Box::new(
            self.prices
                .iter()
                .filter_map(move |entry| self.levels.get(entry.value())),
        )
    }

    fn descending(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        Box::new(
            self.prices
                .iter()
                .rev()
                .filter_map(move |entry| self.levels.get(entry.value())),
        )
    }

    fn len(&self) -> usize {
        self.levels.len()
    }
}

pub type SkipListBook = LadderBook<SkipLevels>;

impl SkipListBook {
    pub fn new(expected_orders: usize) -> Self {
        Self::with_levels(SkipLevels::new(), SkipLevels::new(), expected_orders)
    }
}
