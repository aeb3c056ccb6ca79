//! Bounded, ordered price-level container for one side of a book.
//!
//! Levels are kept in a `BTreeSet` ranked by the side's comparator, providing:
//!
//! - O(log n) insertion and top replacement
//! - O(1)-ish access to the best level via `first()`
//! - best-first iteration
//!
//! Lookups by price are linear scans. The queue never holds more than a
//! handful of levels, so a secondary index would cost more than it saves.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::types::{OrderLevel, Price, Side, TimestampMs};

/// A level tagged with the side that ranks it
#[derive(Debug, Clone, Copy)]
struct Ranked {
    side: Side,
    level: OrderLevel,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.side.compare(&self.level, &other.level)
    }
}

/// Ordered set of price levels for one side, best first.
///
/// The capacity is advisory: [`add`](Self::add) may push the queue past it and
/// the owning tracker decides when to evict. Tombstones are never stored by
/// the tracker, but the queue itself does not police quantities.
///
/// Two levels with identical price, timestamp and quantity collapse into one.
#[derive(Debug, Clone)]
pub struct OrderSideQueue {
    side: Side,
    capacity: usize,
    levels: BTreeSet<Ranked>,
}

impl OrderSideQueue {
    /// Create an empty queue ranked by `side`'s ordering
    #[must_use]
    pub fn new(side: Side, capacity: usize) -> Self {
        Self {
            side,
            capacity,
            levels: BTreeSet::new(),
        }
    }

    /// Create an empty ask queue
    #[must_use]
    pub fn asks(capacity: usize) -> Self {
        Self::new(Side::Ask, capacity)
    }

    /// Create an empty bid queue
    #[must_use]
    pub fn bids(capacity: usize) -> Self {
        Self::new(Side::Bid, capacity)
    }

    /// Side whose ordering ranks this queue
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Advisory capacity
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored levels
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Check if the queue holds no levels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Check if the queue is at (or past) capacity
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.levels.len() >= self.capacity
    }

    /// Best level, if any
    #[must_use]
    pub fn peek(&self) -> Option<&OrderLevel> {
        self.levels.first().map(|r| &r.level)
    }

    /// Insert a level at its ranked position
    pub fn add(&mut self, level: OrderLevel) {
        self.levels.insert(Ranked {
            side: self.side,
            level,
        });
    }

    /// Remove and return the best level
    pub fn pop(&mut self) -> Option<OrderLevel> {
        self.levels.pop_first().map(|r| r.level)
    }

    /// Find the stored level at exactly `price`
    ///
    /// If several levels share the price, the best-ranked one is returned.
    #[must_use]
    pub fn find(&self, price: Price) -> Option<&OrderLevel> {
        self.levels
            .iter()
            .map(|r| &r.level)
            .find(|level| level.price == price)
    }

    /// Remove every level at `price`, returning them best first
    pub fn remove_all(&mut self, price: Price) -> Vec<OrderLevel> {
        let mut removed = Vec::new();
        self.levels.retain(|r| {
            if r.level.price == price {
                removed.push(r.level);
                false
            } else {
                true
            }
        });
        removed
    }

    /// Pop the best level and insert `level`, returning the popped one
    pub fn replace_top(&mut self, level: OrderLevel) -> Option<OrderLevel> {
        let popped = self.pop();
        self.add(level);
        popped
    }

    /// [`add`](Self::add) into an empty queue, otherwise [`replace_top`](Self::replace_top)
    pub fn replace_top_or_add(&mut self, level: OrderLevel) -> Option<OrderLevel> {
        if self.is_empty() {
            self.add(level);
            None
        } else {
            self.replace_top(level)
        }
    }

    /// Pop the top while it is older than `ttl_ms`.
    ///
    /// Only the top is guaranteed fresh afterwards. A stale level further down
    /// is left alone: it cannot be read until it becomes top, and then the
    /// next sweep removes it first.
    ///
    /// Returns the number of levels evicted.
    pub fn evict_stale_top(&mut self, now_ms: TimestampMs, ttl_ms: i64) -> usize {
        let mut evicted = 0;
        while let Some(top) = self.peek() {
            if top.age_ms(now_ms) <= ttl_ms {
                break;
            }
            self.pop();
            evicted += 1;
        }
        evicted
    }

    /// Iterate levels best first
    pub fn iter(&self) -> impl Iterator<Item = &OrderLevel> + '_ {
        self.levels.iter().map(|r| &r.level)
    }

    /// Remove all levels
    pub fn clear(&mut self) {
        self.levels.clear();
    }
}
