//! Top-of-book tracker for a single (exchange, pair).
//!
//! The tracker folds order items into one bounded queue per side and decides,
//! once per inbound message, whether the best bid/offer changed enough to be
//! reported.
//!
//! # Approximation
//!
//! In incremental mode the queues only see the best `max_levels` levels that
//! were ever offered to them. When the true best level is deleted, the
//! tracker may not know the next one. To avoid reporting a spread widening
//! that is only an artifact of that blind spot, incremental reports keep the
//! better price of the previous and current top on each side. A real widening
//! beyond the tracked levels therefore stays hidden until an authoritative
//! snapshot or tick corrects it.

use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::error::ValidationError;
use crate::types::{
    BboEvent, NormalizedBboMessage, NormalizedOrderBookMessage, OrderLevel, PairKey, Side,
    TimestampMs,
};

use super::queue::OrderSideQueue;

/// How an update relates to the tracked state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Delta against previously seen levels
    Incremental,
    /// Ground truth for the top of book (full snapshot or native BBO tick)
    Authoritative,
}

/// Per-pair counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    /// Messages processed
    pub messages: u64,
    /// BBO events emitted
    pub emitted: u64,
    /// Candidate events dropped because they repeated the last emission
    pub suppressed: u64,
    /// Order items skipped by validation
    pub skipped_items: u64,
    /// Levels evicted by the staleness sweep
    pub stale_evictions: u64,
}

/// Best level on each side, captured at one instant
type Tops = (Option<OrderLevel>, Option<OrderLevel>);

/// Tracks the best bid/offer for one pair.
///
/// # Thread Safety
///
/// Not internally synchronized. The engine wraps each tracker in its own
/// `parking_lot::Mutex`.
#[derive(Debug, Clone)]
pub struct PairTracker {
    key: PairKey,
    asks: OrderSideQueue,
    bids: OrderSideQueue,
    /// Last emitted event, for idempotence
    last_event: Option<BboEvent>,
    /// Engine clock at the last processed message
    last_seen_ms: TimestampMs,
    stale_after_ms: i64,
    truncate_snapshots: bool,
    stats: TrackerStats,
}

impl PairTracker {
    /// Create an empty tracker for `key`
    #[must_use]
    pub fn new(key: PairKey, config: &Config) -> Self {
        Self {
            key,
            asks: OrderSideQueue::asks(config.max_levels()),
            bids: OrderSideQueue::bids(config.max_levels()),
            last_event: None,
            last_seen_ms: 0,
            stale_after_ms: config.stale_after_ms(),
            truncate_snapshots: config.truncate_snapshots(),
            stats: TrackerStats::default(),
        }
    }

    /// Get the pair key
    #[must_use]
    pub fn key(&self) -> &PairKey {
        &self.key
    }

    /// Get the queue for one side
    #[must_use]
    pub fn queue(&self, side: Side) -> &OrderSideQueue {
        match side {
            Side::Ask => &self.asks,
            Side::Bid => &self.bids,
        }
    }

    fn queue_mut(&mut self, side: Side) -> &mut OrderSideQueue {
        match side {
            Side::Ask => &mut self.asks,
            Side::Bid => &mut self.bids,
        }
    }

    /// Best tracked ask
    #[must_use]
    pub fn best_ask(&self) -> Option<&OrderLevel> {
        self.asks.peek()
    }

    /// Best tracked bid
    #[must_use]
    pub fn best_bid(&self) -> Option<&OrderLevel> {
        self.bids.peek()
    }

    /// Last emitted event
    #[must_use]
    pub fn last_event(&self) -> Option<&BboEvent> {
        self.last_event.as_ref()
    }

    /// Engine clock at the last processed message (0 if none yet)
    #[must_use]
    pub const fn last_seen_ms(&self) -> TimestampMs {
        self.last_seen_ms
    }

    /// Get the tracker counters
    #[must_use]
    pub const fn stats(&self) -> TrackerStats {
        self.stats
    }

    fn tops(&self) -> Tops {
        (self.asks.peek().copied(), self.bids.peek().copied())
    }

    /// Fold one order item into one side.
    ///
    /// Emission is not decided here; see [`PairTracker::on_order_book`] and
    /// [`PairTracker::on_bbo`].
    ///
    /// # Errors
    ///
    /// Returns the validation failure if the item cannot be applied. The
    /// queue is untouched in that case.
    pub fn apply(
        &mut self,
        side: Side,
        candidate: OrderLevel,
        mode: UpdateMode,
    ) -> Result<(), ValidationError> {
        candidate.validate()?;

        let queue = self.queue_mut(side);
        let prev_top = queue.peek().copied();

        if candidate.is_tombstone() {
            queue.remove_all(candidate.price);
            return Ok(());
        }

        let Some(prev_top) = prev_top else {
            queue.add(candidate);
            return Ok(());
        };

        if mode == UpdateMode::Authoritative {
            // The side holds only the authoritative top. A re-delivered top
            // keeps its original timestamp.
            let top = if candidate.same_quote(&prev_top) {
                prev_top
            } else {
                candidate
            };
            queue.clear();
            queue.add(top);
            return Ok(());
        }

        let existing = queue.find(candidate.price).copied();
        if existing.is_some_and(|e| e.quantity == candidate.quantity) {
            // Re-delivery of a level we already hold
            return Ok(());
        }

        match existing {
            None if !queue.is_full() => queue.add(candidate),
            None => {
                if side.is_better(&candidate, &prev_top) {
                    queue.replace_top(candidate);
                }
            }
            Some(_) => {
                queue.remove_all(candidate.price);
                queue.add(candidate);
            }
        }
        Ok(())
    }

    /// Apply a batch of levels to one side, skipping invalid ones.
    ///
    /// Returns the number of skipped levels.
    pub fn apply_batch(
        &mut self,
        side: Side,
        levels: impl IntoIterator<Item = OrderLevel>,
        mode: UpdateMode,
    ) -> usize {
        let mut skipped = 0;
        for level in levels {
            if let Err(err) = self.apply(side, level, mode) {
                warn!(
                    exchange = %self.key.exchange,
                    pair = %self.key.pair,
                    ?side,
                    price = level.price,
                    quantity = level.quantity,
                    reason = %err,
                    "Skipping invalid order item"
                );
                skipped += 1;
            }
        }
        self.stats.skipped_items += skipped as u64;
        skipped
    }

    /// Evict stale tops on both sides. Returns the number of evicted levels.
    pub fn sweep_stale(&mut self, now_ms: TimestampMs) -> usize {
        let evicted = self.asks.evict_stale_top(now_ms, self.stale_after_ms)
            + self.bids.evict_stale_top(now_ms, self.stale_after_ms);
        if evicted > 0 {
            debug!(pair = %self.key, evicted, "Evicted stale top-of-book levels");
            self.stats.stale_evictions += evicted as u64;
        }
        evicted
    }

    /// Process an order book snapshot or delta
    ///
    /// Returns the event to emit, if the top of book changed.
    pub fn on_order_book(
        &mut self,
        msg: &NormalizedOrderBookMessage,
        now_ms: TimestampMs,
    ) -> Option<BboEvent> {
        let (mode, depth) = if msg.full {
            let depth = if self.truncate_snapshots { 1 } else { usize::MAX };
            (UpdateMode::Authoritative, depth)
        } else {
            (UpdateMode::Incremental, usize::MAX)
        };

        let prev = self.begin(now_ms);
        self.apply_batch(Side::Ask, msg.levels(Side::Ask).take(depth), mode);
        self.apply_batch(Side::Bid, msg.levels(Side::Bid).take(depth), mode);
        self.finish(prev, mode)
    }

    /// Process a native top-of-book tick
    ///
    /// Returns the event to emit, if the top of book changed.
    pub fn on_bbo(&mut self, msg: &NormalizedBboMessage, now_ms: TimestampMs) -> Option<BboEvent> {
        let mode = UpdateMode::Authoritative;
        let prev = self.begin(now_ms);
        self.apply_batch(Side::Ask, [msg.level(Side::Ask)], mode);
        self.apply_batch(Side::Bid, [msg.level(Side::Bid)], mode);
        self.finish(prev, mode)
    }

    /// Sweep, then capture the tops before the batch is applied
    fn begin(&mut self, now_ms: TimestampMs) -> Tops {
        self.stats.messages += 1;
        self.last_seen_ms = now_ms;
        self.sweep_stale(now_ms);
        self.tops()
    }

    /// Decide what, if anything, to emit after a batch
    fn finish(&mut self, prev: Tops, mode: UpdateMode) -> Option<BboEvent> {
        let (Some(cur_ask), Some(cur_bid)) = self.tops() else {
            return None;
        };

        let (ask, bid) = match mode {
            UpdateMode::Authoritative => (cur_ask, cur_bid),
            UpdateMode::Incremental => {
                let (prev_ask, prev_bid) = prev;
                if !top_changed(prev_ask, prev_bid, &cur_ask, &cur_bid) {
                    return None;
                }
                (
                    prev_ask.map_or(cur_ask, |p| more_favorable(Side::Ask, p, cur_ask)),
                    prev_bid.map_or(cur_bid, |p| more_favorable(Side::Bid, p, cur_bid)),
                )
            }
        };

        let event = BboEvent::from_levels(&self.key, &ask, &bid);
        if self
            .last_event
            .as_ref()
            .is_some_and(|last| last.same_quotes(&event))
        {
            trace!(pair = %self.key, "Suppressing repeated BBO");
            self.stats.suppressed += 1;
            return None;
        }

        debug!(
            pair = %self.key,
            bid = event.bid_price,
            bid_qty = event.bid_quantity,
            ask = event.ask_price,
            ask_qty = event.ask_quantity,
            "BBO changed"
        );
        self.stats.emitted += 1;
        self.last_event = Some(event.clone());
        Some(event)
    }
}

/// Tightening or a quantity change at the top on either side. A missing
/// previous side always counts as a change.
fn top_changed(
    prev_ask: Option<OrderLevel>,
    prev_bid: Option<OrderLevel>,
    cur_ask: &OrderLevel,
    cur_bid: &OrderLevel,
) -> bool {
    let (Some(prev_ask), Some(prev_bid)) = (prev_ask, prev_bid) else {
        return true;
    };
    prev_ask.price > cur_ask.price
        || prev_ask.quantity != cur_ask.quantity
        || prev_bid.price < cur_bid.price
        || prev_bid.quantity != cur_bid.quantity
}

/// The previous level if its price is strictly better, otherwise the current
fn more_favorable(side: Side, prev: OrderLevel, cur: OrderLevel) -> OrderLevel {
    if side.is_better_price(prev.price, cur.price) {
        prev
    } else {
        cur
    }
}
