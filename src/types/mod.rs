//! Data model for the BBO tracker.
//!
//! - [`level`] - Price levels and book sides ([`OrderLevel`], [`Side`])
//! - [`messages`] - Normalized inbound messages and the emitted [`BboEvent`]

pub mod level;
pub mod messages;

pub use level::{OrderLevel, Side};
pub use messages::{
    BboEvent, InboundMessage, NormalizedBboMessage, NormalizedOrderBookMessage, OrderItem, PairKey,
};

/// Price of a level, in quote currency units
///
/// Upstream feeds quote arbitrary decimal prices, so this is a float. Prices
/// must be strictly positive and finite to enter a queue.
pub type Price = f64;

/// Quantity resting at a price level
///
/// A quantity of exactly `0.0` is a tombstone: it removes the level and is
/// never stored.
pub type Quantity = f64;

/// Timestamp in milliseconds since Unix epoch
pub type TimestampMs = i64;

/// Current wall-clock time in milliseconds since Unix epoch
pub fn now_ms() -> TimestampMs {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as TimestampMs)
        .unwrap_or_default()
}
