//! Price levels and book sides.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::{Price, Quantity, TimestampMs};
use crate::error::ValidationError;

/// Side of the book
///
/// Each side carries its own best-first ordering rule, see [`Side::compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Sell side - lower price is better
    Ask,
    /// Buy side - higher price is better
    Bid,
}

impl Side {
    /// Rank two levels best-first.
    ///
    /// `Ordering::Less` means `a` is better than `b`. Price decides first
    /// (lower for asks, higher for bids); equal prices fall back to the more
    /// recent timestamp, then to the larger quantity.
    pub fn compare(self, a: &OrderLevel, b: &OrderLevel) -> Ordering {
        let by_price = match self {
            Side::Ask => a.price.total_cmp(&b.price),
            Side::Bid => b.price.total_cmp(&a.price),
        };
        by_price
            .then_with(|| b.timestamp.cmp(&a.timestamp))
            .then_with(|| b.quantity.total_cmp(&a.quantity))
    }

    /// Check if `a` ranks strictly ahead of `b` on this side
    pub fn is_better(self, a: &OrderLevel, b: &OrderLevel) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// Check if `price` is strictly better than `than` on this side
    ///
    /// Unlike [`Side::is_better`] this ignores timestamps and quantities.
    pub fn is_better_price(self, price: Price, than: Price) -> bool {
        match self {
            Side::Ask => price < than,
            Side::Bid => price > than,
        }
    }
}

/// A single price level: price, resting quantity and the time it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderLevel {
    /// Level price
    pub price: Price,
    /// Resting quantity (0 means "remove this level")
    pub quantity: Quantity,
    /// Observation time (Unix ms)
    pub timestamp: TimestampMs,
}

impl OrderLevel {
    /// Create a level without validation
    #[must_use]
    pub const fn new(price: Price, quantity: Quantity, timestamp: TimestampMs) -> Self {
        Self {
            price,
            quantity,
            timestamp,
        }
    }

    /// Create a level, rejecting values that can never enter a queue
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] if the level fails [`OrderLevel::validate`].
    pub fn try_new(
        price: Price,
        quantity: Quantity,
        timestamp: TimestampMs,
    ) -> crate::Result<Self> {
        let level = Self::new(price, quantity, timestamp);
        level.validate()?;
        Ok(level)
    }

    /// Validate the level.
    ///
    /// A tombstone (quantity 0) is valid: it still needs a price to know what
    /// to delete.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.price.is_finite() || !self.quantity.is_finite() {
            return Err(ValidationError::NonFinite {
                price: self.price,
                quantity: self.quantity,
            });
        }
        if self.price <= 0.0 {
            return Err(ValidationError::NonPositivePrice(self.price));
        }
        if self.quantity < 0.0 {
            return Err(ValidationError::NegativeQuantity(self.quantity));
        }
        if self.timestamp <= 0 {
            return Err(ValidationError::MissingTimestamp);
        }
        Ok(())
    }

    /// Check if this level deletes its price instead of setting it
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.quantity == 0.0
    }

    /// Age of the level relative to `now_ms`
    #[must_use]
    pub fn age_ms(&self, now_ms: TimestampMs) -> i64 {
        now_ms.saturating_sub(self.timestamp)
    }

    /// Same price and quantity, ignoring the timestamp
    #[must_use]
    pub fn same_quote(&self, other: &OrderLevel) -> bool {
        self.price == other.price && self.quantity == other.quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: OrderLevel = OrderLevel::new(7404.35, 2.9736, 1575961821882);
    const DIFFERENT_TIMESTAMP: OrderLevel = OrderLevel::new(7404.35, 2.9736, 1575961821883);
    const DIFFERENT_PRICE: OrderLevel = OrderLevel::new(8404.35, 2.9736, 1575961821882);
    const DIFFERENT_QUANTITY: OrderLevel = OrderLevel::new(7404.35, 3.9736, 1575961821882);

    #[test]
    fn test_tie_breaks_match_on_both_sides() {
        for side in [Side::Ask, Side::Bid] {
            for other in [DIFFERENT_TIMESTAMP, DIFFERENT_QUANTITY] {
                assert!(!side.is_better(&ORDER, &other), "{side:?}");
                assert!(side.is_better(&other, &ORDER), "{side:?}");
            }
        }
    }

    #[test]
    fn test_price_direction_differs() {
        assert!(Side::Ask.is_better(&ORDER, &DIFFERENT_PRICE));
        assert!(!Side::Ask.is_better(&DIFFERENT_PRICE, &ORDER));

        assert!(!Side::Bid.is_better(&ORDER, &DIFFERENT_PRICE));
        assert!(Side::Bid.is_better(&DIFFERENT_PRICE, &ORDER));
    }

    #[test]
    fn test_equal_levels_compare_equal() {
        assert_eq!(Side::Ask.compare(&ORDER, &ORDER), Ordering::Equal);
        assert!(!Side::Bid.is_better(&ORDER, &ORDER));
    }

    #[test]
    fn test_validate() {
        assert!(ORDER.validate().is_ok());
        assert!(OrderLevel::new(100.0, 0.0, 1).validate().is_ok());

        assert_eq!(
            OrderLevel::new(0.0, 1.0, 1).validate(),
            Err(ValidationError::NonPositivePrice(0.0))
        );
        assert_eq!(
            OrderLevel::new(-1.0, 1.0, 1).validate(),
            Err(ValidationError::NonPositivePrice(-1.0))
        );
        assert_eq!(
            OrderLevel::new(100.0, 1.0, 0).validate(),
            Err(ValidationError::MissingTimestamp)
        );
        assert_eq!(
            OrderLevel::new(100.0, -2.0, 1).validate(),
            Err(ValidationError::NegativeQuantity(-2.0))
        );
        assert!(matches!(
            OrderLevel::new(f64::NAN, 1.0, 1).validate(),
            Err(ValidationError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_try_new() {
        assert!(OrderLevel::try_new(100.0, 1.0, 1).is_ok());
        assert!(matches!(
            OrderLevel::try_new(0.0, 1.0, 1),
            Err(crate::Error::Validation(ValidationError::NonPositivePrice(_)))
        ));
    }

    #[test]
    fn test_price_direction() {
        assert!(Side::Ask.is_better_price(99.0, 100.0));
        assert!(Side::Bid.is_better_price(101.0, 100.0));
        assert!(!Side::Bid.is_better_price(100.0, 100.0));
    }
}
