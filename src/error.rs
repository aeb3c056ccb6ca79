//! Error types for the bbo-tracker crate.
//!
//! Only two kinds of failure ever reach a caller of the engine: a message the
//! engine cannot process at all, and a failing output sink. Invalid order items
//! are skipped inside the tracker and only surface through logs and
//! [`TrackerStats`](crate::orderbook::TrackerStats).

use thiserror::Error;

/// Boxed error returned by an output sink
pub type SinkError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for this crate
#[derive(Debug, Error)]
pub enum Error {
    /// A single order item is malformed
    #[error("Invalid order item: {0}")]
    Validation(#[from] ValidationError),

    /// The message kind is not handled by the engine, or it cannot be routed
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    /// The output sink failed to accept an event
    ///
    /// The tracker has already recorded the event as its last emission, so
    /// ingesting the same message again yields nothing. A caller that retries
    /// delivery must resend the event from
    /// [`BboEngine::last_event`](crate::orderbook::BboEngine::last_event).
    #[error("Output sink error: {0}")]
    Sink(#[source] SinkError),

    /// JSON decoding of a normalized message failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap any error as a sink failure
    pub fn sink(err: impl Into<SinkError>) -> Self {
        Error::Sink(err.into())
    }

    /// Check if the error was raised before any tracker state was touched
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::UnsupportedInput(_) | Error::Json(_))
    }
}

/// Reasons an order item is skipped
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ValidationError {
    /// Price is zero or negative
    #[error("non-positive price {0}")]
    NonPositivePrice(f64),

    /// Quantity is negative (zero is a valid deletion)
    #[error("negative quantity {0}")]
    NegativeQuantity(f64),

    /// Price or quantity is NaN or infinite
    #[error("non-finite value (price {price}, quantity {quantity})")]
    NonFinite {
        /// Offending price
        price: f64,
        /// Offending quantity
        quantity: f64,
    },

    /// No usable timestamp was attached to the item
    #[error("missing timestamp")]
    MissingTimestamp,
}
