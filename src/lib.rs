//! # bbo-tracker
//!
//! Derives one normalized, de-duplicated, change-only best-bid/best-offer
//! (BBO) stream per (exchange, pair) from whatever shape of market data an
//! exchange publishes.
//!
//! ## Inputs
//!
//! Feed adapters (not part of this crate) hand the engine normalized messages:
//!
//! - **Full snapshots** - authoritative ranked levels, truncated to the top
//! - **Incremental deltas** - add/update/remove individual levels
//! - **Native BBO ticks** - the exchange's own top of book
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bbo_tracker::orderbook::{BboEngine, ChannelSink};
//! use bbo_tracker::types::InboundMessage;
//! use bbo_tracker::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bbo_tracker::Error> {
//!     let (sink, mut events) = ChannelSink::channel(1024);
//!     let engine = BboEngine::new(Config::default(), sink);
//!
//!     tokio::spawn(async move {
//!         while let Some(event) = events.recv().await {
//!             println!("{} bid {} ask {}", event.pair, event.bid_price, event.ask_price);
//!         }
//!     });
//!
//!     let line = r#"{"type":"bbo","exchange":"Binance","pair":"BTC_USDT","timestamp":1700000000000,
//!                    "bidPrice":42000.0,"bidQuantity":1.0,"askPrice":42000.5,"askQuantity":2.0}"#;
//!     engine.ingest(&InboundMessage::from_json(line)?).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`orderbook`] - side queues, per-pair tracker, engine and sinks
//! - [`types`] - price levels, normalized messages and BBO events
//! - [`config`] - queue capacity, staleness and idle-pair settings
//! - [`error`] - error types for the crate
//!
//! ## Guarantees
//!
//! - At most one event per inbound message, never the same quotes twice in a row
//! - Per-pair event order follows message order
//! - O(log n) per level update with n bounded by [`Config::max_levels`]

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod orderbook;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use error::{Error, SinkError, ValidationError};
pub use orderbook::{BboEngine, BboSink};
pub use types::{BboEvent, InboundMessage, PairKey};

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;
