//! Top-of-book tracking.
//!
//! - [`queue`] - bounded, ordered price levels for one side
//! - [`tracker`] - per-pair update/merge and change detection
//! - [`engine`] - routes messages to trackers and drives the sink
//! - [`sink`] - consumers of emitted events
//!
//! # Example
//!
//! ```rust
//! use bbo_tracker::orderbook::{BboEngine, LogSink};
//! use bbo_tracker::types::{InboundMessage, NormalizedOrderBookMessage, OrderItem};
//! use bbo_tracker::Config;
//!
//! let engine = BboEngine::new(Config::default(), LogSink);
//!
//! let delta = NormalizedOrderBookMessage {
//!     exchange: "Bitstamp".to_string(),
//!     pair: "BTC_USD".to_string(),
//!     timestamp: 1_700_000_000_000,
//!     asks: vec![OrderItem::new(42_001.0, 0.3)],
//!     bids: vec![OrderItem::new(42_000.0, 1.2)],
//!     full: false,
//! };
//!
//! // Synchronous step: returns what the sink would receive
//! let event = engine
//!     .process_at(&InboundMessage::OrderBook(delta), 1_700_000_000_000)
//!     .unwrap();
//! assert_eq!(event.map(|e| e.spread()), Some(1.0));
//! ```

pub mod engine;
pub mod queue;
pub mod sink;
pub mod tracker;

pub use engine::BboEngine;
pub use queue::OrderSideQueue;
pub use sink::{sink_fn, BboSink, ChannelSink, FnSink, LogSink};
pub use tracker::{PairTracker, TrackerStats, UpdateMode};
