//! Engine routing normalized messages to per-pair trackers.
//!
//! This module provides [`BboEngine`], a thread-safe container owning one
//! [`PairTracker`] per (exchange, pair) and the injected [`BboSink`].
//!
//! # Design
//!
//! The pair map sits behind a `parking_lot::RwLock` and is only write-locked
//! to create or remove trackers. Each tracker has its own `Mutex`, so messages
//! for different pairs can be processed concurrently from separate tasks.
//! No lock is held while the sink is awaited.
//!
//! # Memory
//!
//! Trackers are created lazily and never removed on their own. A deployment
//! that sees pairs come and go should set
//! [`Config::with_idle_pair_ttl`] and call [`BboEngine::sweep_idle_pairs`]
//! periodically.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Error;
use crate::types::{now_ms, BboEvent, InboundMessage, OrderLevel, PairKey, TimestampMs};

use super::sink::BboSink;
use super::tracker::{PairTracker, TrackerStats};

type TrackerEntry = Arc<Mutex<PairTracker>>;

/// Derives a de-duplicated, change-only BBO stream from normalized messages.
///
/// # Ordering
///
/// For one pair, events reach the sink in the order of the messages that
/// caused them, as long as callers ingest a pair's messages one at a time
/// (which a single feed connection does naturally).
///
/// # Example
///
/// ```rust
/// use bbo_tracker::orderbook::{BboEngine, ChannelSink};
/// use bbo_tracker::types::{InboundMessage, NormalizedBboMessage};
/// use bbo_tracker::Config;
///
/// # async fn example() -> bbo_tracker::Result<()> {
/// let (sink, mut events) = ChannelSink::channel(1024);
/// let engine = BboEngine::new(Config::default(), sink);
///
/// let tick = NormalizedBboMessage {
///     exchange: "Binance".to_string(),
///     pair: "BTC_USDT".to_string(),
///     timestamp: 1_700_000_000_000,
///     bid_price: 42_000.0,
///     bid_quantity: 1.5,
///     ask_price: 42_000.5,
///     ask_quantity: 0.7,
/// };
/// engine.ingest(&InboundMessage::Bbo(tick)).await?;
///
/// let event = events.recv().await;
/// assert_eq!(event.map(|e| e.ask_price), Some(42_000.5));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BboEngine<S> {
    config: Config,
    sink: S,
    /// Trackers by pair
    trackers: RwLock<FxHashMap<PairKey, TrackerEntry>>,
}

impl<S: BboSink> BboEngine<S> {
    /// Create an engine emitting into `sink`
    pub fn new(config: Config, sink: S) -> Self {
        Self {
            config,
            sink,
            trackers: RwLock::new(FxHashMap::default()),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Process a message and deliver the resulting event, if any, to the sink
    ///
    /// Uses the wall clock for the staleness sweep.
    ///
    /// # Errors
    ///
    /// See [`BboEngine::ingest_at`].
    pub async fn ingest(&self, msg: &InboundMessage) -> Result<Option<BboEvent>, Error> {
        self.ingest_at(msg, now_ms()).await
    }

    /// Process a message at engine time `now_ms` and deliver the resulting
    /// event, if any, to the sink
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedInput`] if the message is rejected; no tracker
    ///   state is touched.
    /// - [`Error::Sink`] if the sink fails. The tracker has already recorded
    ///   the event as emitted, so the same quotes are not offered again.
    pub async fn ingest_at(
        &self,
        msg: &InboundMessage,
        now_ms: TimestampMs,
    ) -> Result<Option<BboEvent>, Error> {
        let event = self.process_at(msg, now_ms)?;
        if let Some(event) = &event {
            self.sink.emit(event.clone()).await.map_err(Error::Sink)?;
        }
        Ok(event)
    }

    /// Process a message without touching the sink
    ///
    /// Returns the event the sink would receive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedInput`] for unknown message kinds and for
    /// messages missing an exchange or pair.
    pub fn process_at(
        &self,
        msg: &InboundMessage,
        now_ms: TimestampMs,
    ) -> Result<Option<BboEvent>, Error> {
        let key = routing_key(msg)?;
        let entry = self.get_or_create(&key);
        let mut tracker = entry.lock();

        let event = match msg {
            InboundMessage::OrderBook(book) => tracker.on_order_book(book, now_ms),
            InboundMessage::Bbo(bbo) => tracker.on_bbo(bbo, now_ms),
            InboundMessage::Unsupported { .. } => None,
        };
        Ok(event)
    }

    /// Get or lazily create the tracker for `key`
    fn get_or_create(&self, key: &PairKey) -> TrackerEntry {
        if let Some(entry) = self.trackers.read().get(key) {
            return Arc::clone(entry);
        }

        let mut trackers = self.trackers.write();
        Arc::clone(trackers.entry(key.clone()).or_insert_with(|| {
            debug!(pair = %key, "Tracking new pair");
            Arc::new(Mutex::new(PairTracker::new(key.clone(), &self.config)))
        }))
    }

    fn with_tracker<T>(&self, key: &PairKey, f: impl FnOnce(&PairTracker) -> T) -> Option<T> {
        let entry = self.trackers.read().get(key).cloned()?;
        let tracker = entry.lock();
        Some(f(&tracker))
    }

    /// Best tracked ask for a pair
    pub fn best_ask(&self, key: &PairKey) -> Option<OrderLevel> {
        self.with_tracker(key, |t| t.best_ask().copied()).flatten()
    }

    /// Best tracked bid for a pair
    pub fn best_bid(&self, key: &PairKey) -> Option<OrderLevel> {
        self.with_tracker(key, |t| t.best_bid().copied()).flatten()
    }

    /// Last event emitted for a pair
    pub fn last_event(&self, key: &PairKey) -> Option<BboEvent> {
        self.with_tracker(key, |t| t.last_event().cloned()).flatten()
    }

    /// Counters for a pair
    pub fn stats(&self, key: &PairKey) -> Option<TrackerStats> {
        self.with_tracker(key, PairTracker::stats)
    }

    /// Get a copy of a pair's tracker for inspection
    pub fn get_tracker(&self, key: &PairKey) -> Option<PairTracker> {
        self.with_tracker(key, PairTracker::clone)
    }

    /// Stop tracking a pair. Returns `true` if it was tracked.
    pub fn remove_pair(&self, key: &PairKey) -> bool {
        self.trackers.write().remove(key).is_some()
    }

    /// Remove trackers whose pair saw no message for longer than the
    /// configured idle TTL
    ///
    /// Does nothing when no idle TTL is configured. Trackers held by an
    /// in-flight message are kept. Returns the number of removed pairs.
    pub fn sweep_idle_pairs(&self, now_ms: TimestampMs) -> usize {
        let Some(ttl) = self.config.idle_pair_ttl() else {
            return 0;
        };
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

        let mut trackers = self.trackers.write();
        let before = trackers.len();
        trackers.retain(|_, entry| {
            // A clone outside the map means a message is about to lock it
            Arc::strong_count(entry) > 1
                || entry
                    .try_lock()
                    .map_or(true, |t| now_ms.saturating_sub(t.last_seen_ms()) <= ttl_ms)
        });
        let removed = before - trackers.len();
        if removed > 0 {
            debug!(removed, remaining = trackers.len(), "Swept idle pairs");
        }
        removed
    }

    /// Drop every tracker
    pub fn clear(&self) {
        self.trackers.write().clear();
    }

    /// Number of tracked pairs
    pub fn len(&self) -> usize {
        self.trackers.read().len()
    }

    /// Check if no pair is tracked
    pub fn is_empty(&self) -> bool {
        self.trackers.read().is_empty()
    }

    /// All tracked pairs, sorted
    pub fn pairs(&self) -> Vec<PairKey> {
        let mut pairs: Vec<_> = self.trackers.read().keys().cloned().collect();
        pairs.sort();
        pairs
    }
}

/// Reject messages the engine cannot route, before any state is touched
fn routing_key(msg: &InboundMessage) -> Result<PairKey, Error> {
    let Some(key) = msg.pair_key() else {
        warn!(kind = msg.kind(), "Rejecting unsupported message");
        return Err(Error::UnsupportedInput(format!(
            "message type `{}`",
            msg.kind()
        )));
    };
    if key.exchange.is_empty() || key.pair.is_empty() {
        warn!(kind = msg.kind(), "Rejecting message without exchange or pair");
        return Err(Error::UnsupportedInput(
            "message without exchange or pair".to_string(),
        ));
    }
    Ok(key)
}
