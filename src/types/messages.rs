//! Normalized feed messages and emitted BBO events.
//!
//! Feed adapters translate exchange-specific frames into the messages here.
//! Field names follow the adapters' camelCase JSON convention.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::level::{OrderLevel, Side};
use super::{Price, Quantity, TimestampMs};
use crate::error::Error;

/// Identity of a tracked book: one exchange, one normalized pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    /// Exchange name (e.g. `Binance`)
    pub exchange: String,
    /// Normalized pair name (e.g. `BTC_USDT`)
    pub pair: String,
}

impl PairKey {
    /// Create a new pair key
    pub fn new(exchange: impl Into<String>, pair: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            pair: pair.into(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.exchange, self.pair)
    }
}

/// One `[price, quantity]` entry of an order book message
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Level price
    pub price: Price,
    /// Quantity at the level (0 deletes it)
    pub quantity: Quantity,
}

impl OrderItem {
    /// Create a new order item
    pub const fn new(price: Price, quantity: Quantity) -> Self {
        Self { price, quantity }
    }
}

/// Order book message: either a full snapshot or an incremental delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedOrderBookMessage {
    /// Exchange name
    pub exchange: String,
    /// Normalized pair name
    pub pair: String,
    /// Message time (Unix ms), applied to every item
    #[serde(default)]
    pub timestamp: TimestampMs,
    /// Ask levels, best first
    #[serde(default)]
    pub asks: Vec<OrderItem>,
    /// Bid levels, best first
    #[serde(default)]
    pub bids: Vec<OrderItem>,
    /// `true` for an authoritative snapshot, `false` for a delta
    #[serde(default)]
    pub full: bool,
}

impl NormalizedOrderBookMessage {
    /// Items for one side
    pub fn items(&self, side: Side) -> &[OrderItem] {
        match side {
            Side::Ask => &self.asks,
            Side::Bid => &self.bids,
        }
    }

    /// Levels for one side, stamped with the message timestamp
    pub fn levels(&self, side: Side) -> impl Iterator<Item = OrderLevel> + '_ {
        let timestamp = self.timestamp;
        self.items(side)
            .iter()
            .map(move |item| OrderLevel::new(item.price, item.quantity, timestamp))
    }
}

/// Native top-of-book tick. Always authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedBboMessage {
    /// Exchange name
    pub exchange: String,
    /// Normalized pair name
    pub pair: String,
    /// Tick time (Unix ms)
    #[serde(default)]
    pub timestamp: TimestampMs,
    /// Best bid price
    pub bid_price: Price,
    /// Quantity at the best bid
    pub bid_quantity: Quantity,
    /// Best ask price
    pub ask_price: Price,
    /// Quantity at the best ask
    pub ask_quantity: Quantity,
}

impl NormalizedBboMessage {
    /// The tick's level for one side
    pub fn level(&self, side: Side) -> OrderLevel {
        match side {
            Side::Ask => OrderLevel::new(self.ask_price, self.ask_quantity, self.timestamp),
            Side::Bid => OrderLevel::new(self.bid_price, self.bid_quantity, self.timestamp),
        }
    }
}

/// Any message a feed adapter can hand to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Order book snapshot or delta
    OrderBook(NormalizedOrderBookMessage),
    /// Native top-of-book tick
    Bbo(NormalizedBboMessage),
    /// A channel the engine does not process (trades, tickers, ...)
    Unsupported {
        /// The message type as sent by the adapter
        kind: String,
    },
}

impl InboundMessage {
    /// Decode a JSON-encoded normalized message
    ///
    /// Unknown `type` tags decode to [`InboundMessage::Unsupported`] rather than
    /// failing, so the engine can reject them with a typed error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the text is not valid JSON or a known message
    /// type has missing fields, and [`Error::UnsupportedInput`] if the `type`
    /// tag is absent.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| Error::UnsupportedInput("message has no type".to_string()))?;

        match kind {
            "order_book" | "bbo" => Ok(serde_json::from_value(value)?),
            other => Ok(InboundMessage::Unsupported {
                kind: other.to_string(),
            }),
        }
    }

    /// The message type tag
    pub fn kind(&self) -> &str {
        match self {
            InboundMessage::OrderBook(_) => "order_book",
            InboundMessage::Bbo(_) => "bbo",
            InboundMessage::Unsupported { kind } => kind.as_str(),
        }
    }

    /// Exchange and pair addressed by the message, if it is a supported kind
    pub fn pair_key(&self) -> Option<PairKey> {
        match self {
            InboundMessage::OrderBook(m) => Some(PairKey::new(&m.exchange, &m.pair)),
            InboundMessage::Bbo(m) => Some(PairKey::new(&m.exchange, &m.pair)),
            InboundMessage::Unsupported { .. } => None,
        }
    }

    /// Whether the message carries ground truth for the top of book
    pub fn is_authoritative(&self) -> bool {
        match self {
            InboundMessage::OrderBook(m) => m.full,
            InboundMessage::Bbo(_) => true,
            InboundMessage::Unsupported { .. } => false,
        }
    }
}

impl From<NormalizedOrderBookMessage> for InboundMessage {
    fn from(msg: NormalizedOrderBookMessage) -> Self {
        InboundMessage::OrderBook(msg)
    }
}

impl From<NormalizedBboMessage> for InboundMessage {
    fn from(msg: NormalizedBboMessage) -> Self {
        InboundMessage::Bbo(msg)
    }
}

/// Best bid and offer for one pair, emitted only when it changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BboEvent {
    /// Exchange name
    pub exchange: String,
    /// Normalized pair name
    pub pair: String,
    /// Latest timestamp of the two reported levels (Unix ms)
    pub timestamp: TimestampMs,
    /// Best bid price
    pub bid_price: Price,
    /// Quantity at the best bid
    pub bid_quantity: Quantity,
    /// Best ask price
    pub ask_price: Price,
    /// Quantity at the best ask
    pub ask_quantity: Quantity,
}

impl BboEvent {
    /// Build an event from the reported ask and bid levels
    pub fn from_levels(key: &PairKey, ask: &OrderLevel, bid: &OrderLevel) -> Self {
        Self {
            exchange: key.exchange.clone(),
            pair: key.pair.clone(),
            timestamp: ask.timestamp.max(bid.timestamp),
            bid_price: bid.price,
            bid_quantity: bid.quantity,
            ask_price: ask.price,
            ask_quantity: ask.quantity,
        }
    }

    /// Compare the four price/quantity fields, ignoring identity and time
    pub fn same_quotes(&self, other: &BboEvent) -> bool {
        self.bid_price == other.bid_price
            && self.bid_quantity == other.bid_quantity
            && self.ask_price == other.ask_price
            && self.ask_quantity == other.ask_quantity
    }

    /// The pair this event belongs to
    pub fn key(&self) -> PairKey {
        PairKey::new(&self.exchange, &self.pair)
    }

    /// Ask minus bid
    pub fn spread(&self) -> Price {
        self.ask_price - self.bid_price
    }

    /// Midpoint of bid and ask
    pub fn mid_price(&self) -> Price {
        (self.ask_price + self.bid_price) / 2.0
    }
}
