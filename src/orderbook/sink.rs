//! Output sinks for emitted BBO events.
//!
//! The engine hands every emitted [`BboEvent`] to exactly one [`BboSink`] call
//! and awaits it, so a slow sink applies backpressure to ingestion and a
//! failing sink surfaces as [`Error::Sink`](crate::Error::Sink).

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc;
use tracing::info;

use crate::error::SinkError;
use crate::types::BboEvent;

/// Consumer of emitted BBO events
pub trait BboSink: Send + Sync {
    /// Deliver one event
    fn emit(&self, event: BboEvent) -> BoxFuture<'_, Result<(), SinkError>>;
}

impl<S: BboSink + ?Sized> BboSink for Arc<S> {
    fn emit(&self, event: BboEvent) -> BoxFuture<'_, Result<(), SinkError>> {
        (**self).emit(event)
    }
}

impl<S: BboSink + ?Sized> BboSink for Box<S> {
    fn emit(&self, event: BboEvent) -> BoxFuture<'_, Result<(), SinkError>> {
        (**self).emit(event)
    }
}

/// Sink backed by an async function, see [`sink_fn`]
#[derive(Debug, Clone)]
pub struct FnSink<F> {
    f: F,
}

/// Build a sink from an async closure
///
/// # Example
///
/// ```rust
/// use bbo_tracker::orderbook::sink_fn;
///
/// let sink = sink_fn(|event| async move {
///     println!("{} {} / {}", event.pair, event.bid_price, event.ask_price);
///     Ok::<(), bbo_tracker::SinkError>(())
/// });
/// ```
pub fn sink_fn<F, Fut>(f: F) -> FnSink<F>
where
    F: Fn(BboEvent) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), SinkError>> + Send + 'static,
{
    FnSink { f }
}

impl<F, Fut> BboSink for FnSink<F>
where
    F: Fn(BboEvent) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), SinkError>> + Send + 'static,
{
    fn emit(&self, event: BboEvent) -> BoxFuture<'_, Result<(), SinkError>> {
        (self.f)(event).boxed()
    }
}

/// Forwards events into a bounded tokio channel.
///
/// A full channel makes ingestion wait; a closed channel is a sink failure.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<BboEvent>,
}

impl ChannelSink {
    /// Wrap an existing sender
    pub fn new(tx: mpsc::Sender<BboEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving end of its channel
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<BboEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

impl BboSink for ChannelSink {
    fn emit(&self, event: BboEvent) -> BoxFuture<'_, Result<(), SinkError>> {
        async move {
            self.tx
                .send(event)
                .await
                .map_err(|e| Box::new(e) as SinkError)
        }
        .boxed()
    }
}

/// Logs every event at `info` level and never fails
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl BboSink for LogSink {
    fn emit(&self, event: BboEvent) -> BoxFuture<'_, Result<(), SinkError>> {
        info!(
            exchange = %event.exchange,
            pair = %event.pair,
            timestamp = event.timestamp,
            bid = event.bid_price,
            bid_qty = event.bid_quantity,
            ask = event.ask_price,
            ask_qty = event.ask_quantity,
            "BBO"
        );
        futures_util::future::ready(Ok(())).boxed()
    }
}
