//! End-to-end scenarios through the public engine API.
//!
//! Every test drives a [`BboEngine`] with normalized messages and observes
//! what reaches the sink.
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=bbo_tracker=debug cargo test --test engine_scenarios -- --nocapture
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bbo_tracker::orderbook::{sink_fn, BboEngine, ChannelSink};
use bbo_tracker::types::{
    InboundMessage, NormalizedBboMessage, NormalizedOrderBookMessage, OrderItem, PairKey, Side,
    TimestampMs,
};
use bbo_tracker::{BboEvent, Config, Error, SinkError};
use tokio::sync::mpsc;

const T: TimestampMs = 1_575_961_821_882;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn key() -> PairKey {
    PairKey::new("Bitstamp", "BTC_USD")
}

fn book(
    timestamp: TimestampMs,
    asks: &[(f64, f64)],
    bids: &[(f64, f64)],
    full: bool,
) -> InboundMessage {
    let items = |levels: &[(f64, f64)]| {
        levels
            .iter()
            .map(|&(p, q)| OrderItem::new(p, q))
            .collect::<Vec<_>>()
    };
    InboundMessage::OrderBook(NormalizedOrderBookMessage {
        exchange: "Bitstamp".to_string(),
        pair: "BTC_USD".to_string(),
        timestamp,
        asks: items(asks),
        bids: items(bids),
        full,
    })
}

fn tick(timestamp: TimestampMs, bid: (f64, f64), ask: (f64, f64)) -> InboundMessage {
    InboundMessage::Bbo(NormalizedBboMessage {
        exchange: "Bitstamp".to_string(),
        pair: "BTC_USD".to_string(),
        timestamp,
        bid_price: bid.0,
        bid_quantity: bid.1,
        ask_price: ask.0,
        ask_quantity: ask.1,
    })
}

fn channel_engine() -> (BboEngine<ChannelSink>, mpsc::Receiver<BboEvent>) {
    init_tracing();
    let (sink, rx) = ChannelSink::channel(64);
    (BboEngine::new(Config::default(), sink), rx)
}

fn drain(rx: &mut mpsc::Receiver<BboEvent>) -> Vec<BboEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_first_ask_on_empty_side_is_emitted() {
    let (engine, mut rx) = channel_engine();
    engine.ingest_at(&book(T, &[], &[(99.0, 2.0)], false), T).await.unwrap();
    assert!(drain(&mut rx).is_empty(), "one side only, nothing to report");

    engine
        .ingest_at(&book(T + 1, &[(100.0, 1.0)], &[], false), T + 1)
        .await
        .unwrap();

    let ask = engine.best_ask(&key()).unwrap();
    assert_eq!((ask.price, ask.quantity, ask.timestamp), (100.0, 1.0, T + 1));

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].ask_price, 100.0);
    assert_eq!(events[0].ask_quantity, 1.0);
}

#[tokio::test]
async fn test_redelivered_bid_is_a_duplicate() {
    let (engine, mut rx) = channel_engine();
    engine
        .ingest_at(&book(T, &[(101.0, 1.0)], &[(100.0, 1.0)], false), T)
        .await
        .unwrap();
    assert_eq!(drain(&mut rx).len(), 1);

    let result = engine
        .ingest_at(&book(T + 10, &[], &[(100.0, 1.0)], false), T + 10)
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(drain(&mut rx).is_empty());
    assert_eq!(engine.best_bid(&key()).map(|l| l.timestamp), Some(T));
}

#[tokio::test]
async fn test_authoritative_update_replaces_top() {
    let (engine, mut rx) = channel_engine();
    engine
        .ingest_at(&book(T, &[(100.0, 1.0)], &[(98.0, 1.0)], true), T)
        .await
        .unwrap();

    engine
        .ingest_at(&book(T + 2, &[(99.0, 2.0)], &[(98.0, 1.0)], true), T + 2)
        .await
        .unwrap();

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].ask_price, 99.0);
    assert_eq!(events[1].ask_quantity, 2.0);
    assert_eq!(events[1].timestamp, T + 2);
}

#[tokio::test]
async fn test_worse_candidate_on_full_side_is_discarded() {
    let (engine, mut rx) = channel_engine();
    let bids: Vec<_> = (0..10).map(|i| (100.0 - f64::from(i), 1.0)).collect();
    engine
        .ingest_at(&book(T, &[(101.0, 1.0)], &bids, false), T)
        .await
        .unwrap();
    drain(&mut rx);

    engine
        .ingest_at(&book(T + 1, &[], &[(50.0, 3.0)], false), T + 1)
        .await
        .unwrap();

    let tracker = engine.get_tracker(&key()).unwrap();
    assert_eq!(tracker.queue(Side::Bid).len(), 10);
    assert!(tracker.queue(Side::Bid).find(50.0).is_none());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_non_top_change_updates_silently() {
    let (engine, mut rx) = channel_engine();
    engine
        .ingest_at(
            &book(T, &[(101.0, 1.0), (102.0, 1.0), (103.0, 1.0)], &[(100.0, 1.0)], false),
            T,
        )
        .await
        .unwrap();
    drain(&mut rx);

    engine
        .ingest_at(&book(T + 1, &[(103.0, 9.0)], &[], false), T + 1)
        .await
        .unwrap();

    assert!(drain(&mut rx).is_empty());
    let tracker = engine.get_tracker(&key()).unwrap();
    assert_eq!(tracker.queue(Side::Ask).find(103.0).map(|l| l.quantity), Some(9.0));
}

#[tokio::test]
async fn test_identical_snapshots_emit_once() {
    let (engine, mut rx) = channel_engine();
    let snapshot = book(T, &[(101.0, 1.0), (102.0, 5.0)], &[(100.0, 2.0)], true);

    engine.ingest_at(&snapshot, T).await.unwrap();
    engine.ingest_at(&snapshot, T + 1_000).await.unwrap();

    assert_eq!(drain(&mut rx).len(), 1);
    let stats = engine.stats(&key()).unwrap();
    assert_eq!(stats.emitted, 1);
    assert_eq!(stats.suppressed, 1);
}

#[tokio::test]
async fn test_batch_coalesces_into_one_event() {
    let (engine, mut rx) = channel_engine();
    engine
        .ingest_at(&book(T, &[(105.0, 1.0)], &[(95.0, 1.0)], false), T)
        .await
        .unwrap();
    drain(&mut rx);

    // One frame tightening both sides through several levels
    engine
        .ingest_at(
            &book(
                T + 1,
                &[(104.0, 1.0), (103.0, 1.0), (102.0, 2.0)],
                &[(96.0, 1.0), (97.0, 1.0), (98.0, 3.0)],
                false,
            ),
            T + 1,
        )
        .await
        .unwrap();

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!((events[0].bid_price, events[0].ask_price), (98.0, 102.0));
    assert_eq!((events[0].bid_quantity, events[0].ask_quantity), (3.0, 2.0));
}

#[tokio::test]
async fn test_native_ticks_and_snapshots_mix() {
    let (engine, mut rx) = channel_engine();
    engine
        .ingest_at(&tick(T, (100.0, 1.0), (101.0, 1.0)), T)
        .await
        .unwrap();
    // Same quotes, later time: nothing new
    engine
        .ingest_at(&tick(T + 1, (100.0, 1.0), (101.0, 1.0)), T + 1)
        .await
        .unwrap();
    engine
        .ingest_at(&book(T + 2, &[(100.5, 4.0)], &[(100.0, 1.0)], true), T + 2)
        .await
        .unwrap();

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].ask_price, 100.5);
    assert_eq!(events[1].ask_quantity, 4.0);
}

#[tokio::test]
async fn test_snapshot_overrides_levels_from_deltas() {
    let (engine, mut rx) = channel_engine();
    engine
        .ingest_at(
            &book(T, &[(100.0, 1.0), (101.0, 1.0), (102.0, 1.0)], &[(99.0, 1.0)], false),
            T,
        )
        .await
        .unwrap();
    drain(&mut rx);

    engine
        .ingest_at(&book(T + 1, &[(103.0, 2.0)], &[(99.0, 1.0)], true), T + 1)
        .await
        .unwrap();

    let ask = engine.best_ask(&key()).unwrap();
    assert_eq!((ask.price, ask.quantity), (103.0, 2.0));
    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].ask_price, 103.0);
}

#[tokio::test]
async fn test_invalid_items_do_not_abort_message() {
    let (engine, mut rx) = channel_engine();
    let result = engine
        .ingest_at(
            &book(T, &[(-1.0, 1.0), (101.0, 1.0)], &[(100.0, f64::NAN), (100.0, 1.0)], false),
            T,
        )
        .await
        .unwrap();

    assert!(result.is_some());
    assert_eq!(drain(&mut rx).len(), 1);
    assert_eq!(engine.stats(&key()).map(|s| s.skipped_items), Some(2));
}

#[tokio::test]
async fn test_unsupported_message_touches_nothing() {
    let (engine, mut rx) = channel_engine();
    let msg =
        InboundMessage::from_json(r#"{"type":"trade","exchange":"Bitstamp","pair":"BTC_USD"}"#)
            .unwrap();

    let err = engine.ingest_at(&msg, T).await.unwrap_err();

    assert!(matches!(err, Error::UnsupportedInput(_)));
    assert!(engine.is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_sink_failure_propagates() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let sink = sink_fn(move |_event: BboEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(SinkError::from("downstream unavailable")) }
    });
    let engine = BboEngine::new(Config::default(), sink);

    let err = engine
        .ingest_at(&tick(T, (100.0, 1.0), (101.0, 1.0)), T)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Sink(_)));
    assert!(err.to_string().contains("downstream unavailable"));
    // The undelivered event stays readable for a retrying caller
    assert_eq!(engine.last_event(&key()).map(|e| e.ask_price), Some(101.0));

    // A message that changes nothing never reaches the sink
    engine
        .ingest_at(&tick(T + 1, (100.0, 1.0), (101.0, 1.0)), T + 1)
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pairs_processed_concurrently() {
    init_tracing();
    let (sink, mut rx) = ChannelSink::channel(1024);
    let engine = Arc::new(BboEngine::new(Config::default(), sink));

    let mut handles = Vec::new();
    for pair in ["BTC_USD", "ETH_USD", "SOL_USD", "XRP_USD"] {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            for i in 0..50 {
                let msg = InboundMessage::Bbo(NormalizedBboMessage {
                    exchange: "Kraken".to_string(),
                    pair: pair.to_string(),
                    timestamp: T + i,
                    bid_price: 100.0 + i as f64,
                    bid_quantity: 1.0,
                    ask_price: 101.0 + i as f64,
                    ask_quantity: 1.0,
                });
                engine.ingest_at(&msg, T + i).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let events = drain(&mut rx);
    assert_eq!(events.len(), 200);
    assert_eq!(engine.len(), 4);

    // Per pair, events arrive in message order
    for pair in ["BTC_USD", "ETH_USD", "SOL_USD", "XRP_USD"] {
        let bids: Vec<_> = events
            .iter()
            .filter(|e| e.pair == pair)
            .map(|e| e.bid_price)
            .collect();
        assert_eq!(bids.len(), 50);
        assert!(bids.windows(2).all(|w| w[0] < w[1]), "{pair} out of order");
    }
}
