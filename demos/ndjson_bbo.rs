//! NDJSON replay - turns normalized market data into a BBO stream
//!
//! Reads one normalized message per line from stdin and prints every emitted
//! BBO event as a JSON line on stdout. Logs go to stderr.
//!
//! Usage:
//!   cat capture.ndjson | cargo run --example ndjson_bbo
//!
//! Optional:
//!   RUST_LOG=bbo_tracker=debug   # Show tracker decisions
//!   BBO_MAX_LEVELS=10            # Levels tracked per side
//!   BBO_STALE_SECS=1800          # Top-of-book staleness limit
//!   BBO_WALL_CLOCK=1             # Use wall-clock time instead of message time
//!
//! Input lines look like:
//!
//! ```text
//! {"type":"order_book","exchange":"Bitstamp","pair":"BTC_USD","timestamp":1700000000000,"full":true,"asks":[{"price":101.0,"quantity":1.0}],"bids":[{"price":100.0,"quantity":2.0}]}
//! {"type":"bbo","exchange":"Binance","pair":"BTC_USDT","timestamp":1700000000050,"bidPrice":100.1,"bidQuantity":1.0,"askPrice":100.2,"askQuantity":3.0}
//! ```

use std::time::{Duration, Instant};

use bbo_tracker::orderbook::{sink_fn, BboEngine};
use bbo_tracker::types::{now_ms, InboundMessage};
use bbo_tracker::{BboEvent, Config, Error, SinkError};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bbo_tracker=info".parse()?),
        )
        .init();

    let mut config = Config::new();
    if let Ok(levels) = std::env::var("BBO_MAX_LEVELS") {
        config = config.with_max_levels(levels.parse()?);
    }
    if let Ok(secs) = std::env::var("BBO_STALE_SECS") {
        config = config.with_stale_after(Duration::from_secs(secs.parse()?));
    }
    let wall_clock = std::env::var("BBO_WALL_CLOCK").is_ok_and(|v| v == "1");

    let sink = sink_fn(|event: BboEvent| async move {
        println!("{}", serde_json::to_string(&event)?);
        Ok::<(), SinkError>(())
    });
    let engine = BboEngine::new(config, sink);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut message_count = 0u64;
    let mut event_count = 0u64;
    let mut rejected = 0u64;
    let start_time = Instant::now();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        message_count += 1;

        let msg = match InboundMessage::from_json(&line) {
            Ok(msg) => msg,
            Err(e) => {
                eprintln!("[SKIP] line {}: {}", message_count, e);
                rejected += 1;
                continue;
            }
        };

        // Replays default to message time so captures stay deterministic
        let now = match &msg {
            _ if wall_clock => now_ms(),
            InboundMessage::OrderBook(book) => book.timestamp,
            InboundMessage::Bbo(bbo) => bbo.timestamp,
            InboundMessage::Unsupported { .. } => now_ms(),
        };

        match engine.ingest_at(&msg, now).await {
            Ok(Some(_)) => event_count += 1,
            Ok(None) => {}
            Err(e @ Error::UnsupportedInput(_)) => {
                eprintln!("[SKIP] line {}: {}", message_count, e);
                rejected += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let elapsed = start_time.elapsed().as_secs_f64();
    eprintln!(
        "\n--- {} messages, {} events, {} rejected, {} pairs in {:.2}s ---",
        message_count,
        event_count,
        rejected,
        engine.len(),
        elapsed
    );

    for key in engine.pairs() {
        if let Some(stats) = engine.stats(&key) {
            eprintln!(
                "{:<24} messages: {:>6} emitted: {:>6} suppressed: {:>6} skipped: {:>4} stale: {:>4}",
                key.to_string(),
                stats.messages,
                stats.emitted,
                stats.suppressed,
                stats.skipped_items,
                stats.stale_evictions
            );
        }
    }

    Ok(())
}
