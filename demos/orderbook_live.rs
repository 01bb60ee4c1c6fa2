//! Live orderbook stream - keeps a local book in sync and prints it
//!
//! Usage:
//!   cargo run --example orderbook_live
//!
//! Optional:
//!   CRYPTOMARKET_SYMBOL=ETHBTC  # Symbol to follow (default: ETHBTC)
//!   RUST_LOG=cryptomarket=debug # More verbose logging

use cryptomarket::client::StreamEvent;
use cryptomarket::orderbook::{OrderBook, UpdateOutcome};
use cryptomarket::{Client, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cryptomarket=info".parse()?),
        )
        .init();

    let symbol = std::env::var("CRYPTOMARKET_SYMBOL").unwrap_or_else(|_| "ETHBTC".to_string());

    println!("=== CryptoMarket Orderbook Live ===\n");

    let client = Client::new(Config::public())?;

    let snapshot = client.rest().get_orderbook(&symbol, Some(5)).await?;
    println!(
        "REST snapshot: {} asks, {} bids (best ask {:?})\n",
        snapshot.ask.len(),
        snapshot.bid.len(),
        snapshot.ask.first().map(|l| l.price)
    );

    println!("Connecting to WebSocket...");
    let mut stream = client.market_data_stream().await?;
    println!("Connected!\n");

    stream.subscribe_orderbook(&symbol).await?;
    stream.subscribe_trades(&symbol, Some(5)).await?;
    let books = stream.books();

    println!("=== Streaming Live Data ===");
    println!("(Press Ctrl+C to stop)\n");

    let mut message_count = 0u64;
    let start_time = std::time::Instant::now();

    while let Some(event) = stream.next().await {
        match event {
            Ok(event) => {
                message_count += 1;

                match event {
                    StreamEvent::Book(event) => match event.outcome {
                        UpdateOutcome::Replaced | UpdateOutcome::Applied => {
                            if let Some(book) = books.get_orderbook(&event.key) {
                                println!(
                                    "[{:?}] {} | seq: {}",
                                    event.outcome, event.symbol, book.sequence
                                );
                                print_book_summary(&book);
                            }
                        }
                        UpdateOutcome::Broken { expected, received } => {
                            println!(
                                "[GAP] {} | expected {} got {}, waiting for snapshot",
                                event.symbol, expected, received
                            );
                        }
                        UpdateOutcome::Ignored => {}
                    },

                    StreamEvent::Trades { symbol, data, .. } => {
                        for trade in data {
                            println!(
                                "[TRADE] {} | {} @ {} | {:?}",
                                symbol, trade.quantity, trade.price, trade.side
                            );
                        }
                    }

                    StreamEvent::Response { id, result: Err(err) } => {
                        println!("[ERROR] request {:?}: {}", id, err);
                    }

                    _ => {}
                }

                // Print stats every 50 messages
                if message_count % 50 == 0 {
                    let elapsed = start_time.elapsed().as_secs_f64();
                    println!(
                        "\n--- {} messages in {:.1}s ({:.1} msg/s) ---\n",
                        message_count,
                        elapsed,
                        message_count as f64 / elapsed
                    );
                }
            }
            Err(e) => {
                println!("[ERROR] WebSocket error: {}", e);
            }
        }
    }

    println!("\nWebSocket closed");
    Ok(())
}

fn print_book_summary(book: &OrderBook) {
    let (asks, bids) = book.depth();
    match (book.best_bid(), book.best_ask()) {
        (Some(bid), Some(ask)) => println!(
            "         BID: {} @ {} | ASK: {} @ {} | spread: {} | depth: {}/{}",
            bid.size,
            bid.price,
            ask.size,
            ask.price,
            ask.price - bid.price,
            bids,
            asks
        ),
        _ => println!("         one side empty | depth: {}/{}", bids, asks),
    }
}
