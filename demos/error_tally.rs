//! Broadcaster demo with per-subscriber error tally
//!
//! Run with: cargo run --example error_tally [SUBSCRIBERS] [MESSAGES]
//!
//! Registers a few draining subscribers, broadcasts a burst of messages, stops
//! the broadcaster and prints how many messages each subscriber received along
//! with the reasons any deliveries failed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use fanout::{Broadcaster, BroadcasterConfig, Inbox};

type Tally = Arc<Mutex<HashMap<String, HashMap<&'static str, u64>>>>;

async fn drain(id: String, mut inbox: Inbox) -> (String, u64) {
    let mut received = 0;
    while inbox.recv().await.is_some() {
        received += 1;
    }
    (id, received)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let subscribers: usize = args.get(1).map(|s| s.parse()).transpose()?.unwrap_or(3);
    let messages: usize = args.get(2).map(|s| s.parse()).transpose()?.unwrap_or(10_000);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fanout=info".parse()?)
                .add_directive("error_tally=info".parse()?),
        )
        .init();

    let config = BroadcasterConfig::default()
        .default_timeout(Duration::from_secs(60))
        .error_capacity(1024);
    let (broadcaster, mut errors) = Broadcaster::new(config);

    // Start draining errors before anything can fail
    let tally: Tally = Arc::new(Mutex::new(HashMap::new()));
    let error_task = {
        let tally = Arc::clone(&tally);
        tokio::spawn(async move {
            while let Some(err) = errors.recv().await {
                let mut tally = tally.lock().await;
                *tally
                    .entry(err.subscriber_id().to_string())
                    .or_default()
                    .entry(err.as_label())
                    .or_default() += 1;
            }
        })
    };

    let mut consumers = Vec::with_capacity(subscribers);
    for i in 0..subscribers {
        let id = i.to_string();
        let inbox = broadcaster.subscribe(id.clone()).await?;
        consumers.push(tokio::spawn(drain(id, inbox)));
    }

    for i in 0..messages {
        broadcaster.broadcast((i as u64).to_be_bytes().to_vec()).await;
    }

    // Let in-flight deliveries land before stopping, otherwise they are
    // reported as shutdown errors
    tokio::time::sleep(Duration::from_secs(1)).await;
    println!("Stopping broadcaster");
    broadcaster.stop().await;

    for consumer in consumers {
        let (id, received) = consumer.await?;
        println!("Subscriber {}: received {} messages", id, received);
    }

    // Give the error stream a moment to settle; it never closes on its own
    tokio::time::sleep(Duration::from_millis(100)).await;
    error_task.abort();

    let stats = broadcaster.stats();
    println!(
        "Stats: delivered={} deadline={} shutdown={} unknown={}",
        stats.delivered, stats.deadline_exceeded, stats.shutting_down, stats.unknown_subscriber
    );

    let tally = tally.lock().await;
    if tally.is_empty() {
        println!("No errors");
    }
    for (id, reasons) in tally.iter() {
        for (reason, count) in reasons {
            println!("  [{}] {}: {}", id, reason, count);
        }
    }

    Ok(())
}
