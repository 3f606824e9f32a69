// Fetch one URL through a request publisher
// Usage: cargo run --example fetch [url]
// Example: RUST_LOG=unicall_core=debug cargo run --example fetch https://httpbin.org/get

use std::env;

use bytes::Bytes;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;
use unicall_core::{ApiFactory, Completion, Sink};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let url = args.get(1).map(|s| s.as_str()).unwrap_or("https://httpbin.org/get");

    let factory = ApiFactory::with_default_config()?;
    let publisher = factory.get(url)?;

    // Sink requests demand on attach; completion tells us when to stop
    let (done_tx, done_rx) = oneshot::channel();
    let _subscription = publisher.subscribe(Sink::new(
        |body: Bytes| println!("{}", String::from_utf8_lossy(&body)),
        move |completion: Completion| {
            let _ = done_tx.send(completion);
        },
    ));

    match done_rx.await? {
        Completion::Finished => Ok(()),
        Completion::Failed(error) => Err(error.into()),
    }
}
