//! Demo client: query the daemon version, list security associations, and
//! watch SA lifecycle events for a short while.
//!
//! Usage: `cargo run --example monitor_sas [socket-path]`

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use vici_client::config::DEFAULT_SOCKET_PATH;
use vici_client::Client;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let socket_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SOCKET_PATH.to_string());

    let client = Client::connect(&socket_path).await?;

    let version = client.version().await?;
    println!(
        "connected to {} {} on {} {}",
        version.daemon, version.version, version.sysname, version.machine
    );

    let sas = client.list_sas("", "").await?;
    if sas.is_empty() {
        println!("no established SAs");
    }
    for entry in &sas {
        for (name, sa) in entry {
            println!(
                "{name}: {} {} -> {} ({} child SAs)",
                sa.state,
                sa.local_host,
                sa.remote_host,
                sa.child_sas.len()
            );
        }
    }

    println!("watching SA events for 30s...");
    client
        .monitor_sa(
            |event, body| println!("event {event}:\n{body}"),
            Duration::from_secs(30),
        )
        .await?;

    client.close();
    Ok(())
}
