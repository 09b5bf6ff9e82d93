//! Channel monitor example
//!
//! Connects to a backend, logs every lifecycle event, prints inbound
//! `spectrum` frames and polls the backend status with correlated requests.
//!
//! Run with: cargo run --example monitor -- ws://localhost:5001
//!
//! Without an argument the address comes from `TETHER_ADDRESS` (default
//! `ws://localhost:5001`). When `OTEL_EXPORTER_OTLP_ENDPOINT` is set, traces
//! and metrics are exported there and flushed before exit; otherwise logs go
//! to the console only.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tether::{ChannelClient, ClientBuilder, ClientConfig, EventName};

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    state: String,
    #[serde(default)]
    sample_rate: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let export = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok();
    if !export {
        tether::init_logging("info")?;
    }

    let mut config = ClientConfig::from_env()?;
    if let Some(address) = std::env::args().nth(1) {
        config.address = address;
    }

    let mut builder =
        ClientBuilder::from_config(config).with_request_timeout(Duration::from_secs(3));
    if export {
        builder = builder
            .with_default_observability()
            .service_name("tether-monitor");
    }
    let client = builder.build()?;

    for name in EventName::lifecycle() {
        client
            .subscribe(name, |event| async move {
                println!("[{}] {}", event.name(), event.to_json());
            })
            .await;
    }

    client
        .on_message("spectrum", |message| async move {
            let bins = message
                .get("bins")
                .and_then(|b| b.as_array())
                .map(|b| b.len())
                .unwrap_or(0);
            println!("spectrum frame: {} bins at {}", bins, message.timestamp());
        })
        .await;

    client.connect().await;

    for _ in 0..10 {
        tokio::time::sleep(Duration::from_secs(2)).await;
        poll_status(&client).await;
    }

    println!("\n{}", serde_json::to_string_pretty(&client.debug_info().await)?);
    client.close().await;
    tether::shutdown_observability();
    Ok(())
}

async fn poll_status(client: &ChannelClient) {
    match client.request("get_status", json!({"verbose": false})).await {
        Ok(response) => match response.deserialize::<Status>() {
            Ok(status) => println!(
                "status: {} (sample rate {:?})",
                status.state, status.sample_rate
            ),
            Err(e) => println!("unexpected status payload: {}", e),
        },
        Err(e) => println!("status request failed: {}", e),
    }
}
