//! gpush Client
//!
//! Registers with a gpush server under a client id and logs every
//! `/SayHello` command pushed to it. Reconnects with backoff when the
//! stream fails.

use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use gpush_client::PushClient;
use gpush_client::client::reconnect::run_with_reconnect;
use gpush_core::ReconnectPolicy;

#[derive(Parser, Debug)]
#[command(name = "gpush-client")]
#[command(version, about = "gpush client - receive commands pushed by a gpush server")]
struct Args {
    /// Server URL.
    #[arg(long, default_value = "http://127.0.0.1:50051", env = "GPUSH_SERVER_URL")]
    server_url: String,

    /// Client id to register under.
    #[arg(long, default_value = "12345", env = "GPUSH_CLIENT_ID")]
    client_id: String,

    /// Initial reconnect delay in milliseconds.
    #[arg(long, default_value_t = 1000, env = "GPUSH_RECONNECT_INITIAL_MS")]
    reconnect_initial_ms: u64,

    /// Maximum reconnect delay in seconds.
    #[arg(long, default_value_t = 60, env = "GPUSH_RECONNECT_MAX_SECS")]
    reconnect_max_secs: u64,

    /// Give up after this many consecutive failed attempts (unlimited if unset).
    #[arg(long, env = "GPUSH_RECONNECT_MAX_ATTEMPTS")]
    reconnect_max_attempts: Option<u32>,

    /// Log level filter (e.g. "info", "debug", "warn").
    #[arg(long, default_value = "info", env = "GPUSH_LOG_LEVEL")]
    log_level: String,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "GPUSH_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_filter = format!("gpush_client={}", args.log_level);
    gpush_core::tracing_init::init_tracing(&log_filter, args.log_json);

    let policy = ReconnectPolicy {
        initial_delay: Duration::from_millis(args.reconnect_initial_ms),
        max_delay: Duration::from_secs(args.reconnect_max_secs),
        max_attempts: args.reconnect_max_attempts,
        ..ReconnectPolicy::default()
    };
    policy.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        server_url = %args.server_url,
        client_id = %args.client_id,
        "Starting gpush-client"
    );

    let client = PushClient::builder()
        .register_cmd("/SayHello", |data: Vec<u8>| async move {
            info!(name = %String::from_utf8_lossy(&data), "SayHello");
        })?
        .build_lazy(args.server_url)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // Holding the sender keeps the client running until killed.
                warn!(error = %e, "Cannot listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        }
    });

    run_with_reconnect(&client, &args.client_id, &policy, shutdown_rx).await?;

    info!("Client stopped");
    Ok(())
}
