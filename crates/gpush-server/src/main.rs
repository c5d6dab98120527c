//! gpush Server
//!
//! Serves the `MessageService` push stream and lets an operator push
//! commands to registered clients from stdin, one `<id> <api> <data>` per line.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tonic::transport::Server;
use tracing::{info, warn};

use gpush_proto::v1::message_service_server::MessageServiceServer;
use gpush_server::{HookError, MessageServiceImpl, PresenceHooks, PushServer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "gpush-server")]
#[command(version, about = "gpush server - push named commands to registered clients")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:50051", env = "GPUSH_ADDR")]
    addr: SocketAddr,

    /// Per-client outbound queue length.
    #[arg(long, default_value_t = gpush_server::config::DEFAULT_OUTBOUND_CAPACITY, env = "GPUSH_OUTBOUND_CAPACITY")]
    outbound_capacity: usize,

    /// Log level filter (e.g. "info", "debug", "warn").
    #[arg(long, default_value = "info", env = "GPUSH_LOG_LEVEL")]
    log_level: String,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "GPUSH_LOG_JSON")]
    log_json: bool,

    /// Do not read push commands from stdin.
    #[arg(long)]
    no_console: bool,
}

/// Logs presence changes and accepts every client.
struct LoggingHooks;

impl PresenceHooks for LoggingHooks {
    fn online(&self, client_id: &str, data: &[u8]) -> Result<(), HookError> {
        info!(
            client_id = %client_id,
            apis = %String::from_utf8_lossy(data),
            "online"
        );
        Ok(())
    }

    fn offline(&self, client_id: &str) {
        info!(client_id = %client_id, "offline");
    }
}

/// Split a console line into `(id, api, data)`; the data part keeps its spaces.
fn parse_command(line: &str) -> Option<(&str, &str, &str)> {
    let mut parts = line.splitn(3, ' ');
    let id = parts.next().filter(|s| !s.is_empty())?;
    let api = parts.next().filter(|s| !s.is_empty())?;
    let data = parts.next()?;
    Some((id, api, data))
}

/// Read push commands from stdin until EOF.
async fn run_console(server: Arc<PushServer>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some((id, api, data)) = parse_command(line.trim_end()) else {
                    warn!(line = %line, "Expected `<id> <api> <data>`");
                    continue;
                };
                let delivered = server.send_cmd(id, api, data.as_bytes().to_vec()).await;
                info!(client_id = %id, api = %api, delivered, "Command pushed");
            }
            Ok(None) => {
                info!("Console closed");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read console input");
                return;
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_filter = format!("gpush_server={}", args.log_level);
    gpush_core::tracing_init::init_tracing(&log_filter, args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        "Starting gpush-server"
    );

    let config = ServerConfig::with_outbound_capacity(args.outbound_capacity);
    let server = Arc::new(PushServer::new(config, LoggingHooks));
    let service = MessageServiceImpl::new(Arc::clone(&server));

    if !args.no_console {
        tokio::spawn(run_console(Arc::clone(&server)));
    }

    let grpc_router = Server::builder()
        .http2_keepalive_interval(Some(Duration::from_secs(30)))
        .http2_keepalive_timeout(Some(Duration::from_secs(10)))
        .add_service(MessageServiceServer::new(service));

    info!(addr = %args.addr, "Server listening (plaintext)");

    tokio::select! {
        result = grpc_router.serve(args.addr) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_splits_three_parts() {
        assert_eq!(
            parse_command("12345 /SayHello Alice Smith"),
            Some(("12345", "/SayHello", "Alice Smith"))
        );
    }

    #[test]
    fn parse_command_rejects_short_lines() {
        assert_eq!(parse_command("12345 /SayHello"), None);
        assert_eq!(parse_command("12345"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn parse_command_allows_empty_data() {
        assert_eq!(parse_command("12345 /Ping "), Some(("12345", "/Ping", "")));
    }
}
