use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reportcast::{
    server, wait_for_shutdown_signal, ClientConfig, HubConfig, LogWriter, ReconnectingClient,
    ServerConfig, DEFAULT_PORT,
};

#[derive(Parser, Debug)]
#[command(
    name = "reportcast",
    version,
    about = "Live broadcast of test run reports"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the report hub: accept published reports and stream them to viewers.
    Serve {
        /// Address to bind.
        #[arg(long, env = "REPORTCAST_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        addr: IpAddr,
        /// Port to bind.
        #[arg(long, short, env = "REPORTCAST_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Number of recent reports replayed to every new viewer.
        #[arg(long, env = "REPORTCAST_CACHE", default_value_t = 50)]
        cache: usize,
        /// Per-viewer queue length before a slow viewer is disconnected.
        #[arg(long, env = "REPORTCAST_QUEUE", default_value_t = 1024)]
        queue: usize,
    },
    /// Follow a hub's stream and log every report it carries.
    Watch {
        /// Stream endpoint of the hub.
        #[arg(env = "REPORTCAST_URL", default_value = "ws://127.0.0.1:9659/api/stream")]
        url: String,
        /// Delay between reconnect attempts, in milliseconds.
        #[arg(long, default_value_t = 1000)]
        reconnect_ms: u64,
    },
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.trim(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("REPORTCAST_LOG_JSON", false) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Cancels `token` on the first termination signal.
fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(signal) => info!(signal, "shutdown requested"),
            Err(e) => error!(error = %e, "cannot install signal handlers, stopping"),
        }
        token.cancel();
    });
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let shutdown = CancellationToken::new();
    cancel_on_signal(shutdown.clone());

    match cli.command {
        Command::Serve {
            addr,
            port,
            cache,
            queue,
        } => {
            let config = ServerConfig {
                listen: SocketAddr::new(addr, port),
                hub: HubConfig {
                    cache_capacity: cache,
                    queue_capacity: queue,
                },
            };
            if let Err(e) = server::serve(config, shutdown).await {
                error!(label = e.as_label(), error = %e, "server failed");
                return ExitCode::FAILURE;
            }
        }
        Command::Watch { url, reconnect_ms } => {
            let config = ClientConfig {
                reconnect_delay: Duration::from_millis(reconnect_ms),
                ..ClientConfig::new(url)
            };
            ReconnectingClient::websocket(config, Arc::new(LogWriter::new()))
                .run(shutdown)
                .await;
        }
    }
    ExitCode::SUCCESS
}
