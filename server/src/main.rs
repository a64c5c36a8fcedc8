use clap::Parser;
use log::{error, info};
use server::network::{Server, ServerConfig, ServerMessage};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Physics ticks per second
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,

    /// Maximum number of connected clients
    #[arg(short, long, default_value = "16")]
    max_clients: usize,

    /// Seconds of silence before a client is dropped
    #[arg(long, default_value = "5")]
    timeout_secs: u64,

    /// Ticks between full roster snapshots (0 disables resync)
    #[arg(long, default_value = "120")]
    roster_resync_ticks: u32,

    /// Run a scripted participant on the server itself
    #[arg(long)]
    host_player: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let tick_rate = args.tick_rate.max(1);

    let config = ServerConfig {
        tick_duration: Duration::from_secs_f64(1.0 / tick_rate as f64),
        frame_duration: Duration::from_secs_f64(1.0 / (tick_rate as f64 * 2.0)),
        max_clients: args.max_clients,
        client_timeout: Duration::from_secs(args.timeout_secs),
        roster_resync_ticks: args.roster_resync_ticks,
        host_player: args.host_player,
    };

    let address = format!("{}:{}", args.host, args.port);
    info!("Starting server on {} at {}Hz", address, tick_rate);
    if config.host_player {
        info!("Host player enabled");
    }

    let mut server = Server::new(&address, config).await?;

    let shutdown = server.shutdown_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            if let Err(e) = shutdown.send(ServerMessage::Shutdown) {
                error!("Failed to signal shutdown: {}", e);
            }
        }
    });

    server.run().await?;

    Ok(())
}
