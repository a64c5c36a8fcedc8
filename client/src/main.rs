use clap::Parser;
use client::input::{make_bot, BotKind};
use client::network::{Client, ClientConfig};
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Physics ticks per second (movement intents)
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,

    /// Frames per second (look, equip, fire)
    #[arg(short, long, default_value = "120")]
    frame_rate: u32,

    /// Degrees of rotation per unit of look input
    #[arg(long, default_value = "0.1")]
    look_sensitivity: f32,

    /// Input bot driving this participant
    #[arg(short, long, value_enum, default_value = "strafe")]
    bot: BotKind,

    /// Seed for the wander bot
    #[arg(long)]
    seed: Option<u64>,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    info!("Bot: {:?}", args.bot);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }

    let config = ClientConfig {
        tick_duration: Duration::from_secs_f64(1.0 / args.tick_rate.max(1) as f64),
        frame_duration: Duration::from_secs_f64(1.0 / args.frame_rate.max(1) as f64),
        look_sensitivity: args.look_sensitivity,
        fake_ping_ms: args.fake_ping,
    };

    let mut client = Client::new(&args.server, make_bot(args.bot, args.seed), config).await?;

    client.run().await?;

    Ok(())
}
