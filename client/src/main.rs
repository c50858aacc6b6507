use clap::Parser;
use client::network::{Client, ClientConfig};
use log::info;
use std::time::Duration;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay URL to connect to
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:3000")]
    server: String,

    /// Room to join
    #[arg(short = 'r', long, default_value = "lobby")]
    room: String,

    /// Correlation id sent on join (random when omitted)
    #[arg(short = 'c', long)]
    client_id: Option<String>,

    /// Milliseconds between position updates
    #[arg(long, default_value = "50")]
    update_ms: u64,

    /// Milliseconds between simulation frames
    #[arg(long, default_value = "16")]
    frame_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ClientConfig {
        server_url: args.server,
        room_id: args.room,
        client_id: args
            .client_id
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        update_interval: Duration::from_millis(args.update_ms.max(1)),
        frame_interval: Duration::from_millis(args.frame_ms.max(1)),
    };

    info!("Starting client...");
    info!("Client id: {}", config.client_id);
    info!("Controls (one per line): left/right, -left/-right, stop, jump, down, quit");

    let mut client = Client::new(config);
    client.run().await?;

    Ok(())
}
