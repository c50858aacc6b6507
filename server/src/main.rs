use clap::Parser;
use log::info;
use server::config::RelayConfig;
use server::network::Server;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Keep rooms after their last player leaves
    #[arg(long)]
    keep_empty_rooms: bool,

    /// Echo player_update messages back to their sender
    #[arg(long)]
    echo_to_sender: bool,

    /// Disconnect sessions silent for this many seconds (0 disables)
    #[arg(long, default_value = "0")]
    idle_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = RelayConfig {
        keep_empty_rooms: args.keep_empty_rooms,
        echo_to_sender: args.echo_to_sender,
        idle_timeout: None,
    }
    .with_idle_timeout_secs(args.idle_timeout_secs);

    info!("Starting relay...");
    info!("Config: {:?}", config);

    let addr = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&addr, config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
