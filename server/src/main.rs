use clap::Parser;
use log::{error, info, warn};
use server::board::normalize_active_cols;
use server::network::{Server, ServerConfig};
use server::power::PowerTunables;
use server::providers::{JsonFileSink, JsonHpProvider, TunablesFile};
use shared::{CANONICAL_COLS, DEFAULT_PORT, DEFAULT_TICK_RATE};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Tick rate (updates per second)
    #[arg(short, long, default_value_t = DEFAULT_TICK_RATE)]
    tick_rate: u32,

    /// Active board columns: 2, 4, 6 or 8. Anything else means 8
    #[arg(short, long, env = "EXTRA_DIMENSIONS", default_value = "8")]
    dims: String,

    /// JSON file with an `hp_map` and optional `pieces` template
    #[arg(long)]
    hp_file: Option<PathBuf>,

    /// JSON file with power tunables, re-read when it changes
    #[arg(long)]
    power_config: Option<PathBuf>,

    /// Directory for game_<timestamp>.json records
    #[arg(long)]
    state_dir: Option<PathBuf>,
}

fn parse_dims(raw: &str) -> u8 {
    match raw.trim().parse::<i64>() {
        Ok(requested) => {
            let cols = normalize_active_cols(requested);
            if i64::from(cols) != requested {
                warn!("Unsupported board width {}, using {}", requested, cols);
            }
            cols
        }
        Err(_) => {
            warn!("Unparseable board width {:?}, using {}", raw, CANONICAL_COLS);
            CANONICAL_COLS
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut tunables = PowerTunables::default();
    let tunables_file = args.power_config.as_ref().map(TunablesFile::new);
    if let Some(file) = &tunables_file {
        match file.load() {
            Ok(loaded) => tunables = loaded,
            Err(e) => warn!("Using default power tunables: {}", e),
        }
    }

    let config = ServerConfig {
        tick_rate: args.tick_rate,
        active_cols: parse_dims(&args.dims),
        tunables,
        ..ServerConfig::default()
    };
    info!(
        "Board width {} columns, {} Hz, power {:?}",
        config.active_cols, config.tick_rate, config.tunables
    );

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::bind(&address, config).await?;
    if let Some(path) = args.hp_file {
        info!("Loading hit points from {}", path.display());
        server = server.with_hp_provider(JsonHpProvider::new(path));
    }
    if let Some(file) = tunables_file {
        info!("Watching power config {}", file.path().display());
        server = server.with_tunables_file(file);
    }
    if let Some(dir) = args.state_dir {
        info!("Saving game records to {}", dir.display());
        server = server.with_sink(JsonFileSink::new(dir));
    }

    tokio::select! {
        result = server.run() => {
            match result {
                Ok(Some(over)) => info!(
                    "{} king destroyed, side {} wins",
                    over.king_color.as_str(),
                    over.winner
                ),
                Ok(None) => info!("Match ended without a winner"),
                Err(e) => {
                    error!("Server error: {}", e);
                    return Err(e.into());
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
