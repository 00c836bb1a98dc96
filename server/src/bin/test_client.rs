use clap::Parser;
use log::{debug, info, warn};
use rand::Rng;
use shared::{ClientMessage, ControlRequest, MoveCommand, ServerMessage, Trajectory};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless bot that plays one side of a chess pong match")]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:9999")]
    server: String,

    /// Launch angle in degrees when playing as player 1 (random if omitted)
    #[arg(short, long)]
    angle: Option<f32>,

    /// Stop after this many state updates
    #[arg(short, long, default_value = "900")]
    ticks: u32,

    /// Pick a new paddle command every N state updates
    #[arg(long, default_value = "10")]
    change_every: u32,
}

fn random_command(rng: &mut impl Rng) -> MoveCommand {
    match rng.gen_range(0..3) {
        0 => MoveCommand::Left,
        1 => MoveCommand::Right,
        _ => MoveCommand::Stop,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let mut rng = rand::thread_rng();

    let stream = TcpStream::connect(&args.server).await?;
    stream.set_nodelay(true)?;
    println!("Connected to {}", args.server);

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let player = match lines.next_line().await? {
        Some(line) => match serde_json::from_str::<ServerMessage>(&line)? {
            ServerMessage::Assign { player } => player,
            other => return Err(format!("expected assignment, got {:?}", other).into()),
        },
        None => return Err("server closed the connection before assigning".into()),
    };
    println!("Assigned player {}", player);

    let mut trajectory_sent = false;
    let mut updates = 0;

    while let Some(line) = lines.next_line().await? {
        let state = match serde_json::from_str::<ServerMessage>(&line) {
            Ok(ServerMessage::State { state }) => state,
            Ok(other) => {
                debug!("Ignoring {:?}", other);
                continue;
            }
            Err(e) => {
                warn!("Unreadable state line: {}", e);
                continue;
            }
        };
        updates += 1;

        if player == 1 && state.waiting_trajectory && !trajectory_sent {
            let angle = args.angle.unwrap_or_else(|| rng.gen_range(200.0..340.0));
            info!("Launching at {:.1} degrees", angle);
            let msg = ClientMessage::Control(ControlRequest::Trajectory(Trajectory::Angle(angle)));
            writer.write_all(msg.to_line().as_bytes()).await?;
            trajectory_sent = true;
        }

        if updates % args.change_every.max(1) == 0 {
            let msg = ClientMessage::Command(random_command(&mut rng));
            writer.write_all(msg.to_line().as_bytes()).await?;
        }

        if updates % 30 == 0 {
            println!(
                "update {}: ball=({:.0}, {:.0}) pieces={} charge={}/{}{}",
                updates,
                state.ball.x,
                state.ball.y,
                state.pieces.len(),
                state.power.charge,
                state.power.max_charge,
                if state.power.active { " PIERCING" } else { "" }
            );
        }

        if let Some(over) = &state.game_over {
            println!(
                "Game over: {} king destroyed, side {} wins",
                over.king_color.as_str(),
                over.winner
            );
            break;
        }
        if updates >= args.ticks {
            println!("Update budget reached");
            break;
        }
    }

    println!("Test client finished after {} updates", updates);
    Ok(())
}
