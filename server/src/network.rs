//! Server network layer: TCP accept, per-connection readers and the fixed
//! rate tick loop that owns the session.

use crate::client_manager::ClientManager;
use crate::game::{GameOver, LaunchConfig, TickCommands};
use crate::power::PowerTunables;
use crate::providers::{
    load_hp_or_default, DefaultHpProvider, GameRecord, HpProvider, NullSink, StateSink,
    TunablesFile,
};
use crate::session::Session;
use log::{debug, info, warn};
use shared::{
    decode_line, encode_line, LineBuffer, ProtocolError, ServerMessage, CANONICAL_COLS,
    DEFAULT_TICK_RATE,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Exactly two players take part in a match.
pub const MAX_PLAYERS: usize = 2;

const READ_CHUNK: usize = 4096;

type RecordQueue = UnboundedSender<(u64, GameRecord)>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[from] ProtocolError),
}

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub tick_rate: u32,
    pub active_cols: u8,
    pub tunables: PowerTunables,
    pub launch: LaunchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            active_cols: CANONICAL_COLS,
            tunables: PowerTunables::default(),
            launch: LaunchConfig::default(),
        }
    }
}

pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    clients: Arc<RwLock<ClientManager>>,
    writers: HashMap<u8, OwnedWriteHalf>,
    config: ServerConfig,
    hp_provider: Box<dyn HpProvider>,
    tunables_file: Option<TunablesFile>,
    sink: Box<dyn StateSink>,
}

impl Server {
    pub async fn bind(addr: &str, config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        Ok(Server {
            listener: Some(listener),
            local_addr,
            clients: Arc::new(RwLock::new(ClientManager::new(MAX_PLAYERS))),
            writers: HashMap::new(),
            config,
            hp_provider: Box::new(DefaultHpProvider),
            tunables_file: None,
            sink: Box::new(NullSink),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn with_hp_provider(mut self, provider: impl HpProvider + 'static) -> Self {
        self.hp_provider = Box::new(provider);
        self
    }

    pub fn with_tunables_file(mut self, file: TunablesFile) -> Self {
        self.tunables_file = Some(file);
        self
    }

    pub fn with_sink(mut self, sink: impl StateSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Waits for both players, greets each with its assignment and starts
    /// its reader. The listener is closed afterwards.
    pub async fn accept_players(&mut self) -> Result<(), ServerError> {
        let Some(listener) = self.listener.take() else {
            return Ok(());
        };

        while self.writers.len() < MAX_PLAYERS {
            let (stream, addr) = listener.accept().await?;
            if let Err(e) = stream.set_nodelay(true) {
                warn!("Could not disable Nagle for {}: {}", addr, e);
            }

            let player_id = {
                let mut clients = self.clients.write().await;
                clients.add_client(addr)
            };
            let Some(player_id) = player_id else {
                warn!("Rejecting connection from {}: server full", addr);
                continue;
            };

            let (reader, mut writer) = stream.into_split();
            let assign = encode_line(&ServerMessage::Assign { player: player_id })?;
            if let Err(e) = writer.write_all(assign.as_bytes()).await {
                warn!("Failed to assign player {}: {}", player_id, e);
                self.clients.write().await.remove_client(&player_id);
                continue;
            }

            self.writers.insert(player_id, writer);
            self.spawn_reader(player_id, reader);
        }

        info!("Both players connected, no longer accepting connections");
        Ok(())
    }

    fn spawn_reader(&self, player_id: u8, mut reader: OwnedReadHalf) {
        let clients = Arc::clone(&self.clients);

        tokio::spawn(async move {
            let mut lines = LineBuffer::new();
            let mut chunk = [0u8; READ_CHUNK];

            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) => {
                        info!("Player {} closed the connection", player_id);
                        break;
                    }
                    Ok(len) => {
                        if !lines.extend(&chunk[..len]) {
                            debug!("Discarded oversized line from player {}", player_id);
                        }
                        while let Some(line) = lines.next_line() {
                            if line.iter().all(u8::is_ascii_whitespace) {
                                continue;
                            }
                            match decode_line(&line) {
                                Ok(message) => {
                                    clients.write().await.handle_message(player_id, message);
                                }
                                Err(e @ ProtocolError::InvalidValue { .. }) => {
                                    warn!("Ignoring control from player {}: {}", player_id, e);
                                }
                                Err(e) => {
                                    debug!("Dropped line from player {}: {}", player_id, e);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Read error from player {}: {}", player_id, e);
                        break;
                    }
                }
            }

            clients.write().await.mark_closed(player_id);
        });
    }

    fn load_hp(&self) -> crate::board::HpSnapshot {
        load_hp_or_default(self.hp_provider.as_ref())
    }

    /// Moves the sink onto a blocking thread that writes records in the
    /// order they were queued, so file I/O never stalls a tick.
    fn spawn_record_writer(&mut self) -> (RecordQueue, JoinHandle<()>) {
        let mut sink = std::mem::replace(&mut self.sink, Box::new(NullSink));
        let (queue, mut records) = mpsc::unbounded_channel::<(u64, GameRecord)>();

        let writer = tokio::task::spawn_blocking(move || {
            while let Some((game_id, record)) = records.blocking_recv() {
                if let Err(e) = sink.persist(game_id, &record) {
                    warn!("Failed to save game {}: {}", game_id, e);
                }
            }
        });
        (queue, writer)
    }

    fn persist(queue: &RecordQueue, session: &Session) {
        if queue.send((session.game_id(), session.record())).is_err() {
            warn!("Record writer stopped, game {} not saved", session.game_id());
        }
    }

    async fn broadcast(&mut self, line: &str) {
        let mut failed = Vec::new();
        for (player_id, writer) in self.writers.iter_mut() {
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                warn!("Dropping player {} after failed write: {}", player_id, e);
                failed.push(*player_id);
            }
        }

        if !failed.is_empty() {
            let mut clients = self.clients.write().await;
            for player_id in failed {
                self.writers.remove(&player_id);
                clients.remove_client(&player_id);
            }
        }
    }

    /// Accepts the players and runs the match. Returns the result once a king
    /// falls, or `None` when every player has left first. Queued game records
    /// are flushed before returning.
    pub async fn run(&mut self) -> Result<Option<GameOver>, ServerError> {
        self.accept_players().await?;

        let (queue, writer) = self.spawn_record_writer();
        let result = self.play(&queue).await;

        drop(queue);
        if let Err(e) = writer.await {
            warn!("Record writer failed: {}", e);
        }
        result
    }

    async fn play(&mut self, queue: &RecordQueue) -> Result<Option<GameOver>, ServerError> {
        let mut session = Session::new(
            self.config.active_cols,
            self.load_hp(),
            self.config.tunables,
            self.config.launch,
        );
        if let Some(tunables) = self.tunables_file.as_mut().and_then(TunablesFile::poll) {
            session.apply_power_tunables(tunables);
        }
        Self::persist(queue, &session);

        let tick_rate = self.config.tick_rate.max(1);
        let dt = 1.0 / tick_rate as f32;
        let mut tick_interval = interval(Duration::from_secs_f32(dt));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick: u64 = 0;

        info!("Match started at {} Hz", tick_rate);

        loop {
            tick_interval.tick().await;
            tick += 1;

            let (paddles, controls, paused, trajectory, connected) = {
                let mut clients = self.clients.write().await;
                for player_id in clients.remove_closed() {
                    self.writers.remove(&player_id);
                }
                let controls = clients.take_controls();
                let paused = clients.is_paused();
                // Held back while paused so the first unpaused tick launches.
                let trajectory = if paused {
                    None
                } else {
                    clients.take_trajectory()
                };
                (
                    clients.latest_commands(),
                    controls,
                    paused,
                    trajectory,
                    clients.len(),
                )
            };

            if connected == 0 {
                info!("All players left, stopping match");
                return Ok(session.game_over());
            }

            if tick % u64::from(tick_rate) == 0 {
                if let Some(tunables) = self.tunables_file.as_mut().and_then(TunablesFile::poll) {
                    session.apply_power_tunables(tunables);
                }
            }

            if let Some(cols) = controls.set_dims {
                session.set_active_columns(cols, self.load_hp());
                Self::persist(queue, &session);
            } else if controls.new_game {
                session.reset(None, self.load_hp());
                Self::persist(queue, &session);
            }

            session.set_paused(paused);
            let report = session.step(dt, &TickCommands { paddles, trajectory });
            if report.pieces_destroyed > 0 || report.game_over.is_some() {
                Self::persist(queue, &session);
            }

            let state = ServerMessage::State {
                state: Box::new(session.snapshot()),
            };
            let line = encode_line(&state)?;
            self.broadcast(&line).await;

            if tick % 30 == 0 {
                let game = session.game();
                debug!(
                    "Tick {}: {} players, {} pieces, ball speed {:.1}, charge {}/{}",
                    tick,
                    connected,
                    game.pieces.len(),
                    game.ball.velocity.magnitude(),
                    game.power.charge,
                    game.power.max_charge
                );
            }

            if let Some(over) = session.game_over() {
                info!(
                    "Match finished after {} ticks, side {} wins",
                    tick, over.winner
                );
                return Ok(Some(over));
            }
        }
    }
}
