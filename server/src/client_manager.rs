//! Connected players and the inbox the tick loop drains.
//!
//! Reader tasks write into the manager as messages arrive; the tick loop
//! reads it once per tick. Everything is last-value-wins:
//! - one movement command slot per player
//! - pending `new_game` / `set_dims` requests
//! - the trajectory chosen by player 1
//! - the pause flag
//!
//! Player ids are handed out in connection order starting at 1, always the
//! lowest free one. Player 1 drives the top paddle, player 2 the bottom one.

use log::{debug, info, warn};
use shared::{ClientMessage, ControlRequest, MoveCommand, Trajectory};
use std::collections::HashMap;
use std::net::SocketAddr;

/// The player allowed to choose the launch trajectory.
pub const TRAJECTORY_PLAYER: u8 = 1;

/// One connected player as seen by the tick loop.
#[derive(Debug)]
pub struct Client {
    pub id: u8,
    pub addr: SocketAddr,
    pub latest_command: MoveCommand,
    /// Set by the reader task on EOF or read error.
    pub closed: bool,
}

impl Client {
    /// Creates a client standing still.
    pub fn new(id: u8, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            latest_command: MoveCommand::Stop,
            closed: false,
        }
    }

    /// Overwrites the movement intent; the newest command always wins.
    pub fn set_command(&mut self, command: MoveCommand) {
        self.latest_command = command;
    }

    /// Paddle index this player drives.
    pub fn side(&self) -> usize {
        usize::from(self.id.saturating_sub(1)).min(1)
    }
}

/// Reset requests collected since the last tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingControls {
    pub new_game: bool,
    pub set_dims: Option<i64>,
}

impl PendingControls {
    /// True when nothing asks for a reset.
    pub fn is_empty(&self) -> bool {
        !self.new_game && self.set_dims.is_none()
    }
}

/// Player registry plus the inbox shared between reader tasks and the
/// tick loop.
pub struct ClientManager {
    clients: HashMap<u8, Client>,
    max_clients: usize,
    controls: PendingControls,
    trajectory: Option<Trajectory>,
    paused: bool,
}

impl ClientManager {
    /// Creates an empty manager accepting up to `max_clients` players.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            max_clients,
            controls: PendingControls::default(),
            trajectory: None,
            paused: false,
        }
    }

    /// Registers a connection under the lowest free player id. Returns
    /// `None` when every slot is taken.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<u8> {
        if self.is_full() {
            return None;
        }

        let player_id = (1..=self.max_clients)
            .filter_map(|n| u8::try_from(n).ok())
            .find(|id| !self.clients.contains_key(id))?;

        info!("Player {} connected from {}", player_id, addr);
        self.clients.insert(player_id, Client::new(player_id, addr));
        Some(player_id)
    }

    /// True once every player slot is taken.
    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.max_clients
    }

    /// Removes a player, freeing its id. Returns whether it was present.
    pub fn remove_client(&mut self, player_id: &u8) -> bool {
        if let Some(client) = self.clients.remove(player_id) {
            info!("Player {} ({}) disconnected", client.id, client.addr);
            true
        } else {
            false
        }
    }

    /// Flags a connection whose reader has stopped. It is removed on the
    /// next tick.
    pub fn mark_closed(&mut self, player_id: u8) {
        if let Some(client) = self.clients.get_mut(&player_id) {
            client.closed = true;
        }
    }

    /// Removes every connection whose reader has finished and returns their
    /// ids.
    pub fn remove_closed(&mut self) -> Vec<u8> {
        let mut closed: Vec<u8> = self
            .clients
            .values()
            .filter(|client| client.closed)
            .map(|client| client.id)
            .collect();
        closed.sort_unstable();

        for player_id in &closed {
            self.remove_client(player_id);
        }
        closed
    }

    /// Applies one decoded message from `player_id`. Messages from unknown
    /// players are dropped.
    pub fn handle_message(&mut self, player_id: u8, message: ClientMessage) {
        let Some(client) = self.clients.get_mut(&player_id) else {
            debug!("Message from unknown player {} dropped", player_id);
            return;
        };

        match message {
            ClientMessage::Command(command) => client.set_command(command),
            ClientMessage::Control(request) => self.handle_control(player_id, request),
        }
    }

    fn handle_control(&mut self, player_id: u8, request: ControlRequest) {
        match request {
            ControlRequest::NewGame => {
                info!("Player {} requested a new game", player_id);
                self.controls.new_game = true;
            }
            ControlRequest::SetDims(cols) => {
                info!("Player {} requested a {}-column board", player_id, cols);
                self.controls.set_dims = Some(cols);
            }
            ControlRequest::Trajectory(trajectory) => {
                if player_id == TRAJECTORY_PLAYER {
                    self.trajectory = Some(trajectory);
                } else {
                    warn!(
                        "Ignoring trajectory {:?} from player {}",
                        trajectory, player_id
                    );
                }
            }
            ControlRequest::Pause(Some(paused)) => self.paused = paused,
            ControlRequest::Pause(None) => self.paused = !self.paused,
        }
    }

    /// Drains the reset requests gathered since the last tick.
    pub fn take_controls(&mut self) -> PendingControls {
        std::mem::take(&mut self.controls)
    }

    /// Consumes the pending launch trajectory.
    pub fn take_trajectory(&mut self) -> Option<Trajectory> {
        self.trajectory.take()
    }

    /// The pending launch trajectory, left in place.
    pub fn pending_trajectory(&self) -> Option<Trajectory> {
        self.trajectory
    }

    /// Current pause flag as last set or toggled by any player.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Commands for the top and bottom paddles. A missing player stands
    /// still.
    pub fn latest_commands(&self) -> [MoveCommand; 2] {
        let mut commands = [MoveCommand::Stop; 2];
        for client in self.clients.values() {
            commands[client.side()] = client.latest_command;
        }
        commands
    }

    /// Connected player ids in ascending order.
    pub fn player_ids(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self.clients.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of connected players.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
