//! Match lifecycle around the simulation: resets, board width changes,
//! power tuning, pause and the snapshot sent to clients.

use log::{info, warn};
use shared::{StateSnapshot, CANVAS_HEIGHT, CANVAS_WIDTH};

use crate::board::{build_pieces, normalize_active_cols, Board, HpSnapshot, HpTable, Piece};
use crate::entity::Paddle;
use crate::game::{GameOver, GameState, LaunchConfig, TickCommands, TickReport};
use crate::power::PowerTunables;
use crate::providers::GameRecord;
use crate::utils::{next_game_id, unix_timestamp};

/// One running match plus everything that survives a reset: board width,
/// hit point table, power tuning and the win counters.
pub struct Session {
    game: GameState,
    active_cols: u8,
    hp_map: HpTable,
    tunables: PowerTunables,
    launch: LaunchConfig,
    /// Wins per side, kept across resets.
    scores: [u32; 2],
    paused: bool,
    game_id: u64,
}

impl Session {
    /// Builds the first game. Unsupported widths fall back to the full board.
    pub fn new(
        active_cols: u8,
        hp: HpSnapshot,
        tunables: PowerTunables,
        launch: LaunchConfig,
    ) -> Self {
        let active_cols = normalize_active_cols(i64::from(active_cols));
        let game = Self::build_game(active_cols, &hp, tunables, launch);
        let game_id = next_game_id(None);
        info!("Game {} created on a {}x8 board", game_id, active_cols);

        Self {
            game,
            active_cols,
            hp_map: hp.hp_map,
            tunables,
            launch,
            scores: [0, 0],
            paused: false,
            game_id,
        }
    }

    fn build_game(
        active_cols: u8,
        hp: &HpSnapshot,
        tunables: PowerTunables,
        launch: LaunchConfig,
    ) -> GameState {
        let board = Board::new(active_cols);
        let pieces = build_pieces(&board, hp);
        GameState::new(board, pieces, tunables, launch)
    }

    /// Starts a fresh game, optionally on a different board width. Power
    /// tunables carry over; charge does not.
    pub fn reset(&mut self, active_cols: Option<u8>, hp: HpSnapshot) {
        if let Some(cols) = active_cols {
            self.active_cols = normalize_active_cols(i64::from(cols));
        }
        self.game = Self::build_game(self.active_cols, &hp, self.tunables, self.launch);
        self.hp_map = hp.hp_map;
        self.game_id = next_game_id(Some(self.game_id));
        info!(
            "Game {} started on a {}x8 board with {} pieces",
            self.game_id,
            self.active_cols,
            self.game.pieces.len()
        );
    }

    /// Applies a requested width and resets. Unsupported widths fall back to
    /// the full board. Returns the width actually used.
    pub fn set_active_columns(&mut self, requested: i64, hp: HpSnapshot) -> u8 {
        let cols = normalize_active_cols(requested);
        if i64::from(cols) != requested {
            warn!(
                "Unsupported board width {}, falling back to {}",
                requested, cols
            );
        }
        self.reset(Some(cols), hp);
        cols
    }

    /// Hot-applies new power tuning. Invalid values are rejected and the
    /// current tuning is kept.
    pub fn apply_power_tunables(&mut self, tunables: PowerTunables) -> bool {
        if !tunables.is_valid() {
            warn!("Rejecting invalid power tunables {:?}", tunables);
            return false;
        }
        if tunables == self.tunables {
            return false;
        }
        self.tunables = tunables;
        self.game.power.apply_tunables(tunables);
        info!(
            "Power tunables applied: charge_max={}, charge_per_hit={}, special_damage={}",
            tunables.charge_max, tunables.charge_per_hit, tunables.special_damage
        );
        true
    }

    /// Mirrors the pause flag players control through the inbox.
    pub fn set_paused(&mut self, paused: bool) {
        if paused != self.paused {
            info!("Game {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Advances the game unless paused.
    pub fn step(&mut self, dt: f32, commands: &TickCommands) -> TickReport {
        if self.paused {
            return TickReport::default();
        }
        let report = self.game.update(dt, commands);
        if let Some(over) = report.game_over {
            self.scores[usize::from(over.winner)] += 1;
        }
        report
    }

    /// Everything a client needs to render the current tick.
    pub fn snapshot(&self) -> StateSnapshot {
        let game = &self.game;
        StateSnapshot {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            board: game.board.snapshot(),
            ball: game.ball.snapshot(),
            paddles: game.paddles.iter().map(Paddle::snapshot).collect(),
            pieces: game
                .pieces
                .iter()
                .map(|piece| piece_snapshot(&game.board, piece))
                .collect(),
            scores: self.scores,
            timestamp: unix_timestamp(),
            game_over: game.game_over.map(|over| over.snapshot()),
            waiting_trajectory: game.waiting_trajectory(),
            power: game.power.snapshot(),
            paused: self.paused,
        }
    }

    /// The persisted form of this game: hit points, scores and live pieces.
    pub fn record(&self) -> GameRecord {
        GameRecord::new(&self.hp_map, self.scores, &self.game.pieces)
    }

    /// Identifier of the current game, renewed on every reset.
    pub fn game_id(&self) -> u64 {
        self.game_id
    }

    pub fn active_cols(&self) -> u8 {
        self.active_cols
    }

    /// Wins per side, top first.
    pub fn scores(&self) -> [u32; 2] {
        self.scores
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// Direct engine access for scenario setup.
    pub fn game_mut(&mut self) -> &mut GameState {
        &mut self.game
    }

    pub fn game_over(&self) -> Option<GameOver> {
        self.game.game_over
    }
}

fn piece_snapshot(board: &Board, piece: &Piece) -> shared::PieceSnapshot {
    let center = board.cell_center(piece.col, piece.row);
    shared::PieceSnapshot {
        kind: piece.kind,
        color: piece.color,
        col: piece.col,
        row: piece.row,
        x: center.x,
        y: center.y,
        size: board.cell_size,
        hp: piece.hp,
        max_hp: piece.max_hp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Vector2;
    use shared::{PieceColor, PieceType, Trajectory};

    const DT: f32 = 1.0 / 30.0;

    fn session(cols: u8) -> Session {
        Session::new(
            cols,
            HpSnapshot::default(),
            PowerTunables::default(),
            LaunchConfig::default(),
        )
    }

    fn launch() -> TickCommands {
        TickCommands {
            trajectory: Some(Trajectory::Center),
            ..TickCommands::default()
        }
    }

    #[test]
    fn test_initial_snapshot() {
        let session = session(8);
        let snapshot = session.snapshot();

        assert_eq!(snapshot.width, 800.0);
        assert_eq!(snapshot.height, 600.0);
        assert_eq!(snapshot.board.cols, 8);
        assert_eq!(snapshot.pieces.len(), 32);
        assert_eq!(snapshot.paddles.len(), 2);
        assert!(snapshot.waiting_trajectory);
        assert!(!snapshot.paused);
        assert!(snapshot.game_over.is_none());
        assert_eq!(snapshot.scores, [0, 0]);
        assert_eq!(snapshot.power.max_charge, 10);

        let king = snapshot.piece_at(4, 0).unwrap();
        assert_eq!(king.kind, PieceType::King);
        assert_eq!(king.x, 120.0 + 4.0 * 70.0 + 35.0);
        assert_eq!(king.size, 70.0);
    }

    #[test]
    fn test_set_active_columns() {
        let mut session = session(8);
        assert_eq!(session.set_active_columns(4, HpSnapshot::default()), 4);
        assert_eq!(session.snapshot().pieces.len(), 16);
        assert_eq!(session.snapshot().board.width, 280.0);

        assert_eq!(session.set_active_columns(5, HpSnapshot::default()), 8);
        assert_eq!(session.active_cols(), 8);
        assert_eq!(session.snapshot().pieces.len(), 32);
    }

    #[test]
    fn test_reset_keeps_tunables_and_clears_state() {
        let mut session = session(6);
        let tuned = PowerTunables {
            charge_max: 2,
            charge_per_hit: 1,
            special_damage: 9,
        };
        assert!(session.apply_power_tunables(tuned));
        session.step(DT, &launch());
        assert!(!session.game().waiting_trajectory());

        let previous_id = session.game_id();
        session.reset(None, HpSnapshot::default());

        assert!(session.game().waiting_trajectory());
        assert_eq!(session.active_cols(), 6);
        assert!(session.game_id() > previous_id);
        assert_eq!(session.game().ball.velocity, Vector2::ZERO);
        assert_eq!(session.game().power.tunables(), tuned);
        assert_eq!(session.game().power.charge, 0);
    }

    #[test]
    fn test_invalid_tunables_rejected() {
        let mut session = session(8);
        let bad = PowerTunables {
            charge_max: 0,
            charge_per_hit: 1,
            special_damage: 3,
        };
        assert!(!session.apply_power_tunables(bad));
        assert_eq!(session.game().power.max_charge, 10);
        assert!(!session.apply_power_tunables(PowerTunables::default()));
    }

    #[test]
    fn test_hot_apply_mid_match() {
        let mut session = session(8);
        session.game_mut().power.record_damage(6);
        session.apply_power_tunables(PowerTunables {
            charge_max: 5,
            charge_per_hit: 1,
            special_damage: 3,
        });
        let power = session.snapshot().power;
        assert_eq!(power.charge, 5);
        assert_eq!(power.max_charge, 5);
        assert!(power.ready);
    }

    #[test]
    fn test_pause_freezes_simulation() {
        let mut session = session(8);
        session.step(DT, &launch());
        let ball = session.game().ball.position;

        session.set_paused(true);
        assert!(session.is_paused());
        let report = session.step(DT, &TickCommands::default());
        assert_eq!(report, TickReport::default());
        assert_eq!(session.game().ball.position, ball);
        assert!(session.snapshot().paused);

        session.set_paused(false);
        session.step(DT, &TickCommands::default());
        assert_ne!(session.game().ball.position, ball);
    }

    #[test]
    fn test_win_is_scored_and_shown() {
        let mut session = session(2);
        session.step(DT, &launch());

        let game = session.game_mut();
        let king = game
            .pieces
            .iter_mut()
            .find(|p| p.kind == PieceType::King && p.color == PieceColor::Black)
            .unwrap();
        king.hp = 1;
        let (col, row) = (king.col, king.row);
        game.ball.position = game.board.cell_center(col, row);

        session.step(DT, &TickCommands::default());

        let over = session.game_over().unwrap();
        assert_eq!(over.winner, 1);
        assert_eq!(session.scores(), [0, 1]);

        let snapshot = session.snapshot();
        assert!(snapshot.is_game_over());
        assert_eq!(snapshot.game_over.unwrap().king_color, PieceColor::Black);
        assert!(snapshot
            .pieces
            .iter()
            .all(|p| !(p.kind == PieceType::King && p.color == PieceColor::Black)));

        let record = session.record();
        assert_eq!(record.scores, [0, 1]);
        assert_eq!(record.pieces.len(), snapshot.pieces.len());
    }
}
