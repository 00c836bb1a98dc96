//! Full game state as broadcast to clients once per tick.

use serde::{Deserialize, Serialize};

use crate::{MoveCommand, PieceColor, PieceType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub cols: u8,
    pub rows: u8,
    pub cell_size: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub radius: f32,
    pub color: String,
    pub speed: f32,
    pub special_ready: bool,
    pub special_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaddleSnapshot {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: String,
    pub speed: f32,
    pub command: MoveCommand,
}

/// A live piece. `x`/`y` are the pixel center of its cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceSnapshot {
    #[serde(rename = "type")]
    pub kind: PieceType,
    pub color: PieceColor,
    pub col: u8,
    pub row: u8,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub hp: u32,
    pub max_hp: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerSnapshot {
    pub charge: u32,
    pub max_charge: u32,
    pub charge_per_hit: u32,
    pub ready: bool,
    pub active: bool,
    pub special_damage: u32,
    pub remaining_damage: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOverSnapshot {
    /// Winning side: 0 = top (player 1), 1 = bottom (player 2).
    pub winner: u8,
    pub king_color: PieceColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub width: f32,
    pub height: f32,
    pub board: BoardSnapshot,
    pub ball: BallSnapshot,
    pub paddles: Vec<PaddleSnapshot>,
    pub pieces: Vec<PieceSnapshot>,
    pub scores: [u32; 2],
    /// Seconds since the unix epoch when the snapshot was taken.
    pub timestamp: f64,
    pub game_over: Option<GameOverSnapshot>,
    pub waiting_trajectory: bool,
    pub power: PowerSnapshot,
    pub paused: bool,
}

impl StateSnapshot {
    pub fn piece_at(&self, col: u8, row: u8) -> Option<&PieceSnapshot> {
        self.pieces.iter().find(|p| p.col == col && p.row == row)
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over.is_some()
    }
}
