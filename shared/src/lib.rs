//! Types shared between the chess pong server and its clients: geometry
//! constants, piece and command enumerations, the newline-delimited JSON
//! protocol and the state snapshot broadcast every tick.

pub mod protocol;
pub mod snapshot;

use serde::{Deserialize, Serialize};

pub use protocol::{
    decode_line, encode_line, ClientMessage, ControlRequest, LineBuffer, ProtocolError,
    ServerMessage, Trajectory, MAX_LINE_BYTES,
};
pub use snapshot::{
    BallSnapshot, BoardSnapshot, GameOverSnapshot, PaddleSnapshot, PieceSnapshot, PowerSnapshot,
    StateSnapshot,
};

pub const CANVAS_WIDTH: f32 = 800.0;
pub const CANVAS_HEIGHT: f32 = 600.0;
pub const BOARD_MARGIN: f32 = 20.0;
pub const BOARD_ROWS: u8 = 8;
pub const CANONICAL_COLS: u8 = 8;
pub const MIN_CELL_SIZE: f32 = 8.0;

pub const BALL_BASE_SPEED: f32 = 350.0;
pub const BALL_SPEED_CAP: f32 = 800.0;
pub const PADDLE_SPEED: f32 = 350.0;

/// Seconds during which a piece ignores further hits from the same contact.
pub const PIECE_HIT_COOLDOWN: f32 = 0.12;
pub const PADDLE_HIT_COOLDOWN: f32 = 0.06;

pub const DEFAULT_TICK_RATE: u32 = 30;
pub const DEFAULT_PORT: u16 = 9999;

/// Column counts a board may be configured with.
pub const VALID_ACTIVE_COLS: [u8; 4] = [2, 4, 6, 8];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceType {
    #[serde(rename = "P")]
    Pawn,
    #[serde(rename = "N")]
    Knight,
    #[serde(rename = "B")]
    Bishop,
    #[serde(rename = "R")]
    Rook,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
}

impl PieceType {
    pub const ALL: [PieceType; 6] = [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            PieceType::Pawn => "P",
            PieceType::Knight => "N",
            PieceType::Bishop => "B",
            PieceType::Rook => "R",
            PieceType::Queen => "Q",
            PieceType::King => "K",
        }
    }

    pub fn from_symbol(s: &str) -> Option<Self> {
        PieceType::ALL.into_iter().find(|t| t.symbol() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceColor {
    White,
    Black,
}

impl PieceColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceColor::White => "white",
            PieceColor::Black => "black",
        }
    }

    /// Side index (0 = top, 1 = bottom) that defends pieces of this color.
    pub fn home_side(&self) -> u8 {
        match self {
            PieceColor::Black => 0,
            PieceColor::White => 1,
        }
    }
}

/// Movement intent for a paddle. The latest one received wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveCommand {
    Left,
    Right,
    #[default]
    Stop,
}

impl MoveCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveCommand::Left => "left",
            MoveCommand::Right => "right",
            MoveCommand::Stop => "stop",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "left" => Some(MoveCommand::Left),
            "right" => Some(MoveCommand::Right),
            "stop" => Some(MoveCommand::Stop),
            _ => None,
        }
    }

    /// Sign of the horizontal velocity this command produces.
    pub fn direction(&self) -> f32 {
        match self {
            MoveCommand::Left => -1.0,
            MoveCommand::Right => 1.0,
            MoveCommand::Stop => 0.0,
        }
    }
}
