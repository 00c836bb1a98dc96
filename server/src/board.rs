//! Board geometry and initial piece placement.
//!
//! The cell size is derived once from the canonical 8x8 board so that
//! narrower boards keep the same cell scale and simply get fewer columns.

use log::{debug, warn};
use shared::{
    BoardSnapshot, PieceColor, PieceType, BOARD_MARGIN, BOARD_ROWS, CANONICAL_COLS, CANVAS_HEIGHT,
    CANVAS_WIDTH, MIN_CELL_SIZE, VALID_ACTIVE_COLS,
};
use std::collections::HashMap;

use crate::physics::{Rect, Vector2};

/// Canonical back rank, sliced from the center for narrower boards.
pub const BACK_RANK: [PieceType; 8] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

/// Maps a requested column count onto a supported one. Anything outside
/// 2/4/6/8 falls back to the full 8-column board.
pub fn normalize_active_cols(requested: i64) -> u8 {
    VALID_ACTIVE_COLS
        .into_iter()
        .find(|&cols| i64::from(cols) == requested)
        .unwrap_or(CANONICAL_COLS)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub active_cols: u8,
    pub rows: u8,
    pub cell_size: f32,
    /// Top-left corner in canvas pixels.
    pub x: f32,
    pub y: f32,
    pub pixel_width: f32,
    pub pixel_height: f32,
}

impl Board {
    pub fn new(active_cols: u8) -> Self {
        let active_cols = normalize_active_cols(i64::from(active_cols));
        let cell_size = Self::canonical_cell_size();
        let pixel_width = cell_size * f32::from(active_cols);
        let pixel_height = cell_size * f32::from(BOARD_ROWS);

        Self {
            active_cols,
            rows: BOARD_ROWS,
            cell_size,
            x: (CANVAS_WIDTH - pixel_width) / 2.0,
            y: (CANVAS_HEIGHT - pixel_height) / 2.0,
            pixel_width,
            pixel_height,
        }
    }

    /// Cell size of the full 8x8 board inside the margined canvas.
    pub fn canonical_cell_size() -> f32 {
        let usable_w = CANVAS_WIDTH - BOARD_MARGIN * 2.0;
        let usable_h = CANVAS_HEIGHT - BOARD_MARGIN * 2.0;
        let base = (usable_w / f32::from(CANONICAL_COLS)).min(usable_h / f32::from(BOARD_ROWS));
        base.floor().max(MIN_CELL_SIZE)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.pixel_width, self.pixel_height)
    }

    pub fn contains_cell(&self, col: u8, row: u8) -> bool {
        col < self.active_cols && row < self.rows
    }

    pub fn cell_rect(&self, col: u8, row: u8) -> Rect {
        Rect::new(
            self.x + f32::from(col) * self.cell_size,
            self.y + f32::from(row) * self.cell_size,
            self.cell_size,
            self.cell_size,
        )
    }

    pub fn cell_center(&self, col: u8, row: u8) -> Vector2 {
        self.cell_rect(col, row).center()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            cols: self.active_cols,
            rows: self.rows,
            cell_size: self.cell_size,
            x: self.x,
            y: self.y,
            width: self.pixel_width,
            height: self.pixel_height,
        }
    }
}

/// Hit points per piece type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HpTable {
    hp: HashMap<PieceType, u32>,
}

impl Default for HpTable {
    fn default() -> Self {
        let hp = HashMap::from([
            (PieceType::Pawn, 2),
            (PieceType::Knight, 4),
            (PieceType::Rook, 5),
            (PieceType::Bishop, 5),
            (PieceType::Queen, 8),
            (PieceType::King, 10),
        ]);
        Self { hp }
    }
}

impl HpTable {
    /// Overrides the built-in value for one type. Zero is rejected since a
    /// piece needs at least one hit point to exist.
    pub fn set(&mut self, kind: PieceType, hp: u32) -> bool {
        if hp == 0 {
            return false;
        }
        self.hp.insert(kind, hp);
        true
    }

    pub fn get(&self, kind: PieceType) -> u32 {
        self.hp.get(&kind).copied().unwrap_or(1)
    }

    pub fn entries(&self) -> impl Iterator<Item = (PieceType, u32)> + '_ {
        PieceType::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }
}

/// One entry of a starting layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiecePlacement {
    pub kind: PieceType,
    pub color: PieceColor,
    pub col: u8,
    pub row: u8,
    /// Explicit values from a stored template; the HP table fills the gaps.
    pub hp: Option<u32>,
    pub max_hp: Option<u32>,
}

impl PiecePlacement {
    pub fn new(kind: PieceType, color: PieceColor, col: u8, row: u8) -> Self {
        Self {
            kind,
            color,
            col,
            row,
            hp: None,
            max_hp: None,
        }
    }
}

/// What the HP authority hands to a session at reset time: the per-type
/// table plus an optional full-width template layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HpSnapshot {
    pub hp_map: HpTable,
    pub template: Option<Vec<PiecePlacement>>,
}

impl HpSnapshot {
    pub fn hp_for(&self, kind: PieceType) -> u32 {
        self.hp_map.get(kind)
    }

    /// Starting layout for a board of `active_cols` columns. A stored
    /// template only describes the full board, so it is ignored otherwise.
    pub fn initial_layout(&self, active_cols: u8) -> Vec<PiecePlacement> {
        match &self.template {
            Some(template) if active_cols == CANONICAL_COLS => template.clone(),
            _ => generate_layout(active_cols),
        }
    }
}

/// Back rank and pawns for both colors over the centered columns.
pub fn generate_layout(active_cols: u8) -> Vec<PiecePlacement> {
    let active_cols = normalize_active_cols(i64::from(active_cols));
    let start = usize::from((CANONICAL_COLS - active_cols) / 2);
    let back_rank = &BACK_RANK[start..start + usize::from(active_cols)];
    let last_row = BOARD_ROWS - 1;

    let mut layout = Vec::with_capacity(back_rank.len() * 4);
    for (col, &kind) in (0u8..).zip(back_rank) {
        layout.push(PiecePlacement::new(kind, PieceColor::Black, col, 0));
        layout.push(PiecePlacement::new(PieceType::Pawn, PieceColor::Black, col, 1));
        layout.push(PiecePlacement::new(PieceType::Pawn, PieceColor::White, col, last_row - 1));
        layout.push(PiecePlacement::new(kind, PieceColor::White, col, last_row));
    }
    layout
}

/// A live piece in the session arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    /// Stable for the lifetime of a session; never reused after removal.
    pub id: u32,
    pub kind: PieceType,
    pub color: PieceColor,
    pub col: u8,
    pub row: u8,
    pub hp: u32,
    pub max_hp: u32,
    /// Simulation time of the last damage taken.
    pub last_damaged_at: Option<f32>,
}

impl Piece {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn can_take_hit(&self, now: f32, cooldown: f32) -> bool {
        self.last_damaged_at
            .map_or(true, |last| now - last >= cooldown)
    }

    /// Removes up to `amount` hit points and returns how many were removed.
    pub fn take_damage(&mut self, amount: u32, now: f32) -> u32 {
        let dealt = amount.min(self.hp);
        self.hp -= dealt;
        self.last_damaged_at = Some(now);
        dealt
    }
}

/// Turns a layout into arena pieces, dropping entries that do not fit the
/// board. Ids are assigned in layout order starting at zero.
pub fn build_pieces(board: &Board, hp: &HpSnapshot) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut occupied = std::collections::HashSet::new();

    for placement in hp.initial_layout(board.active_cols) {
        if !board.contains_cell(placement.col, placement.row) {
            warn!(
                "Skipping {} {} outside the board at ({}, {})",
                placement.color.as_str(),
                placement.kind.symbol(),
                placement.col,
                placement.row
            );
            continue;
        }
        if !occupied.insert((placement.col, placement.row)) {
            warn!(
                "Skipping duplicate piece at ({}, {})",
                placement.col, placement.row
            );
            continue;
        }

        let default_hp = hp.hp_for(placement.kind);
        let max_hp = placement.max_hp.filter(|&v| v > 0).unwrap_or(default_hp);
        let current = placement.hp.unwrap_or(max_hp).min(max_hp);
        if current == 0 {
            continue;
        }

        let id = pieces.len() as u32;
        pieces.push(Piece {
            id,
            kind: placement.kind,
            color: placement.color,
            col: placement.col,
            row: placement.row,
            hp: current,
            max_hp,
            last_damaged_at: None,
        });
    }

    debug!(
        "Placed {} pieces on a {}x{} board",
        pieces.len(),
        board.active_cols,
        board.rows
    );
    pieces
}
