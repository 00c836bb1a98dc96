//! External collaborators of a session: where piece hit points come from,
//! where power tunables are read from, and where game records are written.
//!
//! Every provider failure is recoverable. Callers log it and fall back to
//! built-in defaults; nothing here can stop a running match.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use shared::{PieceColor, PieceType};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

use crate::board::{HpSnapshot, HpTable, Piece, PiecePlacement};
use crate::power::PowerTunables;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode game record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// One piece as stored on disk. Type and color are kept as raw strings so
/// a single bad entry does not reject the whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub color: String,
    pub col: i64,
    pub row: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hp: Option<u32>,
}

impl From<&Piece> for PieceRecord {
    fn from(piece: &Piece) -> Self {
        Self {
            kind: piece.kind.symbol().to_string(),
            color: piece.color.as_str().to_string(),
            col: i64::from(piece.col),
            row: i64::from(piece.row),
            hp: Some(piece.hp),
            max_hp: Some(piece.max_hp),
        }
    }
}

impl PieceRecord {
    fn to_placement(&self) -> Option<PiecePlacement> {
        let Some(kind) = PieceType::from_symbol(&self.kind) else {
            warn!("Skipping piece with unknown type {:?}", self.kind);
            return None;
        };
        let color = match self.color.as_str() {
            "white" => PieceColor::White,
            "black" => PieceColor::Black,
            other => {
                warn!("Skipping piece with unknown color {:?}", other);
                return None;
            }
        };
        let (Ok(col), Ok(row)) = (u8::try_from(self.col), u8::try_from(self.row)) else {
            warn!("Skipping piece at invalid cell ({}, {})", self.col, self.row);
            return None;
        };

        Some(PiecePlacement {
            kind,
            color,
            col,
            row,
            hp: self.hp,
            max_hp: self.max_hp,
        })
    }
}

/// The JSON document shared by HP templates and saved games:
/// `{"hp_map": {"P": 2, ...}, "scores": [0, 0], "pieces": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    #[serde(default)]
    pub hp_map: BTreeMap<String, u32>,
    #[serde(default)]
    pub scores: [u32; 2],
    #[serde(default)]
    pub pieces: Vec<PieceRecord>,
}

impl GameRecord {
    pub fn new(hp_map: &HpTable, scores: [u32; 2], pieces: &[Piece]) -> Self {
        Self {
            hp_map: hp_map
                .entries()
                .map(|(kind, hp)| (kind.symbol().to_string(), hp))
                .collect(),
            scores,
            pieces: pieces.iter().map(PieceRecord::from).collect(),
        }
    }

    /// Converts the stored document into an HP snapshot. Unknown piece
    /// types and zero hit points are skipped with a warning. An empty piece
    /// list means no template.
    pub fn into_hp_snapshot(self) -> HpSnapshot {
        let mut table = HpTable::default();
        for (symbol, hp) in &self.hp_map {
            match PieceType::from_symbol(symbol) {
                Some(kind) => {
                    if !table.set(kind, *hp) {
                        warn!("Ignoring zero hit points for {}", symbol);
                    }
                }
                None => warn!("Ignoring hit points for unknown piece type {:?}", symbol),
            }
        }

        let template = if self.pieces.is_empty() {
            None
        } else {
            Some(
                self.pieces
                    .iter()
                    .filter_map(PieceRecord::to_placement)
                    .collect(),
            )
        };

        HpSnapshot {
            hp_map: table,
            template,
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Source of piece hit points, consulted on every reset.
pub trait HpProvider: Send + Sync {
    fn load(&self) -> Result<HpSnapshot, ConfigError>;
}

/// Built-in hit points and the generated layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHpProvider;

impl HpProvider for DefaultHpProvider {
    fn load(&self) -> Result<HpSnapshot, ConfigError> {
        Ok(HpSnapshot::default())
    }
}

/// Reads a [`GameRecord`] document from disk. The file is re-read on each
/// load so edits apply to the next game.
#[derive(Debug, Clone)]
pub struct JsonHpProvider {
    path: PathBuf,
}

impl JsonHpProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HpProvider for JsonHpProvider {
    fn load(&self) -> Result<HpSnapshot, ConfigError> {
        let record: GameRecord = read_json(&self.path)?;
        Ok(record.into_hp_snapshot())
    }
}

pub fn load_hp_or_default(provider: &dyn HpProvider) -> HpSnapshot {
    match provider.load() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("HP provider unavailable ({}), using built-in defaults", e);
            HpSnapshot::default()
        }
    }
}

/// A power tunables file polled for modifications.
#[derive(Debug)]
pub struct TunablesFile {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl TunablesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_modified: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<PowerTunables, ConfigError> {
        let tunables: PowerTunables = read_json(&self.path)?;
        if !tunables.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "power values must all be at least 1, got {:?}",
                tunables
            )));
        }
        Ok(tunables)
    }

    /// Returns freshly loaded tunables if the file changed since the last
    /// poll. Invalid contents are reported once and then skipped until the
    /// file changes again.
    pub fn poll(&mut self) -> Option<PowerTunables> {
        let modified = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                debug!("Power config {} not readable: {}", self.path.display(), e);
                return None;
            }
        };
        if self.last_modified == Some(modified) {
            return None;
        }
        self.last_modified = Some(modified);

        match self.load() {
            Ok(tunables) => Some(tunables),
            Err(e) => {
                warn!("Ignoring power config: {}", e);
                None
            }
        }
    }
}

/// Destination for game records.
pub trait StateSink: Send {
    fn persist(&mut self, game_id: u64, record: &GameRecord) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StateSink for NullSink {
    fn persist(&mut self, _game_id: u64, _record: &GameRecord) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Writes `game_<id>.json` files into a directory, one per game.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, game_id: u64) -> PathBuf {
        self.dir.join(format!("game_{}.json", game_id))
    }
}

impl StateSink for JsonFileSink {
    fn persist(&mut self, game_id: u64, record: &GameRecord) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.dir).map_err(|source| ConfigError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(game_id);
        let text = serde_json::to_string_pretty(record)?;
        fs::write(&path, text).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Saved game state to {}", path.display());
        Ok(())
    }
}
