/// Save and load a mid-game snapshot.
///
/// ## What is stored
///   Level index, grid (glyph rows), player cell, lives, score. Timers,
///   tile motion and routes are not: a restore starts them fresh.
///
/// ## File format
///   JSON (`save.json`), one `Snapshot` object.
///
/// ## Validation on restore
///   Dimensions must match the rows, exactly one Player cell must exist and
///   it must sit where the snapshot says the player is. A snapshot that
///   fails any check is rejected whole; the world is left untouched.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;
use crate::domain::entity::Player;
use crate::domain::grid::{Grid, GridError, Pos};
use crate::sim::level::LevelError;
use crate::sim::world::{Phase, WorldState};

pub const SAVE_VERSION: u32 = 1;
const SAVE_FILE: &str = "save.json";

// ══════════════════════════════════════════════════════════════
// Public types
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub level: usize,
    pub cols: usize,
    pub rows: usize,
    pub cells: Vec<String>,
    pub player: (usize, usize),
    pub lives: u32,
    pub score: u32,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("save file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("save has an invalid grid: {0}")]
    Invalid(#[from] LevelError),
    #[error("save puts the player at {recorded:?} but the grid has it at {found:?}")]
    PlayerMismatch { recorded: Pos, found: Pos },
    #[error("unsupported save version {0}")]
    Version(u32),
}

// ══════════════════════════════════════════════════════════════
// Paths
// ══════════════════════════════════════════════════════════════

fn save_dir() -> PathBuf {
    // 1. Exe directory, if writable (portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            let test_path = parent.join(".write_test_caverndash");
            if std::fs::write(&test_path, "").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home for system installs
    if let Some(xdg) = config::data_home() {
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub fn save_path() -> PathBuf {
    save_dir().join(SAVE_FILE)
}

// ══════════════════════════════════════════════════════════════
// Snapshot capture / restore (WorldState ↔ Snapshot)
// ══════════════════════════════════════════════════════════════

pub fn capture_snapshot(w: &WorldState) -> Snapshot {
    Snapshot {
        version: SAVE_VERSION,
        level: w.current_level,
        cols: w.grid.cols(),
        rows: w.grid.rows(),
        cells: w.grid.to_rows(),
        player: (w.player.x, w.player.y),
        lives: w.lives,
        score: w.score,
    }
}

/// Re-initialise the world from a snapshot. The level named by the snapshot
/// should already be loaded so restart returns to its start; otherwise the
/// restored grid becomes the restart point.
pub fn restore_snapshot(w: &mut WorldState, snap: &Snapshot) -> Result<(), SaveError> {
    let grid = validate(snap)?;
    let player = Pos::new(snap.player.0, snap.player.1);

    let same_shape = w.base_grid.cols() == grid.cols() && w.base_grid.rows() == grid.rows();
    if !same_shape {
        w.base_grid = grid.clone();
        w.spawn = player;
    }

    w.grid = grid;
    w.player = Player::new(player.x, player.y);
    w.reset_runtime();
    w.current_level = snap.level;
    w.lives = snap.lives;
    w.score = snap.score;
    if w.lives == 0 {
        w.phase = Phase::GameOver;
    }

    log::info!("restored level {} at {:?}, score {}", snap.level + 1, player, snap.score);
    Ok(())
}

fn validate(snap: &Snapshot) -> Result<Grid, SaveError> {
    if snap.version != SAVE_VERSION {
        return Err(SaveError::Version(snap.version));
    }

    let grid = Grid::parse(&snap.cells).map_err(LevelError::from)?;
    if grid.cols() != snap.cols || grid.rows() != snap.rows {
        let mismatch = GridError::LengthMismatch { expected: snap.cols * snap.rows, actual: grid.len() };
        return Err(LevelError::from(mismatch).into());
    }

    let found = grid.validate_player().map_err(LevelError::from)?;
    let recorded = Pos::new(snap.player.0, snap.player.1);
    if found != recorded {
        return Err(SaveError::PlayerMismatch { recorded, found });
    }
    Ok(grid)
}

// ══════════════════════════════════════════════════════════════
// File operations
// ══════════════════════════════════════════════════════════════

pub fn write_snapshot(path: &Path, snap: &Snapshot) -> Result<(), SaveError> {
    let json = serde_json::to_string_pretty(snap)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot, SaveError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_game(w: &WorldState) -> Result<PathBuf, SaveError> {
    let path = save_path();
    write_snapshot(&path, &capture_snapshot(w))?;
    log::info!("saved to {}", path.display());
    Ok(path)
}

/// The saved snapshot, or None if there is no save file.
pub fn load_save() -> Result<Option<Snapshot>, SaveError> {
    let path = save_path();
    if !path.exists() {
        return Ok(None);
    }
    read_snapshot(&path).map(Some)
}

pub fn has_save() -> bool {
    save_path().exists()
}
