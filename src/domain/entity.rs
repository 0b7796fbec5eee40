/// Entities: the Player and the transient runtime state of moving tiles.

use std::collections::VecDeque;

use super::grid::{Dir, Pos};
use super::tile::CellKind;

/// A single, already-debounced move attempt.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveInput {
    /// Deliberate key press in one of four directions.
    Key(Dir),
    /// Advance one cell along the active route.
    PathStep,
}

/// A route being followed (click-to-move).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveRoute {
    /// Remaining cells, next step first.
    pub steps: VecDeque<Pos>,
    pub goal: Pos,
}

impl ActiveRoute {
    pub fn new(cells: &[Pos]) -> Option<Self> {
        let goal = *cells.last()?;
        Some(ActiveRoute { steps: cells.iter().copied().collect(), goal })
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub x: usize,
    pub y: usize,
    /// Milliseconds until the controller accepts the next move.
    pub move_cooldown_ms: u32,
    pub route: Option<ActiveRoute>,
}

impl Player {
    pub fn new(x: usize, y: usize) -> Self {
        Player { x, y, move_cooldown_ms: 0, route: None }
    }

    pub fn pos(&self) -> Pos {
        Pos::new(self.x, self.y)
    }

    pub fn place(&mut self, pos: Pos) {
        self.x = pos.x;
        self.y = pos.y;
    }
}

/// An in-progress smooth slide from the old cell to `target`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slide {
    pub target: Pos,
    pub elapsed_ms: u32,
    pub duration_ms: u32,
}

impl Slide {
    pub fn new(target: Pos, duration_ms: u32) -> Self {
        Slide { target, elapsed_ms: 0, duration_ms }
    }

    pub fn is_done(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }

    /// Advance by `dt_ms`. Returns true once complete.
    pub fn advance(&mut self, dt_ms: u32) -> bool {
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        self.is_done()
    }

    /// 0.0 (just started) → 1.0 (arrived).
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 { return 1.0; }
        (self.elapsed_ms as f32 / self.duration_ms as f32).min(1.0)
    }
}

/// Movable-tile runtime state, keyed by grid position in the scheduler.
///
/// Only valid while the cell still holds `kind`; a changed cell kind
/// invalidates it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileState {
    pub kind: CellKind,
    pub slide: Option<Slide>,
    /// Balloon only: did it move on the previous pass?
    pub just_moved: bool,
}

impl TileState {
    pub fn sliding(kind: CellKind, slide: Slide) -> Self {
        TileState { kind, slide: Some(slide), just_moved: kind.floats() }
    }

    /// A balloon shoved by the player: no slide, but counts as moving.
    pub fn pushed(kind: CellKind) -> Self {
        TileState { kind, slide: None, just_moved: true }
    }
}
