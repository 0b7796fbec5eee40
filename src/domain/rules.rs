/// Player movement rules — truth-table driven.
///
/// Pure functions operating on the grid — no side effects.
/// These encode "what happens" without performing the action; the player
/// controller applies the resolution.
///
/// ## Move Truth Table (first match wins)
/// ┌──────────────────────────────┬──────────────────────────────────┐
/// │ Target cell                   │ Resolution                        │
/// ├──────────────────────────────┼──────────────────────────────────┤
/// │ off the map                   │ OutOfBounds (no-op, no event)     │
/// │ Wall                          │ Blocked                           │
/// │ Rock, key press, horizontal   │ Push if beyond is Empty, else     │
/// │                               │ Blocked                           │
/// │ Rock, route step or vertical  │ Blocked                           │
/// │ Balloon, any direction        │ Push if beyond is Empty, else     │
/// │                               │ Blocked                           │
/// │ Diamond / ExplosionDiamond    │ Collect, then walk in             │
/// │ Lava                          │ Deadly (player stays put, dies)   │
/// │ Empty / Dirt                  │ Walk                              │
/// └──────────────────────────────┴──────────────────────────────────┘

use super::grid::{Dir, Grid, Pos};
use super::tile::CellKind;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveResolution {
    OutOfBounds,
    Blocked { at: Pos },
    Walk { to: Pos },
    Collect { to: Pos, kind: CellKind, value: u32 },
    /// Shove `kind` from `to` into `beyond`; the player takes `to`.
    Push { to: Pos, beyond: Pos, kind: CellKind },
    Deadly { at: Pos },
}

impl MoveResolution {
    /// Does the player end up in a new cell?
    pub fn relocates(&self) -> bool {
        matches!(
            self,
            MoveResolution::Walk { .. } | MoveResolution::Collect { .. } | MoveResolution::Push { .. }
        )
    }
}

/// Resolve a one-cell move from `from` in `dir`.
/// `deliberate` is true for key presses, false for route steps.
pub fn resolve_move(grid: &Grid, from: Pos, dir: Dir, deliberate: bool) -> MoveResolution {
    let to = match grid.step(from, dir) {
        Some(p) => p,
        None => return MoveResolution::OutOfBounds,
    };

    match grid.kind_at(to) {
        CellKind::Wall | CellKind::Player => MoveResolution::Blocked { at: to },
        kind @ (CellKind::Rock | CellKind::Balloon) => {
            if !kind.params().push.allows(dir, deliberate) {
                return MoveResolution::Blocked { at: to };
            }
            match grid.step(to, dir) {
                Some(beyond) if grid.is(beyond, CellKind::Empty) => {
                    MoveResolution::Push { to, beyond, kind }
                }
                _ => MoveResolution::Blocked { at: to },
            }
        }
        kind @ (CellKind::Diamond | CellKind::ExplosionDiamond) => {
            MoveResolution::Collect { to, kind, value: kind.params().value }
        }
        CellKind::Lava => MoveResolution::Deadly { at: to },
        CellKind::Empty | CellKind::Dirt => MoveResolution::Walk { to },
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
