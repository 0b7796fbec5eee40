/// Tile behavior — gravity, rolling and floating rules.
///
/// Pure functions: each evaluates one tile against the grid and proposes a
/// `MoveIntent` without applying it. The physics scheduler decides when to
/// call them and applies the result.
///
/// ## Falling kinds (Rock, Diamond), priority order
///
/// ┌──────────────────────────────────────────────┬──────────────────┐
/// │ Condition                                     │ Result           │
/// ├──────────────────────────────────────────────┼──────────────────┤
/// │ below is Empty                                │ Fall to below    │
/// │ below is round, left & down-left Empty        │ Roll left        │
/// │ below is round, right & down-right Empty      │ Roll right       │
/// │ otherwise                                     │ stationary       │
/// └──────────────────────────────────────────────┴──────────────────┘
///
/// "Round" = Rock or Diamond, which excludes dirt, walls and the player.
/// Left is always tried before right.
///
/// Destinations are always verified Empty, so a tile never lands ON the
/// player. Instead, a tile whose new cell sits directly above the player is
/// flagged `kill_player`.
///
/// ## Floating kind (Balloon), priority order
///
/// ┌──────────────────────────────────────────────┬──────────────────┐
/// │ Condition                                     │ Result           │
/// ├──────────────────────────────────────────────┼──────────────────┤
/// │ above off-map, moved last pass                │ Explode          │
/// │ above Empty                                   │ Float up         │
/// │ above Dirt                                    │ stationary       │
/// │ above solid/interactive, moved last pass      │ Explode          │
/// │ otherwise                                     │ stationary       │
/// └──────────────────────────────────────────────┴──────────────────┘

use super::grid::{Grid, Pos};
use super::tile::CellKind;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Motion {
    Fall,
    Roll,
    Float,
    Explode,
}

/// A proposed single-cell relocation, not yet applied.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MoveIntent {
    pub kind: CellKind,
    pub from: Pos,
    /// Equal to `from` when exploding in place.
    pub to: Pos,
    pub motion: Motion,
    /// The cell below `to` holds the player.
    pub kill_player: bool,
    /// Worth a landing sound cue.
    pub landing: bool,
}

impl MoveIntent {
    pub fn explodes(&self) -> bool {
        self.motion == Motion::Explode
    }
}

/// Evaluate a Rock or Diamond at `pos`. None = stationary (or not a
/// falling kind).
pub fn evaluate_falling(grid: &Grid, pos: Pos) -> Option<MoveIntent> {
    let kind = grid.get(pos)?;
    if !kind.can_fall() { return None; }

    let below = grid.offset(pos, 0, 1)?;

    // Rule 1: straight down
    if grid.is(below, CellKind::Empty) {
        return Some(MoveIntent {
            kind,
            from: pos,
            to: below,
            motion: Motion::Fall,
            kill_player: player_below(grid, below),
            landing: blocked_below(grid, below),
        });
    }

    // Rule 2: roll off a round support
    if !grid.kind_at(below).is_round() { return None; }

    for dx in [-1, 1] {
        let side = match grid.offset(pos, dx, 0) { Some(p) => p, None => continue };
        let diag = match grid.offset(pos, dx, 1) { Some(p) => p, None => continue };
        if grid.is(side, CellKind::Empty) && grid.is(diag, CellKind::Empty) {
            return Some(MoveIntent {
                kind,
                from: pos,
                to: diag,
                motion: Motion::Roll,
                kill_player: player_below(grid, diag),
                landing: true,
            });
        }
    }

    None
}

/// Evaluate a Balloon at `pos`. `just_moved` is the balloon's flag from
/// the previous pass.
pub fn evaluate_floating(grid: &Grid, pos: Pos, just_moved: bool) -> Option<MoveIntent> {
    let kind = grid.get(pos)?;
    if !kind.floats() { return None; }

    let explode = MoveIntent {
        kind,
        from: pos,
        to: pos,
        motion: Motion::Explode,
        kill_player: false,
        landing: false,
    };

    let above = match grid.offset(pos, 0, -1) {
        Some(p) => p,
        None => return if just_moved { Some(explode) } else { None },
    };

    match grid.kind_at(above) {
        CellKind::Empty => Some(MoveIntent {
            kind,
            from: pos,
            to: above,
            motion: Motion::Float,
            kill_player: false,
            landing: false,
        }),
        CellKind::Dirt => None,
        k if k.pops_balloon() && just_moved => Some(explode),
        _ => None,
    }
}

fn player_below(grid: &Grid, pos: Pos) -> bool {
    grid.offset(pos, 0, 1).map_or(false, |p| grid.is(p, CellKind::Player))
}

/// Will a tile arriving at `pos` be stopped on the next pass?
/// The map edge counts as blocked.
fn blocked_below(grid: &Grid, pos: Pos) -> bool {
    grid.offset(pos, 0, 1).map_or(true, |p| !grid.is(p, CellKind::Empty))
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: usize, y: usize) -> Pos {
        Pos::new(x, y)
    }

    // ── Falling ──

    #[test]
    fn falls_into_empty_below() {
        let g = Grid::from_rows(&[
            "#####",
            "# O #",
            "#   #",
            "#   #",
            "#####",
        ]);
        let m = evaluate_falling(&g, p(2, 1)).unwrap();
        assert_eq!(m.motion, Motion::Fall);
        assert_eq!(m.to, p(2, 2));
        assert!(!m.kill_player);
        assert!(!m.landing, "two rows below is still empty");
    }

    #[test]
    fn fall_tags_landing_when_blocked_next() {
        let g = Grid::from_rows(&[
            "#####",
            "# * #",
            "#   #",
            "#####",
        ]);
        let m = evaluate_falling(&g, p(2, 1)).unwrap();
        assert!(m.landing);
        assert_eq!(m.kind, CellKind::Diamond);
    }

    #[test]
    fn fall_onto_cell_above_player_kills() {
        let g = Grid::from_rows(&[
            "#####",
            "# O #",
            "#   #",
            "# P #",
            "#####",
        ]);
        let m = evaluate_falling(&g, p(2, 1)).unwrap();
        assert!(m.kill_player);
        assert!(m.landing);
    }

    #[test]
    fn resting_on_player_does_not_fall() {
        let g = Grid::from_rows(&[
            "#####",
            "# O #",
            "# P #",
            "#####",
        ]);
        assert_eq!(evaluate_falling(&g, p(2, 1)), None);
    }

    #[test]
    fn roll_prefers_left() {
        let g = Grid::from_rows(&[
            "#####",
            "# O #",
            "# O #",
            "#####",
        ]);
        let m = evaluate_falling(&g, p(2, 1)).unwrap();
        assert_eq!(m.motion, Motion::Roll);
        assert_eq!(m.to, p(1, 2));
        assert!(m.landing);
    }

    #[test]
    fn roll_right_when_left_blocked() {
        let g = Grid::from_rows(&[
            "#####",
            "#.* #",
            "# O #",
            "#####",
        ]);
        let m = evaluate_falling(&g, p(2, 1)).unwrap();
        assert_eq!(m.to, p(3, 2));
    }

    #[test]
    fn roll_needs_both_side_and_diagonal() {
        let g = Grid::from_rows(&[
            "#####",
            "# O #",
            "#.O.#",
            "#####",
        ]);
        assert_eq!(evaluate_falling(&g, p(2, 1)), None);
    }

    #[test]
    fn no_roll_off_dirt_or_wall() {
        let dirt = Grid::from_rows(&[
            "#####",
            "# O #",
            "# . #",
            "#####",
        ]);
        assert_eq!(evaluate_falling(&dirt, p(2, 1)), None);
        let wall = Grid::from_rows(&[
            "#####",
            "# O #",
            "#####",
        ]);
        assert_eq!(evaluate_falling(&wall, p(2, 1)), None);
    }

    #[test]
    fn roll_onto_cell_above_player_kills() {
        let g = Grid::from_rows(&[
            "#####",
            "# O #",
            "# O #",
            "#P..#",
            "#####",
        ]);
        let m = evaluate_falling(&g, p(2, 1)).unwrap();
        assert_eq!(m.to, p(1, 2));
        assert!(m.kill_player);
    }

    #[test]
    fn non_falling_kinds_ignored() {
        let g = Grid::from_rows(&[
            "#####",
            "# B #",
            "#   #",
            "#####",
        ]);
        assert_eq!(evaluate_falling(&g, p(2, 1)), None);
        assert_eq!(evaluate_falling(&g, p(9, 9)), None);
    }

    // ── Floating ──

    #[test]
    fn balloon_floats_into_empty() {
        let g = Grid::from_rows(&[
            "#####",
            "#   #",
            "# B #",
            "#####",
        ]);
        let m = evaluate_floating(&g, p(2, 2), false).unwrap();
        assert_eq!(m.motion, Motion::Float);
        assert_eq!(m.to, p(2, 1));
    }

    #[test]
    fn balloon_stops_under_dirt_even_when_moving() {
        let g = Grid::from_rows(&[
            "#####",
            "# . #",
            "# B #",
            "#####",
        ]);
        assert_eq!(evaluate_floating(&g, p(2, 2), true), None);
    }

    #[test]
    fn balloon_explodes_only_after_moving() {
        let g = Grid::from_rows(&[
            "#####",
            "# O #",
            "# B #",
            "#####",
        ]);
        assert_eq!(evaluate_floating(&g, p(2, 2), false), None);
        let m = evaluate_floating(&g, p(2, 2), true).unwrap();
        assert!(m.explodes());
        assert_eq!(m.to, m.from);
    }

    #[test]
    fn balloon_at_top_edge() {
        let g = Grid::from_rows(&[
            "# B #",
            "#   #",
            "#####",
        ]);
        assert_eq!(evaluate_floating(&g, p(2, 0), false), None);
        assert!(evaluate_floating(&g, p(2, 0), true).unwrap().explodes());
    }

    #[test]
    fn balloon_under_lava_just_stops() {
        let g = Grid::from_rows(&[
            "#####",
            "# ~ #",
            "# B #",
            "#####",
        ]);
        assert_eq!(evaluate_floating(&g, p(2, 2), true), None);
    }
}
