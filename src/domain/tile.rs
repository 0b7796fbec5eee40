/// Cell kinds and their properties.
/// Capabilities are queried via methods, not stored as flags,
/// so cell semantics are centralized here.
///
/// Per-kind numeric parameters (timing multiplier, push directions, score
/// value) live in a static table rather than behind trait objects, so adding
/// a kind means adding a table row.

use serde::{Deserialize, Serialize};

use super::grid::Dir;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum CellKind {
    #[default]
    Empty,
    Wall,
    Dirt,
    Rock,             // Falls, rolls, pushable horizontally
    Diamond,          // Falls, rolls, collectible
    Player,
    Balloon,          // Floats up, explodes when stopped after moving
    ExplosionDiamond, // Left behind by an exploding balloon
    Lava,             // Kills on entry
}

impl CellKind {
    pub const ALL: [CellKind; 9] = [
        CellKind::Empty,
        CellKind::Wall,
        CellKind::Dirt,
        CellKind::Rock,
        CellKind::Diamond,
        CellKind::Player,
        CellKind::Balloon,
        CellKind::ExplosionDiamond,
        CellKind::Lava,
    ];

    /// Blocks entry unless pushed.
    pub fn is_blocking(self) -> bool {
        matches!(self, CellKind::Wall | CellKind::Rock)
    }

    /// Subject to gravity.
    pub fn can_fall(self) -> bool {
        matches!(self, CellKind::Rock | CellKind::Diamond)
    }

    /// Subject to inverse gravity.
    pub fn floats(self) -> bool {
        matches!(self, CellKind::Balloon)
    }

    pub fn is_deadly(self) -> bool {
        matches!(self, CellKind::Lava)
    }

    pub fn is_collectible(self) -> bool {
        matches!(self, CellKind::Diamond | CellKind::ExplosionDiamond)
    }

    /// Round objects let a falling tile roll off them.
    pub fn is_round(self) -> bool {
        matches!(self, CellKind::Rock | CellKind::Diamond)
    }

    /// Navigator passability: everything except Wall and Rock.
    /// Lava and Balloon are deliberately traversable at planning time.
    pub fn is_walkable(self) -> bool {
        !self.is_blocking()
    }

    /// Solid or interactive cells that make a rising balloon burst
    /// (provided it was moving). Dirt is a neutral stopper.
    pub fn pops_balloon(self) -> bool {
        matches!(
            self,
            CellKind::Wall
                | CellKind::Rock
                | CellKind::Diamond
                | CellKind::Player
                | CellKind::ExplosionDiamond
                | CellKind::Balloon
        )
    }

    pub fn params(self) -> &'static KindParams {
        &KIND_TABLE[self as usize]
    }

    // ── Codecs ──

    /// Level-text glyph. Unknown glyphs decode to Empty (see `from_glyph`).
    pub fn glyph(self) -> char {
        match self {
            CellKind::Empty            => ' ',
            CellKind::Wall             => '#',
            CellKind::Dirt             => '.',
            CellKind::Rock             => 'O',
            CellKind::Diamond          => '*',
            CellKind::Player           => 'P',
            CellKind::Balloon          => 'B',
            CellKind::ExplosionDiamond => '+',
            CellKind::Lava             => '~',
        }
    }

    pub fn from_glyph(c: char) -> Option<CellKind> {
        match c {
            ' ' => Some(CellKind::Empty),
            '#' => Some(CellKind::Wall),
            '.' => Some(CellKind::Dirt),
            'O' => Some(CellKind::Rock),
            '*' => Some(CellKind::Diamond),
            'P' => Some(CellKind::Player),
            'B' => Some(CellKind::Balloon),
            '+' => Some(CellKind::ExplosionDiamond),
            '~' => Some(CellKind::Lava),
            _   => None,
        }
    }

    /// Numeric kind value used by flat-array level suppliers.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<CellKind> {
        CellKind::ALL.get(code as usize).copied()
    }
}

// ══════════════════════════════════════════════════════════════
// Static per-kind parameter table
// ══════════════════════════════════════════════════════════════

/// Who may shove a kind, and in which directions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PushRule {
    None,
    /// Deliberate horizontal key press only; never while following a route.
    KeyHorizontal,
    /// Any direction, keys or route steps.
    Any,
}

impl PushRule {
    pub fn allows(self, dir: Dir, deliberate: bool) -> bool {
        match self {
            PushRule::None => false,
            PushRule::KeyHorizontal => deliberate && dir.is_horizontal(),
            PushRule::Any => true,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct KindParams {
    /// Multiplier applied to the owning timer's interval to get the slide
    /// duration. Rocks are slower than diamonds.
    pub timing: f32,
    pub push: PushRule,
    /// Score units awarded on collection (0 = not collectible).
    pub value: u32,
}

const KIND_TABLE: [KindParams; 9] = [
    // Empty
    KindParams { timing: 1.0, push: PushRule::None, value: 0 },
    // Wall
    KindParams { timing: 1.0, push: PushRule::None, value: 0 },
    // Dirt
    KindParams { timing: 1.0, push: PushRule::None, value: 0 },
    // Rock
    KindParams { timing: 1.2, push: PushRule::KeyHorizontal, value: 0 },
    // Diamond
    KindParams { timing: 1.0, push: PushRule::None, value: 1 },
    // Player
    KindParams { timing: 1.0, push: PushRule::None, value: 0 },
    // Balloon
    KindParams { timing: 1.0, push: PushRule::Any, value: 0 },
    // ExplosionDiamond
    KindParams { timing: 1.0, push: PushRule::None, value: 5 },
    // Lava
    KindParams { timing: 1.0, push: PushRule::None, value: 0 },
];
