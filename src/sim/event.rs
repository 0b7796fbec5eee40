/// Events emitted during a simulation step.
/// The presentation layer consumes these for animation/sound; the session
/// layer applies score and lives from the same values.

use crate::domain::grid::Pos;
use crate::domain::tile::CellKind;

/// Audio cue identifiers. Playback lives in `ui::sound`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sound {
    RockFall,
    DiamondFall,
    Move,
    Diamond,
    Push,
    Explode,
}

impl Sound {
    pub fn tag(self) -> &'static str {
        match self {
            Sound::RockFall => "rockfall",
            Sound::DiamondFall => "diamondfall",
            Sound::Move => "move",
            Sound::Diamond => "diamond",
            Sound::Push => "push",
            Sound::Explode => "explode",
        }
    }

    /// Landing cue for a falling kind.
    pub fn landing(kind: CellKind) -> Option<Sound> {
        match kind {
            CellKind::Rock => Some(Sound::RockFall),
            CellKind::Diamond => Some(Sound::DiamondFall),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    DiamondCollected { value: u32 },
    ExplosionDiamondCollected { value: u32 },
    LifeLost,
    GameOver,
    LevelComplete,
    /// A move attempt hit an obstacle (or a route could not be re-planned).
    Blocked { at: Pos },
    PlayerMoved { from: Pos, to: Pos, duration_ms: u32 },
    TileMoved { kind: CellKind, from: Pos, to: Pos, duration_ms: u32 },
    BalloonExploded { at: Pos },
    PlayerCrushed { at: Pos },
    Sound(Sound),
}

impl GameEvent {
    /// Score units carried by a collection event.
    pub fn score_value(&self) -> u32 {
        match self {
            GameEvent::DiamondCollected { value }
            | GameEvent::ExplosionDiamondCollected { value } => *value,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sound_tags() {
        assert_eq!(Sound::RockFall.tag(), "rockfall");
        assert_eq!(Sound::DiamondFall.tag(), "diamondfall");
        assert_eq!(Sound::Move.tag(), "move");
        assert_eq!(Sound::Diamond.tag(), "diamond");
        assert_eq!(Sound::landing(CellKind::Balloon), None);
    }

    #[test]
    fn score_values() {
        assert_eq!(GameEvent::DiamondCollected { value: 1 }.score_value(), 1);
        assert_eq!(GameEvent::ExplosionDiamondCollected { value: 5 }.score_value(), 5);
        assert_eq!(GameEvent::LifeLost.score_value(), 0);
    }
}
