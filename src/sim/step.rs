/// Per-frame logic step.
///
/// ## Processing order
///
///   1. Physics scheduler tick (falling, then floating sweep)
///   2. Crush resolution (player under a tile that just arrived)
///   3. Player controller cooldown
///   4. Player move, if due: held key first, otherwise the active route
///   5. Message timer
///
/// Physics always resolves before the player moves in the same frame.
/// Nothing runs outside `Phase::Playing` or while paused.

use crate::domain::entity::MoveInput;
use crate::domain::grid::Dir;
use crate::sim::controller::{attempt_move, player_die};
use crate::sim::event::GameEvent;
use crate::sim::world::{Phase, WorldState};

/// Input sampled once per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub movement: Option<Dir>,
}

pub fn step(world: &mut WorldState, input: FrameInput, dt_ms: u32) -> Vec<GameEvent> {
    let mut events = Vec::new();
    if world.phase != Phase::Playing || world.paused {
        return events;
    }
    world.tick += 1;

    resolve_physics(world, dt_ms, &mut events);

    if world.phase == Phase::Playing {
        resolve_player_movement(world, input, dt_ms, &mut events);
    }

    world.message_timer_ms = world.message_timer_ms.saturating_sub(dt_ms);
    events
}

// ══════════════════════════════════════════════════════════════
// Physics + crush
// ══════════════════════════════════════════════════════════════

fn resolve_physics(world: &mut WorldState, dt_ms: u32, events: &mut Vec<GameEvent>) {
    let report = world.physics.tick(&mut world.grid, dt_ms);
    events.extend(report.events);

    if let Some(at) = report.crushed {
        if at == world.player.pos() {
            player_die(world, events);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Player movement
// ══════════════════════════════════════════════════════════════

fn resolve_player_movement(world: &mut WorldState, input: FrameInput, dt_ms: u32, events: &mut Vec<GameEvent>) {
    if world.player.move_cooldown_ms > 0 {
        world.player.move_cooldown_ms = world.player.move_cooldown_ms.saturating_sub(dt_ms);
        if world.player.move_cooldown_ms > 0 {
            return;
        }
    }

    let attempt = match input.movement {
        Some(dir) => MoveInput::Key(dir),
        None if world.player.route.is_some() => MoveInput::PathStep,
        None => return,
    };

    let outcome = attempt_move(world, attempt);
    events.extend(outcome.events);
}

// ══════════════════════════════════════════════════════════════
// Restart
// ══════════════════════════════════════════════════════════════

/// Put the level back as it was loaded. Score and lives are kept.
pub fn restart_level(world: &mut WorldState) {
    let grid = world.base_grid.clone();
    let spawn = world.spawn;
    world.install(grid, spawn);
    world.set_message("Restarted", 1000);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::Pos;
    use crate::domain::tile::CellKind;
    use crate::sim::controller::plan_paths;

    fn p(x: usize, y: usize) -> Pos {
        Pos::new(x, y)
    }

    fn held(dir: Dir) -> FrameInput {
        FrameInput { movement: Some(dir) }
    }

    #[test]
    fn falling_rock_crushes_player() {
        let mut world = WorldState::from_rows(&[
            "#####",
            "# O #",
            "#   #",
            "# P*#",
            "#####",
        ]);
        // The rock drops into (2,2), directly above the player.
        let events = step(&mut world, FrameInput::default(), 1000);

        assert!(events.contains(&GameEvent::PlayerCrushed { at: p(2, 3) }));
        assert!(events.contains(&GameEvent::LifeLost));
        assert_eq!(world.lives, 2);
        assert_eq!(world.player.pos(), p(1, 1));
        assert!(world.grid.is(p(1, 1), CellKind::Player));
        assert!(world.grid.is(p(2, 2), CellKind::Rock));
        assert!(world.grid.is(p(2, 3), CellKind::Empty));
    }

    #[test]
    fn cooldown_gates_held_key() {
        let mut world = WorldState::from_rows(&[
            "#######",
            "#P    #",
            "#    *#",
            "#######",
        ]);
        let move_ms = world.player_move_ms;

        step(&mut world, held(Dir::Right), 16);
        assert_eq!(world.player.pos(), p(2, 1));

        step(&mut world, held(Dir::Right), move_ms - 1);
        assert_eq!(world.player.pos(), p(2, 1));

        step(&mut world, held(Dir::Right), 1);
        assert_eq!(world.player.pos(), p(3, 1));
    }

    #[test]
    fn route_is_followed_one_cell_per_move() {
        let mut world = WorldState::from_rows(&[
            "#######",
            "#P    #",
            "#    *#",
            "#######",
        ]);
        plan_paths(&mut world, p(5, 2));
        let move_ms = world.player_move_ms;
        for _ in 0..5 {
            step(&mut world, FrameInput::default(), move_ms);
        }
        assert_eq!(world.player.pos(), p(5, 2));
        assert_eq!(world.phase, Phase::LevelComplete);
    }

    #[test]
    fn nothing_runs_while_paused_or_finished() {
        let mut world = WorldState::from_rows(&[
            "#####",
            "# O #",
            "#   #",
            "#P *#",
            "#####",
        ]);
        world.paused = true;
        assert!(step(&mut world, held(Dir::Right), 1000).is_empty());
        assert!(world.grid.is(p(2, 1), CellKind::Rock));
        assert_eq!(world.tick, 0);

        world.paused = false;
        world.phase = Phase::GameOver;
        assert!(step(&mut world, held(Dir::Right), 1000).is_empty());
        assert_eq!(world.player.pos(), p(1, 3));
    }

    #[test]
    fn physics_resolves_before_player_moves() {
        // The diamond drops into the cell the player is stepping into.
        let mut world = WorldState::from_rows(&[
            "######",
            "# *  #",
            "#P   #",
            "#....#",
            "######",
        ]);
        let events = step(&mut world, held(Dir::Right), 1000);
        let fell = events.iter().position(|e| matches!(e, GameEvent::TileMoved { .. }));
        let collected = events.iter().position(|e| *e == GameEvent::DiamondCollected { value: 1 });
        assert!(fell.is_some() && collected.is_some());
        assert!(fell < collected);
        assert_eq!(world.player.pos(), p(2, 2));
        assert_eq!(world.phase, Phase::LevelComplete);
    }

    #[test]
    fn message_timer_counts_down() {
        let mut world = WorldState::from_rows(&[
            "#####",
            "#P *#",
            "#####",
        ]);
        world.set_message("hi", 100);
        step(&mut world, FrameInput::default(), 60);
        assert_eq!(world.message_timer_ms, 40);
        step(&mut world, FrameInput::default(), 60);
        assert_eq!(world.message_timer_ms, 0);
    }

    #[test]
    fn restart_restores_loaded_grid() {
        let mut world = WorldState::from_rows(&[
            "######",
            "#P * #",
            "#  .*#",
            "######",
        ]);
        let move_ms = world.player_move_ms;
        world.score = 3;
        step(&mut world, held(Dir::Right), 16);
        step(&mut world, held(Dir::Right), move_ms);
        assert!(world.grid.is(p(3, 1), CellKind::Player));

        restart_level(&mut world);
        assert_eq!(world.grid, world.base_grid);
        assert_eq!(world.player.pos(), p(1, 1));
        assert_eq!(world.score, 4);
        assert!(world.player.route.is_none());
    }
}
