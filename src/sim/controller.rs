/// Player controller: one discrete move attempt against the live grid.
///
/// A move is atomic: it is applied whole or not at all. Score and lives are
/// updated here from the same values the returned events carry.
///
/// ┌──────────────────────────┬───────────┬─────────────────────────────┐
/// │ Resolution                │ moved     │ Events                       │
/// ├──────────────────────────┼───────────┼─────────────────────────────┤
/// │ out of bounds             │ false     │ —                            │
/// │ blocked                   │ false     │ Blocked                      │
/// │ lava                      │ false     │ LifeLost (+ GameOver)        │
/// │ walk                      │ true      │ PlayerMoved, move            │
/// │ collect                   │ true      │ *Collected, PlayerMoved      │
/// │ push                      │ true      │ TileMoved, PlayerMoved, push │
/// │ any move, no collectibles │ true      │ … + LevelComplete            │
/// └──────────────────────────┴───────────┴─────────────────────────────┘

use crate::domain::entity::{ActiveRoute, MoveInput};
use crate::domain::grid::{Dir, Pos};
use crate::domain::nav::{self, Path, Strategy};
use crate::domain::rules::{resolve_move, MoveResolution};
use crate::domain::tile::CellKind;
use crate::sim::event::{GameEvent, Sound};
use crate::sim::world::{Phase, WorldState};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    pub moved: bool,
    pub events: Vec<GameEvent>,
}

// ══════════════════════════════════════════════════════════════
// Move attempt
// ══════════════════════════════════════════════════════════════

pub fn attempt_move(world: &mut WorldState, input: MoveInput) -> MoveOutcome {
    let mut out = MoveOutcome::default();
    let from = world.player.pos();

    let (dir, deliberate) = match input {
        MoveInput::Key(dir) => {
            // A key press takes over from click-to-move.
            world.player.route = None;
            world.clear_offered();
            (dir, true)
        }
        MoveInput::PathStep => match next_route_dir(world, &mut out.events) {
            Some(dir) => (dir, false),
            None => return out,
        },
    };

    out.moved = match resolve_move(&world.grid, from, dir, deliberate) {
        MoveResolution::OutOfBounds => false,
        MoveResolution::Blocked { at } => {
            out.events.push(GameEvent::Blocked { at });
            if input == MoveInput::PathStep {
                world.player.route = None;
            }
            false
        }
        MoveResolution::Deadly { .. } => {
            player_die(world, &mut out.events);
            false
        }
        MoveResolution::Walk { to } => {
            relocate_player(world, from, to, &mut out.events);
            out.events.push(GameEvent::Sound(Sound::Move));
            true
        }
        MoveResolution::Collect { to, kind, value } => {
            let event = if kind == CellKind::ExplosionDiamond {
                GameEvent::ExplosionDiamondCollected { value }
            } else {
                GameEvent::DiamondCollected { value }
            };
            world.score = world.score.saturating_add(event.score_value());
            out.events.push(event);
            relocate_player(world, from, to, &mut out.events);
            out.events.push(GameEvent::Sound(Sound::Diamond));
            true
        }
        MoveResolution::Push { to, beyond, kind } => {
            world.grid.relocate(to, beyond);
            world.physics.mark_pushed(to, beyond, kind);
            out.events.push(GameEvent::TileMoved { kind, from: to, to: beyond, duration_ms: world.player_move_ms });
            relocate_player(world, from, to, &mut out.events);
            out.events.push(GameEvent::Sound(Sound::Push));
            true
        }
    };

    if out.moved {
        world.player.move_cooldown_ms = world.player_move_ms;
        if input == MoveInput::PathStep {
            advance_route(world);
        }
        check_level_complete(world, &mut out.events);
    }
    out
}

/// Direction of the next route step, re-planning the route when its next
/// cell is no longer adjacent or walkable.
fn next_route_dir(world: &mut WorldState, events: &mut Vec<GameEvent>) -> Option<Dir> {
    let from = world.player.pos();
    let (next, goal) = {
        let route = world.player.route.as_ref()?;
        (route.steps.front().copied(), route.goal)
    };

    let next = match next {
        Some(n) if n != from => n,
        _ => {
            world.player.route = None;
            return None;
        }
    };

    if from.is_adjacent(next) && nav::passable(&world.grid, next) {
        return Dir::between(from, next);
    }

    let replanned = world.navigator.plan(&mut world.grid, from, goal, Strategy::Single);
    match replanned.first() {
        Some(path) => {
            log::debug!("route re-planned from {:?} to {:?}: {} step(s)", from, goal, path.len());
            world.player.route = ActiveRoute::new(&path.cells);
            let first = path.cells.first().copied()?;
            Dir::between(from, first)
        }
        None => {
            world.player.route = None;
            events.push(GameEvent::Blocked { at: next });
            None
        }
    }
}

fn advance_route(world: &mut WorldState) {
    let here = world.player.pos();
    if let Some(route) = world.player.route.as_mut() {
        if route.steps.front() == Some(&here) {
            route.steps.pop_front();
        }
        if route.steps.is_empty() {
            world.player.route = None;
        }
    }
}

fn relocate_player(world: &mut WorldState, from: Pos, to: Pos, events: &mut Vec<GameEvent>) {
    world.grid.relocate(from, to);
    world.player.place(to);
    events.push(GameEvent::PlayerMoved { from, to, duration_ms: world.player_move_ms });
}

fn check_level_complete(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.grid.has_collectibles() {
        return;
    }
    events.push(GameEvent::LevelComplete);
    world.phase = Phase::LevelComplete;
    world.player.route = None;
    world.clear_offered();
    world.set_message(&format!("Level {} complete!", world.current_level + 1), 3000);
    log::info!("level {} complete, score {}", world.current_level + 1, world.score);
}

// ══════════════════════════════════════════════════════════════
// Death
// ══════════════════════════════════════════════════════════════

/// Shared by lava and crushing. Respawns at the first interior Empty cell
/// (row-major), found before the old cell is vacated.
pub fn player_die(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let old = world.player.pos();
    let respawn = world.grid.first_interior_empty();

    if let Some(spawn) = respawn {
        if world.grid.is(old, CellKind::Player) {
            world.grid.set(old, CellKind::Empty);
        }
        world.grid.set(spawn, CellKind::Player);
        world.player.place(spawn);
    } else {
        log::warn!("no free cell to respawn in, player stays at {:?}", old);
    }

    world.player.route = None;
    world.player.move_cooldown_ms = world.player_move_ms;
    world.clear_offered();

    world.lives = world.lives.saturating_sub(1);
    events.push(GameEvent::LifeLost);
    log::info!("life lost at {:?}, {} left", old, world.lives);

    if world.lives == 0 {
        events.push(GameEvent::GameOver);
        world.phase = Phase::GameOver;
        world.set_message("GAME OVER", 5000);
    } else {
        world.set_message("Ouch!", 1500);
    }
}

// ══════════════════════════════════════════════════════════════
// Click-to-move
// ══════════════════════════════════════════════════════════════

/// Plan routes to `goal` with the current strategy and follow the first.
/// Returns the number of routes offered.
pub fn plan_paths(world: &mut WorldState, goal: Pos) -> usize {
    let start = world.player.pos();
    let paths = world.navigator.plan(&mut world.grid, start, goal, world.strategy);

    world.selected = 0;
    world.plan_origin = Some(start);
    world.player.route = paths.first().and_then(|p| ActiveRoute::new(&p.cells));
    world.offered = paths;

    if world.offered.is_empty() {
        world.plan_origin = None;
        world.set_message("No route", 1000);
    }
    world.offered.len()
}

/// Select the next offered route. The active route follows the selection
/// only while the player still stands where the routes were planned.
pub fn cycle_path(world: &mut WorldState) -> Option<usize> {
    if world.offered.len() < 2 {
        return None;
    }
    world.selected = (world.selected + 1) % world.offered.len();
    if world.plan_origin == Some(world.player.pos()) {
        let path = world.offered[world.selected].clone();
        set_route(world, &path);
    }
    Some(world.selected)
}

pub fn set_route(world: &mut WorldState, path: &Path) {
    world.player.route = ActiveRoute::new(&path.cells);
}

pub fn cycle_strategy(world: &mut WorldState) -> Strategy {
    world.strategy = world.strategy.next();
    world.set_message(&format!("Routing: {}", world.strategy.label()), 1500);
    world.strategy
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

    fn key(dir: Dir) -> MoveInput {
        MoveInput::Key(dir)
    }

    #[test]
    fn collect_diamond_to_the_right() {
        let mut world = WorldState::from_rows(&[
            "######",
            "#    #",
            "# P* #",
            "#   *#",
            "######",
        ]);
        let out = attempt_move(&mut world, key(Dir::Right));
        assert!(out.moved);
        assert!(out.events.contains(&GameEvent::DiamondCollected { value: 1 }));
        assert!(!out.events.contains(&GameEvent::LevelComplete));
        assert_eq!(world.player.pos(), p(3, 2));
        assert!(world.grid.is(p(2, 2), CellKind::Empty));
        assert!(world.grid.is(p(3, 2), CellKind::Player));
        assert_eq!(world.score, 1);
        assert_eq!(world.player.move_cooldown_ms, world.player_move_ms);
    }

    #[test]
    fn explosion_diamond_is_worth_more() {
        let mut world = WorldState::from_rows(&[
            "######",
            "#P+ *#",
            "######",
        ]);
        let out = attempt_move(&mut world, key(Dir::Right));
        assert!(out.events.contains(&GameEvent::ExplosionDiamondCollected { value: 5 }));
        assert_eq!(world.score, 5);
    }

    #[test]
    fn lava_costs_a_life_and_respawns_row_major() {
        let mut world = WorldState::from_rows(&[
            "######",
            "#.. .#",
            "#.P~ #",
            "#  * #",
            "######",
        ]);
        let out = attempt_move(&mut world, key(Dir::Right));
        assert!(!out.moved);
        assert_eq!(out.events, vec![GameEvent::LifeLost]);
        assert_eq!(world.player.pos(), p(3, 1));
        assert!(world.grid.is(p(3, 1), CellKind::Player));
        assert!(world.grid.is(p(2, 2), CellKind::Empty));
        assert!(world.grid.is(p(3, 2), CellKind::Lava));
        assert_eq!(world.lives, 2);
        assert_eq!(world.grid.count(|k| k == CellKind::Player), 1);
    }

    #[test]
    fn last_life_ends_the_game() {
        let mut world = WorldState::from_rows(&[
            "######",
            "#P~ *#",
            "######",
        ]);
        world.lives = 1;
        let out = attempt_move(&mut world, key(Dir::Right));
        assert_eq!(out.events, vec![GameEvent::LifeLost, GameEvent::GameOver]);
        assert_eq!(world.phase, Phase::GameOver);
        assert_eq!(world.lives, 0);
    }

    #[test]
    fn last_diamond_completes_level_in_same_move() {
        let mut world = WorldState::from_rows(&[
            "#####",
            "#P* #",
            "#####",
        ]);
        let out = attempt_move(&mut world, key(Dir::Right));
        assert!(out.moved);
        let collected = out.events.iter().position(|e| *e == GameEvent::DiamondCollected { value: 1 });
        let complete = out.events.iter().position(|e| *e == GameEvent::LevelComplete);
        assert!(collected.is_some() && complete.is_some());
        assert!(collected < complete);
        assert_eq!(world.phase, Phase::LevelComplete);
    }

    #[test]
    fn rock_push_into_occupied_cell_is_atomic() {
        let mut world = WorldState::from_rows(&[
            "#######",
            "#PO.  #",
            "#.....#",
            "#   * #",
            "#######",
        ]);
        let before = world.grid.clone();
        let out = attempt_move(&mut world, key(Dir::Right));
        assert!(!out.moved);
        assert_eq!(out.events, vec![GameEvent::Blocked { at: p(2, 1) }]);
        assert_eq!(world.grid, before);
        assert_eq!(world.player.pos(), p(1, 1));
    }

    #[test]
    fn rock_push_horizontal_key_only() {
        let mut world = WorldState::from_rows(&[
            "#######",
            "#PO   #",
            "#.....#",
            "#   * #",
            "#######",
        ]);
        let out = attempt_move(&mut world, key(Dir::Right));
        assert!(out.moved);
        assert!(out.events.contains(&GameEvent::Sound(Sound::Push)));
        assert!(world.grid.is(p(3, 1), CellKind::Rock));
        assert!(world.grid.is(p(2, 1), CellKind::Player));

        // Vertical shove is refused.
        let mut world = WorldState::from_rows(&[
            "#####",
            "#P  #",
            "#O  #",
            "#  *#",
            "#####",
        ]);
        let out = attempt_move(&mut world, key(Dir::Down));
        assert!(!out.moved);
        assert!(world.grid.is(p(1, 2), CellKind::Rock));
    }

    #[test]
    fn balloon_push_marks_it_moving() {
        let mut world = WorldState::from_rows(&[
            "######",
            "#....#",
            "#PB  #",
            "#   *#",
            "######",
        ]);
        let out = attempt_move(&mut world, key(Dir::Right));
        assert!(out.moved);
        assert!(world.grid.is(p(3, 2), CellKind::Balloon));
        assert!(world.grid.is(p(2, 2), CellKind::Player));
        let state = world.physics.states().get(&world.grid, p(3, 2)).copied().unwrap();
        assert!(state.just_moved);
        assert!(world.physics.states().get(&world.grid, p(2, 2)).is_none());
    }

    #[test]
    fn out_of_bounds_is_a_silent_no_op() {
        let mut world = WorldState::from_rows(&[
            "P  ",
            "   ",
            "  *",
        ]);
        let out = attempt_move(&mut world, key(Dir::Up));
        assert_eq!(out, MoveOutcome::default());
        assert_eq!(world.player.pos(), p(0, 0));
    }

    #[test]
    fn key_press_cancels_route() {
        let mut world = WorldState::from_rows(&[
            "#######",
            "#P    #",
            "#    *#",
            "#######",
        ]);
        assert!(plan_paths(&mut world, p(5, 1)) > 0);
        assert!(world.player.route.is_some());
        attempt_move(&mut world, key(Dir::Down));
        assert!(world.player.route.is_none());
        assert!(world.offered.is_empty());
    }

    #[test]
    fn path_steps_reach_the_goal() {
        let mut world = WorldState::from_rows(&[
            "#######",
            "#P    #",
            "#    *#",
            "#######",
        ]);
        assert!(plan_paths(&mut world, p(5, 1)) > 0);
        for _ in 0..4 {
            assert!(attempt_move(&mut world, MoveInput::PathStep).moved);
        }
        assert_eq!(world.player.pos(), p(5, 1));
        assert!(world.player.route.is_none());
        assert!(!attempt_move(&mut world, MoveInput::PathStep).moved);
    }

    #[test]
    fn route_replans_around_new_obstacle() {
        let mut world = WorldState::from_rows(&[
            "#######",
            "#P    #",
            "#     #",
            "#    *#",
            "#######",
        ]);
        set_route(&mut world, &Path::new(vec![p(2, 1), p(3, 1), p(4, 1), p(5, 1)]));
        world.grid.set(p(2, 1), CellKind::Wall);

        let out = attempt_move(&mut world, MoveInput::PathStep);
        assert!(out.moved);
        assert_eq!(world.player.pos(), p(1, 2));
        let route = world.player.route.as_ref().unwrap();
        assert_eq!(route.goal, p(5, 1));
    }

    #[test]
    fn unreachable_route_is_dropped() {
        let mut world = WorldState::from_rows(&[
            "#######",
            "#P# * #",
            "#######",
        ]);
        set_route(&mut world, &Path::new(vec![p(2, 1), p(3, 1)]));
        let out = attempt_move(&mut world, MoveInput::PathStep);
        assert!(!out.moved);
        assert_eq!(out.events, vec![GameEvent::Blocked { at: p(2, 1) }]);
        assert!(world.player.route.is_none());
    }

    #[test]
    fn route_never_pushes_rocks() {
        let mut world = WorldState::from_rows(&[
            "#####",
            "#PO #",
            "#####",
            "#  *#",
            "#####",
        ]);
        set_route(&mut world, &Path::new(vec![p(2, 1), p(3, 1)]));
        let out = attempt_move(&mut world, MoveInput::PathStep);
        assert!(!out.moved);
        assert!(world.grid.is(p(2, 1), CellKind::Rock));
        assert!(world.player.route.is_none());
    }

    #[test]
    fn cycle_path_retargets_only_at_origin() {
        let mut world = WorldState::from_rows(&[
            "#######",
            "#P    #",
            "#     #",
            "#    *#",
            "#######",
        ]);
        let offered = plan_paths(&mut world, p(5, 3));
        assert!(offered >= 2);
        assert_eq!(cycle_path(&mut world), Some(1));
        let route = world.player.route.as_ref().unwrap();
        assert_eq!(route.steps.iter().copied().collect::<Vec<_>>(), world.offered[1].cells);

        attempt_move(&mut world, MoveInput::PathStep);
        let steps_before = world.player.route.clone();
        cycle_path(&mut world);
        assert_eq!(world.player.route, steps_before);
    }

    #[test]
    fn planning_an_unreachable_goal_offers_nothing() {
        let mut world = WorldState::from_rows(&[
            "#######",
            "#P# * #",
            "#######",
        ]);
        assert_eq!(plan_paths(&mut world, p(4, 1)), 0);
        assert!(world.player.route.is_none());
        assert_eq!(world.plan_origin, None);
        assert_eq!(cycle_path(&mut world), None);
    }

    #[test]
    fn strategy_cycles_through_all() {
        let mut world = WorldState::from_rows(&[
            "#####",
            "#P *#",
            "#####",
        ]);
        let start = world.strategy;
        for _ in 0..Strategy::ALL.len() {
            cycle_strategy(&mut world);
        }
        assert_eq!(world.strategy, start);
    }
}
