/// Physics scheduler — drives tile behavior across the grid.
///
/// Two independent countdowns: one for falling kinds (Rock, Diamond), one
/// for floating kinds (Balloon). A countdown fires at most once per `tick`,
/// however much time elapsed; surplus time is discarded, not replayed.
///
/// ## Sweep order
///   - falling:  bottom row → top row, left → right
///   - floating: top row → bottom row, left → right
///
/// A tile that moves lands in a row the sweep has already passed, so it is
/// never moved twice in one pass. Tiles it uncovered are evaluated fresh.
///
/// ## Per-tile runtime state (`TileStates`)
///
/// A side table keyed by position, valid only while the cell still holds
/// the kind that created the entry. Every applied intent invalidates the
/// source and destination entries before recording the mover's new state:
///   - slide: duration = interval × kind timing multiplier, advanced by
///     every `tick`'s dt and dropped once complete. Presentation only: a
///     sliding tile is evaluated on the very next pass like any other.
///   - just_moved (balloons): set on float or push, cleared when stationary.

use std::collections::HashMap;

use crate::domain::entity::{Slide, TileState};
use crate::domain::grid::{Grid, Pos};
use crate::domain::physics::{evaluate_falling, evaluate_floating, MoveIntent};
use crate::domain::tile::CellKind;

use super::event::{GameEvent, Sound};

// ── Countdown ──

#[derive(Clone, Debug)]
pub struct Countdown {
    interval_ms: u32,
    remaining_ms: u32,
}

impl Countdown {
    pub fn new(interval_ms: u32) -> Self {
        let interval_ms = interval_ms.max(1);
        Countdown { interval_ms, remaining_ms: interval_ms }
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Consume `dt_ms`. Returns true on firing and re-arms to the full interval.
    pub fn tick(&mut self, dt_ms: u32) -> bool {
        if dt_ms < self.remaining_ms {
            self.remaining_ms -= dt_ms;
            return false;
        }
        self.remaining_ms = self.interval_ms;
        true
    }

    pub fn reset(&mut self) {
        self.remaining_ms = self.interval_ms;
    }
}

// ── Side table ──

#[derive(Default, Debug)]
pub struct TileStates {
    map: HashMap<Pos, TileState>,
}

impl TileStates {
    /// Entry at `pos`, if the cell still holds the kind that created it.
    pub fn get(&self, grid: &Grid, pos: Pos) -> Option<&TileState> {
        self.map.get(&pos).filter(|s| grid.is(pos, s.kind))
    }

    pub fn record(&mut self, pos: Pos, state: TileState) {
        self.map.insert(pos, state);
    }

    pub fn invalidate(&mut self, pos: Pos) {
        self.map.remove(&pos);
    }

    /// The tile at `pos` stayed put: it stops counting as moving, but a
    /// slide still in flight keeps playing.
    pub fn rest(&mut self, pos: Pos) {
        if let Some(state) = self.map.get_mut(&pos) {
            state.just_moved = false;
            if state.slide.is_none() {
                self.map.remove(&pos);
            }
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Move every slide forward by `dt_ms`; finished slides are dropped.
    fn advance_slides(&mut self, dt_ms: u32) {
        for state in self.map.values_mut() {
            if state.slide.as_mut().map_or(false, |s| s.advance(dt_ms)) {
                state.slide = None;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

// ── Scheduler ──

#[derive(Default, Debug)]
pub struct TickReport {
    pub events: Vec<GameEvent>,
    /// Player position under a tile that just arrived above it.
    pub crushed: Option<Pos>,
    pub moves: usize,
}

pub struct Physics {
    fall: Countdown,
    float: Countdown,
    states: TileStates,
}

impl Physics {
    pub fn new(fall_interval_ms: u32, float_interval_ms: u32) -> Self {
        Physics {
            fall: Countdown::new(fall_interval_ms),
            float: Countdown::new(float_interval_ms),
            states: TileStates::default(),
        }
    }

    pub fn reset(&mut self) {
        self.fall.reset();
        self.float.reset();
        self.states.clear();
    }

    pub fn states(&self) -> &TileStates {
        &self.states
    }

    /// Slide of the tile at `pos`, while it is still in progress.
    pub fn slide_at(&self, grid: &Grid, pos: Pos) -> Option<Slide> {
        self.states.get(grid, pos).and_then(|s| s.slide)
    }

    /// The player shoved `kind` from `from` to `to`. Balloons keep counting
    /// as moving so a ceiling hit next pass still pops them.
    pub fn mark_pushed(&mut self, from: Pos, to: Pos, kind: CellKind) {
        self.states.invalidate(from);
        self.states.invalidate(to);
        if kind.floats() {
            self.states.record(to, TileState::pushed(kind));
        }
    }

    pub fn tick(&mut self, grid: &mut Grid, dt_ms: u32) -> TickReport {
        let mut report = TickReport::default();
        self.states.advance_slides(dt_ms);

        if self.fall.tick(dt_ms) {
            self.sweep_falling(grid, &mut report);
        }
        if self.float.tick(dt_ms) {
            self.sweep_floating(grid, &mut report);
        }

        if report.moves > 0 {
            log::debug!("physics: {} move(s), {} tile state(s)", report.moves, self.states.len());
        }
        report
    }

    fn sweep_falling(&mut self, grid: &mut Grid, report: &mut TickReport) {
        let interval = self.fall.interval_ms();
        for y in (0..grid.rows()).rev() {
            for x in 0..grid.cols() {
                let pos = Pos::new(x, y);
                if !grid.kind_at(pos).can_fall() { continue; }

                match evaluate_falling(grid, pos) {
                    Some(intent) => self.apply(grid, intent, interval, report),
                    None => self.states.rest(pos),
                }
            }
        }
    }

    fn sweep_floating(&mut self, grid: &mut Grid, report: &mut TickReport) {
        let interval = self.float.interval_ms();
        for y in 0..grid.rows() {
            for x in 0..grid.cols() {
                let pos = Pos::new(x, y);
                if !grid.kind_at(pos).floats() { continue; }

                let just_moved = self.states.get(grid, pos).map_or(false, |s| s.just_moved);
                match evaluate_floating(grid, pos, just_moved) {
                    Some(intent) => self.apply(grid, intent, interval, report),
                    None => self.states.rest(pos),
                }
            }
        }
    }

    fn apply(&mut self, grid: &mut Grid, intent: MoveIntent, interval: u32, report: &mut TickReport) {
        report.moves += 1;

        if intent.explodes() {
            grid.set(intent.from, CellKind::ExplosionDiamond);
            self.states.invalidate(intent.from);
            report.events.push(GameEvent::BalloonExploded { at: intent.from });
            report.events.push(GameEvent::Sound(Sound::Explode));
            return;
        }

        grid.relocate(intent.from, intent.to);
        self.states.invalidate(intent.from);
        self.states.invalidate(intent.to);

        let duration_ms = (interval as f32 * intent.kind.params().timing).round() as u32;
        self.states.record(intent.to, TileState::sliding(intent.kind, Slide::new(intent.to, duration_ms)));

        report.events.push(GameEvent::TileMoved {
            kind: intent.kind,
            from: intent.from,
            to: intent.to,
            duration_ms,
        });
        if intent.landing {
            if let Some(cue) = Sound::landing(intent.kind) {
                report.events.push(GameEvent::Sound(cue));
            }
        }
        if intent.kill_player && report.crushed.is_none() {
            if let Some(victim) = grid.offset(intent.to, 0, 1) {
                report.crushed = Some(victim);
                report.events.push(GameEvent::PlayerCrushed { at: victim });
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(x: usize, y: usize) -> Pos {
        Pos::new(x, y)
    }

    fn physics() -> Physics {
        Physics::new(100, 150)
    }

    fn rows(g: &Grid) -> Vec<String> {
        g.to_rows()
    }

    // ── Countdown ──

    #[test]
    fn countdown_fires_once_without_catch_up() {
        let mut c = Countdown::new(100);
        assert!(!c.tick(40));
        assert!(!c.tick(40));
        assert!(c.tick(40));
        assert!(c.tick(1000));
        assert!(!c.tick(99));
    }

    // ── Gravity ──

    #[test]
    fn rock_falls_one_cell_per_tick() {
        let mut g = Grid::from_rows(&[
            "#####",
            "# O #",
            "#   #",
            "#   #",
            "#####",
        ]);
        let mut ph = physics();

        ph.tick(&mut g, 1000);
        assert_eq!(rows(&g), ["#####", "#   #", "# O #", "#   #", "#####"]);

        ph.tick(&mut g, 1000);
        assert_eq!(rows(&g), ["#####", "#   #", "#   #", "# O #", "#####"]);

        let report = ph.tick(&mut g, 1000);
        assert_eq!(report.moves, 0);
        assert_eq!(rows(&g), ["#####", "#   #", "#   #", "# O #", "#####"]);
    }

    #[test]
    fn short_dt_is_a_no_op_until_interval_elapses() {
        let mut g = Grid::from_rows(&[
            "#####",
            "# * #",
            "#   #",
            "#####",
        ]);
        let mut ph = physics();
        assert_eq!(ph.tick(&mut g, 50).moves, 0);
        assert!(g.is(p(2, 1), CellKind::Diamond));
        assert_eq!(ph.tick(&mut g, 50).moves, 1);
        assert!(g.is(p(2, 2), CellKind::Diamond));
    }

    #[test]
    fn huge_dt_moves_only_one_cell() {
        let mut g = Grid::from_rows(&[
            "#####",
            "# * #",
            "#   #",
            "#   #",
            "#   #",
            "#####",
        ]);
        let mut ph = physics();
        ph.tick(&mut g, 60_000);
        assert!(g.is(p(2, 2), CellKind::Diamond));
    }

    #[test]
    fn rock_drops_every_interval() {
        let mut g = Grid::from_rows(&[
            "#####",
            "# O #",
            "#   #",
            "#   #",
            "#####",
        ]);
        let mut ph = physics();
        assert_eq!(ph.tick(&mut g, 100).moves, 1);
        assert!(g.is(p(2, 2), CellKind::Rock));
        assert_eq!(ph.tick(&mut g, 100).moves, 1);
        assert!(g.is(p(2, 3), CellKind::Rock));
    }

    #[test]
    fn rocks_and_diamonds_keep_pace_but_rocks_slide_longer() {
        let mut g = Grid::from_rows(&[
            "#####",
            "#O *#",
            "#   #",
            "#   #",
            "#   #",
            "#   #",
            "#####",
        ]);
        let mut ph = physics();
        let mut durations = Vec::new();
        for _ in 0..3 {
            for e in ph.tick(&mut g, 100).events {
                if let GameEvent::TileMoved { kind, duration_ms, .. } = e {
                    durations.push((kind, duration_ms));
                }
            }
        }
        assert!(g.is(p(3, 4), CellKind::Diamond));
        assert!(g.is(p(1, 4), CellKind::Rock));
        assert!(durations.contains(&(CellKind::Rock, 120)));
        assert!(durations.contains(&(CellKind::Diamond, 100)));
    }

    #[test]
    fn slides_run_on_frame_time_and_then_clear() {
        let mut g = Grid::from_rows(&[
            "#####",
            "# O #",
            "#   #",
            "#...#",
            "#####",
        ]);
        let mut ph = physics();
        ph.tick(&mut g, 100);
        let slide = ph.slide_at(&g, p(2, 2)).expect("rock just moved");
        assert_eq!(slide.duration_ms, 120);
        assert_eq!(slide.elapsed_ms, 0);

        ph.tick(&mut g, 16);
        assert_eq!(ph.slide_at(&g, p(2, 2)).map(|s| s.elapsed_ms), Some(16));

        ph.tick(&mut g, 200);
        assert!(ph.slide_at(&g, p(2, 2)).is_none());
        assert!(g.is(p(2, 2), CellKind::Rock));
    }

    #[test]
    fn landed_rock_finishes_its_slide_across_a_pass() {
        let mut g = Grid::from_rows(&[
            "#####",
            "# O #",
            "#   #",
            "#####",
        ]);
        let mut ph = physics();
        ph.tick(&mut g, 100);
        assert!(g.is(p(2, 2), CellKind::Rock));

        // Next pass fires with the rock resting on the wall.
        let report = ph.tick(&mut g, 100);
        assert_eq!(report.moves, 0);
        assert_eq!(ph.slide_at(&g, p(2, 2)).map(|s| s.elapsed_ms), Some(100));

        ph.tick(&mut g, 20);
        assert!(ph.slide_at(&g, p(2, 2)).is_none());
    }

    #[test]
    fn stacked_rocks_cascade_within_one_pass() {
        let mut g = Grid::from_rows(&[
            "#####",
            "# O #",
            "# O #",
            "#   #",
            "#####",
        ]);
        let mut ph = physics();
        ph.tick(&mut g, 1000);
        assert_eq!(rows(&g), ["#####", "#   #", "# O #", "# O #", "#####"]);
    }

    #[test]
    fn roll_goes_left_first() {
        let mut g = Grid::from_rows(&[
            "#####",
            "# O #",
            "# O #",
            "#####",
        ]);
        let mut ph = physics();
        ph.tick(&mut g, 1000);
        assert_eq!(rows(&g), ["#####", "#   #", "#OO #", "#####"]);
    }

    #[test]
    fn no_two_tiles_land_in_one_cell() {
        let mut g = Grid::from_rows(&[
            "#####",
            "#O O#",
            "#O O#",
            "#...#",
            "#####",
        ]);
        let mut ph = physics();
        ph.tick(&mut g, 1000);
        assert_eq!(g.count(|k| k == CellKind::Rock), 4);
        assert_eq!(rows(&g), ["#####", "#  O#", "#OOO#", "#...#", "#####"]);
        assert!(g.is(p(2, 2), CellKind::Rock));
        assert!(g.is(p(3, 1), CellKind::Rock));
        assert!(g.is(p(1, 1), CellKind::Empty));
    }

    #[test]
    fn landing_emits_sound_cue() {
        let mut g = Grid::from_rows(&[
            "#####",
            "# * #",
            "#   #",
            "#####",
        ]);
        let mut ph = physics();
        let report = ph.tick(&mut g, 1000);
        assert!(report.events.contains(&GameEvent::Sound(Sound::DiamondFall)));
        assert!(report.events.iter().any(|e| matches!(
            e,
            GameEvent::TileMoved { kind: CellKind::Diamond, duration_ms: 100, .. }
        )));
    }

    #[test]
    fn falling_onto_player_reports_crush() {
        let mut g = Grid::from_rows(&[
            "#####",
            "# O #",
            "#   #",
            "# P #",
            "#####",
        ]);
        let mut ph = physics();
        let report = ph.tick(&mut g, 1000);
        assert_eq!(report.crushed, Some(p(2, 3)));
        assert!(g.is(p(2, 2), CellKind::Rock));
        assert!(g.is(p(2, 3), CellKind::Player));
    }

    // ── Balloons ──

    #[test]
    fn balloon_rises_then_explodes_exactly_once() {
        let mut g = Grid::from_rows(&[
            "#####",
            "#   #",
            "# B #",
            "#####",
        ]);
        let mut ph = physics();
        let mut explosions = 0;
        for _ in 0..8 {
            let report = ph.tick(&mut g, 1000);
            explosions += report
                .events
                .iter()
                .filter(|e| matches!(e, GameEvent::BalloonExploded { .. }))
                .count();
        }
        assert_eq!(explosions, 1);
        assert!(g.is(p(2, 1), CellKind::ExplosionDiamond));
        assert_eq!(g.count(|k| k == CellKind::Balloon), 0);
        assert_eq!(g.count(|k| k == CellKind::ExplosionDiamond), 1);
    }

    #[test]
    fn resting_balloon_never_explodes() {
        let mut g = Grid::from_rows(&[
            "#####",
            "# B #",
            "#   #",
            "#####",
        ]);
        let mut ph = physics();
        for _ in 0..20 {
            ph.tick(&mut g, 1000);
        }
        assert!(g.is(p(2, 1), CellKind::Balloon));
    }

    #[test]
    fn balloon_under_dirt_stops_quietly() {
        let mut g = Grid::from_rows(&[
            "#####",
            "# . #",
            "#   #",
            "# B #",
            "#####",
        ]);
        let mut ph = physics();
        for _ in 0..6 {
            ph.tick(&mut g, 1000);
        }
        assert!(g.is(p(2, 2), CellKind::Balloon));
    }

    #[test]
    fn pushed_balloon_pops_on_ceiling() {
        let mut g = Grid::from_rows(&[
            "#####",
            "#PB #",
            "#####",
        ]);
        let mut ph = physics();
        ph.mark_pushed(p(1, 1), p(2, 1), CellKind::Balloon);
        let report = ph.tick(&mut g, 1000);
        assert!(report.events.contains(&GameEvent::BalloonExploded { at: p(2, 1) }));
        assert!(g.is(p(2, 1), CellKind::ExplosionDiamond));
    }

    #[test]
    fn state_is_invalid_once_the_cell_changes_kind() {
        let mut g = Grid::from_rows(&[
            "#####",
            "#   #",
            "# B #",
            "#####",
        ]);
        let mut ph = physics();
        ph.tick(&mut g, 1000);
        assert!(ph.states().get(&g, p(2, 1)).map_or(false, |s| s.just_moved));
        g.set(p(2, 1), CellKind::Dirt);
        assert!(ph.states().get(&g, p(2, 1)).is_none());
    }

    #[test]
    fn reset_clears_motion() {
        let mut g = Grid::from_rows(&[
            "#####",
            "#   #",
            "# B #",
            "#####",
        ]);
        let mut ph = physics();
        ph.tick(&mut g, 1000);
        ph.reset();
        assert_eq!(ph.states().len(), 0);
        ph.tick(&mut g, 1000);
        assert!(g.is(p(2, 1), CellKind::Balloon));
    }

    proptest! {
        #[test]
        fn prop_single_rock_drops_one_cell(cols in 3usize..10, height in 4usize..10, xs in 0usize..100, ys in 0usize..100) {
            let x = 1 + xs % (cols - 2).max(1);
            let y = 1 + ys % (height - 3).max(1);
            let mut g = Grid::new(cols, height);
            for pos in g.positions().collect::<Vec<_>>() {
                if !g.is_interior(pos) {
                    g.set(pos, CellKind::Wall);
                }
            }
            prop_assume!(g.is_interior(Pos::new(x, y + 1)));
            g.set(Pos::new(x, y), CellKind::Rock);

            let mut expected = g.clone();
            expected.relocate(Pos::new(x, y), Pos::new(x, y + 1));

            let mut ph = Physics::new(100, 150);
            ph.tick(&mut g, 100);
            prop_assert_eq!(&g, &expected);

            // A second pass keeps dropping it while there is room.
            if g.is_interior(Pos::new(x, y + 2)) {
                expected.relocate(Pos::new(x, y + 1), Pos::new(x, y + 2));
            }
            ph.tick(&mut g, 100);
            prop_assert_eq!(g, expected);
        }
    }
}
