/// WorldState: the complete state of a running session.
///
/// ## Grid layers
///
///   - `base_grid` — the level as loaded. **Never mutated** after install.
///   - `grid`      — the authoritative live map (physics, pushes, pickups).
///
/// `restart_level` resets `grid = base_grid.clone()`.
///
/// ## Session machine
///
/// ┌───────────────┬──────────────────────────┬────────────────────┐
/// │ Phase          │ Left by                   │ Goes to             │
/// ├───────────────┼──────────────────────────┼────────────────────┤
/// │ Playing        │ last collectible taken    │ LevelComplete       │
/// │ Playing        │ lives reach zero          │ GameOver            │
/// │ LevelComplete  │ confirm                   │ Playing / Complete  │
/// │ GameOver       │ confirm                   │ Playing (level 0)   │
/// │ GameComplete   │ confirm                   │ Playing (level 0)   │
/// └───────────────┴──────────────────────────┴────────────────────┘

use crate::config::GameConfig;
use crate::domain::entity::Player;
use crate::domain::grid::{Grid, Pos};
use crate::domain::nav::{Navigator, Path, Strategy};
use crate::sim::scheduler::Physics;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    LevelComplete,
    GameOver,
    GameComplete,
}

pub struct WorldState {
    // ── Grid layers ──
    pub grid: Grid,
    /// Level as installed. Restart copies it back into `grid`.
    pub base_grid: Grid,

    // ── Entities ──
    pub player: Player,
    /// Player cell in `base_grid`.
    pub spawn: Pos,
    pub physics: Physics,

    // ── Navigation ──
    pub navigator: Navigator,
    pub strategy: Strategy,
    /// Routes offered after the last click, shortest first.
    pub offered: Vec<Path>,
    pub selected: usize,
    /// Player cell when `offered` was planned.
    pub plan_origin: Option<Pos>,

    // ── Timing ──
    pub player_move_ms: u32,

    // ── Meta ──
    pub phase: Phase,
    pub score: u32,
    pub lives: u32,
    pub start_lives: u32,
    pub paused: bool,
    pub current_level: usize,
    pub total_levels: usize,
    pub level_name: String,
    pub tick: u64,

    // ── UI ──
    pub message: String,
    pub message_timer_ms: u32,
    pub has_save: bool,
}

// ── Construction ──

impl WorldState {
    /// An empty session. A level must be installed before stepping.
    pub fn new(config: &GameConfig) -> Self {
        let nav = &config.navigation;
        let grid = Grid::new(0, 0);
        WorldState {
            base_grid: grid.clone(),
            grid,
            player: Player::new(0, 0),
            spawn: Pos::new(0, 0),
            physics: Physics::new(config.timing.fall_interval_ms, config.timing.float_interval_ms),
            navigator: Navigator::new(nav.max_paths, nav.shuffle_probability, nav.seed),
            strategy: nav.strategy,
            offered: Vec::new(),
            selected: 0,
            plan_origin: None,
            player_move_ms: config.timing.player_move_ms,
            phase: Phase::Playing,
            score: 0,
            lives: config.lives,
            start_lives: config.lives,
            paused: false,
            current_level: 0,
            total_levels: 0,
            level_name: String::new(),
            tick: 0,
            message: String::new(),
            message_timer_ms: 0,
            has_save: false,
        }
    }

    /// Replace the live map wholesale. `player` must hold the Player cell.
    /// Score, lives and level metadata are left to the caller.
    pub fn install(&mut self, grid: Grid, player: Pos) {
        self.base_grid = grid.clone();
        self.grid = grid;
        self.player = Player::new(player.x, player.y);
        self.spawn = player;
        self.reset_runtime();
    }

    /// Clear timers, tile states, routes and pause. Grid is untouched.
    pub fn reset_runtime(&mut self) {
        self.physics.reset();
        self.player.move_cooldown_ms = 0;
        self.player.route = None;
        self.clear_offered();
        self.paused = false;
        self.tick = 0;
        self.phase = Phase::Playing;
    }

    /// Build a playing session straight from glyph rows.
    #[cfg(test)]
    pub fn from_rows(rows: &[&str]) -> Self {
        let grid = Grid::from_rows(rows);
        let player = grid.validate_player().expect("test grid needs one player");
        let mut world = WorldState::new(&GameConfig::default());
        world.install(grid, player);
        world.total_levels = 1;
        world
    }
}

// ── Offered paths ──

impl WorldState {
    pub fn clear_offered(&mut self) {
        self.offered.clear();
        self.selected = 0;
        self.plan_origin = None;
    }

    pub fn selected_path(&self) -> Option<&Path> {
        self.offered.get(self.selected)
    }
}

// ── Messages ──

impl WorldState {
    pub fn set_message(&mut self, msg: &str, duration_ms: u32) {
        self.message = msg.to_string();
        self.message_timer_ms = duration_ms;
    }
}
