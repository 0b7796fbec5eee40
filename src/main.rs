/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use env_logger::{Env, Target};

use config::GameConfig;
use sim::controller::{cycle_path, cycle_strategy, plan_paths};
use sim::level::{load_level, load_levels, Level};
use sim::save;
use sim::step::{self, FrameInput};
use sim::world::{Phase, WorldState};
use ui::gamepad::{GamepadState, PadCommand};
use ui::input::InputState;
use ui::renderer::{screen_to_cell, Renderer};
use ui::sound::{self as sfx, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
/// Longest simulated frame after a stall (window drag, suspend).
const MAX_FRAME_MS: u32 = 250;

fn main() {
    init_logging();

    let config = GameConfig::load();
    let levels = load_levels(&config.levels_dir);

    let mut world = WorldState::new(&config);
    load_level(&mut world, &levels, 0);
    world.has_save = save::has_save();

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &levels, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Cavern Dash!");
    println!("Final Score: {}", world.score);
}

/// Log to a file: stderr would draw over the alternate screen.
fn init_logging() {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    let path = config::log_path();
    match config::open_log(&path) {
        Ok(file) => builder.target(Target::Pipe(Box::new(file))),
        Err(e) => {
            eprintln!("Cannot open log {}: {e}", path.display());
            builder.target(Target::Pipe(Box::new(std::io::sink())))
        }
    };
    builder.init();
}

fn game_loop(
    world: &mut WorldState,
    levels: &[Level],
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let tick_rate = Duration::from_millis(config.timing.frame_ms);
    let mut last_tick = Instant::now();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, levels, &kb, &gp) {
            break;
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick_rate {
            let dt_ms = (elapsed.as_millis() as u32).min(MAX_FRAME_MS);
            let input = FrameInput { movement: kb.movement().or_else(|| gp.movement()) };
            let events = step::step(world, input, dt_ms);
            if let Some(engine) = sound {
                sfx::play_events(engine, &events);
            }
            last_tick = Instant::now();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

// ── Key Constants ──

const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_NEXT_PATH: &[KeyCode] = &[KeyCode::Tab];
const KEYS_STRATEGY: &[KeyCode] = &[KeyCode::Char('v'), KeyCode::Char('V')];

/// Start over from level 0 with full lives.
fn start_new_game(world: &mut WorldState, levels: &[Level]) {
    world.score = 0;
    world.lives = world.start_lives;
    load_level(world, levels, 0);
}

fn save_now(world: &mut WorldState) {
    match save::save_game(world) {
        Ok(_) => {
            world.has_save = true;
            world.set_message(&format!("Saved (Cave {})", world.current_level + 1), 1500);
        }
        Err(e) => {
            log::error!("save failed: {e}");
            world.set_message("Save failed!", 1500);
        }
    }
}

/// Load the saved level, then lay the snapshot over it. A rejected
/// snapshot puts the session back where it was.
fn restore_from_save(world: &mut WorldState, levels: &[Level]) {
    let snap = match save::load_save() {
        Ok(Some(snap)) => snap,
        Ok(None) => {
            world.set_message("No save yet", 1500);
            return;
        }
        Err(e) => {
            log::warn!("cannot read save: {e}");
            world.set_message("Save unreadable", 1500);
            return;
        }
    };

    let before = save::capture_snapshot(world);
    let before_level = world.current_level;
    let before_phase = world.phase;
    if snap.level < levels.len() {
        load_level(world, levels, snap.level);
    }
    match save::restore_snapshot(world, &snap) {
        Ok(()) => world.set_message(&format!("Loaded (Cave {})", snap.level + 1), 1500),
        Err(e) => {
            log::warn!("save rejected: {e}");
            load_level(world, levels, before_level);
            if let Err(e) = save::restore_snapshot(world, &before) {
                log::error!("could not return to the running game: {e}");
            }
            world.phase = before_phase;
            world.set_message("Save rejected", 1500);
        }
    }
}

/// Session keys. Returns true when the game should exit.
fn handle_meta(world: &mut WorldState, levels: &[Level], kb: &InputState, gp: &GamepadState) -> bool {
    let confirm = kb.any_pressed(KEYS_CONFIRM) || gp.pressed(PadCommand::Confirm);
    let esc = kb.any_pressed(&[KeyCode::Esc]) || gp.pressed(PadCommand::Quit);

    // ESC: auto-save a running game, then quit
    if esc {
        if world.phase == Phase::Playing {
            save_now(world);
        }
        return true;
    }

    // F5 / F9 work in every phase
    if kb.any_pressed(&[KeyCode::F(5)]) {
        if world.phase == Phase::Playing {
            save_now(world);
        } else {
            world.set_message("Nothing to save", 1500);
        }
        return false;
    }
    if kb.any_pressed(&[KeyCode::F(9)]) {
        restore_from_save(world, levels);
        return false;
    }

    match world.phase {
        Phase::Playing => {}
        Phase::LevelComplete => {
            if confirm {
                let next = world.current_level + 1;
                load_level(world, levels, next);
            }
            return false;
        }
        Phase::GameOver | Phase::GameComplete => {
            if confirm {
                start_new_game(world, levels);
            }
            return false;
        }
    }

    // F1: Pause / Resume
    if kb.any_pressed(&[KeyCode::F(1)]) {
        world.paused = !world.paused;
        return false;
    }
    if world.paused {
        return false; // Block all other input while paused
    }

    if kb.any_pressed(KEYS_RESTART) || gp.pressed(PadCommand::Restart) {
        step::restart_level(world);
        return false;
    }

    if kb.any_pressed(KEYS_NEXT_PATH) || gp.pressed(PadCommand::NextRoute) {
        if let Some(idx) = cycle_path(world) {
            let msg = format!("Route {}/{}", idx + 1, world.offered.len());
            world.set_message(&msg, 1000);
        }
    }
    if kb.any_pressed(KEYS_STRATEGY) || gp.pressed(PadCommand::NextStrategy) {
        cycle_strategy(world);
    }

    // Mouse: last click of the frame wins
    if let Some(&(col, row)) = kb.clicks.last() {
        if let Some(goal) = screen_to_cell(&world.grid, col, row) {
            let found = plan_paths(world, goal);
            log::debug!("{found} route(s) to {goal:?} with {}", world.strategy.label());
        }
    }

    false
}
