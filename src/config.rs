/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::domain::nav::Strategy;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub navigation: NavConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    pub lives: u32,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub frame_ms: u64,
    pub fall_interval_ms: u32,   // falling kinds (Rock, Diamond)
    pub float_interval_ms: u32,  // floating kinds (Balloon)
    pub player_move_ms: u32,     // controller cooldown, keys and route steps
}

#[derive(Clone, Debug)]
pub struct NavConfig {
    pub strategy: Strategy,
    pub max_paths: usize,
    pub shuffle_probability: f64,
    pub seed: u64,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub restart: Vec<String>,
    pub next_path: Vec<String>,
    pub next_strategy: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    navigation: TomlNavigation,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_frame")]
    frame_ms: u64,
    #[serde(default = "default_fall_interval")]
    fall_interval_ms: u32,
    #[serde(default = "default_float_interval")]
    float_interval_ms: u32,
    #[serde(default = "default_player_move")]
    player_move_ms: u32,
}

#[derive(Deserialize, Debug)]
struct TomlNavigation {
    #[serde(default)]
    strategy: Strategy,
    #[serde(default = "default_max_paths")]
    max_paths: usize,
    #[serde(default = "default_shuffle")]
    shuffle_probability: f64,
    #[serde(default = "default_seed")]
    seed: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_next_path")]
    next_path: Vec<String>,
    #[serde(default = "default_next_strategy")]
    next_strategy: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_lives")]
    lives: u32,
}

// ── Defaults ──

fn default_frame() -> u64 { 16 }
fn default_fall_interval() -> u32 { 100 }
fn default_float_interval() -> u32 { 150 }  // balloons drift slower than rocks drop
fn default_player_move() -> u32 { 120 }

fn default_max_paths() -> usize { 3 }
fn default_shuffle() -> f64 { 0.5 }
fn default_seed() -> u64 { 7 }

fn default_confirm() -> Vec<String> { vec!["Start".into(), "A".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_restart() -> Vec<String> { vec!["Y".into()] }
fn default_next_path() -> Vec<String> { vec!["R1".into()] }
fn default_next_strategy() -> Vec<String> { vec!["L1".into()] }

fn default_levels_dir() -> String { "levels".into() }
fn default_lives() -> u32 { 3 }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            frame_ms: default_frame(),
            fall_interval_ms: default_fall_interval(),
            float_interval_ms: default_float_interval(),
            player_move_ms: default_player_move(),
        }
    }
}

impl Default for TomlNavigation {
    fn default() -> Self {
        TomlNavigation {
            strategy: Strategy::default(),
            max_paths: default_max_paths(),
            shuffle_probability: default_shuffle(),
            seed: default_seed(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            cancel: default_cancel(),
            restart: default_restart(),
            next_path: default_next_path(),
            next_strategy: default_next_strategy(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            lives: default_lives(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), PathBuf::from(default_levels_dir()))
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) XDG data home.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);

        // Resolve levels directory
        let levels_dir_str = toml_cfg.general.levels_dir.clone();
        let levels_dir = if PathBuf::from(&levels_dir_str).is_absolute() {
            PathBuf::from(&levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(&levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(&levels_dir_str))
        };

        GameConfig::from_toml(toml_cfg, levels_dir)
    }

    /// Parse config text directly. Errors fall back to defaults.
    pub fn parse(text: &str) -> Self {
        let cfg = parse_toml(text);
        let levels_dir = PathBuf::from(&cfg.general.levels_dir);
        GameConfig::from_toml(cfg, levels_dir)
    }

    fn from_toml(cfg: TomlConfig, levels_dir: PathBuf) -> Self {
        GameConfig {
            timing: TimingConfig {
                frame_ms: cfg.timing.frame_ms.max(1),
                fall_interval_ms: cfg.timing.fall_interval_ms.max(1),
                float_interval_ms: cfg.timing.float_interval_ms.max(1),
                player_move_ms: cfg.timing.player_move_ms,
            },
            navigation: NavConfig {
                strategy: cfg.navigation.strategy,
                max_paths: cfg.navigation.max_paths.max(1),
                shuffle_probability: cfg.navigation.shuffle_probability.clamp(0.0, 1.0),
                seed: cfg.navigation.seed,
            },
            gamepad: GamepadConfig {
                confirm: cfg.gamepad.confirm,
                cancel: cfg.gamepad.cancel,
                restart: cfg.gamepad.restart,
                next_path: cfg.gamepad.next_path,
                next_strategy: cfg.gamepad.next_strategy,
            },
            levels_dir,
            lives: cfg.general.lives.max(1),
        }
    }
}

/// Candidate directories to search: exe dir + CWD + XDG data home (deduplicated).
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/caverndash)
    if let Some(xdg) = data_home() {
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// `~/.local/share/caverndash`, if HOME is set.
pub fn data_home() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local/share/caverndash"))
}

const LOG_FILE: &str = "caverndash.log";

/// Where the log goes while the terminal is in raw mode.
pub fn log_path() -> PathBuf {
    log_path_in(data_home())
}

fn log_path_in(home: Option<PathBuf>) -> PathBuf {
    home.filter(|dir| std::fs::create_dir_all(dir).is_ok())
        .unwrap_or_else(std::env::temp_dir)
        .join(LOG_FILE)
}

/// Open the log for appending, creating it if needed.
pub fn open_log(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    log::info!("config: {}", path.display());
                    return parse_toml(&text);
                }
                Err(e) => {
                    log::warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::warn!("config.toml parse error, using defaults: {e}");
            TomlConfig::default()
        }
    }
}
