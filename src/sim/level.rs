/// Level supplier.
///
/// ## Sources (priority order):
///   1. `levels_dir` (every `*.txt`, sorted by file name)
///   2. Built-in embedded levels
///
/// ## Single-level format (`.txt`):
///   Optional line 1: `# Level Name`
///   Lines: map rows, all the same width
///
/// ## Tile legend:
///   '#' = Wall          '.' = Dirt          ' ' = Empty
///   'O' = Rock          '*' = Diamond       'P' = Player
///   'B' = Balloon       '+' = ExplosionDiamond
///   '~' = Lava
///
/// Structural problems (ragged rows, missing or duplicate player) are hard
/// errors here. A bad file is logged and skipped, never half-loaded.

use std::path::Path;

use thiserror::Error;

use crate::domain::grid::{Grid, GridError, Pos};
use crate::domain::tile::CellKind;
use crate::sim::world::{Phase, WorldState};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("level i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("level has no map rows")]
    NoRows,
}

/// A validated level: well-formed grid with exactly one player.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    pub name: String,
    pub grid: Grid,
    pub player: Pos,
}

impl Level {
    pub fn new(name: &str, grid: Grid) -> Result<Level, LevelError> {
        let player = grid.validate_player()?;
        Ok(Level { name: name.to_string(), grid, player })
    }

    /// Parse level text (optional `# Name` line, then map rows).
    pub fn parse(content: &str) -> Result<Level, LevelError> {
        let mut name = String::new();
        let mut rows: Vec<&str> = Vec::new();

        for line in content.lines() {
            let line = line.trim_end_matches('\r');
            if rows.is_empty() && name.is_empty() && is_name_line(line) {
                name = line[1..].trim().to_string();
            } else if rows.is_empty() && line.trim().is_empty() {
                continue;
            } else {
                rows.push(line);
            }
        }

        while rows.last().map_or(false, |r| r.trim().is_empty()) {
            rows.pop();
        }
        if rows.is_empty() {
            return Err(LevelError::NoRows);
        }

        if name.is_empty() {
            name = "Unnamed Cavern".to_string();
        }
        Level::new(&name, Grid::parse(&rows)?)
    }

    /// Build from a flat array of numeric kind codes.
    pub fn from_codes(name: &str, cols: usize, rows: usize, codes: &[u8]) -> Result<Level, LevelError> {
        Level::new(name, Grid::from_codes(cols, rows, codes)?)
    }
}

/// Distinguish `# Level Name` from `#####` or `# O *#` (map data).
/// A name line is `# ` plus text that either holds a non-glyph character
/// or does not close with a wall the way every map row does.
fn is_name_line(line: &str) -> bool {
    let Some(text) = line.strip_prefix("# ") else { return false };
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    text.chars().any(|c| CellKind::from_glyph(c).is_none()) || !text.ends_with('#')
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// All playable levels: `dir` if it holds any valid level, else embedded.
pub fn load_levels(dir: &Path) -> Vec<Level> {
    let from_dir = load_from_directory(dir);
    if !from_dir.is_empty() {
        log::info!("{} level(s) from {}", from_dir.len(), dir.display());
        return from_dir;
    }
    embedded_levels()
}

/// Install level `idx` into the world. Preserves score and lives.
/// Past the last level the session is complete.
pub fn load_level(world: &mut WorldState, levels: &[Level], idx: usize) {
    let Some(level) = levels.get(idx) else {
        world.phase = Phase::GameComplete;
        return;
    };

    world.install(level.grid.clone(), level.player);
    world.current_level = idx;
    world.total_levels = levels.len();
    world.level_name = level.name.clone();
    world.set_message(&level.name, 2000);
    log::info!("level {}: {} ({}x{})", idx + 1, level.name, level.grid.cols(), level.grid.rows());
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Vec<Level> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return Vec::new(),
    };

    let mut files: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "txt"))
        .collect();
    files.sort();

    let mut levels = Vec::new();
    for path in files {
        match read_level_file(&path) {
            Ok(level) => levels.push(level),
            Err(e) => log::warn!("skipping level {}: {e}", path.display()),
        }
    }
    levels
}

fn read_level_file(path: &Path) -> Result<Level, LevelError> {
    let content = std::fs::read_to_string(path)?;
    Level::parse(&content)
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

pub fn embedded_levels() -> Vec<Level> {
    [
        make_embedded("Level 1 - First Dig", &[
            "####################",
            "#P.....O......*....#",
            "#......O......O....#",
            "#..*...............#",
            "#.....OOO.....*....#",
            "#...........~~~....#",
            "#....*.............#",
            "####################",
        ]),
        make_embedded("Level 2 - Rockfall", &[
            "######################",
            "#P.  O O O O O   ....#",
            "#...  . . . . .  .*..#",
            "#.*.  *   *   *  ....#",
            "#.....#########......#",
            "#..O.......  .....O..#",
            "#..*......~~~.....*..#",
            "######################",
        ]),
        make_embedded("Level 3 - Balloon Cave", &[
            "######################",
            "#.....#.......#......#",
            "#.*.  #  ...  #  .*..#",
            "#.... B  .*.  B  ....#",
            "#....   ..O..   .....#",
            "#..O..  .....  ..O...#",
            "#..*.. ~~...~~ ..*...#",
            "#P........B..........#",
            "######################",
        ]),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn make_embedded(name: &str, map: &[&str]) -> Option<Level> {
    match Grid::parse(map).map_err(LevelError::from).and_then(|g| Level::new(name, g)) {
        Ok(level) => Some(level),
        Err(e) => {
            log::error!("embedded level {name:?} is malformed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    #[test]
    fn parse_with_name_line() {
        let level = Level::parse("# Tiny\n#####\n#P *#\n#####\n").unwrap();
        assert_eq!(level.name, "Tiny");
        assert_eq!(level.player, Pos::new(1, 1));
        assert_eq!(level.grid.cols(), 5);
        assert_eq!(level.grid.rows(), 3);
    }

    #[test]
    fn map_rows_are_not_names() {
        assert!(!is_name_line("#####"));
        assert!(!is_name_line("#P.*O#"));
        assert!(!is_name_line("#B ~+#"));
        assert!(!is_name_line("# O *#"));
        assert!(!is_name_line("#   #"));
        assert!(!is_name_line("#P?*#"));
        assert!(!is_name_line("# "));
        assert!(is_name_line("# Cave 2"));
        assert!(is_name_line("# BOP"));
        assert!(is_name_line("# Vault #3"));
    }

    #[test]
    fn heading_made_of_glyphs_is_still_a_name() {
        let level = Level::parse("# BOP\n#####\n#P  #\n#####\n").unwrap();
        assert_eq!(level.name, "BOP");
        assert_eq!(level.grid.rows(), 3);
    }

    #[test]
    fn first_row_with_unknown_glyph_is_map_data() {
        let level = Level::parse("#P?*#\n#####\n").unwrap();
        assert_eq!(level.name, "Unnamed Cavern");
        assert_eq!(level.grid.rows(), 2);
        assert_eq!(level.grid.kind_at(Pos::new(2, 0)), CellKind::Empty);
        assert_eq!(level.grid.kind_at(Pos::new(3, 0)), CellKind::Diamond);
    }

    #[test]
    fn unnamed_level_and_trailing_blank_lines() {
        let level = Level::parse("#####\n#P  #\n#####\n\n\n").unwrap();
        assert_eq!(level.name, "Unnamed Cavern");
        assert_eq!(level.grid.rows(), 3);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Level::parse("#####\n#P #\n#####\n").unwrap_err();
        assert!(matches!(
            err,
            LevelError::Grid(GridError::RaggedRow { row: 1, expected: 5, actual: 4 })
        ));
    }

    #[test]
    fn player_count_is_checked() {
        assert!(matches!(
            Level::parse("#####\n#  *#\n#####\n"),
            Err(LevelError::Grid(GridError::NoPlayer))
        ));
        assert!(matches!(
            Level::parse("#####\n#PP #\n#####\n"),
            Err(LevelError::Grid(GridError::MultiplePlayers { count: 2 }))
        ));
        assert!(matches!(Level::parse("# Only a name\n"), Err(LevelError::NoRows)));
    }

    #[test]
    fn from_codes_validates() {
        let w = CellKind::Wall.code();
        let p = CellKind::Player.code();
        let e = CellKind::Empty.code();
        let codes = [w, w, w, w, p, w, w, e, w];
        let level = Level::from_codes("codes", 3, 3, &codes).unwrap();
        assert_eq!(level.player, Pos::new(1, 1));
        assert!(Level::from_codes("short", 3, 3, &codes[..8]).is_err());
    }

    #[test]
    fn embedded_levels_are_well_formed() {
        let levels = embedded_levels();
        assert_eq!(levels.len(), 3);
        for level in &levels {
            let g = &level.grid;
            assert!(g.has_collectibles(), "{} has nothing to collect", level.name);
            for p in g.positions() {
                if !g.is_interior(p) {
                    assert!(g.is(p, CellKind::Wall), "{} border open at {:?}", level.name, p);
                }
            }
        }
    }

    #[test]
    fn directory_levels_sorted_and_bad_files_skipped() {
        let dir = std::env::temp_dir().join(format!("caverndash-levels-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.txt"), "# Second\n#####\n#P *#\n#####\n").unwrap();
        std::fs::write(dir.join("a.txt"), "# First\n#####\n#P* #\n#####\n").unwrap();
        std::fs::write(dir.join("c.txt"), "# Broken\n#####\n#P#\n#####\n").unwrap();
        std::fs::write(dir.join("notes.md"), "ignored").unwrap();

        let levels = load_levels(&dir);
        std::fs::remove_dir_all(&dir).unwrap();

        let names: Vec<_> = levels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["First", "Second"]);
    }

    #[test]
    fn missing_directory_falls_back_to_embedded() {
        let levels = load_levels(Path::new("/nonexistent/caverndash/levels"));
        assert_eq!(levels, embedded_levels());
    }

    #[test]
    fn load_level_past_the_end_completes_the_game() {
        let levels = embedded_levels();
        let mut world = WorldState::new(&GameConfig::default());
        world.score = 12;

        load_level(&mut world, &levels, 1);
        assert_eq!(world.current_level, 1);
        assert_eq!(world.total_levels, 3);
        assert_eq!(world.player.pos(), levels[1].player);
        assert_eq!(world.score, 12);
        assert_eq!(world.phase, Phase::Playing);

        load_level(&mut world, &levels, 3);
        assert_eq!(world.phase, Phase::GameComplete);
    }
}
