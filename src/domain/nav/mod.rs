/// Navigator — click-to-move route planning.
///
/// Shared passability: every cell except Wall and Rock. Lava and balloons are
/// planned through; what happens on arrival is the controller's business.
///
/// Strategies:
///   - **Single**     — one shortest BFS path.
///   - **Multiple**   — multi-path BFS, shortest groups first.
///   - **Alternate**  — direct path + heuristic-biased search + blocking re-route.
///   - **Randomized** — direct path + BFS runs with shuffled neighbour order.
///   - **Detour**     — direct path + conservative and wide detours.
///
/// Every non-primary candidate goes through `detour::is_valid_detour`.
/// Unreachable, degenerate or out-of-bounds requests produce an empty list.

mod bfs;
mod detour;
mod search;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::grid::{Dir, Grid, Pos};

pub use bfs::{bfs_path, multi_bfs, randomized_bfs};
pub use detour::{conservative_detours, is_valid_detour, wide_detours};
pub use search::{blocking_reroutes, heuristic_path, TempBlock};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Single,
    #[default]
    Multiple,
    Alternate,
    Randomized,
    Detour,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::Single,
        Strategy::Multiple,
        Strategy::Alternate,
        Strategy::Randomized,
        Strategy::Detour,
    ];

    pub fn next(self) -> Strategy {
        let i = Strategy::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Strategy::ALL[(i + 1) % Strategy::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Strategy::Single => "single",
            Strategy::Multiple => "multiple",
            Strategy::Alternate => "alternate",
            Strategy::Randomized => "randomized",
            Strategy::Detour => "detour",
        }
    }
}

/// Start-exclusive, goal-inclusive cell sequence.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Path {
    pub cells: Vec<Pos>,
}

impl Path {
    pub fn new(cells: Vec<Pos>) -> Self {
        Path { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn goal(&self) -> Option<Pos> {
        self.cells.last().copied()
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.cells.contains(&pos)
    }

    /// True if any cell (start included) is visited twice.
    pub fn self_intersects(&self, start: Pos) -> bool {
        let mut seen = std::collections::HashSet::with_capacity(self.cells.len() + 1);
        seen.insert(start);
        !self.cells.iter().all(|p| seen.insert(*p))
    }

    /// Every step is one orthogonal cell.
    pub fn is_connected(&self, start: Pos) -> bool {
        let mut prev = start;
        for &p in &self.cells {
            if !prev.is_adjacent(p) { return false; }
            prev = p;
        }
        true
    }
}

#[inline]
pub fn passable(grid: &Grid, pos: Pos) -> bool {
    grid.get(pos).map_or(false, |k| k.is_walkable())
}

pub(crate) fn neighbours(grid: &Grid, pos: Pos, order: [Dir; 4]) -> impl Iterator<Item = Pos> + '_ {
    order.into_iter().filter_map(move |d| grid.step(pos, d)).filter(move |&p| passable(grid, p))
}

/// Request sanity shared by every strategy.
fn routable(grid: &Grid, start: Pos, goal: Pos) -> bool {
    start != goal && grid.contains(start) && passable(grid, goal)
}

/// Drop paths whose cell sequence already appeared, keeping first occurrences.
pub fn dedup_paths(paths: Vec<Path>) -> Vec<Path> {
    let mut seen = std::collections::HashSet::new();
    paths.into_iter().filter(|p| seen.insert(p.cells.clone())).collect()
}

// ══════════════════════════════════════════════════════════════
// Navigator
// ══════════════════════════════════════════════════════════════

pub struct Navigator {
    pub max_paths: usize,
    pub shuffle_probability: f64,
    rng: Pcg32,
}

impl Navigator {
    pub fn new(max_paths: usize, shuffle_probability: f64, seed: u64) -> Self {
        Navigator {
            max_paths: max_paths.max(1),
            shuffle_probability: shuffle_probability.clamp(0.0, 1.0),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Plan up to `max_paths` routes. The grid is borrowed mutably only for
    /// the blocking re-route, which restores every cell it touches.
    pub fn plan(&mut self, grid: &mut Grid, start: Pos, goal: Pos, strategy: Strategy) -> Vec<Path> {
        if !routable(grid, start, goal) {
            return Vec::new();
        }

        let paths = match strategy {
            Strategy::Single => bfs_path(grid, start, goal).into_iter().collect(),
            Strategy::Multiple => multi_bfs(grid, start, goal, self.max_paths),
            Strategy::Alternate => self.alternate(grid, start, goal),
            Strategy::Randomized => self.randomized(grid, start, goal),
            Strategy::Detour => self.detour(grid, start, goal),
        };

        log::debug!(
            "navigator {}: {:?} -> {:?}, {} path(s)",
            strategy.label(), start, goal, paths.len()
        );
        paths
    }

    fn alternate(&mut self, grid: &mut Grid, start: Pos, goal: Pos) -> Vec<Path> {
        let Some(direct) = bfs_path(grid, start, goal) else { return Vec::new() };
        let mut found = vec![direct.clone()];

        let mut candidates: Vec<Path> = heuristic_path(grid, start, goal).into_iter().collect();
        candidates.extend(blocking_reroutes(grid, start, goal, &direct, self.max_paths * 2));

        self.admit(&mut found, candidates, start, goal, direct.len());
        found
    }

    fn randomized(&mut self, grid: &Grid, start: Pos, goal: Pos) -> Vec<Path> {
        let Some(direct) = bfs_path(grid, start, goal) else { return Vec::new() };
        let mut found = vec![direct.clone()];

        let attempts = self.max_paths * 4;
        let mut candidates = Vec::with_capacity(attempts);
        for _ in 0..attempts {
            if let Some(p) = randomized_bfs(grid, start, goal, &mut self.rng, self.shuffle_probability) {
                candidates.push(p);
            }
        }

        self.admit(&mut found, candidates, start, goal, direct.len());
        found
    }

    fn detour(&mut self, grid: &Grid, start: Pos, goal: Pos) -> Vec<Path> {
        let Some(direct) = bfs_path(grid, start, goal) else { return Vec::new() };
        let mut found = vec![direct.clone()];

        let conservative = conservative_detours(grid, start, goal, &direct, self.max_paths);
        self.admit(&mut found, conservative, start, goal, direct.len());

        if found.len() < self.max_paths {
            let wide = wide_detours(grid, start, goal, &direct, self.max_paths);
            self.admit(&mut found, wide, start, goal, direct.len());
        }
        found
    }

    /// Append gate-passing, previously unseen candidates up to `max_paths`.
    fn admit(&self, found: &mut Vec<Path>, candidates: Vec<Path>, start: Pos, goal: Pos, direct_len: usize) {
        for c in candidates {
            if found.len() >= self.max_paths { break; }
            if found.contains(&c) { continue; }
            if !is_valid_detour(&c, start, goal, direct_len) { continue; }
            found.push(c);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
