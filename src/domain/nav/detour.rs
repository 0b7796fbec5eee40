/// Detours: deliberately longer alternatives stitched through an offset
/// waypoint, plus the validity gate every non-primary candidate must pass.
///
/// ## Validity gate
///
/// Walking the candidate from start, each step either brings the Manhattan
/// distance to the goal below its previous value (progress) or leaves it
/// more than one cell above the best distance reached so far (backtrack).
///
/// ┌───────────────────────────────────────────────┬──────────┐
/// │ Condition                                      │ Verdict  │
/// ├───────────────────────────────────────────────┼──────────┤
/// │ length > 2.2 × direct length                   │ reject   │
/// │ backtracks / max(progress, 1) > 0.6            │ reject   │
/// │ otherwise                                      │ accept   │
/// └───────────────────────────────────────────────┴──────────┘

use super::{bfs_path, passable, Path};
use crate::domain::grid::{Grid, Pos};

const MAX_LENGTH_RATIO: f32 = 2.2;
const MAX_BACKTRACK_RATIO: f32 = 0.6;

const CONSERVATIVE_RATIO: f32 = 1.3;
const CONSERVATIVE_OFFSETS: [i32; 4] = [1, -1, 2, -2];

const WIDE_RATIO: f32 = 1.8;
const WIDE_MIN_DISTANCE: usize = 12;
const WIDE_OFFSETS: [i32; 2] = [3, 4];
const EIGHT_WAYS: [(i32, i32); 8] = [
    (0, -1), (1, -1), (1, 0), (1, 1),
    (0, 1), (-1, 1), (-1, 0), (-1, -1),
];

pub fn is_valid_detour(candidate: &Path, start: Pos, goal: Pos, direct_len: usize) -> bool {
    if candidate.is_empty() || candidate.goal() != Some(goal) {
        return false;
    }
    if candidate.len() as f32 > direct_len as f32 * MAX_LENGTH_RATIO {
        return false;
    }

    let (progress, backtracks) = progress_profile(candidate, start, goal);
    (backtracks as f32 / progress.max(1) as f32) <= MAX_BACKTRACK_RATIO
}

/// (progress steps, backtrack steps) along the candidate.
fn progress_profile(candidate: &Path, start: Pos, goal: Pos) -> (usize, usize) {
    let mut prev = start.manhattan(goal);
    let mut best = prev;
    let mut progress = 0;
    let mut backtracks = 0;
    for &cell in &candidate.cells {
        let d = cell.manhattan(goal);
        if d < prev {
            progress += 1;
        }
        if d > best + 1 {
            backtracks += 1;
        }
        best = best.min(d);
        prev = d;
    }
    (progress, backtracks)
}

/// `start → via → goal` as two shortest legs. None if either leg fails or the
/// joined route crosses itself.
fn stitch(grid: &Grid, start: Pos, via: Pos, goal: Pos) -> Option<Path> {
    if via == start || via == goal || !passable(grid, via) {
        return None;
    }
    let first = bfs_path(grid, start, via)?;
    let second = bfs_path(grid, via, goal)?;

    let mut cells = first.cells;
    cells.extend(second.cells);
    let path = Path::new(cells);
    if path.self_intersects(start) { None } else { Some(path) }
}

/// Side-step around a point about one third along the direct path, 1–2 cells
/// perpendicular to the local direction of travel. Length ≤ 1.3 × direct.
pub fn conservative_detours(grid: &Grid, start: Pos, goal: Pos, direct: &Path, limit: usize) -> Vec<Path> {
    let len = direct.len();
    if len < 3 {
        return Vec::new();
    }

    let at = len / 3;
    let anchor = direct.cells[at];
    let before = if at == 0 { start } else { direct.cells[at - 1] };
    let horizontal = before.y == anchor.y;
    let max_len = (len as f32 * CONSERVATIVE_RATIO).floor() as usize;

    let mut out = Vec::new();
    for off in CONSERVATIVE_OFFSETS {
        if out.len() >= limit { break; }
        let (dx, dy) = if horizontal { (0, off) } else { (off, 0) };
        let Some(via) = grid.offset(anchor, dx, dy) else { continue };
        let Some(path) = stitch(grid, start, via, goal) else { continue };
        if path.len() > max_len || path == *direct || out.contains(&path) { continue; }
        out.push(path);
    }
    out
}

/// Circumnavigation through a waypoint 3–4 cells from the direct path's
/// midpoint in one of eight directions. Only for goals more than 12 cells
/// away. Length ≤ 1.8 × direct.
pub fn wide_detours(grid: &Grid, start: Pos, goal: Pos, direct: &Path, limit: usize) -> Vec<Path> {
    if start.manhattan(goal) <= WIDE_MIN_DISTANCE || direct.is_empty() {
        return Vec::new();
    }

    let len = direct.len();
    let mid = direct.cells[len / 2];
    let max_len = (len as f32 * WIDE_RATIO).floor() as usize;

    let mut out = Vec::new();
    'outer: for (dx, dy) in EIGHT_WAYS {
        for dist in WIDE_OFFSETS {
            if out.len() >= limit { break 'outer; }
            let Some(via) = grid.offset(mid, dx * dist, dy * dist) else { continue };
            let Some(path) = stitch(grid, start, via, goal) else { continue };
            if path.len() > max_len || path == *direct || out.contains(&path) { continue; }
            out.push(path);
        }
    }
    out
}
