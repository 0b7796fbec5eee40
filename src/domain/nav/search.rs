/// Heuristic-biased priority search and the blocking re-route.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::{bfs_path, neighbours, passable, Path};
use crate::domain::grid::{Dir, Grid, Pos};
use crate::domain::tile::CellKind;

// ── Heuristic-biased search ──

/// Priority search on `steps + manhattan(goal)`. Ties go to the node closer
/// to the goal, which yields a straighter-looking route than plain BFS.
pub fn heuristic_path(grid: &Grid, start: Pos, goal: Pos) -> Option<Path> {
    if start == goal || !grid.contains(start) || !passable(grid, goal) {
        return None;
    }

    let cols = grid.cols();
    let idx = |p: Pos| p.y * cols + p.x;
    let mut g_score = vec![usize::MAX; grid.len()];
    let mut parent: Vec<Option<Pos>> = vec![None; grid.len()];
    let mut closed = vec![false; grid.len()];

    // (Reverse(f), Reverse(h), x, y): max-heap popping lowest f, then lowest h.
    let mut open: BinaryHeap<(Reverse<usize>, Reverse<usize>, usize, usize)> = BinaryHeap::new();
    g_score[idx(start)] = 0;
    let h0 = start.manhattan(goal);
    open.push((Reverse(h0), Reverse(h0), start.x, start.y));

    while let Some((_, _, x, y)) = open.pop() {
        let cur = Pos::new(x, y);
        if closed[idx(cur)] { continue; }
        closed[idx(cur)] = true;

        if cur == goal {
            let mut cells = vec![goal];
            let mut at = goal;
            while let Some(prev) = parent[idx(at)] {
                if prev == start { break; }
                cells.push(prev);
                at = prev;
            }
            cells.reverse();
            return Some(Path::new(cells));
        }

        let g = g_score[idx(cur)];
        for next in neighbours(grid, cur, Dir::ALL) {
            let i = idx(next);
            if closed[i] || g + 1 >= g_score[i] { continue; }
            g_score[i] = g + 1;
            parent[i] = Some(cur);
            let h = next.manhattan(goal);
            open.push((Reverse(g + 1 + h), Reverse(h), next.x, next.y));
        }
    }
    None
}

// ── Scoped obstruction ──

/// Temporarily turns one cell into Wall. The prior kind is restored when the
/// guard drops, on every exit path.
pub struct TempBlock<'a> {
    grid: &'a mut Grid,
    pos: Pos,
    prior: CellKind,
}

impl<'a> TempBlock<'a> {
    pub fn new(grid: &'a mut Grid, pos: Pos) -> Self {
        let prior = grid.kind_at(pos);
        grid.set(pos, CellKind::Wall);
        TempBlock { grid, pos, prior }
    }

    pub fn grid(&self) -> &Grid {
        &*self.grid
    }
}

impl Drop for TempBlock<'_> {
    fn drop(&mut self) {
        self.grid.set(self.pos, self.prior);
    }
}

/// Block each interior waypoint of `direct` in turn and re-plan. Distinct
/// results are returned in waypoint order, at most `limit`.
pub fn blocking_reroutes(grid: &mut Grid, start: Pos, goal: Pos, direct: &Path, limit: usize) -> Vec<Path> {
    let mut out: Vec<Path> = Vec::new();
    for &waypoint in direct.cells.iter().filter(|&&c| c != goal) {
        if out.len() >= limit { break; }
        let blocked = TempBlock::new(grid, waypoint);
        if let Some(path) = bfs_path(blocked.grid(), start, goal) {
            if path != *direct && !out.contains(&path) {
                out.push(path);
            }
        }
    }
    out
}
