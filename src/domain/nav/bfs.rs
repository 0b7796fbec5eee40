/// Breadth-first route search: single shortest path, multi-path enumeration
/// and randomized neighbour order.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;

use super::{neighbours, passable, Path};
use crate::domain::grid::{Dir, Grid, Pos};

/// Upper bound on search nodes for the multi-path enumeration.
const NODE_BUDGET: usize = 20_000;

/// Shortest path, or None if unreachable.
pub fn bfs_path(grid: &Grid, start: Pos, goal: Pos) -> Option<Path> {
    bfs_ordered(grid, start, goal, |_| {})
}

/// BFS whose neighbour order is shuffled with probability `p` at each
/// expansion. Not necessarily shortest.
pub fn randomized_bfs<R: Rng>(grid: &Grid, start: Pos, goal: Pos, rng: &mut R, p: f64) -> Option<Path> {
    bfs_ordered(grid, start, goal, |order| {
        if rng.random_bool(p) {
            order.shuffle(&mut *rng);
        }
    })
}

fn bfs_ordered(
    grid: &Grid,
    start: Pos,
    goal: Pos,
    mut reorder: impl FnMut(&mut [Dir; 4]),
) -> Option<Path> {
    if start == goal || !grid.contains(start) || !passable(grid, goal) {
        return None;
    }

    let cols = grid.cols();
    let idx = |p: Pos| p.y * cols + p.x;
    let mut parent: Vec<Option<Pos>> = vec![None; grid.len()];
    let mut visited = vec![false; grid.len()];
    visited[idx(start)] = true;

    let mut queue = VecDeque::with_capacity(64);
    queue.push_back(start);

    while let Some(cur) = queue.pop_front() {
        let mut order = Dir::ALL;
        reorder(&mut order);
        for next in neighbours(grid, cur, order) {
            if visited[idx(next)] { continue; }
            visited[idx(next)] = true;
            parent[idx(next)] = Some(cur);
            if next == goal {
                return Some(walk_back(&parent, idx, start, goal));
            }
            queue.push_back(next);
        }
    }
    None
}

fn walk_back(parent: &[Option<Pos>], idx: impl Fn(Pos) -> usize, start: Pos, goal: Pos) -> Path {
    let mut cells = vec![goal];
    let mut cur = goal;
    while let Some(prev) = parent[idx(cur)] {
        if prev == start { break; }
        cells.push(prev);
        cur = prev;
    }
    cells.reverse();
    Path::new(cells)
}

// ══════════════════════════════════════════════════════════════
// Multi-path enumeration
// ══════════════════════════════════════════════════════════════

struct Node {
    pos: Pos,
    parent: Option<usize>,
}

/// Enumerate up to `max_paths` distinct, non-self-intersecting routes.
///
/// Breadth-first over a node arena: each cell may be expanded up to
/// `max_paths` times via different predecessor chains, so arrivals at the
/// goal beyond the first are found without exhaustive enumeration. Results
/// are grouped by length, shortest first.
pub fn multi_bfs(grid: &Grid, start: Pos, goal: Pos, max_paths: usize) -> Vec<Path> {
    let max_paths = max_paths.max(1);
    if start == goal || !grid.contains(start) || !passable(grid, goal) {
        return Vec::new();
    }

    let cols = grid.cols();
    let idx = |p: Pos| p.y * cols + p.x;
    let mut expansions = vec![0usize; grid.len()];
    expansions[idx(start)] = max_paths;

    let mut arena: Vec<Node> = vec![Node { pos: start, parent: None }];
    let mut queue = VecDeque::from([0usize]);
    let mut found: Vec<Path> = Vec::new();

    'search: while let Some(ni) = queue.pop_front() {
        let cur = arena[ni].pos;
        for next in neighbours(grid, cur, Dir::ALL) {
            if chain_contains(&arena, ni, next) { continue; }

            if next == goal {
                found.push(chain_path(&arena, ni, goal));
                if found.len() >= max_paths { break 'search; }
                continue;
            }

            let slot = &mut expansions[idx(next)];
            if *slot >= max_paths { continue; }
            *slot += 1;

            if arena.len() >= NODE_BUDGET {
                log::debug!("multi_bfs node budget exhausted");
                break 'search;
            }
            arena.push(Node { pos: next, parent: Some(ni) });
            queue.push_back(arena.len() - 1);
        }
    }

    found.sort_by_key(Path::len);
    found
}

fn chain_contains(arena: &[Node], mut ni: usize, pos: Pos) -> bool {
    loop {
        let node = &arena[ni];
        if node.pos == pos { return true; }
        match node.parent {
            Some(p) => ni = p,
            None => return false,
        }
    }
}

/// Cells from the node after the root up to `ni`, then `goal`.
fn chain_path(arena: &[Node], mut ni: usize, goal: Pos) -> Path {
    let mut cells = vec![goal];
    while let Some(parent) = arena[ni].parent {
        cells.push(arena[ni].pos);
        ni = parent;
    }
    cells.reverse();
    Path::new(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn p(x: usize, y: usize) -> Pos {
        Pos::new(x, y)
    }

    #[test]
    fn path_excludes_start_and_ends_at_goal() {
        let g = Grid::from_rows(&[
            "######",
            "#P   #",
            "#### #",
            "#    #",
            "######",
        ]);
        let path = bfs_path(&g, p(1, 1), p(1, 3)).unwrap();
        assert_eq!(path.cells.first(), Some(&p(2, 1)));
        assert_eq!(path.goal(), Some(p(1, 3)));
        assert_eq!(path.len(), 8);
        assert!(path.is_connected(p(1, 1)));
    }

    #[test]
    fn adjacent_goal_is_one_cell() {
        let g = Grid::from_rows(&[
            "#####",
            "#P. #",
            "#####",
        ]);
        assert_eq!(bfs_path(&g, p(1, 1), p(2, 1)), Some(Path::new(vec![p(2, 1)])));
    }

    #[test]
    fn rocks_and_walls_block() {
        let g = Grid::from_rows(&[
            "#####",
            "#PO #",
            "#####",
        ]);
        assert_eq!(bfs_path(&g, p(1, 1), p(3, 1)), None);
        assert!(multi_bfs(&g, p(1, 1), p(3, 1), 3).is_empty());
    }

    #[test]
    fn multi_finds_distinct_shortest_routes() {
        let g = Grid::from_rows(&[
            "#####",
            "#P  #",
            "#   #",
            "#   #",
            "#####",
        ]);
        let paths = multi_bfs(&g, p(1, 1), p(3, 3), 3);
        assert_eq!(paths.len(), 3);
        for path in &paths {
            assert_eq!(path.len(), 4);
            assert_eq!(path.goal(), Some(p(3, 3)));
            assert!(path.is_connected(p(1, 1)));
        }
        assert_ne!(paths[0], paths[1]);
        assert_ne!(paths[1], paths[2]);
        assert_ne!(paths[0], paths[2]);
    }

    #[test]
    fn multi_with_one_path_matches_bfs_length() {
        let g = Grid::from_rows(&[
            "#######",
            "#P    #",
            "# ### #",
            "#     #",
            "#######",
        ]);
        let single = bfs_path(&g, p(1, 1), p(5, 3)).unwrap();
        let multi = multi_bfs(&g, p(1, 1), p(5, 3), 1);
        assert_eq!(multi.len(), 1);
        assert_eq!(multi[0].len(), single.len());
    }

    #[test]
    fn multi_groups_by_length() {
        // One short corridor, one long way around.
        let g = Grid::from_rows(&[
            "#######",
            "#P   .#",
            "# ### #",
            "# ### #",
            "#     #",
            "#######",
        ]);
        let paths = multi_bfs(&g, p(1, 1), p(5, 1), 4);
        assert!(paths.len() >= 2);
        assert_eq!(paths[0].len(), 4);
        assert!(paths.windows(2).all(|w| w[0].len() <= w[1].len()));
        assert!(paths.iter().all(|p0| !p0.self_intersects(p(1, 1))));
    }

    #[test]
    fn randomized_reaches_goal_and_is_deterministic_per_seed() {
        let g = Grid::from_rows(&[
            "#######",
            "#P    #",
            "#     #",
            "#     #",
            "#######",
        ]);
        let mut a = Pcg32::seed_from_u64(42);
        let mut b = Pcg32::seed_from_u64(42);
        for _ in 0..5 {
            let pa = randomized_bfs(&g, p(1, 1), p(5, 3), &mut a, 1.0).unwrap();
            let pb = randomized_bfs(&g, p(1, 1), p(5, 3), &mut b, 1.0).unwrap();
            assert_eq!(pa, pb);
            assert_eq!(pa.goal(), Some(p(5, 3)));
            assert!(pa.is_connected(p(1, 1)));
        }
    }

    #[test]
    fn zero_probability_is_plain_bfs() {
        let g = Grid::from_rows(&[
            "######",
            "#P   #",
            "#    #",
            "######",
        ]);
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(
            randomized_bfs(&g, p(1, 1), p(4, 2), &mut rng, 0.0),
            bfs_path(&g, p(1, 1), p(4, 2))
        );
    }
}
