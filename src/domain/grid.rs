/// The authoritative cell map.
///
/// Flat, fixed-size `cols × rows` array of `CellKind`, row-major,
/// `index = y * cols + x`. A cell's kind is the only per-cell state kept
/// here; transient motion state lives in the physics scheduler's side table.
///
/// Reads outside the map are routine (player input near an edge), so the
/// accessors return `Option` instead of panicking. Only construction from
/// external data validates strictly (`GridError`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tile::CellKind;

pub const MIN_SIDE: usize = 3;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub const fn new(x: usize, y: usize) -> Self {
        Pos { x, y }
    }

    pub fn manhattan(self, other: Pos) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn is_adjacent(self, other: Pos) -> bool {
        self.manhattan(other) == 1
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Down, Dir::Left, Dir::Right];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir::Up    => (0, -1),
            Dir::Down  => (0, 1),
            Dir::Left  => (-1, 0),
            Dir::Right => (1, 0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Dir::Left | Dir::Right)
    }

    /// Direction of a single orthogonal step, if `from → to` is one.
    pub fn between(from: Pos, to: Pos) -> Option<Dir> {
        let dx = to.x as i64 - from.x as i64;
        let dy = to.y as i64 - from.y as i64;
        match (dx, dy) {
            (0, -1) => Some(Dir::Up),
            (0, 1)  => Some(Dir::Down),
            (-1, 0) => Some(Dir::Left),
            (1, 0)  => Some(Dir::Right),
            _ => None,
        }
    }
}

/// Structural problems in externally supplied grid data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("grid has no rows")]
    Empty,
    #[error("grid {cols}x{rows} is smaller than {min}x{min}", min = MIN_SIDE)]
    TooSmall { cols: usize, rows: usize },
    #[error("row {row} has {actual} cells, expected {expected}")]
    RaggedRow { row: usize, expected: usize, actual: usize },
    #[error("cell array holds {actual} values, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("grid has no player cell")]
    NoPlayer,
    #[error("grid has {count} player cells")]
    MultiplePlayers { count: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    cols: usize,
    rows: usize,
    cells: Vec<CellKind>,
}

// ── Construction ──

impl Grid {
    pub fn new(cols: usize, rows: usize) -> Self {
        Grid { cols, rows, cells: vec![CellKind::Empty; cols * rows] }
    }

    /// Parse glyph rows. Unknown glyphs become Empty. Dimensions are checked;
    /// player count is not (see `validate_player`).
    pub fn parse<S: AsRef<str>>(rows: &[S]) -> Result<Grid, GridError> {
        let first = rows.first().ok_or(GridError::Empty)?;
        let cols = first.as_ref().chars().count();
        let height = rows.len();
        if cols < MIN_SIDE || height < MIN_SIDE {
            return Err(GridError::TooSmall { cols, rows: height });
        }

        let mut cells = Vec::with_capacity(cols * height);
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let actual = row.chars().count();
            if actual != cols {
                return Err(GridError::RaggedRow { row: y, expected: cols, actual });
            }
            for (x, ch) in row.chars().enumerate() {
                let kind = CellKind::from_glyph(ch).unwrap_or_else(|| {
                    log::warn!("unknown cell glyph {ch:?} at ({x},{y}), treating as empty");
                    CellKind::Empty
                });
                cells.push(kind);
            }
        }
        Ok(Grid { cols, rows: height, cells })
    }

    /// Build from a flat array of numeric kind codes.
    pub fn from_codes(cols: usize, rows: usize, codes: &[u8]) -> Result<Grid, GridError> {
        if cols < MIN_SIDE || rows < MIN_SIDE {
            return Err(GridError::TooSmall { cols, rows });
        }
        if codes.len() != cols * rows {
            return Err(GridError::LengthMismatch { expected: cols * rows, actual: codes.len() });
        }
        let cells = codes
            .iter()
            .enumerate()
            .map(|(i, &code)| {
                CellKind::from_code(code).unwrap_or_else(|| {
                    log::warn!("unknown cell code {code} at index {i}, treating as empty");
                    CellKind::Empty
                })
            })
            .collect();
        Ok(Grid { cols, rows, cells })
    }

    /// Exactly one player cell must exist. Returns its position.
    pub fn validate_player(&self) -> Result<Pos, GridError> {
        let players = self.find_all(CellKind::Player);
        match players.len() {
            0 => Err(GridError::NoPlayer),
            1 => Ok(players[0]),
            count => Err(GridError::MultiplePlayers { count }),
        }
    }

    /// Test helper: parse and panic on malformed input.
    #[cfg(test)]
    pub fn from_rows(rows: &[&str]) -> Grid {
        Grid::parse(rows).expect("malformed test grid")
    }
}

// ── Queries ──

impl Grid {
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn contains(&self, pos: Pos) -> bool {
        pos.x < self.cols && pos.y < self.rows
    }

    #[inline]
    fn index(&self, pos: Pos) -> usize {
        pos.y * self.cols + pos.x
    }

    /// Kind at `pos`, or None outside the map.
    #[inline]
    pub fn get(&self, pos: Pos) -> Option<CellKind> {
        if self.contains(pos) { Some(self.cells[self.index(pos)]) } else { None }
    }

    /// Kind at `pos`; outside the map reads as Wall.
    #[inline]
    pub fn kind_at(&self, pos: Pos) -> CellKind {
        self.get(pos).unwrap_or(CellKind::Wall)
    }

    #[inline]
    pub fn is(&self, pos: Pos, kind: CellKind) -> bool {
        self.get(pos) == Some(kind)
    }

    /// Signed offset from `pos`, None if it leaves the map.
    pub fn offset(&self, pos: Pos, dx: i32, dy: i32) -> Option<Pos> {
        let nx = pos.x as i64 + dx as i64;
        let ny = pos.y as i64 + dy as i64;
        if nx < 0 || ny < 0 { return None; }
        let p = Pos::new(nx as usize, ny as usize);
        if self.contains(p) { Some(p) } else { None }
    }

    pub fn step(&self, pos: Pos, dir: Dir) -> Option<Pos> {
        let (dx, dy) = dir.delta();
        self.offset(pos, dx, dy)
    }

    pub fn is_interior(&self, pos: Pos) -> bool {
        pos.x > 0 && pos.y > 0 && pos.x + 1 < self.cols && pos.y + 1 < self.rows
    }

    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.rows).flat_map(move |y| (0..self.cols).map(move |x| Pos::new(x, y)))
    }

    pub fn find_all(&self, kind: CellKind) -> Vec<Pos> {
        self.positions().filter(|&p| self.is(p, kind)).collect()
    }

    pub fn count(&self, pred: impl Fn(CellKind) -> bool) -> usize {
        self.cells.iter().filter(|k| pred(**k)).count()
    }

    pub fn has_collectibles(&self) -> bool {
        self.cells.iter().any(|k| k.is_collectible())
    }

    /// First Empty cell strictly inside the border, row-major.
    pub fn first_interior_empty(&self) -> Option<Pos> {
        self.positions()
            .find(|&p| self.is_interior(p) && self.is(p, CellKind::Empty))
    }

    /// Glyph rows, the inverse of `parse`.
    pub fn to_rows(&self) -> Vec<String> {
        if self.cols == 0 {
            return Vec::new();
        }
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().map(|k| k.glyph()).collect())
            .collect()
    }
}

// ── Mutation ──

impl Grid {
    /// Write a kind. Writes outside the map are ignored.
    #[inline]
    pub fn set(&mut self, pos: Pos, kind: CellKind) {
        if self.contains(pos) {
            let i = self.index(pos);
            self.cells[i] = kind;
        }
    }

    /// Move the content of `from` into `to`, leaving `from` Empty.
    pub fn relocate(&mut self, from: Pos, to: Pos) {
        if let Some(kind) = self.get(from) {
            self.set(from, CellKind::Empty);
            self.set(to, kind);
        }
    }
}
