/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Screen layout:
///
///   row 0             HUD (cave, score, lives, diamonds left, strategy)
///   row 2 ..          map, one game cell = 2 terminal columns
///   map end + 1       message bar
///   map end + 3       help bar
///
/// Offered routes are drawn as dots over Empty/Dirt cells; the selected one
/// is brighter, the route being walked brightest. Everything here only reads
/// the world.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::grid::{Grid, Pos};
use crate::domain::tile::CellKind;
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 8],
    ch_len: u8,
    fg: Color,
    bg: Color,
    wide: bool,    // true = this char occupies 2 terminal columns
    cont: bool,    // true = continuation of previous wide char (skip render)
}

impl Cell {
    /// Explicit dark background for every "empty" terminal cell, also used
    /// for `Clear(ClearType::All)` so inter-row gaps match the cells.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 16, b: 22 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0, 0, 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: false,
    };

    const WIDE_CONT: Cell = Cell {
        ch: [0; 8],
        ch_len: 0,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: true,
    };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0, 0, 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    /// Color::Reset → BASE_BG, never terminal-default.
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn from_char_wide(c: char, bg: Color) -> Self {
        let mut cell = Self::from_char(c, Color::White, bg);
        cell.wide = true;
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or(" ")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', Color::White, bg));
        }
    }
}

// ── Screen geometry ──

/// Each game cell = 2 terminal columns.
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

/// Map a terminal position (mouse click) to the game cell under it.
pub fn screen_to_cell(grid: &Grid, col: u16, row: u16) -> Option<Pos> {
    let row = row as usize;
    if row < MAP_ROW {
        return None;
    }
    let pos = Pos::new(col as usize / CELL_W, row - MAP_ROW);
    grid.contains(pos).then_some(pos)
}

// ── Route overlay ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum PathMark {
    None,
    Offered,
    Selected,
    Walking,
}

/// One mark per grid cell (row-major). Later layers win.
fn path_marks(w: &WorldState) -> Vec<PathMark> {
    let cols = w.grid.cols();
    let mut marks = vec![PathMark::None; w.grid.len()];
    let mut paint = |cells: &mut dyn Iterator<Item = Pos>, mark: PathMark| {
        for p in cells {
            if let Some(slot) = marks.get_mut(p.y * cols + p.x) {
                *slot = mark;
            }
        }
    };

    for (i, path) in w.offered.iter().enumerate() {
        if i != w.selected {
            paint(&mut path.cells.iter().copied(), PathMark::Offered);
        }
    }
    if let Some(path) = w.selected_path() {
        paint(&mut path.cells.iter().copied(), PathMark::Selected);
    }
    if let Some(route) = &w.player.route {
        paint(&mut route.steps.iter().copied(), PathMark::Walking);
    }
    marks
}

// ── Tile visuals ──

#[derive(Clone, Copy)]
enum Visual {
    /// Two narrow glyphs (left, right column).
    Pair(char, char, Color, Color),
    /// One emoji spanning both columns.
    Wide(char, Color),
}

fn tile_visual(kind: CellKind) -> Visual {
    match kind {
        CellKind::Empty            => Visual::Pair(' ', ' ', Color::Reset, Color::Reset),
        CellKind::Wall             => Visual::Pair('█', '█', Color::Rgb{r:110,g:110,b:120}, Color::Rgb{r:60,g:60,b:70}),
        CellKind::Dirt             => Visual::Pair('░', '░', Color::Rgb{r:150,g:100,b:50}, Color::Rgb{r:70,g:45,b:20}),
        CellKind::Rock             => Visual::Pair('◖', '◗', Color::Rgb{r:170,g:160,b:150}, Color::Reset),
        CellKind::Diamond          => Visual::Wide('💎', Color::Reset),
        CellKind::Player           => Visual::Wide('🧑', Color::Reset),
        CellKind::Balloon          => Visual::Wide('🎈', Color::Reset),
        CellKind::ExplosionDiamond => Visual::Pair('✦', '✦', Color::Rgb{r:255,g:220,b:60}, Color::Reset),
        CellKind::Lava             => Visual::Pair('≈', '≈', Color::Rgb{r:255,g:170,b:40}, Color::Rgb{r:150,g:30,b:0}),
    }
}

fn mark_color(mark: PathMark) -> Option<Color> {
    match mark {
        PathMark::None => None,
        PathMark::Offered => Some(Color::Rgb{r:90,g:90,b:130}),
        PathMark::Selected => Some(Color::Rgb{r:120,g:200,b:255}),
        PathMark::Walking => Some(Color::Rgb{r:120,g:255,b:140}),
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    frame: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            frame: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame.
        self.back.cells.fill(Cell::INVALID);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        self.frame = self.frame.wrapping_add(1);

        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change → clean transition
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.front.clear();
        match world.phase {
            Phase::Playing => self.compose_game(world),
            Phase::LevelComplete => {
                self.compose_game(world);
                self.compose_level_clear(world);
            }
            Phase::GameOver => self.compose_game_over(world),
            Phase::GameComplete => self.compose_game_complete(world),
        }
        if world.paused {
            self.compose_pause_overlay(world);
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors, never ResetColor (terminal default may differ).
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                let prev = self.back.get(x, y);

                // Right half of a wide emoji
                if cell.cont {
                    if cell != prev { need_move = true; }
                    x += 1;
                    continue;
                }

                let cont_changed = cell.wide
                    && x + 1 < self.front.width
                    && self.front.get(x + 1, y) != self.back.get(x + 1, y);

                if cell == prev && !cont_changed {
                    need_move = true;
                    x += 1;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;

                if cell.wide {
                    last_x = x + 1;
                    x += 2;
                } else {
                    last_x = x;
                    x += 1;
                }
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, w: &WorldState) {
        let buf_w = self.front.width;
        let hud_bg = Color::Rgb{r:30,g:22,b:40};

        // ── HUD row ──
        let left = w.grid.count(CellKind::is_collectible);
        let saved = if w.has_save { "  [saved]" } else { "" };
        let hud = format!(
            " Cave {}/{} {}  Score:{:<5}  ♥×{}  ◆ left:{}  Route:{}{} ",
            w.current_level + 1, w.total_levels.max(1), w.level_name,
            w.score, w.lives, left, w.strategy.label(), saved,
        );
        self.front.fill_row(HUD_ROW, hud_bg);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, hud_bg);

        // ── Map ──
        let marks = path_marks(w);
        let cols = w.grid.cols();
        for gy in 0..w.grid.rows() {
            let row = MAP_ROW + gy;
            if row >= self.front.height { break; }
            for gx in 0..cols {
                let col = gx * CELL_W;
                if col + 1 >= buf_w { break; }
                let mark = marks.get(gy * cols + gx).copied().unwrap_or(PathMark::None);
                self.compose_cell(w, Pos::new(gx, gy), mark, col, row);
            }
        }

        // ── Message bar ──
        let msg_row = MAP_ROW + w.grid.rows() + 1;
        if msg_row < self.front.height && w.message_timer_ms > 0 && !w.message.is_empty() {
            let bg = Color::Rgb{r:200,g:170,b:60};
            self.front.fill_row(msg_row, bg);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", w.message), Color::Black, bg);
        }

        // ── Help bar ──
        let help_row = MAP_ROW + w.grid.rows() + 3;
        if help_row < self.front.height {
            let help = " Arrows/WASD:Dig  Click:Route  Tab:Next route  V:Strategy  R:Restart  F1:Pause  F5:Save  F9:Load  Esc:Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    /// Write game cell `pos` into the front buffer at (col, row).
    fn compose_cell(&mut self, w: &WorldState, pos: Pos, mark: PathMark, col: usize, row: usize) {
        let kind = w.grid.kind_at(pos);
        let visual = tile_visual(kind);

        // Route dots only over open ground, never over pieces.
        if let (Some(fg), true) = (mark_color(mark), matches!(kind, CellKind::Empty | CellKind::Dirt)) {
            let bg = match visual {
                Visual::Pair(_, _, _, bg) => bg,
                Visual::Wide(_, bg) => bg,
            };
            let dot = if Some(pos) == w.player.route.as_ref().map(|r| r.goal) { '◎' } else { '•' };
            self.front.set(col, row, Cell::from_char(dot, fg, bg));
            self.front.set(col + 1, row, Cell::from_char(' ', fg, bg));
            return;
        }

        match visual {
            Visual::Pair(c0, c1, fg, bg) => {
                // First half of a slide: the tile is still arriving.
                let arriving = w.physics.slide_at(&w.grid, pos).map_or(false, |s| s.progress() < 0.5);
                let fg = if arriving { Color::DarkGrey } else { fg };
                self.front.set(col, row, Cell::from_char(c0, fg, bg));
                self.front.set(col + 1, row, Cell::from_char(c1, fg, bg));
            }
            Visual::Wide(ch, bg) => {
                self.front.set(col, row, Cell::from_char_wide(ch, bg));
                self.front.set(col + 1, row, Cell::WIDE_CONT);
            }
        }
    }

    // ── Overlays and end screens ──

    /// Dark box centered over the map area. Returns its top-left corner.
    fn overlay_box(&mut self, w: &WorldState, box_w: usize, box_h: usize, bg: Color) -> (usize, usize) {
        let map_w = (w.grid.cols() * CELL_W).max(box_w);
        let map_h = w.grid.rows().max(box_h);
        let box_x = (map_w - box_w) / 2;
        let box_y = MAP_ROW + (map_h - box_h) / 2;
        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::from_char(' ', Color::White, bg));
            }
        }
        (box_x, box_y)
    }

    fn compose_level_clear(&mut self, w: &WorldState) {
        let bg = Color::Rgb{r:20,g:40,b:30};
        let (x, y) = self.overlay_box(w, 30, 6, bg);
        let last = w.current_level + 1 >= w.total_levels;
        self.front.put_str(x + 2, y + 1, "★ CAVE CLEARED ★", Color::Rgb{r:255,g:220,b:50}, bg);
        self.front.put_str(x + 2, y + 2, &format!("Score: {}", w.score), Color::White, bg);
        let next = if last { "▸ ENTER: Finish" } else { "▸ ENTER: Next cave" };
        self.front.put_str(x + 2, y + 4, next, Color::Rgb{r:80,g:255,b:80}, bg);
    }

    fn compose_pause_overlay(&mut self, w: &WorldState) {
        let dim = Color::Rgb{r:40,g:40,b:40};
        let blink = (self.frame / 30) % 2 == 0;
        let (x, y) = self.overlay_box(w, 32, 10, dim);

        let hdr = Color::Rgb{r:255,g:220,b:50};
        let key_c = Color::Rgb{r:100,g:200,b:255};
        let label = if blink { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.front.put_str(x + 10, y + 1, label, hdr, dim);
        self.front.put_str(x + 2, y + 3, "F1   Resume", key_c, dim);
        self.front.put_str(x + 2, y + 4, "R    Restart cave", key_c, dim);
        self.front.put_str(x + 2, y + 5, "F5   Save", key_c, dim);
        self.front.put_str(x + 2, y + 6, "F9   Load save", key_c, dim);
        self.front.put_str(x + 2, y + 8, "Esc  Save and quit", key_c, dim);
    }

    fn compose_game_over(&mut self, w: &WorldState) {
        let box_art = [
            "╔══════════════════════════════╗",
            "║       ✕  CAVE-IN!  ✕         ║",
            "╚══════════════════════════════╝",
        ];
        for (i, l) in box_art.iter().enumerate() {
            self.front.put_str(6, 4 + i, l, Color::Rgb{r:255,g:60,b:60}, Color::Reset);
        }
        self.front.put_str(8, 9, &format!("◈ Final Score: {}", w.score), Color::White, Color::Reset);
        self.front.put_str(8, 10, &format!("◈ Reached Cave: {}", w.current_level + 1), Color::White, Color::Reset);
        self.front.put_str(8, 12, "▸ ENTER: Start over from Cave 1", Color::Rgb{r:80,g:255,b:80}, Color::Reset);
        self.front.put_str(8, 13, "▸ ESC:   Quit", Color::DarkGrey, Color::Reset);
    }

    fn compose_game_complete(&mut self, w: &WorldState) {
        let box_art = [
            "╔══════════════════════════════════╗",
            "║  ★ EVERY CAVE DUG OUT! WELL DONE ★ ║",
            "╚══════════════════════════════════╝",
        ];
        for (i, l) in box_art.iter().enumerate() {
            self.front.put_str(4, 4 + i, l, Color::Rgb{r:255,g:220,b:50}, Color::Reset);
        }
        self.front.put_str(6, 9, &format!("◈ Final Score: {}", w.score), Color::White, Color::Reset);
        self.front.put_str(6, 10, &format!("◈ All {} caves cleared!", w.total_levels), Color::Rgb{r:80,g:255,b:80}, Color::Reset);
        self.front.put_str(6, 12, "▸ ENTER: Play again   ESC: Quit", Color::Rgb{r:80,g:255,b:80}, Color::Reset);
    }
}
