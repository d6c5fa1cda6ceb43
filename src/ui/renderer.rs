/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// One grid cell is two terminal columns. Depth is drawn as shading:
/// the deeper the resolved drop of a cell, the darker its floor. Dots on
/// an open hole get brighter the further the hole reaches.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::LevelState;
use crate::domain::geom::Vec2;
use crate::domain::grid::find_drop_at;
use crate::sim::session::{Phase, Session};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for every "empty" terminal cell, so the
    /// cleared screen and drawn cells share one colour.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 16, b: 24 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from every real cell; forces a full repaint.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg }
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

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let len = s.chars().count();
        let x = self.width.saturating_sub(len) / 2;
        self.put_str(x, y, s, fg, bg);
    }
}

// ── Palette ──

const HUD_BG: Color = Color::Rgb { r: 40, g: 30, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 190, g: 160, b: 70 };
const PLAYER_FG: Color = Color::Rgb { r: 255, g: 240, b: 120 };
const STAIRS_FG: Color = Color::Rgb { r: 120, g: 220, b: 255 };
const MAGENTA_1: Color = Color::Rgb { r: 230, g: 90, b: 200 };
const MAGENTA_2: Color = Color::Rgb { r: 200, g: 70, b: 230 };
const MAGENTA_3: Color = Color::Rgb { r: 160, g: 90, b: 255 };

/// Floor colour for a resolved drop. Never darker than the void.
fn depth_shade(drop: i32) -> Color {
    let d = drop.clamp(0, 8) as u8;
    let v = 150u8.saturating_sub(d * 16).max(30);
    Color::Rgb { r: v, g: v.saturating_sub(8), b: v.saturating_sub(20).max(24) }
}

/// Dot colour inside a hole, from its strength digit.
fn hole_fg(strength: Option<u8>) -> Color {
    let v = 40u8.saturating_add(strength.unwrap_or(0).min(9) * 18);
    Color::Rgb { r: v, g: v.saturating_sub(10), b: v.saturating_add(20) }
}

// ── Renderer ──

/// Each game cell = 2 terminal columns.
const CELL_W: usize = 2;

/// Vertical layout
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
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
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, session: &Session, total_levels: usize) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change: clean slate
        if self.last_phase != Some(session.phase) {
            self.back.cells.fill(Cell::INVALID);
            self.last_phase = Some(session.phase);
        }

        self.compose(session, total_levels);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn compose(&mut self, session: &Session, total_levels: usize) {
        self.front.clear();
        match session.phase {
            Phase::Intro => self.compose_sequence(session),
            Phase::Playing => self.compose_game(session, total_levels),
            Phase::Outro => {
                self.compose_game(session, total_levels);
                self.compose_sequence(session);
            }
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, session: &Session, total_levels: usize) {
        let s = &session.state;
        let layer = session.displayed_layer();

        // ── HUD row ──
        let unlocked = s.unlocked();
        let mut mechanics = String::new();
        if unlocked.crate_box { mechanics.push_str(" [crate]"); }
        if unlocked.rail { mechanics.push_str(" [cart]"); }
        if unlocked.portal { mechanics.push_str(" [portal]"); }
        let hud = format!(
            " Stair {}/{}  {}  |  Layer {}/{}  Deepest {}  Undo {}{} ",
            session.level_index + 1, total_levels.max(1), session.level_name,
            layer + 1, s.downstairs.len(), s.max_visited_layer + 1,
            session.history.depth(), mechanics,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Map, centred horizontally ──
        let map_cols = s.size.x.max(0) as usize * CELL_W;
        let origin_x = self.front.width.saturating_sub(map_cols) / 2;
        for y in 0..s.size.y {
            for x in 0..s.size.x {
                let pos = Vec2::new(x, y);
                let (glyph, fg, bg) = cell_look(s, layer, pos);
                let col = origin_x + x as usize * CELL_W;
                let row = MAP_ROW + y as usize;
                let mut chars = glyph.chars();
                let left = chars.next().unwrap_or(' ');
                let right = chars.next().unwrap_or(left);
                self.front.set(col, row, Cell::new(left, fg, bg));
                self.front.set(col + 1, row, Cell::new(right, fg, bg));
            }
        }

        // ── Player (may be nudged off-grid by a recoil) ──
        let p = session.player_draw_pos();
        if p.in_bounds(s.size) {
            let col = origin_x + p.x as usize * CELL_W;
            let row = MAP_ROW + p.y as usize;
            let bg = self.front.get(col, row).bg;
            self.front.set(col, row, Cell::new('◖', PLAYER_FG, bg));
            self.front.set(col + 1, row, Cell::new('◗', PLAYER_FG, bg));
        }

        // ── Message bar ──
        let msg_row = MAP_ROW + s.size.y.max(0) as usize + 1;
        if !session.message.is_empty() {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(1, msg_row, &session.message, Color::Black, MSG_BG);
        }

        // ── Help bar ──
        let help = " Arrows/WASD:Move  Z:Undo  R:Reset  N/P:Level  Q:Quit";
        self.front.put_str(0, msg_row + 2, help, Color::DarkGrey, Cell::BASE_BG);
    }

    /// Sequence text in a band across the middle of the screen.
    fn compose_sequence(&mut self, session: &Session) {
        let text = match session.sequence.text() {
            Some(t) => t,
            None => return,
        };
        let mid = self.front.height / 2;
        let band = Color::Rgb { r: 30, g: 24, b: 44 };
        for row in mid.saturating_sub(1)..=mid + 1 {
            self.front.fill_row(row, band);
        }
        self.front.put_centered(mid, text, Color::White, band);
        self.front.put_centered(mid + 2, "Enter to skip", Color::DarkGrey, Cell::BASE_BG);
    }
}

/// Glyph (two columns) and colours for one grid cell on `layer`.
fn cell_look(s: &LevelState, layer: usize, pos: Vec2) -> (&'static str, Color, Color) {
    let drop = find_drop_at(pos, layer, &s.holes, s.live_crate());
    let floor = depth_shade(drop);

    if layer > 0 && s.downstairs.get(layer - 1) == Some(&pos) {
        return ("▲▲", STAIRS_FG, floor);
    }
    if s.downstairs.get(layer) == Some(&pos) {
        let glyph = if layer + 1 >= s.downstairs.len() { "◆◆" } else { "▼▼" };
        return (glyph, STAIRS_FG, floor);
    }
    if s.live_crate() == Some(pos) {
        return ("[]", MAGENTA_1, floor);
    }
    if let Some(rail) = s.live_rail() {
        if rail.cart_pos() == pos {
            return ("╞╡", MAGENTA_2, floor);
        }
        if rail.spans(pos) {
            return ("══", MAGENTA_2, floor);
        }
    }
    if let Some(portal) = s.live_portal() {
        if portal.entry() == pos {
            return ("()", MAGENTA_3, floor);
        }
        if portal.exit() == pos {
            return ("<>", MAGENTA_3, floor);
        }
    }
    if drop > 0 {
        return ("··", hole_fg(s.holes.strength_at(pos)), floor);
    }
    ("  ", Color::Rgb { r: 20, g: 18, b: 26 }, floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RulesConfig, TimingConfig};
    use crate::sim::level::parse_level;
    use crate::sim::sequence::Sequence;

    fn session() -> Session {
        let def = parse_level("# Render\n@player 1,1\n@stairs 3,0 0,0\n@crate 2,1\n....\n.2..\n").unwrap();
        let mut s = Session::new(&def, 0, RulesConfig::default(), TimingConfig::default());
        s.phase = Phase::Playing;
        s.sequence = Sequence::finished();
        s
    }

    fn offscreen(w: usize, h: usize) -> Renderer {
        let mut r = Renderer::new();
        r.front.resize(w, h);
        r.back.resize(w, h);
        r
    }

    #[test]
    fn deeper_floors_are_darker() {
        let shade = |d| match depth_shade(d) {
            Color::Rgb { r, .. } => r,
            _ => unreachable!(),
        };
        assert!(shade(0) > shade(1));
        assert!(shade(1) > shade(4));
        assert_eq!(shade(20), shade(8));
    }

    #[test]
    fn compose_places_player_stairs_and_hud() {
        let s = session();
        let mut r = offscreen(8, 10);
        r.compose(&s, 3);
        // 4 cells * 2 cols fill the 8-column buffer from column 0
        assert_eq!(r.front.get(2, MAP_ROW + 1).ch, '◖');
        assert_eq!(r.front.get(6, MAP_ROW).ch, '▼');
        assert_eq!(r.front.get(1, HUD_ROW).ch, 'S');
    }

    #[test]
    fn locked_crate_is_not_drawn() {
        let s = session();
        let (glyph, _, _) = cell_look(&s.state, 0, Vec2::new(2, 1));
        assert_eq!(glyph, "  ");
        let mut unlocked = s.state.clone();
        unlocked.max_visited_layer = 1;
        let (glyph, _, _) = cell_look(&unlocked, 0, Vec2::new(2, 1));
        assert_eq!(glyph, "[]");
    }

    #[test]
    fn deeper_holes_have_brighter_dots() {
        let def = parse_level("@player 0,0\n@stairs 3,0 3,1 2,0\n....\n03..\n").unwrap();
        let mut s = def.initial_state();
        s.max_visited_layer = 2;
        let (shallow, shallow_fg, _) = cell_look(&s, 2, Vec2::new(0, 1));
        let (deep, deep_fg, _) = cell_look(&s, 2, Vec2::new(1, 1));
        assert_eq!(shallow, "··");
        assert_eq!(deep, "··");
        assert_ne!(shallow_fg, deep_fg);
        let (flat, _, _) = cell_look(&s, 2, Vec2::new(2, 1));
        assert_eq!(flat, "  ");
    }

    #[test]
    fn intro_shows_sequence_text() {
        let mut s = session();
        s.phase = Phase::Intro;
        s.sequence = Sequence::intro("Render", 1000);
        let mut r = offscreen(40, 12);
        r.compose(&s, 1);
        let mid = 6;
        let line: String = (0..40).map(|x| r.front.get(x, mid).ch).collect();
        assert!(line.contains(crate::sim::sequence::TITLE));
    }
}
