/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels/` directory (individual `.txt` files, sorted by file name)
///   2. Built-in embedded levels
///
/// ## Level format (`.txt`):
///   ```
///   # Level Name
///   @player x,y
///   @stairs x,y x,y ...          one downstair per layer, top first
///   @crate x,y                   optional
///   @rail x,y length h [offset]  optional, horizontal only
///   @portal x,y x,y              optional, first cell is the entry
///   <hole rows>
///   ```
///
/// ## Hole legend:
///   '.' or ' ' = solid floor
///   '0'..'9'   = hole open down to that depth level ('0': surface only)

use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

use crate::domain::entity::{Crate, LevelState, Player, Portal, Rail};
use crate::domain::geom::Vec2;
use crate::domain::grid::{GridError, HoleGrid};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("no @player line")]
    MissingPlayer,
    #[error("no @stairs line")]
    MissingStairs,
    #[error("line {line}: @{what} given twice")]
    Duplicate { line: usize, what: &'static str },
    #[error("line {line}: bad number '{text}'")]
    BadNumber { line: usize, text: String },
    #[error("line {line}: unknown directive '{text}'")]
    UnknownDirective { line: usize, text: String },
    #[error("{what} at {x},{y} is outside the {width}x{height} level")]
    OutOfBounds { what: &'static str, x: i32, y: i32, width: i32, height: i32 },
    #[error("line {line}: vertical rails are not supported")]
    VerticalRail { line: usize },
    #[error("rail from {x},{y} with length {length} leaves the level")]
    RailOutOfBounds { x: i32, y: i32, length: i32 },
    #[error("rail offset {offset} is not below its length {length}")]
    RailOffset { offset: i32, length: i32 },
    #[error("rail length must be positive")]
    RailLength,
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("{path}: {source}")]
    File { path: PathBuf, source: Box<LevelError> },
    #[error("no usable levels found")]
    NoLevels,
}

/// A validated level, ready to be instantiated.
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub holes: Rc<HoleGrid>,
    pub player: Vec2,
    pub stairs: Vec<Vec2>,
    pub crate_pos: Option<Vec2>,
    pub rail: Option<Rail>,
    pub portal: Option<(Vec2, Vec2)>,
}

impl LevelDef {
    /// Fresh state: player on the top layer, nothing visited yet.
    pub fn initial_state(&self) -> LevelState {
        LevelState {
            size: self.holes.size(),
            holes: Rc::clone(&self.holes),
            player: Player::new(self.player),
            downstairs: self.stairs.clone(),
            crate_box: self.crate_pos.map(|pos| Crate { pos }),
            rail: self.rail,
            portal: self.portal.map(|(entry, exit)| Portal::new(entry, exit)),
            max_visited_layer: 0,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Levels from `dir` when it holds any usable `.txt` file, else the
/// embedded set. Broken files are logged and skipped.
pub fn load_levels(dir: &Path) -> Result<Vec<LevelDef>, LevelError> {
    if dir.is_dir() {
        let levels = load_from_directory(dir)?;
        if !levels.is_empty() {
            tracing::info!("loaded {} levels from {}", levels.len(), dir.display());
            return Ok(levels);
        }
        tracing::warn!("no usable levels in {}, using built-in levels", dir.display());
    }
    let levels = embedded_levels();
    if levels.is_empty() {
        return Err(LevelError::NoLevels);
    }
    Ok(levels)
}

// ══════════════════════════════════════════════════════════════
// Single-level parsing
// ══════════════════════════════════════════════════════════════

/// Rail as written, checked once the grid size is known.
struct RawRail {
    line: usize,
    top_left: Vec2,
    length: i32,
    horizontal: bool,
    offset: i32,
}

/// Parse and validate one level.
pub fn parse_level(content: &str) -> Result<LevelDef, LevelError> {
    let mut name = String::new();
    let mut player = None;
    let mut stairs: Option<Vec<Vec2>> = None;
    let mut crate_pos = None;
    let mut rail: Option<RawRail> = None;
    let mut portal = None;
    let mut rows: Vec<&str> = vec![];

    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        let text = raw.trim_end_matches('\r');

        if let Some(rest) = text.trim_start().strip_prefix('#') {
            if name.is_empty() {
                name = rest.trim().to_string();
            }
            continue;
        }

        if let Some(rest) = text.strip_prefix('@') {
            let mut words = rest.split_whitespace();
            let directive = words.next().unwrap_or_default();
            let args: Vec<&str> = words.collect();
            match directive {
                "player" => {
                    let pos = parse_single(&args, line)?;
                    set_once(&mut player, pos, line, "player")?;
                }
                "stairs" => {
                    let list = args.iter()
                        .map(|a| parse_pos(a, line))
                        .collect::<Result<Vec<_>, _>>()?;
                    if list.is_empty() {
                        return Err(LevelError::MissingStairs);
                    }
                    set_once(&mut stairs, list, line, "stairs")?;
                }
                "crate" => {
                    let pos = parse_single(&args, line)?;
                    set_once(&mut crate_pos, pos, line, "crate")?;
                }
                "rail" => {
                    let parsed = parse_rail(&args, line)?;
                    set_once(&mut rail, parsed, line, "rail")?;
                }
                "portal" => {
                    let (a, b) = match args.as_slice() {
                        [a, b] => (parse_pos(a, line)?, parse_pos(b, line)?),
                        _ => return Err(LevelError::BadNumber { line, text: args.join(" ") }),
                    };
                    set_once(&mut portal, (a, b), line, "portal")?;
                }
                other => {
                    return Err(LevelError::UnknownDirective { line, text: other.to_string() });
                }
            }
            continue;
        }

        // Blank lines before the block are spacing, not data
        if rows.is_empty() && text.trim().is_empty() {
            continue;
        }
        rows.push(text);
    }

    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }

    let holes = HoleGrid::from_rows(&rows)?;
    let size = holes.size();
    let player = player.ok_or(LevelError::MissingPlayer)?;
    let stairs = stairs.ok_or(LevelError::MissingStairs)?;

    check_bounds("player", player, size)?;
    for &s in &stairs {
        check_bounds("stairs", s, size)?;
    }
    if let Some(c) = crate_pos {
        check_bounds("crate", c, size)?;
    }
    if let Some((a, b)) = portal {
        check_bounds("portal", a, size)?;
        check_bounds("portal", b, size)?;
    }
    let rail = rail.map(|r| validate_rail(r, size)).transpose()?;

    if name.is_empty() {
        name = "Unnamed Stairwell".to_string();
    }

    Ok(LevelDef {
        name,
        holes: Rc::new(holes),
        player,
        stairs,
        crate_pos,
        rail,
        portal,
    })
}

fn set_once<T>(slot: &mut Option<T>, value: T, line: usize, what: &'static str) -> Result<(), LevelError> {
    if slot.is_some() {
        return Err(LevelError::Duplicate { line, what });
    }
    *slot = Some(value);
    Ok(())
}

fn parse_num(text: &str, line: usize) -> Result<i32, LevelError> {
    text.trim().parse::<i32>()
        .map_err(|_| LevelError::BadNumber { line, text: text.to_string() })
}

fn parse_pos(text: &str, line: usize) -> Result<Vec2, LevelError> {
    match text.split_once(',') {
        Some((x, y)) => Ok(Vec2::new(parse_num(x, line)?, parse_num(y, line)?)),
        None => Err(LevelError::BadNumber { line, text: text.to_string() }),
    }
}

fn parse_single(args: &[&str], line: usize) -> Result<Vec2, LevelError> {
    match args {
        [one] => parse_pos(one, line),
        _ => Err(LevelError::BadNumber { line, text: args.join(" ") }),
    }
}

/// `x,y length h|v [offset]`
fn parse_rail(args: &[&str], line: usize) -> Result<RawRail, LevelError> {
    let (pos, length, orient, offset) = match args {
        [pos, length, orient] => (pos, length, orient, None),
        [pos, length, orient, offset] => (pos, length, orient, Some(offset)),
        _ => return Err(LevelError::BadNumber { line, text: args.join(" ") }),
    };
    let horizontal = match *orient {
        "h" | "H" => true,
        "v" | "V" => false,
        other => return Err(LevelError::UnknownDirective { line, text: other.to_string() }),
    };
    Ok(RawRail {
        line,
        top_left: parse_pos(pos, line)?,
        length: parse_num(length, line)?,
        horizontal,
        offset: offset.map(|o| parse_num(o, line)).transpose()?.unwrap_or(0),
    })
}

fn validate_rail(r: RawRail, size: Vec2) -> Result<Rail, LevelError> {
    if !r.horizontal {
        return Err(LevelError::VerticalRail { line: r.line });
    }
    if r.length <= 0 {
        return Err(LevelError::RailLength);
    }
    if r.offset < 0 || r.offset >= r.length {
        return Err(LevelError::RailOffset { offset: r.offset, length: r.length });
    }
    let end = r.top_left + Vec2::new(r.length - 1, 0);
    if !r.top_left.in_bounds(size) || !end.in_bounds(size) {
        return Err(LevelError::RailOutOfBounds { x: r.top_left.x, y: r.top_left.y, length: r.length });
    }
    Ok(Rail { top_left: r.top_left, horizontal: true, length: r.length, offset: r.offset })
}

fn check_bounds(what: &'static str, pos: Vec2, size: Vec2) -> Result<(), LevelError> {
    if pos.in_bounds(size) {
        Ok(())
    } else {
        Err(LevelError::OutOfBounds { what, x: pos.x, y: pos.y, width: size.x, height: size.y })
    }
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Result<Vec<LevelDef>, LevelError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|source| LevelError::Io { path: dir.to_path_buf(), source })?;

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "txt"))
        .collect();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut levels = vec![];
    for path in paths {
        match read_level_file(&path) {
            Ok(def) => levels.push(def),
            Err(e) => tracing::warn!("skipping level: {e}"),
        }
    }
    Ok(levels)
}

fn read_level_file(path: &Path) -> Result<LevelDef, LevelError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| LevelError::Io { path: path.to_path_buf(), source })?;
    parse_level(&content)
        .map_err(|e| LevelError::File { path: path.to_path_buf(), source: Box::new(e) })
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

const EMBEDDED: &[&str] = &[
    "# Stair 1 - The Well
@player 12,2
@stairs 6,9 12,11 13,1 0,12
@crate 8,5
@rail 2,3 5 h
@portal 6,1 13,13
..........00000
..2222222200000
22.020...200...
2..020...221111
2..020....00..1
2..000....000.1
2....0....000.1
22...00000000.1
112.....0..00.1
0012....00....1
2.122....00...1
220012....0...1
2222012...0...1
2202012..111111
2211022..10...2
",
    "# Stair 2 - First Steps
@player 12,2
@stairs 2,1 13,4 7,0
...............
...0...........
..011.....0....
...0......1....
.........00....
...............
",
    "# Stair 3 - Heavy Lifting
@player 1,1
@stairs 10,1 1,5 10,5 6,0
@crate 5,3
............
.00.........
.01....1....
.......1....
..22........
............
............
",
    "# Stair 4 - Cart and Gate
@player 1,3
@stairs 14,1 1,1 14,6 8,0 1,7
@crate 4,4
@rail 3,6 6 h
@portal 12,2 2,2
................
..0.........1...
..00....2.......
..........11....
....1...........
.........0......
................
.....0.......2..
",
];

pub fn embedded_levels() -> Vec<LevelDef> {
    EMBEDDED.iter()
        .filter_map(|text| match parse_level(text) {
            Ok(def) => Some(def),
            Err(e) => {
                tracing::error!("built-in level rejected: {e}");
                None
            }
        })
        .collect()
}
