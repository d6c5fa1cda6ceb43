/// Hole grid and depth model.
///
/// ## Hole strength
///
/// A cell either has no hole or a hole with a strength digit 0-9:
///   - `.` (or space) = no hole at any depth
///   - `0`..`9`       = hole open at every depth level up to that digit
///
/// The strength is expanded once into a stack of boolean grids,
/// `open[k][y][x] == strength >= k` for `k` in `0..DEPTH_LEVELS`.
/// The stack is never mutated after load and is shared by every
/// snapshot of a level.
///
/// ## Drop
///
/// `find_drop_at` walks down the stack from depth 0 and keeps falling
/// while the current depth is open and still above the revealed limit.
/// The result is how far below the surface plane the visible floor at
/// that cell sits. A crate resting in a hole plugs one level of it.

use thiserror::Error;

use super::geom::Vec2;

/// Number of stored depth levels (0..=8).
pub const DEPTH_LEVELS: usize = 9;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("level block is empty")]
    Empty,
    #[error("row {row} has width {found}, expected {expected}")]
    RaggedRow { row: usize, expected: usize, found: usize },
    #[error("unexpected cell '{ch}' at {x},{y}")]
    BadCell { ch: char, x: usize, y: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoleGrid {
    width: usize,
    height: usize,
    strength: Vec<Vec<Option<u8>>>,
    open: Vec<Vec<Vec<bool>>>,
}

impl HoleGrid {
    /// Build from per-cell strengths (`strength[y][x]`, `None` = no hole).
    pub fn from_strengths(strength: Vec<Vec<Option<u8>>>) -> Self {
        let height = strength.len();
        let width = strength.first().map_or(0, |r| r.len());
        let open = (0..DEPTH_LEVELS)
            .map(|k| {
                strength.iter()
                    .map(|row| row.iter().map(|s| s.map_or(false, |s| k <= s as usize)).collect())
                    .collect()
            })
            .collect();
        HoleGrid { width, height, strength, open }
    }

    /// Parse the ASCII authoring block.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, GridError> {
        let first = rows.first().ok_or(GridError::Empty)?;
        let width = first.as_ref().chars().count();
        if width == 0 {
            return Err(GridError::Empty);
        }

        let mut strength = Vec::with_capacity(rows.len());
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let found = row.chars().count();
            if found != width {
                return Err(GridError::RaggedRow { row: y, expected: width, found });
            }
            let mut cells = Vec::with_capacity(width);
            for (x, ch) in row.chars().enumerate() {
                let s = match ch {
                    '.' | ' ' => None,
                    '0'..='9' => Some(ch as u8 - b'0'),
                    _ => return Err(GridError::BadCell { ch, x, y }),
                };
                cells.push(s);
            }
            strength.push(cells);
        }
        Ok(HoleGrid::from_strengths(strength))
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as i32, self.height as i32)
    }

    /// Strength digit at `pos`; `None` without a hole or out of bounds.
    pub fn strength_at(&self, pos: Vec2) -> Option<u8> {
        if !pos.in_bounds(self.size()) {
            return None;
        }
        self.strength[pos.y as usize][pos.x as usize]
    }

    /// Is there a hole at `pos` on depth level `depth`?
    #[inline]
    pub fn is_open(&self, depth: usize, pos: Vec2) -> bool {
        if depth >= DEPTH_LEVELS || !pos.in_bounds(self.size()) {
            return false;
        }
        self.open[depth][pos.y as usize][pos.x as usize]
    }
}

/// Resolve the depth of the visible floor at `pos` when `max_layer`
/// layers are revealed. `filled_hole` is the crate position, if any:
/// a crate at `pos` raises the floor by one level.
pub fn find_drop_at(pos: Vec2, max_layer: usize, holes: &HoleGrid, filled_hole: Option<Vec2>) -> i32 {
    let mut depth = 0usize;
    while depth < max_layer && holes.is_open(depth, pos) {
        depth += 1;
    }
    let mut drop = depth as i32;
    if filled_hole == Some(pos) {
        drop = (drop - 1).max(0);
    }
    drop
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid(rows: &[&str]) -> HoleGrid {
        HoleGrid::from_rows(rows).unwrap()
    }

    #[test]
    fn parses_strength_digits() {
        let g = grid(&[
            ".1.",
            "9 0",
        ]);
        assert_eq!(g.size(), Vec2::new(3, 2));
        assert_eq!(g.strength_at(Vec2::new(0, 0)), None);
        assert_eq!(g.strength_at(Vec2::new(1, 0)), Some(1));
        assert_eq!(g.strength_at(Vec2::new(0, 1)), Some(9));
        assert_eq!(g.strength_at(Vec2::new(1, 1)), None);
        assert_eq!(g.strength_at(Vec2::new(2, 1)), Some(0));
        assert_eq!(g.strength_at(Vec2::new(5, 5)), None);
    }

    #[test]
    fn strength_opens_every_level_up_to_the_digit() {
        let g = grid(&["3"]);
        let p = Vec2::new(0, 0);
        assert!(g.is_open(0, p));
        assert!(g.is_open(3, p));
        assert!(!g.is_open(4, p));
        assert!(!g.is_open(DEPTH_LEVELS, p));
    }

    #[test]
    fn zero_is_a_surface_only_hole() {
        let g = grid(&["0."]);
        assert!(g.is_open(0, Vec2::new(0, 0)));
        assert!(!g.is_open(1, Vec2::new(0, 0)));
        assert!(!g.is_open(0, Vec2::new(1, 0)));
        assert_eq!(find_drop_at(Vec2::new(0, 0), 3, &g, None), 1);
    }

    #[test]
    fn digit_one_falls_two_levels() {
        let g = grid(&["1"]);
        let p = Vec2::new(0, 0);
        assert_eq!(find_drop_at(p, 1, &g, None), 1);
        assert_eq!(find_drop_at(p, 2, &g, None), 2);
        assert_eq!(find_drop_at(p, 5, &g, None), 2);
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = HoleGrid::from_rows(&["...", ".."]).unwrap_err();
        assert_eq!(err, GridError::RaggedRow { row: 1, expected: 3, found: 2 });
    }

    #[test]
    fn rejects_bad_cells() {
        let err = HoleGrid::from_rows(&["..#"]).unwrap_err();
        assert_eq!(err, GridError::BadCell { ch: '#', x: 2, y: 0 });
    }

    #[test]
    fn rejects_empty_block() {
        let rows: [&str; 0] = [];
        assert_eq!(HoleGrid::from_rows(&rows).unwrap_err(), GridError::Empty);
        assert_eq!(HoleGrid::from_rows(&[""]).unwrap_err(), GridError::Empty);
    }

    #[test]
    fn drop_limited_by_revealed_layers() {
        let g = grid(&["5"]);
        let p = Vec2::new(0, 0);
        assert_eq!(find_drop_at(p, 0, &g, None), 0);
        assert_eq!(find_drop_at(p, 2, &g, None), 2);
        assert_eq!(find_drop_at(p, 8, &g, None), 6);
    }

    #[test]
    fn drop_without_hole_is_zero() {
        let g = grid(&["."]);
        assert_eq!(find_drop_at(Vec2::new(0, 0), 8, &g, None), 0);
    }

    #[test]
    fn crate_fills_one_level() {
        let g = grid(&["1."]);
        let hole = Vec2::new(0, 0);
        let flat = Vec2::new(1, 0);
        assert_eq!(find_drop_at(hole, 3, &g, Some(hole)), 1);
        // clamped at the surface
        assert_eq!(find_drop_at(flat, 3, &g, Some(flat)), 0);
        // a crate elsewhere changes nothing
        assert_eq!(find_drop_at(hole, 3, &g, Some(flat)), 2);
    }

    #[test]
    fn out_of_bounds_never_falls() {
        let g = grid(&["9"]);
        assert_eq!(find_drop_at(Vec2::new(-1, 0), 8, &g, None), 0);
    }

    proptest! {
        #[test]
        fn drop_is_bounded_and_monotonic(
            cells in proptest::collection::vec(proptest::option::of(0u8..=9), 16),
            x in 0i32..4,
            y in 0i32..4,
            max_layer in 0usize..12,
        ) {
            let strength: Vec<Vec<Option<u8>>> = cells.chunks(4).map(|c| c.to_vec()).collect();
            let g = HoleGrid::from_strengths(strength);
            let p = Vec2::new(x, y);
            let d = find_drop_at(p, max_layer, &g, None);
            let next = find_drop_at(p, max_layer + 1, &g, None);
            prop_assert!(d >= 0);
            prop_assert!(d as usize <= max_layer);
            prop_assert!(next >= d);
        }
    }
}
