/// Grid geometry: integer positions and the four move directions.

use std::ops::{Add, Sub};

/// Integer grid coordinate. `x` grows rightwards, `y` grows downwards.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Vec2 { x, y }
    }

    /// Is this position inside a `size.x` by `size.y` field?
    #[inline]
    pub fn in_bounds(self, size: Vec2) -> bool {
        self.x >= 0 && self.y >= 0 && self.x < size.x && self.y < size.y
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Movement direction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    #[cfg(test)]
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Down, Dir::Left, Dir::Right];

    pub fn delta(self) -> Vec2 {
        match self {
            Dir::Up => Vec2::new(0, -1),
            Dir::Down => Vec2::new(0, 1),
            Dir::Left => Vec2::new(-1, 0),
            Dir::Right => Vec2::new(1, 0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Dir::Left | Dir::Right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_half_open() {
        let size = Vec2::new(3, 2);
        assert!(Vec2::new(0, 0).in_bounds(size));
        assert!(Vec2::new(2, 1).in_bounds(size));
        assert!(!Vec2::new(3, 1).in_bounds(size));
        assert!(!Vec2::new(0, 2).in_bounds(size));
        assert!(!Vec2::new(-1, 0).in_bounds(size));
    }

    #[test]
    fn deltas_are_unit_steps() {
        for dir in Dir::ALL {
            let d = dir.delta();
            assert_eq!(d.x.abs() + d.y.abs(), 1);
            assert_eq!(dir.is_horizontal(), d.y == 0);
        }
    }
}
