/// Entities: Player, Crate, Rail cart, Portal pair, and the level state
/// that owns them.
///
/// Every field is a plain value or an `Rc` to immutable data, so
/// `LevelState::clone()` is always an independent snapshot.

use std::rc::Rc;

use super::geom::Vec2;
use super::grid::HoleGrid;

/// First layer whose visit brings each mechanic to life.
pub const CRATE_UNLOCK_LAYER: usize = 1;
pub const RAIL_UNLOCK_LAYER: usize = 2;
pub const PORTAL_UNLOCK_LAYER: usize = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Player {
    /// Index into `downstairs`: the floor the player is on (0 = top).
    pub layer: usize,
    /// Resolved depth below the surface plane (0 = nearest revealed surface).
    pub drop: i32,
    pub pos: Vec2,
}

impl Player {
    pub fn new(pos: Vec2) -> Self {
        Player { layer: 0, drop: 0, pos }
    }
}

/// Pushable crate, also usable as a platform.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Crate {
    pub pos: Vec2,
}

/// Cart confined to a straight rail.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rail {
    pub top_left: Vec2,
    pub horizontal: bool,
    pub length: i32,
    /// Cart position along the rail, `0 <= offset < length`.
    pub offset: i32,
}

impl Rail {
    fn require_horizontal(&self) {
        if !self.horizontal {
            panic!("vertical rails are not implemented (rail at {:?})", self.top_left);
        }
    }

    pub fn cart_pos(&self) -> Vec2 {
        self.require_horizontal();
        self.top_left + Vec2::new(self.offset, 0)
    }

    /// Is `pos` anywhere on the rail span, cart included?
    pub fn spans(&self, pos: Vec2) -> bool {
        self.require_horizontal();
        pos.y == self.top_left.y
            && pos.x >= self.top_left.x
            && pos.x < self.top_left.x + self.length
    }

    /// Offset after sliding by `dx`, if it stays on the rail.
    pub fn slide(&self, dx: i32) -> Option<i32> {
        let next = self.offset + dx;
        (0..self.length).contains(&next).then_some(next)
    }
}

/// Directed teleport pair. One end is the entry, the other the exit;
/// using the entry reverses the roles.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Portal {
    pub a: Vec2,
    pub b: Vec2,
    pub a_is_entry: bool,
}

impl Portal {
    pub fn new(entry: Vec2, exit: Vec2) -> Self {
        Portal { a: entry, b: exit, a_is_entry: true }
    }

    pub fn entry(&self) -> Vec2 {
        if self.a_is_entry { self.a } else { self.b }
    }

    pub fn exit(&self) -> Vec2 {
        if self.a_is_entry { self.b } else { self.a }
    }

    pub fn swap(&mut self) {
        self.a_is_entry = !self.a_is_entry;
    }

    pub fn set_exit(&mut self, pos: Vec2) {
        if self.a_is_entry { self.b = pos } else { self.a = pos }
    }
}

/// Which mechanics are live right now.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Unlocked {
    pub crate_box: bool,
    pub rail: bool,
    pub portal: bool,
}

#[derive(Clone, PartialEq, Debug)]
pub struct LevelState {
    pub size: Vec2,
    pub holes: Rc<HoleGrid>,
    pub player: Player,
    /// One staircase per layer boundary, never moved.
    pub downstairs: Vec<Vec2>,
    pub crate_box: Option<Crate>,
    pub rail: Option<Rail>,
    pub portal: Option<Portal>,
    pub max_visited_layer: usize,
}

impl LevelState {
    pub fn unlocked(&self) -> Unlocked {
        let depth = self.max_visited_layer;
        Unlocked {
            crate_box: self.crate_box.is_some() && depth >= CRATE_UNLOCK_LAYER,
            rail: self.rail.is_some() && depth >= RAIL_UNLOCK_LAYER,
            portal: self.portal.is_some() && depth >= PORTAL_UNLOCK_LAYER,
        }
    }

    /// Upstair of the player's current layer (none on the top layer).
    pub fn upstair(&self) -> Option<Vec2> {
        let layer = self.player.layer;
        if layer == 0 { None } else { self.downstairs.get(layer - 1).copied() }
    }

    pub fn downstair(&self) -> Option<Vec2> {
        self.downstairs.get(self.player.layer).copied()
    }

    pub fn is_last_layer(&self) -> bool {
        self.player.layer + 1 >= self.downstairs.len()
    }

    /// Crate position, only while the crate mechanic is live.
    pub fn live_crate(&self) -> Option<Vec2> {
        if self.unlocked().crate_box { self.crate_box.map(|c| c.pos) } else { None }
    }

    pub fn live_rail(&self) -> Option<&Rail> {
        if self.unlocked().rail { self.rail.as_ref() } else { None }
    }

    pub fn live_portal(&self) -> Option<&Portal> {
        if self.unlocked().portal { self.portal.as_ref() } else { None }
    }
}
