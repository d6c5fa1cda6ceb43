/// Occupancy: what is in a cell, given which mechanics are live.
///
/// The order of the checks matters, the first match wins:
///   player → out of bounds → upstair → downstair → crate →
///   cart → rail → portal entry → portal exit → nothing

use super::entity::LevelState;
use super::geom::Vec2;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Thing {
    Player,
    Oob,
    Upstair,
    Downstair,
    Crate,
    Cart,
    Rail,
    PortalEntry,
    PortalExit,
    None,
}

pub fn thing_at(state: &LevelState, pos: Vec2) -> Thing {
    if pos == state.player.pos {
        return Thing::Player;
    }
    if !pos.in_bounds(state.size) {
        return Thing::Oob;
    }
    if state.upstair() == Some(pos) {
        return Thing::Upstair;
    }
    if state.downstair() == Some(pos) {
        return Thing::Downstair;
    }
    if state.live_crate() == Some(pos) {
        return Thing::Crate;
    }
    if let Some(rail) = state.live_rail() {
        if rail.cart_pos() == pos {
            return Thing::Cart;
        }
        if rail.spans(pos) {
            return Thing::Rail;
        }
    }
    if let Some(portal) = state.live_portal() {
        if portal.entry() == pos {
            return Thing::PortalEntry;
        }
        if portal.exit() == pos {
            return Thing::PortalExit;
        }
    }
    Thing::None
}
