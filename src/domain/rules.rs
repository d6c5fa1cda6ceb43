/// Move resolution: one directional input in, next level state out.
///
/// Pure function over an immutable `LevelState`. The resolver clones the
/// state, mutates the clone, and either returns it as the new state or
/// drops it and reports a bump. A bump never changes anything.
///
/// ## Decision order (first matching rule decides)
///
/// ┌───┬────────────────────────────────────┬──────────────────────────────┐
/// │ # │ Condition                          │ Result                       │
/// ├───┼────────────────────────────────────┼──────────────────────────────┤
/// │ 1 │ target out of bounds               │ BUMP                         │
/// │ 2 │ target is the upstair              │ layer - 1                    │
/// │ 3 │ target is the downstair            │ layer + 1, or WIN on last    │
/// │ 4 │ (provisional drop, crate-filled)   │                              │
/// │ 5 │ target is portal entry             │ teleport, swap roles         │
/// │   │ target is portal exit              │ push exit / BUMP             │
/// │ 6 │ riding cart, horizontal move       │ slide cart / BUMP at end     │
/// │   │ target is rail (not cart)          │ BUMP                         │
/// │ 7 │ target floor higher than player    │ BUMP (no climbing)           │
/// │ 8 │ target is crate, same depth        │ push crate / BUMP            │
/// │   │ target is crate, deeper            │ stand on crate               │
/// │ 9 │ otherwise                          │ walk                         │
/// └───┴────────────────────────────────────┴──────────────────────────────┘

use crate::config::RulesConfig;

use super::entity::{LevelState, Rail};
use super::geom::{Dir, Vec2};
use super::grid::find_drop_at;
use super::occupancy::{thing_at, Thing};

/// Animation progress at which a stairs transition shows the new layer.
pub const STAIRS_SWAP_AT: f32 = 0.6;

/// Visual description of what an accepted move did.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AnimationHint {
    Walk { from: Vec2, to: Vec2 },
    Stairs { from: Vec2, to: Vec2, from_layer: usize, to_layer: usize },
    Teleport { from: Vec2, to: Vec2 },
    Ride { from: Vec2, to: Vec2 },
    StepOntoCrate { from: Vec2, to: Vec2 },
    CratePushed { from: Vec2, to: Vec2 },
    CrateTeleported { from: Vec2, to: Vec2 },
    ExitPushed { from: Vec2, to: Vec2 },
}

impl AnimationHint {
    /// Layer to draw at animation progress `t` (0.0..=1.0).
    /// Only stairs transitions change the displayed layer.
    pub fn layer_at(&self, t: f32, current: usize) -> usize {
        match *self {
            AnimationHint::Stairs { from_layer, to_layer, .. } => {
                if t >= STAIRS_SWAP_AT { to_layer } else { from_layer }
            }
            _ => current,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Continue,
    /// The player stepped into the downstair of the final layer.
    Won,
}

#[derive(Clone, Debug)]
pub struct Transition {
    pub state: LevelState,
    pub hints: Vec<AnimationHint>,
    pub outcome: Outcome,
    pub undoable: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BumpReason {
    OutOfBounds,
    Blocked(Thing),
    /// Target floor is above the player's current depth.
    TooHigh,
    /// Cart already at the end of its rail.
    RailEnd,
    /// Portal exit push with mismatched depths.
    DepthMismatch,
}

/// Rejected move. Carries the direction for the recoil animation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Bump {
    pub dir: Dir,
    pub reason: BumpReason,
}

pub fn advance(state: &LevelState, dir: Dir, rules: &RulesConfig) -> Result<Transition, Bump> {
    let mut next = state.clone();
    let mut hints = Vec::with_capacity(2);
    let outcome = resolve(&mut next, dir, rules, &mut hints)
        .map_err(|reason| Bump { dir, reason })?;
    Ok(Transition { state: next, hints, outcome, undoable: true })
}

fn resolve(
    s: &mut LevelState,
    dir: Dir,
    rules: &RulesConfig,
    hints: &mut Vec<AnimationHint>,
) -> Result<Outcome, BumpReason> {
    let step = dir.delta();
    let from = s.player.pos;
    let to = from + step;
    let layer = s.player.layer;

    if !to.in_bounds(s.size) {
        return Err(BumpReason::OutOfBounds);
    }

    // ── Stairs ──
    if s.upstair() == Some(to) {
        s.player.layer = layer - 1;
        s.player.pos = to;
        s.player.drop = find_drop_at(to, s.max_visited_layer, &s.holes, s.live_crate());
        hints.push(AnimationHint::Stairs { from, to, from_layer: layer, to_layer: layer - 1 });
        return Ok(Outcome::Continue);
    }
    if s.downstair() == Some(to) {
        if s.is_last_layer() {
            s.player.pos = to;
            hints.push(AnimationHint::Walk { from, to });
            return Ok(Outcome::Won);
        }
        s.player.layer = layer + 1;
        s.max_visited_layer = s.max_visited_layer.max(layer + 1);
        s.player.pos = to;
        s.player.drop = find_drop_at(to, s.max_visited_layer, &s.holes, s.live_crate());
        hints.push(AnimationHint::Stairs { from, to, from_layer: layer, to_layer: layer + 1 });
        return Ok(Outcome::Continue);
    }

    let crate_pos = s.live_crate();
    let provisional_drop = find_drop_at(to, layer, &s.holes, crate_pos);

    // ── Portal ──
    if let Some(portal) = s.live_portal().copied() {
        if to == portal.entry() {
            let exit = portal.exit();
            s.player.pos = exit;
            s.player.drop = find_drop_at(exit, layer, &s.holes, crate_pos);
            if let Some(p) = s.portal.as_mut() {
                p.swap();
            }
            hints.push(AnimationHint::Teleport { from, to: exit });
            return Ok(Outcome::Continue);
        }
        if to == portal.exit() {
            let beyond = to + step;
            if rules.tp_exit_ignores_depth {
                // the exit may float, the player still cannot climb
                if provisional_drop < s.player.drop {
                    return Err(BumpReason::TooHigh);
                }
            } else {
                let exit_drop = find_drop_at(to, layer, &s.holes, None);
                let beyond_drop = find_drop_at(beyond, layer, &s.holes, None);
                if exit_drop != s.player.drop || beyond_drop != s.player.drop {
                    return Err(BumpReason::DepthMismatch);
                }
            }
            match thing_at(s, beyond) {
                Thing::None => {}
                Thing::Crate if rules.can_tp_crate => {}
                other => return Err(BumpReason::Blocked(other)),
            }
            if let Some(p) = s.portal.as_mut() {
                p.set_exit(beyond);
            }
            s.player.pos = to;
            s.player.drop = provisional_drop;
            hints.push(AnimationHint::ExitPushed { from: to, to: beyond });
            hints.push(AnimationHint::Walk { from, to });
            return Ok(Outcome::Continue);
        }
    }

    // ── Rail ──
    if let Some(rail) = s.live_rail().copied() {
        let cart = rail.cart_pos();
        if from == cart && dir.is_horizontal() {
            let offset = rail.slide(step.x).ok_or(BumpReason::RailEnd)?;
            s.rail = Some(Rail { offset, ..rail });
            s.player.pos = to;
            s.player.drop = 0;
            hints.push(AnimationHint::Ride { from, to });
            return Ok(Outcome::Continue);
        }
        if to != cart && rail.spans(to) {
            return Err(BumpReason::Blocked(Thing::Rail));
        }
    }

    // ── Depth ──
    let new_drop = find_drop_at(to, layer, &s.holes, None);
    if new_drop < s.player.drop {
        return Err(BumpReason::TooHigh);
    }

    // ── Crate ──
    if let Some(crate_at) = crate_pos.filter(|&c| c == to) {
        let crate_drop = find_drop_at(crate_at, layer, &s.holes, None);
        if crate_drop != s.player.drop {
            s.player.pos = to;
            s.player.drop = crate_drop - 1;
            hints.push(AnimationHint::StepOntoCrate { from, to });
            return Ok(Outcome::Continue);
        }

        let beyond = crate_at + step;
        let landing = match thing_at(s, beyond) {
            Thing::None => {
                if find_drop_at(beyond, layer, &s.holes, None) < s.player.drop {
                    return Err(BumpReason::TooHigh);
                }
                hints.push(AnimationHint::CratePushed { from: crate_at, to: beyond });
                beyond
            }
            Thing::PortalEntry if rules.can_tp_crate => {
                let landing = crate_through_portal(s, step, rules)?;
                hints.push(AnimationHint::CrateTeleported { from: crate_at, to: landing });
                landing
            }
            other => return Err(BumpReason::Blocked(other)),
        };
        if let Some(c) = s.crate_box.as_mut() {
            c.pos = landing;
        }
        s.player.pos = to;
        s.player.drop = new_drop;
        hints.push(AnimationHint::Walk { from, to });
        return Ok(Outcome::Continue);
    }

    s.player.pos = to;
    s.player.drop = new_drop;
    hints.push(AnimationHint::Walk { from, to });
    Ok(Outcome::Continue)
}

/// Where a crate pushed into the portal entry comes out.
/// Swaps the portal roles when configured to.
fn crate_through_portal(s: &mut LevelState, step: Vec2, rules: &RulesConfig) -> Result<Vec2, BumpReason> {
    let exit = match s.live_portal() {
        Some(p) => p.exit(),
        None => return Err(BumpReason::Blocked(Thing::PortalEntry)),
    };
    let landing = if rules.extra_tp_crate_move {
        let past_exit = exit + step;
        match thing_at(s, past_exit) {
            Thing::None => past_exit,
            other => return Err(BumpReason::Blocked(other)),
        }
    } else {
        exit
    };
    if rules.switch_tp_after_crate {
        if let Some(p) = s.portal.as_mut() {
            p.swap();
        }
    }
    Ok(landing)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
