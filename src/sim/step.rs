/// The step function: applies one queued action to the session.
///
/// Processing order for a move:
///   1. Snapshot the current state
///   2. Resolve the move (pure, see `domain::rules`)
///   3. Accepted: record the snapshot, replace the state, start the
///      animation, emit events, check for the win
///   4. Bumped: start the recoil animation, emit `Bumped`
///
/// Undo and reset replace the state directly and do not animate. Undo
/// also drops any moves still queued behind it.

use crate::domain::entity::LevelState;
use crate::domain::rules::{self, AnimationHint, Outcome, Transition};
use super::event::GameEvent;
use super::session::{Action, AnimKind, Animation, Phase, Session};
use super::sequence::Sequence;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn apply_action(session: &mut Session, action: Action) -> Vec<GameEvent> {
    if session.phase != Phase::Playing {
        return vec![];
    }

    match action {
        Action::Move(dir) => {
            let snapshot = session.state.clone();
            match rules::advance(&snapshot, dir, &session.rules) {
                Ok(transition) => accept(session, snapshot, transition),
                Err(bump) => {
                    tracing::debug!(?dir, reason = ?bump.reason, "bump");
                    session.anim = Some(Animation::new(AnimKind::Recoil(bump.dir), session.timing.bump_ms));
                    vec![GameEvent::Bumped { dir: bump.dir, reason: bump.reason }]
                }
            }
        }
        Action::Undo => {
            session.queue.clear();
            match session.history.undo() {
                Some(prev) => {
                    session.state = prev;
                    session.anim = None;
                    tracing::debug!(depth = session.history.depth(), "undo");
                    vec![GameEvent::Undone]
                }
                None => vec![],
            }
        }
        Action::Reset => match session.history.reset() {
            Some(first) => {
                session.state = first;
                session.anim = None;
                tracing::debug!("reset");
                vec![GameEvent::Reset]
            }
            None => vec![],
        },
    }
}

// ══════════════════════════════════════════════════════════════
// Accepted move
// ══════════════════════════════════════════════════════════════

fn accept(session: &mut Session, snapshot: LevelState, t: Transition) -> Vec<GameEvent> {
    let mut events = Vec::with_capacity(t.hints.len() + 1);
    let deepest_before = snapshot.max_visited_layer;
    let unlocked_before = snapshot.unlocked();

    if t.undoable {
        session.history.record(&snapshot);
    }
    session.state = t.state;

    for hint in &t.hints {
        match *hint {
            AnimationHint::Walk { to, .. } | AnimationHint::StepOntoCrate { to, .. } => {
                events.push(GameEvent::Stepped { to });
            }
            AnimationHint::Stairs { from_layer, to_layer, .. } => {
                events.push(GameEvent::Stairs { from_layer, to_layer });
            }
            AnimationHint::Teleport { to, .. } => events.push(GameEvent::Teleported { to }),
            AnimationHint::Ride { to, .. } => events.push(GameEvent::Rode { to }),
            AnimationHint::CratePushed { to, .. } | AnimationHint::CrateTeleported { to, .. } => {
                events.push(GameEvent::CratePushed { to });
            }
            AnimationHint::ExitPushed { .. } => {}
        }
    }

    let deepest = session.state.max_visited_layer;
    if deepest > deepest_before {
        events.push(GameEvent::LayerDiscovered { layer: deepest });
        let unlocked = session.state.unlocked();
        if unlocked.crate_box && !unlocked_before.crate_box {
            session.set_message("A crate stirs. Push it, or climb on it.");
        } else if unlocked.rail && !unlocked_before.rail {
            session.set_message("A cart wakes on its rail.");
        } else if unlocked.portal && !unlocked_before.portal {
            session.set_message("The portal opens.");
        }
    }

    let duration = animation_ms(session, &t.hints);
    session.anim = Some(Animation::new(AnimKind::Move(t.hints), duration));

    let p = session.state.player;
    tracing::debug!(layer = p.layer, drop = p.drop, x = p.pos.x, y = p.pos.y, "moved");

    if t.outcome == Outcome::Won {
        tracing::info!("level \"{}\" cleared", session.level_name);
        session.won = true;
        session.phase = Phase::Outro;
        session.sequence = Sequence::outro(session.timing.sequence_step_ms);
        session.queue.clear();
        events.push(GameEvent::Won);
    }

    events
}

/// Longest timing among the hints of one move.
fn animation_ms(session: &Session, hints: &[AnimationHint]) -> u32 {
    hints.iter()
        .map(|h| match h {
            AnimationHint::Stairs { .. } => session.timing.stairs_ms,
            AnimationHint::Teleport { .. } | AnimationHint::CrateTeleported { .. } => session.timing.teleport_ms,
            _ => session.timing.move_ms,
        })
        .max()
        .unwrap_or(session.timing.move_ms)
}

// ══════════════════════════════════════════════════════════════
// Outro completion
// ══════════════════════════════════════════════════════════════

/// Back to the level's first snapshot with an empty history, then play
/// the intro again.
pub fn finish_outro(session: &mut Session) {
    if let Some(first) = session.history.reset() {
        session.state = first;
    }
    session.history.clear();
    session.won = false;
    session.anim = None;
    session.queue.clear();
    session.phase = Phase::Intro;
    session.sequence = Sequence::intro(&session.level_name, session.timing.sequence_step_ms);
    tracing::info!("level \"{}\" restarted after outro", session.level_name);
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RulesConfig, TimingConfig};
    use crate::domain::geom::{Dir, Vec2};
    use crate::domain::rules::BumpReason;
    use crate::sim::level::{embedded_levels, parse_level, LevelDef};

    fn session_for(def: &LevelDef) -> Session {
        let mut s = Session::new(def, 0, RulesConfig::default(), TimingConfig::default());
        s.phase = Phase::Playing;
        s.sequence = Sequence::finished();
        s
    }

    #[test]
    fn first_level_move_down_from_start() {
        let levels = embedded_levels();
        let mut s = session_for(&levels[0]);
        assert_eq!(s.state.player.pos, Vec2::new(12, 2));
        let events = apply_action(&mut s, Action::Move(Dir::Down));
        assert_eq!(events, vec![GameEvent::Stepped { to: Vec2::new(12, 3) }]);
        assert_eq!(s.state.player.drop, 0);
        assert_eq!(s.history.depth(), 1);
    }

    #[test]
    fn bump_leaves_state_and_history_alone() {
        let def = parse_level("@player 0,0\n@stairs 2,0\n...\n").unwrap();
        let mut s = session_for(&def);
        let before = s.state.clone();
        let events = apply_action(&mut s, Action::Move(Dir::Left));
        assert_eq!(events, vec![GameEvent::Bumped { dir: Dir::Left, reason: BumpReason::OutOfBounds }]);
        assert_eq!(s.state, before);
        assert_eq!(s.history.depth(), 0);
        assert!(matches!(s.anim, Some(Animation { kind: AnimKind::Recoil(Dir::Left), .. })));
    }

    #[test]
    fn undo_is_left_inverse_of_every_accepted_move() {
        let levels = embedded_levels();
        let mut s = session_for(&levels[3]);
        let path = [Dir::Down, Dir::Right, Dir::Right, Dir::Up, Dir::Up, Dir::Left, Dir::Down];
        for dir in path {
            let before = s.state.clone();
            let depth = s.history.depth();
            let events = apply_action(&mut s, Action::Move(dir));
            if matches!(events.first(), Some(GameEvent::Bumped { .. })) {
                assert_eq!(s.state, before);
                continue;
            }
            assert_eq!(s.history.depth(), depth + 1);
            let after = s.state.clone();
            apply_action(&mut s, Action::Undo);
            assert_eq!(s.state, before);
            // redo the move by hand to keep walking
            apply_action(&mut s, Action::Move(dir));
            assert_eq!(s.state, after);
        }
    }

    #[test]
    fn discovering_the_crate_layer_announces_it() {
        let def = parse_level("@player 0,0\n@stairs 1,0 3,0\n@crate 2,1\n....\n....\n").unwrap();
        let mut s = session_for(&def);
        let events = apply_action(&mut s, Action::Move(Dir::Right));
        assert!(events.contains(&GameEvent::LayerDiscovered { layer: 1 }));
        assert!(s.message.contains("crate"));
        assert_eq!(s.anim.as_ref().map(|a| a.duration_ms), Some(TimingConfig::default().stairs_ms));
    }

    #[test]
    fn actions_ignored_outside_playing() {
        let def = parse_level("@player 0,0\n@stairs 2,0\n...\n").unwrap();
        let mut s = session_for(&def);
        s.phase = Phase::Intro;
        assert!(apply_action(&mut s, Action::Move(Dir::Right)).is_empty());
        assert_eq!(s.state.player.pos, Vec2::new(0, 0));
    }

    #[test]
    fn winning_switches_to_outro() {
        let def = parse_level("@player 0,0\n@stairs 1,0\n..\n").unwrap();
        let mut s = session_for(&def);
        let events = apply_action(&mut s, Action::Move(Dir::Right));
        assert!(events.contains(&GameEvent::Won));
        assert!(s.won);
        assert_eq!(s.phase, Phase::Outro);
        finish_outro(&mut s);
        assert!(!s.won);
        assert_eq!(s.phase, Phase::Intro);
        assert!(!s.sequence.is_done());
        assert_eq!(s.state.player.pos, Vec2::new(0, 0));
        assert_eq!(s.history.depth(), 0);
        assert_eq!(s.history.reset(), None);
    }

    /// Mechanics level with everything unlocked, standing on layer 3.
    fn mechanics_session() -> Session {
        let def = parse_level("# Mechanics
@player 1,3
@stairs 7,0 7,1 7,2 7,3 7,4
@crate 2,3
@rail 1,1 4 h
@portal 0,2 6,2
........
........
........
........
........
").unwrap();
        let mut s = session_for(&def);
        s.state.player.layer = 3;
        s.state.max_visited_layer = 3;
        s
    }

    /// Apply one move, check undo restores the state exactly, then redo it.
    fn move_and_check_undo(s: &mut Session, dir: Dir) {
        let before = s.state.clone();
        let events = apply_action(s, Action::Move(dir));
        assert!(!matches!(events.first(), Some(GameEvent::Bumped { .. })), "{dir:?} bumped");
        let after = s.state.clone();
        assert_eq!(apply_action(s, Action::Undo), vec![GameEvent::Undone]);
        assert_eq!(s.state, before);
        apply_action(s, Action::Move(dir));
        assert_eq!(s.state, after);
    }

    #[test]
    fn undo_restores_crate_cart_and_portal() {
        let mut s = mechanics_session();

        // push the crate from (2,3) to (3,3)
        move_and_check_undo(&mut s, Dir::Right);
        assert_eq!(s.state.crate_box.map(|c| c.pos), Some(Vec2::new(3, 3)));

        // walk up onto the cart at (1,1), then ride it right
        move_and_check_undo(&mut s, Dir::Up);
        move_and_check_undo(&mut s, Dir::Left);
        move_and_check_undo(&mut s, Dir::Up);
        assert_eq!(s.state.player.pos, Vec2::new(1, 1));
        move_and_check_undo(&mut s, Dir::Right);
        assert_eq!(s.state.rail.map(|r| r.offset), Some(1));

        // back off the cart and through the portal entry at (0,2)
        move_and_check_undo(&mut s, Dir::Down);
        move_and_check_undo(&mut s, Dir::Left);
        move_and_check_undo(&mut s, Dir::Left);
        assert_eq!(s.state.player.pos, Vec2::new(6, 2));
        assert_eq!(s.state.portal.map(|p| p.entry()), Some(Vec2::new(6, 2)));
    }

    #[test]
    fn undo_drops_queued_moves() {
        let def = parse_level("@player 0,0\n@stairs 3,1\n....\n....\n").unwrap();
        let mut s = session_for(&def);
        apply_action(&mut s, Action::Move(Dir::Right));
        s.enqueue(Action::Move(Dir::Right));
        s.enqueue(Action::Move(Dir::Down));
        apply_action(&mut s, Action::Undo);
        assert!(s.queue.is_empty());
        assert_eq!(s.state.player.pos, Vec2::new(0, 0));
    }
}
