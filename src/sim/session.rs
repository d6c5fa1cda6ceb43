/// Session: everything that changes while one level is being played.
///
/// ## Flow
///
///   input → `queue` (FIFO) → `tick()` → `step::apply_action()` → events
///
/// At most one queued action is applied per tick, and only while no
/// animation is running and the phase is `Playing`. Animations are
/// timers only; the discrete state is already final when they start.
///
/// ## Phases
///
///   Intro ──(sequence done)──▶ Playing ──(win)──▶ Outro ──(done)──▶ Intro
///
/// Leaving the outro restores the level's first snapshot, clears the
/// history and plays the intro again, so the level starts over.

use std::collections::VecDeque;

use crate::config::{RulesConfig, TimingConfig};
use crate::domain::entity::LevelState;
use crate::domain::geom::{Dir, Vec2};
use crate::domain::rules::AnimationHint;
use super::event::GameEvent;
use super::history::History;
use super::level::LevelDef;
use super::sequence::Sequence;
use super::step;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Intro,
    Playing,
    Outro,
}

/// Player intent, as queued by the input layer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Move(Dir),
    Undo,
    Reset,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AnimKind {
    /// Accepted move, described by the resolver's hints.
    Move(Vec<AnimationHint>),
    /// Rejected move: nudge towards `Dir` and back.
    Recoil(Dir),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    pub kind: AnimKind,
    pub elapsed_ms: u32,
    pub duration_ms: u32,
}

impl Animation {
    pub fn new(kind: AnimKind, duration_ms: u32) -> Self {
        Animation { kind, elapsed_ms: 0, duration_ms }
    }

    /// Progress in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        (self.elapsed_ms as f32 / self.duration_ms as f32).min(1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }
}

pub struct Session {
    pub state: LevelState,
    pub history: History,
    /// Set when the final downstair is reached; cleared when the outro ends.
    pub won: bool,
    pub phase: Phase,
    pub queue: VecDeque<Action>,
    pub anim: Option<Animation>,
    pub sequence: Sequence,
    pub level_name: String,
    pub level_index: usize,

    // ── UI ──
    pub message: String,
    pub message_timer_ms: u32,

    pub(super) rules: RulesConfig,
    pub(super) timing: TimingConfig,
}

impl Session {
    /// Start `def` with its intro sequence.
    pub fn new(def: &LevelDef, level_index: usize, rules: RulesConfig, timing: TimingConfig) -> Self {
        tracing::info!("starting level {} \"{}\"", level_index + 1, def.name);
        Session {
            state: def.initial_state(),
            history: History::new(),
            won: false,
            phase: Phase::Intro,
            queue: VecDeque::new(),
            anim: None,
            sequence: Sequence::intro(&def.name, timing.sequence_step_ms),
            level_name: def.name.clone(),
            level_index,
            message: String::new(),
            message_timer_ms: 0,
            rules,
            timing,
        }
    }

    pub fn enqueue(&mut self, action: Action) {
        self.queue.push_back(action);
    }

    pub fn is_idle(&self) -> bool {
        self.anim.is_none()
    }

    pub fn set_message(&mut self, msg: &str) {
        self.message = msg.to_string();
        self.message_timer_ms = self.timing.message_ms;
    }

    /// Skip the current sequence state (Enter / Space / confirm button).
    pub fn skip(&mut self) {
        if self.phase != Phase::Playing {
            self.sequence.skip();
        }
    }

    /// Advance time by `dt_ms` and apply at most one queued action.
    pub fn tick(&mut self, dt_ms: u32) -> Vec<GameEvent> {
        if self.message_timer_ms > 0 {
            self.message_timer_ms = self.message_timer_ms.saturating_sub(dt_ms);
            if self.message_timer_ms == 0 {
                self.message.clear();
            }
        }

        if let Some(anim) = self.anim.as_mut() {
            anim.elapsed_ms = anim.elapsed_ms.saturating_add(dt_ms);
            if anim.is_finished() {
                self.anim = None;
            }
        }

        match self.phase {
            Phase::Intro => {
                self.queue.clear();
                self.sequence.update(dt_ms);
                if self.sequence.is_done() {
                    self.phase = Phase::Playing;
                }
                vec![]
            }
            Phase::Outro => {
                self.queue.clear();
                self.sequence.update(dt_ms);
                if self.sequence.is_done() {
                    step::finish_outro(self);
                }
                vec![]
            }
            Phase::Playing => {
                if !self.is_idle() {
                    return vec![];
                }
                match self.queue.pop_front() {
                    Some(action) => step::apply_action(self, action),
                    None => vec![],
                }
            }
        }
    }

    // ── Presentation queries ──

    /// Layer to draw this frame. Stairs swap it partway through.
    pub fn displayed_layer(&self) -> usize {
        let current = self.state.player.layer;
        match &self.anim {
            Some(anim @ Animation { kind: AnimKind::Move(hints), .. }) => {
                let t = anim.progress();
                hints.iter().fold(current, |layer, h| h.layer_at(t, layer))
            }
            _ => current,
        }
    }

    /// Cell to draw the player in this frame.
    pub fn player_draw_pos(&self) -> Vec2 {
        let pos = self.state.player.pos;
        let anim = match &self.anim {
            Some(a) => a,
            None => return pos,
        };
        let t = anim.progress();
        match &anim.kind {
            AnimKind::Recoil(dir) if t < 0.5 => pos + dir.delta(),
            AnimKind::Recoil(_) => pos,
            AnimKind::Move(hints) => {
                let player_from = hints.iter().rev().find_map(|h| match *h {
                    AnimationHint::Walk { from, .. }
                    | AnimationHint::Stairs { from, .. }
                    | AnimationHint::Teleport { from, .. }
                    | AnimationHint::Ride { from, .. }
                    | AnimationHint::StepOntoCrate { from, .. } => Some(from),
                    _ => None,
                });
                match player_from {
                    Some(from) if t < 0.5 => from,
                    _ => pos,
                }
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::parse_level;
    use crate::sim::sequence::SeqState;

    fn def() -> LevelDef {
        parse_level("# Test
@player 0,0
@stairs 1,0 3,0
....
....
").unwrap()
    }

    fn playing() -> Session {
        let mut s = Session::new(&def(), 0, RulesConfig::default(), TimingConfig::default());
        s.phase = Phase::Playing;
        s.sequence = Sequence::finished();
        s
    }

    /// Tick until the running animation is over.
    fn settle(s: &mut Session) {
        while !s.is_idle() {
            s.tick(1000);
        }
    }

    #[test]
    fn intro_runs_then_playing() {
        let mut s = Session::new(&def(), 0, RulesConfig::default(), TimingConfig::default());
        assert_eq!(s.phase, Phase::Intro);
        assert_eq!(s.sequence.state(), SeqState::Title);
        s.enqueue(Action::Move(Dir::Down));
        s.tick(1);
        assert!(s.queue.is_empty(), "actions are discarded during the intro");
        s.skip();
        s.skip();
        s.skip();
        s.tick(0);
        assert_eq!(s.phase, Phase::Playing);
    }

    #[test]
    fn one_action_per_idle_tick() {
        let mut s = playing();
        s.enqueue(Action::Move(Dir::Down));
        s.enqueue(Action::Move(Dir::Left));
        let events = s.tick(0);
        assert_eq!(events, vec![GameEvent::Stepped { to: Vec2::new(0, 1) }]);
        assert_eq!(s.queue.len(), 1);
        // animation still running: nothing dequeued
        assert!(s.tick(1).is_empty());
        assert_eq!(s.queue.len(), 1);
        settle(&mut s);
        assert!(s.queue.is_empty());
    }

    #[test]
    fn bump_starts_recoil_without_history() {
        let mut s = playing();
        s.enqueue(Action::Move(Dir::Up));
        let events = s.tick(0);
        assert!(matches!(events[0], GameEvent::Bumped { dir: Dir::Up, .. }));
        assert_eq!(s.history.depth(), 0);
        assert!(matches!(s.anim, Some(Animation { kind: AnimKind::Recoil(Dir::Up), .. })));
        assert_eq!(s.player_draw_pos(), Vec2::new(0, -1));
        settle(&mut s);
        assert_eq!(s.player_draw_pos(), Vec2::new(0, 0));
    }

    #[test]
    fn undo_restores_previous_state() {
        let mut s = playing();
        let before = s.state.clone();
        s.enqueue(Action::Move(Dir::Down));
        s.tick(0);
        settle(&mut s);
        assert_ne!(s.state, before);
        s.enqueue(Action::Undo);
        assert_eq!(s.tick(0), vec![GameEvent::Undone]);
        assert_eq!(s.state, before);
        // nothing left to undo
        s.enqueue(Action::Undo);
        assert!(s.tick(0).is_empty());
    }

    #[test]
    fn reset_restores_first_snapshot() {
        let mut s = playing();
        let first = s.state.clone();
        for dir in [Dir::Down, Dir::Right, Dir::Right] {
            s.enqueue(Action::Move(dir));
            s.tick(0);
            settle(&mut s);
        }
        s.enqueue(Action::Reset);
        assert_eq!(s.tick(0), vec![GameEvent::Reset]);
        assert_eq!(s.state, first);
        assert_eq!(s.history.depth(), 0);
    }

    #[test]
    fn stairs_swap_displayed_layer_mid_animation() {
        let mut s = playing();
        s.enqueue(Action::Move(Dir::Right));
        let events = s.tick(0);
        assert!(events.contains(&GameEvent::Stairs { from_layer: 0, to_layer: 1 }));
        assert_eq!(s.state.player.layer, 1);
        assert_eq!(s.displayed_layer(), 0);
        let stairs_ms = TimingConfig::default().stairs_ms;
        s.tick(stairs_ms * 7 / 10);
        assert_eq!(s.displayed_layer(), 1);
    }

    #[test]
    fn win_plays_outro_then_restarts_level() {
        let mut s = playing();
        let first = s.state.clone();
        for dir in [Dir::Right, Dir::Right, Dir::Right] {
            s.enqueue(Action::Move(dir));
            let events = s.tick(0);
            settle(&mut s);
            if s.won {
                assert!(events.contains(&GameEvent::Won));
            }
        }
        assert!(s.won);
        assert_eq!(s.phase, Phase::Outro);
        while s.phase == Phase::Outro {
            s.skip();
            s.tick(0);
        }
        assert_eq!(s.phase, Phase::Intro);
        assert_eq!(s.sequence.state(), SeqState::Title);
        assert!(!s.won);
        assert_eq!(s.state, first);
        assert_eq!(s.history.depth(), 0);
        while s.phase == Phase::Intro {
            s.skip();
            s.tick(0);
        }
        assert_eq!(s.phase, Phase::Playing);
    }

    #[test]
    fn message_expires() {
        let mut s = playing();
        s.set_message("hello");
        s.tick(TimingConfig::default().message_ms - 1);
        assert_eq!(s.message, "hello");
        s.tick(1);
        assert!(s.message.is_empty());
    }
}
