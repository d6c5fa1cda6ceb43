/// Keyboard input.
///
/// Moves are turn-based, so every Press (and terminal auto-Repeat) event
/// becomes one command; nothing is tracked as "held". Release events are
/// ignored. Commands are returned in arrival order so the session's FIFO
/// queue sees them exactly as typed.
///
/// Key map:
///   Arrows / WASD        →  Move
///   Z / U / Backspace    →  Undo
///   R                    →  Reset
///   N / P                →  Next / previous level
///   Enter / Space        →  Skip sequence text
///   Esc / Q / Ctrl+C     →  Quit

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::geom::Dir;
use crate::sim::session::Action;

/// What the frame loop should do with one input.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Play(Action),
    Skip,
    NextLevel,
    PrevLevel,
    Quit,
}

pub struct InputState {
    commands: Vec<Command>,
}

impl InputState {
    pub fn new() -> Self {
        InputState { commands: Vec::with_capacity(8) }
    }

    /// Drain all pending terminal events without blocking.
    /// Call this once per frame, before the session tick.
    pub fn drain_events(&mut self) -> &[Command] {
        self.commands.clear();
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if let Some(cmd) = map_key(key) {
                    self.commands.push(cmd);
                }
            }
        }
        &self.commands
    }
}

/// Translate one key event. `None` for releases and unbound keys.
pub fn map_key(key: KeyEvent) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Command::Quit),
            _ => None,
        };
    }

    let cmd = match key.code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Command::Play(Action::Move(Dir::Up)),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Command::Play(Action::Move(Dir::Down)),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Command::Play(Action::Move(Dir::Left)),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Command::Play(Action::Move(Dir::Right)),
        KeyCode::Char('z') | KeyCode::Char('Z')
        | KeyCode::Char('u') | KeyCode::Char('U')
        | KeyCode::Backspace => Command::Play(Action::Undo),
        KeyCode::Char('r') | KeyCode::Char('R') => Command::Play(Action::Reset),
        KeyCode::Char('n') | KeyCode::Char('N') => Command::NextLevel,
        KeyCode::Char('p') | KeyCode::Char('P') => Command::PrevLevel,
        KeyCode::Enter | KeyCode::Char(' ') => Command::Skip,
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn movement_keys() {
        assert_eq!(map_key(press(KeyCode::Up)), Some(Command::Play(Action::Move(Dir::Up))));
        assert_eq!(map_key(press(KeyCode::Char('a'))), Some(Command::Play(Action::Move(Dir::Left))));
        assert_eq!(map_key(press(KeyCode::Char('S'))), Some(Command::Play(Action::Move(Dir::Down))));
        assert_eq!(map_key(press(KeyCode::Right)), Some(Command::Play(Action::Move(Dir::Right))));
    }

    #[test]
    fn undo_reset_and_meta_keys() {
        assert_eq!(map_key(press(KeyCode::Char('z'))), Some(Command::Play(Action::Undo)));
        assert_eq!(map_key(press(KeyCode::Backspace)), Some(Command::Play(Action::Undo)));
        assert_eq!(map_key(press(KeyCode::Char('r'))), Some(Command::Play(Action::Reset)));
        assert_eq!(map_key(press(KeyCode::Char('n'))), Some(Command::NextLevel));
        assert_eq!(map_key(press(KeyCode::Char('p'))), Some(Command::PrevLevel));
        assert_eq!(map_key(press(KeyCode::Enter)), Some(Command::Skip));
        assert_eq!(map_key(press(KeyCode::Esc)), Some(Command::Quit));
        assert_eq!(map_key(press(KeyCode::Char('x'))), None);
    }

    #[test]
    fn ctrl_c_quits_and_other_chords_are_ignored() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(ctrl_c), Some(Command::Quit));
        let ctrl_z = KeyEvent::new(KeyCode::Char('z'), KeyModifiers::CONTROL);
        assert_eq!(map_key(ctrl_z), None);
    }

    #[test]
    fn releases_are_ignored() {
        let release = KeyEvent::new_with_kind_and_state(
            KeyCode::Up,
            KeyModifiers::NONE,
            KeyEventKind::Release,
            KeyEventState::NONE,
        );
        assert_eq!(map_key(release), None);
    }
}
