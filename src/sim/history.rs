/// Undo stack for one level.
///
/// Each entry is a full `LevelState` clone taken before an undoable move.
/// The first snapshot ever recorded is kept separately so reset can
/// return to it even after the stack has been popped empty.

use crate::domain::entity::LevelState;

#[derive(Default, Debug)]
pub struct History {
    undo_stack: Vec<LevelState>,
    first: Option<LevelState>,
}

impl History {
    pub fn new() -> Self {
        History::default()
    }

    /// Remember the state as it was before an accepted move.
    pub fn record(&mut self, pre_move: &LevelState) {
        if self.first.is_none() {
            self.first = Some(pre_move.clone());
        }
        self.undo_stack.push(pre_move.clone());
    }

    /// Most recent snapshot, removed from the stack. No redo.
    pub fn undo(&mut self) -> Option<LevelState> {
        self.undo_stack.pop()
    }

    /// First snapshot of the level, if anything was ever recorded.
    /// Empties the undo stack; the first snapshot survives.
    pub fn reset(&mut self) -> Option<LevelState> {
        let first = self.first.clone()?;
        self.undo_stack.clear();
        Some(first)
    }

    /// Forget everything, first snapshot included.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.first = None;
    }

    pub fn depth(&self) -> usize {
        self.undo_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::domain::entity::Player;
    use crate::domain::geom::Vec2;
    use crate::domain::grid::HoleGrid;

    fn state_at(x: i32) -> LevelState {
        LevelState {
            size: Vec2::new(4, 1),
            holes: Rc::new(HoleGrid::from_rows(&["...."]).unwrap()),
            player: Player::new(Vec2::new(x, 0)),
            downstairs: vec![Vec2::new(3, 0)],
            crate_box: None,
            rail: None,
            portal: None,
            max_visited_layer: 0,
        }
    }

    #[test]
    fn undo_pops_in_reverse_order() {
        let mut h = History::new();
        h.record(&state_at(0));
        h.record(&state_at(1));
        assert_eq!(h.depth(), 2);
        assert_eq!(h.undo(), Some(state_at(1)));
        assert_eq!(h.undo(), Some(state_at(0)));
        assert_eq!(h.undo(), None);
    }

    #[test]
    fn reset_returns_first_snapshot_and_empties_stack() {
        let mut h = History::new();
        h.record(&state_at(0));
        h.record(&state_at(1));
        h.record(&state_at(2));
        assert_eq!(h.reset(), Some(state_at(0)));
        assert_eq!(h.depth(), 0);
        // still available after undo drained everything
        assert_eq!(h.reset(), Some(state_at(0)));
    }

    #[test]
    fn reset_without_history_is_nothing() {
        let mut h = History::new();
        assert_eq!(h.reset(), None);
    }

    #[test]
    fn clear_forgets_first_snapshot() {
        let mut h = History::new();
        h.record(&state_at(0));
        h.clear();
        assert_eq!(h.depth(), 0);
        assert_eq!(h.reset(), None);
    }
}
