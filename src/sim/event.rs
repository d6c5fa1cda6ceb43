/// Events emitted while applying an action.
/// The presentation layer consumes these for sound and logging.

use crate::domain::geom::{Dir, Vec2};
use crate::domain::rules::BumpReason;

#[allow(dead_code)]
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Stepped { to: Vec2 },
    Bumped { dir: Dir, reason: BumpReason },
    Stairs { from_layer: usize, to_layer: usize },
    /// First visit to `layer`; mechanics may have come alive.
    LayerDiscovered { layer: usize },
    Teleported { to: Vec2 },
    CratePushed { to: Vec2 },
    Rode { to: Vec2 },
    Undone,
    Reset,
    Won,
}
