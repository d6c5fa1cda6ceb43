/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Move (one step per press)
///   B / L1                →  Undo
///   Y                     →  Reset
///   A / Start             →  Skip sequence text
///   Select                →  Quit

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::geom::Dir;
use crate::sim::session::Action;
use super::input::Command;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.5;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST" => Some(Btn::B),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "L1" | "LB" => Some(Btn::L1),
            "R1" | "RB" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Action-to-button mapping (loaded from config).
#[derive(Debug, PartialEq)]
struct ActionMap {
    undo: Vec<Btn>,
    reset: Vec<Btn>,
    confirm: Vec<Btn>,
    quit: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            undo: vec![Btn::B, Btn::L1],
            reset: vec![Btn::Y],
            confirm: vec![Btn::A, Btn::Start],
            quit: vec![Btn::Select],
        }
    }
}

impl ActionMap {
    fn command_for(&self, btn: Btn) -> Option<Command> {
        if self.undo.contains(&btn) {
            Some(Command::Play(Action::Undo))
        } else if self.reset.contains(&btn) {
            Some(Command::Play(Action::Reset))
        } else if self.confirm.contains(&btn) {
            Some(Command::Skip)
        } else if self.quit.contains(&btn) {
            Some(Command::Quit)
        } else {
            None
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    /// Stick direction currently past the deadzone, if any.
    stick_dir: Option<Dir>,
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,
    commands: Vec<Command>,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs_opt = match Gilrs::new() {
            Ok(g) => {
                for (_, pad) in g.gamepads() {
                    tracing::info!("gamepad found: {}", pad.name());
                }
                Some(g)
            }
            Err(e) => {
                tracing::warn!("gamepad support unavailable: {e}");
                None
            }
        };

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            stick_dir: None,
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            commands: Vec::with_capacity(4),
        }
    }

    /// Load button mapping from config. Empty or unknown lists keep the default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        let map = &mut self.action_map;
        let undo = parse_list(&cfg.undo);
        if !undo.is_empty() { map.undo = undo; }
        let reset = parse_list(&cfg.reset);
        if !reset.is_empty() { map.reset = reset; }
        let confirm = parse_list(&cfg.confirm);
        if !confirm.is_empty() { map.confirm = confirm; }
        let quit = parse_list(&cfg.quit);
        if !quit.is_empty() { map.quit = quit; }
    }

    /// Poll pending gamepad events; returns this frame's commands in order.
    pub fn update(&mut self) -> &[Command] {
        self.commands.clear();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();

        &self.commands
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => self.press_button(btn),
                EventType::AxisChanged(axis, value, _) => {
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                    self.update_stick();
                }
                EventType::Connected => tracing::info!("gamepad connected"),
                EventType::Disconnected => {
                    self.stick_x = 0.0;
                    self.stick_y = 0.0;
                    self.stick_dir = None;
                    tracing::info!("gamepad disconnected");
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn press_button(&mut self, gilrs_btn: Button) {
        let cmd = match gilrs_btn {
            Button::DPadUp => Some(Command::Play(Action::Move(Dir::Up))),
            Button::DPadDown => Some(Command::Play(Action::Move(Dir::Down))),
            Button::DPadLeft => Some(Command::Play(Action::Move(Dir::Left))),
            Button::DPadRight => Some(Command::Play(Action::Move(Dir::Right))),
            other => Btn::from_gilrs(other).and_then(|b| self.action_map.command_for(b)),
        };
        if let Some(cmd) = cmd {
            self.commands.push(cmd);
        }
    }

    /// Edge-trigger the stick: one move each time it leaves the centre
    /// or swings to a new direction.
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn update_stick(&mut self) {
        let dir = stick_direction(self.stick_x, self.stick_y);
        if dir != self.stick_dir {
            if let Some(d) = dir {
                self.commands.push(Command::Play(Action::Move(d)));
            }
            self.stick_dir = dir;
        }
    }
}

/// Dominant stick direction outside the deadzone. Stick Y points up.
fn stick_direction(x: f32, y: f32) -> Option<Dir> {
    if x.abs() < STICK_DEADZONE && y.abs() < STICK_DEADZONE {
        return None;
    }
    if x.abs() >= y.abs() {
        Some(if x < 0.0 { Dir::Left } else { Dir::Right })
    } else {
        Some(if y > 0.0 { Dir::Up } else { Dir::Down })
    }
}
