/// Gamepad input via gilrs, reduced to the game's own commands.
///
/// Raw gilrs events are translated into `PadEvent`s, and everything past
/// that point is plain state that tests can drive directly.
///
///   D-pad                 →  dig/move, the most recently pressed direction wins
///   Left stick            →  dig/move along the dominant axis
///   Buttons               →  `PadCommand`s, bound from `[gamepad]` in config.toml
///
/// Default bindings: Start/A confirm, Select quits, Y restarts,
/// R1 cycles routes, L1 cycles strategies.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::grid::Dir;

const STICK_DEADZONE: f32 = 0.25;

/// Session commands a button can be bound to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PadCommand {
    Confirm,
    Quit,
    Restart,
    NextRoute,
    NextStrategy,
}

/// Bindable buttons, named the way config.toml spells them.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PadButton {
    A,
    B,
    X,
    Y,
    L1,
    R1,
    L2,
    R2,
    Start,
    Select,
}

impl PadButton {
    fn parse(name: &str) -> Option<PadButton> {
        let button = match name.to_ascii_uppercase().as_str() {
            "A" => PadButton::A,
            "B" => PadButton::B,
            "X" => PadButton::X,
            "Y" => PadButton::Y,
            "L1" | "LB" => PadButton::L1,
            "R1" | "RB" => PadButton::R1,
            "L2" | "LT" => PadButton::L2,
            "R2" | "RT" => PadButton::R2,
            "START" => PadButton::Start,
            "SELECT" | "BACK" => PadButton::Select,
            _ => return None,
        };
        Some(button)
    }
}

/// Input after translation from the backend.
#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PadEvent {
    Pressed(PadButton),
    DirDown(Dir),
    DirUp(Dir),
    /// Left stick position, y positive up.
    Stick { x: f32, y: f32 },
    Disconnected,
}

/// Button → command table. A command whose configured list holds no
/// known button keeps its default binding.
#[derive(Clone, Debug, PartialEq)]
pub struct Bindings(Vec<(PadButton, PadCommand)>);

impl Default for Bindings {
    fn default() -> Self {
        Bindings(vec![
            (PadButton::Start, PadCommand::Confirm),
            (PadButton::A, PadCommand::Confirm),
            (PadButton::Select, PadCommand::Quit),
            (PadButton::Y, PadCommand::Restart),
            (PadButton::R1, PadCommand::NextRoute),
            (PadButton::L1, PadCommand::NextStrategy),
        ])
    }
}

impl Bindings {
    pub fn from_config(cfg: &GamepadConfig) -> Bindings {
        let defaults = Bindings::default();
        let mut table = Vec::new();
        let lists = [
            (PadCommand::Confirm, &cfg.confirm),
            (PadCommand::Quit, &cfg.cancel),
            (PadCommand::Restart, &cfg.restart),
            (PadCommand::NextRoute, &cfg.next_path),
            (PadCommand::NextStrategy, &cfg.next_strategy),
        ];
        for (command, names) in lists {
            let before = table.len();
            for name in names {
                match PadButton::parse(name) {
                    Some(button) => table.push((button, command)),
                    None => log::warn!("unknown gamepad button {name:?} for {command:?}"),
                }
            }
            if table.len() == before {
                table.extend(defaults.0.iter().filter(|(_, c)| *c == command).copied());
            }
        }
        Bindings(table)
    }

    fn commands_for(&self, button: PadButton) -> impl Iterator<Item = PadCommand> + '_ {
        self.0.iter().filter(move |(b, _)| *b == button).map(|(_, c)| *c)
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,
    bindings: Bindings,
    /// Commands triggered since the last `update`.
    fired: Vec<PadCommand>,
    /// Held D-pad directions, oldest first.
    dpad: Vec<Dir>,
    stick: (f32, f32),
}

impl GamepadState {
    pub fn new() -> Self {
        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: Gilrs::new()
                .map_err(|e| log::info!("gamepad support unavailable: {e}"))
                .ok(),
            bindings: Bindings::default(),
            fired: Vec::new(),
            dpad: Vec::new(),
            stick: (0.0, 0.0),
        }
    }

    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        self.bindings = Bindings::from_config(cfg);
    }

    /// Start a new frame: forget last frame's commands, read the backend.
    pub fn update(&mut self) {
        self.fired.clear();

        #[cfg(feature = "gamepad")]
        for event in self.poll_gilrs() {
            self.apply(event);
        }
    }

    pub fn apply(&mut self, event: PadEvent) {
        match event {
            PadEvent::Pressed(button) => {
                let commands: Vec<PadCommand> = self.bindings.commands_for(button).collect();
                self.fired.extend(commands);
            }
            PadEvent::DirDown(dir) => {
                self.dpad.retain(|d| *d != dir);
                self.dpad.push(dir);
            }
            PadEvent::DirUp(dir) => self.dpad.retain(|d| *d != dir),
            PadEvent::Stick { x, y } => self.stick = (x, y),
            PadEvent::Disconnected => {
                self.dpad.clear();
                self.stick = (0.0, 0.0);
            }
        }
    }

    pub fn pressed(&self, command: PadCommand) -> bool {
        self.fired.contains(&command)
    }

    /// Held direction: the latest D-pad press, else the stick.
    pub fn movement(&self) -> Option<Dir> {
        self.dpad.last().copied().or_else(|| stick_dir(self.stick))
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) -> Vec<PadEvent> {
        let Some(gilrs) = self.gilrs.as_mut() else { return Vec::new() };
        let mut events = Vec::new();
        while let Some(ev) = gilrs.next_event() {
            events.extend(translate(ev.event, &mut self.stick));
        }
        events
    }
}

/// Dominant stick axis outside the deadzone.
fn stick_dir((x, y): (f32, f32)) -> Option<Dir> {
    if x.abs().max(y.abs()) <= STICK_DEADZONE {
        return None;
    }
    Some(if x.abs() > y.abs() {
        if x < 0.0 { Dir::Left } else { Dir::Right }
    } else if y > 0.0 {
        Dir::Up
    } else {
        Dir::Down
    })
}

#[cfg(feature = "gamepad")]
fn translate(event: EventType, stick: &mut (f32, f32)) -> Option<PadEvent> {
    match event {
        EventType::ButtonPressed(button, _) => match dpad_dir(button) {
            Some(dir) => Some(PadEvent::DirDown(dir)),
            None => pad_button(button).map(PadEvent::Pressed),
        },
        EventType::ButtonReleased(button, _) => dpad_dir(button).map(PadEvent::DirUp),
        EventType::AxisChanged(Axis::LeftStickX, x, _) => {
            stick.0 = x;
            Some(PadEvent::Stick { x, y: stick.1 })
        }
        EventType::AxisChanged(Axis::LeftStickY, y, _) => {
            stick.1 = y;
            Some(PadEvent::Stick { x: stick.0, y })
        }
        EventType::Disconnected => Some(PadEvent::Disconnected),
        _ => None,
    }
}

#[cfg(feature = "gamepad")]
fn dpad_dir(button: Button) -> Option<Dir> {
    match button {
        Button::DPadUp => Some(Dir::Up),
        Button::DPadDown => Some(Dir::Down),
        Button::DPadLeft => Some(Dir::Left),
        Button::DPadRight => Some(Dir::Right),
        _ => None,
    }
}

#[cfg(feature = "gamepad")]
fn pad_button(button: Button) -> Option<PadButton> {
    match button {
        Button::South => Some(PadButton::A),
        Button::East => Some(PadButton::B),
        Button::West => Some(PadButton::X),
        Button::North => Some(PadButton::Y),
        Button::LeftTrigger => Some(PadButton::L1),
        Button::RightTrigger => Some(PadButton::R1),
        Button::LeftTrigger2 => Some(PadButton::L2),
        Button::RightTrigger2 => Some(PadButton::R2),
        Button::Start => Some(PadButton::Start),
        Button::Select => Some(PadButton::Select),
        _ => None,
    }
}
