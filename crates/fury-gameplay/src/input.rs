//! Input snapshot consumed by the simulation.
//!
//! The frame driver polls devices and hands the core one [`InputState`] per
//! tick. The world keeps the previous tick's state next to it so state
//! machines only ever ask edge questions through [`InputSnapshot`].

use serde::{Deserialize, Serialize};

/// Game intents the player can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Move up (towards the back of the street)
    MoveUp,
    /// Move down (towards the camera)
    MoveDown,
    /// Move left
    MoveLeft,
    /// Move right
    MoveRight,
    /// Punch, kick, throw or shoot
    Attack,
    /// Pick up items when auto pickup is off
    Interact,
    /// Jump
    Jump,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Action; 7] = [
        Action::MoveUp,
        Action::MoveDown,
        Action::MoveLeft,
        Action::MoveRight,
        Action::Attack,
        Action::Interact,
        Action::Jump,
    ];
}

/// Raw boolean intents for a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct InputState {
    /// Left held
    pub left: bool,
    /// Right held
    pub right: bool,
    /// Up held
    pub up: bool,
    /// Down held
    pub down: bool,
    /// Attack held
    pub attack: bool,
    /// Interact held
    pub interact: bool,
    /// Jump held
    pub jump: bool,
}

impl InputState {
    /// Nothing held.
    pub const IDLE: Self = Self {
        left: false,
        right: false,
        up: false,
        down: false,
        attack: false,
        interact: false,
        jump: false,
    };

    /// Whether an action is held in this state.
    #[must_use]
    pub const fn get(&self, action: Action) -> bool {
        match action {
            Action::MoveUp => self.up,
            Action::MoveDown => self.down,
            Action::MoveLeft => self.left,
            Action::MoveRight => self.right,
            Action::Attack => self.attack,
            Action::Interact => self.interact,
            Action::Jump => self.jump,
        }
    }

    /// Set an action's held flag.
    pub fn set(&mut self, action: Action, held: bool) {
        match action {
            Action::MoveUp => self.up = held,
            Action::MoveDown => self.down = held,
            Action::MoveLeft => self.left = held,
            Action::MoveRight => self.right = held,
            Action::Attack => self.attack = held,
            Action::Interact => self.interact = held,
            Action::Jump => self.jump = held,
        }
    }

    /// Builder-style variant of [`InputState::set`].
    #[must_use]
    pub fn with(mut self, action: Action) -> Self {
        self.set(action, true);
        self
    }

    /// Check if any movement input is active.
    #[must_use]
    pub const fn has_movement(&self) -> bool {
        self.left || self.right || self.up || self.down
    }

    /// Movement direction (-1, 0 or 1 on each axis). Opposing keys cancel.
    #[must_use]
    pub fn move_direction(&self) -> (f32, f32) {
        let axis = |neg: bool, pos: bool| match (neg, pos) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
        (axis(self.left, self.right), axis(self.up, self.down))
    }
}

/// Current and previous tick input, with edge detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// This tick's state
    pub current: InputState,
    /// Last tick's state
    pub previous: InputState,
}

impl InputSnapshot {
    /// Creates a snapshot from two states.
    #[must_use]
    pub const fn new(current: InputState, previous: InputState) -> Self {
        Self { current, previous }
    }

    /// Went down this tick.
    #[must_use]
    pub const fn pressed(&self, action: Action) -> bool {
        self.current.get(action) && !self.previous.get(action)
    }

    /// Down this tick, regardless of last tick.
    #[must_use]
    pub const fn held(&self, action: Action) -> bool {
        self.current.get(action)
    }

    /// Went up this tick.
    #[must_use]
    pub const fn released(&self, action: Action) -> bool {
        !self.current.get(action) && self.previous.get(action)
    }

    /// Roll the current state into the previous slot and install the next one.
    pub fn advance(&mut self, next: InputState) {
        self.previous = self.current;
        self.current = next;
    }

    /// End of tick: the current state becomes the previous one.
    pub fn roll_over(&mut self) {
        self.previous = self.current;
    }
}
