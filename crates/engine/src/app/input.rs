#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    Jump,
    Dash,
    Quit,
}

const ACTION_COUNT: usize = 5;

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveLeft,
        InputAction::MoveRight,
        InputAction::Jump,
        InputAction::Dash,
        InputAction::Quit,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::Jump => 2,
            InputAction::Dash => 3,
            InputAction::Quit => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InputAction::MoveLeft => "left",
            InputAction::MoveRight => "right",
            InputAction::Jump => "jump",
            InputAction::Dash => "dash",
            InputAction::Quit => "quit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

/// Input for one simulation step: held movement plus edge-triggered presses.
/// A press is reported on exactly one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    held: ActionStates,
    jump_pressed: bool,
    dash_pressed: bool,
    quit_requested: bool,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.held.set(action, is_down);
        self
    }

    pub fn with_jump_pressed(mut self, jump_pressed: bool) -> Self {
        self.jump_pressed = jump_pressed;
        self
    }

    pub fn with_dash_pressed(mut self, dash_pressed: bool) -> Self {
        self.dash_pressed = dash_pressed;
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.held.is_down(action)
    }

    /// -1, 0 or 1; opposing keys cancel.
    pub fn movement_x(&self) -> f32 {
        let right = self.is_down(InputAction::MoveRight) as i32;
        let left = self.is_down(InputAction::MoveLeft) as i32;
        (right - left) as f32
    }

    pub fn jump_pressed(&self) -> bool {
        self.jump_pressed
    }

    pub fn dash_pressed(&self) -> bool {
        self.dash_pressed
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}

/// Turns key down/up events into per-tick snapshots. Jump, dash and quit
/// fire once per physical press; holding the key does not repeat them.
#[derive(Debug, Default)]
pub struct InputCollector {
    held: ActionStates,
    jump_pressed_edge: bool,
    dash_pressed_edge: bool,
    quit_requested: bool,
}

impl InputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key(&mut self, action: InputAction, is_pressed: bool) {
        let was_down = self.held.is_down(action);
        self.held.set(action, is_pressed);
        if !is_pressed || was_down {
            return;
        }
        match action {
            InputAction::Jump => self.jump_pressed_edge = true,
            InputAction::Dash => self.dash_pressed_edge = true,
            InputAction::Quit => self.quit_requested = true,
            InputAction::MoveLeft | InputAction::MoveRight => {}
        }
    }

    pub fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    pub fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot {
            held: self.held,
            jump_pressed: self.jump_pressed_edge,
            dash_pressed: self.dash_pressed_edge,
            quit_requested: self.quit_requested,
        };
        self.jump_pressed_edge = false;
        self.dash_pressed_edge = false;
        snapshot
    }
}
