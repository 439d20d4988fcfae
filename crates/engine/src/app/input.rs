#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Belt1,
    Belt2,
    Belt3,
    Belt4,
    Belt5,
    Grab,
    Reload,
    ToggleInventory,
    ToggleStatus,
    ToggleNearby,
    ToggleMessages,
    Pause,
    Escape,
    Shift,
    Ctrl,
}

const ACTION_COUNT: usize = 19;

impl InputAction {
    pub const BELT: [InputAction; 5] = [
        InputAction::Belt1,
        InputAction::Belt2,
        InputAction::Belt3,
        InputAction::Belt4,
        InputAction::Belt5,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Belt1 => 4,
            InputAction::Belt2 => 5,
            InputAction::Belt3 => 6,
            InputAction::Belt4 => 7,
            InputAction::Belt5 => 8,
            InputAction::Grab => 9,
            InputAction::Reload => 10,
            InputAction::ToggleInventory => 11,
            InputAction::ToggleStatus => 12,
            InputAction::ToggleNearby => 13,
            InputAction::ToggleMessages => 14,
            InputAction::Pause => 15,
            InputAction::Escape => 16,
            InputAction::Shift => 17,
            InputAction::Ctrl => 18,
        }
    }
}

/// Held state plus a pressed edge per action. Edges are cleared once a
/// snapshot has been handed to a tick.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
    pressed: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        let index = action.index();
        if is_down && !self.down[index] {
            self.pressed[index] = true;
        }
        self.down[index] = is_down;
    }

    pub(crate) fn set_pressed(&mut self, action: InputAction, pressed: bool) {
        self.pressed[action.index()] = pressed;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed[action.index()]
    }

    pub(crate) fn clear_edges(&mut self) {
        self.pressed = [false; ACTION_COUNT];
    }
}
