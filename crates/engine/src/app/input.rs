use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    P1Forward,
    P1Back,
    P1Run,
    P1Crouch,
    P1Jump,
    P2Forward,
    P2Back,
    P2Run,
    P2Crouch,
    P2Jump,
    Reconnect,
    ResetRace,
    Quit,
}

const ACTION_COUNT: usize = 13;

/// Held state plus a press edge per action. Edges latch until the snapshot for the next tick
/// is taken, so a tap shorter than one tick is never lost.
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

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::P1Forward => 0,
            InputAction::P1Back => 1,
            InputAction::P1Run => 2,
            InputAction::P1Crouch => 3,
            InputAction::P1Jump => 4,
            InputAction::P2Forward => 5,
            InputAction::P2Back => 6,
            InputAction::P2Run => 7,
            InputAction::P2Crouch => 8,
            InputAction::P2Jump => 9,
            InputAction::Reconnect => 10,
            InputAction::ResetRace => 11,
            InputAction::Quit => 12,
        }
    }
}

pub(crate) fn action_for_key(key: PhysicalKey) -> Option<InputAction> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    let action = match code {
        KeyCode::KeyW => InputAction::P1Forward,
        KeyCode::KeyS => InputAction::P1Back,
        KeyCode::ShiftLeft => InputAction::P1Run,
        KeyCode::KeyC => InputAction::P1Crouch,
        KeyCode::Space => InputAction::P1Jump,
        KeyCode::ArrowUp => InputAction::P2Forward,
        KeyCode::ArrowDown => InputAction::P2Back,
        KeyCode::ShiftRight => InputAction::P2Run,
        KeyCode::ControlRight => InputAction::P2Crouch,
        KeyCode::Enter | KeyCode::NumpadEnter => InputAction::P2Jump,
        KeyCode::F5 => InputAction::Reconnect,
        KeyCode::Backspace => InputAction::ResetRace,
        KeyCode::Escape => InputAction::Quit,
        _ => return None,
    };
    Some(action)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(quit_requested: bool, actions: ActionStates) -> Self {
        Self {
            quit_requested,
            actions,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.actions.was_pressed(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self.actions.set_pressed(action, false);
        self
    }

    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.actions.set(action, true);
        self.actions.set_pressed(action, true);
        self
    }
}
