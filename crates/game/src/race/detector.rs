use engine::{InputAction, InputSnapshot, PlayerPose, PoseAction};

use super::PlayerId;

pub(crate) const WAVE_SHOULDER_MIN_DEGREES: f32 = 100.0;
pub(crate) const POINT_SHOULDER_MIN_DEGREES: f32 = 60.0;
pub(crate) const POINT_ELBOW_MIN_DEGREES: f32 = 150.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Movement {
    Backward,
    #[default]
    Still,
    Forward,
}

impl Movement {
    pub(crate) fn sign(self) -> f32 {
        match self {
            Movement::Backward => -1.0,
            Movement::Still => 0.0,
            Movement::Forward => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct GestureFlags {
    pub(crate) wave_left: bool,
    pub(crate) wave_right: bool,
    pub(crate) point_left: bool,
    pub(crate) point_right: bool,
}

impl GestureFlags {
    pub(crate) fn any(&self) -> bool {
        self.wave_left || self.wave_right || self.point_left || self.point_right
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionIntent {
    pub(crate) movement: Movement,
    pub(crate) jump_requested: bool,
    pub(crate) run: bool,
    pub(crate) crouch: bool,
    pub(crate) gestures: GestureFlags,
}

impl ActionIntent {
    pub(crate) fn none() -> Self {
        Self::default()
    }
}

pub(crate) fn detect(pose: Option<&PlayerPose>, previous: Option<PoseAction>) -> ActionIntent {
    let Some(pose) = pose else {
        return ActionIntent::none();
    };

    let mut intent = ActionIntent {
        gestures: detect_gestures(pose),
        ..ActionIntent::none()
    };
    match pose.action {
        PoseAction::Run | PoseAction::MountainClimber => {
            intent.movement = Movement::Forward;
            intent.run = true;
        }
        PoseAction::Jump => {
            intent.jump_requested = previous != Some(PoseAction::Jump);
        }
        PoseAction::Crouch => intent.crouch = true,
        PoseAction::None => {}
    }
    intent
}

fn detect_gestures(pose: &PlayerPose) -> GestureFlags {
    let left = &pose.arms.left;
    let right = &pose.arms.right;
    GestureFlags {
        wave_left: is_wave(left.shoulder_angle),
        wave_right: is_wave(right.shoulder_angle),
        point_left: is_point(left.shoulder_angle, left.elbow_angle),
        point_right: is_point(right.shoulder_angle, right.elbow_angle),
    }
}

fn is_wave(shoulder: Option<f32>) -> bool {
    shoulder.is_some_and(|angle| angle > WAVE_SHOULDER_MIN_DEGREES)
}

fn is_point(shoulder: Option<f32>, elbow: Option<f32>) -> bool {
    match (shoulder, elbow) {
        (Some(shoulder), Some(elbow)) => {
            (POINT_SHOULDER_MIN_DEGREES..=WAVE_SHOULDER_MIN_DEGREES).contains(&shoulder)
                && elbow >= POINT_ELBOW_MIN_DEGREES
        }
        _ => false,
    }
}

/// Per-player detector state. `observe` must be called every tick, whether or not pose intent
/// is the active control source, so the jump edge never fires on stale history.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionEventDetector {
    previous: Option<PoseAction>,
}

impl ActionEventDetector {
    pub(crate) fn observe(&mut self, pose: Option<&PlayerPose>) -> ActionIntent {
        let intent = detect(pose, self.previous);
        self.previous = pose.map(|pose| pose.action);
        intent
    }

    #[cfg(test)]
    pub(crate) fn previous_action(&self) -> Option<PoseAction> {
        self.previous
    }

    #[cfg(test)]
    pub(crate) fn reset(&mut self) {
        self.previous = None;
    }
}

struct KeyBindings {
    forward: InputAction,
    back: InputAction,
    run: InputAction,
    crouch: InputAction,
    jump: InputAction,
}

fn bindings_for(player: PlayerId) -> KeyBindings {
    match player {
        PlayerId::One => KeyBindings {
            forward: InputAction::P1Forward,
            back: InputAction::P1Back,
            run: InputAction::P1Run,
            crouch: InputAction::P1Crouch,
            jump: InputAction::P1Jump,
        },
        PlayerId::Two => KeyBindings {
            forward: InputAction::P2Forward,
            back: InputAction::P2Back,
            run: InputAction::P2Run,
            crouch: InputAction::P2Crouch,
            jump: InputAction::P2Jump,
        },
    }
}

pub(crate) fn keyboard_intent(input: &InputSnapshot, player: PlayerId) -> ActionIntent {
    let keys = bindings_for(player);
    let movement = match (input.is_down(keys.forward), input.is_down(keys.back)) {
        (true, false) => Movement::Forward,
        (false, true) => Movement::Backward,
        _ => Movement::Still,
    };
    ActionIntent {
        movement,
        jump_requested: input.was_pressed(keys.jump),
        run: input.is_down(keys.run),
        crouch: input.is_down(keys.crouch),
        gestures: GestureFlags::default(),
    }
}
