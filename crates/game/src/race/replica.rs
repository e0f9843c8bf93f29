use engine::{Transform, Vec3};

use super::game_state::TransformReader;
use super::PlayerId;

const JUMP_VERTICAL_SPEED: f32 = 1.0;
const RUN_HORIZONTAL_SPEED: f32 = 5.0;
const WALK_HORIZONTAL_SPEED: f32 = 0.3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum ReplicaAnimation {
    #[default]
    Idle,
    Walk,
    Run,
    Jump,
}

#[derive(Debug)]
pub(crate) struct ReplicaSync {
    source: PlayerId,
    reader: TransformReader,
    lerp: f32,
    position: Option<Vec3>,
    rotation: f32,
    animation: ReplicaAnimation,
}

impl ReplicaSync {
    pub(crate) fn new(source: PlayerId, reader: TransformReader, lerp: f32) -> Self {
        Self {
            source,
            reader,
            lerp: lerp.clamp(0.0, 1.0),
            position: None,
            rotation: 0.0,
            animation: ReplicaAnimation::Idle,
        }
    }

    pub(crate) fn source(&self) -> PlayerId {
        self.source
    }

    pub(crate) fn animation(&self) -> ReplicaAnimation {
        self.animation
    }

    /// Moves the replica a fixed fraction toward the authoritative transform. The first sync
    /// after construction or [`ReplicaSync::reset`] snaps instead.
    pub(crate) fn sync(&mut self, dt: f32) -> Transform {
        let target = self.reader.read(self.source).transform;
        let next = match self.position {
            Some(current) => current.lerp(target.position, self.lerp),
            None => target.position,
        };

        self.animation = match self.position {
            Some(previous) if dt > 0.0 => infer_animation(next - previous, dt),
            _ => ReplicaAnimation::Idle,
        };
        self.position = Some(next);
        self.rotation = target.rotation_radians;
        self.transform()
    }

    pub(crate) fn transform(&self) -> Transform {
        Transform {
            position: self.position.unwrap_or(Vec3::ZERO),
            rotation_radians: self.rotation,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.position = None;
        self.animation = ReplicaAnimation::Idle;
    }
}

fn infer_animation(delta: Vec3, dt: f32) -> ReplicaAnimation {
    let vertical = delta.y / dt;
    let forward = delta.z / dt;
    let horizontal = delta.horizontal_length() / dt;

    if vertical.abs() > JUMP_VERTICAL_SPEED {
        ReplicaAnimation::Jump
    } else if forward > RUN_HORIZONTAL_SPEED {
        ReplicaAnimation::Run
    } else if horizontal > WALK_HORIZONTAL_SPEED {
        // Backing up never reads as a run.
        ReplicaAnimation::Walk
    } else {
        ReplicaAnimation::Idle
    }
}
