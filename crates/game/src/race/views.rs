use engine::{EntityId, RenderableDesc, RenderableKind, SceneWorld, Transform, Vec3};

use super::replica::ReplicaAnimation;
use super::tuning::RaceConfig;
use super::PlayerId;

const LANE_MARKER_SPACING: f32 = 10.0;
const FINISH_LINE_COLOR: [u8; 4] = [240, 240, 240, 255];
const LANE_MARKER_COLOR: [u8; 4] = [120, 140, 120, 255];

fn player_color(player: PlayerId) -> [u8; 4] {
    match player {
        PlayerId::One => [235, 140, 52, 255],
        PlayerId::Two => [64, 156, 255, 255],
    }
}

fn shade(color: [u8; 4], percent: u16) -> [u8; 4] {
    let scale = |channel: u8| (u16::from(channel) * percent / 100).min(255) as u8;
    [scale(color[0]), scale(color[1]), scale(color[2]), color[3]]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ViewCues {
    pub(crate) gesturing: bool,
    pub(crate) crouching: bool,
    pub(crate) replica_animation: ReplicaAnimation,
}

impl ViewCues {
    fn avatar_color(&self, owner: PlayerId) -> [u8; 4] {
        let base = player_color(owner);
        if self.gesturing {
            shade(base, 130)
        } else if self.crouching {
            shade(base, 70)
        } else {
            base
        }
    }

    fn replica_color(&self, peer: PlayerId) -> [u8; 4] {
        let percent = match self.replica_animation {
            ReplicaAnimation::Idle => 60,
            ReplicaAnimation::Walk => 80,
            ReplicaAnimation::Run => 100,
            ReplicaAnimation::Jump => 125,
        };
        shade(player_color(peer), percent)
    }
}

#[derive(Debug)]
pub(crate) struct PlayerView {
    owner: PlayerId,
    world: SceneWorld,
    avatar: EntityId,
    replica: EntityId,
}

impl PlayerView {
    pub(crate) fn new(owner: PlayerId, config: &RaceConfig) -> Self {
        let mut world = SceneWorld::default();

        world.spawn(
            at(Vec3::new(0.0, 0.0, config.finish_z)),
            RenderableDesc {
                kind: RenderableKind::FinishLine,
                color: FINISH_LINE_COLOR,
                debug_name: "finish_line",
            },
        );
        let marker_count = (config.finish_z / LANE_MARKER_SPACING).max(0.0) as u32;
        for lane_x in config.lane_x {
            for step in 0..=marker_count {
                world.spawn(
                    at(Vec3::new(lane_x, 0.0, step as f32 * LANE_MARKER_SPACING)),
                    RenderableDesc {
                        kind: RenderableKind::LaneMarker,
                        color: LANE_MARKER_COLOR,
                        debug_name: "lane_marker",
                    },
                );
            }
        }

        let peer = owner.peer();
        let avatar = world.spawn(
            at(start_position(owner, config)),
            RenderableDesc {
                kind: RenderableKind::Avatar,
                color: player_color(owner),
                debug_name: "avatar",
            },
        );
        let replica = world.spawn(
            at(start_position(peer, config)),
            RenderableDesc {
                kind: RenderableKind::Replica,
                color: player_color(peer),
                debug_name: "replica",
            },
        );

        let mut view = Self {
            owner,
            world,
            avatar,
            replica,
        };
        view.follow(start_position(owner, config).z);
        view
    }

    pub(crate) fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub(crate) fn sync(&mut self, avatar: Transform, replica: Transform, cues: ViewCues) {
        self.world.set_entity_transform(self.avatar, avatar);
        self.world.set_entity_transform(self.replica, replica);
        if let Some(entity) = self.world.find_entity_mut(self.avatar) {
            entity.renderable.color = cues.avatar_color(self.owner);
        }
        if let Some(entity) = self.world.find_entity_mut(self.replica) {
            entity.renderable.color = cues.replica_color(self.owner.peer());
        }
        self.follow(avatar.position.z);
    }

    fn follow(&mut self, z: f32) {
        self.world.camera_mut().focus_z = z;
    }
}

pub(crate) fn start_position(player: PlayerId, config: &RaceConfig) -> Vec3 {
    Vec3::new(config.lane_for(player), 0.0, config.start_z)
}

fn at(position: Vec3) -> Transform {
    Transform {
        position,
        rotation_radians: 0.0,
    }
}
