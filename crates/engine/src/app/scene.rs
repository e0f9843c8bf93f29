use crate::math::Vec3;

use super::input::InputSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneKey {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderableKind {
    Avatar,
    Replica,
    FinishLine,
    LaneMarker,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderableDesc {
    pub kind: RenderableKind,
    pub color: [u8; 4],
    pub debug_name: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation_radians: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub transform: Transform,
    pub renderable: RenderableDesc,
}

pub const CAMERA_PIXELS_PER_WORLD_DEFAULT: f32 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackCamera {
    pub focus_z: f32,
    pub pixels_per_world: f32,
}

impl Default for TrackCamera {
    fn default() -> Self {
        Self {
            focus_z: 0.0,
            pixels_per_world: CAMERA_PIXELS_PER_WORLD_DEFAULT,
        }
    }
}

#[derive(Debug, Default)]
pub struct SceneWorld {
    next_id: u64,
    entities: Vec<Entity>,
    camera: TrackCamera,
}

impl SceneWorld {
    pub fn spawn(&mut self, transform: Transform, renderable: RenderableDesc) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.entities.push(Entity {
            id,
            transform,
            renderable,
        });
        id
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    pub fn set_entity_transform(&mut self, id: EntityId, transform: Transform) -> bool {
        match self.find_entity_mut(id) {
            Some(entity) => {
                entity.transform = transform;
                true
            }
            None => false,
        }
    }

    pub fn camera(&self) -> &TrackCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut TrackCamera {
        &mut self.camera
    }
}

pub trait Simulation {
    fn load(&mut self);
    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand;
    fn world(&self, key: SceneKey) -> &SceneWorld;
    fn shutdown(&mut self);
    fn debug_title(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() -> RenderableDesc {
        RenderableDesc {
            kind: RenderableKind::LaneMarker,
            color: [255, 255, 255, 255],
            debug_name: "marker",
        }
    }

    #[test]
    fn spawn_assigns_increasing_ids() {
        let mut world = SceneWorld::default();
        let first = world.spawn(Transform::default(), marker());
        let second = world.spawn(Transform::default(), marker());
        assert!(second > first);
        assert_eq!(world.entity_count(), 2);
    }

    #[test]
    fn find_entity_matches_by_id_only() {
        let mut world = SceneWorld::default();
        let first = world.spawn(Transform::default(), marker());
        let second = world.spawn(Transform::default(), marker());

        assert_eq!(world.find_entity(first).expect("first").id, first);
        assert_eq!(world.find_entity(second).expect("second").id, second);
        assert!(world.find_entity(EntityId(99)).is_none());
    }

    #[test]
    fn set_entity_transform_updates_position() {
        let mut world = SceneWorld::default();
        let id = world.spawn(Transform::default(), marker());
        let moved = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation_radians: 0.5,
        };
        assert!(world.set_entity_transform(id, moved));
        assert_eq!(world.find_entity(id).expect("entity").transform, moved);
        assert!(!world.set_entity_transform(EntityId(99), moved));
    }
}
