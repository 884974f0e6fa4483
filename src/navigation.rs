//! Door-to-room navigation.
//!
//! Each door is bound to a room. Picking a door starts a camera transition
//! that moves both the camera position and its look-at target onto the
//! room's position.

use std::collections::HashMap;

use anyhow::{Context as _, bail};
use cgmath::{EuclideanSpace, Point3};
use instant::Duration;

use crate::{
    animation::Animator,
    camera::Camera,
    config::AnimationConfig,
    data_structures::scene::Scene,
};

/// A pick trigger: clicking `door` sends the camera to `destination`.
#[derive(Clone, Debug, PartialEq)]
pub struct DoorBinding {
    pub door: String,
    pub room: String,
    pub destination: Point3<f32>,
}

/// Resolves pick ids to door bindings.
#[derive(Clone, Debug, Default)]
pub struct Navigator {
    bindings: HashMap<u32, DoorBinding>,
}

impl Navigator {
    /// Bind every `(door, room)` pair. The room position is captured now,
    /// rooms never move after the scene was built.
    pub fn bind(scene: &Scene, pairs: &[(&str, &str)]) -> anyhow::Result<Self> {
        let mut bindings = HashMap::new();
        for &(door, room) in pairs {
            let door_primitive = scene
                .get(door)
                .with_context(|| format!("cannot bind unknown door {:?}", door))?;
            let pick_id = door_primitive.pick_id();
            if pick_id == 0 {
                bail!("door {:?} is not pickable", door);
            }
            let destination = scene.position_of(room)?;
            let binding = DoorBinding {
                door: door.to_string(),
                room: room.to_string(),
                destination: Point3::from_vec(destination),
            };
            if bindings.insert(pick_id, binding).is_some() {
                bail!("door {:?} is bound twice", door);
            }
        }
        Ok(Self { bindings })
    }

    pub fn resolve(&self, pick_id: u32) -> Option<&DoorBinding> {
        self.bindings.get(&pick_id)
    }
}

/// The camera together with the animations that drive it.
#[derive(Debug)]
pub struct CameraRig {
    pub camera: Camera,
    pub animator: Animator,
    pub animation: AnimationConfig,
}

impl CameraRig {
    pub fn new(camera: Camera, animation: AnimationConfig) -> Self {
        Self {
            camera,
            animator: Animator::new(animation.overlap),
            animation,
        }
    }

    /// Animate position and target from their current values to `destination`.
    pub fn transition_to(&mut self, destination: Point3<f32>) {
        log::debug!(
            "camera transition {:?} -> {:?} over {:?}",
            self.camera.position(),
            destination,
            self.animation.duration()
        );
        self.animator
            .transition(&self.camera, destination, &self.animation);
    }

    pub fn update(&mut self, dt: Duration) {
        self.animator.update(&mut self.camera, dt);
    }

    pub fn is_animating(&self) -> bool {
        !self.animator.is_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::primitive::{Primitive, Shape};

    fn scene() -> Scene {
        let mut scene = Scene::default();
        scene
            .add(Primitive::new("Room", Shape::cube(5.0)).at(3.0, 0.0, 1.0).not_pickable())
            .unwrap();
        scene
            .add(Primitive::new("Door", Shape::cube(1.0)).at(1.0, 1.0, 0.0))
            .unwrap();
        scene
    }

    #[test]
    fn binds_door_to_room_position() {
        let scene = scene();
        let navigator = Navigator::bind(&scene, &[("Door", "Room")]).unwrap();
        let id = scene.get("Door").unwrap().pick_id();
        let binding = navigator.resolve(id).unwrap();
        assert_eq!(binding.destination, Point3::new(3.0, 0.0, 1.0));
        assert_eq!(binding.room, "Room");
        assert!(navigator.resolve(scene.get("Room").unwrap().pick_id()).is_none());
    }

    #[test]
    fn rejects_unknown_or_unpickable_doors() {
        let scene = scene();
        assert!(Navigator::bind(&scene, &[("Nope", "Room")]).is_err());
        assert!(Navigator::bind(&scene, &[("Door", "Nope")]).is_err());
        assert!(Navigator::bind(&scene, &[("Room", "Door")]).is_err());
        assert!(Navigator::bind(&scene, &[("Door", "Room"), ("Door", "Room")]).is_err());
    }

    #[test]
    fn rig_settles_on_destination() {
        let camera = Camera::arc_rotate(Point3::new(0.0, 0.0, 0.0), 1.0, 1.0, 8.0);
        let mut rig = CameraRig::new(camera, AnimationConfig::default());
        rig.transition_to(Point3::new(3.0, 0.0, 1.0));
        assert!(rig.is_animating());
        for _ in 0..101 {
            rig.update(Duration::from_millis(17));
        }
        assert!(!rig.is_animating());
        assert_eq!(rig.camera.position(), Point3::new(3.0, 0.0, 1.0));
        assert_eq!(rig.camera.target(), Point3::new(3.0, 0.0, 1.0));
    }
}
