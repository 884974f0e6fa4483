//! Instanced batches of primitives.
//!
//! A [`Batch`] is one shared unit mesh plus an instance buffer with one entry
//! per primitive. The whole floor plan is drawn with four batches: opaque and
//! translucent boxes, opaque and translucent planes.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::InstanceRaw,
        mesh::Mesh,
        primitive::{Primitive, Shape},
        scene::Scene,
    },
    render::Instanced,
};

const FALLBACK_COLOUR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Which batch a primitive belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub plane: bool,
    pub transparent: bool,
}

impl BatchKey {
    pub fn of(scene: &Scene, primitive: &Primitive) -> Self {
        let transparent = primitive
            .material
            .and_then(|id| scene.material(id))
            .is_some_and(|m| m.is_transparent());
        Self {
            plane: matches!(primitive.shape, Shape::Plane { .. }),
            transparent,
        }
    }
}

/// RGBA colour of a primitive, white when it has no material.
pub fn colour_of(scene: &Scene, primitive: &Primitive) -> [f32; 4] {
    primitive
        .material
        .and_then(|id| scene.material(id))
        .map(|m| [m.diffuse[0], m.diffuse[1], m.diffuse[2], m.alpha])
        .unwrap_or(FALLBACK_COLOUR)
}

/// Raw instances and pick ids of all primitives that fall into `key`, in scene order.
pub fn raw_instances(scene: &Scene, key: BatchKey) -> (Vec<InstanceRaw>, Vec<u32>) {
    scene
        .primitives()
        .iter()
        .filter(|p| BatchKey::of(scene, p) == key)
        .map(|p| {
            let pick_id = p.pick_id();
            (p.to_instance().to_raw(colour_of(scene, p), pick_id), pick_id)
        })
        .unzip()
}

pub struct Batch {
    pub key: BatchKey,
    pub mesh: Arc<Mesh>,
    pub instances: Vec<InstanceRaw>,
    pub ids: Vec<u32>,
    pub instance_buffer: wgpu::Buffer,
}

impl Batch {
    pub fn new(device: &wgpu::Device, scene: &Scene, key: BatchKey, mesh: Arc<Mesh>) -> Self {
        let (instances, ids) = raw_instances(scene, key);
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Instance Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&instances),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            key,
            mesh,
            instances,
            ids,
            instance_buffer,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instanced(&self) -> Instanced<'_> {
        Instanced {
            instance: &self.instance_buffer,
            mesh: &self.mesh,
            amount: self.instances.len(),
            ids: &self.ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::material::Material;

    fn scene() -> Scene {
        let mut scene = Scene::default();
        let glass = scene
            .add_material(Material::white("Glass").with_alpha(0.3))
            .unwrap();
        let red = scene.add_material(Material::red("Red")).unwrap();
        scene
            .add(Primitive::new("Room", Shape::cube(5.0)).with_material(glass).not_pickable())
            .unwrap();
        scene.add(Primitive::new("Door", Shape::cube(1.0))).unwrap();
        scene
            .add(Primitive::new("Floor", Shape::square(10.0)).with_material(red))
            .unwrap();
        scene
    }

    #[test]
    fn primitives_split_by_shape_and_transparency() {
        let scene = scene();
        let opaque_boxes = BatchKey {
            plane: false,
            transparent: false,
        };
        let (instances, ids) = raw_instances(&scene, opaque_boxes);
        assert_eq!(instances.len(), 1);
        assert_eq!(ids, vec![2]);
        assert_eq!(instances[0].colour(), FALLBACK_COLOUR);

        let (glass, glass_ids) = raw_instances(
            &scene,
            BatchKey {
                plane: false,
                transparent: true,
            },
        );
        assert_eq!(glass.len(), 1);
        assert_eq!(glass_ids, vec![0]);
        assert_eq!(glass[0].pick_id(), 0);
    }

    #[test]
    fn plane_colour_comes_from_material() {
        let scene = scene();
        let floor = scene.get("Floor").unwrap();
        assert_eq!(colour_of(&scene, floor), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(
            BatchKey::of(&scene, floor),
            BatchKey {
                plane: true,
                transparent: false
            }
        );
    }
}
