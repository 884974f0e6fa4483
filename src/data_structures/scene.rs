//! The scene: every primitive and material of the walkthrough.
//!
//! Primitives and materials are looked up by name, so names must be unique.
//! The scene hands out pick ids (starting at 1, 0 is "nothing") in insertion
//! order.

use std::collections::HashMap;

use anyhow::{anyhow, bail};
use cgmath::Vector3;

use crate::data_structures::{
    material::{Material, MaterialId},
    primitive::Primitive,
};

#[derive(Clone, Debug)]
pub struct Scene {
    pub clear_colour: wgpu::Color,
    primitives: Vec<Primitive>,
    materials: Vec<Material>,
    names: HashMap<String, usize>,
}

impl Scene {
    pub fn new(clear_colour: wgpu::Color) -> Self {
        Self {
            clear_colour,
            primitives: Vec::new(),
            materials: Vec::new(),
            names: HashMap::new(),
        }
    }

    pub fn add_material(&mut self, material: Material) -> anyhow::Result<MaterialId> {
        if self.materials.iter().any(|m| m.name == material.name) {
            bail!("material {:?} already exists", material.name);
        }
        self.materials.push(material);
        Ok(MaterialId(self.materials.len() - 1))
    }

    /// Add a primitive and return its pick id.
    pub fn add(&mut self, mut primitive: Primitive) -> anyhow::Result<u32> {
        if self.names.contains_key(&primitive.name) {
            bail!("primitive {:?} already exists", primitive.name);
        }
        if let Some(MaterialId(idx)) = primitive.material {
            if idx >= self.materials.len() {
                bail!("primitive {:?} uses unknown material #{}", primitive.name, idx);
            }
        }
        let idx = self.primitives.len();
        primitive.pick_id = u32::try_from(idx + 1)?;
        let pick_id = primitive.pick_id;
        self.names.insert(primitive.name.clone(), idx);
        self.primitives.push(primitive);
        Ok(pick_id)
    }

    pub fn get(&self, name: &str) -> Option<&Primitive> {
        self.names.get(name).map(|&idx| &self.primitives[idx])
    }

    pub fn position_of(&self, name: &str) -> anyhow::Result<Vector3<f32>> {
        self.get(name)
            .map(|p| p.position)
            .ok_or_else(|| anyhow!("no primitive named {:?}", name))
    }

    /// Resolve a pick buffer value. Non-pickable primitives never resolve.
    pub fn by_pick_id(&self, id: u32) -> Option<&Primitive> {
        if id == 0 {
            return None;
        }
        self.primitives
            .get(id as usize - 1)
            .filter(|p| p.pick_id() == id)
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn material_by_name(&self, name: &str) -> Option<MaterialId> {
        self.materials
            .iter()
            .position(|m| m.name == name)
            .map(MaterialId)
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(wgpu::Color::BLACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::primitive::Shape;

    #[test]
    fn rejects_duplicate_primitive_names() {
        let mut scene = Scene::default();
        scene.add(Primitive::new("Door1", Shape::cube(1.0))).unwrap();
        let err = scene.add(Primitive::new("Door1", Shape::cube(2.0)));
        assert!(err.is_err());
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn rejects_duplicate_material_names() {
        let mut scene = Scene::default();
        scene.add_material(Material::white("White")).unwrap();
        assert!(scene.add_material(Material::red("White")).is_err());
    }

    #[test]
    fn rejects_unknown_material() {
        let mut scene = Scene::default();
        let p = Primitive::new("Floor", Shape::square(10.0)).with_material(MaterialId(3));
        assert!(scene.add(p).is_err());
    }

    #[test]
    fn pick_ids_start_at_one_and_resolve() {
        let mut scene = Scene::default();
        let a = scene.add(Primitive::new("A", Shape::cube(1.0))).unwrap();
        let b = scene
            .add(Primitive::new("B", Shape::cube(1.0)).not_pickable())
            .unwrap();
        assert_eq!(a, 1);
        assert_eq!(scene.by_pick_id(a).map(|p| p.name.as_str()), Some("A"));
        assert!(scene.by_pick_id(b).is_none());
        assert!(scene.by_pick_id(0).is_none());
        assert!(scene.by_pick_id(99).is_none());
    }
}
