//! Box and plane primitives.
//!
//! Every primitive is drawn from one shared unit mesh (see
//! [`crate::data_structures::mesh`]); its size is encoded in the instance
//! scale, its placement in the instance position and rotation.

use cgmath::{Euler, Quaternion, Rad, Vector3};

use crate::data_structures::{instance::Instance, material::MaterialId};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Box { width: f32, height: f32, depth: f32 },
    /// A plane facing -z before rotation, like a wall seen from the front.
    Plane { width: f32, height: f32 },
}

impl Shape {
    pub fn cube(size: f32) -> Self {
        Shape::Box {
            width: size,
            height: size,
            depth: size,
        }
    }

    pub fn square(size: f32) -> Self {
        Shape::Plane {
            width: size,
            height: size,
        }
    }

    pub fn scale(&self) -> Vector3<f32> {
        match *self {
            Shape::Box {
                width,
                height,
                depth,
            } => Vector3::new(width, height, depth),
            Shape::Plane { width, height } => Vector3::new(width, height, 1.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Primitive {
    pub name: String,
    pub shape: Shape,
    pub position: Vector3<f32>,
    /// Euler angles in radians, applied x then y then z.
    pub rotation: Vector3<f32>,
    pub material: Option<MaterialId>,
    pub pickable: bool,
    pub(crate) pick_id: u32,
}

impl Primitive {
    pub fn new(name: &str, shape: Shape) -> Self {
        Self {
            name: name.to_string(),
            shape,
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            material: None,
            pickable: true,
            pick_id: 0,
        }
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vector3::new(x, y, z);
        self
    }

    pub fn rotated(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Vector3::new(x, y, z);
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    pub fn not_pickable(mut self) -> Self {
        self.pickable = false;
        self
    }

    /// Id rendered into the pick buffer, 0 when the primitive can't be picked.
    pub fn pick_id(&self) -> u32 {
        if self.pickable { self.pick_id } else { 0 }
    }

    pub fn orientation(&self) -> Quaternion<f32> {
        Quaternion::from(Euler {
            x: Rad(self.rotation.x),
            y: Rad(self.rotation.y),
            z: Rad(self.rotation.z),
        })
    }

    pub fn to_instance(&self) -> Instance {
        Instance {
            position: self.position,
            rotation: self.orientation(),
            scale: self.shape.scale(),
        }
    }

    /// Centre of the primitive's world-space bounding box.
    pub fn center(&self) -> Vector3<f32> {
        // Unit meshes are centred on the origin
        self.position
    }
}
