//! Engine data structures: scene description, meshes, instances and textures.
//!
//! - `scene` holds named primitives and shared materials
//! - `primitive` and `material` describe what a scene is made of
//! - `mesh` contains the unit box/plane geometry and its GPU buffers
//! - `instance` holds per-instance transformation, colour and pick id
//! - `batch` groups primitives that share a mesh and a pipeline
//! - `texture` wraps the depth buffer

pub mod batch;
pub mod instance;
pub mod material;
pub mod mesh;
pub mod primitive;
pub mod scene;
pub mod texture;
