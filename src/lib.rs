//! floor-ngin
//!
//! A small floor-plan walkthrough on top of an instancing-oriented engine for
//! native and WASM. Five translucent room volumes, walls, a ceiling, a floor,
//! doors and furniture are drawn as instanced boxes and planes; clicking a
//! door glides the camera into the room behind it.
//!
//! High-level modules
//! - `floor_plan`: the literal scene and the door-to-room bindings
//! - `walkthrough`: the flow that draws the floor plan and reacts to clicks
//! - `navigation`: door bindings and the camera rig that animates transitions
//! - `animation`: fixed-duration linear animations of camera properties
//! - `camera`: arc-rotate camera, projection, uniforms and the mouse controller
//! - `config`: every tunable with its default
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: scene model, meshes, instances, batches and textures
//! - `flow`: event loop and the `GraphicsFlow` abstraction
//! - `pick`: GPU object picking
//! - `pipelines`: opaque, transparent and pick render pipelines, the light
//! - `render`: render composition for efficient pipeline reuse

pub mod animation;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod floor_plan;
pub mod flow;
pub mod navigation;
pub mod pick;
pub mod pipelines;
pub mod render;
pub mod walkthrough;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::{Point3, Vector3};
pub use config::{AnimationConfig, CameraConfig, Config, OverlapPolicy};
pub use walkthrough::run;
pub use winit::dpi::PhysicalPosition;
pub use winit::event::WindowEvent;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point, renders into the `renderCanvas` element.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run(Config::default()).map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
