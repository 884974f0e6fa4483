//! Render pipelines.
//!
//! - `basic` draws opaque instances
//! - `transparent` draws alpha blended instances after the opaque pass
//! - `pick` renders pick ids into an offscreen integer texture
//! - `light` holds the hemispheric light uniform

pub mod basic;
pub mod light;
pub mod pick;
pub mod transparent;

/// All pipelines, created once with the context.
#[derive(Debug)]
pub struct Pipelines {
    pub basic: wgpu::RenderPipeline,
    pub transparent: wgpu::RenderPipeline,
    pub pick: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self {
            basic: basic::mk_basic_pipeline(
                device,
                config,
                camera_bind_group_layout,
                light_bind_group_layout,
            ),
            transparent: transparent::mk_transparent_pipeline(
                device,
                config,
                camera_bind_group_layout,
                light_bind_group_layout,
            ),
            pick: pick::mk_pick_pipeline(device, camera_bind_group_layout),
        }
    }
}
