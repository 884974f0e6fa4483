use crate::{
    data_structures::{
        instance::InstanceRaw,
        mesh::{MeshVertex, Vertex},
        texture::Texture,
    },
    pipelines::basic::mk_render_pipeline,
};

/**
 * Pipeline for translucent primitives such as the room volumes.
 *
 * Same shader as the basic pipeline, but alpha blended and without depth writes
 * so that opaque geometry behind (or inside) stays visible. It has to run after
 * the opaque pass.
 */
pub fn mk_transparent_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    light_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Transparent Pipeline Layout"),
        bind_group_layouts: &[camera_bind_group_layout, light_bind_group_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Hemispheric Shader (transparent)"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        config.format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(Texture::DEPTH_FORMAT),
        false,
        &[MeshVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}
