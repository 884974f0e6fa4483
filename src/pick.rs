//! Object picking and selection.
//!
//! Picking renders every pickable instance with its pick id into an offscreen
//! `R32Uint` texture, then reads back the texel under the mouse cursor:
//! 1. Render all flows' instances with the pick pipeline, id 0 is discarded
//! 2. Read the texel at the mouse position, scaled to the padded texture width
//! 3. Map the pick id back to the flows whose render tree contains it
//!
//! Step 3 makes sure only the flows responsible for the picked object get `on_click`.

use std::{
    collections::{HashMap, HashSet},
    iter,
};

use anyhow::Context as _;
use winit::dpi::PhysicalPosition;

use crate::{
    context::{Context, MouseState},
    flow::GraphicsFlow,
    pipelines::pick::{PICK_DEPTH_FORMAT, PICK_FORMAT},
    render::Instanced,
};

#[cfg(target_arch = "wasm32")]
use crate::flow::FlowEvent;

const BYTES_PER_PIXEL: u32 = std::mem::size_of::<u32>() as u32;

/// Size of the pick texture and the factors that map window coordinates onto it.
///
/// Texture rows copied into a buffer have to be a multiple of 256 bytes, so the
/// pick texture is stretched horizontally to the next aligned width.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickExtent {
    pub width: u32,
    pub height: u32,
    pub width_factor: f64,
    pub height_factor: f64,
}

pub fn pick_extent(width: u32, height: u32) -> PickExtent {
    let width = width.max(1);
    let height = height.max(1);
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT / BYTES_PER_PIXEL;
    let padded = width.div_ceil(align) * align;
    PickExtent {
        width: padded,
        height,
        width_factor: f64::from(padded) / f64::from(width),
        height_factor: 1.0,
    }
}

/// Byte offset of the texel under `coords`, `None` outside of the texture.
pub fn pixel_index(extent: &PickExtent, coords: PhysicalPosition<f64>) -> Option<usize> {
    let x = coords.x * extent.width_factor;
    let y = coords.y * extent.height_factor;
    if x < 0.0 || y < 0.0 || x >= f64::from(extent.width) || y >= f64::from(extent.height) {
        return None;
    }
    let texel = y as usize * extent.width as usize + x as usize;
    Some(texel * BYTES_PER_PIXEL as usize)
}

/// Decode the pick id at `index`, 0 (nothing) when the read is out of bounds.
pub fn read_pick_id(data: &[u8], index: Option<usize>) -> u32 {
    index
        .and_then(|i| data.get(i..i + BYTES_PER_PIXEL as usize))
        .and_then(|bytes| bytes.try_into().ok())
        .map(u32::from_le_bytes)
        .unwrap_or(0)
}

/// Render all flows to the pick texture and determine which object was clicked.
///
/// # Arguments
///
/// * `async_runtime` is used to wait for the buffer mapping if not on WASM
/// * `flows` are all active graphics flows with their renderable objects
/// * `ctx` is the rendering context
/// * `mouse_state` provides the mouse coordinates at the time of picking
/// * `proxy` WASM futures can only resolve using the winit event loop proxy by sending events
///
/// # Returns
///
/// `Some((pick_id, flow_ids))` if an object was picked, or `None` if nothing was
/// hit or picking is finished via the event loop.
pub fn draw_to_pick_buffer<State>(
    #[cfg(not(target_arch = "wasm32"))] async_runtime: &tokio::runtime::Runtime,
    flows: &[Box<dyn GraphicsFlow<State>>],
    ctx: &Context,
    mouse_state: &MouseState,
    #[cfg(target_arch = "wasm32")] proxy: winit::event_loop::EventLoopProxy<FlowEvent<State>>,
) -> Option<(u32, HashSet<usize>)> {
    let extent = pick_extent(ctx.config.width, ctx.config.height);
    let extent3d = wgpu::Extent3d {
        width: extent.width,
        height: extent.height,
        depth_or_array_layers: 1,
    };

    let pick_texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Pick texture"),
        size: extent3d,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: PICK_FORMAT,
        usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    let pick_depth_texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Pick depth texture"),
        size: extent3d,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: PICK_DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Pick Encoder"),
        });
    let mut translation: HashMap<u32, HashSet<usize>> = HashMap::new();

    {
        let pick_view = pick_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = pick_depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Pick Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &pick_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        /*
           Flows may share pick ids. The index of every flow that renders an id is
           stored so that only those flows get invoked.

           flow1 at index 0 owns the pick IDs [1, 2, 3, 4, 5]
           flow2 at index 1 owns the pick IDs [5, 6, 7, 8, 9]

           On pick result 2 we invoke flow1.on_click(2).
           On pick result 5 we invoke flow1.on_click(5) followed by flow2.on_click(5).
        */
        let mut instances: Vec<Instanced> = Vec::new();
        flows.iter().enumerate().for_each(|(idx, flow)| {
            let render = flow.on_render();
            render.map_ids(idx, &mut translation);
            render.set_pick_pipelines(&mut instances);
        });

        render_pass.set_pipeline(&ctx.pipelines.pick);
        render_pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        for instanced in instances {
            if instanced.amount == 0 {
                continue;
            }
            let amount: Result<u32, _> = instanced.amount.try_into();
            match amount {
                Err(e) => log::error!(
                    "Failed to pick {}. Maximum amount of supported instances is {}. Error: {}",
                    instanced.mesh.name,
                    u32::MAX,
                    e
                ),
                Ok(amount) => {
                    render_pass.set_vertex_buffer(0, instanced.mesh.vertex_buffer.slice(..));
                    render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                    render_pass.set_index_buffer(
                        instanced.mesh.index_buffer.slice(..),
                        wgpu::IndexFormat::Uint16,
                    );
                    render_pass.draw_indexed(0..instanced.mesh.num_elements, 0, 0..amount);
                }
            }
        }
    }

    let output_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        size: (BYTES_PER_PIXEL * extent.width * extent.height) as wgpu::BufferAddress,
        // read back on the cpu
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        label: Some("Pick Output Buffer"),
        mapped_at_creation: false,
    });

    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &pick_texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(BYTES_PER_PIXEL * extent.width),
                rows_per_image: Some(extent.height),
            },
        },
        extent3d,
    );

    ctx.queue.submit(iter::once(encoder.finish()));
    let device = ctx.device.clone();
    let mouse_coords = mouse_state.coords;

    #[cfg(target_arch = "wasm32")]
    {
        wasm_bindgen_futures::spawn_local(async move {
            let id = match read_texture_buffer(&output_buffer, &device, extent, mouse_coords).await
            {
                Ok(id) => id,
                Err(e) => {
                    log::error!("Picking failed: {:#}", e);
                    return;
                }
            };
            if let Some(flow_ids) = translation.get(&id) {
                if proxy
                    .send_event(FlowEvent::Id((id, flow_ids.clone())))
                    .is_err()
                {
                    log::error!("The event loop closed before the pick result arrived");
                }
            }
        });
        return None;
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let id = async_runtime.block_on(read_texture_buffer(
            &output_buffer,
            &device,
            extent,
            mouse_coords,
        ));
        match id {
            Ok(id) => translation.get(&id).map(|flow_ids| (id, flow_ids.clone())),
            Err(e) => {
                log::error!("Picking failed: {:#}", e);
                None
            }
        }
    }
}

async fn read_texture_buffer(
    buffer: &wgpu::Buffer,
    device: &wgpu::Device,
    extent: PickExtent,
    mouse_coords: PhysicalPosition<f64>,
) -> anyhow::Result<u32> {
    // The mapping has to be requested and the device polled before awaiting,
    // otherwise the future never resolves.
    let buffer_slice = buffer.slice(..);
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        // the receiver is only gone when picking was abandoned
        let _ = tx.send(result);
    });
    #[cfg(target_arch = "wasm32")]
    device.poll(wgpu::PollType::Poll)?;
    #[cfg(not(target_arch = "wasm32"))]
    device.poll(wgpu::PollType::Wait {
        submission_index: None,
        timeout: None,
    })?;
    rx.receive()
        .await
        .context("the pick buffer mapping was dropped")??;

    let id = {
        let data = buffer_slice.get_mapped_range();
        read_pick_id(&data, pixel_index(&extent, mouse_coords))
    };
    buffer.unmap();

    log::info!("Selected obj with id {}", id);
    Ok(id)
}
