//! Flow control and application event loop.
//!
//! A "flow" is a self-contained part of the application that handles user
//! input, updates its state and provides renderable objects each frame. The
//! engine owns the window, drives every flow and coordinates rendering,
//! picking and camera animation.
//!
//! # User-facing types
//!
//! - [`GraphicsFlow<S>`] is the trait for scenes that handle events and rendering
//! - [`Out`] is returned from lifecycle hooks to reconfigure the context or exit
//!
//! # Lifecycle Flow
//!
//! The event loop follows this pattern each frame:
//! 1. Collect window events and pass them to the flows
//! 2. Apply orbit, pan and zoom input and advance running camera animations
//! 3. Call `on_update` on all flows
//! 4. Collect every flow's `on_render()` and draw opaque, then transparent instances
//! 5. Perform picking when the left mouse button is released without a drag
//! 6. Present the frame

use std::{collections::HashSet, fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::Config,
    context::{Context, InitContext, MouseButtonState},
    data_structures::{mesh::DrawMesh, texture::Texture},
    pick::draw_to_pick_buffer,
    render::{Instanced, Render},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Output of every lifecycle hook.
///
/// `Out::Configure` modifies the Context during runtime, for instance to start
/// a camera transition or change the clear colour.
///
/// `Out::Exit` asks the event loop to shut down.
///
/// `Empty` is the default output when nothing needs to be handled.
pub enum Out {
    Configure(Box<dyn FnOnce(&mut Context)>),
    Exit,
    Empty,
}

impl Default for Out {
    fn default() -> Self {
        Self::Empty
    }
}

impl Debug for Out {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configure(_) => f.write_str("Configure(|&mut Context| -> {...})"),
            Self::Exit => f.write_str("Exit"),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

/// Trait for implementing a renderable scene.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once when the flow is created; configure the context (camera, clear colour)
/// 2. `on_window_events()` is called for each winit window event
/// 3. `on_update()` is called every frame
/// 4. `on_click()` is called when an object with one of this flow's pick ids is clicked
/// 5. `on_render()` is called each frame and specifies how to render `self`
pub trait GraphicsFlow<S> {
    /// Initialize the flow and configure the context.
    fn on_init(&mut self, ctx: &mut Context, state: &mut S) -> Out;

    /// Handle a click on an object rendered by this flow.
    ///
    /// `id` is the pick id of the clicked instance as set via `on_render`.
    /// See [`crate::pick::draw_to_pick_buffer`] for details.
    fn on_click(&mut self, ctx: &Context, state: &mut S, id: u32) -> Out;

    /// Called every frame with the elapsed time `dt`.
    fn on_update(&mut self, _ctx: &Context, _state: &mut S, _dt: Duration) -> Out {
        Out::Empty
    }

    /// Handle window events (keyboard, mouse, resizing, etc.).
    fn on_window_events(&mut self, _ctx: &Context, _state: &mut S, _event: &WindowEvent) -> Out {
        Out::Empty
    }

    /// Return renderable objects for this flow.
    ///
    /// Called each frame and during picking. The engine batches the renders
    /// of all flows by pipeline.
    fn on_render(&self) -> Render<'_>;
}

impl<State> Debug for dyn GraphicsFlow<State> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// The future a [`FlowConstructor`] resolves to.
pub type FlowFuture<S> = Pin<Box<dyn Future<Output = anyhow::Result<Box<dyn GraphicsFlow<S>>>>>>;

/// A flow constructor takes an `InitContext` and asynchronously returns a
/// boxed `GraphicsFlow`, so GPU resources can be created before the first frame.
pub type FlowConstructor<S> = Box<dyn FnOnce(InitContext) -> FlowFuture<S>>;

/// Application state bundle: GPU context and app state.
#[derive(Debug)]
pub struct AppState<State: 'static> {
    pub(crate) ctx: Context,
    state: State,
}

impl<State: 'static + Default> AppState<State> {
    async fn new(window: Arc<Window>, config: &Config) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config).await?;
        Ok(Self {
            ctx,
            state: State::default(),
        })
    }

    fn is_surface_configured(&self) -> bool {
        self.ctx.viewport.reconfigurations > 0
    }

    fn resize(&mut self, width: u32, height: u32) {
        if !self.ctx.viewport.resize(width, height) {
            log::debug!("ignoring resize to {}x{}", width, height);
            return;
        }
        self.ctx.config.width = width;
        self.ctx.config.height = height;
        self.ctx.projection.resize(width, height);
        self.ctx
            .surface
            .configure(&self.ctx.device, &self.ctx.config);
        self.ctx.depth_texture = Texture::create_depth_texture(
            &self.ctx.device,
            [self.ctx.config.width, self.ctx.config.height],
            "depth_texture",
        );
    }

    fn update(&mut self, dt: Duration) {
        let camera = &mut self.ctx.camera;
        camera.controller.update(&mut camera.rig.camera, dt);
        camera.rig.update(dt);
        camera.write_to_buffer(&self.ctx.queue, &self.ctx.projection);
    }

    fn render(&mut self, graphics_flows: &[Box<dyn GraphicsFlow<State>>]) -> Result<(), wgpu::SurfaceError> {
        // keep the render loop going
        self.ctx.window.request_redraw();

        if !self.is_surface_configured() {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let mut basics: Vec<Instanced> = Vec::new();
            let mut trans: Vec<Instanced> = Vec::new();
            graphics_flows.iter().for_each(|flow| {
                flow.on_render().set_pipelines(&mut basics, &mut trans);
            });

            // Translucent instances go last so the opaque scene shows through them.
            for (pipeline, batch) in [
                (&self.ctx.pipelines.basic, basics),
                (&self.ctx.pipelines.transparent, trans),
            ] {
                render_pass.set_pipeline(pipeline);
                for instanced in batch {
                    if instanced.amount == 0 || instanced.instance.size() == 0 {
                        log::warn!("you attempted to render {} with zero instances", instanced.mesh.name);
                        continue;
                    }
                    render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                    render_pass.draw_mesh_instanced(
                        instanced.mesh,
                        0..instanced.amount as u32,
                        &self.ctx.camera.bind_group,
                        &self.ctx.light.bind_group,
                    );
                }
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App<State: 'static> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    config: Config,
    proxy: EventLoopProxy<FlowEvent<State>>,
    state: Option<AppState<State>>,
    // The fully initialized flows once they are ready.
    graphics_flows: Vec<Box<dyn GraphicsFlow<State>>>,
    // Taken on the first resume.
    constructors: Option<Vec<FlowConstructor<State>>>,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl<State: 'static> App<State> {
    fn new(
        event_loop: &EventLoop<FlowEvent<State>>,
        config: Config,
        constructors: Vec<FlowConstructor<State>>,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            config,
            proxy,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            last_time: Instant::now(),
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

pub(crate) enum FlowEvent<State: 'static> {
    #[allow(dead_code)]
    Initialized {
        state: AppState<State>,
        flows: Vec<Box<dyn GraphicsFlow<State>>>,
    },
    #[allow(dead_code)]
    Failed(anyhow::Error),
    #[allow(dead_code)]
    Id((u32, HashSet<usize>)),
    Exit,
}

impl<State> Debug for FlowEvent<State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
            Self::Id(arg0) => f.debug_tuple("Id").field(arg0).finish(),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

async fn initialize<State: 'static + Default>(
    window: Arc<Window>,
    config: Config,
    constructors: Vec<FlowConstructor<State>>,
) -> anyhow::Result<(AppState<State>, Vec<Box<dyn GraphicsFlow<State>>>)> {
    let app_state = AppState::new(window, &config).await?;
    let flow_futures: Vec<_> = constructors
        .into_iter()
        // InitContext only clones the internal Arcs of Device and Queue
        .map(|constructor| constructor((&app_state.ctx).into()))
        .collect();
    let flows = futures::future::join_all(flow_futures)
        .await
        .into_iter()
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok((app_state, flows))
}

impl<State: 'static + Default> App<State> {
    fn start_flows(&mut self, mut app_state: AppState<State>, flows: Vec<Box<dyn GraphicsFlow<State>>>) {
        self.graphics_flows = flows;
        let size = app_state.ctx.window.inner_size();
        app_state.resize(size.width, size.height);
        for flow in self.graphics_flows.iter_mut() {
            let out = flow.on_init(&mut app_state.ctx, &mut app_state.state);
            handle_flow_output(&mut app_state.ctx, &self.proxy, out);
        }
        app_state.ctx.window.request_redraw();
        self.last_time = Instant::now();
        self.state = Some(app_state);
    }

    fn click(&mut self, pick_id: u32, flow_ids: HashSet<usize>) {
        let Some(state) = &mut self.state else {
            return;
        };
        if flow_ids.len() > 1 {
            log::warn!(
                "Multiple flows (indices {:?}) want to react to the render ID {}.",
                flow_ids,
                pick_id
            );
        }
        for flow_id in flow_ids {
            if let Some(flow) = self.graphics_flows.get_mut(flow_id) {
                let out = flow.on_click(&state.ctx, &mut state.state, pick_id);
                handle_flow_output(&mut state.ctx, &self.proxy, out);
            }
        }
    }
}

impl<State: 'static + Default> ApplicationHandler<FlowEvent<State>> for App<State> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title(&self.config.window_title);

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document
                .get_element_by_id(&self.config.canvas_id)
                .expect_throw("the render canvas is missing from the page");
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        let init_future = initialize(window, self.config.clone(), constructors);

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((app_state, flows)) => self.start_flows(app_state, flows),
                Err(e) => self.fail(event_loop, e.context("App initialization failed")),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok((state, flows)) => FlowEvent::Initialized { state, flows },
                    Err(e) => FlowEvent::Failed(e.context("App initialization failed")),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("The event loop closed before initialization finished");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent<State>) {
        match event {
            // sent by the wasm `spawn_local` in `resumed`
            FlowEvent::Initialized { state, flows } => self.start_flows(state, flows),
            FlowEvent::Failed(e) => self.fail(event_loop, e),
            FlowEvent::Id((pick_id, flow_ids)) => self.click(pick_id, flow_ids),
            FlowEvent::Exit => event_loop.exit(),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };

        state.ctx.camera.controller.handle_window_events(&event);

        if let WindowEvent::CursorMoved { position, .. } = event {
            let (dx, dy) = state.ctx.mouse.move_to(position);
            match state.ctx.mouse.pressed {
                MouseButtonState::Left => state.ctx.camera.controller.handle_mouse(dx, dy),
                MouseButtonState::Right => state.ctx.camera.controller.handle_pan(dx, dy),
                MouseButtonState::None => (),
            }
        };

        for flow in self.graphics_flows.iter_mut() {
            let out = flow.on_window_events(&state.ctx, &mut state.state, &event);
            handle_flow_output(&mut state.ctx, &self.proxy, out);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                state.update(dt);
                for flow in self.graphics_flows.iter_mut() {
                    let out = flow.on_update(&state.ctx, &mut state.state, dt);
                    handle_flow_output(&mut state.ctx, &self.proxy, out);
                }

                match state.render(&self.graphics_flows) {
                    Ok(()) => (),
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => log::error!("Unable to render {}", e),
                }
            }
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => {
                let button = match button {
                    MouseButton::Left => MouseButtonState::Left,
                    MouseButton::Right => MouseButtonState::Right,
                    _ => return,
                };
                if button_state.is_pressed() {
                    state.ctx.mouse.press(button);
                    return;
                }
                // a press and release without dragging is a click
                if !state
                    .ctx
                    .mouse
                    .release(button, self.config.camera.click_threshold)
                {
                    return;
                }
                let picked = draw_to_pick_buffer::<State>(
                    #[cfg(not(target_arch = "wasm32"))]
                    &self.async_runtime,
                    &self.graphics_flows,
                    &state.ctx,
                    &state.ctx.mouse,
                    #[cfg(target_arch = "wasm32")]
                    self.proxy.clone(),
                );
                if let Some((pick_id, flow_ids)) = picked {
                    self.click(pick_id, flow_ids);
                }
            }
            _ => {}
        }
    }
}

fn handle_flow_output<State>(ctx: &mut Context, proxy: &EventLoopProxy<FlowEvent<State>>, out: Out) {
    match out {
        Out::Configure(f) => f(ctx),
        Out::Exit => {
            if proxy.send_event(FlowEvent::Exit).is_err() {
                log::warn!("Exit requested after the event loop closed");
            }
        }
        Out::Empty => (),
    }
}

/// Open a window (or attach to the canvas on the web) and drive `constructors` until exit.
pub fn run<State: 'static + Default>(
    config: Config,
    constructors: Vec<FlowConstructor<State>>,
) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {}", e).into());
        }
    }

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<FlowEvent<State>> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        EventLoop::with_user_event().with_any_thread(true).build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<FlowEvent<State>> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        EventLoop::with_user_event().with_any_thread(true).build()?
    };

    #[cfg(not(all(
        feature = "integration-tests",
        any(target_os = "linux", target_os = "windows")
    )))]
    let event_loop: EventLoop<FlowEvent<State>> = EventLoop::with_user_event().build()?;

    let mut app: App<State> = App::new(&event_loop, config, constructors)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
