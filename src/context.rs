//! The GPU and window context shared by every flow.

use std::sync::Arc;

use anyhow::Context as _;
use cgmath::{Deg, Point3};
use winit::{dpi::PhysicalPosition, window::Window};

use crate::{
    camera::{Camera, CameraController, CameraResources, Projection},
    config::Config,
    data_structures::texture,
    navigation::CameraRig,
    pipelines::{
        Pipelines,
        light::{LightResources, LightUniform},
    },
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MouseButtonState {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MouseState {
    pub coords: PhysicalPosition<f64>,
    pub pressed: MouseButtonState,
    /// Cursor position when the pressed button went down.
    pub press_origin: Option<PhysicalPosition<f64>>,
}

impl MouseState {
    /// Track the cursor and return how far it moved since the last event.
    pub fn move_to(&mut self, position: PhysicalPosition<f64>) -> (f64, f64) {
        let delta = (position.x - self.coords.x, position.y - self.coords.y);
        self.coords = position;
        delta
    }

    pub fn press(&mut self, button: MouseButtonState) {
        self.pressed = button;
        self.press_origin = Some(self.coords);
    }

    /// Release `button`. Returns `true` when this completes a left click, i.e. the
    /// cursor travelled at most `threshold` pixels since the press.
    pub fn release(&mut self, button: MouseButtonState, threshold: f64) -> bool {
        if self.pressed != button {
            return false;
        }
        let origin = self.press_origin.take();
        self.pressed = MouseButtonState::None;
        match origin {
            Some(origin) if button == MouseButtonState::Left => {
                let (dx, dy) = (self.coords.x - origin.x, self.coords.y - origin.y);
                dx.hypot(dy) <= threshold
            }
            _ => false,
        }
    }
}

/// Size of the drawable area and how often the surface was reconfigured for it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub reconfigurations: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            reconfigurations: 0,
        }
    }

    /// Record a resize. Returns `false` for a zero sized area, which happens
    /// while a window is minimized and must not reach the surface.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.width = width;
        self.height = height;
        self.reconfigurations += 1;
        true
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub mouse: MouseState,
    pub clear_colour: wgpu::Color,
    pub viewport: Viewport,
}

impl Context {
    pub async fn new(window: Arc<Window>, app_config: &Config) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::debug!("wgpu setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("cannot create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no graphics adapter is compatible with the surface")?;
        log::debug!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("cannot open the graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders output linear colours, an Srgb surface does the conversion.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface supports no texture format")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        // Flows move the camera in on_init, until then it orbits the origin.
        let camera_config = &app_config.camera;
        let camera = Camera::from_config(Point3::new(0.0, 0.0, 0.0), camera_config);
        let projection = Projection::new(
            config.width,
            config.height,
            Deg(camera_config.fovy_deg),
            camera_config.znear,
            camera_config.zfar,
        );
        let rig = CameraRig::new(camera, app_config.animation);
        let camera = CameraResources::new(
            &device,
            rig,
            CameraController::new(camera_config),
            &projection,
        );

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let light = LightResources::new(LightUniform::hemispheric([0.0, 1.0, 0.0]), &device);

        let pipelines = Pipelines::new(
            &device,
            &config,
            &camera.bind_group_layout,
            &light.bind_group_layout,
        );

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            pipelines,
            mouse: MouseState::default(),
            clear_colour: wgpu::Color::BLACK,
            viewport: Viewport::new(size.width, size.height),
        })
    }

    /// Point the camera at `target` using the configured arc-rotate placement.
    pub fn place_camera(&mut self, target: Point3<f32>, app_config: &Config) {
        self.camera.rig.camera = Camera::from_config(target, &app_config.camera);
    }
}

/// The parts of the context a flow needs while it is being constructed.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        // wgpu handles are reference counted, this only clones the handles
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_resizes_are_ignored() {
        let mut viewport = Viewport::new(800, 600);
        assert!(!viewport.resize(0, 600));
        assert!(!viewport.resize(1024, 0));
        assert_eq!(viewport, Viewport::new(800, 600));
    }

    #[test]
    fn every_resize_reconfigures_once() {
        let mut viewport = Viewport::new(0, 0);
        assert!(viewport.is_empty());
        assert!(viewport.resize(1024, 768));
        assert!(viewport.resize(1024, 768));
        assert!(viewport.resize(640, 480));
        assert_eq!(viewport.reconfigurations, 3);
        assert_eq!((viewport.width, viewport.height), (640, 480));
    }

    fn at(x: f64, y: f64) -> PhysicalPosition<f64> {
        PhysicalPosition::new(x, y)
    }

    #[test]
    fn short_left_press_is_a_click() {
        let mut mouse = MouseState::default();
        assert_eq!(mouse.pressed, MouseButtonState::None);
        mouse.move_to(at(100.0, 100.0));
        mouse.press(MouseButtonState::Left);
        assert_eq!(mouse.move_to(at(104.0, 103.0)), (4.0, 3.0));
        assert!(mouse.release(MouseButtonState::Left, 10.0));
        assert_eq!(mouse.pressed, MouseButtonState::None);
        assert_eq!(mouse.press_origin, None);
    }

    #[test]
    fn dragging_past_the_threshold_is_not_a_click() {
        let mut mouse = MouseState::default();
        mouse.move_to(at(100.0, 100.0));
        mouse.press(MouseButtonState::Left);
        mouse.move_to(at(300.0, 100.0));
        // back near the start, but the press still ends far from where it began
        mouse.move_to(at(111.0, 100.0));
        assert!(!mouse.release(MouseButtonState::Left, 10.0));
    }

    #[test]
    fn only_the_left_button_clicks() {
        let mut mouse = MouseState::default();
        mouse.press(MouseButtonState::Right);
        assert!(!mouse.release(MouseButtonState::Left, 10.0));
        assert_eq!(mouse.pressed, MouseButtonState::Right);
        assert!(!mouse.release(MouseButtonState::Right, 10.0));
        assert_eq!(mouse.pressed, MouseButtonState::None);
    }
}
