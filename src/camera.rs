//! Camera, projection and the mouse orbit controller.
//!
//! The camera is an arc-rotate camera: it has a world position and a look-at
//! target and can be orbited around that target. Unlike a pure spherical
//! camera, position and target are independent values so that transitions can
//! animate both of them (and even move the position onto the target).
//!
//! World coordinates are left-handed with y up: looking along +z, +x is to the
//! right. The view matrix mirrors z so the right-handed projection below can be
//! used unchanged, which also flips the winding of every triangle on screen
//! (see [`FRONT_FACE`]).

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use instant::Duration;
use wgpu::util::DeviceExt;
use winit::{
    event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{config::CameraConfig, navigation::CameraRig};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[rustfmt::skip]
const MIRROR_Z: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, -1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
);

/// Front face of meshes authored counter-clockwise once [`MIRROR_Z`] is applied.
pub const FRONT_FACE: wgpu::FrontFace = wgpu::FrontFace::Cw;

const DEGENERATE_EPSILON: f32 = 1e-6;
// Keep the camera off the poles, look_to_rh is undefined when looking along `up`.
const BETA_LIMIT: f32 = 0.01;

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    position: Point3<f32>,
    target: Point3<f32>,
    up: Vector3<f32>,
    // Last well-defined viewing direction, used while position == target.
    heading: Vector3<f32>,
}

impl Camera {
    /// Place a camera on a sphere around `target`.
    ///
    /// `alpha` is the horizontal angle and `beta` the angle from the up axis,
    /// both in radians: `position = target + radius * (cos a sin b, cos b, sin a sin b)`.
    pub fn arc_rotate(target: Point3<f32>, alpha: f32, beta: f32, radius: f32) -> Self {
        let mut camera = Self {
            position: target,
            target,
            up: Vector3::unit_y(),
            heading: -Vector3::unit_z(),
        };
        camera.place_on_sphere(alpha, beta, radius);
        camera
    }

    pub fn from_config(target: Point3<f32>, config: &CameraConfig) -> Self {
        Self::arc_rotate(target, config.alpha, config.beta, config.radius)
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    /// Normalized viewing direction.
    pub fn heading(&self) -> Vector3<f32> {
        self.heading
    }

    pub fn radius(&self) -> f32 {
        (self.position - self.target).magnitude()
    }

    pub fn set_position(&mut self, position: Point3<f32>) {
        self.position = position;
        self.refresh_heading();
    }

    pub fn set_target(&mut self, target: Point3<f32>) {
        self.target = target;
        self.refresh_heading();
    }

    /// Keep the current angles but move the camera to a new distance from the target.
    pub fn set_radius(&mut self, radius: f32) {
        let (alpha, beta, _) = self.spherical();
        self.place_on_sphere(alpha, beta, radius);
    }

    /// Rotate around the target by the given angle deltas (radians).
    pub fn orbit(&mut self, d_alpha: f32, d_beta: f32) {
        let (alpha, beta, radius) = self.spherical();
        self.place_on_sphere(alpha + d_alpha, beta + d_beta, radius);
    }

    /// Move position and target together, `right` and `up` are measured in the
    /// camera's screen plane.
    pub fn pan(&mut self, right: f32, up: f32) {
        let screen_right = self.up.cross(self.heading);
        if screen_right.magnitude2() <= DEGENERATE_EPSILON {
            return;
        }
        let screen_right = screen_right.normalize();
        let screen_up = self.heading.cross(screen_right);
        let offset = screen_right * right + screen_up * up;
        self.position += offset;
        self.target += offset;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        MIRROR_Z * Matrix4::look_to_lh(self.position, self.heading, self.up)
    }

    /// Angles and distance of the position relative to the target.
    ///
    /// When the camera sits on its target the angles are derived from the heading,
    /// so zooming out after a transition backs away along the viewing direction.
    pub fn spherical(&self) -> (f32, f32, f32) {
        let offset = self.position - self.target;
        let radius = offset.magnitude();
        let dir = if radius > DEGENERATE_EPSILON {
            offset / radius
        } else {
            -self.heading
        };
        let beta = dir.y.clamp(-1.0, 1.0).acos();
        let alpha = dir.z.atan2(dir.x);
        (alpha, beta, radius)
    }

    fn place_on_sphere(&mut self, alpha: f32, beta: f32, radius: f32) {
        let beta = beta.clamp(BETA_LIMIT, std::f32::consts::PI - BETA_LIMIT);
        let offset = Vector3::new(
            alpha.cos() * beta.sin(),
            beta.cos(),
            alpha.sin() * beta.sin(),
        ) * radius.max(0.0);
        self.position = self.target + offset;
        if radius > DEGENERATE_EPSILON {
            self.heading = -offset.normalize();
        } else {
            self.heading = -Vector3::new(
                alpha.cos() * beta.sin(),
                beta.cos(),
                alpha.sin() * beta.sin(),
            );
        }
    }

    fn refresh_heading(&mut self) {
        let dir = self.target - self.position;
        let len = dir.magnitude();
        if len > DEGENERATE_EPSILON {
            let dir = dir / len;
            // Looking straight up or down has no defined right vector.
            if dir.cross(self.up).magnitude2() > DEGENERATE_EPSILON {
                self.heading = dir;
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position().to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns mouse and keyboard input into orbit, pan and zoom movements.
///
/// Drag deltas and wheel steps are accumulated between frames and applied in
/// [`CameraController::update`]. Arrow keys orbit for as long as they are held.
#[derive(Debug)]
pub struct CameraController {
    orbit_speed: f32,
    pan_speed: f32,
    key_orbit_speed: f32,
    zoom_speed: f32,
    min_radius: f32,
    rotate_horizontal: f32,
    rotate_vertical: f32,
    pan_horizontal: f32,
    pan_vertical: f32,
    scroll: f32,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

impl CameraController {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            orbit_speed: config.orbit_speed,
            pan_speed: config.pan_speed,
            key_orbit_speed: config.key_orbit_speed,
            zoom_speed: config.zoom_speed,
            min_radius: config.min_radius,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            pan_horizontal: 0.0,
            pan_vertical: 0.0,
            scroll: 0.0,
            left: false,
            right: false,
            up: false,
            down: false,
        }
    }

    /// Orbit by a drag of `dx`, `dy` pixels.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        self.rotate_horizontal += dx as f32;
        self.rotate_vertical += dy as f32;
    }

    /// Pan by a drag of `dx`, `dy` pixels.
    pub fn handle_pan(&mut self, dx: f64, dy: f64) {
        self.pan_horizontal += dx as f32;
        self.pan_vertical += dy as f32;
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => {
                let pressed = *state == ElementState::Pressed;
                match key {
                    KeyCode::ArrowLeft => self.left = pressed,
                    KeyCode::ArrowRight => self.right = pressed,
                    KeyCode::ArrowUp => self.up = pressed,
                    KeyCode::ArrowDown => self.down = pressed,
                    _ => (),
                }
            }
            // keys released while unfocused never report a release
            WindowEvent::Focused(false) => {
                self.left = false;
                self.right = false;
                self.up = false;
                self.down = false;
            }
            _ => (),
        }
    }

    pub fn update(&mut self, camera: &mut Camera, dt: Duration) {
        let step = self.key_orbit_speed * dt.as_secs_f32();
        let key_alpha = (self.right as i8 - self.left as i8) as f32 * step;
        let key_beta = (self.down as i8 - self.up as i8) as f32 * step;
        let d_alpha = -self.rotate_horizontal * self.orbit_speed + key_alpha;
        let d_beta = -self.rotate_vertical * self.orbit_speed + key_beta;
        if d_alpha != 0.0 || d_beta != 0.0 {
            camera.orbit(d_alpha, d_beta);
        }
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;

        if self.pan_horizontal != 0.0 || self.pan_vertical != 0.0 {
            // the scene follows the cursor
            camera.pan(
                -self.pan_horizontal * self.pan_speed,
                self.pan_vertical * self.pan_speed,
            );
            self.pan_horizontal = 0.0;
            self.pan_vertical = 0.0;
        }

        if self.scroll != 0.0 {
            // scrolling up moves closer, never pushing a closer camera out to min_radius
            let floor = self.min_radius.min(camera.radius());
            let radius = (camera.radius() - self.scroll * self.zoom_speed).max(floor);
            camera.set_radius(radius);
            self.scroll = 0.0;
        }
    }
}

/// GPU side of the camera together with the rig that moves it.
#[derive(Debug)]
pub struct CameraResources {
    pub rig: CameraRig,
    pub controller: CameraController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(
        device: &wgpu::Device,
        rig: CameraRig,
        controller: CameraController,
        projection: &Projection,
    ) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&rig.camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            rig,
            controller,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Recompute the view projection and upload it.
    pub fn write_to_buffer(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.uniform.update_view_proj(&self.rig.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point3<f32>, b: Point3<f32>) -> bool {
        (a - b).magnitude() < 1e-4
    }

    #[test]
    fn arc_rotate_places_camera_on_sphere() {
        let cam = Camera::arc_rotate(
            Point3::new(0.0, 0.0, 0.0),
            -std::f32::consts::FRAC_PI_2,
            std::f32::consts::FRAC_PI_4,
            10.0,
        );
        let half_sqrt2 = 10.0 * std::f32::consts::FRAC_1_SQRT_2;
        assert!(close(cam.position(), Point3::new(0.0, half_sqrt2, -half_sqrt2)));
        assert!((cam.radius() - 10.0).abs() < 1e-4);
        let to_target = (cam.target() - cam.position()).normalize();
        assert!((cam.heading() - to_target).magnitude() < 1e-5);
    }

    #[test]
    fn heading_survives_position_on_target() {
        let mut cam = Camera::arc_rotate(Point3::new(0.0, 0.0, 0.0), 0.3, 1.0, 5.0);
        let before = cam.heading();
        cam.set_target(Point3::new(4.0, 0.0, 0.0));
        cam.set_position(Point3::new(4.0, 0.0, 0.0));
        assert_eq!(cam.radius(), 0.0);
        let after = cam.heading();
        assert!(after.x.is_finite() && after.y.is_finite() && after.z.is_finite());
        // the position write made the view degenerate, so the heading from the target write stays
        assert!((after.magnitude() - 1.0).abs() < 1e-5);
        assert_ne!(before, Vector3::new(0.0, 0.0, 0.0));
        let m = cam.calc_matrix();
        let cols: [[f32; 4]; 4] = m.into();
        assert!(cols.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn zoom_out_from_degenerate_camera_backs_away_along_heading() {
        let mut cam = Camera::arc_rotate(Point3::new(0.0, 0.0, 0.0), 0.0, 1.2, 3.0);
        cam.set_target(Point3::new(1.0, 0.0, 0.0));
        let heading = cam.heading();
        cam.set_position(Point3::new(1.0, 0.0, 0.0));
        cam.set_radius(2.0);
        assert!((cam.radius() - 2.0).abs() < 1e-4);
        let expected = Point3::new(1.0, 0.0, 0.0) - heading * 2.0;
        assert!(close(cam.position(), expected));
    }

    #[test]
    fn orbit_keeps_radius_and_clamps_at_the_pole() {
        let mut cam = Camera::arc_rotate(Point3::new(1.0, 2.0, 3.0), 0.0, 0.5, 7.0);
        cam.orbit(1.0, -10.0);
        assert!((cam.radius() - 7.0).abs() < 1e-3);
        let (_, beta, _) = cam.spherical();
        assert!(beta >= BETA_LIMIT - 1e-4);
    }

    #[test]
    fn controller_zoom_respects_min_radius() {
        let config = CameraConfig::default();
        let mut controller = CameraController::new(&config);
        let mut cam = Camera::from_config(Point3::new(0.0, 0.0, 0.0), &config);
        controller.scroll = 1000.0;
        controller.update(&mut cam, Duration::from_millis(16));
        assert!((cam.radius() - config.min_radius).abs() < 1e-4);
    }

    #[test]
    fn zoom_in_after_arriving_in_a_room_stays_put() {
        let config = CameraConfig::default();
        let mut controller = CameraController::new(&config);
        let mut cam = Camera::from_config(Point3::new(0.0, 0.0, 0.0), &config);
        cam.set_target(Point3::new(-6.0, 0.0, 0.0));
        cam.set_position(Point3::new(-6.0, 0.0, 0.0));
        controller.scroll = 1.0;
        controller.update(&mut cam, Duration::from_millis(16));
        assert_eq!(cam.radius(), 0.0);
        assert!(close(cam.position(), Point3::new(-6.0, 0.0, 0.0)));

        // zooming out still backs away
        controller.scroll = -2.0;
        controller.update(&mut cam, Duration::from_millis(16));
        assert!((cam.radius() - 2.0 * config.zoom_speed).abs() < 1e-4);
    }

    #[test]
    fn pan_moves_position_and_target_together() {
        let mut cam = Camera::arc_rotate(Point3::new(0.0, 0.0, 0.0), -std::f32::consts::FRAC_PI_2, 1.0, 10.0);
        let (position, heading, radius) = (cam.position(), cam.heading(), cam.radius());
        cam.pan(2.0, 0.0);
        // looking along +z, screen right is +x
        assert!(close(cam.target(), Point3::new(2.0, 0.0, 0.0)));
        assert!(close(cam.position(), position + Vector3::new(2.0, 0.0, 0.0)));
        assert!((cam.heading() - heading).magnitude() < 1e-5);
        assert!((cam.radius() - radius).abs() < 1e-4);
    }

    #[test]
    fn right_drag_pulls_the_scene_along() {
        let config = CameraConfig::default();
        let mut controller = CameraController::new(&config);
        let mut cam = Camera::from_config(Point3::new(0.0, 0.0, 0.0), &config);
        controller.handle_pan(100.0, 0.0);
        controller.update(&mut cam, Duration::from_millis(16));
        // dragging right moves the camera left
        assert!((cam.target().x + 100.0 * config.pan_speed).abs() < 1e-4);
        assert!(cam.target().y.abs() < 1e-4 && cam.target().z.abs() < 1e-4);
    }

    #[test]
    fn held_arrow_key_orbits_until_released() {
        let config = CameraConfig::default();
        let mut controller = CameraController::new(&config);
        let mut cam = Camera::from_config(Point3::new(0.0, 0.0, 0.0), &config);
        let (alpha, _, _) = cam.spherical();
        controller.right = true;
        controller.update(&mut cam, Duration::from_millis(500));
        let (moved, _, _) = cam.spherical();
        assert!((moved - alpha - 0.5 * config.key_orbit_speed).abs() < 1e-4);

        controller.handle_window_events(&WindowEvent::Focused(false));
        controller.update(&mut cam, Duration::from_millis(500));
        let (still, _, _) = cam.spherical();
        assert!((still - moved).abs() < 1e-5);
    }

    #[test]
    fn view_keeps_left_handed_layout() {
        // default placement: behind the target looking along +z
        let cam = Camera::from_config(Point3::new(0.0, 0.0, 0.0), &CameraConfig::default());
        let view = cam.calc_matrix();
        let left = view * Point3::new(-6.0, 0.0, 0.0).to_homogeneous();
        let right = view * Point3::new(4.0, 0.0, 0.0).to_homogeneous();
        let target = view * Point3::new(0.0, 0.0, 0.0).to_homogeneous();
        assert!(left.x < 0.0 && right.x > 0.0);
        // right-handed view space looks down -z
        assert!(target.z < 0.0);
    }

    #[test]
    fn projection_resize_clamps_zero_height_to_one() {
        let mut projection = Projection::new(800, 600, cgmath::Deg(45.0), 0.1, 100.0);
        projection.resize(1024, 0);
        assert_eq!(projection.aspect(), 1024.0);
    }
}
