//! Fixed-duration camera animations.
//!
//! An [`Animation`] moves one camera property (position or look-at target)
//! from a start value to an end value over `total_frames / frame_rate`
//! seconds. Values are interpolated linearly and held at the end value once
//! the duration has elapsed, at which point the animation is finished.
//!
//! The [`Animator`] owns all running animations. Several animations may drive
//! the same property at once; they are applied in start order every frame so
//! the one started last wins.

use cgmath::{EuclideanSpace, Point3, VectorSpace};
use instant::Duration;

use crate::{
    camera::Camera,
    config::{AnimationConfig, OverlapPolicy},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CameraProperty {
    Position,
    Target,
}

#[derive(Clone, Debug)]
pub struct Animation {
    pub property: CameraProperty,
    from: Point3<f32>,
    to: Point3<f32>,
    duration: Duration,
    elapsed: Duration,
}

impl Animation {
    pub fn new(
        property: CameraProperty,
        from: Point3<f32>,
        to: Point3<f32>,
        config: &AnimationConfig,
    ) -> Self {
        Self {
            property,
            from,
            to,
            duration: config.duration(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn advance(&mut self, dt: Duration) {
        self.elapsed = (self.elapsed + dt).min(self.duration);
    }

    /// Progress in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn value(&self) -> Point3<f32> {
        let t = self.progress();
        if t >= 1.0 {
            // exact end value, no float drift
            return self.to;
        }
        Point3::from_vec(self.from.to_vec().lerp(self.to.to_vec(), t))
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    fn apply(&self, camera: &mut Camera) {
        match self.property {
            CameraProperty::Position => camera.set_position(self.value()),
            CameraProperty::Target => camera.set_target(self.value()),
        }
    }
}

#[derive(Debug, Default)]
pub struct Animator {
    running: Vec<Animation>,
    policy: OverlapPolicy,
}

impl Animator {
    pub fn new(policy: OverlapPolicy) -> Self {
        Self {
            running: Vec::new(),
            policy,
        }
    }

    pub fn start(&mut self, animation: Animation) {
        if self.policy == OverlapPolicy::Replace {
            self.running.retain(|a| a.property != animation.property);
        }
        self.running.push(animation);
    }

    /// Animate both camera position and target from their current values to `destination`.
    pub fn transition(&mut self, camera: &Camera, destination: Point3<f32>, config: &AnimationConfig) {
        self.start(Animation::new(
            CameraProperty::Position,
            camera.position(),
            destination,
            config,
        ));
        self.start(Animation::new(
            CameraProperty::Target,
            camera.target(),
            destination,
            config,
        ));
    }

    /// Advance every running animation by `dt`, write the values to the camera
    /// and drop the animations that reached their end value.
    pub fn update(&mut self, camera: &mut Camera, dt: Duration) {
        // Targets go first so a position that lands on the target keeps the heading.
        for property in [CameraProperty::Target, CameraProperty::Position] {
            for animation in self.running.iter_mut().filter(|a| a.property == property) {
                animation.advance(dt);
                animation.apply(camera);
            }
        }
        let before = self.running.len();
        self.running.retain(|a| !a.is_finished());
        if before != self.running.len() {
            log::debug!("{} camera animation(s) finished", before - self.running.len());
        }
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_empty()
    }

    pub fn running(&self) -> &[Animation] {
        &self.running
    }
}
