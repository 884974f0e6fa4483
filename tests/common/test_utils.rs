#![allow(dead_code)]

use floor_ngin::{
    AnimationConfig, Point3,
    camera::Camera,
    data_structures::scene::Scene,
    floor_plan,
    navigation::CameraRig,
    walkthrough::{Tour, WalkthroughState},
};
use instant::Duration;

/// Frame time used to step animations, roughly 60 fps.
pub(crate) const FRAME: Duration = Duration::from_micros(16_667);

/// The walkthrough without a window: clicks go through [`Tour`] and the camera
/// rig is stepped with a fixed frame time.
pub(crate) struct Walk {
    pub tour: Tour,
    pub state: WalkthroughState,
    pub rig: CameraRig,
}

impl Walk {
    pub fn new(animation: AnimationConfig) -> Self {
        let tour = Tour::new().unwrap();
        let target = floor_plan::initial_target(tour.scene()).unwrap();
        let camera = Camera::from_config(target, &Default::default());
        Self {
            tour,
            state: WalkthroughState::default(),
            rig: CameraRig::new(camera, animation),
        }
    }

    pub fn scene(&self) -> &Scene {
        self.tour.scene()
    }

    pub fn pick_id(&self, name: &str) -> u32 {
        self.scene()
            .get(name)
            .unwrap_or_else(|| panic!("{} is not part of the floor plan", name))
            .pick_id()
    }

    /// Click on `name`, returns whether a camera transition started.
    pub fn click(&mut self, name: &str) -> bool {
        let id = self.pick_id(name);
        self.click_id(id)
    }

    pub fn click_id(&mut self, id: u32) -> bool {
        match self.tour.click(&mut self.state, id) {
            Some(transition) => {
                transition.start(&mut self.rig);
                true
            }
            None => false,
        }
    }

    fn frame(&mut self) {
        self.rig.update(FRAME);
        self.tour.update(&mut self.state, &self.rig);
    }

    pub fn frames(&mut self, n: u32) {
        for _ in 0..n {
            self.frame();
        }
    }

    /// Step until every animation has finished, failing after `limit` frames.
    pub fn settle(&mut self, limit: u32) -> u32 {
        let mut frames = 0;
        while self.rig.is_animating() {
            assert!(frames < limit, "camera still animating after {} frames", limit);
            self.frame();
            frames += 1;
        }
        frames
    }

    pub fn position(&self) -> Point3<f32> {
        self.rig.camera.position()
    }

    pub fn target(&self) -> Point3<f32> {
        self.rig.camera.target()
    }
}

pub(crate) fn assert_close(actual: Point3<f32>, expected: Point3<f32>) {
    let d = ((actual.x - expected.x).powi(2)
        + (actual.y - expected.y).powi(2)
        + (actual.z - expected.z).powi(2))
    .sqrt();
    assert!(d < 1e-4, "{:?} is not close to {:?}", actual, expected);
}
