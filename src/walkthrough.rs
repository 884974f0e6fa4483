//! The floor-plan walkthrough flow.
//!
//! Draws the floor plan with four instanced batches and sends the camera to a
//! room whenever one of the doors is clicked.

use std::sync::Arc;

use cgmath::Point3;
use instant::Duration;

use crate::{
    config::Config,
    context::{Context, InitContext},
    data_structures::{
        batch::{Batch, BatchKey},
        mesh::{Geometry, Mesh},
        scene::Scene,
    },
    floor_plan,
    flow::{FlowConstructor, FlowFuture, GraphicsFlow, Out},
    navigation::{CameraRig, Navigator},
    pipelines::light::LightUniform,
    render::Render,
};

/// What happened during the walkthrough so far.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WalkthroughState {
    /// Room the camera is moving into, until it gets there.
    pub heading_for: Option<String>,
    /// Rooms the camera arrived in, oldest first.
    pub visited: Vec<String>,
}

impl WalkthroughState {
    pub fn head_to(&mut self, room: &str) {
        self.heading_for = Some(room.to_string());
    }

    /// Record the arrival once the camera stopped moving.
    pub fn settle(&mut self, camera_moving: bool) {
        if camera_moving {
            return;
        }
        if let Some(room) = self.heading_for.take() {
            log::debug!("arrived in {}", room);
            self.visited.push(room);
        }
    }

    /// The room the camera is in, `None` before the first arrival.
    pub fn current_room(&self) -> Option<&str> {
        self.visited.last().map(String::as_str)
    }
}

/// A camera move into a room, started by clicking its door.
#[derive(Clone, Debug, PartialEq)]
pub struct RoomTransition {
    pub room: String,
    pub destination: Point3<f32>,
}

impl RoomTransition {
    pub fn start(self, rig: &mut CameraRig) {
        log::debug!("entering {}", self.room);
        rig.transition_to(self.destination);
    }
}

/// The floor plan and its doors, everything of the walkthrough that needs no GPU.
#[derive(Debug)]
pub struct Tour {
    scene: Scene,
    navigator: Navigator,
}

impl Tour {
    pub fn new() -> anyhow::Result<Self> {
        let scene = floor_plan::build_scene()?;
        let navigator = floor_plan::navigator(&scene)?;
        Ok(Self { scene, navigator })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// React to a click on `pick_id`. Doors yield the transition into their room.
    pub fn click(&self, state: &mut WalkthroughState, pick_id: u32) -> Option<RoomTransition> {
        let Some(binding) = self.navigator.resolve(pick_id) else {
            if let Some(primitive) = self.scene.by_pick_id(pick_id) {
                log::debug!("{} clicked, it leads nowhere", primitive.name);
            }
            return None;
        };
        log::info!("{} clicked, moving to {}", binding.door, binding.room);
        state.head_to(&binding.room);
        Some(RoomTransition {
            room: binding.room.clone(),
            destination: binding.destination,
        })
    }

    /// Called once per frame after the camera animations advanced.
    pub fn update(&self, state: &mut WalkthroughState, rig: &CameraRig) {
        state.settle(rig.is_animating());
    }
}

pub struct Walkthrough {
    config: Config,
    tour: Tour,
    opaque: Vec<Batch>,
    transparent: Vec<Batch>,
}

impl Walkthrough {
    pub fn new(ctx: InitContext, config: Config) -> anyhow::Result<Self> {
        let tour = Tour::new()?;
        let scene = tour.scene();

        let unit_box = Arc::new(Mesh::upload(&ctx.device, "unit box", &Geometry::unit_box()));
        let unit_plane = Arc::new(Mesh::upload(&ctx.device, "unit plane", &Geometry::unit_plane()));

        let mut opaque = Vec::new();
        let mut transparent = Vec::new();
        for plane in [false, true] {
            for translucent in [false, true] {
                let key = BatchKey {
                    plane,
                    transparent: translucent,
                };
                let mesh = if plane { &unit_plane } else { &unit_box };
                let batch = Batch::new(&ctx.device, scene, key, mesh.clone());
                if batch.is_empty() {
                    continue;
                }
                if translucent {
                    transparent.push(batch);
                } else {
                    opaque.push(batch);
                }
            }
        }
        log::debug!(
            "{} opaque and {} transparent batches",
            opaque.len(),
            transparent.len()
        );

        Ok(Self {
            config,
            tour,
            opaque,
            transparent,
        })
    }

    pub fn constructor(config: Config) -> FlowConstructor<WalkthroughState> {
        Box::new(move |ctx: InitContext| -> FlowFuture<WalkthroughState> {
            Box::pin(async move {
                let flow: Box<dyn GraphicsFlow<WalkthroughState>> =
                    Box::new(Walkthrough::new(ctx, config)?);
                Ok(flow)
            })
        })
    }

    pub fn scene(&self) -> &Scene {
        self.tour.scene()
    }
}

impl GraphicsFlow<WalkthroughState> for Walkthrough {
    fn on_init(&mut self, ctx: &mut Context, _state: &mut WalkthroughState) -> Out {
        ctx.clear_colour = self.tour.scene.clear_colour;
        ctx.light.uniform = LightUniform::hemispheric(floor_plan::LIGHT_DIRECTION);
        ctx.light.write_to_buffer(&ctx.queue);
        match floor_plan::initial_target(&self.tour.scene) {
            Ok(target) => ctx.place_camera(target, &self.config),
            Err(e) => log::warn!("keeping the default camera: {:#}", e),
        }
        Out::Empty
    }

    fn on_click(&mut self, _ctx: &Context, state: &mut WalkthroughState, id: u32) -> Out {
        match self.tour.click(state, id) {
            Some(transition) => Out::Configure(Box::new(move |ctx: &mut Context| {
                transition.start(&mut ctx.camera.rig)
            })),
            None => Out::Empty,
        }
    }

    fn on_update(&mut self, ctx: &Context, state: &mut WalkthroughState, _dt: Duration) -> Out {
        self.tour.update(state, &ctx.camera.rig);
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        Render::Composed(vec![
            Render::Defaults(self.opaque.iter().map(Batch::instanced).collect()),
            Render::Transparents(self.transparent.iter().map(Batch::instanced).collect()),
        ])
    }
}

/// Run the walkthrough until the window is closed.
pub fn run(config: Config) -> anyhow::Result<()> {
    let constructor = Walkthrough::constructor(config.clone());
    crate::flow::run::<WalkthroughState>(config, vec![constructor])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_room_counts_as_visited_once_the_camera_stops() {
        let tour = Tour::new().unwrap();
        let mut state = WalkthroughState::default();
        assert_eq!(state.current_room(), None);

        let door2 = tour.scene().get("Door2").unwrap().pick_id();
        let transition = tour.click(&mut state, door2).unwrap();
        assert_eq!(transition.room, "Room2");
        assert_eq!(state.heading_for.as_deref(), Some("Room2"));
        state.settle(true);
        assert_eq!(state.current_room(), None);

        // a second door before arriving redirects the walk
        let door3 = tour.scene().get("Door3").unwrap().pick_id();
        tour.click(&mut state, door3).unwrap();
        state.settle(false);
        assert_eq!(state.visited, vec!["Room3".to_string()]);
        assert_eq!(state.current_room(), Some("Room3"));
        assert_eq!(state.heading_for, None);
    }

    #[test]
    fn clicks_on_anything_but_doors_change_nothing() {
        let tour = Tour::new().unwrap();
        let mut state = WalkthroughState::default();
        let sofa = tour.scene().get("Sofa").unwrap().pick_id();
        assert!(tour.click(&mut state, sofa).is_none());
        assert!(tour.click(&mut state, 0).is_none());
        assert_eq!(state, WalkthroughState::default());
    }
}
