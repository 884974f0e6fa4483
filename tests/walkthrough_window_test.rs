//! Opens a real window, so it needs a GPU and a display.
#![cfg(feature = "integration-tests")]

use floor_ngin::{
    Config, Point3,
    context::{Context, InitContext},
    flow::{FlowConstructor, FlowFuture, GraphicsFlow, Out, run},
    render::Render,
    walkthrough::{Walkthrough, WalkthroughState},
};
use instant::Duration;

const MAX_FRAMES: u32 = 2000;

struct Driver {
    inner: Walkthrough,
    frames: u32,
}

impl GraphicsFlow<WalkthroughState> for Driver {
    fn on_init(&mut self, ctx: &mut Context, state: &mut WalkthroughState) -> Out {
        let out = self.inner.on_init(ctx, state);
        assert_eq!(ctx.clear_colour, floor_ngin::floor_plan::CLEAR_COLOUR);
        out
    }

    fn on_click(&mut self, ctx: &Context, state: &mut WalkthroughState, id: u32) -> Out {
        self.inner.on_click(ctx, state, id)
    }

    fn on_update(&mut self, ctx: &Context, state: &mut WalkthroughState, dt: Duration) -> Out {
        self.inner.on_update(ctx, state, dt);
        self.frames += 1;
        match self.frames {
            2 => {
                let door = self.inner.scene().get("Door3").unwrap().pick_id();
                self.inner.on_click(ctx, state, door)
            }
            n if n > MAX_FRAMES => panic!("the camera never reached Room3"),
            n if n > 2 && !ctx.camera.rig.is_animating() => {
                let position = ctx.camera.rig.camera.position();
                assert!((position.x - 4.0).abs() < 1e-4, "{:?}", position);
                assert_eq!(ctx.camera.rig.camera.target(), Point3::new(4.0, 0.0, 0.0));
                assert_eq!(state.current_room(), Some("Room3"));
                assert!(ctx.viewport.reconfigurations >= 1);
                Out::Exit
            }
            _ => Out::Empty,
        }
    }

    fn on_render(&self) -> Render<'_> {
        self.inner.on_render()
    }
}

#[test]
fn clicking_door3_moves_the_camera_into_room3() {
    let config = Config::default();
    let flow_config = config.clone();
    let constructor: FlowConstructor<WalkthroughState> = Box::new(move |ctx: InitContext| -> FlowFuture<WalkthroughState> {
        Box::pin(async move {
            let flow: Box<dyn GraphicsFlow<WalkthroughState>> = Box::new(Driver {
                inner: Walkthrough::new(ctx, flow_config)?,
                frames: 0,
            });
            Ok(flow)
        })
    });
    run::<WalkthroughState>(config, vec![constructor]).unwrap();
}
