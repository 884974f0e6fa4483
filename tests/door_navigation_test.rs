use floor_ngin::{AnimationConfig, OverlapPolicy, Point3};

use crate::common::test_utils::{Walk, assert_close};

mod common;

#[test]
fn door1_sends_the_camera_into_room1() {
    let mut walk = Walk::new(AnimationConfig::default());
    assert!(walk.click("Door1"));
    let frames = walk.settle(200);
    // 100 frames at 60 fps, the last step may land a frame late
    assert!((100..=101).contains(&frames), "took {} frames", frames);
    assert_close(walk.position(), Point3::new(-6.0, 0.0, 0.0));
    assert_close(walk.target(), Point3::new(-6.0, 0.0, 0.0));
}

#[test]
fn every_door_leads_to_its_room() {
    for (door, room) in [("Door1", "Room1"), ("Door2", "Room2"), ("Door3", "Room3")] {
        let mut walk = Walk::new(AnimationConfig::default());
        let room_position = walk.scene().position_of(room).unwrap();
        assert!(walk.click(door));
        walk.settle(200);
        let expected = Point3::new(room_position.x, room_position.y, room_position.z);
        assert_close(walk.position(), expected);
        assert_close(walk.target(), expected);
        assert_eq!(walk.state.current_room(), Some(room));
    }
}

#[test]
fn transition_is_halfway_after_50_frames() {
    let mut walk = Walk::new(AnimationConfig::default());
    let start_target = walk.target();
    walk.click("Door3");
    walk.frames(50);
    assert_eq!(walk.state.current_room(), None);
    assert_eq!(walk.state.heading_for.as_deref(), Some("Room3"));
    let expected = Point3::new(
        start_target.x + (4.0 - start_target.x) * 0.5,
        start_target.y,
        start_target.z,
    );
    let t = walk.target();
    assert!((t.x - expected.x).abs() < 0.05, "{:?} vs {:?}", t, expected);
    assert!(walk.rig.is_animating());
}

#[test]
fn overlapping_clicks_end_in_the_last_room() {
    let mut walk = Walk::new(AnimationConfig::default());
    walk.click("Door2");
    walk.frames(10);
    walk.click("Door3");
    walk.settle(300);
    assert_close(walk.position(), Point3::new(4.0, 0.0, 0.0));
    assert_close(walk.target(), Point3::new(4.0, 0.0, 0.0));
    // Room2 was never reached
    assert_eq!(walk.state.visited, vec!["Room3".to_string()]);
}

#[test]
fn replace_policy_also_ends_in_the_last_room() {
    let mut walk = Walk::new(AnimationConfig {
        overlap: OverlapPolicy::Replace,
        ..Default::default()
    });
    walk.click("Door2");
    walk.frames(10);
    walk.click("Door3");
    assert_eq!(walk.rig.animator.running().len(), 2);
    walk.settle(200);
    assert_close(walk.position(), Point3::new(4.0, 0.0, 0.0));
}

#[test]
fn furniture_and_walls_are_not_doors() {
    let mut walk = Walk::new(AnimationConfig::default());
    let before = walk.position();
    for name in ["Sofa", "Bed1", "Wall3", "Floor", "KitchenCabinet"] {
        assert!(!walk.click(name), "{} should not navigate", name);
    }
    assert!(!walk.rig.is_animating());
    assert_eq!(walk.position(), before);
    assert!(!walk.click_id(0));
    assert_eq!(walk.state.current_room(), None);
}
