//! The floor plan: five room volumes, four walls, ceiling and floor, three
//! doors and six pieces of furniture, all at fixed coordinates.

use std::f32::consts::FRAC_PI_2;

use anyhow::Context as _;
use cgmath::{EuclideanSpace, Point3};

use crate::{
    data_structures::{
        material::Material,
        primitive::{Primitive, Shape},
        scene::Scene,
    },
    navigation::Navigator,
};

/// Doors and the room each one leads to.
pub const DOORS: [(&str, &str); 3] = [("Door1", "Room1"), ("Door2", "Room2"), ("Door3", "Room3")];

pub const CLEAR_COLOUR: wgpu::Color = wgpu::Color {
    r: 0.9,
    g: 0.9,
    b: 0.9,
    a: 1.0,
};

/// Direction of the hemispheric light.
pub const LIGHT_DIRECTION: [f32; 3] = [0.0, 1.0, 0.0];

const ROOM: Shape = Shape::Box {
    width: 5.0,
    height: 3.0,
    depth: 5.0,
};
const HALL: Shape = Shape::Box {
    width: 8.0,
    height: 3.0,
    depth: 5.0,
};
const DOOR: Shape = Shape::Box {
    width: 1.0,
    height: 2.0,
    depth: 0.2,
};
const BED: Shape = Shape::Box {
    width: 2.0,
    height: 0.5,
    depth: 3.0,
};
const WALL: Shape = Shape::Plane {
    width: 10.0,
    height: 10.0,
};

pub fn build_scene() -> anyhow::Result<Scene> {
    let mut scene = Scene::new(CLEAR_COLOUR);

    let default = scene.add_material(Material::white("Default"))?;
    let volume = scene.add_material(Material::new("Volume", [0.8, 0.8, 0.8]).with_alpha(0.25))?;
    let sky_blue = scene.add_material(Material::from_hex("SkyBlue", "#87CEEB")?)?;
    let white = scene.add_material(Material::white("White"))?;
    let red = scene.add_material(Material::red("Red"))?;

    // Room volumes are see-through and let clicks pass to the doors inside them.
    for (name, shape, x) in [
        ("Room1", ROOM, -6.0),
        ("Room2", ROOM, -2.0),
        ("Room3", ROOM, 4.0),
        ("Hall", HALL, 0.0),
        ("Kitchen", ROOM, 0.0),
    ] {
        scene.add(
            Primitive::new(name, shape)
                .at(x, 0.0, 0.0)
                .with_material(volume)
                .not_pickable(),
        )?;
    }

    for (name, position, yaw) in [
        ("Wall1", [-1.0, 1.5, 5.0], FRAC_PI_2),
        ("Wall2", [5.0, 1.5, 5.0], FRAC_PI_2),
        ("Wall3", [0.0, 1.5, 10.0], 0.0),
        ("Wall4", [0.0, 1.5, -5.0], 0.0),
    ] {
        scene.add(
            Primitive::new(name, WALL)
                .at(position[0], position[1], position[2])
                .rotated(0.0, yaw, 0.0)
                .with_material(sky_blue),
        )?;
    }

    for (name, position) in [
        ("Door1", [-4.0, 1.0, 0.0]),
        ("Door2", [2.0, 1.0, 0.0]),
        ("Door3", [0.0, 1.0, 5.0]),
    ] {
        scene.add(
            Primitive::new(name, DOOR)
                .at(position[0], position[1], position[2])
                .with_material(default),
        )?;
    }

    let furniture = [
        ("Bed1", BED, [-6.0, 0.25, 2.5]),
        ("Bed2", BED, [-2.0, 0.25, 2.5]),
        ("Bed3", BED, [4.0, 0.25, 2.5]),
        (
            "Sofa",
            Shape::Box {
                width: 3.0,
                height: 0.5,
                depth: 2.0,
            },
            [0.0, 0.25, 0.0],
        ),
        (
            "KitchenCabinet",
            Shape::Box {
                width: 2.0,
                height: 1.5,
                depth: 1.0,
            },
            [1.0, 0.75, 2.5],
        ),
        (
            "KitchenCounter",
            Shape::Box {
                width: 3.0,
                height: 1.0,
                depth: 1.0,
            },
            [-1.0, 0.5, 2.5],
        ),
    ];
    for (name, shape, position) in furniture {
        scene.add(
            Primitive::new(name, shape)
                .at(position[0], position[1], position[2])
                .with_material(default),
        )?;
    }

    scene.add(
        Primitive::new("Ceiling", WALL)
            .at(0.0, 3.0, 5.0)
            .rotated(-FRAC_PI_2, 0.0, 0.0)
            .with_material(white),
    )?;
    scene.add(
        Primitive::new("Floor", WALL)
            .at(0.0, 0.0, 5.0)
            .with_material(red),
    )?;

    log::info!(
        "floor plan built with {} primitives and {} materials",
        scene.len(),
        scene.materials().len()
    );
    Ok(scene)
}

/// The camera looks at the centre of the hall when the walkthrough starts.
pub fn initial_target(scene: &Scene) -> anyhow::Result<Point3<f32>> {
    let hall = scene.get("Hall").context("the floor plan has no hall")?;
    Ok(Point3::from_vec(hall.center()))
}

pub fn navigator(scene: &Scene) -> anyhow::Result<Navigator> {
    Navigator::bind(scene, &DOORS)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn every_primitive_exists_once() {
        let scene = build_scene().unwrap();
        assert_eq!(scene.len(), 5 + 4 + 3 + 6 + 2);
        let names: HashSet<_> = scene.primitives().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names.len(), scene.len());
        for name in [
            "Room1",
            "Room2",
            "Room3",
            "Hall",
            "Kitchen",
            "Wall1",
            "Wall2",
            "Wall3",
            "Wall4",
            "Door1",
            "Door2",
            "Door3",
            "Bed1",
            "Bed2",
            "Bed3",
            "Sofa",
            "KitchenCabinet",
            "KitchenCounter",
            "Ceiling",
            "Floor",
        ] {
            assert!(scene.get(name).is_some(), "{} is missing", name);
        }
    }

    #[test]
    fn walls_share_the_sky_blue_material() {
        let scene = build_scene().unwrap();
        let sky_blue = scene.material_by_name("SkyBlue");
        assert!(sky_blue.is_some());
        for wall in ["Wall1", "Wall2", "Wall3", "Wall4"] {
            assert_eq!(scene.get(wall).unwrap().material, sky_blue);
        }
        assert_eq!(
            scene.get("Floor").unwrap().material,
            scene.material_by_name("Red")
        );
        assert_eq!(
            scene.get("Ceiling").unwrap().material,
            scene.material_by_name("White")
        );
    }

    #[test]
    fn literal_positions() {
        let scene = build_scene().unwrap();
        let at = |name: &str| scene.position_of(name).unwrap();
        assert_eq!(at("Room1"), [-6.0, 0.0, 0.0].into());
        assert_eq!(at("Room2"), [-2.0, 0.0, 0.0].into());
        assert_eq!(at("Room3"), [4.0, 0.0, 0.0].into());
        assert_eq!(at("Door3"), [0.0, 1.0, 5.0].into());
        assert_eq!(at("KitchenCabinet"), [1.0, 0.75, 2.5].into());
        assert_eq!(scene.get("Wall2").unwrap().rotation.y, FRAC_PI_2);
        assert_eq!(scene.get("Ceiling").unwrap().rotation.x, -FRAC_PI_2);
    }

    #[test]
    fn only_doors_and_furniture_and_surfaces_are_pickable() {
        let scene = build_scene().unwrap();
        for room in ["Room1", "Room2", "Room3", "Hall", "Kitchen"] {
            assert_eq!(scene.get(room).unwrap().pick_id(), 0);
        }
        let ids: HashSet<u32> = scene
            .primitives()
            .iter()
            .map(|p| p.pick_id())
            .filter(|&id| id != 0)
            .collect();
        assert_eq!(ids.len(), scene.len() - 5);
    }

    #[test]
    fn three_doors_lead_to_three_rooms() {
        let scene = build_scene().unwrap();
        let navigator = navigator(&scene).unwrap();
        for (door, room) in DOORS {
            let id = scene.get(door).unwrap().pick_id();
            assert_eq!(navigator.resolve(id).unwrap().room, room);
        }
        let door1 = scene.get("Door1").unwrap().pick_id();
        assert_eq!(
            navigator.resolve(door1).unwrap().destination,
            Point3::new(-6.0, 0.0, 0.0)
        );
        assert_eq!(initial_target(&scene).unwrap(), Point3::new(0.0, 0.0, 0.0));
    }
}
