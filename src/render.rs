//! Render composition and pipeline batching.
//!
//! Flows describe what they want drawn each frame with a [`Render`]. The engine
//! walks the render tree, sorts the instanced draws into the opaque and the
//! transparent pass, and uses the same tree to render pick ids.
//!
//! # Key types
//!
//! - [`Render<'a>`] is the enum describing render operations
//! - [`Instanced<'a>`] contains data for instanced rendering (mesh + instance buffer)

use std::collections::{HashMap, HashSet};

use crate::data_structures::mesh::Mesh;

/// Data for instanced rendering: a mesh, its instance buffer and the pick ids it contains.
#[derive(Clone)]
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub mesh: &'a Mesh,
    pub amount: usize,
    pub ids: &'a [u32],
}

/// Specifies how a flow's objects should be rendered.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders a single opaque instanced object
/// - `Defaults(Vec<Instanced>)` renders a batch of opaque instanced objects
/// - `Transparent(Instanced)` renders a single transparent instanced object
/// - `Transparents(Vec<Instanced>)` renders a batch of transparent objects
/// - `Composed(Vec<Render>)` recursively renders composition of multiple renders
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Defaults(Vec<Instanced<'a>>),
    Transparent(Instanced<'a>),
    Transparents(Vec<Instanced<'a>>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    /// Map pick ids to the indices of the flows that own them.
    ///
    /// Walks the render tree and records `flow_id` for every id of every
    /// instanced draw. Id 0 is never recorded, it marks unpickable instances.
    pub(crate) fn map_ids(&self, flow_id: usize, map: &mut HashMap<u32, HashSet<usize>>) {
        match self {
            Render::Default(instanced) | Render::Transparent(instanced) => {
                insert_ids(instanced, flow_id, map)
            }
            Render::Defaults(vec) | Render::Transparents(vec) => vec
                .iter()
                .for_each(|instanced| insert_ids(instanced, flow_id, map)),
            Render::Composed(renders) => renders
                .iter()
                .for_each(|render| render.map_ids(flow_id, map)),
            Render::None => (),
        }
    }

    pub(crate) fn set_pipelines(self, basics: &mut Vec<Instanced<'a>>, trans: &mut Vec<Instanced<'a>>) {
        match self {
            Render::Default(instanced) => basics.push(instanced),
            Render::Defaults(mut vec) => basics.append(&mut vec),
            Render::Transparent(instanced) => trans.push(instanced),
            Render::Transparents(mut vec) => trans.append(&mut vec),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(basics, trans)),
            Render::None => (),
        }
    }

    /// Everything is picked with the same pipeline, transparency doesn't matter.
    pub(crate) fn set_pick_pipelines(self, basics: &mut Vec<Instanced<'a>>) {
        match self {
            Render::Default(instanced) | Render::Transparent(instanced) => basics.push(instanced),
            Render::Defaults(mut vec) | Render::Transparents(mut vec) => basics.append(&mut vec),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pick_pipelines(basics)),
            Render::None => (),
        }
    }
}

fn insert_ids(instanced: &Instanced<'_>, flow_id: usize, map: &mut HashMap<u32, HashSet<usize>>) {
    instanced.ids.iter().filter(|&&id| id != 0).for_each(|&id| {
        map.entry(id).or_default().insert(flow_id);
    });
}
