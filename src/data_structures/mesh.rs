//! Unit meshes and their GPU buffers.
//!
//! The walkthrough only needs two meshes: a unit box and a unit plane, both
//! centred on the origin. Primitives scale them to size per instance.

use cgmath::{InnerSpace, Vector3};
use wgpu::util::DeviceExt;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex for MeshVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// CPU side geometry: vertices plus a triangle list.
#[derive(Clone, Debug, Default)]
pub struct Geometry {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u16>,
}

impl Geometry {
    /**
     * Appends a unit quad with normal `n`, spanned by `u` and `v` where `u x v = n`.
     * The quad sits at `offset * n` and is wound counter clockwise seen from `n`.
     */
    fn push_quad(&mut self, n: Vector3<f32>, u: Vector3<f32>, v: Vector3<f32>, offset: f32) {
        debug_assert!((u.cross(v) - n).magnitude() < 1e-6);
        let base = self.vertices.len() as u16;
        for (a, b) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = n * offset + (u * a + v * b) * 0.5;
            self.vertices.push(MeshVertex {
                position: p.into(),
                normal: n.into(),
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    pub fn unit_box() -> Self {
        let x = Vector3::unit_x();
        let y = Vector3::unit_y();
        let z = Vector3::unit_z();
        let mut geometry = Self::default();
        for (n, u, v) in [
            (x, y, z),
            (-x, z, y),
            (y, z, x),
            (-y, x, z),
            (z, x, y),
            (-z, y, x),
        ] {
            geometry.push_quad(n, u, v, 0.5);
        }
        geometry
    }

    /// A unit square in the xy-plane. Both sides are emitted so it stays visible
    /// with back-face culling from either direction; the front faces -z.
    pub fn unit_plane() -> Self {
        let x = Vector3::unit_x();
        let y = Vector3::unit_y();
        let z = Vector3::unit_z();
        let mut geometry = Self::default();
        geometry.push_quad(-z, y, x, 0.0);
        geometry.push_quad(z, x, y, 0.0);
        geometry
    }
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

impl Mesh {
    pub fn upload(device: &wgpu::Device, name: &str, geometry: &Geometry) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        // u16 index buffers must be 4 byte aligned when written, pad with a degenerate index
        let mut indices = geometry.indices.clone();
        if indices.len() % 2 == 1 {
            indices.push(0);
        }
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", name)),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: geometry.indices.len() as u32,
        }
    }
}

pub trait DrawMesh<'a> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'a Mesh,
        instances: std::ops::Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
}

impl<'a, 'b> DrawMesh<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'b Mesh,
        instances: std::ops::Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        self.set_bind_group(0, camera_bind_group, &[]);
        self.set_bind_group(1, light_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_normals_match(geometry: &Geometry) {
        for tri in geometry.indices.chunks(3) {
            let p: Vec<Vector3<f32>> = tri
                .iter()
                .map(|&i| geometry.vertices[i as usize].position.into())
                .collect();
            let face = (p[1] - p[0]).cross(p[2] - p[0]).normalize();
            let n: Vector3<f32> = geometry.vertices[tri[0] as usize].normal.into();
            assert!((face - n).magnitude() < 1e-5, "{:?} vs {:?}", face, n);
        }
    }

    #[test]
    fn unit_box_is_closed_and_outward_facing() {
        let geometry = Geometry::unit_box();
        assert_eq!(geometry.vertices.len(), 24);
        assert_eq!(geometry.indices.len(), 36);
        for v in &geometry.vertices {
            assert!(v.position.iter().all(|c| c.abs() == 0.5));
            let n: Vector3<f32> = v.normal.into();
            let p: Vector3<f32> = v.position.into();
            assert!(p.dot(n) > 0.0);
        }
        triangle_normals_match(&geometry);
    }

    #[test]
    fn unit_plane_is_two_sided() {
        let geometry = Geometry::unit_plane();
        assert_eq!(geometry.indices.len(), 12);
        assert!(geometry.vertices.iter().all(|v| v.position[2] == 0.0));
        assert_eq!(geometry.vertices[0].normal, [0.0, 0.0, -1.0]);
        assert_eq!(geometry.vertices[4].normal, [0.0, 0.0, 1.0]);
        triangle_normals_match(&geometry);
    }
}
