//! Triangle meshes
//!
//! A [`Mesh`] holds CPU-side vertices and indices in the renderer's
//! left-handed convention. The render engine uploads each one once into a
//! [`GpuMesh`]; scene code refers to meshes by [`MeshId`] and draws them
//! through the rendering context.

use std::{io::BufRead, ops::Range, path::Path};

use cgmath::{InnerSpace, Vector2, Vector3, Zero};
use log::debug;
use thiserror::Error;
use wgpu::util::DeviceExt;

use super::vertex::Vertex3D;
use crate::gfx::{geometry::GeometryData, rendering::context::RenderContext};

/// Index of a mesh in the scene's mesh list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("failed to load mesh {path}")]
    Load {
        path: String,
        #[source]
        source: tobj::LoadError,
    },
    #[error("mesh '{name}' has no triangles")]
    Empty { name: String },
}

#[derive(Debug, Clone)]
pub struct Mesh {
    name: String,
    vertices: Vec<Vertex3D>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Builds a mesh from left-handed vertex data and computes tangents.
    pub fn new(name: &str, mut vertices: Vec<Vertex3D>, indices: Vec<u32>) -> Self {
        calculate_tangents(&mut vertices, &indices);
        Self {
            name: name.to_string(),
            vertices,
            indices,
        }
    }

    /// Builds a mesh from right-handed geometry, converting it first.
    pub fn from_geometry(name: &str, geometry: GeometryData) -> Self {
        let geometry = geometry.into_left_handed();
        let vertices = geometry
            .positions
            .iter()
            .enumerate()
            .map(|(i, &position)| {
                Vertex3D::new(
                    position,
                    geometry.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                    geometry.tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
                )
            })
            .collect();
        Self::new(name, vertices, geometry.indices)
    }

    /// Loads every model in an OBJ file into one mesh.
    pub fn from_obj_file(name: &str, path: impl AsRef<Path>) -> Result<Self, MeshError> {
        let path = path.as_ref();
        let (models, _materials) =
            tobj::load_obj(path, &obj_load_options()).map_err(|source| MeshError::Load {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_models(name, models)
    }

    /// Parses OBJ text from any reader. Material libraries are ignored.
    pub fn from_obj_reader(name: &str, reader: &mut impl BufRead) -> Result<Self, MeshError> {
        let (models, _materials) =
            tobj::load_obj_buf(reader, &obj_load_options(), |_| {
                Err(tobj::LoadError::OpenFileFailed)
            })
            .map_err(|source| MeshError::Load {
                path: name.to_string(),
                source,
            })?;
        Self::from_models(name, models)
    }

    fn from_models(name: &str, models: Vec<tobj::Model>) -> Result<Self, MeshError> {
        let mut geometry = GeometryData::new();

        for model in models {
            let mesh = model.mesh;
            let vertex_count = mesh.positions.len() / 3;

            let normals = if mesh.normals.len() == mesh.positions.len() {
                mesh.normals
            } else {
                debug!("'{}' has no normals, generating face normals", model.name);
                calculate_face_normals(&mesh.positions, &mesh.indices)
            };

            let mut part = GeometryData::new();
            for i in 0..vertex_count {
                let uv = if mesh.texcoords.len() >= (i + 1) * 2 {
                    [mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1]]
                } else {
                    [0.0, 0.0]
                };
                part.push_vertex(
                    [
                        mesh.positions[i * 3],
                        mesh.positions[i * 3 + 1],
                        mesh.positions[i * 3 + 2],
                    ],
                    [normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]],
                    uv,
                );
            }
            part.indices = mesh.indices;
            geometry.append(part);
        }

        if geometry.indices.is_empty() {
            return Err(MeshError::Empty {
                name: name.to_string(),
            });
        }
        Ok(Self::from_geometry(name, geometry))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Vertex3D] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Issues an indexed draw of every index in the mesh.
    pub fn draw(&self, ctx: &mut dyn RenderContext, id: MeshId) {
        ctx.draw_indexed(id, self.index_count());
    }
}

fn obj_load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

/// Smooth per-vertex normals averaged from the faces around each vertex.
pub fn calculate_face_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let position = |i: u32| {
        let i = i as usize * 3;
        Vector3::new(positions[i], positions[i + 1], positions[i + 2])
    };

    let mut sums = vec![Vector3::zero(); vertex_count];
    for triangle in indices.chunks_exact(3) {
        let (a, b, c) = (triangle[0], triangle[1], triangle[2]);
        if [a, b, c].iter().any(|&i| i as usize >= vertex_count) {
            continue;
        }
        let face = (position(b) - position(a)).cross(position(c) - position(a));
        for index in [a, b, c] {
            sums[index as usize] += face;
        }
    }

    sums.into_iter()
        .flat_map(|sum: Vector3<f32>| {
            let normal = if sum.magnitude2() > 0.0 {
                sum.normalize()
            } else {
                Vector3::unit_y()
            };
            [normal.x, normal.y, normal.z]
        })
        .collect()
}

/// Per-vertex tangents along increasing `u`, orthogonalized against the normal.
fn calculate_tangents(vertices: &mut [Vertex3D], indices: &[u32]) {
    let mut sums = vec![Vector3::<f32>::zero(); vertices.len()];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
            continue;
        }

        let p0 = Vector3::from(vertices[a].position);
        let edge1 = Vector3::from(vertices[b].position) - p0;
        let edge2 = Vector3::from(vertices[c].position) - p0;

        let uv0 = Vector2::from(vertices[a].uv);
        let duv1 = Vector2::from(vertices[b].uv) - uv0;
        let duv2 = Vector2::from(vertices[c].uv) - uv0;

        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let tangent = (edge1 * duv2.y - edge2 * duv1.y) / det;
        for index in [a, b, c] {
            sums[index] += tangent;
        }
    }

    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        let normal = Vector3::from(vertex.normal);
        let mut tangent = sum - normal * normal.dot(sum);
        if tangent.magnitude2() < 1e-12 {
            // no usable UVs: any direction perpendicular to the normal
            let axis = if normal.x.abs() < 0.9 {
                Vector3::unit_x()
            } else {
                Vector3::unit_y()
            };
            tangent = axis - normal * normal.dot(axis);
        }
        if tangent.magnitude2() > 0.0 {
            vertex.tangent = tangent.normalize().into();
        }
    }
}

/// GPU-resident copy of a [`Mesh`]. Buffers are written once and never change.
pub struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    pub fn new(device: &wgpu::Device, mesh: &Mesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", mesh.name())),
            contents: bytemuck::cast_slice(mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", mesh.name())),
            contents: bytemuck::cast_slice(mesh.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
        }
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

pub trait DrawMesh<'a> {
    fn draw_mesh(&mut self, mesh: &'a GpuMesh, indices: Range<u32>);
}

impl<'a, 'b> DrawMesh<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(&mut self, mesh: &'b GpuMesh, indices: Range<u32>) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(indices, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{
        geometry::generate_cube,
        rendering::context::{CommandRecorder, RenderCommand},
    };
    use approx::assert_abs_diff_eq;
    use std::io::Cursor;

    const QUAD_OBJ: &str = "\
o Quad
v -1.0 0.0 1.0
v 1.0 0.0 1.0
v 1.0 0.0 -1.0
v -1.0 0.0 -1.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
f 1/1 2/2 3/3 4/4
";

    fn quad() -> Mesh {
        Mesh::from_obj_reader("Quad", &mut Cursor::new(QUAD_OBJ)).unwrap()
    }

    #[test]
    fn test_obj_quad_is_triangulated() {
        let mesh = quad();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.index_count(), 6);
    }

    #[test]
    fn test_obj_is_converted_to_left_handed() {
        let mesh = quad();
        let first = mesh.vertices()[0];
        assert_eq!(first.position, [-1.0, 0.0, -1.0]);
        assert_eq!(first.uv, [0.0, 1.0]);

        // generated normals face up and the reversed winding agrees with them
        for triangle in mesh.indices().chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]]
                .map(|i| Vector3::from(mesh.vertices()[i as usize].position));
            let face = (b - a).cross(c - a);
            assert!(face.y > 0.0);
        }
        assert_abs_diff_eq!(first.normal[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_tangents_follow_u() {
        let mesh = quad();
        for vertex in mesh.vertices() {
            assert_abs_diff_eq!(vertex.tangent[0], 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(vertex.tangent[1], 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(vertex.tangent[2], 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_tangents_are_perpendicular_to_normals() {
        let mesh = Mesh::from_geometry("Cube", generate_cube());
        for vertex in mesh.vertices() {
            let dot = Vector3::from(vertex.normal).dot(Vector3::from(vertex.tangent));
            assert_abs_diff_eq!(dot, 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_missing_file_is_a_load_error() {
        let result = Mesh::from_obj_file("Missing", "does/not/exist.obj");
        assert!(matches!(result, Err(MeshError::Load { .. })));
    }

    #[test]
    fn test_obj_without_faces_is_empty() {
        let result = Mesh::from_obj_reader("Points", &mut Cursor::new("v 0 0 0\nv 1 0 0\n"));
        assert!(matches!(result, Err(MeshError::Empty { .. })));
    }

    #[test]
    fn test_draw_uses_stored_index_count() {
        let mesh = Mesh::from_geometry("Cube", generate_cube());
        let mut recorder = CommandRecorder::new();
        mesh.draw(&mut recorder, MeshId(3));
        assert_eq!(
            recorder.commands(),
            &[RenderCommand::DrawIndexed {
                mesh: MeshId(3),
                index_count: 36,
            }]
        );
    }

    #[test]
    fn test_face_normals_skip_out_of_range_triangles() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let normals = calculate_face_normals(&positions, &[0, 2, 1, 0, 1, 7]);

        assert_eq!(normals.len(), 9);
        for vertex in normals.chunks_exact(3) {
            assert_abs_diff_eq!(vertex[1], 1.0, epsilon = 1e-6);
        }
    }
}
