//! # Procedural Geometry Generation
//!
//! Stand-ins for the demo's model files: cube, sphere, cylinder, helix,
//! torus, quad and double-sided quad, generated in code so the scene still
//! renders when `assets/models` is missing.
//!
//! Everything here is authored the way model files are: right-handed, Y up,
//! counter-clockwise front faces, `v` growing upward. [`GeometryData::into_left_handed`]
//! converts to the renderer's convention, the same conversion the OBJ loader
//! applies.
//!
//! ```
//! use vantage::gfx::geometry::{generate_sphere, generate_torus};
//!
//! let sphere = generate_sphere(32, 16);
//! let torus = generate_torus(1.0, 0.35, 32, 16);
//! assert!(sphere.triangle_count() > 0 && torus.triangle_count() > 0);
//! ```

pub mod primitives;

pub use primitives::*;

/// Geometry in separate attribute streams, ready to become a mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryData {
    pub positions: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
    /// Triangle list indices.
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn push_vertex(&mut self, position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        self.tex_coords.push(uv);
        index
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Appends another piece of geometry, offsetting its indices.
    pub fn append(&mut self, other: GeometryData) {
        let base = self.positions.len() as u32;
        self.positions.extend(other.positions);
        self.normals.extend(other.normals);
        self.tex_coords.extend(other.tex_coords);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
    }

    /// Converts right-handed data to the left-handed renderer convention:
    /// negates Z of positions and normals, flips `v` and reverses winding.
    pub fn into_left_handed(mut self) -> Self {
        for position in &mut self.positions {
            position[2] = -position[2];
        }
        for normal in &mut self.normals {
            normal[2] = -normal[2];
        }
        for uv in &mut self.tex_coords {
            uv[1] = 1.0 - uv[1];
        }
        for triangle in self.indices.chunks_exact_mut(3) {
            triangle.swap(1, 2);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_handed_conversion() {
        let mut data = GeometryData::new();
        let a = data.push_vertex([0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.25, 0.0]);
        let b = data.push_vertex([1.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.5, 1.0]);
        let c = data.push_vertex([0.0, 1.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.25]);
        data.push_triangle(a, b, c);

        let converted = data.into_left_handed();
        assert_eq!(converted.positions[0], [0.0, 0.0, -1.0]);
        assert_eq!(converted.normals[1], [0.0, 0.0, -1.0]);
        assert_eq!(converted.tex_coords[1], [0.5, 0.0]);
        assert_eq!(converted.tex_coords[2], [0.0, 0.75]);
        assert_eq!(converted.indices, vec![0, 2, 1]);
    }

    #[test]
    fn test_append_offsets_indices() {
        let mut first = generate_quad();
        let count = first.vertex_count() as u32;
        first.append(generate_quad());
        assert_eq!(first.indices[6], count);
        assert_eq!(first.triangle_count(), 4);
    }
}
