//! # Primitive Shape Generation
//!
//! All shapes are centered at the origin with outward normals and UVs in
//! `[0, 1]`.

use std::f32::consts::{PI, TAU};

use cgmath::{InnerSpace, Vector3};

use super::GeometryData;

/// Cube spanning -0.5..0.5 on every axis, four vertices per face.
pub fn generate_cube() -> GeometryData {
    let mut data = GeometryData::new();

    // (normal, u axis, v axis) with u x v = normal
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    for (normal, u, v) in faces {
        let n = Vector3::from(normal) * 0.5;
        let u = Vector3::from(u) * 0.5;
        let v = Vector3::from(v) * 0.5;

        let corners = [
            (n - u - v, [0.0, 0.0]),
            (n + u - v, [1.0, 0.0]),
            (n + u + v, [1.0, 1.0]),
            (n - u + v, [0.0, 1.0]),
        ];
        let base = data.vertex_count() as u32;
        for (position, uv) in corners {
            data.push_vertex(position.into(), normal, uv);
        }
        data.push_triangle(base, base + 1, base + 2);
        data.push_triangle(base, base + 2, base + 3);
    }

    data
}

/// UV sphere of radius 0.5.
pub fn generate_sphere(longitude_segments: u32, latitude_segments: u32) -> GeometryData {
    let mut data = GeometryData::new();

    let long_segs = longitude_segments.max(3);
    let lat_segs = latitude_segments.max(2);

    for lat in 0..=lat_segs {
        let theta = lat as f32 * PI / lat_segs as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for long in 0..=long_segs {
            let phi = long as f32 * TAU / long_segs as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let normal = [sin_theta * cos_phi, cos_theta, sin_theta * sin_phi];
            let position = [normal[0] * 0.5, normal[1] * 0.5, normal[2] * 0.5];
            let uv = [
                long as f32 / long_segs as f32,
                1.0 - lat as f32 / lat_segs as f32,
            ];
            data.push_vertex(position, normal, uv);
        }
    }

    for lat in 0..lat_segs {
        for long in 0..long_segs {
            let first = lat * (long_segs + 1) + long;
            let second = first + long_segs + 1;

            data.push_triangle(first, first + 1, second);
            data.push_triangle(second, first + 1, second + 1);
        }
    }

    data
}

/// Flat plane in the XZ plane facing +Y.
pub fn generate_plane(width: f32, depth: f32, width_segments: u32, depth_segments: u32) -> GeometryData {
    let mut data = GeometryData::new();

    let w_segs = width_segments.max(1);
    let d_segs = depth_segments.max(1);

    for row in 0..=d_segs {
        let v = row as f32 / d_segs as f32;
        for column in 0..=w_segs {
            let u = column as f32 / w_segs as f32;
            data.push_vertex(
                [(u - 0.5) * width, 0.0, (v - 0.5) * depth],
                [0.0, 1.0, 0.0],
                [u, v],
            );
        }
    }

    for row in 0..d_segs {
        for column in 0..w_segs {
            let a = row * (w_segs + 1) + column;
            let b = a + 1;
            let d = a + w_segs + 1;
            let c = d + 1;

            data.push_triangle(a, c, b);
            data.push_triangle(a, d, c);
        }
    }

    data
}

/// Two-unit quad in the XZ plane facing +Y.
pub fn generate_quad() -> GeometryData {
    generate_plane(2.0, 2.0, 1, 1)
}

/// Quad visible from both sides: the +Y face plus a mirrored -Y face.
pub fn generate_double_sided_quad() -> GeometryData {
    let mut data = generate_quad();

    let mut back = generate_quad();
    for normal in &mut back.normals {
        normal[1] = -normal[1];
    }
    for triangle in back.indices.chunks_exact_mut(3) {
        triangle.swap(1, 2);
    }
    data.append(back);

    data
}

/// Capped cylinder along Y from `-height / 2` to `height / 2`.
pub fn generate_cylinder(radius: f32, height: f32, segments: u32) -> GeometryData {
    let mut data = GeometryData::new();

    let segs = segments.max(3);
    let half_height = height * 0.5;

    // sides: bottom/top vertex pairs, the seam duplicated for UVs
    for i in 0..=segs {
        let u = i as f32 / segs as f32;
        let (sin_a, cos_a) = (u * TAU).sin_cos();
        let normal = [cos_a, 0.0, sin_a];

        data.push_vertex([radius * cos_a, -half_height, radius * sin_a], normal, [u, 0.0]);
        data.push_vertex([radius * cos_a, half_height, radius * sin_a], normal, [u, 1.0]);
    }
    for i in 0..segs {
        let bottom = i * 2;
        let top = bottom + 1;
        let bottom_next = bottom + 2;
        let top_next = bottom + 3;

        data.push_triangle(bottom, top, bottom_next);
        data.push_triangle(top, top_next, bottom_next);
    }

    // caps get their own vertices so their normals stay flat
    for (y, normal) in [(half_height, [0.0, 1.0, 0.0]), (-half_height, [0.0, -1.0, 0.0])] {
        let center = data.push_vertex([0.0, y, 0.0], normal, [0.5, 0.5]);
        let ring = data.vertex_count() as u32;
        for i in 0..=segs {
            let (sin_a, cos_a) = (i as f32 / segs as f32 * TAU).sin_cos();
            data.push_vertex(
                [radius * cos_a, y, radius * sin_a],
                normal,
                [0.5 + 0.5 * cos_a, 0.5 + 0.5 * sin_a],
            );
        }
        for i in 0..segs {
            if y > 0.0 {
                data.push_triangle(center, ring + i + 1, ring + i);
            } else {
                data.push_triangle(center, ring + i, ring + i + 1);
            }
        }
    }

    data
}

/// Torus around the Y axis.
pub fn generate_torus(
    major_radius: f32,
    minor_radius: f32,
    ring_segments: u32,
    tube_segments: u32,
) -> GeometryData {
    let mut data = GeometryData::new();

    let rings = ring_segments.max(3);
    let tubes = tube_segments.max(3);

    for i in 0..=rings {
        let u = i as f32 / rings as f32;
        let (sin_t, cos_t) = (u * TAU).sin_cos();

        for j in 0..=tubes {
            let v = j as f32 / tubes as f32;
            let (sin_p, cos_p) = (v * TAU).sin_cos();

            let normal = [cos_p * cos_t, sin_p, cos_p * sin_t];
            let position = [
                major_radius * cos_t + minor_radius * normal[0],
                minor_radius * normal[1],
                major_radius * sin_t + minor_radius * normal[2],
            ];
            data.push_vertex(position, normal, [u, v]);
        }
    }

    sweep_indices(&mut data, rings, tubes);
    data
}

/// Tube swept along a helix rising along Y, centered at the origin.
pub fn generate_helix(
    radius: f32,
    tube_radius: f32,
    turns: f32,
    height: f32,
    segments: u32,
    tube_segments: u32,
) -> GeometryData {
    let mut data = GeometryData::new();

    let segs = segments.max(3);
    let tubes = tube_segments.max(3);
    let sweep = turns * TAU;
    let rise = if sweep != 0.0 { height / sweep } else { 0.0 };

    for i in 0..=segs {
        let u = i as f32 / segs as f32;
        let t = u * sweep;
        let (sin_t, cos_t) = t.sin_cos();

        let center = Vector3::new(radius * cos_t, rise * t - height * 0.5, radius * sin_t);
        let tangent = Vector3::new(-radius * sin_t, rise, radius * cos_t).normalize();
        let outward = Vector3::new(cos_t, 0.0, sin_t);
        let binormal = tangent.cross(outward);

        for j in 0..=tubes {
            let v = j as f32 / tubes as f32;
            let (sin_p, cos_p) = (v * TAU).sin_cos();
            let normal = outward * cos_p + binormal * sin_p;
            let position = center + normal * tube_radius;
            data.push_vertex(position.into(), normal.into(), [u, v]);
        }
    }

    sweep_indices(&mut data, segs, tubes);
    data
}

/// Quads between consecutive rings of a swept tube.
fn sweep_indices(data: &mut GeometryData, rings: u32, tubes: u32) {
    let stride = tubes + 1;
    for i in 0..rings {
        for j in 0..tubes {
            let a = i * stride + j;
            let b = a + stride;
            let c = b + 1;
            let d = a + 1;

            data.push_triangle(a, d, b);
            data.push_triangle(b, d, c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every non-degenerate triangle's geometric normal agrees with its
    /// vertex normals.
    fn assert_faces_outward(data: &GeometryData) {
        for triangle in data.indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]]
                .map(|i| Vector3::from(data.positions[i as usize]));
            let face = (b - a).cross(c - a);
            if face.magnitude() < 1e-6 {
                continue;
            }
            let normal = Vector3::from(data.normals[triangle[0] as usize]);
            assert!(face.dot(normal) > 0.0, "triangle {triangle:?} faces inward");
        }
    }

    fn all_shapes() -> Vec<GeometryData> {
        vec![
            generate_cube(),
            generate_sphere(12, 8),
            generate_plane(4.0, 2.0, 3, 2),
            generate_quad(),
            generate_double_sided_quad(),
            generate_cylinder(0.5, 1.0, 10),
            generate_torus(1.0, 0.25, 12, 8),
            generate_helix(0.5, 0.1, 2.0, 2.0, 24, 6),
        ]
    }

    #[test]
    fn test_cube_generation() {
        let cube = generate_cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.triangle_count(), 12);
    }

    #[test]
    fn test_plane_generation() {
        let plane = generate_plane(2.0, 2.0, 2, 2);
        assert_eq!(plane.vertex_count(), 9);
        assert_eq!(plane.indices.len(), 24);
    }

    #[test]
    fn test_attribute_streams_line_up() {
        for shape in all_shapes() {
            assert_eq!(shape.positions.len(), shape.normals.len());
            assert_eq!(shape.positions.len(), shape.tex_coords.len());
            assert!(shape.indices.iter().all(|&i| (i as usize) < shape.vertex_count()));
        }
    }

    #[test]
    fn test_right_handed_faces_point_outward() {
        for shape in all_shapes() {
            assert_faces_outward(&shape);
        }
    }

    #[test]
    fn test_converted_faces_still_point_outward() {
        for shape in all_shapes() {
            assert_faces_outward(&shape.into_left_handed());
        }
    }
}
