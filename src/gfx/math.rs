//! Left-handed matrix helpers
//!
//! The renderer works in a left-handed, Y-up world (+Z into the screen) with
//! clip-space depth in `0..1`, which is what wgpu expects, so no extra
//! correction matrix is needed. cgmath only ships right-handed builders, so
//! the handful of left-handed ones live here. All matrices are column-major
//! and multiply column vectors (`clip = projection * view * world * p`).

use cgmath::{InnerSpace, Matrix4, Quaternion, Rad, Rotation3, Vector3};

/// World up axis used by cameras and the shadow caster.
pub const WORLD_UP: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);

/// Builds a left-handed view matrix looking from `eye` along `direction`.
///
/// When `direction` is parallel to `up` the basis falls back to world +Z as
/// the up hint so the matrix stays finite.
pub fn look_to_lh(eye: Vector3<f32>, direction: Vector3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    let z_axis = direction.normalize();
    let mut side = up.cross(z_axis);
    if side.magnitude2() < 1e-12 {
        side = Vector3::unit_z().cross(z_axis);
    }
    let x_axis = side.normalize();
    let y_axis = z_axis.cross(x_axis);

    Matrix4::new(
        x_axis.x,
        y_axis.x,
        z_axis.x,
        0.0,
        x_axis.y,
        y_axis.y,
        z_axis.y,
        0.0,
        x_axis.z,
        y_axis.z,
        z_axis.z,
        0.0,
        -x_axis.dot(eye),
        -y_axis.dot(eye),
        -z_axis.dot(eye),
        1.0,
    )
}

/// Builds a left-handed view matrix looking from `eye` towards `target`.
pub fn look_at_lh(eye: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    look_to_lh(eye, target - eye, up)
}

/// Left-handed perspective projection with depth mapped to `0..1`.
pub fn perspective_lh(fov_y: f32, aspect_ratio: f32, near: f32, far: f32) -> Matrix4<f32> {
    let height = 1.0 / (fov_y * 0.5).tan();
    let width = height / aspect_ratio;
    let range = far / (far - near);

    Matrix4::new(
        width,
        0.0,
        0.0,
        0.0,
        0.0,
        height,
        0.0,
        0.0,
        0.0,
        0.0,
        range,
        1.0,
        0.0,
        0.0,
        -range * near,
        0.0,
    )
}

/// Left-handed orthographic projection of a `width` x `height` volume
/// centred on the view axis, depth mapped to `0..1`.
pub fn orthographic_lh(width: f32, height: f32, near: f32, far: f32) -> Matrix4<f32> {
    let range = 1.0 / (far - near);

    Matrix4::new(
        2.0 / width,
        0.0,
        0.0,
        0.0,
        0.0,
        2.0 / height,
        0.0,
        0.0,
        0.0,
        0.0,
        range,
        0.0,
        0.0,
        0.0,
        -range * near,
        1.0,
    )
}

/// Orientation quaternion for a pitch (X), yaw (Y), roll (Z) triple.
///
/// Roll is applied first, then pitch, then yaw.
pub fn quaternion_from_pitch_yaw_roll(pitch_yaw_roll: Vector3<f32>) -> Quaternion<f32> {
    Quaternion::from_angle_y(Rad(pitch_yaw_roll.y))
        * Quaternion::from_angle_x(Rad(pitch_yaw_roll.x))
        * Quaternion::from_angle_z(Rad(pitch_yaw_roll.z))
}

/// Converts a cgmath matrix into the column arrays uploaded to the GPU.
pub fn matrix_to_array(matrix: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cgmath::{Rotation, Vector4};

    fn transform(m: Matrix4<f32>, p: [f32; 3]) -> Vector4<f32> {
        m * Vector4::new(p[0], p[1], p[2], 1.0)
    }

    #[test]
    fn test_look_to_puts_target_on_positive_z() {
        let view = look_to_lh(Vector3::new(0.0, 0.0, -5.0), Vector3::unit_z(), WORLD_UP);
        let p = transform(view, [0.0, 0.0, 0.0]);
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.z, 5.0, epsilon = 1e-6);

        // +X stays on the right in a left-handed view
        let right = transform(view, [1.0, 0.0, 0.0]);
        assert_abs_diff_eq!(right.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_look_to_straight_down_stays_finite() {
        let view = look_to_lh(Vector3::new(0.0, 5.0, 0.0), -WORLD_UP, WORLD_UP);
        for column in 0..4 {
            for row in 0..4 {
                assert!(view[column][row].is_finite());
            }
        }
    }

    #[test]
    fn test_perspective_maps_clip_planes_to_unit_depth() {
        let projection = perspective_lh(std::f32::consts::FRAC_PI_2, 1.0, 0.5, 50.0);

        let near = transform(projection, [0.0, 0.0, 0.5]);
        assert_abs_diff_eq!(near.z / near.w, 0.0, epsilon = 1e-6);

        let far = transform(projection, [0.0, 0.0, 50.0]);
        assert_abs_diff_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_orthographic_maps_extent_to_ndc() {
        let projection = orthographic_lh(28.0, 28.0, 1.0, 100.0);

        let corner = transform(projection, [14.0, -14.0, 100.0]);
        assert_abs_diff_eq!(corner.x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(corner.y, -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(corner.z, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(corner.w, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_yaw_turns_forward_towards_positive_x() {
        let rotation = quaternion_from_pitch_yaw_roll(Vector3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));
        let forward = rotation.rotate_vector(Vector3::unit_z());
        assert_abs_diff_eq!(forward.x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(forward.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_positive_pitch_tilts_forward_down() {
        let rotation = quaternion_from_pitch_yaw_roll(Vector3::new(0.3, 0.0, 0.0));
        let forward = rotation.rotate_vector(Vector3::unit_z());
        assert!(forward.y < 0.0);
    }
}
