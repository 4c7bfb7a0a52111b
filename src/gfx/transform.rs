//! Position / orientation / scale node with cached derived data
//!
//! A [`Transform`] is owned by exactly one camera or entity. The world
//! matrix pair and the local basis vectors are derived lazily and cached
//! independently: changing position or scale only invalidates the matrices,
//! changing the orientation invalidates both.

use cgmath::{Matrix, Matrix4, Quaternion, Rotation, SquareMatrix, Vector3};

use super::{cached::Cached, math::quaternion_from_pitch_yaw_roll};

/// World matrix together with its inverse transpose (for normals).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldMatrices {
    pub world: Matrix4<f32>,
    pub world_inverse_transpose: Matrix4<f32>,
}

/// Local basis rotated into world space.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Basis {
    right: Vector3<f32>,
    up: Vector3<f32>,
    forward: Vector3<f32>,
}

#[derive(Debug, Clone)]
pub struct Transform {
    position: Vector3<f32>,
    /// Euler angles in radians: x = pitch, y = yaw, z = roll.
    pitch_yaw_roll: Vector3<f32>,
    scale: Vector3<f32>,

    matrices: Cached<WorldMatrices>,
    directions: Cached<Basis>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            pitch_yaw_roll: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            matrices: Cached::empty(),
            directions: Cached::empty(),
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transform placed at `position` with identity rotation and unit scale.
    pub fn from_position(position: impl Into<Vector3<f32>>) -> Self {
        let mut transform = Self::default();
        transform.set_position(position);
        transform
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn pitch_yaw_roll(&self) -> Vector3<f32> {
        self.pitch_yaw_roll
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    pub fn set_position(&mut self, position: impl Into<Vector3<f32>>) {
        self.position = position.into();
        self.matrices.invalidate();
    }

    pub fn set_rotation(&mut self, pitch_yaw_roll: impl Into<Vector3<f32>>) {
        self.pitch_yaw_roll = pitch_yaw_roll.into();
        self.matrices.invalidate();
        self.directions.invalidate();
    }

    pub fn set_scale(&mut self, scale: impl Into<Vector3<f32>>) {
        self.scale = scale.into();
        self.matrices.invalidate();
    }

    /// Translates along the world axes.
    pub fn move_absolute(&mut self, offset: impl Into<Vector3<f32>>) {
        self.position += offset.into();
        self.matrices.invalidate();
    }

    /// Translates along the transform's own axes.
    ///
    /// The offset is rotated by the current orientation before it is added,
    /// so `(0, 0, 1)` always moves along [`forward`](Self::forward).
    pub fn move_relative(&mut self, offset: impl Into<Vector3<f32>>) {
        self.position += self.orientation().rotate_vector(offset.into());
        self.matrices.invalidate();
    }

    /// Adds to the current pitch / yaw / roll.
    pub fn rotate(&mut self, pitch_yaw_roll: impl Into<Vector3<f32>>) {
        self.pitch_yaw_roll += pitch_yaw_roll.into();
        self.matrices.invalidate();
        self.directions.invalidate();
    }

    /// Multiplies the current scale component-wise.
    pub fn scale_by(&mut self, factor: impl Into<Vector3<f32>>) {
        let factor = factor.into();
        self.scale = Vector3::new(
            self.scale.x * factor.x,
            self.scale.y * factor.y,
            self.scale.z * factor.z,
        );
        self.matrices.invalidate();
    }

    pub fn orientation(&self) -> Quaternion<f32> {
        quaternion_from_pitch_yaw_roll(self.pitch_yaw_roll)
    }

    pub fn world_matrix(&self) -> Matrix4<f32> {
        self.world_matrices().world
    }

    pub fn world_inverse_transpose_matrix(&self) -> Matrix4<f32> {
        self.world_matrices().world_inverse_transpose
    }

    /// Returns both world matrices, recomputing them if any attribute changed.
    ///
    /// Local scale is applied first, then rotation, then translation. A
    /// degenerate (zero) scale has no inverse; the normal matrix falls back to
    /// identity in that case.
    pub fn world_matrices(&self) -> WorldMatrices {
        self.matrices.get_or_compute(|| {
            let world = Matrix4::from_translation(self.position)
                * Matrix4::from(self.orientation())
                * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z);
            let world_inverse_transpose = world
                .invert()
                .map(|inverse| inverse.transpose())
                .unwrap_or_else(Matrix4::identity);

            WorldMatrices {
                world,
                world_inverse_transpose,
            }
        })
    }

    pub fn right(&self) -> Vector3<f32> {
        self.basis().right
    }

    pub fn up(&self) -> Vector3<f32> {
        self.basis().up
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.basis().forward
    }

    fn basis(&self) -> Basis {
        self.directions.get_or_compute(|| {
            let rotation = self.orientation();
            Basis {
                right: rotation.rotate_vector(Vector3::unit_x()),
                up: rotation.rotate_vector(Vector3::unit_y()),
                forward: rotation.rotate_vector(Vector3::unit_z()),
            }
        })
    }

    /// Whether the world matrices will be rebuilt on next access.
    pub fn is_matrix_dirty(&self) -> bool {
        !self.matrices.is_valid()
    }

    /// Whether the basis vectors will be rebuilt on next access.
    pub fn is_direction_dirty(&self) -> bool {
        !self.directions.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cgmath::Vector4;
    use std::f32::consts::FRAC_PI_2;

    fn apply(m: Matrix4<f32>, p: [f32; 3]) -> Vector4<f32> {
        m * Vector4::new(p[0], p[1], p[2], 1.0)
    }

    fn assert_matrix_eq(a: Matrix4<f32>, b: Matrix4<f32>) {
        for column in 0..4 {
            for row in 0..4 {
                assert_abs_diff_eq!(a[column][row], b[column][row], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_translation_moves_origin() {
        let mut transform = Transform::new();
        transform.set_position([1.0, 2.0, 3.0]);
        transform.set_rotation([0.0, 0.0, 0.0]);
        transform.set_scale([1.0, 1.0, 1.0]);

        let p = apply(transform.world_matrix(), [0.0, 0.0, 0.0]);
        assert_abs_diff_eq!(p.x, 1.0);
        assert_abs_diff_eq!(p.y, 2.0);
        assert_abs_diff_eq!(p.z, 3.0);
        assert_abs_diff_eq!(p.w, 1.0);
    }

    #[test]
    fn test_scale_applies_before_rotation_and_translation() {
        let mut transform = Transform::new();
        transform.set_scale([2.0, 2.0, 2.0]);
        transform.set_rotation([0.0, FRAC_PI_2, 0.0]);
        transform.set_position([0.0, 1.0, 0.0]);

        // (0,0,1) -> scaled to (0,0,2) -> yawed to (2,0,0) -> lifted to (2,1,0)
        let p = apply(transform.world_matrix(), [0.0, 0.0, 1.0]);
        assert_abs_diff_eq!(p.x, 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.y, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_cached_matrix_tracks_every_mutation() {
        let mut transform = Transform::new();
        let _ = transform.world_matrix();
        assert!(!transform.is_matrix_dirty());

        transform.move_absolute([1.0, 0.0, 0.0]);
        assert!(transform.is_matrix_dirty());
        transform.rotate([0.1, 0.2, 0.3]);
        transform.scale_by([2.0, 1.0, 0.5]);
        transform.move_relative([0.0, 0.0, 1.0]);
        let cached = transform.world_matrix();

        let mut fresh = Transform::new();
        fresh.set_position(transform.position());
        fresh.set_rotation(transform.pitch_yaw_roll());
        fresh.set_scale(transform.scale());
        assert_matrix_eq(cached, fresh.world_matrix());
    }

    #[test]
    fn test_position_change_keeps_directions_cached() {
        let mut transform = Transform::new();
        let _ = transform.forward();
        transform.set_position([5.0, 0.0, 0.0]);
        assert!(!transform.is_direction_dirty());
        transform.set_scale([3.0, 3.0, 3.0]);
        assert!(!transform.is_direction_dirty());
        transform.rotate([0.0, 0.5, 0.0]);
        assert!(transform.is_direction_dirty());
    }

    #[test]
    fn test_move_relative_follows_yaw() {
        let mut transform = Transform::new();
        transform.set_rotation([0.0, FRAC_PI_2, 0.0]);
        transform.move_relative([0.0, 0.0, 1.0]);

        let p = transform.position();
        assert_abs_diff_eq!(p.x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_move_absolute_ignores_orientation() {
        let mut transform = Transform::new();
        transform.set_rotation([0.0, FRAC_PI_2, 0.0]);
        transform.move_absolute([0.0, 0.0, 1.0]);
        assert_eq!(transform.position(), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_basis_vectors_rotate_together() {
        let mut transform = Transform::new();
        transform.set_rotation([0.0, FRAC_PI_2, 0.0]);

        let right = transform.right();
        assert_abs_diff_eq!(right.z, -1.0, epsilon = 1e-6);
        let up = transform.up();
        assert_abs_diff_eq!(up.y, 1.0, epsilon = 1e-6);
        let forward = transform.forward();
        assert_abs_diff_eq!(forward.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_inverse_transpose_of_uniform_scale() {
        let mut transform = Transform::new();
        transform.set_scale([2.0, 2.0, 2.0]);
        transform.set_position([4.0, 0.0, 0.0]);

        let normal_matrix = transform.world_inverse_transpose_matrix();
        assert_abs_diff_eq!(normal_matrix[0][0], 0.5, epsilon = 1e-6);
        // translation ends up in the bottom row, not the last column
        assert_abs_diff_eq!(normal_matrix[3][0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(normal_matrix[0][3], -2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_scale_falls_back_to_identity_normal_matrix() {
        let mut transform = Transform::new();
        transform.set_scale([0.0, 1.0, 1.0]);
        assert_eq!(transform.world_inverse_transpose_matrix(), Matrix4::identity());
    }

    #[test]
    fn test_scale_by_multiplies() {
        let mut transform = Transform::new();
        transform.set_scale([2.0, 3.0, 4.0]);
        transform.scale_by([0.5, 2.0, 1.0]);
        assert_eq!(transform.scale(), Vector3::new(1.0, 6.0, 4.0));
    }
}
