//! Free-flying perspective camera
//!
//! The camera owns a [`Transform`]; its view matrix looks along the
//! transform's forward vector with world up, and its projection is a
//! left-handed perspective. Both matrices are cached: the view is rebuilt
//! after any movement, the projection after a FOV or aspect ratio change.

use std::f32::consts::FRAC_PI_2;

use cgmath::{Matrix4, Vector3};

use super::camera_controller::CameraController;
use crate::{
    config::CameraConfig,
    gfx::{
        cached::Cached,
        math::{look_to_lh, perspective_lh, WORLD_UP},
        transform::Transform,
    },
    input::InputProvider,
};

#[derive(Debug, Clone)]
pub struct Camera {
    transform: Transform,
    fov: f32,
    aspect_ratio: f32,
    near_clip: f32,
    far_clip: f32,
    move_speed: f32,
    look_speed: f32,
    active: bool,
    controller: CameraController,

    view: Cached<Matrix4<f32>>,
    projection: Cached<Matrix4<f32>>,
}

impl Camera {
    /// Creates a camera and computes its view and projection right away.
    pub fn new(config: &CameraConfig, aspect_ratio: f32) -> Self {
        let camera = Self {
            transform: Transform::from_position(config.position),
            fov: config.fov,
            aspect_ratio,
            near_clip: config.near_clip,
            far_clip: config.far_clip,
            move_speed: config.move_speed,
            look_speed: config.look_speed,
            active: config.active,
            controller: CameraController::default(),
            view: Cached::empty(),
            projection: Cached::empty(),
        };
        camera.view();
        camera.projection();
        camera
    }

    /// Applies one frame of fly input. Inactive cameras ignore input.
    ///
    /// Pitch is clamped to `[-pi/2, pi/2]` after mouse look so the camera
    /// never flips over the vertical.
    pub fn update(&mut self, delta_time: f32, input: &dyn InputProvider) {
        if !self.active {
            return;
        }

        let intent = self.controller.sample(input);
        let step = delta_time * self.move_speed;

        if intent.relative != Vector3::new(0.0, 0.0, 0.0) {
            self.transform.move_relative(intent.relative * step);
        }
        if intent.vertical != 0.0 {
            self.transform
                .move_absolute([0.0, intent.vertical * step, 0.0]);
        }

        if let Some(delta) = intent.look {
            self.transform.rotate([
                delta.y * self.look_speed,
                delta.x * self.look_speed,
                0.0,
            ]);

            let mut pitch_yaw_roll = self.transform.pitch_yaw_roll();
            let clamped = pitch_yaw_roll.x.clamp(-FRAC_PI_2, FRAC_PI_2);
            if clamped != pitch_yaw_roll.x {
                pitch_yaw_roll.x = clamped;
                self.transform.set_rotation(pitch_yaw_roll);
            }
        }

        self.update_view_matrix();
    }

    /// Rebuilds the view matrix from the transform's position and forward vector.
    pub fn update_view_matrix(&mut self) {
        self.view.invalidate();
        self.view();
    }

    /// Rebuilds the projection for a new aspect ratio (window resize).
    pub fn update_projection_matrix(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        self.projection.invalidate();
        self.projection();
    }

    pub fn view(&self) -> Matrix4<f32> {
        self.view.get_or_compute(|| {
            look_to_lh(
                self.transform.position(),
                self.transform.forward(),
                WORLD_UP,
            )
        })
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection.get_or_compute(|| {
            perspective_lh(self.fov, self.aspect_ratio, self.near_clip, self.far_clip)
        })
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable access to the transform; the view is rebuilt on next use.
    pub fn transform_mut(&mut self) -> &mut Transform {
        self.view.invalidate();
        &mut self.transform
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
        self.projection.invalidate();
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn near_clip(&self) -> f32 {
        self.near_clip
    }

    pub fn far_clip(&self) -> f32 {
        self.far_clip
    }

    pub fn set_clip_planes(&mut self, near_clip: f32, far_clip: f32) {
        self.near_clip = near_clip;
        self.far_clip = far_clip;
        self.projection.invalidate();
    }

    pub fn move_speed(&self) -> f32 {
        self.move_speed
    }

    pub fn set_move_speed(&mut self, move_speed: f32) {
        self.move_speed = move_speed;
    }

    pub fn look_speed(&self) -> f32 {
        self.look_speed
    }

    pub fn set_look_speed(&mut self, look_speed: f32) {
        self.look_speed = look_speed;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}
