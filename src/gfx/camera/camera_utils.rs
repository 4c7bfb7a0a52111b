use crate::{config::CameraConfig, input::InputProvider};

use super::fly_camera::Camera;

/// A small pool of cameras with exactly one active at a time.
///
/// The active camera receives input and is used for rendering. Its own
/// `active` flag mirrors the selection so the UI can show it.
pub struct CameraManager {
    cameras: Vec<Camera>,
    active: usize,
}

impl CameraManager {
    /// Builds the pool. The first camera flagged active wins; with none
    /// flagged the first camera is selected. An empty list gets one default
    /// camera.
    pub fn new(mut cameras: Vec<Camera>) -> Self {
        if cameras.is_empty() {
            cameras.push(Camera::new(&CameraConfig::default(), 1.0));
        }
        let active = cameras.iter().position(Camera::is_active).unwrap_or(0);

        let mut manager = Self { cameras, active };
        manager.set_active(active);
        manager
    }

    pub fn from_configs(configs: &[CameraConfig], aspect_ratio: f32) -> Self {
        let cameras = configs
            .iter()
            .map(|config| Camera::new(config, aspect_ratio))
            .collect();
        Self::new(cameras)
    }

    /// Selects camera `index`, flipping every camera's active flag. Returns
    /// `false` and leaves the selection alone when `index` is out of range.
    pub fn set_active(&mut self, index: usize) -> bool {
        if index >= self.cameras.len() {
            return false;
        }
        self.active = index;
        for (i, camera) in self.cameras.iter_mut().enumerate() {
            camera.set_active(i == index);
        }
        true
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &Camera {
        &self.cameras[self.active]
    }

    pub fn active_mut(&mut self) -> &mut Camera {
        &mut self.cameras[self.active]
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Drives the active camera; the others are left untouched.
    pub fn update(&mut self, delta_time: f32, input: &dyn InputProvider) {
        self.active_mut().update(delta_time, input);
    }

    /// Every camera keeps a projection matching the window.
    pub fn on_resize(&mut self, aspect_ratio: f32) {
        for camera in &mut self.cameras {
            camera.update_projection_matrix(aspect_ratio);
        }
    }
}
