//! Scene lights and their GPU record
//!
//! The pixel shader reads a fixed array of [`MAX_LIGHTS`] [`GpuLight`]s plus
//! a count. [`Light`] is the typed CPU-side description; only the fields a
//! kind actually uses exist on it.

use cgmath::{InnerSpace, Vector3};

pub const MAX_LIGHTS: usize = 8;

pub const LIGHT_TYPE_DIRECTIONAL: i32 = 0;
pub const LIGHT_TYPE_POINT: i32 = 1;
pub const LIGHT_TYPE_SPOT: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional {
        direction: Vector3<f32>,
    },
    Point {
        position: Vector3<f32>,
        range: f32,
    },
    /// Cone angles are in radians, measured from the direction axis.
    Spot {
        position: Vector3<f32>,
        direction: Vector3<f32>,
        range: f32,
        inner_angle: f32,
        outer_angle: f32,
    },
}

impl LightKind {
    pub fn label(&self) -> &'static str {
        match self {
            LightKind::Directional { .. } => "Directional",
            LightKind::Point { .. } => "Point",
            LightKind::Spot { .. } => "Spot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vector3<f32>,
    pub intensity: f32,
}

impl Light {
    pub fn directional(direction: impl Into<Vector3<f32>>, color: impl Into<Vector3<f32>>, intensity: f32) -> Self {
        let mut light = Self {
            kind: LightKind::Directional {
                direction: direction.into(),
            },
            color: color.into(),
            intensity,
        };
        light.normalize_direction();
        light
    }

    pub fn point(
        position: impl Into<Vector3<f32>>,
        range: f32,
        color: impl Into<Vector3<f32>>,
        intensity: f32,
    ) -> Self {
        Self {
            kind: LightKind::Point {
                position: position.into(),
                range,
            },
            color: color.into(),
            intensity,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn spot(
        position: impl Into<Vector3<f32>>,
        direction: impl Into<Vector3<f32>>,
        range: f32,
        inner_angle: f32,
        outer_angle: f32,
        color: impl Into<Vector3<f32>>,
        intensity: f32,
    ) -> Self {
        let mut light = Self {
            kind: LightKind::Spot {
                position: position.into(),
                direction: direction.into(),
                range,
                inner_angle,
                outer_angle,
            },
            color: color.into(),
            intensity,
        };
        light.normalize_direction();
        light
    }

    /// Re-normalizes the direction of directional and spot lights. A zero
    /// direction is left alone.
    pub fn normalize_direction(&mut self) {
        match &mut self.kind {
            LightKind::Directional { direction } | LightKind::Spot { direction, .. } => {
                if direction.magnitude2() > 0.0 {
                    *direction = direction.normalize();
                }
            }
            LightKind::Point { .. } => {}
        }
    }

    pub fn to_gpu(&self) -> GpuLight {
        let mut gpu = GpuLight {
            color: self.color.into(),
            intensity: self.intensity,
            ..GpuLight::default()
        };
        match self.kind {
            LightKind::Directional { direction } => {
                gpu.kind = LIGHT_TYPE_DIRECTIONAL;
                gpu.direction = direction.into();
            }
            LightKind::Point { position, range } => {
                gpu.kind = LIGHT_TYPE_POINT;
                gpu.position = position.into();
                gpu.range = range;
            }
            LightKind::Spot {
                position,
                direction,
                range,
                inner_angle,
                outer_angle,
            } => {
                gpu.kind = LIGHT_TYPE_SPOT;
                gpu.position = position.into();
                gpu.direction = direction.into();
                gpu.range = range;
                gpu.spot_inner = inner_angle;
                gpu.spot_outer = outer_angle;
            }
        }
        gpu
    }
}

/// One light as the pixel shader reads it; 16-byte aligned, 64 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuLight {
    pub kind: i32,
    pub range: f32,
    pub intensity: f32,
    pub spot_inner: f32,
    pub direction: [f32; 3],
    pub spot_outer: f32,
    pub position: [f32; 3],
    _pad0: f32,
    pub color: [f32; 3],
    _pad1: f32,
}

/// Packs up to [`MAX_LIGHTS`] lights for upload; extra lights are dropped.
/// Returns the array and how many entries are live.
pub fn pack_lights(lights: &[Light]) -> ([GpuLight; MAX_LIGHTS], i32) {
    let mut packed = [GpuLight::default(); MAX_LIGHTS];
    let count = lights.len().min(MAX_LIGHTS);
    for (slot, light) in packed.iter_mut().zip(lights) {
        *slot = light.to_gpu();
    }
    (packed, count as i32)
}

/// The demo's lights: a white key light aimed like the shadow caster, plus
/// a point and a spot light that start switched off.
pub fn default_lights(key_direction: Vector3<f32>) -> Vec<Light> {
    vec![
        Light::directional(key_direction, [1.0, 1.0, 1.0], 1.0),
        Light::point([-1.5, 0.0, 0.0], 8.0, [1.0, 1.0, 1.0], 0.0),
        Light::spot(
            [3.2, 0.5, 0.2],
            [-1.0, 0.0, 0.0],
            40.0,
            20f32.to_radians(),
            30f32.to_radians(),
            [1.0, 1.0, 1.0],
            0.0,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_gpu_light_is_64_bytes() {
        assert_eq!(std::mem::size_of::<GpuLight>(), 64);
    }

    #[test]
    fn test_directions_are_normalized() {
        let light = Light::directional([0.0, -3.0, 4.0], [1.0, 1.0, 1.0], 1.0);
        let gpu = light.to_gpu();
        assert_abs_diff_eq!(gpu.direction[1], -0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(gpu.direction[2], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_direction_stays_zero() {
        let light = Light::directional([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], 1.0);
        assert_eq!(light.to_gpu().direction, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_spot_fields_reach_gpu() {
        let light = Light::spot([1.0, 2.0, 3.0], [0.0, 0.0, 2.0], 10.0, 0.1, 0.2, [1.0, 0.0, 0.0], 2.0);
        let gpu = light.to_gpu();
        assert_eq!(gpu.kind, LIGHT_TYPE_SPOT);
        assert_eq!(gpu.position, [1.0, 2.0, 3.0]);
        assert_eq!(gpu.direction, [0.0, 0.0, 1.0]);
        assert_eq!((gpu.spot_inner, gpu.spot_outer, gpu.range), (0.1, 0.2, 10.0));
    }

    #[test]
    fn test_pack_caps_at_max_lights() {
        let lights = vec![Light::point([0.0, 0.0, 0.0], 1.0, [1.0, 1.0, 1.0], 1.0); 11];
        let (packed, count) = pack_lights(&lights);
        assert_eq!(count, MAX_LIGHTS as i32);
        assert!(packed.iter().all(|l| l.kind == LIGHT_TYPE_POINT));
    }
}
