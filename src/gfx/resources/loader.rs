//! Opaque texture and sampler handles plus the loader that hands them out
//!
//! Scene setup only ever sees [`TextureId`] / [`SamplerId`]. The GPU-backed
//! loader is the render engine; tests use an in-memory counter.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerId(pub u32);

/// How texel values are interpreted when sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Color data (albedo, sky faces); decoded to linear when sampled.
    Srgb,
    /// Non-color data (normal, roughness and metalness maps).
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerPreset {
    /// Trilinear, anisotropic, wrapping in every direction.
    Anisotropic,
    /// Depth comparison (`Less`) for shadow lookups, clamped at the edges.
    ShadowComparison,
}

/// Cube faces in +X, -X, +Y, -Y, +Z, -Z order.
pub type CubeFaces<T> = [T; 6];

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to load texture {path}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("cubemap face {face} is {found:?}, expected {expected:?}")]
    CubemapFaceMismatch {
        face: usize,
        expected: (u32, u32),
        found: (u32, u32),
    },
}

/// Creates texture and sampler resources for scene setup.
pub trait ResourceLoader {
    fn load_texture(&mut self, path: &Path, color_space: ColorSpace) -> Result<TextureId, TextureError>;

    /// A 1x1 texture of a single color.
    fn solid_texture(&mut self, label: &str, rgba: [u8; 4], color_space: ColorSpace) -> TextureId;

    fn load_cubemap(&mut self, faces: &CubeFaces<PathBuf>) -> Result<TextureId, TextureError>;

    /// A 1x1 cubemap with one color per face.
    fn solid_cubemap(&mut self, label: &str, faces: CubeFaces<[u8; 4]>) -> TextureId;

    fn create_sampler(&mut self, preset: SamplerPreset) -> SamplerId;

    /// The depth target the shadow pass renders into, sampleable in the main pass.
    fn create_shadow_map(&mut self, resolution: u32) -> TextureId;
}
