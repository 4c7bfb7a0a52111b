// src/wgpu_utils/binding_types.rs
//! WGPU binding type utilities

use crate::gfx::resources::shader_program::{SamplerKind, TextureKind};

/// Uniform block selected per draw with a dynamic offset.
pub fn uniform_dynamic(size: u64) -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: true,
        min_binding_size: wgpu::BufferSize::new(size),
    }
}

pub fn sampler(filtering: wgpu::SamplerBindingType) -> wgpu::BindingType {
    wgpu::BindingType::Sampler(filtering)
}

pub fn texture_2d() -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Float { filterable: true },
        view_dimension: wgpu::TextureViewDimension::D2,
        multisampled: false,
    }
}

pub fn texture_cube() -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Float { filterable: true },
        view_dimension: wgpu::TextureViewDimension::Cube,
        multisampled: false,
    }
}

pub fn texture_depth_2d() -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Depth,
        view_dimension: wgpu::TextureViewDimension::D2,
        multisampled: false,
    }
}

pub fn texture_of(kind: TextureKind) -> wgpu::BindingType {
    match kind {
        TextureKind::D2 => texture_2d(),
        TextureKind::Cube => texture_cube(),
        TextureKind::Depth => texture_depth_2d(),
    }
}

pub fn sampler_of(kind: SamplerKind) -> wgpu::BindingType {
    match kind {
        SamplerKind::Filtering => sampler(wgpu::SamplerBindingType::Filtering),
        SamplerKind::Comparison => sampler(wgpu::SamplerBindingType::Comparison),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_slot_is_depth_sampled() {
        assert!(matches!(
            texture_of(TextureKind::Depth),
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                ..
            }
        ));
        assert_eq!(
            sampler_of(SamplerKind::Comparison),
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison)
        );
    }

    #[test]
    fn test_dynamic_uniform_carries_size() {
        match uniform_dynamic(192) {
            wgpu::BindingType::Buffer {
                has_dynamic_offset,
                min_binding_size,
                ..
            } => {
                assert!(has_dynamic_offset);
                assert_eq!(min_binding_size.map(|s| s.get()), Some(192));
            }
            other => panic!("unexpected binding type {other:?}"),
        }
    }
}
