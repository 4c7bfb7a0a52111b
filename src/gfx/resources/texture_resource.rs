//! Texture resource management for wgpu
//!
//! Creates the GPU textures and samplers behind [`TextureId`](super::loader::TextureId)
//! and [`SamplerId`](super::loader::SamplerId): decoded images, solid-color
//! placeholders, cubemaps, the window depth buffer and the shadow map.

use std::path::Path;

use super::loader::{ColorSpace, CubeFaces, SamplerPreset, TextureError};

/// GPU texture together with the view shaders sample through.
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl TextureResource {
    /// Standard depth buffer format used throughout the engine
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Creates a depth texture matching the surface configuration
    pub fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        label: &str,
    ) -> Self {
        Self::create_depth(device, config.width, config.height, label)
    }

    /// Square depth target for the shadow pass, sampleable as `texture_depth_2d`.
    pub fn create_shadow_map(device: &wgpu::Device, resolution: u32) -> Self {
        Self::create_depth(device, resolution, resolution, "Shadow Map")
    }

    fn create_depth(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }

    /// Uploads tightly packed RGBA8 pixels as a 2D texture.
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &[u8],
        width: u32,
        height: u32,
        label: &str,
        color_space: ColorSpace,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: color_format(color_space),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        write_layer(queue, &texture, rgba, width, height, 0);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }

    /// Uploads six equally sized RGBA8 faces as a cubemap (always sRGB).
    pub fn cubemap_from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &CubeFaces<Vec<u8>>,
        face_size: (u32, u32),
        label: &str,
    ) -> Self {
        let (width, height) = face_size;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: color_format(ColorSpace::Srgb),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in faces.iter().enumerate() {
            write_layer(queue, &texture, face, width, height, layer as u32);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        Self { texture, view }
    }
}

fn write_layer(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    rgba: &[u8],
    width: u32,
    height: u32,
    layer: u32,
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

pub fn color_format(color_space: ColorSpace) -> wgpu::TextureFormat {
    match color_space {
        ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
    }
}

/// Decoded RGBA8 pixels ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decodes an image file into RGBA8.
pub fn decode_image(path: &Path) -> Result<DecodedImage, TextureError> {
    let image = image::open(path).map_err(|source| TextureError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(DecodedImage {
        rgba: rgba.into_raw(),
        width,
        height,
    })
}

/// Decodes six cubemap faces and checks they all share the first face's size.
pub fn decode_cube_faces(
    paths: &CubeFaces<std::path::PathBuf>,
) -> Result<(CubeFaces<Vec<u8>>, (u32, u32)), TextureError> {
    let mut faces: CubeFaces<Vec<u8>> = Default::default();
    let mut sizes = [(0, 0); 6];
    for (index, path) in paths.iter().enumerate() {
        let decoded = decode_image(path)?;
        sizes[index] = (decoded.width, decoded.height);
        faces[index] = decoded.rgba;
    }
    let size = check_face_sizes(&sizes)?;
    Ok((faces, size))
}

/// Returns the common face size, or the first face that differs from face 0.
pub fn check_face_sizes(sizes: &CubeFaces<(u32, u32)>) -> Result<(u32, u32), TextureError> {
    let expected = sizes[0];
    match sizes.iter().position(|&size| size != expected) {
        Some(face) => Err(TextureError::CubemapFaceMismatch {
            face,
            expected,
            found: sizes[face],
        }),
        None => Ok(expected),
    }
}

pub fn create_sampler(device: &wgpu::Device, preset: SamplerPreset) -> wgpu::Sampler {
    device.create_sampler(&sampler_descriptor(preset))
}

fn sampler_descriptor(preset: SamplerPreset) -> wgpu::SamplerDescriptor<'static> {
    match preset {
        SamplerPreset::Anisotropic => wgpu::SamplerDescriptor {
            label: Some("Basic Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: 16,
            ..Default::default()
        },
        SamplerPreset::ShadowComparison => wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::Less),
            ..Default::default()
        },
    }
}
