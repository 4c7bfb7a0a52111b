// src/gfx/resources/mod.rs
//! GPU resource management
//!
//! Shader program reflection, materials and the texture/sampler handles the
//! scene refers to.

pub mod loader;
pub mod material;
pub mod shader_program;
pub mod texture_resource;

// Re-export main types
pub use loader::{ColorSpace, ResourceLoader, SamplerId, SamplerPreset, TextureError, TextureId};
pub use material::{Material, MaterialId};
pub use shader_program::{ProgramId, ShaderProgram, ShaderStage, ShaderValue};
pub use texture_resource::TextureResource;
