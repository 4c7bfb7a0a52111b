//! Built-in shader programs and their reflection
//!
//! The constant layouts declared here must match the uniform structs in the
//! WGSL sources field for field.

use std::sync::Arc;

use crate::gfx::{
    resources::shader_program::{ConstantLayout, SamplerKind, ShaderProgram, ShaderStage, TextureKind},
    scene::light::{GpuLight, MAX_LIGHTS},
};

const ENTITY_SHADER: &str = include_str!("entity.wgsl");
const SHADOW_SHADER: &str = include_str!("shadow.wgsl");
const SKY_SHADER: &str = include_str!("sky.wgsl");

/// The programs the demo scene renders with.
#[derive(Debug, Clone)]
pub struct BuiltinPrograms {
    pub entity_vs: Arc<ShaderProgram>,
    pub entity_ps: Arc<ShaderProgram>,
    pub shadow_vs: Arc<ShaderProgram>,
    pub sky_vs: Arc<ShaderProgram>,
    pub sky_ps: Arc<ShaderProgram>,
}

impl BuiltinPrograms {
    pub fn new() -> Self {
        let entity_vs = ShaderProgram::builder("entity_vs", ShaderStage::Vertex, ENTITY_SHADER, "vs_main")
            .constants(
                ConstantLayout::builder()
                    .matrix4("world")
                    .matrix4("view")
                    .matrix4("projection")
                    .matrix4("worldInvTranspose")
                    .matrix4("lightView")
                    .matrix4("lightProjection")
                    .build(),
            )
            .build();

        let entity_ps = ShaderProgram::builder("entity_ps", ShaderStage::Pixel, ENTITY_SHADER, "fs_main")
            .constants(
                ConstantLayout::builder()
                    .float4("colorTint")
                    .float3("cameraPosition")
                    .float("roughness")
                    .float3("ambient")
                    .int("lightCount")
                    .float2("uvOffset")
                    .float2("uvScale")
                    .array("lights", std::mem::size_of::<GpuLight>() as u32, MAX_LIGHTS as u32)
                    .build(),
            )
            .texture("Albedo", 0, TextureKind::D2)
            .texture("NormalMap", 1, TextureKind::D2)
            .texture("RoughnessMap", 2, TextureKind::D2)
            .texture("MetalMap", 3, TextureKind::D2)
            .texture("ShadowMap", 4, TextureKind::Depth)
            .sampler("BasicSampler", 5, SamplerKind::Filtering)
            .sampler("ShadowSampler", 6, SamplerKind::Comparison)
            .build();

        let shadow_vs = ShaderProgram::builder("shadow_vs", ShaderStage::Vertex, SHADOW_SHADER, "vs_main")
            .constants(
                ConstantLayout::builder()
                    .matrix4("world")
                    .matrix4("view")
                    .matrix4("projection")
                    .build(),
            )
            .build();

        let sky_vs = ShaderProgram::builder("sky_vs", ShaderStage::Vertex, SKY_SHADER, "vs_main")
            .constants(
                ConstantLayout::builder()
                    .matrix4("view")
                    .matrix4("projection")
                    .build(),
            )
            .build();

        let sky_ps = ShaderProgram::builder("sky_ps", ShaderStage::Pixel, SKY_SHADER, "fs_main")
            .texture("SkyTexture", 0, TextureKind::Cube)
            .sampler("BasicSampler", 1, SamplerKind::Filtering)
            .build();

        Self {
            entity_vs,
            entity_ps,
            shadow_vs,
            sky_vs,
            sky_ps,
        }
    }
}

impl Default for BuiltinPrograms {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_pixel_block_matches_wgsl() {
        let programs = BuiltinPrograms::new();
        let constants = programs.entity_ps.constants();
        assert_eq!(constants.field("lights").map(|f| f.offset), Some(64));
        assert_eq!(constants.size(), 64 + 64 * 8);
    }

    #[test]
    fn test_entity_vertex_block_order() {
        let programs = BuiltinPrograms::new();
        let names: Vec<&str> = programs
            .entity_vs
            .constants()
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(
            names,
            ["world", "view", "projection", "worldInvTranspose", "lightView", "lightProjection"]
        );
    }

    #[test]
    fn test_shadow_program_is_vertex_only() {
        let programs = BuiltinPrograms::new();
        assert_eq!(programs.shadow_vs.stage(), ShaderStage::Vertex);
        assert!(programs.shadow_vs.textures().is_empty());
        assert_eq!(programs.shadow_vs.constants().size(), 192);
    }

    #[test]
    fn test_sources_declare_entry_points() {
        let programs = BuiltinPrograms::new();
        for program in [
            &programs.entity_vs,
            &programs.entity_ps,
            &programs.shadow_vs,
            &programs.sky_vs,
            &programs.sky_ps,
        ] {
            assert!(program
                .source()
                .contains(&format!("fn {}(", program.entry_point())));
        }
    }
}
