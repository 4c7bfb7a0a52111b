//! Surface materials
//!
//! A material pairs a vertex and pixel program with the parameters the
//! pixel program reads: color tint, roughness, UV offset/scale and named
//! texture and sampler slots. Entities refer to materials by [`MaterialId`],
//! so many entities share one material.

use std::{collections::BTreeMap, sync::Arc};

use super::{
    loader::{SamplerId, TextureId},
    shader_program::{ShaderProgram, ShaderValue},
};
use crate::gfx::rendering::context::{BindReport, RenderContext};

/// Index of a material in the scene's material list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    vertex_shader: Arc<ShaderProgram>,
    pixel_shader: Arc<ShaderProgram>,
    color_tint: [f32; 4],
    roughness: f32,
    uv_offset: [f32; 2],
    uv_scale: [f32; 2],
    textures: BTreeMap<String, TextureId>,
    samplers: BTreeMap<String, SamplerId>,
}

impl Material {
    /// Creates a material with no textures; roughness is clamped to `[0, 1]`.
    pub fn new(
        name: &str,
        vertex_shader: Arc<ShaderProgram>,
        pixel_shader: Arc<ShaderProgram>,
        color_tint: [f32; 4],
        roughness: f32,
    ) -> Self {
        Self {
            name: name.to_string(),
            vertex_shader,
            pixel_shader,
            color_tint,
            roughness: roughness.clamp(0.0, 1.0),
            uv_offset: [0.0, 0.0],
            uv_scale: [1.0, 1.0],
            textures: BTreeMap::new(),
            samplers: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_shader(&self) -> &Arc<ShaderProgram> {
        &self.vertex_shader
    }

    pub fn pixel_shader(&self) -> &Arc<ShaderProgram> {
        &self.pixel_shader
    }

    pub fn color_tint(&self) -> [f32; 4] {
        self.color_tint
    }

    pub fn set_color_tint(&mut self, color_tint: [f32; 4]) {
        self.color_tint = color_tint;
    }

    pub fn roughness(&self) -> f32 {
        self.roughness
    }

    pub fn set_roughness(&mut self, roughness: f32) {
        self.roughness = roughness.clamp(0.0, 1.0);
    }

    pub fn uv_offset(&self) -> [f32; 2] {
        self.uv_offset
    }

    pub fn set_uv_offset(&mut self, uv_offset: [f32; 2]) {
        self.uv_offset = uv_offset;
    }

    pub fn uv_scale(&self) -> [f32; 2] {
        self.uv_scale
    }

    pub fn set_uv_scale(&mut self, uv_scale: [f32; 2]) {
        self.uv_scale = uv_scale;
    }

    /// Registers a texture under `slot`, replacing any previous one.
    pub fn add_texture(&mut self, slot: &str, texture: TextureId) {
        self.textures.insert(slot.to_string(), texture);
    }

    /// Registers a sampler under `slot`, replacing any previous one.
    pub fn add_sampler(&mut self, slot: &str, sampler: SamplerId) {
        self.samplers.insert(slot.to_string(), sampler);
    }

    pub fn texture(&self, slot: &str) -> Option<TextureId> {
        self.textures.get(slot).copied()
    }

    pub fn sampler(&self, slot: &str) -> Option<SamplerId> {
        self.samplers.get(slot).copied()
    }

    pub fn textures(&self) -> impl Iterator<Item = (&str, TextureId)> {
        self.textures.iter().map(|(slot, &id)| (slot.as_str(), id))
    }

    pub fn samplers(&self) -> impl Iterator<Item = (&str, SamplerId)> {
        self.samplers.iter().map(|(slot, &id)| (slot.as_str(), id))
    }

    /// Pushes the surface parameters and every texture/sampler into the
    /// pixel program. The caller flushes afterwards.
    pub fn prepare(&self, ctx: &mut dyn RenderContext) -> BindReport {
        let ps = self.pixel_shader.as_ref();
        let mut report = BindReport::new();

        report.check(
            ctx.set_value(ps, "colorTint", ShaderValue::Float4(self.color_tint)),
            "colorTint",
        );
        report.check(ctx.set_float(ps, "roughness", self.roughness), "roughness");
        report.check(
            ctx.set_value(ps, "uvOffset", ShaderValue::Float2(self.uv_offset)),
            "uvOffset",
        );
        report.check(
            ctx.set_value(ps, "uvScale", ShaderValue::Float2(self.uv_scale)),
            "uvScale",
        );

        for (slot, texture) in &self.textures {
            report.check(ctx.set_texture(ps, slot, *texture), slot);
        }
        for (slot, sampler) in &self.samplers {
            report.check(ctx.set_sampler(ps, slot, *sampler), slot);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{
        rendering::context::{CommandRecorder, RenderCommand},
        rendering::shaders::BuiltinPrograms,
    };

    fn material(roughness: f32) -> Material {
        let programs = BuiltinPrograms::new();
        Material::new(
            "Test",
            programs.entity_vs.clone(),
            programs.entity_ps.clone(),
            [1.0, 0.5, 0.25, 1.0],
            roughness,
        )
    }

    #[test]
    fn test_roughness_setter_clamps() {
        let mut material = material(0.3);
        material.set_roughness(1.5);
        assert_eq!(material.roughness(), 1.0);
        material.set_roughness(-0.2);
        assert_eq!(material.roughness(), 0.0);
        material.set_roughness(0.5);
        assert_eq!(material.roughness(), 0.5);
    }

    #[test]
    fn test_constructor_clamps_roughness() {
        assert_eq!(material(3.0).roughness(), 1.0);
    }

    #[test]
    fn test_uv_defaults() {
        let material = material(0.3);
        assert_eq!(material.uv_offset(), [0.0, 0.0]);
        assert_eq!(material.uv_scale(), [1.0, 1.0]);
    }

    #[test]
    fn test_last_texture_write_wins() {
        let mut material = material(0.3);
        material.add_texture("Albedo", TextureId(1));
        material.add_texture("Albedo", TextureId(2));
        assert_eq!(material.texture("Albedo"), Some(TextureId(2)));
        assert_eq!(material.textures().count(), 1);
    }

    #[test]
    fn test_prepare_pushes_parameters() {
        let mut material = material(0.3);
        material.add_texture("Albedo", TextureId(7));
        material.add_sampler("BasicSampler", SamplerId(2));

        let mut recorder = CommandRecorder::new();
        let report = material.prepare(&mut recorder);
        recorder.flush_constants(material.pixel_shader());
        assert!(report.is_clean());

        let ps = material.pixel_shader();
        let data = recorder.last_upload(ps.id()).unwrap();
        assert_eq!(ps.constants().read_float(data, "roughness"), Some(0.3));
        assert!(recorder.commands().contains(&RenderCommand::BindTexture {
            program: ps.id(),
            binding: ps.texture_slot("Albedo").unwrap().binding,
            texture: TextureId(7),
        }));
    }

    #[test]
    fn test_prepare_reports_unknown_slots() {
        let mut material = material(0.3);
        material.add_texture("DetailMap", TextureId(3));
        material.add_sampler("ClampSampler", SamplerId(1));

        let mut recorder = CommandRecorder::new();
        let report = material.prepare(&mut recorder);
        assert_eq!(
            report.unmatched(),
            &["DetailMap".to_string(), "ClampSampler".to_string()]
        );
        assert!(!recorder
            .commands()
            .iter()
            .any(|c| matches!(c, RenderCommand::BindTexture { .. })));
    }
}
