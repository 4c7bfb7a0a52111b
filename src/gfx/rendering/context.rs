//! The rendering-context seam
//!
//! Scene code never talks to wgpu directly. It drives a [`RenderContext`]:
//! bind programs, push named values, flush, draw. [`CommandRecorder`] is the
//! implementation used for every frame; it resolves names against each
//! program's reflection, stages constant bytes per program and records a flat
//! list of [`RenderCommand`]s that the render engine replays on the GPU.
//! Tests inspect the same list.

use std::{collections::HashMap, sync::Arc};

use cgmath::Matrix4;

use crate::gfx::{
    resources::{
        loader::{SamplerId, TextureId},
        shader_program::{ProgramId, ShaderProgram, ShaderValue},
    },
    scene::mesh::MeshId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Depth-only render into the shadow map.
    Shadow,
    /// Color + depth render into the window surface.
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterState {
    /// Back-face culling, depth test `Less` with writes.
    Default,
    /// Like `Default` plus the shadow caster's depth bias.
    DepthBiased,
    /// Front-face culling, depth test `LessEqual` without writes.
    Sky,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    BeginPass(PassKind),
    EndPass,
    SetRasterState(RasterState),
    SetVertexShader(ProgramId),
    SetPixelShader(Option<ProgramId>),
    UploadConstants {
        program: ProgramId,
        data: Vec<u8>,
    },
    BindTexture {
        program: ProgramId,
        binding: u32,
        texture: TextureId,
    },
    BindSampler {
        program: ProgramId,
        binding: u32,
        sampler: SamplerId,
    },
    DrawIndexed {
        mesh: MeshId,
        index_count: u32,
    },
}

/// Names a bind could not match against the target program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    unmatched: Vec<String>,
}

impl BindReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `name` as unmatched unless `matched`.
    pub fn check(&mut self, matched: bool, name: &str) {
        if !matched {
            self.unmatched.push(name.to_string());
        }
    }

    pub fn merge(&mut self, other: BindReport) {
        self.unmatched.extend(other.unmatched);
    }

    pub fn unmatched(&self) -> &[String] {
        &self.unmatched
    }

    pub fn is_clean(&self) -> bool {
        self.unmatched.is_empty()
    }
}

/// Target of all scene drawing.
///
/// Name-based setters resolve against the program's reflection and return
/// whether the name matched; unmatched names change nothing.
pub trait RenderContext {
    fn begin_pass(&mut self, pass: PassKind);
    fn end_pass(&mut self);
    fn set_raster_state(&mut self, state: RasterState);

    fn set_vertex_shader(&mut self, program: &Arc<ShaderProgram>);
    /// `None` leaves the pixel stage empty (depth-only rendering).
    fn set_pixel_shader(&mut self, program: Option<&Arc<ShaderProgram>>);

    fn set_value(&mut self, program: &ShaderProgram, name: &str, value: ShaderValue<'_>) -> bool;
    fn set_texture(&mut self, program: &ShaderProgram, name: &str, texture: TextureId) -> bool;
    fn set_sampler(&mut self, program: &ShaderProgram, name: &str, sampler: SamplerId) -> bool;

    /// Sends the program's staged constants to the GPU for following draws.
    fn flush_constants(&mut self, program: &ShaderProgram);

    fn draw_indexed(&mut self, mesh: MeshId, index_count: u32);

    fn set_matrix4(&mut self, program: &ShaderProgram, name: &str, matrix: Matrix4<f32>) -> bool {
        self.set_value(program, name, ShaderValue::Matrix4(matrix.into()))
    }

    fn set_float(&mut self, program: &ShaderProgram, name: &str, value: f32) -> bool {
        self.set_value(program, name, ShaderValue::Float(value))
    }
}

/// Records a frame as [`RenderCommand`]s.
#[derive(Debug, Default)]
pub struct CommandRecorder {
    commands: Vec<RenderCommand>,
    staging: HashMap<ProgramId, Vec<u8>>,
    programs: HashMap<ProgramId, Arc<ShaderProgram>>,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Every program bound during recording, for lazy GPU registration.
    pub fn programs(&self) -> impl Iterator<Item = &Arc<ShaderProgram>> {
        self.programs.values()
    }

    /// Clears the command list for the next frame. Staged constants persist
    /// so values pushed once (such as scene constants) need not be re-sent.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Bytes of the most recent upload for `program`.
    pub fn last_upload(&self, program: ProgramId) -> Option<&[u8]> {
        self.commands.iter().rev().find_map(|command| match command {
            RenderCommand::UploadConstants { program: p, data } if *p == program => {
                Some(data.as_slice())
            }
            _ => None,
        })
    }

    fn staging_for(&mut self, program: &ShaderProgram) -> &mut Vec<u8> {
        self.staging
            .entry(program.id())
            .or_insert_with(|| vec![0; program.constants().size() as usize])
    }
}

impl RenderContext for CommandRecorder {
    fn begin_pass(&mut self, pass: PassKind) {
        self.commands.push(RenderCommand::BeginPass(pass));
    }

    fn end_pass(&mut self) {
        self.commands.push(RenderCommand::EndPass);
    }

    fn set_raster_state(&mut self, state: RasterState) {
        self.commands.push(RenderCommand::SetRasterState(state));
    }

    fn set_vertex_shader(&mut self, program: &Arc<ShaderProgram>) {
        self.programs.entry(program.id()).or_insert_with(|| program.clone());
        self.commands
            .push(RenderCommand::SetVertexShader(program.id()));
    }

    fn set_pixel_shader(&mut self, program: Option<&Arc<ShaderProgram>>) {
        if let Some(program) = program {
            self.programs.entry(program.id()).or_insert_with(|| program.clone());
        }
        self.commands
            .push(RenderCommand::SetPixelShader(program.map(|p| p.id())));
    }

    fn set_value(&mut self, program: &ShaderProgram, name: &str, value: ShaderValue<'_>) -> bool {
        let staging = self.staging_for(program);
        program.constants().write(staging, name, value)
    }

    fn set_texture(&mut self, program: &ShaderProgram, name: &str, texture: TextureId) -> bool {
        let Some(slot) = program.texture_slot(name) else {
            return false;
        };
        self.commands.push(RenderCommand::BindTexture {
            program: program.id(),
            binding: slot.binding,
            texture,
        });
        true
    }

    fn set_sampler(&mut self, program: &ShaderProgram, name: &str, sampler: SamplerId) -> bool {
        let Some(slot) = program.sampler_slot(name) else {
            return false;
        };
        self.commands.push(RenderCommand::BindSampler {
            program: program.id(),
            binding: slot.binding,
            sampler,
        });
        true
    }

    fn flush_constants(&mut self, program: &ShaderProgram) {
        if program.constants().is_empty() {
            return;
        }
        let data = self.staging_for(program).clone();
        self.commands.push(RenderCommand::UploadConstants {
            program: program.id(),
            data,
        });
    }

    fn draw_indexed(&mut self, mesh: MeshId, index_count: u32) {
        self.commands
            .push(RenderCommand::DrawIndexed { mesh, index_count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::resources::shader_program::{
        ConstantLayout, SamplerKind, ShaderStage, TextureKind,
    };
    use cgmath::SquareMatrix;

    fn pixel_program() -> Arc<ShaderProgram> {
        ShaderProgram::builder("test_ps", ShaderStage::Pixel, "", "fs_main")
            .constants(ConstantLayout::builder().float("roughness").build())
            .texture("Albedo", 2, TextureKind::D2)
            .sampler("BasicSampler", 3, SamplerKind::Filtering)
            .build()
    }

    #[test]
    fn test_flush_uploads_staged_values() {
        let program = pixel_program();
        let mut recorder = CommandRecorder::new();

        assert!(recorder.set_float(&program, "roughness", 0.5));
        recorder.flush_constants(&program);

        let data = recorder.last_upload(program.id()).unwrap();
        assert_eq!(program.constants().read_float(data, "roughness"), Some(0.5));
    }

    #[test]
    fn test_unmatched_names_record_nothing() {
        let program = pixel_program();
        let mut recorder = CommandRecorder::new();

        assert!(!recorder.set_float(&program, "metalness", 1.0));
        assert!(!recorder.set_texture(&program, "Detail", TextureId(4)));
        assert!(!recorder.set_sampler(&program, "ClampSampler", SamplerId(1)));
        assert!(!recorder.set_matrix4(&program, "world", Matrix4::identity()));
        assert!(recorder.commands().is_empty());
    }

    #[test]
    fn test_resources_resolve_to_bindings() {
        let program = pixel_program();
        let mut recorder = CommandRecorder::new();

        recorder.set_pixel_shader(Some(&program));
        assert!(recorder.set_texture(&program, "Albedo", TextureId(9)));
        assert!(recorder.set_sampler(&program, "BasicSampler", SamplerId(1)));

        assert_eq!(
            recorder.commands(),
            &[
                RenderCommand::SetPixelShader(Some(program.id())),
                RenderCommand::BindTexture {
                    program: program.id(),
                    binding: 2,
                    texture: TextureId(9),
                },
                RenderCommand::BindSampler {
                    program: program.id(),
                    binding: 3,
                    sampler: SamplerId(1),
                },
            ]
        );
        assert_eq!(recorder.programs().count(), 1);
    }

    #[test]
    fn test_staged_values_survive_clear() {
        let program = pixel_program();
        let mut recorder = CommandRecorder::new();
        recorder.set_float(&program, "roughness", 0.75);
        recorder.clear();

        recorder.flush_constants(&program);
        let data = recorder.last_upload(program.id()).unwrap();
        assert_eq!(program.constants().read_float(data, "roughness"), Some(0.75));
    }

    #[test]
    fn test_report_collects_unmatched() {
        let mut report = BindReport::new();
        report.check(true, "Albedo");
        report.check(false, "Detail");

        let mut other = BindReport::new();
        other.check(false, "Gloss");
        report.merge(other);

        assert_eq!(report.unmatched(), &["Detail".to_string(), "Gloss".to_string()]);
        assert!(!report.is_clean());
    }
}
