//! Render pipeline management system for wgpu
//!
//! Shader programs are registered lazily the first time a frame binds them:
//! each gets its own shader module and bind group layouts derived from its
//! reflection. Pipelines are created on first use and cached per
//! (vertex program, pixel program, raster state, pass).

use std::{collections::HashMap, sync::Arc};
use wgpu::*;

use super::context::{PassKind, RasterState};
use crate::{
    gfx::{
        resources::{
            shader_program::{ProgramId, ShaderProgram, ShaderStage},
            texture_resource::TextureResource,
        },
        scene::vertex::Vertex3D,
    },
    wgpu_utils::{sampler_of, texture_of, uniform_dynamic},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub vertex: ProgramId,
    pub pixel: Option<ProgramId>,
    pub raster: RasterState,
    pub pass: PassKind,
}

/// A program's GPU-side objects.
pub struct RegisteredProgram {
    pub program: Arc<ShaderProgram>,
    pub module: ShaderModule,
    /// Layout of the program's constant block (may have no entries).
    pub constants_layout: BindGroupLayout,
    /// Layout of the program's textures and samplers; pixel programs only.
    pub resources_layout: Option<BindGroupLayout>,
}

pub struct PipelineManager {
    device: Arc<Device>,
    color_format: TextureFormat,
    depth_bias: DepthBiasState,
    programs: HashMap<ProgramId, RegisteredProgram>,
    pipelines: HashMap<PipelineKey, RenderPipeline>,
    empty_layout: BindGroupLayout,
}

impl PipelineManager {
    /// `depth_bias` is applied by [`RasterState::DepthBiased`].
    pub fn new(device: Arc<Device>, color_format: TextureFormat, depth_bias: DepthBiasState) -> Self {
        let empty_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Empty Layout"),
            entries: &[],
        });

        Self {
            device,
            color_format,
            depth_bias,
            programs: HashMap::new(),
            pipelines: HashMap::new(),
            empty_layout,
        }
    }

    pub fn empty_layout(&self) -> &BindGroupLayout {
        &self.empty_layout
    }

    pub fn is_registered(&self, id: ProgramId) -> bool {
        self.programs.contains_key(&id)
    }

    pub fn program(&self, id: ProgramId) -> Option<&RegisteredProgram> {
        self.programs.get(&id)
    }

    /// Compiles `program` and builds its layouts; no-op when already known.
    pub fn register_program(&mut self, program: &Arc<ShaderProgram>) {
        if self.is_registered(program.id()) {
            return;
        }
        log::debug!("Registering shader program '{}'", program.label());

        let module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(program.label()),
            source: ShaderSource::Wgsl(program.source().to_string().into()),
        });

        let visibility = match program.stage() {
            ShaderStage::Vertex => ShaderStages::VERTEX,
            ShaderStage::Pixel => ShaderStages::FRAGMENT,
        };

        let constant_entries: Vec<BindGroupLayoutEntry> = if program.constants().is_empty() {
            Vec::new()
        } else {
            vec![BindGroupLayoutEntry {
                binding: 0,
                visibility,
                ty: uniform_dynamic(program.constants().size() as u64),
                count: None,
            }]
        };
        let constants_layout = self.device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some(&format!("{} Constants Layout", program.label())),
            entries: &constant_entries,
        });

        let resources_layout = (program.stage() == ShaderStage::Pixel).then(|| {
            let entries: Vec<BindGroupLayoutEntry> = program
                .textures()
                .iter()
                .map(|slot| (slot.binding, texture_of(slot.kind)))
                .chain(
                    program
                        .samplers()
                        .iter()
                        .map(|slot| (slot.binding, sampler_of(slot.kind))),
                )
                .map(|(binding, ty)| BindGroupLayoutEntry {
                    binding,
                    visibility,
                    ty,
                    count: None,
                })
                .collect();

            self.device.create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some(&format!("{} Resources Layout", program.label())),
                entries: &entries,
            })
        });

        self.programs.insert(
            program.id(),
            RegisteredProgram {
                program: program.clone(),
                module,
                constants_layout,
                resources_layout,
            },
        );
    }

    /// Gets or creates the pipeline for `key` (lazy loading).
    ///
    /// Returns `None` when a program in the key was never registered.
    pub fn get_pipeline(&mut self, key: PipelineKey) -> Option<&RenderPipeline> {
        if !self.pipelines.contains_key(&key) {
            let pipeline = self.create_pipeline(key)?;
            self.pipelines.insert(key, pipeline);
        }
        self.pipelines.get(&key)
    }

    /// An already created pipeline; never creates one.
    pub fn cached_pipeline(&self, key: &PipelineKey) -> Option<&RenderPipeline> {
        self.pipelines.get(key)
    }

    fn create_pipeline(&self, key: PipelineKey) -> Option<RenderPipeline> {
        let Some(vertex) = self.programs.get(&key.vertex) else {
            log::error!("Vertex program {:?} was never registered", key.vertex);
            return None;
        };
        let pixel = match key.pixel {
            Some(id) => match self.programs.get(&id) {
                Some(program) => Some(program),
                None => {
                    log::error!("Pixel program {:?} was never registered", id);
                    return None;
                }
            },
            None => None,
        };

        let mut layouts: Vec<&BindGroupLayout> = vec![self.constants_layout(vertex)];
        if let Some(pixel) = pixel {
            layouts.push(self.constants_layout(pixel));
            layouts.push(pixel.resources_layout.as_ref().unwrap_or(&self.empty_layout));
        }

        let label = format!(
            "{} + {} ({:?}, {:?})",
            vertex.program.label(),
            pixel.map_or("none", |p| p.program.label()),
            key.raster,
            key.pass
        );
        log::debug!("Creating pipeline {}", label);

        let pipeline_layout = self.device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(&format!("{} Layout", label)),
            bind_group_layouts: &layouts,
            push_constant_ranges: &[],
        });

        let color_targets = [Some(ColorTargetState {
            format: self.color_format,
            blend: Some(BlendState::REPLACE),
            write_mask: ColorWrites::ALL,
        })];

        // Depth-only passes have no color target and no fragment stage
        let fragment = match (pixel, key.pass) {
            (Some(pixel), PassKind::Main) => Some(FragmentState {
                module: &pixel.module,
                entry_point: Some(pixel.program.entry_point()),
                targets: &color_targets,
                compilation_options: PipelineCompilationOptions::default(),
            }),
            _ => None,
        };

        let pipeline = self.device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &vertex.module,
                entry_point: Some(vertex.program.entry_point()),
                buffers: &[Vertex3D::desc()],
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment,
            primitive: primitive_state(key.raster),
            depth_stencil: Some(depth_stencil_state(key.raster, self.depth_bias)),
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Some(pipeline)
    }

    /// Programs without constants share the empty layout, matching the empty
    /// bind group bound in their slot.
    fn constants_layout<'a>(&'a self, program: &'a RegisteredProgram) -> &'a BindGroupLayout {
        if program.program.constants().is_empty() {
            &self.empty_layout
        } else {
            &program.constants_layout
        }
    }

    /// Returns pipeline manager statistics
    pub fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            total_pipelines: self.pipelines.len(),
            registered_programs: self.programs.len(),
        }
    }
}

/// Statistics about pipeline manager state
#[derive(Debug)]
pub struct PipelineStats {
    pub total_pipelines: usize,
    pub registered_programs: usize,
}

/// Geometry is wound clockwise once converted to the left-handed convention.
fn primitive_state(raster: RasterState) -> PrimitiveState {
    let cull_mode = match raster {
        RasterState::Default | RasterState::DepthBiased => Some(Face::Back),
        RasterState::Sky => Some(Face::Front),
    };

    PrimitiveState {
        topology: PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: FrontFace::Cw,
        cull_mode,
        polygon_mode: PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

fn depth_stencil_state(raster: RasterState, depth_bias: DepthBiasState) -> DepthStencilState {
    let (depth_write_enabled, depth_compare, bias) = match raster {
        RasterState::Default => (true, CompareFunction::Less, DepthBiasState::default()),
        RasterState::DepthBiased => (true, CompareFunction::Less, depth_bias),
        RasterState::Sky => (false, CompareFunction::LessEqual, DepthBiasState::default()),
    };

    DepthStencilState {
        format: TextureResource::DEPTH_FORMAT,
        depth_write_enabled,
        depth_compare,
        stencil: StencilState::default(),
        bias,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bias() -> DepthBiasState {
        DepthBiasState {
            constant: 100,
            slope_scale: 1.0,
            clamp: 0.0,
        }
    }

    #[test]
    fn test_sky_culls_front_without_depth_writes() {
        assert_eq!(primitive_state(RasterState::Sky).cull_mode, Some(Face::Front));
        let depth = depth_stencil_state(RasterState::Sky, bias());
        assert!(!depth.depth_write_enabled);
        assert_eq!(depth.depth_compare, CompareFunction::LessEqual);
    }

    #[test]
    fn test_only_shadow_state_is_biased() {
        assert_eq!(depth_stencil_state(RasterState::DepthBiased, bias()).bias, bias());
        assert_eq!(
            depth_stencil_state(RasterState::Default, bias()).bias,
            DepthBiasState::default()
        );
    }

    #[test]
    fn test_front_faces_are_clockwise() {
        for raster in [RasterState::Default, RasterState::DepthBiased, RasterState::Sky] {
            assert_eq!(primitive_state(raster).front_face, FrontFace::Cw);
        }
    }
}
