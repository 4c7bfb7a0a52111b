//! WGPU-based rendering engine
//!
//! Owns the device, surface and every GPU resource the scene refers to by
//! id. Each frame it replays a [`CommandRecorder`]'s commands: constant
//! uploads are packed into one uniform arena, draws are grouped by pass and
//! resolved into pipelines and bind groups, then everything is encoded,
//! followed by the UI overlay and present.

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, info, warn};
use thiserror::Error;
use wgpu::TextureFormat;

use super::{
    context::{CommandRecorder, PassKind, RasterState, RenderCommand},
    pipeline_manager::{PipelineKey, PipelineManager},
};
use crate::{
    gfx::{
        resources::{
            loader::{
                ColorSpace, CubeFaces, ResourceLoader, SamplerId, SamplerPreset, TextureError,
                TextureId,
            },
            shader_program::{ProgramId, SamplerKind, ShaderProgram, TextureKind},
            texture_resource::{self, decode_cube_faces, decode_image, TextureResource},
        },
        scene::mesh::{DrawMesh, GpuMesh, Mesh, MeshId},
    },
    wgpu_utils::UniformArena,
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create a rendering surface")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible graphics adapter")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to open the graphics device")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("the surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("the GPU ran out of memory")]
    OutOfMemory,
}

/// Texture or sampler bound to one slot of a pixel program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoundResource {
    Texture(TextureId),
    Sampler(SamplerId),
}

#[derive(Debug, Clone, PartialEq)]
struct PixelBinding {
    program: ProgramId,
    constants_offset: Option<u32>,
    resources: BTreeMap<u32, BoundResource>,
}

#[derive(Debug, Clone, PartialEq)]
struct DrawPlan {
    pipeline: PipelineKey,
    vertex_offset: Option<u32>,
    pixel: Option<PixelBinding>,
    mesh: MeshId,
    index_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
struct PassPlan {
    kind: PassKind,
    draws: Vec<DrawPlan>,
}

/// Walks a recorded frame, tracking bound state, and turns it into a list of
/// passes with fully described draws. `upload_offsets` holds the arena offset
/// of every `UploadConstants` command, in order.
fn plan_frame(commands: &[RenderCommand], upload_offsets: &[u32]) -> Vec<PassPlan> {
    let mut passes: Vec<PassPlan> = Vec::new();
    let mut in_pass = false;
    let mut raster = RasterState::Default;
    let mut vertex: Option<ProgramId> = None;
    let mut pixel: Option<ProgramId> = None;
    let mut offsets: HashMap<ProgramId, u32> = HashMap::new();
    let mut resources: HashMap<ProgramId, BTreeMap<u32, BoundResource>> = HashMap::new();
    let mut uploads = upload_offsets.iter();

    for command in commands {
        match command {
            RenderCommand::BeginPass(kind) => {
                passes.push(PassPlan {
                    kind: *kind,
                    draws: Vec::new(),
                });
                in_pass = true;
                // raster state never carries over between passes
                raster = RasterState::Default;
            }
            RenderCommand::EndPass => in_pass = false,
            RenderCommand::SetRasterState(state) => raster = *state,
            RenderCommand::SetVertexShader(id) => vertex = Some(*id),
            RenderCommand::SetPixelShader(id) => pixel = *id,
            RenderCommand::UploadConstants { program, .. } => {
                if let Some(&offset) = uploads.next() {
                    offsets.insert(*program, offset);
                }
            }
            RenderCommand::BindTexture {
                program,
                binding,
                texture,
            } => {
                resources
                    .entry(*program)
                    .or_default()
                    .insert(*binding, BoundResource::Texture(*texture));
            }
            RenderCommand::BindSampler {
                program,
                binding,
                sampler,
            } => {
                resources
                    .entry(*program)
                    .or_default()
                    .insert(*binding, BoundResource::Sampler(*sampler));
            }
            RenderCommand::DrawIndexed { mesh, index_count } => {
                let (true, Some(pass), Some(vertex)) = (in_pass, passes.last_mut(), vertex) else {
                    warn!("Dropping draw of {:?} recorded outside a pass or without a vertex program", mesh);
                    continue;
                };
                let pixel = match pass.kind {
                    PassKind::Main => pixel,
                    PassKind::Shadow => None,
                };

                pass.draws.push(DrawPlan {
                    pipeline: PipelineKey {
                        vertex,
                        pixel,
                        raster,
                        pass: pass.kind,
                    },
                    vertex_offset: offsets.get(&vertex).copied(),
                    pixel: pixel.map(|program| PixelBinding {
                        program,
                        constants_offset: offsets.get(&program).copied(),
                        resources: resources.get(&program).cloned().unwrap_or_default(),
                    }),
                    mesh: *mesh,
                    index_count: *index_count,
                });
            }
        }
    }

    passes
}

/// Resolves every texture/sampler slot of `program` to a concrete resource,
/// substituting `fallback` for unbound slots and for textures whose kind does
/// not fit the slot.
fn resolve_slots(
    program: &ShaderProgram,
    bound: &BTreeMap<u32, BoundResource>,
    texture_kind: impl Fn(TextureId) -> Option<TextureKind>,
    fallback: &Fallbacks,
) -> Vec<(u32, BoundResource)> {
    let textures = program.textures().iter().map(|slot| {
        let resource = match bound.get(&slot.binding) {
            Some(&BoundResource::Texture(id)) if texture_kind(id) == Some(slot.kind) => {
                BoundResource::Texture(id)
            }
            Some(other) => {
                debug!("'{}' got {:?}, which does not fit; using a fallback", slot.name, other);
                BoundResource::Texture(fallback.texture(slot.kind))
            }
            None => BoundResource::Texture(fallback.texture(slot.kind)),
        };
        (slot.binding, resource)
    });

    let samplers = program.samplers().iter().map(|slot| {
        let resource = match bound.get(&slot.binding) {
            Some(&BoundResource::Sampler(id)) => BoundResource::Sampler(id),
            _ => BoundResource::Sampler(fallback.sampler(slot.kind)),
        };
        (slot.binding, resource)
    });

    textures.chain(samplers).collect()
}

/// Resources used for slots a frame left unbound.
#[derive(Debug, Clone, Copy)]
struct Fallbacks {
    white: TextureId,
    white_cube: TextureId,
    depth: TextureId,
    filtering: SamplerId,
    comparison: SamplerId,
}

impl Fallbacks {
    fn texture(&self, kind: TextureKind) -> TextureId {
        match kind {
            TextureKind::D2 => self.white,
            TextureKind::Cube => self.white_cube,
            TextureKind::Depth => self.depth,
        }
    }

    fn sampler(&self, kind: SamplerKind) -> SamplerId {
        match kind {
            SamplerKind::Filtering => self.filtering,
            SamplerKind::Comparison => self.comparison,
        }
    }
}

struct TextureEntry {
    resource: TextureResource,
    kind: TextureKind,
}

type ResourceKey = (ProgramId, Vec<(u32, BoundResource)>);

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    format: TextureFormat,
    pub pipeline_manager: PipelineManager,
    clear_color: wgpu::Color,

    textures: Vec<TextureEntry>,
    samplers: Vec<wgpu::Sampler>,
    meshes: HashMap<MeshId, GpuMesh>,
    shadow_target: Option<TextureId>,
    fallbacks: Fallbacks,

    arena: UniformArena,
    arena_generation: u64,
    constant_groups: HashMap<ProgramId, wgpu::BindGroup>,
    resource_groups: HashMap<ResourceKey, wgpu::BindGroup>,
    empty_group: wgpu::BindGroup,
}

impl RenderEngine {
    /// Creates the device, configures the surface and builds the fallback
    /// resources. `depth_bias` is used by the shadow pass pipelines.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        vsync: bool,
        depth_bias: wgpu::DepthBiasState,
    ) -> Result<RenderEngine, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        info!("Using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        // Shaders apply gamma themselves, so prefer a linear surface
        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: present_mode(vsync),
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = TextureResource::create_depth_texture(&device, &config, "depth_texture");
        let pipeline_manager = PipelineManager::new(device.clone(), format, depth_bias);
        let empty_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Empty Bind Group"),
            layout: pipeline_manager.empty_layout(),
            entries: &[],
        });
        let arena = UniformArena::new(&device);

        let mut engine = Self {
            surface,
            device,
            queue,
            config,
            depth_texture,
            format,
            pipeline_manager,
            clear_color: wgpu::Color::BLACK,
            textures: Vec::new(),
            samplers: Vec::new(),
            meshes: HashMap::new(),
            shadow_target: None,
            fallbacks: Fallbacks {
                white: TextureId(0),
                white_cube: TextureId(0),
                depth: TextureId(0),
                filtering: SamplerId(0),
                comparison: SamplerId(0),
            },
            arena,
            arena_generation: 0,
            constant_groups: HashMap::new(),
            resource_groups: HashMap::new(),
            empty_group,
        };

        engine.fallbacks = Fallbacks {
            white: engine.solid_texture("Fallback White", [255; 4], ColorSpace::Srgb),
            white_cube: engine.solid_cubemap("Fallback Cube", [[255; 4]; 6]),
            depth: engine.push_texture(
                TextureResource::create_shadow_map(&engine.device, 1),
                TextureKind::Depth,
            ),
            filtering: engine.create_sampler(SamplerPreset::Anisotropic),
            comparison: engine.create_sampler(SamplerPreset::ShadowComparison),
        };

        Ok(engine)
    }

    fn push_texture(&mut self, resource: TextureResource, kind: TextureKind) -> TextureId {
        self.textures.push(TextureEntry { resource, kind });
        TextureId(self.textures.len() as u32 - 1)
    }

    /// Uploads every mesh that has no GPU copy yet.
    pub fn upload_meshes<'a>(&mut self, meshes: impl IntoIterator<Item = (MeshId, &'a Mesh)>) {
        for (id, mesh) in meshes {
            if !self.meshes.contains_key(&id) {
                debug!("Uploading mesh '{}' ({} indices)", mesh.name(), mesh.index_count());
                self.meshes.insert(id, GpuMesh::new(&self.device, mesh));
            }
        }
    }

    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = wgpu::Color {
            r: rgba[0] as f64,
            g: rgba[1] as f64,
            b: rgba[2] as f64,
            a: rgba[3] as f64,
        };
    }

    /// Replays one recorded frame, runs the UI callback on the same encoder
    /// and presents.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped.
    pub fn render_frame<F>(
        &mut self,
        frame: &CommandRecorder,
        ui_callback: Option<F>,
    ) -> Result<(), RenderError>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(RenderError::OutOfMemory),
            Err(error) => {
                warn!("Skipping frame: {}", error);
                return Ok(());
            }
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        for program in frame.programs() {
            self.pipeline_manager.register_program(program);
        }
        let passes = self.prepare(frame.commands());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        for pass in &passes {
            self.encode_pass(&mut encoder, pass, &surface_texture_view);
        }

        if let Some(ui_callback) = ui_callback {
            ui_callback(
                &self.device,
                &self.queue,
                &mut encoder,
                &surface_texture_view,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    /// Uploads the frame's constants and creates every pipeline and bind
    /// group the draws will need.
    fn prepare(&mut self, commands: &[RenderCommand]) -> Vec<PassPlan> {
        self.arena.begin_frame();
        let mut tail = 0u64;
        let upload_offsets: Vec<u32> = commands
            .iter()
            .filter_map(|command| match command {
                RenderCommand::UploadConstants { data, .. } => {
                    tail = tail.max(data.len() as u64);
                    Some(self.arena.push(data))
                }
                _ => None,
            })
            .collect();
        self.arena.upload(&self.device, &self.queue, tail);

        if self.arena.generation() != self.arena_generation {
            self.constant_groups.clear();
            self.arena_generation = self.arena.generation();
        }

        let mut passes = plan_frame(commands, &upload_offsets);
        for pass in &mut passes {
            pass.draws.retain(|draw| {
                let ready = self.pipeline_manager.get_pipeline(draw.pipeline).is_some()
                    && self.meshes.contains_key(&draw.mesh);
                if !ready {
                    debug!("Skipping draw of {:?}: pipeline or mesh unavailable", draw.mesh);
                }
                ready
            });
            for draw in &pass.draws {
                self.ensure_constant_group(draw.pipeline.vertex);
                if let Some(pixel) = &draw.pixel {
                    self.ensure_constant_group(pixel.program);
                    self.ensure_resource_group(pixel);
                }
            }
        }

        passes
    }

    fn ensure_constant_group(&mut self, program: ProgramId) {
        if self.constant_groups.contains_key(&program) {
            return;
        }
        let Some(registered) = self.pipeline_manager.program(program) else {
            return;
        };
        let size = registered.program.constants().size() as u64;
        if size == 0 {
            return;
        }

        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Constants", registered.program.label())),
            layout: &registered.constants_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: self.arena.buffer(),
                    offset: 0,
                    size: wgpu::BufferSize::new(size),
                }),
            }],
        });
        self.constant_groups.insert(program, group);
    }

    fn resource_key(&self, pixel: &PixelBinding) -> Option<ResourceKey> {
        let registered = self.pipeline_manager.program(pixel.program)?;
        let slots = resolve_slots(
            &registered.program,
            &pixel.resources,
            |id| self.textures.get(id.0 as usize).map(|entry| entry.kind),
            &self.fallbacks,
        );
        Some((pixel.program, slots))
    }

    fn ensure_resource_group(&mut self, pixel: &PixelBinding) {
        let Some(key) = self.resource_key(pixel) else {
            return;
        };
        if self.resource_groups.contains_key(&key) {
            return;
        }
        let Some(layout) = self
            .pipeline_manager
            .program(pixel.program)
            .and_then(|registered| registered.resources_layout.as_ref())
        else {
            return;
        };

        let mut entries = Vec::with_capacity(key.1.len());
        for (binding, resource) in &key.1 {
            let resource = match resource {
                BoundResource::Texture(id) => match self.textures.get(id.0 as usize) {
                    Some(entry) => wgpu::BindingResource::TextureView(&entry.resource.view),
                    None => return,
                },
                BoundResource::Sampler(id) => match self.samplers.get(id.0 as usize) {
                    Some(sampler) => wgpu::BindingResource::Sampler(sampler),
                    None => return,
                },
            };
            entries.push(wgpu::BindGroupEntry {
                binding: *binding,
                resource,
            });
        }

        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Pixel Resources"),
            layout,
            entries: &entries,
        });
        self.resource_groups.insert(key, group);
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pass: &PassPlan,
        surface_view: &wgpu::TextureView,
    ) {
        let color_attachment = [Some(wgpu::RenderPassColorAttachment {
            view: surface_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(self.clear_color),
                store: wgpu::StoreOp::Store,
            },
        })];

        let (label, color_attachments, depth_view): (
            &str,
            &[Option<wgpu::RenderPassColorAttachment>],
            &wgpu::TextureView,
        ) = match pass.kind {
            PassKind::Shadow => {
                let Some(target) = self
                    .shadow_target
                    .and_then(|id| self.textures.get(id.0 as usize))
                else {
                    warn!("Shadow pass recorded but no shadow map exists");
                    return;
                };
                ("Shadow Depth Pass", &[], &target.resource.view)
            }
            PassKind::Main => ("Main Render Pass", &color_attachment, &self.depth_texture.view),
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        for draw in &pass.draws {
            let (Some(pipeline), Some(mesh)) = (
                self.pipeline_manager.cached_pipeline(&draw.pipeline),
                self.meshes.get(&draw.mesh),
            ) else {
                continue;
            };
            render_pass.set_pipeline(pipeline);

            self.bind_constants(&mut render_pass, 0, draw.pipeline.vertex, draw.vertex_offset);
            if let Some(pixel) = &draw.pixel {
                self.bind_constants(&mut render_pass, 1, pixel.program, pixel.constants_offset);
                match self
                    .resource_key(pixel)
                    .and_then(|key| self.resource_groups.get(&key))
                {
                    Some(group) => render_pass.set_bind_group(2, group, &[]),
                    None => render_pass.set_bind_group(2, &self.empty_group, &[]),
                }
            }

            render_pass.draw_mesh(mesh, 0..draw.index_count);
        }
    }

    fn bind_constants(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        index: u32,
        program: ProgramId,
        offset: Option<u32>,
    ) {
        match self.constant_groups.get(&program) {
            Some(group) => render_pass.set_bind_group(index, group, &[offset.unwrap_or(0)]),
            None => render_pass.set_bind_group(index, &self.empty_group, &[]),
        }
    }

    /// Resizes the surface and recreates the depth texture
    ///
    /// Zero sizes (minimized windows) are ignored. The shadow map keeps its
    /// fixed resolution.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
    }

    pub fn get_surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

impl ResourceLoader for RenderEngine {
    fn load_texture(&mut self, path: &Path, color_space: ColorSpace) -> Result<TextureId, TextureError> {
        let image = decode_image(path)?;
        let resource = TextureResource::from_rgba(
            &self.device,
            &self.queue,
            &image.rgba,
            image.width,
            image.height,
            &path.display().to_string(),
            color_space,
        );
        Ok(self.push_texture(resource, TextureKind::D2))
    }

    fn solid_texture(&mut self, label: &str, rgba: [u8; 4], color_space: ColorSpace) -> TextureId {
        let resource =
            TextureResource::from_rgba(&self.device, &self.queue, &rgba, 1, 1, label, color_space);
        self.push_texture(resource, TextureKind::D2)
    }

    fn load_cubemap(&mut self, faces: &CubeFaces<PathBuf>) -> Result<TextureId, TextureError> {
        let (pixels, size) = decode_cube_faces(faces)?;
        let resource =
            TextureResource::cubemap_from_rgba(&self.device, &self.queue, &pixels, size, "Sky Cubemap");
        Ok(self.push_texture(resource, TextureKind::Cube))
    }

    fn solid_cubemap(&mut self, label: &str, faces: CubeFaces<[u8; 4]>) -> TextureId {
        let pixels: CubeFaces<Vec<u8>> = faces.map(|rgba| rgba.to_vec());
        let resource =
            TextureResource::cubemap_from_rgba(&self.device, &self.queue, &pixels, (1, 1), label);
        self.push_texture(resource, TextureKind::Cube)
    }

    fn create_sampler(&mut self, preset: SamplerPreset) -> SamplerId {
        self.samplers
            .push(texture_resource::create_sampler(&self.device, preset));
        SamplerId(self.samplers.len() as u32 - 1)
    }

    fn create_shadow_map(&mut self, resolution: u32) -> TextureId {
        let resource = TextureResource::create_shadow_map(&self.device, resolution);
        let id = self.push_texture(resource, TextureKind::Depth);
        self.shadow_target = Some(id);
        id
    }
}
