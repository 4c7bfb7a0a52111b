//! Fixed orthographic shadow caster
//!
//! The light's view and projection are derived once from [`ShadowConfig`] and
//! never re-fitted to the scene. The same two matrices feed the depth-only
//! pass and the main pass lookup.

use std::sync::Arc;

use cgmath::{InnerSpace, Matrix4, Vector3};
use log::debug;

use super::context::{PassKind, RasterState, RenderContext};
use crate::{
    config::ShadowConfig,
    gfx::{
        math::{look_at_lh, orthographic_lh, WORLD_UP},
        resources::{
            loader::{SamplerId, TextureId},
            shader_program::ShaderProgram,
        },
        scene::{Scene, ShadowBinding},
    },
};

pub struct ShadowCaster {
    resolution: u32,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    light_position: Vector3<f32>,
    target: Vector3<f32>,
    program: Arc<ShaderProgram>,
    map: TextureId,
    sampler: SamplerId,
}

impl ShadowCaster {
    /// `map` must be a depth texture of `config.resolution` squared and
    /// `sampler` a comparison sampler.
    pub fn new(
        config: &ShadowConfig,
        program: Arc<ShaderProgram>,
        map: TextureId,
        sampler: SamplerId,
    ) -> Self {
        let light_position = Vector3::from(config.light_position);
        let target = Vector3::from(config.target);
        let view = look_at_lh(light_position, target, WORLD_UP);
        let projection = orthographic_lh(
            config.projection_size,
            config.projection_size,
            config.near_clip,
            config.far_clip,
        );

        Self {
            resolution: config.resolution,
            view,
            projection,
            light_position,
            target,
            program,
            map,
            sampler,
        }
    }

    pub fn view(&self) -> Matrix4<f32> {
        self.view
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn map(&self) -> TextureId {
        self.map
    }

    pub fn light_position(&self) -> Vector3<f32> {
        self.light_position
    }

    /// Unit vector the caster looks along.
    pub fn direction(&self) -> Vector3<f32> {
        let direction = self.target - self.light_position;
        if direction.magnitude2() > 0.0 {
            direction.normalize()
        } else {
            Vector3::new(0.0, -1.0, 0.0)
        }
    }

    pub fn binding(&self) -> ShadowBinding {
        ShadowBinding {
            view: self.view,
            projection: self.projection,
            map: self.map,
            sampler: self.sampler,
        }
    }

    /// Records the depth-only pass: every entity's geometry from the light's
    /// point of view, with no pixel program bound.
    pub fn record_pass(&self, ctx: &mut dyn RenderContext, scene: &Scene) {
        let vs = &self.program;

        ctx.begin_pass(PassKind::Shadow);
        ctx.set_raster_state(RasterState::DepthBiased);
        ctx.set_vertex_shader(vs);
        ctx.set_pixel_shader(None);

        ctx.set_matrix4(vs, "view", self.view);
        ctx.set_matrix4(vs, "projection", self.projection);

        for entity in scene.entities() {
            let Some(mesh) = scene.mesh(entity.mesh()) else {
                debug!("Entity {} has no mesh to cast a shadow with", entity.name());
                continue;
            };
            ctx.set_matrix4(vs, "world", entity.transform().world_matrix());
            ctx.flush_constants(vs);
            mesh.draw(ctx, entity.mesh());
        }

        ctx.set_raster_state(RasterState::Default);
        ctx.end_pass();
    }
}
