use std::sync::Arc;

use crate::gfx::{
    camera::Camera,
    rendering::context::{BindReport, RasterState, RenderContext},
    resources::{
        loader::{SamplerId, TextureId},
        shader_program::ShaderProgram,
    },
};

use super::mesh::{Mesh, MeshId};

/// Cubemap backdrop drawn after the opaque geometry.
///
/// The sky mesh is rendered inside-out (front faces culled) and its depth is
/// pushed to the far plane by the vertex program, so it only fills pixels no
/// entity covered.
#[derive(Debug, Clone)]
pub struct Sky {
    mesh: MeshId,
    cubemap: TextureId,
    sampler: SamplerId,
    vertex_shader: Arc<ShaderProgram>,
    pixel_shader: Arc<ShaderProgram>,
}

impl Sky {
    pub fn new(
        mesh: MeshId,
        cubemap: TextureId,
        sampler: SamplerId,
        vertex_shader: Arc<ShaderProgram>,
        pixel_shader: Arc<ShaderProgram>,
    ) -> Self {
        Self {
            mesh,
            cubemap,
            sampler,
            vertex_shader,
            pixel_shader,
        }
    }

    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    pub fn cubemap(&self) -> TextureId {
        self.cubemap
    }

    pub fn draw(&self, ctx: &mut dyn RenderContext, camera: &Camera, mesh: &Mesh) -> BindReport {
        let vs = &self.vertex_shader;
        let ps = &self.pixel_shader;
        let mut report = BindReport::new();

        ctx.set_raster_state(RasterState::Sky);
        ctx.set_vertex_shader(vs);
        ctx.set_pixel_shader(Some(ps));

        report.check(ctx.set_matrix4(vs, "view", camera.view()), "view");
        report.check(ctx.set_matrix4(vs, "projection", camera.projection()), "projection");
        ctx.flush_constants(vs);

        report.check(ctx.set_texture(ps, "SkyTexture", self.cubemap), "SkyTexture");
        report.check(ctx.set_sampler(ps, "BasicSampler", self.sampler), "BasicSampler");
        ctx.flush_constants(ps);

        mesh.draw(ctx, self.mesh);

        ctx.set_raster_state(RasterState::Default);
        report
    }
}
