//! Drawable scene entities
//!
//! A [`GameEntity`] is one mesh drawn with one material at one transform.
//! Mesh and material are shared, so the entity only stores their ids and the
//! scene hands the resolved resources to [`GameEntity::draw`].

use crate::gfx::{
    camera::Camera,
    rendering::context::{BindReport, RenderContext},
    resources::{
        material::{Material, MaterialId},
        shader_program::ShaderValue,
    },
    transform::Transform,
};

use super::mesh::{Mesh, MeshId};

#[derive(Debug, Clone)]
pub struct GameEntity {
    name: String,
    transform: Transform,
    mesh: MeshId,
    material: MaterialId,
}

impl GameEntity {
    pub fn new(name: &str, mesh: MeshId, material: MaterialId) -> Self {
        Self {
            name: name.to_string(),
            transform: Transform::new(),
            mesh,
            material,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    pub fn set_mesh(&mut self, mesh: MeshId) {
        self.mesh = mesh;
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn set_material(&mut self, material: MaterialId) {
        self.material = material;
    }

    /// Draws the entity with its material from `camera`'s point of view.
    ///
    /// Binds the material's programs, pushes world / view / projection (and
    /// the normal matrix) to the vertex stage, the material parameters and
    /// camera position to the pixel stage, then issues the mesh draw.
    /// `mesh` and `material` are the resources behind this entity's ids.
    pub fn draw(
        &self,
        ctx: &mut dyn RenderContext,
        camera: &Camera,
        mesh: &Mesh,
        material: &Material,
    ) -> BindReport {
        let vs = material.vertex_shader();
        let ps = material.pixel_shader();
        let mut report = BindReport::new();

        ctx.set_vertex_shader(vs);
        ctx.set_pixel_shader(Some(ps));

        let matrices = self.transform.world_matrices();
        report.check(ctx.set_matrix4(vs, "world", matrices.world), "world");
        report.check(ctx.set_matrix4(vs, "view", camera.view()), "view");
        report.check(ctx.set_matrix4(vs, "projection", camera.projection()), "projection");
        report.check(
            ctx.set_matrix4(vs, "worldInvTranspose", matrices.world_inverse_transpose),
            "worldInvTranspose",
        );
        ctx.flush_constants(vs);

        report.merge(material.prepare(ctx));
        let camera_position = camera.transform().position();
        report.check(
            ctx.set_value(ps, "cameraPosition", ShaderValue::Float3(camera_position.into())),
            "cameraPosition",
        );
        ctx.flush_constants(ps);

        mesh.draw(ctx, self.mesh);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::CameraConfig,
        gfx::{
            geometry::generate_cube,
            rendering::{
                context::{CommandRecorder, RenderCommand},
                shaders::BuiltinPrograms,
            },
        },
    };
    use cgmath::Matrix4;

    fn fixture() -> (GameEntity, Camera, Mesh, Material) {
        let programs = BuiltinPrograms::new();
        let material = Material::new(
            "Bronze",
            programs.entity_vs.clone(),
            programs.entity_ps.clone(),
            [1.0; 4],
            0.03,
        );
        let mesh = Mesh::from_geometry("Cube", generate_cube());

        let mut entity = GameEntity::new("Cube", MeshId(0), MaterialId(0));
        entity.transform_mut().set_position([1.0, 2.0, 3.0]);
        entity.transform_mut().set_rotation([0.2, 0.7, 0.0]);
        entity.transform_mut().set_scale([2.0, 2.0, 2.0]);

        let camera = Camera::new(
            &CameraConfig::default().with_position([0.0, 1.0, -8.0]),
            16.0 / 9.0,
        );
        (entity, camera, mesh, material)
    }

    #[test]
    fn test_vertex_constants_match_sources() {
        let (entity, camera, mesh, material) = fixture();
        let mut recorder = CommandRecorder::new();
        entity.draw(&mut recorder, &camera, &mesh, &material);

        let vs = material.vertex_shader();
        let data = recorder.last_upload(vs.id()).unwrap();
        let read = |name| vs.constants().read_matrix(data, name).map(Matrix4::from);

        assert_eq!(read("world"), Some(entity.transform().world_matrix()));
        assert_eq!(read("view"), Some(camera.view()));
        assert_eq!(read("projection"), Some(camera.projection()));
        assert_eq!(
            read("worldInvTranspose"),
            Some(entity.transform().world_inverse_transpose_matrix())
        );
    }

    #[test]
    fn test_draw_order() {
        let (entity, camera, mesh, material) = fixture();
        let mut recorder = CommandRecorder::new();
        entity.draw(&mut recorder, &camera, &mesh, &material);

        let commands = recorder.commands();
        let vs = material.vertex_shader().id();
        let ps = material.pixel_shader().id();

        assert_eq!(commands[0], RenderCommand::SetVertexShader(vs));
        assert_eq!(commands[1], RenderCommand::SetPixelShader(Some(ps)));
        assert!(matches!(
            &commands[2],
            RenderCommand::UploadConstants { program, .. } if *program == vs
        ));
        assert!(matches!(
            &commands[commands.len() - 2],
            RenderCommand::UploadConstants { program, .. } if *program == ps
        ));
        assert_eq!(
            commands.last(),
            Some(&RenderCommand::DrawIndexed {
                mesh: MeshId(0),
                index_count: mesh.index_count(),
            })
        );
    }

    #[test]
    fn test_builtin_material_binds_cleanly() {
        let (entity, camera, mesh, material) = fixture();
        let mut recorder = CommandRecorder::new();
        let report = entity.draw(&mut recorder, &camera, &mesh, &material);
        assert!(report.is_clean(), "unmatched: {:?}", report.unmatched());
    }
}
