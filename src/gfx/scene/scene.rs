use cgmath::{Matrix4, Vector3};
use log::debug;

use crate::gfx::{
    camera::camera_utils::CameraManager,
    rendering::context::{BindReport, RenderContext},
    resources::{
        loader::{SamplerId, TextureId},
        material::{Material, MaterialId},
        shader_program::ShaderValue,
    },
};

use super::{
    entity::GameEntity,
    light::{pack_lights, Light},
    mesh::{Mesh, MeshId},
    sky::Sky,
};

/// What the main pass needs from the shadow pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowBinding {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub map: TextureId,
    pub sampler: SamplerId,
}

/// Owns everything that gets drawn.
///
/// Meshes and materials live in flat lists and are referred to by index, so
/// entities can share them freely. Ids are only handed out by `add_*` and
/// nothing is ever removed, so an id from this scene always resolves.
pub struct Scene {
    pub cameras: CameraManager,
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    entities: Vec<GameEntity>,
    lights: Vec<Light>,
    ambient: Vector3<f32>,
    sky: Option<Sky>,
}

impl Scene {
    pub fn new(cameras: CameraManager) -> Self {
        Self {
            cameras,
            meshes: Vec::new(),
            materials: Vec::new(),
            entities: Vec::new(),
            lights: Vec::new(),
            ambient: Vector3::new(0.0, 0.0, 0.0),
            sky: None,
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() as u32 - 1)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0 as usize)
    }

    /// Finds a mesh by the name it was created with.
    pub fn find_mesh(&self, name: &str) -> Option<MeshId> {
        self.meshes
            .iter()
            .position(|mesh| mesh.name() == name)
            .map(|index| MeshId(index as u32))
    }

    pub fn meshes(&self) -> impl Iterator<Item = (MeshId, &Mesh)> {
        self.meshes
            .iter()
            .enumerate()
            .map(|(index, mesh)| (MeshId(index as u32), mesh))
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() as u32 - 1)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0 as usize)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut [Material] {
        &mut self.materials
    }

    /// Adds an entity and returns its index.
    pub fn add_entity(&mut self, entity: GameEntity) -> usize {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    pub fn entities(&self) -> &[GameEntity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [GameEntity] {
        &mut self.entities
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut [Light] {
        &mut self.lights
    }

    pub fn ambient(&self) -> Vector3<f32> {
        self.ambient
    }

    pub fn set_ambient(&mut self, ambient: impl Into<Vector3<f32>>) {
        self.ambient = ambient.into();
    }

    pub fn sky(&self) -> Option<&Sky> {
        self.sky.as_ref()
    }

    pub fn set_sky(&mut self, sky: Sky) {
        self.sky = Some(sky);
    }

    /// Records the main pass body: every entity with full shading, then the
    /// sky. Entities whose mesh or material id does not resolve are skipped.
    ///
    /// Scene-wide values (light matrices, lights, ambient and the shadow map)
    /// are staged into each material's programs before the entity binds its
    /// own values, so they ride along with the entity's flush.
    pub fn draw(&self, ctx: &mut dyn RenderContext, shadow: &ShadowBinding) -> BindReport {
        let camera = self.cameras.active();
        let (lights, light_count) = pack_lights(&self.lights);
        let light_bytes: &[u8] = bytemuck::cast_slice(&lights);
        let mut report = BindReport::new();

        for entity in &self.entities {
            let (Some(mesh), Some(material)) =
                (self.mesh(entity.mesh()), self.material(entity.material()))
            else {
                debug!("Skipping entity {} with a dangling mesh or material", entity.name());
                continue;
            };
            let vs = material.vertex_shader();
            let ps = material.pixel_shader();

            report.check(ctx.set_matrix4(vs, "lightView", shadow.view), "lightView");
            report.check(
                ctx.set_matrix4(vs, "lightProjection", shadow.projection),
                "lightProjection",
            );
            report.check(
                ctx.set_value(ps, "ambient", ShaderValue::Float3(self.ambient.into())),
                "ambient",
            );
            report.check(
                ctx.set_value(ps, "lightCount", ShaderValue::Int(light_count)),
                "lightCount",
            );
            report.check(
                ctx.set_value(ps, "lights", ShaderValue::Data(light_bytes)),
                "lights",
            );
            report.check(ctx.set_texture(ps, "ShadowMap", shadow.map), "ShadowMap");
            report.check(
                ctx.set_sampler(ps, "ShadowSampler", shadow.sampler),
                "ShadowSampler",
            );

            report.merge(entity.draw(ctx, camera, mesh, material));
        }

        if let Some(sky) = &self.sky {
            match self.mesh(sky.mesh()) {
                Some(mesh) => report.merge(sky.draw(ctx, camera, mesh)),
                None => debug!("Sky mesh {:?} is missing", sky.mesh()),
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::CameraConfig,
        gfx::{
            geometry::{generate_cube, generate_sphere},
            rendering::{
                context::{CommandRecorder, RenderCommand},
                shaders::BuiltinPrograms,
            },
            scene::light::default_lights,
        },
    };
    use cgmath::SquareMatrix;

    fn scene(programs: &BuiltinPrograms) -> Scene {
        let mut scene = Scene::new(CameraManager::from_configs(&[CameraConfig::default()], 1.0));
        let cube = scene.add_mesh(Mesh::from_geometry("Cube", generate_cube()));
        let material = scene.add_material(Material::new(
            "Bronze",
            programs.entity_vs.clone(),
            programs.entity_ps.clone(),
            [1.0; 4],
            0.03,
        ));
        scene.add_entity(GameEntity::new("A", cube, material));
        scene.add_entity(GameEntity::new("B", cube, material));
        for light in default_lights(Vector3::new(0.0, -1.0, 1.0)) {
            scene.add_light(light);
        }
        scene
    }

    fn shadow() -> ShadowBinding {
        ShadowBinding {
            view: Matrix4::from_translation(Vector3::new(0.0, 0.0, 5.0)),
            projection: Matrix4::identity(),
            map: TextureId(9),
            sampler: SamplerId(4),
        }
    }

    #[test]
    fn test_ids_resolve_in_insertion_order() {
        let programs = BuiltinPrograms::new();
        let mut scene = scene(&programs);
        let sphere = scene.add_mesh(Mesh::from_geometry("Sphere", generate_cube()));
        assert_eq!(sphere, MeshId(1));
        assert_eq!(scene.find_mesh("Sphere"), Some(sphere));
        assert_eq!(scene.mesh(sphere).map(Mesh::name), Some("Sphere"));
        assert!(scene.mesh(MeshId(7)).is_none());
    }

    #[test]
    fn test_draw_binds_scene_values_for_each_entity() {
        let programs = BuiltinPrograms::new();
        let scene = scene(&programs);
        let mut recorder = CommandRecorder::new();
        let report = scene.draw(&mut recorder, &shadow());
        assert!(report.is_clean(), "unmatched: {:?}", report.unmatched());

        let draws = recorder
            .commands()
            .iter()
            .filter(|c| matches!(c, RenderCommand::DrawIndexed { .. }))
            .count();
        assert_eq!(draws, 2);

        let shadow_binds = recorder
            .commands()
            .iter()
            .filter(|c| {
                matches!(c, RenderCommand::BindTexture { texture, .. } if *texture == TextureId(9))
            })
            .count();
        assert_eq!(shadow_binds, 2);

        let vs = &programs.entity_vs;
        let data = recorder.last_upload(vs.id()).unwrap();
        let light_view = vs.constants().read_matrix(data, "lightView").map(Matrix4::from);
        assert_eq!(light_view, Some(shadow().view));
    }

    #[test]
    fn test_dangling_entity_is_skipped() {
        let programs = BuiltinPrograms::new();
        let mut scene = scene(&programs);
        scene.add_entity(GameEntity::new("Ghost", MeshId(40), MaterialId(0)));

        let mut recorder = CommandRecorder::new();
        scene.draw(&mut recorder, &shadow());
        let draws = recorder
            .commands()
            .iter()
            .filter(|c| matches!(c, RenderCommand::DrawIndexed { .. }))
            .count();
        assert_eq!(draws, 2);
    }

    #[test]
    fn test_reassigned_mesh_and_material_are_drawn() {
        let programs = BuiltinPrograms::new();
        let mut scene = scene(&programs);
        let sphere = scene.add_mesh(Mesh::from_geometry("Sphere", generate_sphere(16, 8)));
        let plain = scene.add_material(Material::new(
            "Plain",
            programs.sky_vs.clone(),
            programs.sky_ps.clone(),
            [1.0; 4],
            0.5,
        ));
        let entity = &mut scene.entities_mut()[0];
        entity.set_mesh(sphere);
        entity.set_material(plain);

        let mut recorder = CommandRecorder::new();
        scene.draw(&mut recorder, &shadow());

        let vertex_shaders: Vec<_> = recorder
            .commands()
            .iter()
            .filter_map(|c| match c {
                RenderCommand::SetVertexShader(id) => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(
            vertex_shaders,
            vec![programs.sky_vs.id(), programs.entity_vs.id()]
        );

        let meshes: Vec<MeshId> = recorder
            .commands()
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawIndexed { mesh, .. } => Some(*mesh),
                _ => None,
            })
            .collect();
        assert_eq!(meshes, vec![sphere, MeshId(0)]);
    }
}
