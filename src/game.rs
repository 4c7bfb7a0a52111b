//! The demo scene
//!
//! [`Game`] builds the scene once from a [`DemoConfig`], animates it every
//! update and records each frame (shadow pass, then the main pass with the
//! sky last) into a [`CommandRecorder`]. It never touches the GPU itself:
//! resources come from a [`ResourceLoader`] and frames are replayed by the
//! render engine.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use crate::{
    config::DemoConfig,
    gfx::{
        camera::CameraManager,
        geometry::{
            generate_cube, generate_cylinder, generate_double_sided_quad, generate_helix,
            generate_quad, generate_sphere, generate_torus, GeometryData,
        },
        rendering::{
            context::{CommandRecorder, PassKind, RasterState, RenderContext},
            shaders::BuiltinPrograms,
            shadow::ShadowCaster,
        },
        resources::{
            loader::{ColorSpace, CubeFaces, ResourceLoader, SamplerId, SamplerPreset, TextureId},
            material::{Material, MaterialId},
        },
        scene::{default_lights, GameEntity, Mesh, MeshId, Scene, Sky},
    },
    input::InputProvider,
};

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const FLAT_NORMAL: [u8; 4] = [128, 128, 255, 255];

/// Cubemap face files in +X, -X, +Y, -Y, +Z, -Z order.
const SKY_FACES: [&str; 6] = ["right", "left", "up", "down", "front", "back"];

struct MeshSource {
    name: &'static str,
    file: &'static str,
    fallback: fn() -> GeometryData,
}

const MESHES: [MeshSource; 7] = [
    MeshSource { name: "Cube", file: "cube.obj", fallback: generate_cube },
    MeshSource { name: "Cylinder", file: "cylinder.obj", fallback: cylinder },
    MeshSource { name: "Helix", file: "helix.obj", fallback: helix },
    MeshSource { name: "Quad", file: "quad.obj", fallback: generate_quad },
    MeshSource { name: "Double Sided Quad", file: "quad_double_sided.obj", fallback: generate_double_sided_quad },
    MeshSource { name: "Sphere", file: "sphere.obj", fallback: sphere },
    MeshSource { name: "Torus", file: "torus.obj", fallback: torus },
];

fn cylinder() -> GeometryData {
    generate_cylinder(0.5, 2.0, 32)
}

fn helix() -> GeometryData {
    generate_helix(0.75, 0.15, 2.0, 2.0, 96, 12)
}

fn sphere() -> GeometryData {
    generate_sphere(32, 16)
}

fn torus() -> GeometryData {
    generate_torus(0.75, 0.25, 32, 16)
}

/// Texture set of one surface; the colors stand in for missing files.
struct SurfaceSource {
    name: &'static str,
    prefix: &'static str,
    roughness: f32,
    albedo: [u8; 4],
    metal: u8,
}

const SURFACES: [SurfaceSource; 3] = [
    SurfaceSource { name: "Bronze", prefix: "bronze", roughness: 0.03, albedo: [205, 127, 50, 255], metal: 255 },
    SurfaceSource { name: "Wood", prefix: "wood", roughness: 0.3, albedo: [133, 94, 66, 255], metal: 0 },
    SurfaceSource { name: "Cobblestone", prefix: "cobblestone", roughness: 0.3, albedo: [128, 128, 128, 255], metal: 0 },
];

/// Entities in the row: (mesh name, surface index).
const ROW: [(&str, usize); 7] = [
    ("Cube", 0),
    ("Sphere", 1),
    ("Cylinder", 2),
    ("Helix", 0),
    ("Torus", 1),
    ("Quad", 2),
    ("Double Sided Quad", 0),
];

const ROW_START_X: f32 = -12.0;
const ROW_SPACING: f32 = 3.0;
const FLOOR_HEIGHT: f32 = -1.5;
const FLOOR_SCALE: f32 = 50.0;

pub struct Game {
    scene: Scene,
    programs: BuiltinPrograms,
    shadow: ShadowCaster,
    background: [f32; 4],
    total_time: f32,
    floor: usize,
    reported: HashSet<String>,
}

impl Game {
    /// Builds the demo scene. Missing asset files are replaced by procedural
    /// meshes and solid-color textures, so setup itself cannot fail.
    pub fn new(config: &DemoConfig, loader: &mut dyn ResourceLoader, aspect_ratio: f32) -> Self {
        let programs = BuiltinPrograms::new();
        let cameras = CameraManager::from_configs(&config.cameras, aspect_ratio);
        let mut scene = Scene::new(cameras);
        scene.set_ambient(config.ambient);

        let models = config.assets_dir.join("Models");
        for source in &MESHES {
            scene.add_mesh(load_mesh(&models, source));
        }

        let textures = config.assets_dir.join("Textures");
        let sampler = loader.create_sampler(SamplerPreset::Anisotropic);
        let materials: Vec<MaterialId> = SURFACES
            .iter()
            .map(|surface| {
                let material = build_material(loader, &programs, &textures, surface, sampler);
                scene.add_material(material)
            })
            .collect();

        for (i, (mesh_name, surface)) in ROW.iter().enumerate() {
            let Some(mesh) = scene.find_mesh(mesh_name) else {
                continue;
            };
            let mut entity = GameEntity::new(mesh_name, mesh, materials[*surface]);
            entity
                .transform_mut()
                .move_absolute([ROW_START_X + ROW_SPACING * i as f32, 0.0, 0.0]);
            scene.add_entity(entity);
        }

        let quad = scene.find_mesh("Quad").unwrap_or(MeshId(0));
        let mut floor = GameEntity::new("Floor", quad, materials[1]);
        floor.transform_mut().move_absolute([0.0, FLOOR_HEIGHT, 0.0]);
        floor.transform_mut().scale_by([FLOOR_SCALE; 3]);
        let floor = scene.add_entity(floor);

        let shadow_map = loader.create_shadow_map(config.shadow.resolution);
        let shadow_sampler = loader.create_sampler(SamplerPreset::ShadowComparison);
        let shadow = ShadowCaster::new(
            &config.shadow,
            programs.shadow_vs.clone(),
            shadow_map,
            shadow_sampler,
        );

        for light in default_lights(shadow.direction()) {
            scene.add_light(light);
        }

        let sky_mesh = scene.find_mesh("Cube").unwrap_or(MeshId(0));
        let cubemap = load_sky(loader, &config.assets_dir.join("Skies").join("Cold Sunset"));
        scene.set_sky(Sky::new(
            sky_mesh,
            cubemap,
            sampler,
            programs.sky_vs.clone(),
            programs.sky_ps.clone(),
        ));

        info!(
            "Scene ready: {} meshes, {} materials, {} entities, {} lights",
            scene.meshes().count(),
            scene.materials().len(),
            scene.entities().len(),
            scene.lights().len()
        );

        Self {
            scene,
            programs,
            shadow,
            background: config.background,
            total_time: 0.0,
            floor,
            reported: HashSet::new(),
        }
    }

    /// Advances the animation and applies camera input.
    pub fn update(&mut self, delta_time: f32, input: &dyn InputProvider) {
        self.total_time += delta_time;
        let t = self.total_time;

        for (i, entity) in self.scene.entities_mut().iter_mut().enumerate() {
            if i != self.floor {
                entity.transform_mut().rotate([0.0, delta_time, 0.0]);
            }
        }

        self.scene.cameras.update(delta_time, input);

        let entities = self.scene.entities_mut();
        if let Some(bobbing) = entities.get_mut(1) {
            let x = bobbing.transform().position().x;
            bobbing.transform_mut().set_position([x, t.sin(), 0.0]);
        }
        if let Some(orbiting) = entities.get_mut(2) {
            orbiting
                .transform_mut()
                .set_position([2.0 * t.sin(), 0.0, -6.0]);
        }
    }

    /// Records a full frame: shadow pass, then entities and sky.
    pub fn draw(&mut self, recorder: &mut CommandRecorder) {
        recorder.clear();

        self.shadow.record_pass(recorder, &self.scene);

        recorder.begin_pass(PassKind::Main);
        recorder.set_raster_state(RasterState::Default);
        let report = self.scene.draw(recorder, &self.shadow.binding());
        recorder.end_pass();

        for name in report.unmatched() {
            if self.reported.insert(name.clone()) {
                debug!("Shader slot '{}' matched nothing", name);
            }
        }
    }

    pub fn on_resize(&mut self, aspect_ratio: f32) {
        self.scene.cameras.on_resize(aspect_ratio);
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn shadow(&self) -> &ShadowCaster {
        &self.shadow
    }

    pub fn programs(&self) -> &BuiltinPrograms {
        &self.programs
    }

    pub fn background(&self) -> [f32; 4] {
        self.background
    }

    pub fn background_mut(&mut self) -> &mut [f32; 4] {
        &mut self.background
    }

    pub fn total_time(&self) -> f32 {
        self.total_time
    }
}

fn load_mesh(dir: &Path, source: &MeshSource) -> Mesh {
    let path = dir.join(source.file);
    match Mesh::from_obj_file(source.name, &path) {
        Ok(mesh) => mesh,
        Err(error) => {
            warn!("{}: {}, using a generated {}", path.display(), error, source.name);
            Mesh::from_geometry(source.name, (source.fallback)())
        }
    }
}

fn load_texture_or(
    loader: &mut dyn ResourceLoader,
    path: PathBuf,
    color_space: ColorSpace,
    fallback: [u8; 4],
) -> TextureId {
    match loader.load_texture(&path, color_space) {
        Ok(texture) => texture,
        Err(error) => {
            warn!("{}, using a solid color", error);
            loader.solid_texture(&path.display().to_string(), fallback, color_space)
        }
    }
}

fn build_material(
    loader: &mut dyn ResourceLoader,
    programs: &BuiltinPrograms,
    dir: &Path,
    surface: &SurfaceSource,
    sampler: SamplerId,
) -> Material {
    let texture = |suffix: &str| dir.join(format!("{}_{}.png", surface.prefix, suffix));
    let roughness = (surface.roughness * 255.0) as u8;

    let mut material = Material::new(
        surface.name,
        programs.entity_vs.clone(),
        programs.entity_ps.clone(),
        WHITE,
        surface.roughness,
    );
    material.add_sampler("BasicSampler", sampler);
    material.add_texture(
        "Albedo",
        load_texture_or(loader, texture("albedo"), ColorSpace::Srgb, surface.albedo),
    );
    material.add_texture(
        "NormalMap",
        load_texture_or(loader, texture("normals"), ColorSpace::Linear, FLAT_NORMAL),
    );
    material.add_texture(
        "RoughnessMap",
        load_texture_or(
            loader,
            texture("roughness"),
            ColorSpace::Linear,
            [roughness, roughness, roughness, 255],
        ),
    );
    material.add_texture(
        "MetalMap",
        load_texture_or(
            loader,
            texture("metal"),
            ColorSpace::Linear,
            [surface.metal, surface.metal, surface.metal, 255],
        ),
    );
    material
}

fn load_sky(loader: &mut dyn ResourceLoader, dir: &Path) -> TextureId {
    let faces: CubeFaces<PathBuf> = SKY_FACES.map(|face| dir.join(format!("{face}.png")));
    match loader.load_cubemap(&faces) {
        Ok(cubemap) => cubemap,
        Err(error) => {
            warn!("{}, using a gradient sky", error);
            let horizon = [214, 160, 140, 255];
            loader.solid_cubemap(
                "Gradient Sky",
                [horizon, horizon, [96, 120, 170, 255], [40, 36, 44, 255], horizon, horizon],
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gfx::{
            rendering::context::RenderCommand,
            resources::loader::TextureError,
        },
        input::InputState,
    };
    use approx::assert_abs_diff_eq;
    use cgmath::Matrix4;

    /// Hands out sequential ids; every file load fails.
    #[derive(Default)]
    struct FakeLoader {
        next_texture: u32,
        next_sampler: u32,
        solids: usize,
    }

    impl FakeLoader {
        fn texture(&mut self) -> TextureId {
            self.next_texture += 1;
            TextureId(self.next_texture - 1)
        }

        fn missing(path: &Path) -> TextureError {
            TextureError::Image {
                path: path.to_path_buf(),
                source: image::ImageError::IoError(std::io::Error::from(
                    std::io::ErrorKind::NotFound,
                )),
            }
        }
    }

    impl ResourceLoader for FakeLoader {
        fn load_texture(&mut self, path: &Path, _: ColorSpace) -> Result<TextureId, TextureError> {
            Err(Self::missing(path))
        }

        fn solid_texture(&mut self, _: &str, _: [u8; 4], _: ColorSpace) -> TextureId {
            self.solids += 1;
            self.texture()
        }

        fn load_cubemap(&mut self, faces: &CubeFaces<PathBuf>) -> Result<TextureId, TextureError> {
            Err(Self::missing(&faces[0]))
        }

        fn solid_cubemap(&mut self, _: &str, _: CubeFaces<[u8; 4]>) -> TextureId {
            self.texture()
        }

        fn create_sampler(&mut self, _: SamplerPreset) -> SamplerId {
            self.next_sampler += 1;
            SamplerId(self.next_sampler - 1)
        }

        fn create_shadow_map(&mut self, _: u32) -> TextureId {
            self.texture()
        }
    }

    fn game() -> (Game, FakeLoader) {
        let config = DemoConfig::default().with_assets_dir("does/not/exist");
        let mut loader = FakeLoader::default();
        let game = Game::new(&config, &mut loader, 16.0 / 9.0);
        (game, loader)
    }

    fn matrix(bytes: &[u8], offset: usize) -> Matrix4<f32> {
        let floats: &[f32] = bytemuck::cast_slice(&bytes[offset..offset + 64]);
        let mut m = [[0.0f32; 4]; 4];
        for (i, column) in m.iter_mut().enumerate() {
            column.copy_from_slice(&floats[i * 4..i * 4 + 4]);
        }
        m.into()
    }

    #[test]
    fn test_setup_falls_back_to_generated_assets() {
        let (game, loader) = game();
        let scene = game.scene();

        assert_eq!(scene.meshes().count(), 7);
        assert_eq!(scene.materials().len(), 3);
        // seven in the row plus the floor
        assert_eq!(scene.entities().len(), 8);
        assert_eq!(loader.solids, 12);
        assert!(scene.sky().is_some());
        assert_eq!(scene.lights().len(), 3);
    }

    #[test]
    fn test_row_and_floor_placement() {
        let (game, _) = game();
        let entities = game.scene().entities();

        assert_abs_diff_eq!(entities[0].transform().position().x, -12.0);
        assert_abs_diff_eq!(entities[6].transform().position().x, 6.0);

        let floor = entities[7].transform();
        assert_abs_diff_eq!(floor.position().y, FLOOR_HEIGHT);
        assert_abs_diff_eq!(floor.scale().x, FLOOR_SCALE);
    }

    #[test]
    fn test_material_roughness_values() {
        let (game, _) = game();
        let roughness: Vec<f32> = game.scene().materials().iter().map(|m| m.roughness()).collect();
        assert_eq!(roughness, vec![0.03, 0.3, 0.3]);
    }

    #[test]
    fn test_update_animates_everything_but_the_floor() {
        let (mut game, _) = game();
        let input = InputState::new();
        let dt = 0.5;
        game.update(dt, &input);

        let entities = game.scene().entities();
        assert_abs_diff_eq!(entities[0].transform().pitch_yaw_roll().y, dt, epsilon = 1e-6);
        assert_abs_diff_eq!(entities[7].transform().pitch_yaw_roll().y, 0.0);

        let bobbing = entities[1].transform().position();
        assert_abs_diff_eq!(bobbing.x, -9.0);
        assert_abs_diff_eq!(bobbing.y, dt.sin(), epsilon = 1e-6);

        let orbiting = entities[2].transform().position();
        assert_abs_diff_eq!(orbiting.x, 2.0 * dt.sin(), epsilon = 1e-6);
        assert_abs_diff_eq!(orbiting.z, -6.0);
    }

    #[test]
    fn test_shadow_pass_binds_no_pixel_stage() {
        let (mut game, _) = game();
        let mut recorder = CommandRecorder::new();
        game.draw(&mut recorder);

        let commands = recorder.commands();
        let end = commands
            .iter()
            .position(|c| *c == RenderCommand::EndPass)
            .unwrap();
        let shadow_pass = &commands[..end];

        assert_eq!(shadow_pass[0], RenderCommand::BeginPass(PassKind::Shadow));
        assert!(shadow_pass.iter().all(|c| !matches!(
            c,
            RenderCommand::SetPixelShader(Some(_))
                | RenderCommand::BindTexture { .. }
                | RenderCommand::BindSampler { .. }
        )));
        let shadow_vs = game.programs().shadow_vs.id();
        assert!(shadow_pass.iter().all(|c| match c {
            RenderCommand::UploadConstants { program, .. } => *program == shadow_vs,
            _ => true,
        }));
        let draws = shadow_pass
            .iter()
            .filter(|c| matches!(c, RenderCommand::DrawIndexed { .. }))
            .count();
        assert_eq!(draws, game.scene().entities().len());
    }

    #[test]
    fn test_main_pass_uses_setup_light_matrices() {
        let (mut game, _) = game();
        let view = game.shadow().view();
        let projection = game.shadow().projection();
        let input = InputState::new();
        let mut recorder = CommandRecorder::new();

        for _ in 0..3 {
            game.update(0.25, &input);
            game.draw(&mut recorder);
        }

        let entity_vs = game.programs().entity_vs.clone();
        let layout = entity_vs.constants();
        let data = recorder.last_upload(entity_vs.id()).unwrap();
        let offset = |name: &str| layout.field(name).unwrap().offset as usize;

        assert_eq!(matrix(data, offset("lightView")), view);
        assert_eq!(matrix(data, offset("lightProjection")), projection);
    }

    #[test]
    fn test_sky_is_drawn_last() {
        let (mut game, _) = game();
        let mut recorder = CommandRecorder::new();
        game.draw(&mut recorder);

        let sky_vs = game.programs().sky_vs.id();
        let last_vs = recorder
            .commands()
            .iter()
            .rev()
            .find_map(|c| match c {
                RenderCommand::SetVertexShader(id) => Some(*id),
                _ => None,
            });
        assert_eq!(last_vs, Some(sky_vs));
        assert_eq!(recorder.commands().last(), Some(&RenderCommand::EndPass));
    }

    #[test]
    fn test_main_pass_entities_draw_without_depth_bias() {
        let (mut game, _) = game();
        let mut recorder = CommandRecorder::new();
        game.draw(&mut recorder);

        let mut in_main = false;
        let mut raster = RasterState::Default;
        let mut states = Vec::new();
        for command in recorder.commands() {
            match command {
                RenderCommand::BeginPass(kind) => in_main = *kind == PassKind::Main,
                RenderCommand::EndPass => in_main = false,
                RenderCommand::SetRasterState(state) => raster = *state,
                RenderCommand::DrawIndexed { .. } if in_main => states.push(raster),
                _ => (),
            }
        }

        let entities = game.scene().entities().len();
        assert_eq!(states.len(), entities + 1);
        assert!(states[..entities].iter().all(|s| *s == RasterState::Default));
        assert_eq!(states[entities], RasterState::Sky);
        assert_eq!(raster, RasterState::Default);
    }
}
