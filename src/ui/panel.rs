// src/ui/panel.rs
//! Debug panel for the demo scene
//!
//! One window with frame stats, the background color, camera controls,
//! light and material editors, and shadow map details.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use cgmath::Vector3;
use imgui::{AngleSlider, Drag, TreeNodeFlags};

use crate::{
    game::Game,
    gfx::scene::{Light, LightKind},
};

/// Panel state that outlives a single frame.
#[derive(Debug, Default)]
pub struct PanelState {
    pub show_demo_window: bool,
}

/// Builds the debug panel for this frame.
pub fn debug_panel(ui: &imgui::Ui, game: &mut Game, state: &mut PanelState, window_size: (u32, u32)) {
    let display_size = ui.io().display_size;
    if display_size[0] <= 0.0 || display_size[1] <= 0.0 {
        return;
    }

    ui.window("Debug")
        .size([420.0, display_size[1] * 0.8], imgui::Condition::FirstUseEver)
        .position([20.0, 20.0], imgui::Condition::FirstUseEver)
        .collapsible(true)
        .build(|| {
            ui.text(format!("Framerate: {:.1} fps", ui.io().framerate));
            ui.text(format!("Window: {}x{}", window_size.0, window_size.1));
            ui.color_edit4("Background", game.background_mut());
            ui.separator();

            render_camera_controls(ui, game);
            render_light_controls(ui, game);
            render_material_controls(ui, game);
            render_shadow_info(ui, game);

            ui.separator();
            if ui.button("Toggle demo window") {
                state.show_demo_window = !state.show_demo_window;
            }
        });

    if state.show_demo_window {
        ui.show_demo_window(&mut state.show_demo_window);
    }
}

fn render_camera_controls(ui: &imgui::Ui, game: &mut Game) {
    if !ui.collapsing_header("Camera", TreeNodeFlags::DEFAULT_OPEN) {
        return;
    }
    let cameras = &mut game.scene_mut().cameras;

    let mut selected = None;
    for i in 0..cameras.len() {
        if ui.radio_button_bool(format!("Camera {}", i + 1), cameras.active_index() == i) {
            selected = Some(i);
        }
        if i + 1 < cameras.len() {
            ui.same_line();
        }
    }
    if let Some(i) = selected {
        cameras.set_active(i);
    }

    let camera = cameras.active_mut();
    let mut position: [f32; 3] = camera.transform().position().into();
    if Drag::new("Position").speed(0.01).build_array(ui, &mut position) {
        camera.transform_mut().set_position(position);
    }

    let mut rotation: [f32; 3] = camera.transform().pitch_yaw_roll().into();
    if Drag::new("Rotation (radians)")
        .speed(0.01)
        .build_array(ui, &mut rotation)
    {
        rotation[0] = rotation[0].clamp(-FRAC_PI_2, FRAC_PI_2);
        camera.transform_mut().set_rotation(rotation);
    }

    let mut fov = camera.fov();
    if Drag::new("FOV")
        .range(FRAC_PI_4, FRAC_PI_2)
        .speed(0.01)
        .build(ui, &mut fov)
    {
        camera.set_fov(fov);
    }

    let mut clip = [camera.near_clip(), camera.far_clip()];
    if Drag::new("Near / far clip")
        .range(0.01, 1000.0)
        .speed(0.05)
        .build_array(ui, &mut clip)
    {
        camera.set_clip_planes(clip[0], clip[1].max(clip[0] + 0.01));
    }

    let mut move_speed = camera.move_speed();
    if ui.slider("Move speed", 0.1, 20.0, &mut move_speed) {
        camera.set_move_speed(move_speed);
    }
    let mut look_speed = camera.look_speed();
    if ui.slider("Look speed", 0.0005, 0.02, &mut look_speed) {
        camera.set_look_speed(look_speed);
    }
}

fn render_light_controls(ui: &imgui::Ui, game: &mut Game) {
    if !ui.collapsing_header("Lights", TreeNodeFlags::empty()) {
        return;
    }
    let scene = game.scene_mut();

    let mut ambient: [f32; 3] = scene.ambient().into();
    if ui.color_edit3("Ambient", &mut ambient) {
        scene.set_ambient(ambient);
    }

    for (i, light) in scene.lights_mut().iter_mut().enumerate() {
        let _id = ui.push_id_usize(i);
        if let Some(_node) = ui.tree_node(format!("Light {} ({})", i + 1, light.kind.label())) {
            render_light(ui, light);
        }
    }
}

fn render_light(ui: &imgui::Ui, light: &mut Light) {
    let mut renormalize = false;
    match &mut light.kind {
        LightKind::Directional { direction } => {
            renormalize |= drag_vector(ui, "Direction", direction, 0.1);
        }
        LightKind::Point { position, range } => {
            drag_vector(ui, "Position", position, 0.1);
            ui.slider("Range", 0.1, 50.0, range);
        }
        LightKind::Spot {
            position,
            direction,
            range,
            inner_angle,
            outer_angle,
        } => {
            renormalize |= drag_vector(ui, "Direction", direction, 0.1);
            drag_vector(ui, "Position", position, 0.1);
            ui.slider("Range", 0.1, 50.0, range);
            AngleSlider::new("Inner angle").build(ui, inner_angle);
            AngleSlider::new("Outer angle").build(ui, outer_angle);
            *outer_angle = outer_angle.max(*inner_angle);
        }
    }
    if renormalize {
        light.normalize_direction();
    }

    let mut color: [f32; 3] = light.color.into();
    if ui.color_edit3("Color", &mut color) {
        light.color = color.into();
    }
    ui.slider("Intensity", 0.0, 20.0, &mut light.intensity);
}

fn drag_vector(ui: &imgui::Ui, label: &str, value: &mut Vector3<f32>, speed: f32) -> bool {
    let mut array: [f32; 3] = (*value).into();
    let changed = Drag::new(label).speed(speed).build_array(ui, &mut array);
    if changed {
        *value = array.into();
    }
    changed
}

fn render_material_controls(ui: &imgui::Ui, game: &mut Game) {
    if !ui.collapsing_header("Materials", TreeNodeFlags::empty()) {
        return;
    }

    for (i, material) in game.scene_mut().materials_mut().iter_mut().enumerate() {
        let _id = ui.push_id_usize(i);
        let Some(_node) = ui.tree_node(material.name().to_string()) else {
            continue;
        };

        let mut tint = material.color_tint();
        if ui.color_edit4("Tint", &mut tint) {
            material.set_color_tint(tint);
        }
        let mut roughness = material.roughness();
        if ui.slider("Roughness", 0.0, 1.0, &mut roughness) {
            material.set_roughness(roughness);
        }
        let mut offset = material.uv_offset();
        if Drag::new("UV offset").speed(0.01).build_array(ui, &mut offset) {
            material.set_uv_offset(offset);
        }
        let mut scale = material.uv_scale();
        if Drag::new("UV scale").speed(0.01).build_array(ui, &mut scale) {
            material.set_uv_scale(scale);
        }
    }
}

fn render_shadow_info(ui: &imgui::Ui, game: &Game) {
    if !ui.collapsing_header("Shadow map", TreeNodeFlags::empty()) {
        return;
    }
    let shadow = game.shadow();
    let position = shadow.light_position();
    let direction = shadow.direction();

    ui.text(format!("Resolution: {0}x{0}", shadow.resolution()));
    ui.text(format!(
        "Light position: ({:.1}, {:.1}, {:.1})",
        position.x, position.y, position.z
    ));
    ui.text(format!(
        "Direction: ({:.2}, {:.2}, {:.2})",
        direction.x, direction.y, direction.z
    ));
}
