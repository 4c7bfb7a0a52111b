//! Window, event loop and frame driver
//!
//! [`VantageApp`] owns the window and everything created with it. Each
//! redraw builds the debug UI, updates and records the [`Game`] and hands the
//! recorded frame plus the UI overlay to the [`RenderEngine`].

use std::{sync::Arc, time::Instant};

use anyhow::{Context, Result};
use log::{error, info};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    config::{DemoConfig, ShadowConfig},
    game::Game,
    gfx::rendering::{context::CommandRecorder, render_engine::RenderEngine},
    input::InputState,
    ui::{debug_panel, PanelState, UiManager},
};

pub struct VantageApp {
    config: DemoConfig,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    ui_manager: Option<UiManager>,
    game: Option<Game>,
    input: InputState,
    recorder: CommandRecorder,
    panel: PanelState,
    last_update: Instant,
    error: Option<anyhow::Error>,
}

impl VantageApp {
    pub fn new(config: DemoConfig) -> Self {
        Self {
            config,
            window: None,
            render_engine: None,
            ui_manager: None,
            game: None,
            input: InputState::new(),
            recorder: CommandRecorder::new(),
            panel: PanelState::default(),
            last_update: Instant::now(),
            error: None,
        }
    }

    /// Runs the event loop until the window closes or Escape is pressed.
    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create the event loop")?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop
            .run_app(&mut self)
            .context("event loop terminated abnormally")?;

        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_config = &self.config.window;
        let window = event_loop
            .create_window(
                WindowAttributes::default()
                    .with_title(window_config.title.clone())
                    .with_inner_size(PhysicalSize::new(window_config.width, window_config.height)),
            )
            .context("failed to create the window")?;
        let window = Arc::new(window);

        let PhysicalSize { width, height } = window.inner_size();
        let mut render_engine = pollster::block_on(RenderEngine::new(
            window.clone(),
            width,
            height,
            window_config.vsync,
            depth_bias(&self.config.shadow),
        ))
        .context("failed to initialize the renderer")?;

        let game = Game::new(&self.config, &mut render_engine, aspect_ratio(width, height));
        render_engine.upload_meshes(game.scene().meshes());

        let ui_manager = UiManager::new(
            render_engine.device(),
            render_engine.queue(),
            render_engine.surface_format(),
            &window,
        );

        info!("Running at {}x{}", width, height);
        self.window = Some(window);
        self.render_engine = Some(render_engine);
        self.ui_manager = Some(ui_manager);
        self.game = Some(game);
        self.last_update = Instant::now();
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let (Some(window), Some(render_engine), Some(ui_manager), Some(game)) = (
            self.window.as_ref(),
            self.render_engine.as_mut(),
            self.ui_manager.as_mut(),
            self.game.as_mut(),
        ) else {
            return Ok(());
        };

        let now = Instant::now();
        let delta_time = (now - self.last_update).as_secs_f32();
        self.last_update = now;

        let size = render_engine.get_surface_size();
        let panel = &mut self.panel;
        let capture = ui_manager.update_logic(window, |ui| debug_panel(ui, game, panel, size));
        self.input.set_keyboard_capture(capture.keyboard);
        self.input.set_mouse_capture(capture.mouse);

        game.update(delta_time, &self.input);
        self.input.begin_frame();

        game.draw(&mut self.recorder);
        render_engine.set_clear_color(game.background());
        let draw_ui = |device: &wgpu::Device,
                       queue: &wgpu::Queue,
                       encoder: &mut wgpu::CommandEncoder,
                       view: &wgpu::TextureView| {
            ui_manager.render_display_only(device, queue, encoder, view)
        };
        render_engine.render_frame(&self.recorder, Some(draw_ui))?;
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for VantageApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if let (Some(window), Some(ui_manager)) = (self.window.as_ref(), self.ui_manager.as_mut()) {
            ui_manager.handle_input(window, window_id, &event);
        }
        self.input.handle_window_event(&event);

        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            }
            | WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(render_engine) = self.render_engine.as_mut() {
                    render_engine.resize(width, height);
                }
                if width > 0 && height > 0 {
                    if let Some(game) = self.game.as_mut() {
                        game.on_resize(aspect_ratio(width, height));
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, err);
                }
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: winit::event::DeviceEvent,
    ) {
        self.input.handle_device_event(&event);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width as f32 / height.max(1) as f32
}

/// Rasterizer bias applied while rendering the shadow map.
fn depth_bias(shadow: &ShadowConfig) -> wgpu::DepthBiasState {
    wgpu::DepthBiasState {
        constant: shadow.depth_bias,
        slope_scale: shadow.slope_scaled_bias,
        clamp: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_bias_comes_from_config() {
        let bias = depth_bias(&ShadowConfig::default());
        assert_eq!(bias.constant, 100);
        assert_eq!(bias.slope_scale, 1.0);
    }

    #[test]
    fn test_aspect_ratio_survives_zero_height() {
        assert_eq!(aspect_ratio(1280, 720), 1280.0 / 720.0);
        assert_eq!(aspect_ratio(800, 0), 800.0);
    }
}
