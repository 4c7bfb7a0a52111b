// src/lib.rs
//! Vantage
//!
//! A small real-time 3D scene renderer built on wgpu and winit: fly
//! cameras, textured materials, directional/point/spot lights, a shadow map,
//! a skybox and an ImGui debug panel.

pub mod app;
pub mod config;
pub mod game;
pub mod gfx;
pub mod input;
pub mod ui;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::VantageApp;
pub use config::DemoConfig;
pub use game::Game;
