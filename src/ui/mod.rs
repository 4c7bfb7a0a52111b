//! # User Interface Module
//!
//! Dear ImGui overlay for the demo.
//!
//! - [`UiManager`] - ImGui integration with winit and wgpu, input capture
//! - [`panel`] - the debug panel editing cameras, lights and materials
//!
//! When ImGui wants the mouse or keyboard, the application marks that input
//! as captured so the camera ignores it.

pub mod manager;
pub mod panel;

// Re-export main types
pub use manager::{InputCapture, UiManager};
pub use panel::{debug_panel, PanelState};
