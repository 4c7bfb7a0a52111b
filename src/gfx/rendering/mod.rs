// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! Scene code records frames through the [`RenderContext`] seam; the
//! [`RenderEngine`] replays them on the GPU with pipelines from the
//! [`PipelineManager`].

pub mod context;
pub mod pipeline_manager;
pub mod render_engine;
pub mod shaders;
pub mod shadow;

// Re-export main types
pub use context::{BindReport, CommandRecorder, PassKind, RasterState, RenderCommand, RenderContext};
pub use pipeline_manager::{PipelineKey, PipelineManager, PipelineStats};
pub use render_engine::{RenderEngine, RenderError};
pub use shaders::BuiltinPrograms;
pub use shadow::ShadowCaster;
