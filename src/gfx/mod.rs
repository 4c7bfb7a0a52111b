//! # Graphics Module
//!
//! Everything needed to put the demo scene on screen.
//!
//! - **Camera System** ([`camera`]) - fly cameras and the active-camera pool
//! - **Rendering** ([`rendering`]) - the recording context, pipelines, shadow pass and engine
//! - **Scene** ([`scene`]) - meshes, entities, lights and the sky
//! - **Resources** ([`resources`]) - shader reflection, materials, textures
//!
//! Scene code never touches wgpu; it records into a
//! [`CommandRecorder`](rendering::CommandRecorder) which the
//! [`RenderEngine`] replays each frame.

pub mod cached;
pub mod camera;
pub mod geometry;
pub mod math;
pub mod rendering;
pub mod resources;
pub mod scene;
pub mod transform;

// Re-export commonly used types
pub use camera::{Camera, CameraManager};
pub use rendering::render_engine::RenderEngine;
pub use transform::Transform;
