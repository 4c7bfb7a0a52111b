//! # Scene
//!
//! Everything the demo draws: meshes and materials in shared lists, entities
//! that reference them by id, lights, an optional sky and the camera pool.
//!
//! - [`Scene`] - container and main-pass recording
//! - [`GameEntity`] - one mesh + material at one [`Transform`](crate::gfx::transform::Transform)
//! - [`Mesh`] - CPU geometry, from arrays, OBJ data or [`geometry`](crate::gfx::geometry)
//! - [`Light`] - directional, point and spot lights
//! - [`Sky`] - cubemap backdrop

pub mod entity;
pub mod light;
pub mod mesh;
pub mod scene;
pub mod sky;
pub mod vertex;

pub use entity::GameEntity;
pub use light::{default_lights, Light, LightKind};
pub use mesh::{Mesh, MeshError, MeshId};
pub use scene::{Scene, ShadowBinding};
pub use sky::Sky;
pub use vertex::Vertex3D;
