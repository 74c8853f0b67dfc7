//! levelwalk
//!
//! A third-person walkthrough of a single glTF level. The level's top-level
//! nodes are classified by name, collidable ones become rapier bodies, and a
//! capsule character walks over them under a soft-shadowed sun with a small
//! post-processing chain on top.
//!
//! High-level modules
//! - `config`: every tunable of the scene, with defaults
//! - `resources`: asset sources, glTF import and the coalescing load cache
//! - `data_structures`: transforms, the scene graph and GPU-side meshes
//! - `level`: name-based partitioning and physics body descriptors
//! - `physics`: the physics backend trait and its rapier implementation
//! - `input`, `camera`, `character`: player control
//! - `scene`: mounts the level and produces per-frame snapshots
//! - `context`, `pipelines`, `render`: wgpu setup and the render passes
//! - `flow`: the winit event loop tying everything together
//!

pub mod camera;
pub mod character;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod input;
pub mod level;
pub mod physics;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use winit::event::WindowEvent;
pub use winit::keyboard::KeyCode;
