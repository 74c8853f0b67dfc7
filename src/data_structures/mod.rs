//! Level data structures: transforms, the imported scene graph and the GPU
//! side of meshes.
//!
//! - `instance` holds position/rotation/scale transforms and their composition
//! - `scene_graph` holds the CPU-side level asset, its named nodes and meshes
//! - `model` holds vertex layouts and uploaded meshes
//! - `texture` creates depth, shadow and colour targets

pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
