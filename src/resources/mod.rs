//! Loading of level assets from external files.
//!
//! - `source` resolves asset names to bytes (the static-assets directory, or
//!   anything else implementing [`AssetSource`])
//! - `gltf_loader` turns glTF/GLB bytes into a [`crate::data_structures::scene_graph::SceneAsset`]
//! - `cache` coalesces and caches loads per path

pub mod cache;
pub mod gltf_loader;
pub mod source;

pub use cache::{AssetLoader, SharedLoad};
pub use source::{AssetSource, FsSource};
