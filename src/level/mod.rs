//! Turning an imported level into physics bodies.
//!
//! - `partition` classifies the level's top-level nodes by name and sets up
//!   their shadow flags
//! - `binder` wraps each collidable node in a physics body descriptor

pub mod binder;
pub mod partition;

pub use binder::{BodyGroup, BodyKind, BodySource, NodeRef, PhysicsBodyDescriptor, ShapeApprox};
pub use partition::{NodeClass, Partition, classify};
