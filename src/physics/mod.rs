//! Physics collaborator.
//!
//! The scene talks to the physics engine only through [`PhysicsBackend`]:
//! descriptors and character moves go in, poses and debug outlines come out.
//! [`RapierWorld`] is the rapier3d-backed implementation used by the app.

use cgmath::Vector3;

use crate::{data_structures::instance::Instance, level::PhysicsBodyDescriptor};

pub mod rapier;

pub use rapier::RapierWorld;

/// Capsule the character controller moves around.
#[derive(Clone, Debug)]
pub struct CharacterBody {
    pub half_height: f32,
    pub radius: f32,
    /// Gap kept between the capsule and the ground.
    pub float_height: f32,
    pub position: Vector3<f32>,
}

/// What actually happened when the character tried to move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CharacterMotion {
    pub translation: Vector3<f32>,
    pub grounded: bool,
}

impl Default for CharacterMotion {
    fn default() -> Self {
        Self {
            translation: Vector3::new(0.0, 0.0, 0.0),
            grounded: false,
        }
    }
}

/// A coloured line segment for the physics debug overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DebugLine {
    pub from: [f32; 3],
    pub to: [f32; 3],
    pub color: [f32; 4],
}

pub trait PhysicsBackend {
    type Handle: Copy + Eq + std::fmt::Debug;

    /// Creates the body and its collider. Fails when the geometry cannot make
    /// the requested shape (for example a node without triangles).
    fn insert_body(&mut self, body: &PhysicsBodyDescriptor) -> anyhow::Result<Self::Handle>;

    fn remove_body(&mut self, handle: Self::Handle);

    /// Current world pose of a body, unscaled.
    fn body_pose(&self, handle: Self::Handle) -> Option<Instance>;

    /// Number of bodies currently in the world, characters included.
    fn body_count(&self) -> usize;

    fn insert_character(&mut self, body: &CharacterBody) -> Self::Handle;

    /// Moves the character by at most `desired`, sliding along obstacles.
    /// The move takes effect on the next [`PhysicsBackend::step`].
    fn move_character(
        &mut self,
        handle: Self::Handle,
        desired: Vector3<f32>,
        dt: f32,
    ) -> CharacterMotion;

    fn step(&mut self, dt: f32);

    fn set_debug(&mut self, enabled: bool);

    fn debug_enabled(&self) -> bool;

    /// Collider outlines, empty unless debug is enabled.
    fn debug_lines(&self) -> Vec<DebugLine>;
}
