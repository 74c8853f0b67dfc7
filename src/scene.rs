//! The walkable level scene.
//!
//! [`LevelScene`] ties the pieces together: it mounts the shared level asset,
//! binds its collidable nodes into the physics world, drives the character
//! and the follow camera, and hands the renderer a [`FrameSnapshot`] each
//! frame.
//!
//! # Mount lifecycle
//!
//! 1. [`LevelScene::mount`] requests the asset from the loader and enters
//!    [`Mount::Pending`]. Ground, lighting and post-processing are already
//!    active, nothing from the asset is drawn.
//! 2. [`LevelScene::poll`] peeks at the shared load without driving it. Once
//!    it has resolved, the asset is partitioned and bound exactly once and
//!    the mount becomes [`Mount::Ready`] or [`Mount::Failed`].
//! 3. [`LevelScene::unmount`] removes every inserted body. A pending mount
//!    just drops its handle; the load itself keeps running for other users
//!    of the cache and never writes into this scene.

use std::sync::Arc;

use cgmath::{Matrix4, Point3, SquareMatrix};

use crate::{
    camera::FollowCamera,
    character::CharacterController,
    config::SceneConfig,
    data_structures::{instance::Instance, scene_graph::SceneAsset},
    error::LoadError,
    input::{InputState, KeyOutcome},
    level::{
        Partition, PhysicsBodyDescriptor,
        binder::{self, node_world},
    },
    physics::{DebugLine, PhysicsBackend},
    resources::{AssetLoader, SharedLoad},
};

/// A body inserted for one bound node.
#[derive(Debug)]
pub struct BoundBody<H> {
    pub descriptor: PhysicsBodyDescriptor,
    /// `None` when the physics backend rejected the shape.
    pub handle: Option<H>,
}

/// A level asset whose collidable nodes live in the physics world.
#[derive(Debug)]
pub struct BoundLevel<H> {
    pub asset: Arc<SceneAsset>,
    pub partition: Partition,
    pub bodies: Vec<BoundBody<H>>,
}

impl<H: Copy> BoundLevel<H> {
    pub fn handles(&self) -> impl Iterator<Item = H> + '_ {
        self.bodies.iter().filter_map(|body| body.handle)
    }

    /// The bound body for a root child, if it has one.
    pub fn body_for(&self, index: usize) -> Option<&BoundBody<H>> {
        self.bodies.iter().find(|body| {
            body.descriptor
                .source_index()
                .is_some_and(|source| source == index)
        })
    }
}

pub enum Mount<H> {
    Unmounted,
    /// Waiting on the shared load; the placeholder is shown.
    Pending(SharedLoad),
    Ready(BoundLevel<H>),
    Failed(LoadError),
}

impl<H> Mount<H> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Mount::Pending(_))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Mount::Ready(_))
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            Mount::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn level(&self) -> Option<&BoundLevel<H>> {
        match self {
            Mount::Ready(level) => Some(level),
            _ => None,
        }
    }
}

impl<H> std::fmt::Debug for Mount<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mount::Unmounted => f.write_str("Unmounted"),
            Mount::Pending(_) => f.write_str("Pending"),
            Mount::Ready(level) => f
                .debug_struct("Ready")
                .field("asset", &level.asset.path)
                .field("bodies", &level.bodies.len())
                .finish(),
            Mount::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
        }
    }
}

/// Which mesh a draw item refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMesh {
    /// The n-th mesh node of the snapshot's asset, counted depth first over
    /// the root children in file order (see [`SceneAsset::mesh_nodes`]).
    Asset(usize),
    GroundPlane,
    Capsule,
}

#[derive(Clone, Debug)]
pub struct DrawItem {
    pub mesh: DrawMesh,
    pub model: Matrix4<f32>,
    /// Replaces the primitive colours when set.
    pub color: Option<[f32; 4]>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    /// The root child this item belongs to, for asset meshes.
    pub node: Option<usize>,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug)]
pub struct FrameSnapshot {
    pub asset: Option<Arc<SceneAsset>>,
    pub items: Vec<DrawItem>,
    pub view: Matrix4<f32>,
    pub camera_position: Point3<f32>,
    pub debug_lines: Vec<DebugLine>,
    pub placeholder: bool,
}

pub struct LevelScene<P: PhysicsBackend> {
    config: SceneConfig,
    loader: Arc<AssetLoader>,
    physics: P,
    ground: Option<P::Handle>,
    character: CharacterController,
    character_handle: P::Handle,
    camera: FollowCamera,
    input: InputState,
    alignment: Instance,
    mount: Mount<P::Handle>,
}

impl<P: PhysicsBackend> LevelScene<P> {
    /// Sets up ground, character and camera, then mounts the configured asset.
    pub fn new(config: SceneConfig, loader: Arc<AssetLoader>, mut physics: P) -> Self {
        let ground = match physics.insert_body(&binder::ground_plane(&config.ground)) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Could not create the ground plane: {:#}", e);
                None
            }
        };
        let character = CharacterController::new(&config.character);
        let character_handle = physics.insert_character(&character.body());
        let camera = FollowCamera::new(&config.camera);

        let mut scene = Self {
            alignment: Instance::from_euler_degrees(config.asset.root_alignment_degrees),
            input: InputState::new(config.keyboard.clone()),
            config,
            loader,
            physics,
            ground,
            character,
            character_handle,
            camera,
            mount: Mount::Unmounted,
        };
        scene.mount();
        scene
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    pub fn ground(&self) -> Option<P::Handle> {
        self.ground
    }

    pub fn character(&self) -> &CharacterController {
        &self.character
    }

    pub fn character_handle(&self) -> P::Handle {
        self.character_handle
    }

    pub fn camera(&self) -> &FollowCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut FollowCamera {
        &mut self.camera
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn current_mount(&self) -> &Mount<P::Handle> {
        &self.mount
    }

    pub fn debug(&self) -> bool {
        self.physics.debug_enabled()
    }

    /// Flips the physics debug overlay and returns the new state.
    pub fn toggle_debug(&mut self) -> bool {
        let enabled = !self.physics.debug_enabled();
        self.physics.set_debug(enabled);
        log::info!("Physics debug {}", if enabled { "on" } else { "off" });
        enabled
    }

    /// Starts a fresh mount of the configured asset, dropping the current one.
    pub fn mount(&mut self) {
        self.unmount();
        let load = self.loader.load(&self.config.asset.path);
        self.mount = Mount::Pending(load);
        self.poll();
    }

    pub fn unmount(&mut self) {
        match std::mem::replace(&mut self.mount, Mount::Unmounted) {
            Mount::Ready(level) => {
                let mut removed = 0;
                for handle in level.handles() {
                    self.physics.remove_body(handle);
                    removed += 1;
                }
                log::info!("Unmounted {}, removed {} bodies", level.asset.path, removed);
            }
            Mount::Pending(_) => log::debug!("Abandoned pending mount"),
            Mount::Failed(_) | Mount::Unmounted => {}
        }
    }

    /// Resolves a pending mount if its load has finished. Never drives the load.
    pub fn poll(&mut self) -> &Mount<P::Handle> {
        let finished = match &self.mount {
            Mount::Pending(load) => load.peek().cloned(),
            _ => None,
        };
        match finished {
            Some(Ok(asset)) => self.mount = Mount::Ready(self.bind(asset)),
            Some(Err(err)) => {
                log::error!("Level failed to load: {}", err);
                self.mount = Mount::Failed(err);
            }
            None => {}
        }
        &self.mount
    }

    fn bind(&mut self, asset: Arc<SceneAsset>) -> BoundLevel<P::Handle> {
        let partition = Partition::of(&asset);
        let descriptors = binder::bind(&asset, &partition, &self.alignment);
        let mut bodies = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let handle = match self.physics.insert_body(&descriptor) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    log::warn!("No collider for {}: {:#}", descriptor.name(), e);
                    None
                }
            };
            bodies.push(BoundBody { descriptor, handle });
        }
        log::info!(
            "Bound {}: {} of {} bodies created",
            asset.path,
            bodies.iter().filter(|body| body.handle.is_some()).count(),
            bodies.len()
        );
        BoundLevel {
            asset,
            partition,
            bodies,
        }
    }

    /// Routes a window event to input and camera. Returns what the key did.
    pub fn handle_window_event(&mut self, event: &winit::event::WindowEvent) -> KeyOutcome {
        self.camera.handle_window_event(event);
        let outcome = self.input.handle_window_event(event);
        if outcome == KeyOutcome::DebugToggle {
            self.toggle_debug();
        }
        outcome
    }

    /// One frame of simulation. While the level is still loading the
    /// character and the physics world stay frozen.
    pub fn update(&mut self, dt: f32) {
        self.poll();
        for action in self.input.actions_mut().take_triggered() {
            self.character.trigger(action);
        }
        if self.mount.is_pending() {
            return;
        }

        self.character.update(
            &mut self.physics,
            self.character_handle,
            self.input.actions(),
            &self.camera,
            self.config.physics.gravity[1],
            dt,
        );
        self.physics.step(dt);
        self.character.sync(&self.physics, self.character_handle);
        self.camera.update(self.character.position(), dt);
    }

    /// World matrix for a root child: its body pose when bound, the asset
    /// transform otherwise.
    fn node_matrix(&self, level: &BoundLevel<P::Handle>, index: usize) -> Option<Matrix4<f32>> {
        if let Some(BoundBody {
            descriptor,
            handle: Some(handle),
        }) = level.body_for(index)
        {
            let pose = self.physics.body_pose(*handle)?;
            return Some(pose.with_scale(descriptor.scale).to_matrix());
        }
        node_world(&level.asset, index, &self.alignment).map(|world| world.to_matrix())
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        let mut items = Vec::new();

        let level = self.mount.level();
        let asset = level.map(|level| level.asset.clone());
        if let Some(level) = level {
            let mut mesh_index = 0;
            for (index, child) in level.asset.children().iter().enumerate() {
                let base = self
                    .node_matrix(level, index)
                    .unwrap_or_else(Matrix4::identity);
                child.visit_meshes(base, &mut |node, model| {
                    items.push(DrawItem {
                        mesh: DrawMesh::Asset(mesh_index),
                        model,
                        color: None,
                        cast_shadow: node.cast_shadow,
                        receive_shadow: node.receive_shadow,
                        node: Some(index),
                    });
                    mesh_index += 1;
                });
            }
        }

        let size = self.config.ground.size;
        items.push(DrawItem {
            mesh: DrawMesh::GroundPlane,
            model: Matrix4::from_nonuniform_scale(size, 1.0, size),
            color: Some(self.config.ground.color),
            cast_shadow: false,
            receive_shadow: true,
            node: None,
        });
        items.push(DrawItem {
            mesh: DrawMesh::Capsule,
            model: self.character.visual_transform().to_matrix(),
            color: Some(self.character.color()),
            cast_shadow: true,
            receive_shadow: false,
            node: None,
        });

        FrameSnapshot {
            asset,
            items,
            view: self.camera.view_matrix(),
            camera_position: self.camera.position(),
            debug_lines: self.physics.debug_lines(),
            placeholder: self.mount.is_pending(),
        }
    }
}
