//! Binding of partitioned level nodes to physics body descriptors.
//!
//! Each collidable node becomes one fixed body whose pose is the node's world
//! pose. The render node stays where it is in the asset; the descriptor only
//! refers to it, and whoever draws the node asks the physics world for the
//! body pose instead of using the asset transform.

use std::sync::Arc;

use cgmath::Vector3;

use crate::{
    config::GroundConfig,
    data_structures::{
        instance::Instance,
        scene_graph::{Geometry, SceneAsset, SceneNode},
    },
    level::partition::{FLOOR_MARKER, NodeClass, Partition, WALL_MARKER},
};

pub const WALL_FRICTION: f32 = 0.7;
pub const FLOOR_FRICTION: f32 = 0.7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    /// Immovable.
    Fixed,
}

/// How the collider approximates the render geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeApprox {
    /// Convex hull of all vertices.
    Hull,
    /// The exact triangle mesh.
    Trimesh,
    /// Derived from a generated primitive rather than asset geometry.
    Implicit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyGroup {
    Wall,
    Floor,
    Furniture,
    /// The generated plane that exists independently of the asset.
    Ground,
}

/// A borrowed-by-handle reference to one of the asset root's children.
#[derive(Clone, Debug)]
pub struct NodeRef {
    asset: Arc<SceneAsset>,
    index: usize,
}

impl NodeRef {
    /// `None` when `index` is not a child of the asset root.
    pub fn new(asset: &Arc<SceneAsset>, index: usize) -> Option<Self> {
        asset.child(index)?;
        Some(Self {
            asset: asset.clone(),
            index,
        })
    }

    pub fn node(&self) -> &SceneNode {
        &self.asset.children()[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn asset(&self) -> &Arc<SceneAsset> {
        &self.asset
    }
}

#[derive(Clone, Debug)]
pub enum BodySource {
    Node(NodeRef),
    /// A square plane of the given edge length lying in XZ at y = 0.
    GroundPlane { size: f32 },
}

#[derive(Clone, Debug)]
pub struct PhysicsBodyDescriptor {
    pub group: BodyGroup,
    pub kind: BodyKind,
    pub shape: ShapeApprox,
    /// `None` leaves the physics engine's default in place.
    pub friction: Option<f32>,
    /// World pose of the body, always unscaled.
    pub pose: Instance,
    /// Accumulated world scale, baked into collider vertices.
    pub scale: Vector3<f32>,
    pub source: BodySource,
}

impl PhysicsBodyDescriptor {
    pub fn node(&self) -> Option<&SceneNode> {
        match &self.source {
            BodySource::Node(node_ref) => Some(node_ref.node()),
            BodySource::GroundPlane { .. } => None,
        }
    }

    /// Index of the bound root child.
    pub fn source_index(&self) -> Option<usize> {
        match &self.source {
            BodySource::Node(node_ref) => Some(node_ref.index()),
            BodySource::GroundPlane { .. } => None,
        }
    }

    pub fn name(&self) -> &str {
        self.node().map_or("ground", |node| node.name.as_str())
    }

    /// Collider geometry in the body frame. Empty for implicit shapes.
    pub fn geometry(&self) -> Geometry {
        match &self.source {
            BodySource::Node(node_ref) => node_ref.node().collect_geometry(self.scale),
            BodySource::GroundPlane { .. } => Geometry::default(),
        }
    }
}

/// Fixed body policy per group: kind, shape and friction.
pub fn policy(group: BodyGroup) -> (BodyKind, ShapeApprox, Option<f32>) {
    match group {
        BodyGroup::Wall => (BodyKind::Fixed, ShapeApprox::Hull, Some(WALL_FRICTION)),
        BodyGroup::Floor => (BodyKind::Fixed, ShapeApprox::Trimesh, Some(FLOOR_FRICTION)),
        BodyGroup::Furniture => (BodyKind::Fixed, ShapeApprox::Trimesh, None),
        BodyGroup::Ground => (BodyKind::Fixed, ShapeApprox::Implicit, None),
    }
}

fn group_of(class: NodeClass) -> Option<BodyGroup> {
    match class {
        NodeClass::Wall => Some(BodyGroup::Wall),
        NodeClass::Floor => Some(BodyGroup::Floor),
        NodeClass::Furniture => Some(BodyGroup::Furniture),
        NodeClass::Unclassified => None,
    }
}

/// World transform of a root child: alignment, then the asset root, then the node.
///
/// Matches the glTF matrix product except for shear, which a non-uniformly
/// scaled root can introduce on a rotated child and which is dropped.
pub fn node_world(asset: &SceneAsset, index: usize, alignment: &Instance) -> Option<Instance> {
    let node = asset.child(index)?;
    Some(&(alignment * &asset.root.transform) * &node.transform)
}

/// One descriptor per collidable node, in wall, floor, furniture order.
///
/// Missing markers are logged and skipped.
pub fn bind(
    asset: &Arc<SceneAsset>,
    partition: &Partition,
    alignment: &Instance,
) -> Vec<PhysicsBodyDescriptor> {
    if partition.wall.is_none() {
        log::warn!("{} has no {} node, walls will not collide", asset.path, WALL_MARKER);
    }
    if partition.floor.is_none() {
        log::warn!(
            "{} has no {} node, relying on the generated ground",
            asset.path,
            FLOOR_MARKER
        );
    }

    partition
        .collidable()
        .filter_map(|(class, index)| {
            let group = group_of(class)?;
            let node_ref = NodeRef::new(asset, index)?;
            let world = node_world(asset, index, alignment)?;
            let (kind, shape, friction) = policy(group);
            Some(PhysicsBodyDescriptor {
                group,
                kind,
                shape,
                friction,
                pose: world.without_scale(),
                scale: world.scale,
                source: BodySource::Node(node_ref),
            })
        })
        .collect()
}

/// The always-present ground plane body.
pub fn ground_plane(config: &GroundConfig) -> PhysicsBodyDescriptor {
    let (kind, shape, _) = policy(BodyGroup::Ground);
    PhysicsBodyDescriptor {
        group: BodyGroup::Ground,
        kind,
        shape,
        friction: Some(config.friction),
        pose: Instance::default(),
        scale: Vector3::new(1.0, 1.0, 1.0),
        source: BodySource::GroundPlane { size: config.size },
    }
}
