//! Name-based partition of a level into collidable groups.
//!
//! The level's direct children are classified purely by name. The mapping is
//! closed: every string lands in exactly one [`NodeClass`], and nothing about
//! the node's geometry is consulted.

use crate::data_structures::scene_graph::{SceneAsset, SceneNode};

/// Name of the single wall/collision mesh.
pub const WALL_MARKER: &str = ".collision__001";

/// Name of the level's own floor mesh.
pub const FLOOR_MARKER: &str = ".floor";

/// Name prefixes that make a node collidable furniture.
pub const FURNITURE_PREFIXES: [&str; 4] = ["N", "U", "U2", "K"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeClass {
    Wall,
    Floor,
    Furniture,
    Unclassified,
}

impl NodeClass {
    /// Whether nodes of this class get a physics body.
    pub fn is_collidable(self) -> bool {
        !matches!(self, NodeClass::Unclassified)
    }
}

/// Total mapping from a node name to its class.
///
/// Markers are matched exactly and take precedence over prefixes.
pub fn classify(name: &str) -> NodeClass {
    if name == WALL_MARKER {
        NodeClass::Wall
    } else if name == FLOOR_MARKER {
        NodeClass::Floor
    } else if FURNITURE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
    {
        NodeClass::Furniture
    } else {
        NodeClass::Unclassified
    }
}

/// Indices of the asset root's children, grouped by class.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    pub wall: Option<usize>,
    pub floor: Option<usize>,
    pub furniture: Vec<usize>,
    pub unclassified: Vec<usize>,
}

impl Partition {
    pub fn of(asset: &SceneAsset) -> Self {
        let mut partition = Partition::default();
        for (idx, node) in asset.children().iter().enumerate() {
            match classify(&node.name) {
                NodeClass::Wall if partition.wall.is_none() => partition.wall = Some(idx),
                NodeClass::Floor if partition.floor.is_none() => partition.floor = Some(idx),
                NodeClass::Wall | NodeClass::Floor => {
                    log::warn!(
                        "Duplicate marker node {:?} at index {} is ignored for physics",
                        node.name,
                        idx
                    );
                    partition.unclassified.push(idx);
                }
                NodeClass::Furniture => partition.furniture.push(idx),
                NodeClass::Unclassified => partition.unclassified.push(idx),
            }
        }
        partition
    }

    /// Collidable children in binding order: wall, floor, then furniture.
    pub fn collidable(&self) -> impl Iterator<Item = (NodeClass, usize)> + '_ {
        self.wall
            .map(|idx| (NodeClass::Wall, idx))
            .into_iter()
            .chain(self.floor.map(|idx| (NodeClass::Floor, idx)))
            .chain(self.furniture.iter().map(|&idx| (NodeClass::Furniture, idx)))
    }

    pub fn class_of(&self, index: usize) -> NodeClass {
        if self.wall == Some(index) {
            NodeClass::Wall
        } else if self.floor == Some(index) {
            NodeClass::Floor
        } else if self.furniture.contains(&index) {
            NodeClass::Furniture
        } else {
            NodeClass::Unclassified
        }
    }

    pub fn collidable_count(&self) -> usize {
        self.collidable().count()
    }
}

/// Marks every mesh in `node`'s subtree as casting and receiving shadows.
pub fn enable_shadows(node: &mut SceneNode) {
    node.traverse_mut(&mut |child| {
        if child.is_mesh() {
            child.cast_shadow = true;
            child.receive_shadow = true;
        }
    });
}

/// Post-load step: turns on shadows for every collidable subtree.
///
/// Unclassified subtrees keep the flags they were loaded with. Running it
/// again on the same asset changes nothing.
pub fn propagate_shadows(asset: &mut SceneAsset) {
    let partition = Partition::of(asset);
    for (_, idx) in partition.collidable() {
        if let Some(node) = asset.root.children.get_mut(idx) {
            enable_shadows(node);
        }
    }
    log::info!(
        "Partitioned {}: wall {}, floor {}, {} furniture, {} unclassified",
        asset.path,
        if partition.wall.is_some() { "found" } else { "missing" },
        if partition.floor.is_some() { "found" } else { "missing" },
        partition.furniture.len(),
        partition.unclassified.len()
    );
}
