//! Scene graph of an imported level.
//!
//! A [`SceneAsset`] is the CPU-side result of parsing a glTF file: a root node
//! carrying the scene transform and an ordered list of named children, each
//! with optional mesh data and shadow flags. Assets are immutable once they
//! are published by the loader, so everything here that mutates takes
//! `&mut self` and is only reachable before publication.

use cgmath::{Matrix4, Point3, Transform, Vector3};

use crate::data_structures::instance::Instance;

/// A single drawable primitive in node-local space.
#[derive(Clone, Debug, Default)]
pub struct Primitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub base_color: [f32; 4],
}

impl Primitive {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub name: String,
    pub primitives: Vec<Primitive>,
}

/// A named subtree of the imported scene.
#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub transform: Instance,
    pub mesh: Option<MeshData>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Instance::default(),
            mesh: None,
            cast_shadow: false,
            receive_shadow: false,
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Instance) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_mesh(mut self, mesh: MeshData) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    /// Depth-first search over this node and its descendants.
    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Visits this node and every descendant, parents first.
    pub fn traverse(&self, visit: &mut dyn FnMut(&SceneNode)) {
        visit(self);
        for child in &self.children {
            child.traverse(visit);
        }
    }

    pub fn traverse_mut(&mut self, visit: &mut dyn FnMut(&mut SceneNode)) {
        visit(self);
        for child in &mut self.children {
            child.traverse_mut(visit);
        }
    }

    /// Visits every mesh-bearing node with its transform relative to `base`.
    ///
    /// `base` is the frame the caller wants results in.
    pub fn visit_meshes(&self, base: Matrix4<f32>, visit: &mut dyn FnMut(&SceneNode, Matrix4<f32>)) {
        if self.is_mesh() {
            visit(self, base);
        }
        for child in &self.children {
            child.visit_meshes(base * child.transform.to_matrix(), visit);
        }
    }

    /// Collects every triangle in this subtree, expressed in the node frame with
    /// `scale` applied. Pass the node's accumulated world scale so the result
    /// can hang beneath an unscaled rigid body.
    pub fn collect_geometry(&self, scale: Vector3<f32>) -> Geometry {
        let mut geometry = Geometry::default();
        let base = Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z);
        self.visit_meshes(base, &mut |node, matrix| {
            if let Some(mesh) = &node.mesh {
                for primitive in &mesh.primitives {
                    geometry.append(primitive, matrix);
                }
            }
        });
        geometry
    }

    pub fn mesh_count(&self) -> usize {
        let mut count = 0;
        self.traverse(&mut |node| {
            if node.is_mesh() {
                count += 1;
            }
        });
        count
    }
}

/// Flattened triangle soup used to build colliders.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

impl Geometry {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    fn append(&mut self, primitive: &Primitive, matrix: Matrix4<f32>) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend(primitive.positions.iter().map(|p| {
            let p = matrix.transform_point(Point3::new(p[0], p[1], p[2]));
            [p.x, p.y, p.z]
        }));
        let vertex_count = primitive.positions.len() as u32;
        for tri in primitive.indices.chunks_exact(3) {
            if tri.iter().any(|&i| i >= vertex_count) {
                log::warn!("Skipping triangle with out of range index in {:?}", tri);
                continue;
            }
            self.triangles
                .push([tri[0] + offset, tri[1] + offset, tri[2] + offset]);
        }
    }
}

/// The deserialized level: a root transform plus its ordered named children.
#[derive(Clone, Debug)]
pub struct SceneAsset {
    pub path: String,
    pub root: SceneNode,
}

impl SceneAsset {
    pub fn new(path: impl Into<String>, root: SceneNode) -> Self {
        Self {
            path: path.into(),
            root,
        }
    }

    /// The direct children of the root in file order.
    pub fn children(&self) -> &[SceneNode] {
        &self.root.children
    }

    pub fn child(&self, index: usize) -> Option<&SceneNode> {
        self.root.children.get(index)
    }

    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        self.root.find(name)
    }

    /// Mesh-bearing nodes below the root, depth first over the children in
    /// file order, parents before their descendants.
    pub fn mesh_nodes(&self) -> Vec<&SceneNode> {
        let mut nodes = Vec::new();
        for child in self.children() {
            collect_meshes(child, &mut nodes);
        }
        nodes
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.root.traverse(&mut |_| count += 1);
        // the synthetic root is not part of the file
        count - 1
    }
}

fn collect_meshes<'a>(node: &'a SceneNode, out: &mut Vec<&'a SceneNode>) {
    if node.is_mesh() {
        out.push(node);
    }
    for child in &node.children {
        collect_meshes(child, out);
    }
}
