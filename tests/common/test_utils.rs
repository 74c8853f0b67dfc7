use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use futures::{
    FutureExt,
    channel::oneshot,
    future::{BoxFuture, Shared},
};
use levelwalk::{
    config::SceneConfig,
    data_structures::{
        instance::Instance,
        scene_graph::{MeshData, Primitive, SceneAsset, SceneNode},
    },
    level::partition::propagate_shadows,
    resources::{AssetLoader, AssetSource},
};

pub const LEVEL: &str = "level.glb";

/// In-memory asset source that counts fetches and can hold them back until
/// the test opens the gate.
#[derive(Clone, Default)]
pub struct MemorySource {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fetches: Arc<AtomicUsize>,
    gate: Option<Shared<oneshot::Receiver<()>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, name: &str, bytes: Vec<u8>) -> Self {
        self.insert(name, bytes);
        self
    }

    /// Every fetch waits until the returned sender fires (or is dropped).
    pub fn gated(mut self) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        self.gate = Some(rx.shared());
        (self, tx)
    }

    pub fn insert(&self, name: &str, bytes: Vec<u8>) {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, file_name: &str) -> BoxFuture<'static, anyhow::Result<Vec<u8>>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let files = self.files.clone();
        let gate = self.gate.clone();
        let name = file_name.to_string();
        async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            files
                .lock()
                .unwrap()
                .get(&name)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no such asset {}", name))
        }
        .boxed()
    }
}

/// A loader set up the way the app sets up the global one.
pub fn loader(source: MemorySource) -> Arc<AssetLoader> {
    Arc::new(AssetLoader::new(source).with_post_load(propagate_shadows))
}

/// Like [`loader`], but every load is spawned on `runtime`.
pub fn loader_on(source: MemorySource, runtime: tokio::runtime::Handle) -> Arc<AssetLoader> {
    Arc::new(
        AssetLoader::new(source)
            .with_post_load(propagate_shadows)
            .with_runtime(runtime),
    )
}

/// Default config pointed at [`LEVEL`].
pub fn config() -> SceneConfig {
    let mut config = SceneConfig::default();
    config.asset.path = LEVEL.to_string();
    config
}

/// A node of a synthetic level.
#[derive(Clone, Debug)]
pub struct NodeDef {
    pub name: String,
    pub translation: [f32; 3],
    pub scale: [f32; 3],
    pub geometry: Option<(Vec<[f32; 3]>, Vec<u32>)>,
    pub children: Vec<NodeDef>,
}

impl NodeDef {
    pub fn group(name: &str) -> Self {
        Self {
            name: name.to_string(),
            translation: [0.0; 3],
            scale: [1.0; 3],
            geometry: None,
            children: Vec::new(),
        }
    }

    /// An axis aligned box centred on the node origin.
    pub fn cube(name: &str, half: [f32; 3]) -> Self {
        Self {
            geometry: Some(box_geometry(half)),
            ..Self::group(name)
        }
    }

    /// A flat square in XZ; its convex hull has no volume.
    pub fn quad(name: &str, half: f32) -> Self {
        let positions = vec![
            [-half, 0.0, -half],
            [half, 0.0, -half],
            [half, 0.0, half],
            [-half, 0.0, half],
        ];
        Self {
            geometry: Some((positions, vec![0, 2, 1, 0, 3, 2])),
            ..Self::group(name)
        }
    }

    pub fn at(mut self, translation: [f32; 3]) -> Self {
        self.translation = translation;
        self
    }

    pub fn scaled(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_child(mut self, child: NodeDef) -> Self {
        self.children.push(child);
        self
    }

    /// The same node as it looks after import, without going through glTF.
    pub fn to_scene_node(&self) -> SceneNode {
        let mut node = SceneNode::new(self.name.clone()).with_transform(Instance {
            position: self.translation.into(),
            scale: self.scale.into(),
            ..Default::default()
        });
        if let Some((positions, indices)) = &self.geometry {
            node = node.with_mesh(MeshData {
                name: format!("{}_mesh", self.name),
                primitives: vec![Primitive {
                    normals: vec![[0.0, 1.0, 0.0]; positions.len()],
                    positions: positions.clone(),
                    indices: indices.clone(),
                    base_color: [1.0, 1.0, 1.0, 1.0],
                }],
            });
        }
        for child in &self.children {
            node = node.with_child(child.to_scene_node());
        }
        node
    }
}

pub fn box_geometry(half: [f32; 3]) -> (Vec<[f32; 3]>, Vec<u32>) {
    let [x, y, z] = half;
    let positions = vec![
        [-x, -y, -z],
        [x, -y, -z],
        [x, y, -z],
        [-x, y, -z],
        [-x, -y, z],
        [x, -y, z],
        [x, y, z],
        [-x, y, z],
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1, 0, 3, 2, // back
        4, 5, 6, 4, 6, 7, // front
        0, 1, 5, 0, 5, 4, // bottom
        3, 6, 2, 3, 7, 6, // top
        0, 4, 7, 0, 7, 3, // left
        1, 2, 6, 1, 6, 5, // right
    ];
    (positions, indices)
}

/// An in-memory asset whose root children are `children`.
pub fn asset(children: &[NodeDef]) -> Arc<SceneAsset> {
    let mut root = SceneNode::new("Scene");
    for child in children {
        root = root.with_child(child.to_scene_node());
    }
    Arc::new(SceneAsset::new(LEVEL, root))
}

/// A level with every kind of top-level node: wall, floor, furniture and
/// one decorative node.
pub fn full_level() -> Vec<NodeDef> {
    vec![
        NodeDef::cube(".collision__001", [5.0, 2.0, 0.2]).at([0.0, 2.0, -5.0]),
        NodeDef::cube(".floor", [5.0, 0.1, 5.0]).at([0.0, -0.1, 0.0]),
        NodeDef::cube("N_table", [0.5, 0.4, 0.5]).at([2.0, 0.4, 2.0]),
        NodeDef::cube("Misc_plant", [0.2, 0.5, 0.2]).at([-2.0, 0.5, 2.0]),
    ]
}

/// Encodes the nodes as a binary glTF file.
pub fn glb(children: &[NodeDef]) -> Vec<u8> {
    let (json, bin) = document(children, None);
    pack_glb(json, bin)
}

/// Encodes the nodes as glTF JSON with the buffer inlined as a data URI.
pub fn gltf_embedded(children: &[NodeDef]) -> Vec<u8> {
    use base64::Engine as _;

    let (_, bin) = document(children, None);
    let uri = format!(
        "data:application/octet-stream;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&bin)
    );
    document(children, Some(&uri)).0
}

/// Encodes the nodes as glTF JSON plus the external buffer it points at.
pub fn gltf_external(children: &[NodeDef], bin_name: &str) -> (Vec<u8>, Vec<u8>) {
    document(children, Some(bin_name))
}

fn document(children: &[NodeDef], buffer_uri: Option<&str>) -> (Vec<u8>, Vec<u8>) {
    let mut writer = GlbWriter::default();
    let roots: Vec<usize> = children.iter().map(|c| writer.add_node(c)).collect();
    writer.finish(&roots, buffer_uri)
}

fn pack_glb(mut json: Vec<u8>, mut bin: Vec<u8>) -> Vec<u8> {
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let has_bin = !bin.is_empty();
    let mut length = 12 + 8 + json.len();
    if has_bin {
        length += 8 + bin.len();
    }

    let mut out = Vec::with_capacity(length);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(length as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json);
    if has_bin {
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
    }
    out
}

#[derive(Default)]
struct GlbWriter {
    nodes: Vec<String>,
    meshes: Vec<String>,
    accessors: Vec<String>,
    views: Vec<String>,
    bin: Vec<u8>,
}

impl GlbWriter {
    fn add_view(&mut self, bytes: &[u8], target: u32) -> usize {
        let offset = self.bin.len();
        self.bin.extend_from_slice(bytes);
        self.views.push(format!(
            r#"{{"buffer":0,"byteOffset":{},"byteLength":{},"target":{}}}"#,
            offset,
            bytes.len(),
            target
        ));
        self.views.len() - 1
    }

    fn add_mesh(&mut self, name: &str, positions: &[[f32; 3]], indices: &[u32]) -> usize {
        let position_bytes: Vec<u8> = positions
            .iter()
            .flatten()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let index_bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();

        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for p in positions {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }

        let position_view = self.add_view(&position_bytes, 34962);
        self.accessors.push(format!(
            r#"{{"bufferView":{},"componentType":5126,"count":{},"type":"VEC3","min":[{},{},{}],"max":[{},{},{}]}}"#,
            position_view,
            positions.len(),
            min[0],
            min[1],
            min[2],
            max[0],
            max[1],
            max[2]
        ));
        let position_accessor = self.accessors.len() - 1;

        let index_view = self.add_view(&index_bytes, 34963);
        self.accessors.push(format!(
            r#"{{"bufferView":{},"componentType":5125,"count":{},"type":"SCALAR"}}"#,
            index_view,
            indices.len()
        ));
        let index_accessor = self.accessors.len() - 1;

        self.meshes.push(format!(
            r#"{{"name":{:?},"primitives":[{{"attributes":{{"POSITION":{}}},"indices":{}}}]}}"#,
            name, position_accessor, index_accessor
        ));
        self.meshes.len() - 1
    }

    fn add_node(&mut self, spec: &NodeDef) -> usize {
        let children: Vec<usize> = spec.children.iter().map(|c| self.add_node(c)).collect();
        let mut fields = vec![
            format!("\"name\":{:?}", spec.name),
            format!(
                "\"translation\":[{},{},{}]",
                spec.translation[0], spec.translation[1], spec.translation[2]
            ),
            format!(
                "\"scale\":[{},{},{}]",
                spec.scale[0], spec.scale[1], spec.scale[2]
            ),
        ];
        if let Some((positions, indices)) = &spec.geometry {
            let mesh = self.add_mesh(&format!("{}_mesh", spec.name), positions, indices);
            fields.push(format!("\"mesh\":{}", mesh));
        }
        if !children.is_empty() {
            fields.push(format!("\"children\":{:?}", children));
        }
        self.nodes.push(format!("{{{}}}", fields.join(",")));
        self.nodes.len() - 1
    }

    /// The JSON document and the raw buffer. Without a URI the buffer is
    /// meant for a GLB binary chunk.
    fn finish(self, roots: &[usize], buffer_uri: Option<&str>) -> (Vec<u8>, Vec<u8>) {
        let mut sections = vec![
            r#""asset":{"version":"2.0"}"#.to_string(),
            r#""scene":0"#.to_string(),
            format!(r#""scenes":[{{"name":"Scene","nodes":{:?}}}]"#, roots),
            format!(r#""nodes":[{}]"#, self.nodes.join(",")),
        ];
        if !self.meshes.is_empty() {
            let buffer = match buffer_uri {
                Some(uri) => format!(r#"{{"byteLength":{},"uri":{:?}}}"#, self.bin.len(), uri),
                None => format!(r#"{{"byteLength":{}}}"#, self.bin.len()),
            };
            sections.push(format!(r#""meshes":[{}]"#, self.meshes.join(",")));
            sections.push(format!(r#""accessors":[{}]"#, self.accessors.join(",")));
            sections.push(format!(r#""bufferViews":[{}]"#, self.views.join(",")));
            sections.push(format!(r#""buffers":[{}]"#, buffer));
        }
        (format!("{{{}}}", sections.join(",")).into_bytes(), self.bin)
    }
}

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

pub fn assert_vec3_eq(actual: cgmath::Vector3<f32>, expected: [f32; 3]) {
    assert!(
        approx_eq(actual.x, expected[0])
            && approx_eq(actual.y, expected[1])
            && approx_eq(actual.z, expected[2]),
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}
