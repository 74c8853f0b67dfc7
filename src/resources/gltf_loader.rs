//! glTF/GLB parsing into a [`SceneAsset`].
//!
//! Only geometry, names, node transforms and base colours are read; textures
//! and animations are not part of a level walkthrough. Buffers may live in the
//! GLB binary chunk, in sibling files or in base64 data URIs.

use crate::{
    data_structures::{
        instance::Instance,
        scene_graph::{MeshData, Primitive, SceneAsset, SceneNode},
    },
    error::LoadError,
    resources::source::{AssetSource, sibling},
};

/// Fetches `file_name` from `source` and parses it, including any external buffers.
pub async fn load_scene_gltf(
    source: &dyn AssetSource,
    file_name: &str,
) -> Result<SceneAsset, LoadError> {
    let bytes = source
        .fetch(file_name)
        .await
        .map_err(|e| LoadError::fetch(file_name, format!("{e:#}")))?;
    let gltf = gltf::Gltf::from_slice(&bytes).map_err(|e| LoadError::parse(file_name, e))?;

    // Load buffers
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => blob.to_vec(),
                None => {
                    return Err(LoadError::MissingBuffer {
                        path: file_name.to_string(),
                        index: buffer.index(),
                    });
                }
            },
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                decode_data_uri(file_name, uri)?
            }
            gltf::buffer::Source::Uri(uri) => {
                let uri_path = sibling(file_name, uri);
                source
                    .fetch(&uri_path)
                    .await
                    .map_err(|e| LoadError::fetch(&uri_path, format!("{e:#}")))?
            }
        };
        if data.len() < buffer.length() {
            return Err(LoadError::MissingBuffer {
                path: file_name.to_string(),
                index: buffer.index(),
            });
        }
        buffer_data.push(data);
    }

    Ok(scene_from_document(file_name, &gltf, &buffer_data))
}

/// Decodes a `data:<mime>;base64,<payload>` buffer URI.
fn decode_data_uri(file_name: &str, uri: &str) -> Result<Vec<u8>, LoadError> {
    use base64::Engine as _;

    let (_, payload) = uri
        .split_once(";base64,")
        .ok_or_else(|| LoadError::parse(file_name, "only base64 data URIs are supported"))?;
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| LoadError::parse(file_name, e))
}

/// Builds the asset from the default scene (or the first one if none is marked).
pub fn scene_from_document(
    file_name: &str,
    document: &gltf::Document,
    buffers: &[Vec<u8>],
) -> SceneAsset {
    let scene = document.default_scene().or_else(|| document.scenes().next());
    let mut root = SceneNode::new(scene.as_ref().and_then(|s| s.name()).unwrap_or("Scene"));
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                root.children.push(to_scene_node(node, buffers));
            }
        }
        None => log::warn!("{} contains no scene, the level will be empty", file_name),
    }
    SceneAsset::new(file_name, root)
}

fn to_scene_node(node: gltf::Node, buffers: &[Vec<u8>]) -> SceneNode {
    let mut scene_node = SceneNode::new(node.name().unwrap_or_default())
        .with_transform(Instance::from_decomposed(node.transform().decomposed()));

    if let Some(mesh) = node.mesh() {
        let primitives = mesh
            .primitives()
            .filter_map(|primitive| read_primitive(&primitive, buffers))
            .collect::<Vec<_>>();
        if primitives.is_empty() {
            log::warn!(
                "Mesh {:?} on node {:?} has no triangle primitives",
                mesh.name(),
                node.name()
            );
        } else {
            scene_node.mesh = Some(MeshData {
                name: mesh.name().unwrap_or("unknown_mesh").to_string(),
                primitives,
            });
        }
    }

    for child in node.children() {
        scene_node.children.push(to_scene_node(child, buffers));
    }
    scene_node
}

fn read_primitive(primitive: &gltf::Primitive, buffers: &[Vec<u8>]) -> Option<Primitive> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!(
            "Skipping primitive {} with unsupported mode {:?}",
            primitive.index(),
            primitive.mode()
        );
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let positions: Vec<[f32; 3]> = match reader.read_positions() {
        Some(positions) => positions.collect(),
        None => {
            log::warn!("Skipping primitive {} without positions", primitive.index());
            return None;
        }
    };
    let indices: Vec<u32> = reader
        .read_indices()
        .map(|indices| indices.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());
    let normals: Vec<[f32; 3]> = match reader.read_normals() {
        Some(normals) => normals.collect(),
        None => smooth_normals(&positions, &indices),
    };
    let base_color = primitive
        .material()
        .pbr_metallic_roughness()
        .base_color_factor();

    Some(Primitive {
        positions,
        normals,
        indices,
        base_color,
    })
}

/// Area-weighted vertex normals for meshes exported without them.
pub fn smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    use cgmath::InnerSpace;

    let mut normals = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let pa: cgmath::Vector3<f32> = positions[a].into();
        let pb: cgmath::Vector3<f32> = positions[b].into();
        let pc: cgmath::Vector3<f32> = positions[c].into();
        let face = (pb - pa).cross(pc - pa);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals
        .into_iter()
        .map(|n| {
            if n.magnitude2() > f32::EPSILON {
                n.normalize().into()
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect()
}
