//! Vertex formats, GPU meshes and the generated shapes of the scene.

use std::f32::consts::{PI, TAU};

use wgpu::util::DeviceExt;

use crate::data_structures::scene_graph::Primitive;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex for MeshVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex for LineVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// One uploaded primitive.
#[derive(Debug)]
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub base_color: [f32; 4],
}

impl GpuMesh {
    /// `None` for primitives without triangles; wgpu rejects empty buffers.
    pub fn from_primitive(device: &wgpu::Device, label: &str, primitive: &Primitive) -> Option<Self> {
        if primitive.indices.is_empty() || primitive.positions.is_empty() {
            return None;
        }
        let vertices: Vec<MeshVertex> = primitive
            .positions
            .iter()
            .enumerate()
            .map(|(i, position)| MeshVertex {
                position: *position,
                normal: primitive.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
            })
            .collect();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", label)),
            contents: bytemuck::cast_slice(&primitive.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Some(Self {
            vertex_buffer,
            index_buffer,
            num_elements: primitive.indices.len() as u32,
            base_color: primitive.base_color,
        })
    }
}

/// Unit square in XZ centred on the origin, facing +Y.
pub fn plane_primitive() -> Primitive {
    Primitive {
        positions: vec![
            [-0.5, 0.0, -0.5],
            [-0.5, 0.0, 0.5],
            [0.5, 0.0, 0.5],
            [0.5, 0.0, -0.5],
        ],
        normals: vec![[0.0, 1.0, 0.0]; 4],
        indices: vec![0, 1, 2, 0, 2, 3],
        base_color: [1.0, 1.0, 1.0, 1.0],
    }
}

/// Y-aligned capsule centred on the origin: a cylinder of `length` capped
/// by two hemispheres of `radius`.
pub fn capsule_primitive(radius: f32, length: f32, segments: u32, rings: u32) -> Primitive {
    let segments = segments.max(3);
    let rings = rings.max(1);
    let half = length / 2.0;

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    // latitude rows from the top pole to the bottom pole; the equator is
    // duplicated so the cylinder gets its own row pair
    let mut rows: Vec<(f32, f32)> = Vec::new();
    for ring in 0..=rings {
        let phi = PI / 2.0 * ring as f32 / rings as f32;
        rows.push((phi, half));
    }
    for ring in 0..=rings {
        let phi = PI / 2.0 + PI / 2.0 * ring as f32 / rings as f32;
        rows.push((phi, -half));
    }
    for (phi, offset) in &rows {
        let (sin_phi, cos_phi) = phi.sin_cos();
        for segment in 0..=segments {
            let theta = TAU * segment as f32 / segments as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();
            let normal = [sin_phi * sin_theta, cos_phi, sin_phi * cos_theta];
            positions.push([
                normal[0] * radius,
                normal[1] * radius + offset,
                normal[2] * radius,
            ]);
            normals.push(normal);
        }
    }

    let stride = segments + 1;
    let mut indices = Vec::new();
    for row in 0..rows.len() as u32 - 1 {
        for segment in 0..segments {
            let a = row * stride + segment;
            let b = a + stride;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }

    Primitive {
        positions,
        normals,
        indices,
        base_color: [1.0, 1.0, 1.0, 1.0],
    }
}
