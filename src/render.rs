//! Forward renderer for [`FrameSnapshot`]s.
//!
//! Each frame runs four steps:
//! 1. shadow pass: shadow casters into the light's depth map
//! 2. lit pass: every draw item into the HDR target, then debug lines
//! 3. post pass: bloom, exposure, tone mapping and grading onto the surface
//! 4. present
//!
//! Asset meshes are uploaded once per distinct asset and looked up by the
//! mesh index the scene puts into each [`DrawItem`].

use std::{iter, num::NonZeroU64, sync::Arc};

use anyhow::anyhow;
use cgmath::{EuclideanSpace, InnerSpace, Matrix, Matrix4, Point3, SquareMatrix, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    camera::{OPENGL_TO_WGPU_MATRIX, Projection},
    config::{DirectionalLightConfig, LightingConfig, PostProcessingConfig, SceneConfig},
    context::Context,
    data_structures::{
        model::{GpuMesh, LineVertex, capsule_primitive, plane_primitive},
        scene_graph::SceneAsset,
        texture::Texture,
    },
    pipelines::{
        debug::mk_debug_pipeline,
        lit::{mk_lit_bind_group_layout, mk_lit_pipeline},
        post::{PostUniform, mk_post_bind_group_layout, mk_post_pipeline},
        shadow::mk_shadow_pipeline,
        uniform_entry,
    },
    scene::{DrawItem, DrawMesh, FrameSnapshot},
};

/// Dynamic uniform offsets must be multiples of this.
const MODEL_STRIDE: u64 = 256;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub sky: [f32; 4],
    pub ground: [f32; 4],
    pub ambient: [f32; 4],
    /// Direction towards the light; `w` is 1 when shadows are on.
    pub sun_dir: [f32; 4],
    pub sun_color: [f32; 4],
}

fn scaled(color: [f32; 4], intensity: f32) -> [f32; 4] {
    [
        color[0] * intensity,
        color[1] * intensity,
        color[2] * intensity,
        1.0,
    ]
}

impl FrameUniform {
    pub fn new(snapshot: &FrameSnapshot, projection: &Projection, lighting: &LightingConfig) -> Self {
        let sun = &lighting.sun;
        let direction = Vector3::from(sun.position).normalize();
        let camera = snapshot.camera_position;
        Self {
            view_proj: (projection.calc_matrix() * snapshot.view).into(),
            light_view_proj: light_view_proj(sun).into(),
            camera_pos: [camera.x, camera.y, camera.z, 1.0],
            sky: scaled(lighting.hemisphere_sky, lighting.hemisphere_intensity),
            ground: scaled(lighting.hemisphere_ground, lighting.hemisphere_intensity),
            ambient: scaled([1.0, 1.0, 1.0, 1.0], lighting.ambient_intensity),
            sun_dir: [
                direction.x,
                direction.y,
                direction.z,
                if sun.cast_shadow { 1.0 } else { 0.0 },
            ],
            sun_color: scaled(sun.color, sun.intensity),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// x: receives shadows
    pub flags: [u32; 4],
}

impl ModelUniform {
    pub fn new(model: Matrix4<f32>, color: [f32; 4], receive_shadow: bool) -> Self {
        let normal = model
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or(model);
        Self {
            model: model.into(),
            normal: normal.into(),
            color,
            flags: [receive_shadow as u32, 0, 0, 0],
        }
    }
}

/// Orthographic view-projection of the directional light looking at the origin.
pub fn light_view_proj(sun: &DirectionalLightConfig) -> Matrix4<f32> {
    let eye = Point3::from(sun.position);
    let up = if sun.position[0].abs() < 1e-4 && sun.position[2].abs() < 1e-4 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    };
    let view = Matrix4::look_at_rh(eye, Point3::origin(), up);
    let e = sun.shadow_extent;
    let proj = cgmath::ortho(-e, e, -e, e, sun.shadow_near, sun.shadow_far);
    OPENGL_TO_WGPU_MATRIX * proj * view
}

#[derive(Clone, Copy, Debug)]
enum MeshRef {
    Ground,
    Capsule,
    Asset { node: usize, primitive: usize },
}

#[derive(Clone, Copy, Debug)]
struct Draw {
    mesh: MeshRef,
    slot: u64,
    cast_shadow: bool,
}

struct UploadedAsset {
    asset: Arc<SceneAsset>,
    /// Per mesh node, one entry per primitive with triangles.
    meshes: Vec<Vec<GpuMesh>>,
}

pub struct Renderer {
    lighting: LightingConfig,
    post: PostProcessingConfig,
    clear_color: wgpu::Color,

    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    lit_bind_group: wgpu::BindGroup,

    model_layout: wgpu::BindGroupLayout,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_capacity: u64,

    post_layout: wgpu::BindGroupLayout,
    post_buffer: wgpu::Buffer,
    post_bind_group: wgpu::BindGroup,

    shadow_map: Texture,
    depth: Texture,
    hdr: Texture,

    shadow_pipeline: wgpu::RenderPipeline,
    lit_pipeline: wgpu::RenderPipeline,
    debug_pipeline: wgpu::RenderPipeline,
    post_pipeline: wgpu::RenderPipeline,

    ground: GpuMesh,
    capsule: GpuMesh,
    uploaded: Option<UploadedAsset>,
}

impl Renderer {
    pub fn new(ctx: &Context, config: &SceneConfig) -> anyhow::Result<Self> {
        let device = &ctx.device;

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame_bind_group_layout"),
            entries: &[uniform_entry(0, false)],
        });
        let lit_layout = mk_lit_bind_group_layout(device);
        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("model_bind_group_layout"),
            entries: &[uniform_entry(0, true)],
        });
        let post_layout = mk_post_bind_group_layout(device);

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Buffer"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let shadow_map = Texture::create_shadow_map(device, config.lighting.sun.shadow_map_size);
        let shadow_sampler = shadow_map
            .sampler
            .as_ref()
            .ok_or_else(|| anyhow!("shadow map has no sampler"))?;
        let lit_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lit_bind_group"),
            layout: &lit_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(shadow_sampler),
                },
            ],
        });

        let model_capacity = 64;
        let (model_buffer, model_bind_group) =
            Self::mk_model_buffer(device, &model_layout, model_capacity);

        let size = ctx.size();
        let depth = Texture::create_depth_texture(device, size, "depth_texture");
        let hdr = Texture::create_color_target(device, size, Texture::HDR_FORMAT, "hdr_target");
        let post_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Post Buffer"),
            contents: bytemuck::cast_slice(&[PostUniform::new(&config.post, size[0], size[1])]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let post_bind_group = Self::mk_post_bind_group(device, &post_layout, &hdr, &post_buffer)?;

        let ground = GpuMesh::from_primitive(device, "ground", &plane_primitive())
            .ok_or_else(|| anyhow!("ground plane has no triangles"))?;
        let (radius, length) = (config.character.visual_radius, config.character.visual_length);
        let capsule = GpuMesh::from_primitive(device, "character", &capsule_primitive(radius, length, 16, 6))
            .ok_or_else(|| anyhow!("character capsule has no triangles"))?;

        let [r, g, b, a] = config.window.clear_color;
        Ok(Self {
            lighting: config.lighting.clone(),
            post: config.post.clone(),
            clear_color: wgpu::Color { r, g, b, a },
            shadow_pipeline: mk_shadow_pipeline(device, &frame_layout, &model_layout),
            lit_pipeline: mk_lit_pipeline(device, &lit_layout, &model_layout),
            debug_pipeline: mk_debug_pipeline(device, &frame_layout),
            post_pipeline: mk_post_pipeline(device, ctx.config.format, &post_layout),
            frame_buffer,
            frame_bind_group,
            lit_bind_group,
            model_layout,
            model_buffer,
            model_bind_group,
            model_capacity,
            post_layout,
            post_buffer,
            post_bind_group,
            shadow_map,
            depth,
            hdr,
            ground,
            capsule,
            uploaded: None,
        })
    }

    fn mk_model_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Buffer"),
            size: capacity * MODEL_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("model_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<ModelUniform>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn mk_post_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        hdr: &Texture,
        buffer: &wgpu::Buffer,
    ) -> anyhow::Result<wgpu::BindGroup> {
        let sampler = hdr
            .sampler
            .as_ref()
            .ok_or_else(|| anyhow!("HDR target has no sampler"))?;
        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("post_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&hdr.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffer.as_entire_binding(),
                },
            ],
        }))
    }

    /// Recreates the size dependent targets after a surface resize.
    pub fn resize(&mut self, ctx: &Context) -> anyhow::Result<()> {
        let size = ctx.size();
        self.depth = Texture::create_depth_texture(&ctx.device, size, "depth_texture");
        self.hdr = Texture::create_color_target(&ctx.device, size, Texture::HDR_FORMAT, "hdr_target");
        self.post_bind_group =
            Self::mk_post_bind_group(&ctx.device, &self.post_layout, &self.hdr, &self.post_buffer)?;
        ctx.queue.write_buffer(
            &self.post_buffer,
            0,
            bytemuck::cast_slice(&[PostUniform::new(&self.post, size[0], size[1])]),
        );
        Ok(())
    }

    fn upload_asset(&mut self, device: &wgpu::Device, asset: &Arc<SceneAsset>) {
        if let Some(uploaded) = &self.uploaded {
            if Arc::ptr_eq(&uploaded.asset, asset) {
                return;
            }
        }
        let meshes: Vec<Vec<GpuMesh>> = asset
            .mesh_nodes()
            .into_iter()
            .map(|node| {
                node.mesh
                    .iter()
                    .flat_map(|mesh| mesh.primitives.iter())
                    .filter_map(|primitive| GpuMesh::from_primitive(device, &node.name, primitive))
                    .collect()
            })
            .collect();
        log::info!("Uploaded {} mesh nodes of {}", meshes.len(), asset.path);
        self.uploaded = Some(UploadedAsset {
            asset: asset.clone(),
            meshes,
        });
    }

    fn mesh(&self, mesh: MeshRef) -> Option<&GpuMesh> {
        match mesh {
            MeshRef::Ground => Some(&self.ground),
            MeshRef::Capsule => Some(&self.capsule),
            MeshRef::Asset { node, primitive } => self
                .uploaded
                .as_ref()
                .and_then(|uploaded| uploaded.meshes.get(node))
                .and_then(|primitives| primitives.get(primitive)),
        }
    }

    fn mesh_refs(&self, item: &DrawItem) -> Vec<MeshRef> {
        match item.mesh {
            DrawMesh::GroundPlane => vec![MeshRef::Ground],
            DrawMesh::Capsule => vec![MeshRef::Capsule],
            DrawMesh::Asset(node) => {
                let count = self
                    .uploaded
                    .as_ref()
                    .and_then(|uploaded| uploaded.meshes.get(node))
                    .map_or(0, Vec::len);
                (0..count)
                    .map(|primitive| MeshRef::Asset { node, primitive })
                    .collect()
            }
        }
    }

    /// Writes one model uniform per primitive draw and returns the draw list.
    fn prepare_draws(&mut self, ctx: &Context, snapshot: &FrameSnapshot) -> Vec<Draw> {
        let mut draws = Vec::new();
        let mut uniforms = Vec::new();
        for item in &snapshot.items {
            for mesh_ref in self.mesh_refs(item) {
                let Some(mesh) = self.mesh(mesh_ref) else {
                    continue;
                };
                let color = item.color.unwrap_or(mesh.base_color);
                draws.push(Draw {
                    mesh: mesh_ref,
                    slot: uniforms.len() as u64,
                    cast_shadow: item.cast_shadow,
                });
                uniforms.push(ModelUniform::new(item.model, color, item.receive_shadow));
            }
        }

        let needed = uniforms.len() as u64;
        if needed > self.model_capacity {
            self.model_capacity = needed.next_power_of_two();
            let (buffer, bind_group) =
                Self::mk_model_buffer(&ctx.device, &self.model_layout, self.model_capacity);
            self.model_buffer = buffer;
            self.model_bind_group = bind_group;
        }
        let mut bytes = vec![0u8; (needed * MODEL_STRIDE) as usize];
        for (i, uniform) in uniforms.iter().enumerate() {
            let start = i * MODEL_STRIDE as usize;
            let raw = bytemuck::bytes_of(uniform);
            bytes[start..start + raw.len()].copy_from_slice(raw);
        }
        if !bytes.is_empty() {
            ctx.queue.write_buffer(&self.model_buffer, 0, &bytes);
        }
        draws
    }

    fn draw_mesh(&self, pass: &mut wgpu::RenderPass<'_>, draw: &Draw) {
        let Some(mesh) = self.mesh(draw.mesh) else {
            return;
        };
        pass.set_bind_group(1, &self.model_bind_group, &[(draw.slot * MODEL_STRIDE) as u32]);
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..mesh.num_elements, 0, 0..1);
    }

    pub fn render(&mut self, ctx: &Context, snapshot: &FrameSnapshot) -> Result<(), wgpu::SurfaceError> {
        let output = ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if let Some(asset) = &snapshot.asset {
            self.upload_asset(&ctx.device, asset);
        }
        let draws = self.prepare_draws(ctx, snapshot);
        let frame = FrameUniform::new(snapshot, &ctx.projection, &self.lighting);
        ctx.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[frame]));

        let lines: Vec<LineVertex> = snapshot
            .debug_lines
            .iter()
            .flat_map(|line| {
                [
                    LineVertex {
                        position: line.from,
                        color: line.color,
                    },
                    LineVertex {
                        position: line.to,
                        color: line.color,
                    },
                ]
            })
            .collect();
        let line_buffer = (!lines.is_empty()).then(|| {
            ctx.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Debug Line Buffer"),
                    contents: bytemuck::cast_slice(&lines),
                    usage: wgpu::BufferUsages::VERTEX,
                })
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            if self.lighting.sun.cast_shadow {
                pass.set_pipeline(&self.shadow_pipeline);
                pass.set_bind_group(0, &self.frame_bind_group, &[]);
                for draw in draws.iter().filter(|draw| draw.cast_shadow) {
                    self.draw_mesh(&mut pass, draw);
                }
            }
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Lit Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.hdr.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.lit_pipeline);
            pass.set_bind_group(0, &self.lit_bind_group, &[]);
            for draw in &draws {
                self.draw_mesh(&mut pass, draw);
            }

            if let Some(buffer) = &line_buffer {
                pass.set_pipeline(&self.debug_pipeline);
                pass.set_bind_group(0, &self.frame_bind_group, &[]);
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.draw(0..lines.len() as u32, 0..1);
            }
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Post Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.post_pipeline);
            pass.set_bind_group(0, &self.post_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
