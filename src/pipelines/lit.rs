use crate::{
    data_structures::{
        model::{MeshVertex, Vertex},
        texture::Texture,
    },
    pipelines::{PipelineDesc, depth_state, mk_render_pipeline, uniform_entry},
};

/// Frame uniform plus the shadow map and its comparison sampler.
pub fn mk_lit_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("lit_bind_group_layout"),
        entries: &[
            uniform_entry(0, false),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
    })
}

pub fn mk_lit_pipeline(
    device: &wgpu::Device,
    lit_layout: &wgpu::BindGroupLayout,
    model_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Lit Pipeline Layout"),
        bind_group_layouts: &[lit_layout, model_layout],
        push_constant_ranges: &[],
    });
    mk_render_pipeline(
        device,
        PipelineDesc {
            label: "Lit Pipeline",
            layout: &layout,
            shader: wgpu::ShaderModuleDescriptor {
                label: Some("Lit Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("lit.wgsl").into()),
            },
            vertex_layouts: &[MeshVertex::desc()],
            color_format: Some(Texture::HDR_FORMAT),
            depth: Some(depth_state(true, wgpu::DepthBiasState::default())),
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
        },
    )
}
