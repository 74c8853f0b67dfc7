use crate::{
    data_structures::{
        model::{LineVertex, Vertex},
        texture::Texture,
    },
    pipelines::{PipelineDesc, depth_state, mk_render_pipeline},
};

/// Line list pipeline for the physics debug overlay. Reads only the frame
/// uniform and draws over the lit scene without writing depth.
pub fn mk_debug_pipeline(device: &wgpu::Device, frame_layout: &wgpu::BindGroupLayout) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Debug Line Pipeline Layout"),
        bind_group_layouts: &[frame_layout],
        push_constant_ranges: &[],
    });
    mk_render_pipeline(
        device,
        PipelineDesc {
            label: "Debug Line Pipeline",
            layout: &layout,
            shader: wgpu::ShaderModuleDescriptor {
                label: Some("Debug Line Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("debug.wgsl").into()),
            },
            vertex_layouts: &[LineVertex::desc()],
            color_format: Some(Texture::HDR_FORMAT),
            depth: Some(wgpu::DepthStencilState {
                depth_compare: wgpu::CompareFunction::Always,
                ..depth_state(false, wgpu::DepthBiasState::default())
            }),
            topology: wgpu::PrimitiveTopology::LineList,
            cull_mode: None,
        },
    )
}
