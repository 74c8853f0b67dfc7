use crate::{
    data_structures::model::{MeshVertex, Vertex},
    pipelines::{PipelineDesc, depth_state, mk_render_pipeline},
};

/// Depth-only pipeline rendering shadow casters from the light.
///
/// Group 0 is the frame uniform (only `light_view_proj` is read), group 1
/// the per-draw model uniform.
pub fn mk_shadow_pipeline(
    device: &wgpu::Device,
    frame_layout: &wgpu::BindGroupLayout,
    model_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shadow Pipeline Layout"),
        bind_group_layouts: &[frame_layout, model_layout],
        push_constant_ranges: &[],
    });
    mk_render_pipeline(
        device,
        PipelineDesc {
            label: "Shadow Pipeline",
            layout: &layout,
            shader: wgpu::ShaderModuleDescriptor {
                label: Some("Shadow Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shadow.wgsl").into()),
            },
            vertex_layouts: &[MeshVertex::desc()],
            color_format: None,
            depth: Some(depth_state(
                true,
                wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            )),
            topology: wgpu::PrimitiveTopology::TriangleList,
            // level meshes are often single sided
            cull_mode: None,
        },
    )
}
