use crate::{
    config::{PostProcessingConfig, ToneMapping},
    pipelines::{PipelineDesc, mk_render_pipeline, uniform_entry},
};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PostUniform {
    /// intensity, luminance threshold, luminance smoothing, enabled
    pub bloom: [f32; 4],
    /// exposure, brightness, contrast, ACES enabled
    pub grade: [f32; 4],
    /// offset, darkness, eskil, enabled
    pub vignette: [f32; 4],
    /// 1 / width, 1 / height, blur radius scale, unused
    pub texel: [f32; 4],
}

fn flag(on: bool) -> f32 {
    if on { 1.0 } else { 0.0 }
}

impl PostUniform {
    pub fn new(config: &PostProcessingConfig, width: u32, height: u32) -> Self {
        let bloom = &config.bloom;
        let vignette = &config.vignette;
        Self {
            bloom: [
                bloom.intensity,
                bloom.luminance_threshold,
                bloom.luminance_smoothing,
                flag(bloom.enabled),
            ],
            grade: [
                config.exposure,
                config.brightness,
                config.contrast,
                flag(config.tone_mapping == ToneMapping::AcesFilmic),
            ],
            vignette: [
                vignette.offset,
                vignette.darkness,
                flag(vignette.eskil),
                flag(vignette.enabled),
            ],
            texel: [
                1.0 / width.max(1) as f32,
                1.0 / height.max(1) as f32,
                // the mip chain blur reaches further than a single level
                if bloom.mipmap_blur { 4.0 } else { 1.0 },
                0.0,
            ],
        }
    }
}

/// HDR colour, its sampler and the post uniform.
pub fn mk_post_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("post_bind_group_layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            uniform_entry(2, false),
        ],
    })
}

/// Fullscreen triangle writing the graded image to the surface format.
pub fn mk_post_pipeline(
    device: &wgpu::Device,
    surface_format: wgpu::TextureFormat,
    post_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Post Pipeline Layout"),
        bind_group_layouts: &[post_layout],
        push_constant_ranges: &[],
    });
    mk_render_pipeline(
        device,
        PipelineDesc {
            label: "Post Pipeline",
            layout: &layout,
            shader: wgpu::ShaderModuleDescriptor {
                label: Some("Post Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("post.wgsl").into()),
            },
            vertex_layouts: &[],
            color_format: Some(surface_format),
            depth: None,
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
        },
    )
}
