use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::basic::mk_render_pipeline,
};

/**
 * Pipeline for fire quads.
 *
 * Alpha blended over whatever was drawn before, so fire entities have to be
 * drawn after all opaque kinds. Both sides are visible. Depth is tested
 * but not written.
 */
pub fn mk_fire_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    layout: &wgpu::PipelineLayout,
) -> wgpu::RenderPipeline {
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Fire Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("fire.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        layout,
        format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(Texture::DEPTH_FORMAT),
        false,
        &[ModelVertex::desc(), InstanceRaw::desc()],
        None,
        shader,
    )
}
