use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
    },
    pipelines::basic::mk_render_pipeline,
};

/// Colour format of the pick target: one signed entity index per pixel.
pub const PICK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Sint;
pub const PICK_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Draws every instance as its instance index into a [`PICK_FORMAT`] target.
///
/// Only the camera is bound (group 0); materials do not matter for ids.
pub fn mk_pick_pipeline(
    device: &wgpu::Device,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Pick Pipeline Layout"),
        bind_group_layouts: &[camera_bind_group_layout],
        ..Default::default()
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Pick Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("pick.wgsl").into()),
    };

    // Plants and fire are single quads, so both faces must be pickable.
    // Integer targets cannot blend.
    mk_render_pipeline(
        device,
        &layout,
        PICK_FORMAT,
        None,
        Some(PICK_DEPTH_FORMAT),
        true,
        &[ModelVertex::desc(), InstanceRaw::desc()],
        None,
        shader,
    )
}
