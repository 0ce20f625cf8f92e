//! Render pipelines, one per [`ShaderKind`] plus the pick pipeline.
//!
//! Bind groups shared by the colour pipelines:
//! 0 material textures, 1 camera, 2 lights, 3 kind parameters.

use wgpu::util::DeviceExt;

use crate::{entity::ShaderKind, resources::texture::material_layout};

pub mod basic;
pub mod light;
pub mod pick;
pub mod transparent;

/// Per-kind material parameters, bound at group 3.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KindUniform {
    pub shininess: f32,
    /// Sway amplitude of the upper half of a mesh.
    pub wind: f32,
    /// Fragments with a lower albedo alpha are discarded.
    pub alpha_cutoff: f32,
    /// 0 single texture, 1 side/top/bottom.
    pub mode: u32,
}

impl KindUniform {
    pub fn for_kind(kind: ShaderKind) -> Self {
        match kind {
            ShaderKind::Standard => Self {
                shininess: 64.0,
                wind: 0.0,
                alpha_cutoff: 0.1,
                mode: 0,
            },
            ShaderKind::Foliage => Self {
                shininess: 64.0,
                wind: 0.2,
                alpha_cutoff: 0.1,
                mode: 0,
            },
            ShaderKind::Flat => Self {
                shininess: 64.0,
                wind: 0.0,
                alpha_cutoff: 0.1,
                mode: 1,
            },
            ShaderKind::Fire => Self {
                shininess: 32.0,
                wind: 0.0,
                alpha_cutoff: 0.0,
                mode: 0,
            },
        }
    }
}

fn mk_kind_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("kind_bind_group_layout"),
    })
}

fn mk_kind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    kind: ShaderKind,
) -> wgpu::BindGroup {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{kind:?} Kind Buffer")),
        contents: bytemuck::cast_slice(&[KindUniform::for_kind(kind)]),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
        label: Some("kind_bind_group"),
    })
}

#[derive(Debug)]
pub struct Pipelines {
    pub material_layout: wgpu::BindGroupLayout,
    standard: wgpu::RenderPipeline,
    foliage: wgpu::RenderPipeline,
    flat: wgpu::RenderPipeline,
    fire: wgpu::RenderPipeline,
    pub pick: wgpu::RenderPipeline,
    kind_groups: Vec<wgpu::BindGroup>,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let material_layout = material_layout(device);
        let kind_layout = mk_kind_layout(device);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[
                &material_layout,
                camera_bind_group_layout,
                light_bind_group_layout,
                &kind_layout,
            ],
            ..Default::default()
        });

        let kind_groups = ShaderKind::ALL
            .iter()
            .map(|kind| mk_kind_group(device, &kind_layout, *kind))
            .collect();

        Self {
            standard: basic::mk_block_pipeline(device, format, &layout, ShaderKind::Standard),
            foliage: basic::mk_block_pipeline(device, format, &layout, ShaderKind::Foliage),
            flat: basic::mk_block_pipeline(device, format, &layout, ShaderKind::Flat),
            fire: transparent::mk_fire_pipeline(device, format, &layout),
            pick: pick::mk_pick_pipeline(device, camera_bind_group_layout),
            material_layout,
            kind_groups,
        }
    }

    pub fn pipeline(&self, kind: ShaderKind) -> &wgpu::RenderPipeline {
        match kind {
            ShaderKind::Standard => &self.standard,
            ShaderKind::Foliage => &self.foliage,
            ShaderKind::Flat => &self.flat,
            ShaderKind::Fire => &self.fire,
        }
    }

    pub fn kind_group(&self, kind: ShaderKind) -> &wgpu::BindGroup {
        &self.kind_groups[kind.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_uniform_is_one_vec4() {
        assert_eq!(std::mem::size_of::<KindUniform>(), 16);
    }

    #[test]
    fn only_foliage_sways() {
        for kind in ShaderKind::ALL {
            let wind = KindUniform::for_kind(kind).wind;
            assert_eq!(wind > 0.0, kind == ShaderKind::Foliage, "{kind:?}");
        }
        assert_eq!(KindUniform::for_kind(ShaderKind::Fire).shininess, 32.0);
        assert_eq!(KindUniform::for_kind(ShaderKind::Flat).mode, 1);
    }
}
