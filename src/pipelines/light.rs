use wgpu::util::DeviceExt;

use crate::world::{DirectionalLight, PointLight};

/// Point lights the shaders have room for.
pub const MAX_POINT_LIGHTS: usize = 4;

pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl std::fmt::Debug for LightResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightResources")
            .field("uniform", &self.uniform)
            .finish_non_exhaustive()
    }
}

impl LightResources {
    pub fn new(uniform: LightUniform, device: &wgpu::Device) -> Self {
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

// vec3s are padded to vec4 so the layout matches WGSL uniform alignment.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirectionalLightRaw {
    direction: [f32; 4],
    ambient: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightRaw {
    position: [f32; 4],
    ambient: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
    /// constant, linear, quadratic, unused
    attenuation: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    directional: DirectionalLightRaw,
    points: [PointLightRaw; MAX_POINT_LIGHTS],
    point_count: u32,
    /// Seconds since start, drives the foliage sway.
    time: f32,
    _padding: [u32; 2],
}

fn pad(v: cgmath::Vector3<f32>) -> [f32; 4] {
    [v.x, v.y, v.z, 0.0]
}

impl LightUniform {
    pub fn new(directional: &DirectionalLight, points: &[PointLight], time: f32) -> Self {
        if points.len() > MAX_POINT_LIGHTS {
            log::warn!(
                "{} point lights in the scene, only the first {} are rendered",
                points.len(),
                MAX_POINT_LIGHTS
            );
        }
        let mut raw_points = [PointLightRaw::default(); MAX_POINT_LIGHTS];
        for (raw, light) in raw_points.iter_mut().zip(points) {
            *raw = PointLightRaw {
                position: pad(light.position),
                ambient: pad(light.ambient),
                diffuse: pad(light.diffuse),
                specular: pad(light.specular),
                attenuation: [light.constant, light.linear, light.quadratic, 0.0],
            };
        }
        Self {
            directional: DirectionalLightRaw {
                direction: pad(directional.direction),
                ambient: pad(directional.ambient),
                diffuse: pad(directional.diffuse),
                specular: pad(directional.specular),
            },
            points: raw_points,
            point_count: points.len().min(MAX_POINT_LIGHTS) as u32,
            time,
            _padding: [0; 2],
        }
    }

    pub fn point_count(&self) -> u32 {
        self.point_count
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = time;
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Uniform Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
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
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::default_lights;

    #[test]
    fn uniform_is_sixteen_byte_aligned() {
        assert_eq!(std::mem::size_of::<LightUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<PointLightRaw>(), 80);
    }

    #[test]
    fn extra_point_lights_are_dropped() {
        let (directional, mut points) = default_lights();
        let copy = points.clone();
        points.extend(copy);
        let uniform = LightUniform::new(&directional, &points, 0.0);
        assert_eq!(uniform.point_count(), MAX_POINT_LIGHTS as u32);
    }
}
