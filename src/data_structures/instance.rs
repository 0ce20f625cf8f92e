//! Entity transforms and their GPU instance layout.
//!
//! Every entity owns one instance slot: position, rotation and scale are
//! packed into a model matrix plus a normal matrix and a tint colour, and
//! passed to the vertex shaders through a per-instance vertex buffer.

use cgmath::{Deg, Matrix3, Matrix4, Vector3};

use crate::data_structures::model;

/// Position, Euler rotation (degrees, applied Y → X → Z) and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    /// Identity transform: no move, rotate, or scale.
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    fn rotation_matrix(&self) -> Matrix3<f32> {
        Matrix3::from_angle_y(Deg(self.rotation.y))
            * Matrix3::from_angle_x(Deg(self.rotation.x))
            * Matrix3::from_angle_z(Deg(self.rotation.z))
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation_matrix())
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self, color: [f32; 4]) -> InstanceRaw {
        InstanceRaw {
            model: self.to_matrix().into(),
            // Scale is kept out of the normal matrix; shaders renormalize.
            normal: self.rotation_matrix().into(),
            color,
        }
    }
}

impl From<Vector3<f32>> for Transform {
    fn from(position: Vector3<f32>) -> Self {
        Transform {
            position,
            ..Default::default()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
    color: [f32; 4],
}

/**
 * As we store vertex data directly in the GPU memory we need to tell what the bytes refer to:
 *
 * offset: zero as we want to use the full space.
 * stride: length of a vertex
 *
 * Stride layout here: model matrix (four vec4s), normal matrix (three vec3s), tint colour.
 */
impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // Shaders only move on to the next instance when they start a new one.
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // A mat4 takes up 4 vertex slots as it is technically 4 vec4s.
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 25]>() as wgpu::BufferAddress,
                    shader_location: 12,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Point3, Transform as _};

    use super::*;

    fn approx(a: Point3<f32>, b: Point3<f32>) -> bool {
        (a - b).magnitude() < 1e-5
    }

    #[test]
    fn identity_leaves_points_alone() {
        let m = Transform::new().to_matrix();
        let p = Point3::new(1.0, 2.0, 3.0);
        assert!(approx(m.transform_point(p), p));
    }

    #[test]
    fn scales_then_rotates_then_translates() {
        let t = Transform {
            position: Vector3::new(10.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 90.0, 0.0),
            scale: Vector3::new(2.0, 1.0, 1.0),
        };
        let p = t.to_matrix().transform_point(Point3::new(1.0, 0.0, 0.0));
        // (1,0,0) -> scaled (2,0,0) -> yaw 90° -> (0,0,-2) -> moved
        assert!(approx(p, Point3::new(10.0, 0.0, -2.0)), "{p:?}");
    }

    #[test]
    fn raw_layout_matches_vertex_description() {
        use crate::data_structures::model::Vertex;
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 29 * 4);
        assert_eq!(
            InstanceRaw::desc().array_stride,
            std::mem::size_of::<InstanceRaw>() as u64
        );
    }
}
