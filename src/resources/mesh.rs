use wgpu::util::DeviceExt;

use crate::data_structures::model;

/// Turn the CPU side `tobj` meshes into vertex / index buffers.
///
/// Missing texture coordinates or normals default to zero.
pub fn load_meshes(
    models: &[tobj::Model],
    file_name: &str,
    device: &wgpu::Device,
) -> Vec<model::Mesh> {
    models
        .iter()
        .map(|m| {
            let vertices = to_vertices(&m.mesh);

            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Vertex Buffer", file_name)),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Index Buffer", file_name)),
                // The indices are for positions, texels, and normals because we set `single_index` to true
                contents: bytemuck::cast_slice(&m.mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

            model::Mesh {
                name: format!("{}:{}", file_name, m.name),
                vertex_buffer,
                index_buffer,
                num_elements: m.mesh.indices.len() as u32,
            }
        })
        .collect::<Vec<_>>()
}

pub(crate) fn to_vertices(mesh: &tobj::Mesh) -> Vec<model::ModelVertex> {
    (0..mesh.positions.len() / 3)
        .map(|i| model::ModelVertex {
            position: [
                mesh.positions[i * 3],
                mesh.positions[i * 3 + 1],
                mesh.positions[i * 3 + 2],
            ],
            // obj has v pointing up, wgpu samples with v pointing down
            tex_coords: [
                mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                1.0 - mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
            ],
            normal: [
                mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
            ],
        })
        .collect()
}
