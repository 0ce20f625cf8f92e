//! Per-entity drawing, batched by shader kind.
//!
//! Every entity owns one slot of the instance buffer: slot `i` holds the
//! transform and tint of `world.entities()[i]`. Draw calls use the instance
//! range `i..i + 1`, which is how the pick shader recovers the entity index.

use std::{collections::HashMap, iter};

use crate::{
    context::Context,
    data_structures::{
        instance::InstanceRaw,
        model::DrawModel,
        texture::create_default_sampler,
    },
    entity::{Entity, ShaderKind, TextureId},
    resources::{Assets, texture::material_bind_group},
    world::World,
};

/// Colour pass order. Fire is alpha blended and has to come last.
pub const DRAW_ORDER: [ShaderKind; 4] = [
    ShaderKind::Standard,
    ShaderKind::Foliage,
    ShaderKind::Flat,
    ShaderKind::Fire,
];

/// Multiplier applied to the colour of the selected entity.
pub const SELECTION_TINT: [f32; 3] = [1.6, 1.4, 0.6];

type MaterialKey = (Option<TextureId>, Option<TextureId>, Option<TextureId>);

fn material_key(entity: &Entity) -> MaterialKey {
    (entity.albedo, entity.specular, entity.emission)
}

/// Per-instance colour of an entity, tinted when it is selected.
pub fn instance_color(entity: &Entity, selected: bool) -> [f32; 4] {
    let [r, g, b] = entity.color;
    if selected {
        [
            r * SELECTION_TINT[0],
            g * SELECTION_TINT[1],
            b * SELECTION_TINT[2],
            1.0,
        ]
    } else {
        [r, g, b, 1.0]
    }
}

/// Instance slots of the active entities, one batch per entry of [`DRAW_ORDER`].
pub fn batches(world: &World) -> [Vec<u32>; 4] {
    let mut batches: [Vec<u32>; 4] = Default::default();
    for (index, entity) in world.entities().iter().enumerate() {
        if !entity.active {
            continue;
        }
        match u32::try_from(index) {
            Ok(slot) => {
                let batch = DRAW_ORDER
                    .iter()
                    .position(|kind| *kind == entity.shader)
                    .unwrap_or(0);
                batches[batch].push(slot);
            }
            Err(e) => log::error!(
                "Failed to render entity {}. Maximum amount of supported instances is {}. Error: {}",
                index,
                u32::MAX,
                e
            ),
        }
    }
    batches
}

#[derive(Debug)]
pub struct Renderer {
    instance_buffer: wgpu::Buffer,
    capacity: usize,
    len: usize,
    sampler: wgpu::Sampler,
    materials: HashMap<MaterialKey, wgpu::BindGroup>,
}

fn mk_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl Renderer {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            instance_buffer: mk_instance_buffer(device, 1),
            capacity: 1,
            len: 0,
            sampler: create_default_sampler(device),
            materials: HashMap::new(),
        }
    }

    /// Upload the instance data of every entity and create missing material
    /// bind groups. Must run before [`Renderer::draw`] or
    /// [`Renderer::draw_ids`] whenever the world changed.
    pub fn prepare(&mut self, ctx: &Context, world: &World, assets: &Assets, selected: Option<usize>) {
        let instances: Vec<InstanceRaw> = world
            .entities()
            .iter()
            .enumerate()
            .map(|(i, e)| e.transform.to_raw(instance_color(e, selected == Some(i))))
            .collect();

        if instances.len() > self.capacity {
            self.capacity = instances.len().next_power_of_two();
            self.instance_buffer = mk_instance_buffer(&ctx.device, self.capacity);
            log::debug!("Grew instance buffer to {} slots", self.capacity);
        }
        if !instances.is_empty() {
            ctx.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
        self.len = instances.len();

        for entity in world.entities() {
            self.materials
                .entry(material_key(entity))
                .or_insert_with(|| {
                    material_bind_group(
                        &ctx.device,
                        &ctx.pipelines.material_layout,
                        assets.albedo_or_white(entity.albedo),
                        assets.map_or_black(entity.specular),
                        assets.map_or_black(entity.emission),
                        &self.sampler,
                    )
                });
        }
    }

    /// Colour pass: active entities, kind by kind in [`DRAW_ORDER`].
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, ctx: &Context, world: &World, assets: &Assets) {
        if self.len == 0 {
            return;
        }
        pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        pass.set_bind_group(1, &ctx.camera.bind_group, &[]);
        pass.set_bind_group(2, &ctx.light.bind_group, &[]);

        for (kind, batch) in DRAW_ORDER.iter().zip(batches(world)) {
            if batch.is_empty() {
                continue;
            }
            pass.set_pipeline(ctx.pipelines.pipeline(*kind));
            pass.set_bind_group(3, ctx.pipelines.kind_group(*kind), &[]);
            for slot in batch {
                if slot as usize >= self.len {
                    continue;
                }
                let entity = &world.entities()[slot as usize];
                let (Some(model), Some(material)) = (
                    assets.model(entity.model),
                    self.materials.get(&material_key(entity)),
                ) else {
                    continue;
                };
                pass.set_bind_group(0, material, &[]);
                pass.draw_model_instanced(model, slot..slot + 1);
            }
        }
    }

    /// Pick pass: every entity, inactive ones included, with the id pipeline.
    pub fn draw_ids(&self, pass: &mut wgpu::RenderPass<'_>, ctx: &Context, world: &World, assets: &Assets) {
        if self.len == 0 {
            return;
        }
        pass.set_pipeline(&ctx.pipelines.pick);
        pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        for (index, entity) in world.entities().iter().enumerate().take(self.len) {
            let Ok(slot) = u32::try_from(index) else {
                break;
            };
            if let Some(model) = assets.model(entity.model) {
                pass.draw_model_instanced(model, slot..slot + 1);
            }
        }
    }

    /// Draw one frame to the surface.
    pub fn render(&self, ctx: &Context, world: &World, assets: &Assets) -> Result<(), wgpu::SurfaceError> {
        let output = ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            self.draw(&mut render_pass, ctx, world, assets);
        }

        ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ModelId;

    #[test]
    fn fire_is_batched_last_and_inactive_entities_are_skipped() {
        let mut world = World::default();
        world.spawn(Entity::new("fire", ModelId(0), ShaderKind::Fire));
        world.spawn(Entity::new("glass", ModelId(0), ShaderKind::Standard));
        let hidden = world.spawn(Entity::new("grass", ModelId(0), ShaderKind::Foliage));
        world.spawn(Entity::new("dirt", ModelId(0), ShaderKind::Flat));
        world.get_mut(hidden).unwrap().active = false;

        let [standard, foliage, flat, fire] = batches(&world);
        assert_eq!(standard, [1]);
        assert!(foliage.is_empty());
        assert_eq!(flat, [3]);
        assert_eq!(fire, [0]);
    }

    #[test]
    fn only_the_selected_entity_is_tinted() {
        let mut entity = Entity::new("glass", ModelId(0), ShaderKind::Standard);
        entity.color = [0.5, 0.5, 0.5];
        assert_eq!(instance_color(&entity, false), [0.5, 0.5, 0.5, 1.0]);
        let tinted = instance_color(&entity, true);
        assert_eq!(tinted[0], 0.5 * SELECTION_TINT[0]);
        assert_eq!(tinted[3], 1.0);
    }
}
