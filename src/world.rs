//! The world: entity collection, clock, fire animation and lights.

use cgmath::Vector3;
use instant::Duration;

use crate::{
    entity::{Entity, UpdateCtx},
    fire::FireAnimation,
};

#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vector3<f32>,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vector3::new(-0.2, -1.0, -0.3),
            ambient: Vector3::new(0.05, 0.05, 0.05),
            diffuse: Vector3::new(0.4, 0.4, 0.4),
            specular: Vector3::new(0.5, 0.5, 0.5),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vector3<f32>,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            ambient: Vector3::new(0.2, 0.2, 0.2),
            diffuse: Vector3::new(0.5, 0.5, 0.5),
            specular: Vector3::new(1.0, 1.0, 1.0),
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

/// One white directional light plus a white, red, green and blue point light.
pub fn default_lights() -> (DirectionalLight, Vec<PointLight>) {
    let white = PointLight::default();
    let red = PointLight {
        position: Vector3::new(0.0, 0.0, 1.0),
        ambient: Vector3::new(4.0, 0.0, 0.0),
        ..white.clone()
    };
    let green = PointLight {
        position: Vector3::new(-2.0, -2.0, -2.0),
        ambient: Vector3::new(0.0, 4.0, 0.0),
        ..white.clone()
    };
    let blue = PointLight {
        position: Vector3::new(2.0, 2.0, 2.0),
        ambient: Vector3::new(0.0, 0.0, 4.0),
        ..white.clone()
    };
    (DirectionalLight::default(), vec![white, red, green, blue])
}

/// Owns every entity of the scene.
///
/// Entities are addressed by their index in spawn order. That index is also
/// their instance slot on the GPU and the value written to the pick buffer.
#[derive(Debug)]
pub struct World {
    entities: Vec<Entity>,
    elapsed: Duration,
    fire: FireAnimation,
    directional_light: DirectionalLight,
    point_lights: Vec<PointLight>,
}

impl World {
    pub fn new(fire: FireAnimation) -> Self {
        let (directional_light, point_lights) = default_lights();
        Self {
            entities: Vec::new(),
            elapsed: Duration::ZERO,
            fire,
            directional_light,
            point_lights,
        }
    }

    /// Register an entity and return its index.
    pub fn spawn(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.entities.get_mut(index)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Seconds since the world was created.
    pub fn time(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn fire(&self) -> &FireAnimation {
        &self.fire
    }

    pub fn directional_light(&self) -> &DirectionalLight {
        &self.directional_light
    }

    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    /// Advance the clock and the fire animation, then run the update
    /// callback of every active entity.
    pub fn update(&mut self, dt: Duration) {
        self.elapsed += dt;
        self.fire.advance(dt);
        let ctx = UpdateCtx {
            dt,
            time: self.elapsed.as_secs_f32(),
            fire: &self.fire,
        };
        for entity in self.entities.iter_mut().filter(|e| e.active) {
            if let Some(update) = entity.update {
                update(&ctx, entity);
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(FireAnimation::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entity::{ModelId, ShaderKind, TextureId},
        fire::animate_fire,
    };

    fn bump(_: &UpdateCtx<'_>, entity: &mut Entity) {
        entity.transform.position.y += 1.0;
    }

    #[test]
    fn spawn_returns_sequential_indices() {
        let mut world = World::default();
        assert!(world.is_empty());
        let a = world.spawn(Entity::new("a", ModelId(0), ShaderKind::Standard));
        let b = world.spawn(Entity::new("b", ModelId(0), ShaderKind::Standard));
        assert_eq!((a, b), (0, 1));
        assert_eq!(world.len(), 2);
        assert_eq!(world.get(1).map(|e| e.tag.as_str()), Some("b"));
        assert!(world.get(2).is_none());
    }

    #[test]
    fn update_skips_inactive_entities() {
        let mut world = World::default();
        let active = world.spawn(Entity::new("a", ModelId(0), ShaderKind::Standard).with_update(bump));
        let idle = world.spawn(Entity::new("b", ModelId(0), ShaderKind::Standard).with_update(bump));
        world.get_mut(idle).unwrap().active = false;

        world.update(Duration::from_millis(16));
        assert_eq!(world.get(active).unwrap().transform.position.y, 1.0);
        assert_eq!(world.get(idle).unwrap().transform.position.y, 0.0);
    }

    #[test]
    fn fire_entities_follow_the_shared_frame() {
        let frames = (0..3).map(|i| Some(TextureId(i))).collect();
        let mut world = World::new(FireAnimation::new(frames, Duration::from_millis(50)));
        let first = world.spawn(Entity::new("fire", ModelId(0), ShaderKind::Fire).with_update(animate_fire));
        let second = world.spawn(Entity::new("fire", ModelId(0), ShaderKind::Fire).with_update(animate_fire));

        world.update(Duration::from_millis(120));
        assert_eq!(world.fire().current_frame(), 2);
        assert_eq!(world.get(first).unwrap().albedo, Some(TextureId(2)));
        assert_eq!(world.get(second).unwrap().albedo, Some(TextureId(2)));
        assert!((world.time() - 0.12).abs() < 1e-6);
    }

    #[test]
    fn default_scene_has_four_point_lights() {
        let world = World::default();
        assert_eq!(world.point_lights().len(), 4);
        assert_eq!(world.point_lights()[1].ambient, Vector3::new(4.0, 0.0, 0.0));
    }
}
