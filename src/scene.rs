//! Turning a [`VoxelMap`] into entities.

use cgmath::Vector3;

use crate::{
    entity::{Entity, ModelId, ShaderKind, TextureId, UpdateFn, rotate},
    fire::{FIRE_FRAME_COUNT, animate_fire},
    map::VoxelMap,
    resources::Assets,
    world::World,
};

/// Fires that stand on their own, independent of the map.
pub const EXTRA_FIRES: [Vector3<f32>; 2] = [
    Vector3 { x: 5.0, y: 1.0, z: 5.0 },
    Vector3 { x: 3.0, y: 1.0, z: 7.0 },
];

/// Handles of everything the tile archetypes draw with.
///
/// Any texture may be `None` when its file failed to load.
#[derive(Clone, Debug)]
pub struct SceneAssets {
    pub cube: ModelId,
    pub plants: ModelId,
    pub fire: ModelId,
    pub glass: Option<TextureId>,
    pub grass: Option<TextureId>,
    pub flower: Option<TextureId>,
    pub planks: Option<TextureId>,
    pub house: Option<TextureId>,
    pub bricks: Option<TextureId>,
    pub dirt_side: Option<TextureId>,
    pub dirt_top: Option<TextureId>,
    pub dirt_bottom: Option<TextureId>,
    pub specular: Option<TextureId>,
    pub fire_frames: Vec<Option<TextureId>>,
}

impl SceneAssets {
    /// Load the models and textures of the demo scene.
    ///
    /// Models are required; a missing texture only logs.
    pub async fn load(
        assets: &mut Assets,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> anyhow::Result<Self> {
        let frame_files: Vec<String> = (1..=FIRE_FRAME_COUNT)
            .map(|i| format!("textures/fire_textures/fire_{i}.png"))
            .collect();
        let fire_frames = assets.load_textures(&frame_files, device, queue).await;

        Ok(Self {
            cube: assets.load_model("models/cube.obj", device).await?,
            plants: assets.load_model("models/plants.obj", device).await?,
            fire: assets.load_model("models/fire.obj", device).await?,
            glass: assets.load_texture("textures/glass.png", device, queue).await,
            grass: assets.load_texture("textures/grass.png", device, queue).await,
            flower: assets.load_texture("textures/blue_orchid.png", device, queue).await,
            planks: assets.load_texture("textures/oak_planks.png", device, queue).await,
            house: assets.load_texture("textures/house.png", device, queue).await,
            bricks: assets.load_texture("textures/bricks.png", device, queue).await,
            dirt_side: assets
                .load_texture("textures/grass_block_side.png", device, queue)
                .await,
            dirt_top: assets
                .load_texture("textures/grass_block_top.png", device, queue)
                .await,
            dirt_bottom: assets.load_texture("textures/dirt_bottom.png", device, queue).await,
            specular: assets
                .load_texture("textures/container2_specular.png", device, queue)
                .await,
            fire_frames,
        })
    }

    fn first_fire_frame(&self) -> Option<TextureId> {
        self.fire_frames.first().copied().flatten()
    }
}

/// Block archetype of a map tile code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileKind {
    Glass,
    Grass,
    OakPlank,
    Dirt,
    Brick,
    Flower,
    Fire,
    House,
}

impl TileKind {
    /// `None` for empty (0) and unknown codes.
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => Self::Glass,
            2 => Self::Grass,
            3 => Self::OakPlank,
            4 => Self::Dirt,
            5 => Self::Brick,
            6 => Self::Flower,
            7 => Self::Fire,
            8 => Self::House,
            _ => return None,
        })
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Glass => "glass",
            Self::Grass => "grass",
            Self::OakPlank => "oakplank",
            Self::Dirt => "dirt",
            Self::Brick => "brick",
            Self::Flower => "flower",
            Self::Fire => "fire",
            Self::House => "house",
        }
    }

    /// Build the entity for this archetype at `position`.
    pub fn spawn(self, assets: &SceneAssets, position: Vector3<f32>) -> Entity {
        let (model, shader, albedo, update) = match self {
            Self::Glass => (assets.cube, ShaderKind::Standard, assets.glass, None),
            Self::Grass => (assets.plants, ShaderKind::Foliage, assets.grass, Some(rotate as UpdateFn)),
            Self::OakPlank => (assets.cube, ShaderKind::Standard, assets.planks, Some(rotate as UpdateFn)),
            Self::Dirt => {
                return Entity::new(self.tag(), assets.cube, ShaderKind::Flat)
                    .with_position(position)
                    .with_textures(assets.dirt_side, assets.dirt_top, assets.dirt_bottom);
            }
            Self::Brick => (assets.cube, ShaderKind::Standard, assets.bricks, Some(rotate as UpdateFn)),
            Self::Flower => (assets.plants, ShaderKind::Foliage, assets.flower, Some(rotate as UpdateFn)),
            Self::Fire => (
                assets.fire,
                ShaderKind::Fire,
                assets.first_fire_frame(),
                Some(animate_fire as UpdateFn),
            ),
            Self::House => (assets.cube, ShaderKind::Standard, assets.house, Some(rotate as UpdateFn)),
        };

        let mut entity = Entity::new(self.tag(), model, shader)
            .with_position(position)
            .with_textures(albedo, assets.specular, None);
        entity.update = update;
        entity
    }
}

/// Spawn one entity per non-empty map cell, then the free-standing fires.
///
/// A cell at layer `y`, row `x`, column `z` lands at world position
/// `(x, y, z)`. Returns the number of entities spawned.
pub fn populate(map: &VoxelMap, assets: &SceneAssets, world: &mut World) -> usize {
    let before = world.len();
    let mut unknown = 0;
    for (y, x, z, code) in map.tiles() {
        if code == 0 {
            continue;
        }
        match TileKind::from_code(code) {
            Some(kind) => {
                world.spawn(kind.spawn(assets, Vector3::new(x as f32, y as f32, z as f32)));
            }
            None => unknown += 1,
        }
    }
    if unknown > 0 {
        log::warn!("Ignored {} map cells with unknown tile codes", unknown);
    }

    for position in EXTRA_FIRES {
        world.spawn(TileKind::Fire.spawn(assets, position));
    }

    let spawned = world.len() - before;
    log::info!("Populated scene with {} entities", spawned);
    spawned
}
