use std::path::Path;

use emberblock::{
    cgmath::Vector3,
    entity::{ModelId, ShaderKind, TextureId},
    fire::{FIRE_FRAME_COUNT, FIRE_FRAME_DURATION, FireAnimation},
    map::{MapError, VegetationRegion, VoxelMap},
    scene::{self, SceneAssets},
    world::World,
};
use instant::Duration;
use rand::{SeedableRng, rngs::StdRng};

fn fixture() -> VoxelMap {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/level.map");
    VoxelMap::load(path).expect("fixture map loads")
}

fn scene_assets() -> SceneAssets {
    SceneAssets {
        cube: ModelId(0),
        plants: ModelId(1),
        fire: ModelId(2),
        glass: Some(TextureId(0)),
        grass: Some(TextureId(1)),
        flower: Some(TextureId(2)),
        planks: Some(TextureId(3)),
        house: Some(TextureId(4)),
        bricks: Some(TextureId(5)),
        dirt_side: Some(TextureId(6)),
        dirt_top: Some(TextureId(7)),
        dirt_bottom: Some(TextureId(8)),
        specular: Some(TextureId(9)),
        fire_frames: (0..FIRE_FRAME_COUNT).map(|i| Some(TextureId(100 + i))).collect(),
    }
}

#[test]
fn fixture_map_has_three_layers() {
    let map = fixture();
    assert_eq!(map.layer_count(), 3);
    assert_eq!(map.get(1, 1, 0), Some(7));
    assert_eq!(map.get(2, 1, 1), Some(9));
    assert_eq!(map.get(2, 2, 0), None);
}

#[test]
fn missing_map_is_reported_as_not_found() {
    let err = VoxelMap::load("tests/fixtures/missing.map").unwrap_err();
    assert!(matches!(err, MapError::NotFound { .. }));
    assert!(err.to_string().contains("missing.map"));
}

#[test]
fn populate_spawns_known_cells_and_extra_fires() {
    let map = fixture();
    let assets = scene_assets();
    let mut world = World::new(FireAnimation::new(assets.fire_frames.clone(), FIRE_FRAME_DURATION));

    // Six dirt cells, glass, fire, grass, flower. Code 9 is skipped.
    let spawned = scene::populate(&map, &assets, &mut world);
    assert_eq!(spawned, 10 + scene::EXTRA_FIRES.len());
    assert_eq!(world.len(), spawned);

    let tags: Vec<&str> = world.entities().iter().map(|e| e.tag.as_str()).collect();
    assert_eq!(&tags[..6], &["dirt"; 6]);
    assert_eq!(&tags[6..10], &["glass", "fire", "grass", "flower"]);

    let glass = world.get(6).unwrap();
    assert_eq!(glass.transform.position, Vector3::new(0.0, 1.0, 1.0));
    let flower = world.get(9).unwrap();
    assert_eq!(flower.transform.position, Vector3::new(1.0, 2.0, 2.0));
    assert_eq!(flower.shader, ShaderKind::Foliage);

    let dirt = world.get(0).unwrap();
    assert_eq!(dirt.shader, ShaderKind::Flat);
    assert_eq!(dirt.albedo, Some(TextureId(6)));
    assert_eq!(dirt.specular, Some(TextureId(7)));
    assert_eq!(dirt.emission, Some(TextureId(8)));

    let extra = world.get(spawned - 1).unwrap();
    assert_eq!(extra.tag, "fire");
    assert_eq!(extra.transform.position, scene::EXTRA_FIRES[1]);
}

#[test]
fn world_update_animates_every_fire() {
    let map = fixture();
    let assets = scene_assets();
    let mut world = World::new(FireAnimation::new(assets.fire_frames.clone(), FIRE_FRAME_DURATION));
    scene::populate(&map, &assets, &mut world);

    world.update(FIRE_FRAME_DURATION * 3 + Duration::from_millis(10));
    assert_eq!(world.fire().current_frame(), 3);

    let fires: Vec<_> = world
        .entities()
        .iter()
        .filter(|e| e.shader == ShaderKind::Fire)
        .collect();
    assert_eq!(fires.len(), 1 + scene::EXTRA_FIRES.len());
    for fire in fires {
        assert_eq!(fire.albedo, Some(TextureId(103)));
        assert!((0.8..=1.0).contains(&fire.transform.scale.y));
    }
}

#[test]
fn vegetation_scatter_only_touches_its_region() {
    let mut map = VoxelMap::from_layers(vec![vec![vec![4; 6]; 4], vec![vec![5; 6]; 4]]);
    let region = VegetationRegion {
        layer: 1,
        rows: 1..3,
        columns: 2..5,
        ..VegetationRegion::default()
    };
    let mut rng = StdRng::seed_from_u64(3);
    assert!(map.randomize_vegetation(&mut rng, &region));

    for (y, x, z, code) in map.tiles() {
        let inside = y == 1 && region.rows.contains(&x) && region.columns.contains(&z);
        if inside {
            assert!(matches!(code, 0 | 2 | 6), "unexpected code {code}");
        } else {
            assert_eq!(code, if y == 0 { 4 } else { 5 });
        }
    }
}

#[test]
fn vegetation_scatter_rejects_small_maps() {
    let mut map = fixture();
    let before = map.clone();
    let mut rng = StdRng::seed_from_u64(3);
    assert!(!map.randomize_vegetation(&mut rng, &VegetationRegion::default()));
    assert_eq!(map, before);
}
