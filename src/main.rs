use emberblock::{
    config::Config,
    flow,
    map::{MapError, VegetationRegion, VoxelMap},
};
use rand::{SeedableRng, rngs::StdRng};

fn main() -> anyhow::Result<()> {
    flow::init_logger();

    let mut config = Config::load("config.json")?;
    config.resolve_asset_root();

    let mut map = match VoxelMap::load(config.map_path()) {
        Ok(map) => map,
        Err(e @ MapError::NotFound { .. }) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    map.randomize_vegetation(&mut rng, &VegetationRegion::default());

    flow::run(config, map)
}
