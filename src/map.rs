//! Tile map loading.
//!
//! A map file is a whitespace separated stream of integers. Two negative
//! sentinels shape the stream into layers and rows:
//!
//! - [`NEW_LAYER`] (`-2`) starts a new layer (with one empty row)
//! - [`NEW_ROW`] (`-1`) starts a new row within the current layer
//!
//! Every other token is a tile code appended to the current row. The map
//! always starts with one layer holding one empty row, so `N` layer
//! sentinels yield `N + 1` layers.

use std::{
    fs, io,
    ops::Range,
    path::{Path, PathBuf},
    str::FromStr,
};

use rand::Rng;

/// Token that opens a new layer.
pub const NEW_LAYER: i64 = -2;
/// Token that opens a new row in the current layer.
pub const NEW_ROW: i64 = -1;

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("map file not found at: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read map file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid map token {token:?} at position {position}")]
    InvalidToken { token: String, position: usize },
}

/// Layers × rows × columns of tile codes.
///
/// Rows are not required to have equal length; the map keeps whatever the
/// file describes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoxelMap {
    layers: Vec<Vec<Vec<u32>>>,
}

impl VoxelMap {
    /// Read and parse a map file. A missing file is reported as
    /// [`MapError::NotFound`] so callers can treat it separately.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => MapError::NotFound {
                path: path.to_path_buf(),
            },
            _ => MapError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let map = text.parse::<VoxelMap>()?;
        log::info!(
            "Loaded map {} with {} layers and {} cells",
            path.display(),
            map.layer_count(),
            map.tiles().count()
        );
        Ok(map)
    }

    pub fn from_layers(layers: Vec<Vec<Vec<u32>>>) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &[Vec<Vec<u32>>] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn get(&self, layer: usize, row: usize, column: usize) -> Option<u32> {
        self.layers.get(layer)?.get(row)?.get(column).copied()
    }

    pub fn set(&mut self, layer: usize, row: usize, column: usize, code: u32) -> bool {
        match self
            .layers
            .get_mut(layer)
            .and_then(|l| l.get_mut(row))
            .and_then(|r| r.get_mut(column))
        {
            Some(cell) => {
                *cell = code;
                true
            }
            None => false,
        }
    }

    /// Iterate over every cell as `(layer, row, column, code)`, empty cells included.
    pub fn tiles(&self) -> impl Iterator<Item = (usize, usize, usize, u32)> + '_ {
        self.layers.iter().enumerate().flat_map(|(y, layer)| {
            layer.iter().enumerate().flat_map(move |(x, row)| {
                row.iter().enumerate().map(move |(z, code)| (y, x, z, *code))
            })
        })
    }

    /// Scatter grass and flowers over a rectangle of `region.layer`.
    ///
    /// Each cell becomes grass with probability `grass_chance`, a flower with
    /// probability `flower_chance` and is emptied otherwise. Returns `false`
    /// and leaves the map untouched when the region does not fit.
    pub fn randomize_vegetation<R: Rng>(
        &mut self,
        rng: &mut R,
        region: &VegetationRegion,
    ) -> bool {
        let fits = self.layers.get(region.layer).is_some_and(|layer| {
            layer.len() >= region.rows.end
                && layer
                    .first()
                    .is_some_and(|row| row.len() >= region.columns.end)
        });
        if !fits {
            log::error!(
                "Map is not properly loaded or vegetation region {:?} is out of bounds.",
                region
            );
            return false;
        }

        for x in region.rows.clone() {
            for z in region.columns.clone() {
                let roll: f32 = rng.r#gen();
                let code = if roll < region.grass_chance {
                    GRASS_CODE
                } else if roll < region.grass_chance + region.flower_chance {
                    FLOWER_CODE
                } else {
                    0
                };
                if self.set(region.layer, x, z, code) {
                    log::debug!("Vegetation [{}][{}][{}] = {}", region.layer, x, z, code);
                }
            }
        }
        true
    }
}

const GRASS_CODE: u32 = 2;
const FLOWER_CODE: u32 = 6;

impl FromStr for VoxelMap {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut layers: Vec<Vec<Vec<u32>>> = vec![vec![Vec::new()]];
        for (position, token) in s.split_whitespace().enumerate() {
            let invalid = || MapError::InvalidToken {
                token: token.to_string(),
                position,
            };
            let number: i64 = token.parse().map_err(|_| invalid())?;
            // Both vectors are never empty: the map starts with a layer and
            // every new layer starts with a row.
            match number {
                NEW_LAYER => layers.push(vec![Vec::new()]),
                NEW_ROW => {
                    if let Some(layer) = layers.last_mut() {
                        layer.push(Vec::new());
                    }
                }
                n if n < 0 => return Err(invalid()),
                n => {
                    let code = u32::try_from(n).map_err(|_| invalid())?;
                    if let Some(row) = layers.last_mut().and_then(|layer| layer.last_mut()) {
                        row.push(code);
                    }
                }
            }
        }
        Ok(Self { layers })
    }
}

/// Rectangle of a single layer that gets random vegetation.
#[derive(Clone, Debug, PartialEq)]
pub struct VegetationRegion {
    pub layer: usize,
    pub rows: Range<usize>,
    pub columns: Range<usize>,
    pub grass_chance: f32,
    pub flower_chance: f32,
}

impl Default for VegetationRegion {
    fn default() -> Self {
        Self {
            layer: 1,
            rows: 5..10,
            columns: 15..20,
            grass_chance: 0.4,
            flower_chance: 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn shape(map: &VoxelMap) -> Vec<Vec<usize>> {
        map.layers()
            .iter()
            .map(|layer| layer.iter().map(Vec::len).collect())
            .collect()
    }

    #[test]
    fn empty_input_has_one_layer_with_one_row() {
        let map: VoxelMap = "".parse().unwrap();
        assert_eq!(shape(&map), vec![vec![0]]);
    }

    #[test]
    fn sentinels_shape_layers_and_rows() {
        let map: VoxelMap = "1 2 3 -1 4 5 6 -2 7 8 -1 9 0 -1 1 1".parse().unwrap();
        assert_eq!(shape(&map), vec![vec![3, 3], vec![2, 2, 2]]);
        assert_eq!(map.get(0, 1, 2), Some(6));
        assert_eq!(map.get(1, 0, 0), Some(7));
        assert_eq!(map.get(1, 2, 1), Some(1));
        assert_eq!(map.get(2, 0, 0), None);
    }

    #[test]
    fn n_layer_sentinels_give_n_plus_one_layers() {
        for n in 0..5 {
            let text = (0..n).map(|_| "1 -1 2 -2").collect::<Vec<_>>().join(" ");
            let map: VoxelMap = text.parse().unwrap();
            assert_eq!(map.layer_count(), n + 1);
        }
    }

    #[test]
    fn newlines_and_tabs_are_whitespace() {
        let map: VoxelMap = "1\t2\n-1\n3  4\r\n-2\n5".parse().unwrap();
        assert_eq!(shape(&map), vec![vec![2, 2], vec![1]]);
    }

    #[test]
    fn trailing_row_sentinel_leaves_an_empty_row() {
        let map: VoxelMap = "1 -1".parse().unwrap();
        assert_eq!(shape(&map), vec![vec![1, 0]]);
    }

    #[test]
    fn rejects_garbage_and_unknown_negatives() {
        let err = "1 2 x 3".parse::<VoxelMap>().unwrap_err();
        assert!(matches!(
            err,
            MapError::InvalidToken { ref token, position: 2 } if token == "x"
        ));

        let err = "1 -3".parse::<VoxelMap>().unwrap_err();
        assert!(matches!(err, MapError::InvalidToken { position: 1, .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = VoxelMap::load("definitely/not/here.map").unwrap_err();
        assert!(matches!(err, MapError::NotFound { .. }));
    }

    #[test]
    fn tiles_walk_layer_row_column() {
        let map: VoxelMap = "1 2 -1 3 -2 4".parse().unwrap();
        let tiles: Vec<_> = map.tiles().collect();
        assert_eq!(
            tiles,
            vec![(0, 0, 0, 1), (0, 0, 1, 2), (0, 1, 0, 3), (1, 0, 0, 4)]
        );
    }

    fn flat_layer(rows: usize, columns: usize) -> Vec<Vec<u32>> {
        vec![vec![0; columns]; rows]
    }

    #[test]
    fn vegetation_only_touches_the_region() {
        let mut map = VoxelMap::from_layers(vec![flat_layer(12, 22), flat_layer(12, 22)]);
        for (_, x, z, _) in map.clone().tiles() {
            map.set(1, x, z, 9);
        }
        let mut rng = StdRng::seed_from_u64(7);
        assert!(map.randomize_vegetation(&mut rng, &VegetationRegion::default()));

        for (y, x, z, code) in map.tiles() {
            let inside = y == 1 && (5..10).contains(&x) && (15..20).contains(&z);
            if inside {
                assert!([0, 2, 6].contains(&code), "unexpected code {code}");
            } else if y == 1 {
                assert_eq!(code, 9);
            } else {
                assert_eq!(code, 0);
            }
        }
    }

    #[test]
    fn vegetation_respects_probabilities() {
        let mut map = VoxelMap::from_layers(vec![flat_layer(1, 1), flat_layer(1, 1)]);
        let region = VegetationRegion {
            layer: 1,
            rows: 0..1,
            columns: 0..1,
            grass_chance: 1.0,
            flower_chance: 0.0,
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(map.randomize_vegetation(&mut rng, &region));
        assert_eq!(map.get(1, 0, 0), Some(2));

        let region = VegetationRegion {
            grass_chance: 0.0,
            flower_chance: 1.0,
            ..region
        };
        assert!(map.randomize_vegetation(&mut rng, &region));
        assert_eq!(map.get(1, 0, 0), Some(6));
    }

    #[test]
    fn vegetation_out_of_bounds_leaves_map_untouched() {
        let mut map = VoxelMap::from_layers(vec![flat_layer(3, 3)]);
        let before = map.clone();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(!map.randomize_vegetation(&mut rng, &VegetationRegion::default()));
        assert_eq!(map, before);

        let mut map = VoxelMap::from_layers(vec![flat_layer(3, 3), flat_layer(6, 6)]);
        let before = map.clone();
        assert!(!map.randomize_vegetation(&mut rng, &VegetationRegion::default()));
        assert_eq!(map, before);
    }

    #[test]
    fn vegetation_skips_cells_missing_from_short_rows() {
        let mut map = VoxelMap::from_layers(vec![vec![vec![4; 3], vec![4]]]);
        let region = VegetationRegion {
            layer: 0,
            rows: 0..2,
            columns: 0..3,
            grass_chance: 1.0,
            flower_chance: 0.0,
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(map.randomize_vegetation(&mut rng, &region));
        assert_eq!(map.layers()[0], vec![vec![GRASS_CODE; 3], vec![GRASS_CODE]]);
        assert!(!map.set(0, 1, 2, 7));
    }
}
