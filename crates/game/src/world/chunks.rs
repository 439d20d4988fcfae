use std::collections::{BTreeMap, HashMap, VecDeque};

use engine::{
    load_chunk_layers, ChunkCatalog, ChunkKey, ChunkLayers, EdgeDirection, Grid, MapLoadError,
    Vec2,
};
use tracing::{info, warn};

use crate::error::WorldLoadError;

use super::layer::PLAYER_MARKER;

/// Layer 1 of every chunk reachable from the start chunk, stitched into one grid.
#[derive(Debug, Clone)]
pub struct GiantMap {
    pub layers: ChunkLayers,
    chunk_size: (usize, usize),
    offsets: BTreeMap<u32, (i32, i32)>,
}

impl GiantMap {
    pub fn chunk_size(&self) -> (usize, usize) {
        self.chunk_size
    }

    pub fn chunk_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.offsets.keys().copied()
    }

    pub fn offset_of(&self, chunk_id: u32) -> Option<(i32, i32)> {
        self.offsets.get(&chunk_id).copied()
    }

    /// Top-left pixel of a chunk inside the stitched grid.
    pub fn chunk_origin_px(&self, chunk_id: u32, tile_size: f32) -> Option<Vec2> {
        let (cx, cy) = self.offset_of(chunk_id)?;
        Some(Vec2::new(
            cx as f32 * self.chunk_size.0 as f32 * tile_size,
            cy as f32 * self.chunk_size.1 as f32 * tile_size,
        ))
    }

    pub fn chunk_at(&self, pos: Vec2, tile_size: f32) -> Option<u32> {
        let cell_w = self.chunk_size.0 as f32 * tile_size;
        let cell_h = self.chunk_size.1 as f32 * tile_size;
        if cell_w <= 0.0 || cell_h <= 0.0 {
            return None;
        }
        let cell = (
            (pos.x / cell_w).floor() as i32,
            (pos.y / cell_h).floor() as i32,
        );
        self.offsets
            .iter()
            .find(|(_, offset)| **offset == cell)
            .map(|(id, _)| *id)
    }
}

/// Chunk files plus any layers supplied in memory.
#[derive(Debug, Clone, Default)]
pub struct WorldMaps {
    catalog: ChunkCatalog,
    preloaded: HashMap<ChunkKey, ChunkLayers>,
}

impl WorldMaps {
    pub fn new(catalog: ChunkCatalog) -> Self {
        Self {
            catalog,
            preloaded: HashMap::new(),
        }
    }

    /// Registers layers that were never written to disk. The catalog still
    /// needs a descriptor for the key so edges resolve.
    pub fn with_preloaded(mut self, key: ChunkKey, layers: ChunkLayers) -> Self {
        self.preloaded.insert(key, layers);
        self
    }

    pub fn catalog(&self) -> &ChunkCatalog {
        &self.catalog
    }

    pub fn has_chunk(&self, layer: u8, chunk_id: u32) -> bool {
        self.catalog.get(layer, chunk_id).is_some()
    }

    pub fn load(
        &self,
        layer: u8,
        chunk_id: u32,
        reference_size: Option<(usize, usize)>,
    ) -> Result<Option<ChunkLayers>, MapLoadError> {
        let key = ChunkKey { layer, chunk_id };
        if let Some(layers) = self.preloaded.get(&key) {
            let (width, height) =
                reference_size.unwrap_or((layers.base.width(), layers.base.height()));
            return Ok(Some(ChunkLayers {
                base: layers.base.resized(width, height, ""),
                ground: layers.ground.resized(width, height, ""),
                spawn: layers.spawn.resized(width, height, ""),
            }));
        }
        let Some(descriptor) = self.catalog.get(layer, chunk_id) else {
            return Ok(None);
        };
        load_chunk_layers(descriptor, reference_size).map(Some)
    }

    pub fn neighbor(&self, layer: u8, chunk_id: u32, direction: EdgeDirection) -> Option<u32> {
        self.catalog
            .neighbor(layer, chunk_id, direction)
            .map(|descriptor| descriptor.key.chunk_id)
    }

    /// Breadth-first stitch of layer 1 outward from `start_chunk`.
    pub fn stitch_giant(&self, start_chunk: u32) -> Result<GiantMap, WorldLoadError> {
        let start = self
            .load(1, start_chunk, None)?
            .ok_or(WorldLoadError::StartChunkMissing { chunk: start_chunk })?;
        let chunk_size = (start.base.width(), start.base.height());
        if chunk_size.0 == 0 || chunk_size.1 == 0 {
            return Err(WorldLoadError::EmptyStartChunk { chunk: start_chunk });
        }

        let mut offsets = BTreeMap::<u32, (i32, i32)>::new();
        let mut taken = HashMap::<(i32, i32), u32>::new();
        let mut queue = VecDeque::from([(start_chunk, (0, 0))]);
        offsets.insert(start_chunk, (0, 0));
        taken.insert((0, 0), start_chunk);
        while let Some((chunk_id, (cx, cy))) = queue.pop_front() {
            for direction in EdgeDirection::ALL {
                let Some(next) = self.neighbor(1, chunk_id, direction) else {
                    continue;
                };
                if offsets.contains_key(&next) {
                    continue;
                }
                let (dx, dy) = direction.offset();
                let offset = (cx + dx, cy + dy);
                if let Some(owner) = taken.get(&offset) {
                    warn!(chunk_id = next, owner = *owner, "chunk_offset_collision");
                    continue;
                }
                offsets.insert(next, offset);
                taken.insert(offset, next);
                queue.push_back((next, offset));
            }
        }

        let min_x = offsets.values().map(|o| o.0).min().unwrap_or(0);
        let min_y = offsets.values().map(|o| o.1).min().unwrap_or(0);
        let max_x = offsets.values().map(|o| o.0).max().unwrap_or(0);
        let max_y = offsets.values().map(|o| o.1).max().unwrap_or(0);
        let grid_w = (max_x - min_x + 1) as usize;
        let grid_h = (max_y - min_y + 1) as usize;
        let (cw, ch) = chunk_size;
        let mut layers = ChunkLayers {
            base: Grid::new(cw * grid_w, ch * grid_h, ""),
            ground: Grid::new(cw * grid_w, ch * grid_h, ""),
            spawn: Grid::new(cw * grid_w, ch * grid_h, ""),
        };

        let mut placed = BTreeMap::new();
        for (chunk_id, (ox, oy)) in offsets {
            let normalized = (ox - min_x, oy - min_y);
            let chunk = if chunk_id == start_chunk {
                start.clone()
            } else {
                match self.load(1, chunk_id, Some(chunk_size)) {
                    Ok(Some(mut chunk)) => {
                        clear_player_markers(&mut chunk.spawn);
                        chunk
                    }
                    Ok(None) => continue,
                    Err(error) => {
                        warn!(chunk_id, error = %error, "chunk_load_failed");
                        continue;
                    }
                }
            };
            let px = normalized.0 as usize * cw;
            let py = normalized.1 as usize * ch;
            layers.base.blit(&chunk.base, px, py);
            layers.ground.blit(&chunk.ground, px, py);
            layers.spawn.blit(&chunk.spawn, px, py);
            placed.insert(chunk_id, normalized);
        }
        info!(
            start_chunk,
            chunks = placed.len(),
            width = layers.base.width(),
            height = layers.base.height(),
            "giant_map_stitched"
        );
        Ok(GiantMap {
            layers,
            chunk_size,
            offsets: placed,
        })
    }
}

fn clear_player_markers(spawn: &mut Grid) {
    let markers = spawn
        .iter()
        .filter(|(_, _, id)| id.trim() == PLAYER_MARKER)
        .map(|(x, y, _)| (x, y))
        .collect::<Vec<_>>();
    for (x, y) in markers {
        spawn.set(x, y, "");
    }
}

#[cfg(test)]
pub(crate) fn chunk_descriptor(
    layer: u8,
    chunk_id: u32,
    edges: [u32; 4],
) -> engine::ChunkDescriptor {
    engine::ChunkDescriptor {
        key: ChunkKey { layer, chunk_id },
        edges: engine::ChunkEdges {
            top: edges[0],
            right: edges[1],
            bottom: edges[2],
            left: edges[3],
        },
        map_path: None,
        ground_path: None,
        spawn_path: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::layer::grid_from_rows;

    fn chunk(base: &[&str], spawn: &[&str]) -> ChunkLayers {
        let base = grid_from_rows(base);
        let (w, h) = (base.width(), base.height());
        ChunkLayers {
            ground: Grid::new(w, h, "."),
            spawn: grid_from_rows(spawn).resized(w, h, ""),
            base,
        }
    }

    fn two_chunk_maps() -> WorldMaps {
        let mut catalog = ChunkCatalog::default();
        catalog.insert(chunk_descriptor(1, 1, [0, 7, 0, 0]));
        catalog.insert(chunk_descriptor(1, 2, [0, 0, 0, 7]));
        WorldMaps::new(catalog)
            .with_preloaded(
                ChunkKey {
                    layer: 1,
                    chunk_id: 1,
                },
                chunk(&["###", "#  ", "###"], &["   ", " P ", "   "]),
            )
            .with_preloaded(
                ChunkKey {
                    layer: 1,
                    chunk_id: 2,
                },
                chunk(&["###", "  #", "###"], &["   ", " P ", "   "]),
            )
    }

    #[test]
    fn stitches_neighbours_side_by_side() {
        let giant = two_chunk_maps().stitch_giant(1).expect("stitch");
        assert_eq!(giant.layers.base.width(), 6);
        assert_eq!(giant.layers.base.height(), 3);
        assert_eq!(giant.offset_of(2), Some((1, 0)));
        assert_eq!(giant.layers.base.get(3, 1), Some(""));
        assert_eq!(giant.layers.base.get(5, 1), Some("#"));
        assert_eq!(giant.chunk_at(Vec2::new(4.0 * 32.0, 40.0), 32.0), Some(2));
    }

    #[test]
    fn only_start_chunk_keeps_player_marker() {
        let giant = two_chunk_maps().stitch_giant(1).expect("stitch");
        let markers = giant
            .layers
            .spawn
            .iter()
            .filter(|(_, _, id)| *id == PLAYER_MARKER)
            .map(|(x, y, _)| (x, y))
            .collect::<Vec<_>>();
        assert_eq!(markers, vec![(1, 1)]);
    }

    #[test]
    fn stitch_from_second_chunk_shifts_offsets() {
        let giant = two_chunk_maps().stitch_giant(2).expect("stitch");
        assert_eq!(giant.offset_of(1), Some((0, 0)));
        assert_eq!(giant.offset_of(2), Some((1, 0)));
        assert_eq!(
            giant.chunk_origin_px(2, 32.0),
            Some(Vec2::new(96.0, 0.0))
        );
    }

    #[test]
    fn missing_start_chunk_is_an_error() {
        let error = two_chunk_maps().stitch_giant(9).expect_err("missing");
        assert!(matches!(error, WorldLoadError::StartChunkMissing { chunk: 9 }));
    }
}
