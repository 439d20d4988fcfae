use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("failed to read map directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read map file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("map file {path} has no rows")]
    Empty { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeDirection {
    Top,
    Right,
    Bottom,
    Left,
}

impl EdgeDirection {
    pub const ALL: [EdgeDirection; 4] = [Self::Top, Self::Right, Self::Bottom, Self::Left];

    pub fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Right => Self::Left,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
        }
    }

    /// Grid step in chunk units, y grows downward.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Self::Top => (0, -1),
            Self::Right => (1, 0),
            Self::Bottom => (0, 1),
            Self::Left => (-1, 0),
        }
    }
}

/// Connection ids on the four chunk edges; 0 means no neighbour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkEdges {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl ChunkEdges {
    pub fn get(&self, direction: EdgeDirection) -> u32 {
        match direction {
            EdgeDirection::Top => self.top,
            EdgeDirection::Right => self.right,
            EdgeDirection::Bottom => self.bottom,
            EdgeDirection::Left => self.left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkKey {
    pub layer: u8,
    pub chunk_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerFileKind {
    Map,
    Ground,
    Spawn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub key: ChunkKey,
    pub edges: ChunkEdges,
    pub map_path: Option<PathBuf>,
    pub ground_path: Option<PathBuf>,
    pub spawn_path: Option<PathBuf>,
}

/// Dense grid of tile ids; an empty string is an empty cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<String>,
}

impl Grid {
    pub fn new(width: usize, height: usize, fill: &str) -> Self {
        Self {
            width,
            height,
            cells: vec![fill.to_string(); width * height],
        }
    }

    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let height = rows.len();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut grid = Self::new(width, height, "");
        for (y, row) in rows.into_iter().enumerate() {
            for (x, cell) in row.into_iter().enumerate() {
                grid.cells[y * width + x] = cell;
            }
        }
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&str> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(self.cells[y as usize * self.width + x as usize].as_str())
    }

    pub fn set(&mut self, x: i32, y: i32, value: &str) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        let index = y as usize * self.width + x as usize;
        self.cells[index] = value.to_string();
        true
    }

    /// Pads or trims to the given size.
    pub fn resized(&self, width: usize, height: usize, fill: &str) -> Grid {
        let mut out = Grid::new(width, height, fill);
        for y in 0..height.min(self.height) {
            for x in 0..width.min(self.width) {
                out.cells[y * width + x] = self.cells[y * self.width + x].clone();
            }
        }
        out
    }

    /// Copies `source` into this grid with its top-left at `(ox, oy)`.
    pub fn blit(&mut self, source: &Grid, ox: usize, oy: usize) {
        for y in 0..source.height {
            for x in 0..source.width {
                let (tx, ty) = (ox + x, oy + y);
                if tx < self.width && ty < self.height {
                    self.cells[ty * self.width + tx] = source.cells[y * source.width + x].clone();
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, &str)> {
        let width = self.width.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| ((index % width) as i32, (index / width) as i32, cell.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkLayers {
    pub base: Grid,
    pub ground: Grid,
    pub spawn: Grid,
}

#[derive(Debug, Clone, Default)]
pub struct ChunkCatalog {
    chunks: BTreeMap<ChunkKey, ChunkDescriptor>,
}

impl ChunkCatalog {
    /// Scans `maps_dir` for `map_L<l>_P<id>_<t>_<r>_<b>_<l>_<kind>.csv` files.
    /// Unrecognised file names are ignored.
    pub fn discover(maps_dir: &Path) -> Result<Self, MapLoadError> {
        let mut catalog = Self::default();
        let entries = fs::read_dir(maps_dir).map_err(|source| MapLoadError::ReadDir {
            path: maps_dir.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| MapLoadError::ReadDir {
                path: maps_dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let Some((key, edges, kind)) = parse_chunk_file_name(file_name) else {
                continue;
            };
            let descriptor = catalog.chunks.entry(key).or_insert_with(|| ChunkDescriptor {
                key,
                edges,
                map_path: None,
                ground_path: None,
                spawn_path: None,
            });
            if descriptor.edges != edges {
                warn!(
                    file = %path.display(),
                    layer = key.layer,
                    chunk_id = key.chunk_id,
                    "chunk_edges_disagree_between_layers"
                );
            }
            match kind {
                LayerFileKind::Map => descriptor.map_path = Some(path),
                LayerFileKind::Ground => descriptor.ground_path = Some(path),
                LayerFileKind::Spawn => descriptor.spawn_path = Some(path),
            }
        }
        catalog.chunks.retain(|key, descriptor| {
            let keep = descriptor.map_path.is_some();
            if !keep {
                warn!(layer = key.layer, chunk_id = key.chunk_id, "chunk_missing_map_layer");
            }
            keep
        });
        Ok(catalog)
    }

    pub fn insert(&mut self, descriptor: ChunkDescriptor) {
        self.chunks.insert(descriptor.key, descriptor);
    }

    pub fn get(&self, layer: u8, chunk_id: u32) -> Option<&ChunkDescriptor> {
        self.chunks.get(&ChunkKey { layer, chunk_id })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The chunk on the same layer whose opposite edge carries this edge's id.
    pub fn neighbor(
        &self,
        layer: u8,
        chunk_id: u32,
        direction: EdgeDirection,
    ) -> Option<&ChunkDescriptor> {
        let edge_id = self.get(layer, chunk_id)?.edges.get(direction);
        if edge_id == 0 {
            return None;
        }
        self.chunks.values().find(|candidate| {
            candidate.key.layer == layer
                && candidate.key.chunk_id != chunk_id
                && candidate.edges.get(direction.opposite()) == edge_id
        })
    }
}

fn parse_chunk_file_name(file_name: &str) -> Option<(ChunkKey, ChunkEdges, LayerFileKind)> {
    let stem = file_name.strip_prefix("map_")?.strip_suffix(".csv")?;
    let parts = stem.split('_').collect::<Vec<_>>();
    let [layer, chunk, top, right, bottom, left, kind] = parts.as_slice() else {
        return None;
    };
    let layer = layer.strip_prefix('L')?.parse::<u8>().ok()?;
    if !(1..=9).contains(&layer) {
        return None;
    }
    let chunk_id = chunk.strip_prefix('P')?.parse::<u32>().ok()?;
    let edges = ChunkEdges {
        top: top.parse().ok()?,
        right: right.parse().ok()?,
        bottom: bottom.parse().ok()?,
        left: left.parse().ok()?,
    };
    let kind = match *kind {
        "map" => LayerFileKind::Map,
        "ground" => LayerFileKind::Ground,
        "spawn" => LayerFileKind::Spawn,
        _ => return None,
    };
    Some((ChunkKey { layer, chunk_id }, edges, kind))
}

/// Loads the three layers of a chunk, normalising ground and spawn to the
/// base layer's size. `reference_size` forces every layer to that size
/// (higher layers follow their chunk's L1).
pub fn load_chunk_layers(
    descriptor: &ChunkDescriptor,
    reference_size: Option<(usize, usize)>,
) -> Result<ChunkLayers, MapLoadError> {
    let base = match &descriptor.map_path {
        Some(path) => read_csv_grid(path)?,
        None => Grid::default(),
    };
    let (width, height) = reference_size.unwrap_or((base.width(), base.height()));
    let ground = match &descriptor.ground_path {
        Some(path) => read_csv_grid(path)?,
        None => Grid::default(),
    };
    let spawn = match &descriptor.spawn_path {
        Some(path) => read_csv_grid(path)?,
        None => Grid::default(),
    };
    Ok(ChunkLayers {
        base: base.resized(width, height, ""),
        ground: ground.resized(width, height, ""),
        spawn: spawn.resized(width, height, ""),
    })
}

pub fn read_csv_grid(path: &Path) -> Result<Grid, MapLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| MapLoadError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let grid = parse_csv_grid(&raw);
    if grid.height() == 0 {
        return Err(MapLoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(grid)
}

pub fn parse_csv_grid(raw: &str) -> Grid {
    let rows = raw
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(',').map(|cell| cell.trim().to_string()).collect())
        .collect::<Vec<Vec<String>>>();
    Grid::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn file_name_encodes_layer_chunk_and_edges() {
        let (key, edges, kind) =
            parse_chunk_file_name("map_L2_P7_0_3_0_11_ground.csv").expect("parses");
        assert_eq!(key, ChunkKey { layer: 2, chunk_id: 7 });
        assert_eq!(edges.right, 3);
        assert_eq!(edges.left, 11);
        assert_eq!(kind, LayerFileKind::Ground);
        assert!(parse_chunk_file_name("map_L0_P1_0_0_0_0_map.csv").is_none());
        assert!(parse_chunk_file_name("readme.csv").is_none());
    }

    #[test]
    fn csv_rows_are_padded_to_widest() {
        let grid = parse_csv_grid("#,#,#\n#,.\n\n");
        assert_eq!((grid.width(), grid.height()), (3, 2));
        assert_eq!(grid.get(2, 1), Some(""));
        assert_eq!(grid.get(0, 0), Some("#"));
        assert_eq!(grid.get(3, 0), None);
    }

    #[test]
    fn resize_and_blit() {
        let small = parse_csv_grid("a,b\nc,d");
        let mut big = Grid::new(4, 4, "");
        big.blit(&small, 2, 2);
        assert_eq!(big.get(3, 3), Some("d"));
        let trimmed = small.resized(1, 3, ".");
        assert_eq!(trimmed.get(0, 1), Some("c"));
        assert_eq!(trimmed.get(0, 2), Some("."));
    }

    #[test]
    fn discover_links_neighbours_by_edge_id() {
        let temp = TempDir::new().expect("temp");
        let dir = temp.path();
        fs::write(dir.join("map_L1_P1_0_5_0_0_map.csv"), "#,#\n#,#").expect("write");
        fs::write(dir.join("map_L1_P1_0_5_0_0_spawn.csv"), "P,\n,").expect("write");
        fs::write(dir.join("map_L1_P2_0_0_0_5_map.csv"), ".,.\n.,.").expect("write");
        fs::write(dir.join("map_L1_P3_0_0_0_0_ground.csv"), ".").expect("write");

        let catalog = ChunkCatalog::discover(dir).expect("discover");
        assert_eq!(catalog.len(), 2, "ground-only chunk is skipped");
        let east = catalog
            .neighbor(1, 1, EdgeDirection::Right)
            .expect("east neighbour");
        assert_eq!(east.key.chunk_id, 2);
        assert!(catalog.neighbor(1, 1, EdgeDirection::Top).is_none());

        let layers = load_chunk_layers(catalog.get(1, 1).expect("chunk"), None).expect("layers");
        assert_eq!(layers.spawn.get(0, 0), Some("P"));
        assert_eq!(layers.ground.width(), 2);
    }
}
