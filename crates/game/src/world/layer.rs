use std::collections::BTreeMap;

use engine::{ChunkLayers, TileDef, TileKind, Vec2};
use tracing::debug;

use crate::error::DoorError;
use crate::geometry::Rect;
use crate::item::Item;
use crate::registry::Registry;

use super::spatial::{tile_center, Obstacles, SpawnGrid};

pub const PLAYER_MARKER: &str = "P";
pub const ZOMBIE_MARKER: &str = "Z";
pub const ITEM_MARKER: &str = "I";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Open,
    Closed,
}

impl DoorState {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "open" => Some(Self::Open),
            "close" | "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "close",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Open => Self::Closed,
            Self::Closed => Self::Open,
        }
    }
}

/// Everything derived from one active layer's tile data. Built in full
/// before it replaces the previous layer.
#[derive(Debug, Clone)]
pub struct LayerRuntime {
    layer: u8,
    chunk_id: u32,
    is_giant: bool,
    tiles: ChunkLayers,
    tile_size: f32,
    tile_defs: BTreeMap<String, TileDef>,
    solid: Vec<bool>,
    door_states: BTreeMap<(i32, i32), DoorState>,
    container_tiles: Vec<(i32, i32)>,
    containers: Vec<Item>,
    zombie_markers: Vec<Vec2>,
    item_markers: Vec<Vec2>,
    player_spawn: Option<Vec2>,
    spawn_grid: SpawnGrid,
}

impl LayerRuntime {
    pub fn build(
        layer: u8,
        chunk_id: u32,
        is_giant: bool,
        tiles: ChunkLayers,
        registry: &Registry,
        tile_size: f32,
        spawn_cell_size: f32,
    ) -> Self {
        let mut tile_defs = BTreeMap::new();
        for (_, _, id) in tiles.base.iter().chain(tiles.ground.iter()).chain(tiles.spawn.iter()) {
            if id.is_empty() || tile_defs.contains_key(id) {
                continue;
            }
            if let Some(def) = registry.tile(id) {
                tile_defs.insert(id.to_string(), def.clone());
            }
        }

        let mut runtime = Self {
            layer,
            chunk_id,
            is_giant,
            solid: vec![false; tiles.base.width() * tiles.base.height()],
            tiles,
            tile_size,
            tile_defs,
            door_states: BTreeMap::new(),
            container_tiles: Vec::new(),
            containers: Vec::new(),
            zombie_markers: Vec::new(),
            item_markers: Vec::new(),
            player_spawn: None,
            spawn_grid: SpawnGrid::new(spawn_cell_size),
        };

        let mut unknown = 0usize;
        let cells = runtime
            .tiles
            .base
            .iter()
            .map(|(x, y, id)| (x, y, id.to_string()))
            .collect::<Vec<_>>();
        for (x, y, id) in cells {
            if id.is_empty() {
                continue;
            }
            let Some(def) = runtime.tile_defs.get(&id) else {
                unknown += 1;
                continue;
            };
            if def.is_statable {
                let state = def
                    .state
                    .as_deref()
                    .and_then(DoorState::parse)
                    .unwrap_or(DoorState::Closed);
                runtime.door_states.insert((x, y), state);
            }
            if def.kind == TileKind::Container {
                runtime.container_tiles.push((x, y));
            }
        }
        if unknown > 0 {
            debug!(layer, chunk_id, unknown, "layer_unknown_tile_ids");
        }

        for (x, y, id) in runtime.tiles.spawn.iter() {
            let center = tile_center(x, y, tile_size);
            match id.trim() {
                PLAYER_MARKER => {
                    runtime.player_spawn.get_or_insert(center);
                }
                ZOMBIE_MARKER => runtime.zombie_markers.push(center),
                ITEM_MARKER => runtime.item_markers.push(center),
                _ => {}
            }
        }
        for marker in runtime.zombie_markers.clone() {
            runtime.spawn_grid.insert(marker);
        }
        runtime.rebuild_solid();
        runtime
    }

    fn rebuild_solid(&mut self) {
        let width = self.tiles.base.width();
        for (x, y, id) in self.tiles.base.iter() {
            let index = y as usize * width + x as usize;
            self.solid[index] = match self.tile_defs.get(id) {
                Some(def) if def.is_statable => {
                    self.door_states.get(&(x, y)) == Some(&DoorState::Closed)
                }
                Some(def) => def.is_obstacle,
                None => false,
            };
        }
    }

    pub fn layer(&self) -> u8 {
        self.layer
    }

    pub fn chunk_id(&self) -> u32 {
        self.chunk_id
    }

    pub fn is_giant(&self) -> bool {
        self.is_giant
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn width(&self) -> usize {
        self.tiles.base.width()
    }

    pub fn height(&self) -> usize {
        self.tiles.base.height()
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.width() as f32 * self.tile_size,
            self.height() as f32 * self.tile_size,
        )
    }

    /// Walls just outside the map on every side.
    pub fn boundary_walls(&self) -> [Rect; 4] {
        let bounds = self.bounds();
        let t = self.tile_size;
        [
            Rect::new(-t, -t, bounds.w + 2.0 * t, t),
            Rect::new(bounds.w, -t, t, bounds.h + 2.0 * t),
            Rect::new(-t, bounds.h, bounds.w + 2.0 * t, t),
            Rect::new(-t, -t, t, bounds.h + 2.0 * t),
        ]
    }

    pub fn tiles(&self) -> &ChunkLayers {
        &self.tiles
    }

    /// Structural tile at a grid position, falling back to the floor layer.
    pub fn get_tile_at(&self, grid_x: i32, grid_y: i32) -> Option<&TileDef> {
        let base = self.tiles.base.get(grid_x, grid_y)?;
        if !base.is_empty() {
            return self.tile_defs.get(base);
        }
        let ground = self.tiles.ground.get(grid_x, grid_y)?;
        self.tile_defs.get(ground)
    }

    pub fn tile_def(&self, id: &str) -> Option<&TileDef> {
        self.tile_defs.get(id)
    }

    pub fn is_solid(&self, grid_x: i32, grid_y: i32) -> bool {
        if grid_x < 0 || grid_y < 0 {
            return true;
        }
        let (x, y) = (grid_x as usize, grid_y as usize);
        if x >= self.width() || y >= self.height() {
            return true;
        }
        self.solid[y * self.width() + x]
    }

    pub fn teleport_target_at(&self, grid_x: i32, grid_y: i32) -> Option<u8> {
        let id = self.tiles.base.get(grid_x, grid_y)?;
        if let Some(TileKind::Teleport(layer)) = self.tile_defs.get(id).map(|def| def.kind) {
            return Some(layer);
        }
        let layer = id.strip_prefix('[')?.strip_suffix(']')?.parse::<u8>().ok()?;
        (1..=9).contains(&layer).then_some(layer)
    }

    pub fn door_state(&self, grid_x: i32, grid_y: i32) -> Option<DoorState> {
        self.door_states.get(&(grid_x, grid_y)).copied()
    }

    pub fn door_states(&self) -> &BTreeMap<(i32, i32), DoorState> {
        &self.door_states
    }

    pub fn restore_door_states(&mut self, states: BTreeMap<(i32, i32), DoorState>) {
        for (pos, state) in states {
            if let Some(current) = self.door_states.get_mut(&pos) {
                *current = state;
            }
        }
        self.rebuild_solid();
    }

    /// Flips a door unless `blocker` overlaps its tile.
    pub fn toggle_door_state(
        &mut self,
        grid_x: i32,
        grid_y: i32,
        blocker: &Rect,
    ) -> Result<DoorState, DoorError> {
        if self.tiles.base.get(grid_x, grid_y).is_none() {
            return Err(DoorError::OutOfBounds {
                x: grid_x,
                y: grid_y,
            });
        }
        let Some(current) = self.door_state(grid_x, grid_y) else {
            return Err(DoorError::NotADoor);
        };
        if Rect::tile(grid_x, grid_y, self.tile_size).intersects(blocker) {
            return Err(DoorError::PlayerInDoorway);
        }
        let next = current.toggled();
        self.door_states.insert((grid_x, grid_y), next);
        let index = grid_y as usize * self.width() + grid_x as usize;
        self.solid[index] = next == DoorState::Closed;
        Ok(next)
    }

    /// Every blocking rectangle, boundary walls included.
    pub fn obstacle_rects(&self) -> Vec<Rect> {
        let mut rects = self
            .tiles
            .base
            .iter()
            .filter(|(x, y, _)| self.is_solid(*x, *y))
            .map(|(x, y, _)| Rect::tile(x, y, self.tile_size))
            .collect::<Vec<_>>();
        rects.extend(self.boundary_walls());
        rects
    }

    pub fn container_tiles(&self) -> &[(i32, i32)] {
        &self.container_tiles
    }

    pub fn containers(&self) -> &[Item] {
        &self.containers
    }

    pub fn containers_mut(&mut self) -> &mut Vec<Item> {
        &mut self.containers
    }

    pub fn set_containers(&mut self, containers: Vec<Item>) {
        self.containers = containers;
    }

    pub fn zombie_markers(&self) -> &[Vec2] {
        &self.zombie_markers
    }

    pub fn item_markers(&self) -> &[Vec2] {
        &self.item_markers
    }

    pub fn player_spawn(&self) -> Option<Vec2> {
        self.player_spawn
    }

    pub fn spawn_grid(&self) -> &SpawnGrid {
        &self.spawn_grid
    }

    /// Reuses a spawn grid built earlier for this layer.
    pub fn set_spawn_grid(&mut self, grid: SpawnGrid) {
        self.spawn_grid = grid;
    }

    fn tile_span(&self, min: f32, max: f32) -> (i32, i32) {
        let first = (min / self.tile_size).floor() as i32;
        let last = (max / self.tile_size).ceil() as i32 - 1;
        (first, last.max(first))
    }
}

impl Obstacles for LayerRuntime {
    fn blocks(&self, rect: &Rect) -> bool {
        let (x0, x1) = self.tile_span(rect.x, rect.right());
        let (y0, y1) = self.tile_span(rect.y, rect.bottom());
        (y0..=y1).any(|y| (x0..=x1).any(|x| self.is_solid(x, y)))
    }

    fn blocking_rects_along(&self, a: Vec2, b: Vec2) -> Vec<Rect> {
        let (x0, x1) = self.tile_span(a.x.min(b.x), a.x.max(b.x) + f32::EPSILON);
        let (y0, y1) = self.tile_span(a.y.min(b.y), a.y.max(b.y) + f32::EPSILON);
        let mut rects = Vec::new();
        for y in y0..=y1 {
            for x in x0..=x1 {
                if self.is_solid(x, y) {
                    rects.push(Rect::tile(x, y, self.tile_size));
                }
            }
        }
        rects
    }
}

/// Test grids from strings: one char per cell, space is empty and a digit
/// `n` is the teleport tile `[n]`.
#[cfg(test)]
pub(crate) fn grid_from_rows(rows: &[&str]) -> engine::Grid {
    engine::Grid::from_rows(
        rows.iter()
            .map(|row| {
                row.chars()
                    .map(|c| match c {
                        ' ' => String::new(),
                        digit if digit.is_ascii_digit() => format!("[{digit}]"),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_registry;

    fn runtime(base: &[&str], spawn: &[&str]) -> LayerRuntime {
        let base = grid_from_rows(base);
        let (w, h) = (base.width(), base.height());
        let layers = ChunkLayers {
            ground: engine::Grid::new(w, h, "."),
            spawn: grid_from_rows(spawn).resized(w, h, ""),
            base,
        };
        LayerRuntime::build(1, 1, true, layers, &test_registry(), 32.0, 512.0)
    }

    #[test]
    fn obstacles_and_markers_come_from_tiles() {
        let layer = runtime(
            &["#####", "#   #", "# C #", "#####"],
            &["     ", " P Z ", "   I ", "     "],
        );
        assert!(layer.is_solid(0, 0));
        assert!(!layer.is_solid(1, 1));
        assert!(layer.is_solid(2, 2));
        assert!(layer.is_solid(-1, 1));
        assert_eq!(layer.container_tiles(), &[(2, 2)]);
        assert_eq!(layer.player_spawn(), Some(tile_center(1, 1, 32.0)));
        assert_eq!(layer.zombie_markers().len(), 1);
        assert_eq!(layer.item_markers().len(), 1);
        assert_eq!(layer.spawn_grid().len(), 1);
        assert!(layer.blocks(&Rect::new(20.0, 40.0, 20.0, 20.0)));
        assert!(!layer.blocks(&Rect::new(36.0, 36.0, 20.0, 20.0)));
    }

    #[test]
    fn door_toggled_twice_restores_obstacles() {
        let mut layer = runtime(&["#####", "# D #", "#####"], &[]);
        let before = layer.obstacle_rects();
        assert_eq!(layer.door_state(2, 1), Some(DoorState::Closed));
        let away = Rect::new(40.0, 40.0, 10.0, 10.0);

        assert_eq!(layer.toggle_door_state(2, 1, &away), Ok(DoorState::Open));
        assert!(!layer.is_solid(2, 1));
        assert_eq!(layer.toggle_door_state(2, 1, &away), Ok(DoorState::Closed));
        assert_eq!(layer.obstacle_rects(), before);
    }

    #[test]
    fn door_does_not_close_on_player() {
        let mut layer = runtime(&["#####", "# D #", "#####"], &[]);
        let away = Rect::new(40.0, 40.0, 10.0, 10.0);
        layer.toggle_door_state(2, 1, &away).expect("open");

        let in_doorway = Rect::from_center(tile_center(2, 1, 32.0), 24.0, 24.0);
        assert_eq!(
            layer.toggle_door_state(2, 1, &in_doorway),
            Err(DoorError::PlayerInDoorway)
        );
        assert_eq!(layer.door_state(2, 1), Some(DoorState::Open));
        assert!(!layer.is_solid(2, 1));
        assert_eq!(layer.toggle_door_state(1, 1, &away), Err(DoorError::NotADoor));
    }

    #[test]
    fn teleport_tiles_resolve_target_layer() {
        let base = engine::Grid::from_rows(vec![vec!["[2]".to_string(), "[7]".to_string(), ".".to_string()]]);
        let layers = ChunkLayers {
            ground: engine::Grid::new(3, 1, ""),
            spawn: engine::Grid::new(3, 1, ""),
            base,
        };
        let layer = LayerRuntime::build(1, 1, true, layers, &test_registry(), 32.0, 512.0);
        assert_eq!(layer.teleport_target_at(0, 0), Some(2));
        assert_eq!(layer.teleport_target_at(1, 0), Some(7));
        assert_eq!(layer.teleport_target_at(2, 0), None);
    }
}
