mod actions;
mod chunks;
mod layer;
mod location;
mod spatial;
mod spawn;
mod transition;

use std::collections::BTreeMap;

use engine::Vec2;
use rand::rngs::StdRng;
use tracing::info;

use crate::clock::Clock;
use crate::config::GameConfig;
use crate::daynight::DayNightCycle;
use crate::entity::{Player, Projectile, Zombie};
use crate::error::WorldLoadError;
use crate::geometry::Rect;
use crate::item::{Item, ItemId, ItemIdAllocator};
use crate::messages::MessageLog;
use crate::registry::Registry;

pub use actions::TransferTarget;
pub use chunks::{GiantMap, WorldMaps};
pub use layer::{DoorState, LayerRuntime, ITEM_MARKER, PLAYER_MARKER, ZOMBIE_MARKER};
pub use location::SourceLocation;
pub use spatial::{find_free_tile, line_of_sight, snap_to_tile, tile_center, Obstacles, SpawnGrid};

#[cfg(test)]
pub(crate) use chunks::chunk_descriptor;
#[cfg(test)]
pub(crate) use layer::grid_from_rows;

/// Search radius, in tiles, for dropped items and corpses.
pub const DROP_SEARCH_RADIUS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameState {
    #[default]
    Playing,
    Paused,
    GameOver,
}

/// Entities parked while their layer is not active.
#[derive(Debug, Clone, Default)]
pub struct LayerSnapshot {
    pub ground: Vec<Item>,
    pub zombies: Vec<Zombie>,
    pub containers: Vec<Item>,
    pub door_states: BTreeMap<(i32, i32), DoorState>,
}

pub struct GameWorld {
    pub config: GameConfig,
    registry: Registry,
    pub clock: Clock,
    pub rng: StdRng,
    pub ids: ItemIdAllocator,
    next_zombie_id: u64,
    pub player: Player,
    pub ground: Vec<Item>,
    pub zombies: Vec<Zombie>,
    pub projectiles: Vec<Projectile>,
    pub layer: LayerRuntime,
    maps: WorldMaps,
    giant: GiantMap,
    giant_spawn_grid: SpawnGrid,
    /// Keyed by layer and the chunk the runtime was built for.
    snapshots: BTreeMap<(u8, u32), LayerSnapshot>,
    pub messages: MessageLog,
    pub day_night: DayNightCycle,
    pub state: GameState,
    pub hover_tile: Option<(i32, i32)>,
    last_respawn_ms: u64,
    last_decay_ms: u64,
}

impl GameWorld {
    /// Stitches the start chunk's layer 1, places the player and runs the
    /// first spawn pass.
    pub fn new(
        config: GameConfig,
        registry: Registry,
        maps: WorldMaps,
        clock: Clock,
        rng: StdRng,
    ) -> Result<Self, WorldLoadError> {
        let giant = maps.stitch_giant(config.start_chunk)?;
        let layer = LayerRuntime::build(
            1,
            config.start_chunk,
            true,
            giant.layers.clone(),
            &registry,
            config.tile_size,
            config.spawn_cell_size,
        );
        let now = clock.now_ms();
        let spawn = layer
            .player_spawn()
            .unwrap_or_else(|| layer.bounds().center());
        let spawn = find_free_tile(spawn, 10, config.tile_size, &layer, &[]).unwrap_or(spawn);

        let mut world = Self {
            player: Player::new(spawn, config.tile_size),
            day_night: DayNightCycle::new(&config, now),
            giant_spawn_grid: layer.spawn_grid().clone(),
            config,
            registry,
            clock,
            rng,
            ids: ItemIdAllocator::new(),
            next_zombie_id: 1,
            ground: Vec::new(),
            zombies: Vec::new(),
            projectiles: Vec::new(),
            layer,
            maps,
            giant,
            snapshots: BTreeMap::new(),
            messages: MessageLog::default(),
            state: GameState::Playing,
            hover_tile: None,
            last_respawn_ms: now,
            last_decay_ms: now,
        };
        world.populate_containers();
        world.spawn_initial_entities();
        info!(
            start_chunk = world.config.start_chunk,
            width = world.layer.width(),
            height = world.layer.height(),
            zombies = world.zombies.len(),
            items = world.ground.len(),
            "world_loaded"
        );
        Ok(world)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// New item from the registry, drawing ids and randomness from the world.
    pub fn create_item(&mut self, name: &str, randomize: bool) -> Option<Item> {
        self.registry
            .create_from_name(name, randomize, &mut self.ids, &mut self.rng)
    }

    pub fn giant(&self) -> &GiantMap {
        &self.giant
    }

    pub fn tile_size(&self) -> f32 {
        self.config.tile_size
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn current_layer(&self) -> u8 {
        self.layer.layer()
    }

    pub fn has_snapshot(&self, layer: u8) -> bool {
        self.snapshots.keys().any(|(stored, _)| *stored == layer)
    }

    pub fn snapshot(&self, layer: u8, chunk_id: u32) -> Option<&LayerSnapshot> {
        self.snapshots.get(&(layer, chunk_id))
    }

    pub fn notify(&mut self, text: impl Into<String>) {
        let now = self.clock.now_ms();
        self.messages.push(text, now);
    }

    pub fn is_game_over(&self) -> bool {
        self.state == GameState::GameOver
    }

    pub fn toggle_pause(&mut self) {
        self.state = match self.state {
            GameState::Playing => GameState::Paused,
            GameState::Paused => GameState::Playing,
            GameState::GameOver => GameState::GameOver,
        };
    }

    /// Effective view radius: daylight or the brightest carried light.
    pub fn view_radius_px(&self) -> f32 {
        self.day_night
            .view_radius_px()
            .max(self.player.carried_light_radius(self.config.tile_size))
    }

    pub(crate) fn last_decay_ms(&self) -> u64 {
        self.last_decay_ms
    }

    pub(crate) fn set_last_decay_ms(&mut self, now_ms: u64) {
        self.last_decay_ms = now_ms;
    }

    /// Entity rectangles that block item placement.
    pub fn occupied_rects(&self) -> Vec<Rect> {
        let tile_size = self.config.tile_size;
        self.ground
            .iter()
            .map(|item| item.rect(tile_size))
            .chain(self.zombies.iter().map(Zombie::rect))
            .collect()
    }

    pub fn free_tile_near(&self, origin: Vec2, radius: i32) -> Option<Vec2> {
        find_free_tile(
            origin,
            radius,
            self.config.tile_size,
            &self.layer,
            &self.occupied_rects(),
        )
    }

    pub fn line_of_sight(&self, from: Vec2, to: Vec2) -> bool {
        !self.config.line_of_sight || line_of_sight(from, to, &self.layer)
    }

    /// Ids of every item currently placed anywhere in the active world.
    pub fn all_item_ids(&self) -> Vec<ItemId> {
        let mut ids = Vec::new();
        let mut visit = |item: &Item| ids.push(item.id);
        for root in self.ground.iter().chain(self.layer.containers()) {
            visit(root);
            root.for_each_nested(&mut visit);
        }
        self.player.for_each_item(&mut visit);
        ids
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use engine::{ChunkCatalog, ChunkKey, ChunkLayers, Grid};
    use rand::SeedableRng;

    use super::*;
    use crate::registry::test_registry;

    pub fn layers(base: &[&str], spawn: &[&str]) -> ChunkLayers {
        let base = grid_from_rows(base);
        let (w, h) = (base.width(), base.height());
        ChunkLayers {
            ground: Grid::new(w, h, "."),
            spawn: grid_from_rows(spawn).resized(w, h, ""),
            base,
        }
    }

    pub fn quiet_config() -> GameConfig {
        GameConfig {
            seed: Some(7),
            zombie_respawn_interval_ms: 0,
            ..GameConfig::default()
        }
    }

    pub fn world_with(config: GameConfig, base: &[&str], spawn: &[&str]) -> GameWorld {
        let mut catalog = ChunkCatalog::default();
        catalog.insert(chunk_descriptor(1, 1, [0, 0, 0, 0]));
        let maps = WorldMaps::new(catalog).with_preloaded(
            ChunkKey {
                layer: 1,
                chunk_id: 1,
            },
            layers(base, spawn),
        );
        GameWorld::new(
            GameConfig {
                start_chunk: 1,
                ..config
            },
            test_registry(),
            maps,
            Clock::manual(),
            StdRng::seed_from_u64(7),
        )
        .expect("world")
    }

    /// Open 9x7 room, player spawned in the middle.
    pub fn open_room() -> GameWorld {
        world_with(
            quiet_config(),
            &[
                "#########",
                "#       #",
                "#       #",
                "#       #",
                "#       #",
                "#       #",
                "#########",
            ],
            &["", "", "", "    P", "", "", ""],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn player_spawns_on_marker() {
        let world = open_room();
        assert_eq!(world.player.pos, tile_center(4, 3, 32.0));
        assert_eq!(world.current_layer(), 1);
        assert!(world.layer.is_giant());
    }

    #[test]
    fn pause_toggles_but_game_over_sticks() {
        let mut world = open_room();
        world.toggle_pause();
        assert_eq!(world.state, GameState::Paused);
        world.toggle_pause();
        assert_eq!(world.state, GameState::Playing);
        world.state = GameState::GameOver;
        world.toggle_pause();
        assert_eq!(world.state, GameState::GameOver);
    }
}
