use engine::{EdgeDirection, Vec2};
use tracing::{info, warn};

use super::layer::LayerRuntime;
use super::spatial::Obstacles;
use super::{GameWorld, LayerSnapshot, DROP_SEARCH_RADIUS};

impl GameWorld {
    fn take_snapshot(&mut self) -> LayerSnapshot {
        LayerSnapshot {
            ground: std::mem::take(&mut self.ground),
            zombies: std::mem::take(&mut self.zombies),
            containers: std::mem::take(self.layer.containers_mut()),
            door_states: self.layer.door_states().clone(),
        }
    }

    fn build_runtime(&self, layer: u8, chunk_id: u32) -> Option<LayerRuntime> {
        let (tiles, is_giant) = if layer == 1 && self.giant.offset_of(chunk_id).is_some() {
            (self.giant.layers.clone(), true)
        } else {
            let reference = self
                .giant
                .offset_of(chunk_id)
                .map(|_| self.giant.chunk_size());
            match self.maps.load(layer, chunk_id, reference) {
                Ok(Some(tiles)) => (tiles, false),
                Ok(None) => return None,
                Err(error) => {
                    warn!(layer, chunk_id, error = %error, "layer_load_failed");
                    return None;
                }
            }
        };
        let runtime_chunk = if is_giant {
            self.config.start_chunk
        } else {
            chunk_id
        };
        Some(LayerRuntime::build(
            layer,
            runtime_chunk,
            is_giant,
            tiles,
            &self.registry,
            self.config.tile_size,
            self.config.spawn_cell_size,
        ))
    }

    /// Chunk the player stands in and their position relative to it.
    fn player_chunk_local(&self) -> Option<(u32, Vec2)> {
        let tile_size = self.config.tile_size;
        if !self.layer.is_giant() {
            return Some((self.layer.chunk_id(), self.player.pos));
        }
        let chunk = self.giant.chunk_at(self.player.pos, tile_size)?;
        let origin = self.giant.chunk_origin_px(chunk, tile_size)?;
        Some((chunk, self.player.pos - origin))
    }

    /// Moves the player to layer `target` of the chunk they stand in,
    /// parking the current layer's entities and restoring the target's.
    pub fn switch_layer(&mut self, target: u8) -> bool {
        let from = self.layer.layer();
        if target == from {
            return false;
        }
        let Some((chunk_id, local)) = self.player_chunk_local() else {
            return false;
        };
        let Some(runtime) = self.build_runtime(target, chunk_id) else {
            self.player.layer_switch_cooldown = self.config.layer_switch_cooldown_ticks;
            self.notify("The way is blocked.");
            return false;
        };
        let tile_size = self.config.tile_size;
        let destination = if runtime.is_giant() {
            self.giant
                .chunk_origin_px(chunk_id, tile_size)
                .map(|origin| origin + local)
                .or_else(|| runtime.player_spawn())
                .unwrap_or_else(|| runtime.bounds().center())
        } else {
            local
        };

        let parked_key = (from, self.layer.chunk_id());
        let snapshot = self.take_snapshot();
        if self.layer.is_giant() {
            self.giant_spawn_grid = self.layer.spawn_grid().clone();
        }
        self.snapshots.insert(parked_key, snapshot);
        self.projectiles.clear();
        self.layer = runtime;
        if self.layer.is_giant() {
            self.layer.set_spawn_grid(self.giant_spawn_grid.clone());
        }

        match self.snapshots.get(&(target, self.layer.chunk_id())).cloned() {
            Some(snapshot) => {
                self.ground = snapshot.ground;
                self.zombies = snapshot.zombies;
                self.layer.set_containers(snapshot.containers);
                self.layer.restore_door_states(snapshot.door_states);
            }
            None => {
                self.populate_containers();
                self.spawn_initial_entities();
            }
        }
        self.place_player(destination);
        self.player.layer_switch_cooldown = self.config.layer_switch_cooldown_ticks;
        info!(from, to = target, chunk_id, "layer_switched");
        true
    }

    fn place_player(&mut self, pos: Vec2) {
        let rect = self.player.rect().with_center(pos);
        self.player.pos = if self.layer.blocks(&rect) {
            self.free_tile_near(pos, DROP_SEARCH_RADIUS).unwrap_or(pos)
        } else {
            pos
        };
    }

    /// Teleports when the player stands on a `[n]` tile and the switch
    /// cooldown has run out.
    pub fn check_teleport(&mut self) -> bool {
        if self.player.layer_switch_cooldown > 0 {
            return false;
        }
        let (x, y) = self.tile_of(self.player.pos);
        match self.layer.teleport_target_at(x, y) {
            Some(target) if target != self.layer.layer() => self.switch_layer(target),
            _ => false,
        }
    }

    /// Loads the neighbouring chunk when the player walks off a per-chunk
    /// layer. Layer 1 is stitched and never transitions.
    pub fn try_edge_transition(&mut self, direction: EdgeDirection) -> bool {
        if self.layer.is_giant() {
            return false;
        }
        let layer = self.layer.layer();
        let Some(next) = self.maps.neighbor(layer, self.layer.chunk_id(), direction) else {
            return false;
        };
        let Some(runtime) = self.build_runtime(layer, next) else {
            return false;
        };
        let from_chunk = self.layer.chunk_id();
        self.snapshots.retain(|(stored, _), _| *stored == 1);
        self.ground.clear();
        self.zombies.clear();
        self.projectiles.clear();
        self.layer = runtime;
        self.populate_containers();
        self.spawn_initial_entities();

        let bounds = self.layer.bounds();
        let half = self.config.tile_size * 0.5;
        let mut pos = self.player.pos;
        pos.x = pos.x.clamp(half, (bounds.w - half).max(half));
        pos.y = pos.y.clamp(half, (bounds.h - half).max(half));
        match direction {
            EdgeDirection::Right => pos.x = half,
            EdgeDirection::Left => pos.x = bounds.w - half,
            EdgeDirection::Top => pos.y = bounds.h - half,
            EdgeDirection::Bottom => pos.y = half,
        }
        self.place_player(pos);
        info!(layer, from_chunk, to_chunk = next, "chunk_transition");
        true
    }
}

#[cfg(test)]
mod tests {
    use engine::{ChunkCatalog, ChunkKey, ChunkLayers};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::clock::Clock;
    use crate::config::GameConfig;
    use crate::registry::test_registry;
    use crate::world::test_support::{layers, quiet_config};
    use crate::world::{chunk_descriptor, tile_center, WorldMaps};

    fn key(layer: u8, chunk_id: u32) -> ChunkKey {
        ChunkKey { layer, chunk_id }
    }

    fn stacked_world() -> GameWorld {
        let mut catalog = ChunkCatalog::default();
        catalog.insert(chunk_descriptor(1, 1, [0, 0, 0, 0]));
        catalog.insert(chunk_descriptor(2, 1, [0, 5, 0, 0]));
        catalog.insert(chunk_descriptor(2, 2, [0, 0, 0, 5]));
        let ground_floor: ChunkLayers = layers(
            &["######", "#    #", "# 2  #", "#    #", "######"],
            &["", " P", "", "", ""],
        );
        let upstairs = layers(
            &["######", "#     ", "# 1   ", "#     ", "######"],
            &["", "", "", "    Z", ""],
        );
        let next_door = layers(
            &["######", "     #", "     #", "     #", "######"],
            &["", "", "", "", ""],
        );
        let maps = WorldMaps::new(catalog)
            .with_preloaded(key(1, 1), ground_floor)
            .with_preloaded(key(2, 1), upstairs)
            .with_preloaded(key(2, 2), next_door);
        GameWorld::new(
            GameConfig {
                start_chunk: 1,
                ..quiet_config()
            },
            test_registry(),
            maps,
            Clock::manual(),
            StdRng::seed_from_u64(3),
        )
        .expect("world")
    }

    /// Two stitched ground-floor chunks, each with its own upper floor.
    fn two_house_world() -> GameWorld {
        let mut catalog = ChunkCatalog::default();
        catalog.insert(chunk_descriptor(1, 1, [0, 2, 0, 0]));
        catalog.insert(chunk_descriptor(1, 2, [0, 0, 0, 1]));
        catalog.insert(chunk_descriptor(2, 1, [0, 0, 0, 0]));
        catalog.insert(chunk_descriptor(2, 2, [0, 0, 0, 0]));
        let upstairs = |spawn: &[&str]| {
            layers(&["######", "#    #", "# 1  #", "#    #", "######"], spawn)
        };
        let maps = WorldMaps::new(catalog)
            .with_preloaded(
                key(1, 1),
                layers(
                    &["######", "#     ", "# 2   ", "#     ", "######"],
                    &["", " P", "", "", ""],
                ),
            )
            .with_preloaded(
                key(1, 2),
                layers(
                    &["######", "     #", "  2  #", "     #", "######"],
                    &["", "", "", "", ""],
                ),
            )
            .with_preloaded(key(2, 1), upstairs(&["", "", "", "    Z", ""]))
            .with_preloaded(key(2, 2), upstairs(&["", "   I", "", "", ""]));
        GameWorld::new(
            GameConfig {
                start_chunk: 1,
                ..quiet_config()
            },
            test_registry(),
            maps,
            Clock::manual(),
            StdRng::seed_from_u64(9),
        )
        .expect("world")
    }

    #[test]
    fn upper_floors_of_different_chunks_keep_their_own_entities() {
        let mut world = two_house_world();
        world.player.pos = tile_center(2, 2, 32.0);
        assert!(world.switch_layer(2));
        assert_eq!(world.layer.chunk_id(), 1);
        let first_floor_zombie = world.zombies[0].id;
        assert!(world.ground.is_empty());

        assert!(world.switch_layer(1));
        world.player.pos = tile_center(6 + 2, 2, 32.0);
        assert!(world.switch_layer(2));
        assert_eq!(world.layer.chunk_id(), 2);
        assert!(world.zombies.is_empty());
        assert_eq!(world.ground.len(), 1);
        assert_eq!(world.player.pos, tile_center(2, 2, 32.0));

        assert!(world.switch_layer(1));
        world.player.pos = tile_center(2, 2, 32.0);
        assert!(world.switch_layer(2));
        assert_eq!(world.layer.chunk_id(), 1);
        assert_eq!(world.zombies.len(), 1);
        assert_eq!(world.zombies[0].id, first_floor_zombie);
        assert!(world.ground.is_empty());
        assert!(world.snapshot(2, 2).is_some_and(|parked| parked.ground.len() == 1));
    }

    #[test]
    fn teleport_switches_layer_and_keeps_tile_position() {
        let mut world = stacked_world();
        world.player.pos = tile_center(2, 2, 32.0);
        assert!(world.check_teleport());
        assert_eq!(world.current_layer(), 2);
        assert!(!world.layer.is_giant());
        assert_eq!(world.player.pos, tile_center(2, 2, 32.0));
        assert_eq!(world.zombies.len(), 1);
        assert!(world.has_snapshot(1));
        assert_eq!(
            world.player.layer_switch_cooldown,
            world.config.layer_switch_cooldown_ticks
        );
    }

    #[test]
    fn teleport_is_ignored_during_cooldown() {
        let mut world = stacked_world();
        world.player.pos = tile_center(2, 2, 32.0);
        world.player.layer_switch_cooldown = 3;
        assert!(!world.check_teleport());
        assert_eq!(world.current_layer(), 1);
    }

    #[test]
    fn returning_restores_parked_entities() {
        let mut world = stacked_world();
        world.player.pos = tile_center(2, 2, 32.0);
        let water = world
            .registry
            .create_from_name("Water Bottle", false, &mut world.ids, &mut world.rng);
        world.ground.extend(water);
        let ground_ids = world.ground.iter().map(|i| i.id).collect::<Vec<_>>();

        assert!(world.switch_layer(2));
        let upstairs_zombie = world.zombies[0].id;
        assert!(world.ground.iter().all(|item| !ground_ids.contains(&item.id)));

        world.player.layer_switch_cooldown = 0;
        assert!(world.switch_layer(1));
        assert_eq!(world.ground.iter().map(|i| i.id).collect::<Vec<_>>(), ground_ids);

        assert!(world.switch_layer(2));
        assert_eq!(world.zombies[0].id, upstairs_zombie);
    }

    #[test]
    fn missing_layer_keeps_player_in_place() {
        let mut world = stacked_world();
        let before = world.player.pos;
        assert!(!world.switch_layer(4));
        assert_eq!(world.current_layer(), 1);
        assert_eq!(world.player.pos, before);
        assert_eq!(
            world.messages.latest().map(|m| m.text.as_str()),
            Some("The way is blocked.")
        );
    }

    #[test]
    fn walking_off_an_upper_layer_loads_the_neighbour() {
        let mut world = stacked_world();
        world.player.pos = tile_center(2, 2, 32.0);
        assert!(world.switch_layer(2));
        world.player.pos = Vec2::new(6.0 * 32.0 + 4.0, tile_center(0, 2, 32.0).y);

        assert!(world.try_edge_transition(EdgeDirection::Right));
        assert_eq!(world.layer.chunk_id(), 2);
        assert_eq!(world.current_layer(), 2);
        assert_eq!(world.player.pos, tile_center(0, 2, 32.0));
        assert!(world.has_snapshot(1));
        assert!(!world.has_snapshot(2));
        assert!(world.zombies.is_empty());
        assert!(!world.try_edge_transition(EdgeDirection::Top));
    }
}
