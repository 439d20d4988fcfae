use std::collections::BTreeMap;

use engine::{Vec2, ZombieTemplate};
use rand::Rng;
use tracing::{debug, info};

use crate::entity::{Zombie, ZombieId, ZombieProfile, ZombieState};
use crate::geometry::Rect;
use crate::item::{sample_range, Item, ItemAttrs, WornSlot};

use super::spatial::{find_free_tile, snap_to_tile};
use super::GameWorld;

const RANDOM: &str = "RANDOM";
const DEFAULT_CONTAINER_SLOTS: u32 = 6;
const EXTRA_LOOT_CHANCE: f32 = 0.3;

const MALE_NAMES: [&str; 8] = ["Walt", "Hank", "Rick", "Dale", "Glenn", "Eugene", "Abe", "Tyreese"];
const FEMALE_NAMES: [&str; 8] = ["Carol", "Maggie", "Rosita", "Sasha", "Lori", "Andrea", "Beth", "Jessie"];
const PROFESSIONS: [&str; 6] = ["clerk", "farmer", "nurse", "mechanic", "teacher", "officer"];

impl GameWorld {
    /// Fills every container tile of the active layer with a fresh container.
    pub(super) fn populate_containers(&mut self) {
        let tile_size = self.config.tile_size;
        let mut containers = Vec::new();
        for &(x, y) in self.layer.container_tiles() {
            let Some(def) = self.layer.get_tile_at(x, y) else {
                continue;
            };
            let capacity = def.capacity.unwrap_or(DEFAULT_CONTAINER_SLOTS);
            let mut container = Item::new(self.ids.allocate(), "Container", ItemAttrs::Container)
                .with_capacity(capacity)
                .with_pos(Rect::tile(x, y, tile_size).center());
            container.sprite = def.sprite.clone();
            let loot = self.registry.roll_loot(
                &def.loot,
                self.player.progression.lucky,
                capacity as usize,
                &mut self.ids,
                &mut self.rng,
            );
            container.inventory = Some(loot);
            containers.push(container);
        }
        self.layer.set_containers(containers);
    }

    /// One zombie per `Z` marker and one random item per `I` marker.
    pub(super) fn spawn_initial_entities(&mut self) {
        let markers = self.layer.zombie_markers().to_vec();
        let spawned = self.spawn_zombies_at(&markers);
        let mut items = 0;
        for marker in self.layer.item_markers().to_vec() {
            if let Some(item) = self.registry.generate_random(&mut self.ids, &mut self.rng) {
                self.ground.push(item.with_pos(marker));
                items += 1;
            }
        }
        debug!(layer = self.layer.layer(), zombies = spawned, items, "layer_populated");
    }

    /// Spawns at each marker with a free tile, up to the zombie cap.
    pub fn spawn_zombies_at(&mut self, markers: &[Vec2]) -> usize {
        let tile_size = self.config.tile_size;
        let mut spawned = 0;
        for &marker in markers {
            if self.zombies.len() >= self.config.max_zombies {
                break;
            }
            let mut occupied = self
                .zombies
                .iter()
                .map(Zombie::rect)
                .collect::<Vec<_>>();
            occupied.push(self.player.rect());
            let Some(pos) = find_free_tile(marker, 1, tile_size, &self.layer, &occupied) else {
                continue;
            };
            let template = self.registry.random_zombie_template(&mut self.rng);
            let zombie = self.create_zombie(&template, pos);
            self.zombies.push(zombie);
            spawned += 1;
        }
        spawned
    }

    pub fn create_zombie(&mut self, template: &ZombieTemplate, pos: Vec2) -> Zombie {
        let rng = &mut self.rng;
        let sex = if template.sex == RANDOM {
            let sex = if rng.random_bool(0.5) { "male" } else { "female" };
            sex.to_string()
        } else {
            template.sex.clone()
        };
        let name = if template.name == RANDOM {
            let pool = if sex == "female" { FEMALE_NAMES } else { MALE_NAMES };
            pool[rng.random_range(0..pool.len())].to_string()
        } else {
            template.name.clone()
        };
        let profession = if template.profession == RANDOM {
            PROFESSIONS[rng.random_range(0..PROFESSIONS.len())].to_string()
        } else {
            template.profession.clone()
        };
        let vaccine = match template.vaccine.as_str() {
            RANDOM => rng.random_bool(0.5),
            raw => raw.eq_ignore_ascii_case("true"),
        };
        let health = sample_range(rng, template.health).max(1.0);
        let speed = sample_range(rng, template.speed);
        let xp_value = sample_range(rng, template.xp);

        let mut loot = self.registry.roll_loot(
            &template.loot,
            1.0,
            usize::MAX,
            &mut self.ids,
            &mut self.rng,
        );
        if self.rng.random::<f32>() < EXTRA_LOOT_CHANCE {
            loot.extend(self.registry.generate_random(&mut self.ids, &mut self.rng));
        }
        let mut worn = BTreeMap::new();
        for slot in template.clothes.iter().filter_map(|raw| WornSlot::parse(raw)) {
            if let Some(cloth) = self.registry.random_cloth(slot, &mut self.ids, &mut self.rng) {
                worn.insert(slot, cloth);
            }
        }

        let id = ZombieId(self.next_zombie_id);
        self.next_zombie_id += 1;
        Zombie {
            id,
            pos,
            size: self.config.tile_size * 0.75,
            health,
            max_health: health,
            speed,
            attack_range: template.attack_range,
            damage: template.damage,
            infection: template.infection,
            xp_value,
            loot,
            worn,
            state: ZombieState::Wandering,
            wander_target: None,
            last_wander_change_ms: self.clock.now_ms(),
            last_attack_ms: None,
            swing_ticks: 0,
            swing_angle: 0.0,
            profile: ZombieProfile {
                template_id: template.id.clone(),
                name,
                sex,
                profession,
                vaccine,
            },
        }
    }

    /// Periodic respawn around the player, gated by the configured interval.
    pub fn respawn_check(&mut self) -> usize {
        let interval = self.config.zombie_respawn_interval_ms;
        if interval <= 0 {
            return 0;
        }
        let now = self.clock.now_ms();
        if now.saturating_sub(self.last_respawn_ms) <= interval as u64 {
            return 0;
        }
        self.last_respawn_ms = now;
        let view = self.view_radius_px();
        let markers = self
            .layer
            .spawn_grid()
            .near(self.player.pos)
            .into_iter()
            .filter(|marker| marker.distance(self.player.pos) > view)
            .collect::<Vec<_>>();
        let spawned = self.spawn_zombies_at(&markers);
        if spawned > 0 {
            let layer = self.layer.layer();
            let key = (layer, self.layer.chunk_id());
            if let Some(snapshot) = self.snapshots.get_mut(&key) {
                snapshot.zombies = self.zombies.clone();
            }
            info!(layer, spawned, total = self.zombies.len(), "zombies_respawned");
        }
        spawned
    }

    /// Moves a corpse's contents onto free tiles around it.
    pub fn spill_contents(&mut self, ground_index: usize) -> usize {
        let Some(corpse) = self.ground.get_mut(ground_index) else {
            return 0;
        };
        let origin = corpse.pos;
        let contents = corpse.take_inventory();
        let mut spilled = 0;
        for mut item in contents {
            item.pos = self
                .free_tile_near(origin, super::DROP_SEARCH_RADIUS)
                .unwrap_or(origin);
            self.ground.push(item);
            spilled += 1;
        }
        spilled
    }

    pub(super) fn tile_of(&self, pos: Vec2) -> (i32, i32) {
        snap_to_tile(pos, self.config.tile_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::world::test_support::{quiet_config, world_with};

    fn room_with_markers() -> GameWorld {
        world_with(
            quiet_config(),
            &["#######", "#     #", "#  C  #", "#     #", "#######"],
            &["", " P  Z", "     ", " I   ", ""],
        )
    }

    #[test]
    fn markers_spawn_zombies_items_and_containers() {
        let world = room_with_markers();
        assert_eq!(world.zombies.len(), 1);
        assert_eq!(world.ground.len(), 1);
        assert_eq!(world.layer.containers().len(), 1);
        let chest = &world.layer.containers()[0];
        assert_eq!(chest.slot_capacity(), 4);
        assert_eq!(chest.inventory.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn zombie_cap_limits_spawning() {
        let mut world = room_with_markers();
        world.config.max_zombies = 1;
        let extra = world.spawn_zombies_at(&[Vec2::new(80.0, 80.0)]);
        assert_eq!(extra, 0);
        assert_eq!(world.zombies.len(), 1);
    }

    #[test]
    fn generic_zombie_stats_fall_in_ranges() {
        let mut world = room_with_markers();
        let template = ZombieTemplate::generic();
        for _ in 0..10 {
            let zombie = world.create_zombie(&template, Vec2::new(50.0, 50.0));
            assert!((40.0..=60.0).contains(&zombie.health));
            assert!((0.8..=1.4).contains(&zombie.speed));
            assert!(["male", "female"].contains(&zombie.profile.sex.as_str()));
            assert_eq!(zombie.health, zombie.max_health);
        }
    }

    #[test]
    fn respawn_disabled_when_interval_not_positive() {
        let mut world = room_with_markers();
        world.clock.advance_ms(10_000_000);
        assert_eq!(world.respawn_check(), 0);
    }

    /// Long hall: one marker inside the daylight view, two beyond it.
    fn long_hall() -> GameWorld {
        world_with(
            GameConfig {
                zombie_respawn_interval_ms: 1_000,
                ..quiet_config()
            },
            &["##############################", "#                            #", "#                            #", "##############################"],
            &["", " P  Z               Z    Z", "", ""],
        )
    }

    #[test]
    fn respawn_fills_markers_out_of_sight_after_the_interval() {
        let mut world = long_hall();
        assert_eq!(world.zombies.len(), 3);
        world.zombies.clear();

        world.clock.advance_ms(1_000);
        assert_eq!(world.respawn_check(), 0);

        world.clock.advance_ms(1);
        assert_eq!(world.respawn_check(), 2);
        let view = world.view_radius_px();
        assert!(world
            .zombies
            .iter()
            .all(|zombie| zombie.pos.distance(world.player.pos) > view));
        assert_eq!(world.respawn_check(), 0);
    }

    #[test]
    fn respawn_respects_the_zombie_cap() {
        let mut world = long_hall();
        world.zombies.clear();
        world.config.max_zombies = 1;
        world.clock.advance_ms(5_000);
        assert_eq!(world.respawn_check(), 1);
        assert_eq!(world.zombies.len(), 1);
    }

    #[test]
    fn spill_moves_contents_to_ground() {
        let mut world = room_with_markers();
        let mut corpse = world.layer.containers()[0].clone();
        corpse.pos = world.player.pos;
        world.ground.push(corpse);
        let index = world.ground.len() - 1;
        let before = world.ground.len();
        assert_eq!(world.spill_contents(index), 1);
        assert_eq!(world.ground.len(), before + 1);
        assert_eq!(world.ground[index].slots_used(), 0);
    }
}
