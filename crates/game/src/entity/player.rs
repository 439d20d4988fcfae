use std::collections::BTreeMap;

use engine::Vec2;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::info;

use crate::geometry::Rect;
use crate::item::{insert_stacking, merge_stack, Item, ItemId, WornSlot};

use super::progression::PlayerProgression;
use super::stats::{StatKind, Stats};

pub const BELT_SLOTS: usize = 5;
pub const INVENTORY_SLOTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    pub fn grid_offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}

/// Where a matching ammo stack sits on the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmmoSource {
    Belt(usize),
    Inventory(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub damage: f32,
    pub infection: f32,
    pub broken_cloth: Option<WornSlot>,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub pos: Vec2,
    pub size: f32,
    pub velocity: Vec2,
    pub stats: Stats,
    pub progression: PlayerProgression,
    pub worn: BTreeMap<WornSlot, Item>,
    pub inventory: Vec<Item>,
    pub belt: [Option<Item>; BELT_SLOTS],
    pub backpack: Option<Item>,
    pub utility: Option<Item>,
    active_weapon: Option<ItemId>,
    pub reload_ticks_left: Option<u32>,
    pub drop_cooldown: u32,
    pub layer_switch_cooldown: u32,
    pub melee_swing_ticks: u32,
    pub gun_flash_ticks: u32,
    pub facing: Facing,
    pub aim_angle: f32,
    pub last_attack_ms: Option<u64>,
    pub last_auto_drink_ms: Option<u64>,
    pub walked_px: f32,
}

impl Player {
    pub fn new(pos: Vec2, tile_size: f32) -> Self {
        Self {
            pos,
            size: tile_size * 0.75,
            velocity: Vec2::ZERO,
            stats: Stats::default(),
            progression: PlayerProgression::default(),
            worn: BTreeMap::new(),
            inventory: Vec::new(),
            belt: Default::default(),
            backpack: None,
            utility: None,
            active_weapon: None,
            reload_ticks_left: None,
            drop_cooldown: 0,
            layer_switch_cooldown: 0,
            melee_swing_ticks: 0,
            gun_flash_ticks: 0,
            facing: Facing::default(),
            aim_angle: 0.0,
            last_attack_ms: None,
            last_auto_drink_ms: None,
            walked_px: 0.0,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_center(self.pos, self.size, self.size)
    }

    pub fn is_reloading(&self) -> bool {
        self.reload_ticks_left.is_some()
    }

    pub fn active_weapon_id(&self) -> Option<ItemId> {
        self.active_weapon
    }

    pub fn active_weapon_slot(&self) -> Option<usize> {
        let id = self.active_weapon?;
        self.belt
            .iter()
            .position(|cell| cell.as_ref().is_some_and(|item| item.id == id))
    }

    pub fn active_weapon(&self) -> Option<&Item> {
        let slot = self.active_weapon_slot()?;
        self.belt[slot].as_ref()
    }

    pub fn active_weapon_mut(&mut self) -> Option<&mut Item> {
        let slot = self.active_weapon_slot()?;
        self.belt[slot].as_mut()
    }

    /// Makes the item in `slot` the active weapon, or clears it for non-weapons.
    pub fn select_belt_slot(&mut self, slot: usize) -> bool {
        let id = self
            .belt
            .get(slot)
            .and_then(Option::as_ref)
            .filter(|item| item.is_weapon())
            .map(|item| item.id);
        if id.is_some() && id != self.active_weapon {
            self.reload_ticks_left = None;
        }
        self.active_weapon = id;
        id.is_some()
    }

    /// Drops the active-weapon reference when its belt cell no longer holds it.
    pub fn validate_active_weapon(&mut self) {
        if self.active_weapon.is_some() && self.active_weapon_slot().is_none() {
            self.active_weapon = None;
            self.reload_ticks_left = None;
        }
    }

    pub fn inventory_has_room(&self) -> bool {
        self.inventory.len() < INVENTORY_SLOTS
    }

    pub fn first_free_belt_slot(&self) -> Option<usize> {
        self.belt.iter().position(Option::is_none)
    }

    /// Merges into inventory stacks, then belt stacks, then takes a free
    /// inventory slot. The unplaced remainder comes back as `Err`.
    pub fn stack_item_in_inventory(&mut self, mut item: Item) -> Result<(), Item> {
        if item.is_stackable() {
            for existing in self.inventory.iter_mut() {
                merge_stack(existing, &mut item);
            }
            for existing in self.belt.iter_mut().flatten() {
                merge_stack(existing, &mut item);
            }
            if item.stack_load() == 0 {
                return Ok(());
            }
        }
        insert_stacking(&mut self.inventory, INVENTORY_SLOTS, item)
    }

    /// Best ammo stack for the active weapon: belt first, then inventory.
    pub fn find_ammo(&self, ammo_kind: &str) -> Option<AmmoSource> {
        let belt = self.belt.iter().enumerate().find_map(|(index, cell)| {
            cell.as_ref()
                .filter(|item| item.provides_ammo(ammo_kind) && item.stack_load() > 0)
                .map(|_| AmmoSource::Belt(index))
        });
        belt.or_else(|| {
            self.inventory
                .iter()
                .position(|item| item.provides_ammo(ammo_kind) && item.stack_load() > 0)
                .map(AmmoSource::Inventory)
        })
    }

    pub fn ammo_item_mut(&mut self, source: AmmoSource) -> Option<&mut Item> {
        match source {
            AmmoSource::Belt(index) => self.belt.get_mut(index).and_then(Option::as_mut),
            AmmoSource::Inventory(index) => self.inventory.get_mut(index),
        }
    }

    pub fn remove_ammo_if_empty(&mut self, source: AmmoSource) {
        match source {
            AmmoSource::Belt(index) => {
                if self.belt[index]
                    .as_ref()
                    .is_some_and(|item| item.stack_load() == 0)
                {
                    self.belt[index] = None;
                }
            }
            AmmoSource::Inventory(index) => {
                if self
                    .inventory
                    .get(index)
                    .is_some_and(|item| item.stack_load() == 0)
                {
                    self.inventory.remove(index);
                }
            }
        }
    }

    /// Sum of defence over worn items that still hold together.
    pub fn total_defence(&self) -> f32 {
        self.worn
            .values()
            .filter(|item| item.durability.map_or(true, |durability| durability > 0.0))
            .filter_map(|item| item.cloth().map(|cloth| cloth.defence))
            .sum()
    }

    pub fn clothing_speed_bonus(&self) -> f32 {
        self.worn
            .values()
            .filter_map(|item| item.cloth().map(|cloth| cloth.speed))
            .sum()
    }

    pub fn move_speed(&self, base_speed: f32) -> f32 {
        (base_speed * self.progression.speed * (1.0 + self.clothing_speed_bonus())).max(0.1)
    }

    /// Applies a zombie hit through worn clothing.
    pub fn apply_hit(&mut self, raw_damage: f32, raw_infection: f32, rng: &mut StdRng) -> HitResult {
        let durable = self
            .worn
            .iter()
            .filter(|(_, item)| item.durability.is_some_and(|durability| durability > 0.0))
            .map(|(slot, _)| *slot)
            .collect::<Vec<_>>();
        let mut broken_cloth = None;
        if !durable.is_empty() {
            let slot = durable[rng.random_range(0..durable.len())];
            let broke = self
                .worn
                .get_mut(&slot)
                .is_some_and(|item| item.wear(0.25 * raw_damage));
            if broke {
                if let Some(item) = self.worn.remove(&slot) {
                    info!(item = %item.name, slot = slot.as_str(), "cloth_destroyed");
                }
                broken_cloth = Some(slot);
            }
        }

        let defence = self.total_defence();
        let damage = (raw_damage * (1.0 - defence / 100.0)).max(0.0);
        let infection = (raw_infection * (1.0 - defence / 200.0)).max(0.0);
        self.stats.add(StatKind::Health, -damage);
        self.stats.add(StatKind::Infection, infection);
        HitResult {
            damage,
            infection,
            broken_cloth,
        }
    }

    /// Every item the player holds, nested contents included.
    pub fn for_each_item<'a>(&'a self, visit: &mut impl FnMut(&'a Item)) {
        let roots = self
            .inventory
            .iter()
            .chain(self.belt.iter().flatten())
            .chain(self.backpack.iter())
            .chain(self.utility.iter())
            .chain(self.worn.values());
        for item in roots {
            visit(item);
            item.for_each_nested(visit);
        }
    }

    /// Light radius of any switched-on utility in the utility slot or belt.
    pub fn carried_light_radius(&self, tile_size: f32) -> f32 {
        self.utility
            .iter()
            .chain(self.belt.iter().flatten())
            .map(|item| item.current_light_radius(tile_size))
            .fold(0.0, f32::max)
    }
}
