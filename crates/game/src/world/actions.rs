use engine::{ValueRange, Vec2};
use rand::Rng;
use tracing::{debug, info};

use crate::entity::{StatKind, INVENTORY_SLOTS};
use crate::error::{DoorError, InventoryError};
use crate::item::{
    insert_stacking, merge_stack, sample_range, split_stack, transfer_all, Item, ItemId,
    StackQuantity, StatusEffect,
};

use super::layer::DoorState;
use super::location::SourceLocation;
use super::spatial::Obstacles;
use super::{GameWorld, DROP_SEARCH_RADIUS};

/// Destination of a "send all" transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferTarget {
    Backpack,
    Utility,
    Inventory,
    Container(ItemId),
}

impl GameWorld {
    fn target_container_id(&self, target: TransferTarget) -> Option<ItemId> {
        match target {
            TransferTarget::Backpack => self.player.backpack.as_ref().map(|item| item.id),
            TransferTarget::Utility => self
                .player
                .utility
                .as_ref()
                .filter(|item| item.is_container())
                .map(|item| item.id),
            TransferTarget::Inventory => None,
            TransferTarget::Container(id) => Some(id),
        }
    }

    /// Items and slot count of a transfer target.
    fn target_items_mut(&mut self, target: TransferTarget) -> Option<(&mut Vec<Item>, usize, String)> {
        if target == TransferTarget::Inventory {
            return Some((&mut self.player.inventory, INVENTORY_SLOTS, "Inventory".to_string()));
        }
        let id = self.target_container_id(target)?;
        let container = self.container_mut(id)?;
        let capacity = container.slot_capacity();
        let name = container.name.clone();
        let items = container.inventory.as_mut()?;
        Some((items, capacity, name))
    }

    pub fn nearest_ground_item(&self, radius: f32) -> Option<usize> {
        self.ground
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_corpse())
            .map(|(index, item)| (index, item.pos.distance(self.player.pos)))
            .filter(|(_, distance)| *distance <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Picks up the closest ground item within reach.
    pub fn grab_nearest(&mut self, into_backpack: bool) -> Result<(), InventoryError> {
        let radius = self.config.interaction_radius_px();
        let index = self
            .nearest_ground_item(radius)
            .ok_or(InventoryError::NothingToGrab)?;
        self.grab(&SourceLocation::Ground(index), into_backpack)
    }

    /// Moves an item from the world into the player's carried slots:
    /// backpack first when asked, then inventory stacks, belt stacks, a free
    /// inventory slot and finally a free belt cell.
    pub fn grab(&mut self, source: &SourceLocation, into_backpack: bool) -> Result<(), InventoryError> {
        let item = self.item_at(source).ok_or(InventoryError::NoItem)?;
        if item.is_corpse() {
            return Err(InventoryError::NotUsable(item.name.clone()));
        }
        if let SourceLocation::Ground(_) = source.base() {
            if item.pos.distance(self.player.pos) > self.config.interaction_radius_px() {
                return Err(InventoryError::TooFar);
            }
        }
        let original_load = item.stack_load();
        let mut item = self.take_from(source)?;

        if into_backpack {
            if let Some(pack) = self.player.backpack.as_mut() {
                let capacity = pack.slot_capacity();
                if let Some(items) = pack.inventory.as_mut() {
                    match insert_stacking(items, capacity, item) {
                        Ok(()) => return Ok(()),
                        Err(rest) => item = rest,
                    }
                }
            }
        }
        let rest = match self.player.stack_item_in_inventory(item) {
            Ok(()) => return Ok(()),
            Err(rest) => rest,
        };
        match self.player.first_free_belt_slot() {
            Some(slot) if !rest.is_backpack() => {
                self.player.belt[slot] = Some(rest);
                Ok(())
            }
            _ => {
                let untouched = rest.stack_load() == original_load;
                self.put_back(source, rest);
                if untouched {
                    Err(InventoryError::InventoryFull)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Backpacks go to the backpack slot, clothes to their worn slot and
    /// everything else to the belt.
    pub fn equip(&mut self, source: &SourceLocation) -> Result<(), InventoryError> {
        let item = self.item_at(source).ok_or(InventoryError::NoItem)?;
        if item.is_backpack() {
            if matches!(source.base(), SourceLocation::Backpack) {
                return Ok(());
            }
            if self.player.backpack.is_some() {
                return Err(InventoryError::SlotOccupied);
            }
            let pack = self.take_from(source)?;
            self.player.backpack = Some(pack);
            return Ok(());
        }
        if let Some(cloth) = item.cloth() {
            let slot = cloth.slot;
            if matches!(source.base(), SourceLocation::Worn(_)) {
                return Ok(());
            }
            let mut piece = self.take_from(source)?;
            piece.pos = Vec2::ZERO;
            if let Some(mut previous) = self.player.worn.insert(slot, piece) {
                previous.pos = self.player.pos;
                self.put_back(source, previous);
            }
            return Ok(());
        }
        if let SourceLocation::Belt(slot) = source.base() {
            self.player.select_belt_slot(*slot);
            return Ok(());
        }
        let slot = self
            .player
            .first_free_belt_slot()
            .ok_or(InventoryError::BeltFull)?;
        let item = self.take_from(source)?;
        let is_weapon = item.is_weapon();
        self.player.belt[slot] = Some(item);
        if is_weapon {
            self.player.select_belt_slot(slot);
        }
        Ok(())
    }

    pub fn unequip(&mut self, source: &SourceLocation) -> Result<(), InventoryError> {
        if !source.is_equipped_slot() {
            let name = self.item_at(source).map(|item| item.name.clone()).unwrap_or_default();
            return Err(InventoryError::NotUsable(name));
        }
        let item = self.take_from(source)?;
        let original_load = item.stack_load();
        match self.player.stack_item_in_inventory(item) {
            Ok(()) => Ok(()),
            Err(rest) => {
                let untouched = rest.stack_load() == original_load;
                self.put_back(source, rest);
                if untouched {
                    Err(InventoryError::InventoryFull)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Number keys: weapons become active, consumables are used and lights
    /// switch on or off.
    pub fn use_belt_slot(&mut self, slot: usize) -> Result<(), InventoryError> {
        let source = SourceLocation::Belt(slot);
        let item = self.item_at(&source).ok_or(InventoryError::NoItem)?;
        if item.is_weapon() {
            self.player.select_belt_slot(slot);
            return Ok(());
        }
        self.use_item(&source)
    }

    pub fn use_item(&mut self, source: &SourceLocation) -> Result<(), InventoryError> {
        let item = self.item_at(source).ok_or(InventoryError::NoItem)?;
        if item.consumable().is_some() {
            return self.consume_item(source);
        }
        if item.utility().is_some() {
            let on = !item.is_on();
            return self.set_utility_power(source, on);
        }
        if item.is_weapon() {
            return self.equip(source);
        }
        Err(InventoryError::NotUsable(item.name.clone()))
    }

    /// Applies a consumable and uses up one unit of it.
    pub fn consume_item(&mut self, source: &SourceLocation) -> Result<(), InventoryError> {
        let item = self.item_at(source).ok_or(InventoryError::NoItem)?;
        let name = item.name.clone();
        let Some(attrs) = item.consumable().cloned() else {
            return Err(InventoryError::NotUsable(name));
        };
        if item.is_ammo() {
            return self.request_reload();
        }

        let mut applied = false;
        match attrs.effect {
            Some(StatusEffect::Cure) => {
                let range = attrs.cure.unwrap_or(ValueRange::fixed(100.0));
                let chance = sample_range(&mut self.rng, range) * self.player.progression.lucky;
                if self.rng.random::<f32>() < chance / 100.0 {
                    self.player.stats.set(StatKind::Infection, 0.0);
                    self.notify(format!("The {name} worked. The infection is gone."));
                } else {
                    self.notify(format!("The {name} did nothing."));
                }
                applied = true;
            }
            Some(StatusEffect::Stat(kind)) => {
                if let Some(restore) = attrs.restore {
                    let amount = sample_range(&mut self.rng, restore);
                    self.player.stats.add(kind, amount);
                    applied = true;
                }
                if let Some(reduce) = attrs.reduce {
                    let amount = sample_range(&mut self.rng, reduce);
                    self.player.stats.add(kind, -amount);
                    applied = true;
                }
            }
            Some(StatusEffect::Ammo) | None => {}
        }
        if let Some(hp) = attrs.hp {
            let amount = sample_range(&mut self.rng, hp);
            self.player.stats.add(StatKind::Health, amount);
            applied = true;
        }
        if !applied {
            return Err(InventoryError::NotUsable(name));
        }
        debug!(item = %name, "item_consumed");
        self.use_up_one(source);
        Ok(())
    }

    /// Decrements a stack, removing it once empty. Items without a load are
    /// single use.
    fn use_up_one(&mut self, source: &SourceLocation) {
        let emptied = match self.item_at_mut(source) {
            Some(item) => match item.load {
                Some(load) => {
                    let left = load.saturating_sub(1);
                    item.load = Some(left);
                    left == 0
                }
                None => true,
            },
            None => false,
        };
        if emptied {
            let _ = self.take_from(source);
        }
    }

    pub fn request_reload(&mut self) -> Result<(), InventoryError> {
        if self.player.is_reloading() {
            return Err(InventoryError::AlreadyReloading);
        }
        let weapon = self
            .player
            .active_weapon()
            .ok_or(InventoryError::NoAmmoWeapon)?;
        let ammo_kind = weapon
            .weapon_ammo_kind()
            .ok_or(InventoryError::NoAmmoWeapon)?;
        if weapon.stack_room() == 0 {
            return Err(InventoryError::MagazineFull);
        }
        if self.player.find_ammo(ammo_kind).is_none() {
            return Err(InventoryError::NoAmmo);
        }
        self.player.reload_ticks_left = Some(self.config.reload_ticks.max(1));
        Ok(())
    }

    /// Moves rounds from the best ammo stack into the active weapon. A no-op
    /// when the weapon or ammo went away during the reload.
    pub(crate) fn finish_reload(&mut self) {
        self.player.reload_ticks_left = None;
        let Some(weapon) = self.player.active_weapon() else {
            return;
        };
        let Some(ammo_kind) = weapon.weapon_ammo_kind().map(str::to_string) else {
            return;
        };
        let needed = weapon.stack_room();
        let Some(source) = self.player.find_ammo(&ammo_kind) else {
            return;
        };
        let Some(ammo) = self.player.ammo_item_mut(source) else {
            return;
        };
        let available = ammo.stack_load();
        let moved = needed.min(available);
        ammo.load = Some(available - moved);
        self.player.remove_ammo_if_empty(source);
        if let Some(weapon) = self.player.active_weapon_mut() {
            weapon.load = Some(weapon.load.unwrap_or(0) + moved);
            info!(weapon = %weapon.name, moved, "weapon_reloaded");
        }
    }

    pub fn set_utility_power(&mut self, source: &SourceLocation, on: bool) -> Result<(), InventoryError> {
        let item = self.item_at_mut(source).ok_or(InventoryError::NoItem)?;
        let spent = item.durability.is_some_and(|durability| durability <= 0.0);
        let name = item.name.clone();
        let Some(attrs) = item.utility_mut() else {
            return Err(InventoryError::NotUsable(name));
        };
        if on && spent {
            return Err(InventoryError::NotUsable(name));
        }
        attrs.is_on = on;
        Ok(())
    }

    /// Refills a utility from one unit of its fuel.
    pub fn reload_utility(&mut self, source: &SourceLocation) -> Result<(), InventoryError> {
        let item = self.item_at(source).ok_or(InventoryError::NoItem)?;
        let name = item.name.clone();
        let fuel = item
            .utility()
            .and_then(|attrs| attrs.fuel.clone())
            .ok_or_else(|| InventoryError::NotUsable(name.clone()))?;
        if item.durability_fraction().is_some_and(|fraction| fraction >= 1.0) {
            return Err(InventoryError::MagazineFull);
        }
        let fuel_source = self
            .player
            .belt
            .iter()
            .enumerate()
            .find(|(_, cell)| cell.as_ref().is_some_and(|i| i.name == fuel && i.stack_load() > 0))
            .map(|(index, _)| SourceLocation::Belt(index))
            .or_else(|| {
                self.player
                    .inventory
                    .iter()
                    .position(|i| i.name == fuel && i.stack_load() > 0)
                    .map(SourceLocation::Inventory)
            })
            .ok_or(InventoryError::NoAmmo)?;
        self.use_up_one(&fuel_source);
        if let Some(item) = self.item_at_mut(source) {
            item.durability = item.max_durability;
        }
        Ok(())
    }

    pub fn read_item(&self, source: &SourceLocation) -> Result<String, InventoryError> {
        let item = self.item_at(source).ok_or(InventoryError::NoItem)?;
        item.text()
            .map(str::to_string)
            .ok_or_else(|| InventoryError::NotUsable(item.name.clone()))
    }

    pub fn drop_item(&mut self, source: &SourceLocation) -> Result<(), InventoryError> {
        self.drop_item_stack(source, StackQuantity::All)
    }

    /// Drops `quantity` of a stack (or the whole item) onto a free tile near
    /// the player.
    pub fn drop_item_stack(
        &mut self,
        source: &SourceLocation,
        quantity: StackQuantity,
    ) -> Result<(), InventoryError> {
        if self.player.drop_cooldown > 0 {
            return Err(InventoryError::DropCooldown);
        }
        let item = self.item_at(source).ok_or(InventoryError::NoItem)?;
        let load = item.stack_load();
        let amount = quantity.resolve(load);
        let partial = item.is_stackable() && amount > 0 && amount < load;
        let spot = self
            .free_tile_near(self.player.pos, DROP_SEARCH_RADIUS)
            .ok_or(InventoryError::NoFreeTile)?;

        let mut dropped = if partial {
            let id = self.ids.allocate();
            let stack = self.item_at_mut(source).ok_or(InventoryError::NoItem)?;
            split_stack(stack, amount, id).ok_or(InventoryError::NotSplittable)?
        } else {
            self.take_from(source)?
        };
        dropped.pos = spot;
        debug!(item = %dropped.name, load = dropped.stack_load(), "item_dropped");
        self.ground.push(dropped);
        self.player.drop_cooldown = self.config.drop_cooldown_ticks;
        Ok(())
    }

    /// Puts a dragged item down at a world point: merged into a matching
    /// stack under the cursor, placed on the cursor tile when clear and in
    /// reach, or on the nearest free tile. Returns the item on failure.
    pub fn drop_at(&mut self, mut item: Item, target: Vec2) -> Result<(), Item> {
        let tile_size = self.config.tile_size;
        if item.is_stackable() {
            for existing in self
                .ground
                .iter_mut()
                .filter(|ground| ground.rect(tile_size).contains_point(target))
            {
                merge_stack(existing, &mut item);
                if item.stack_load() == 0 {
                    return Ok(());
                }
            }
        }
        let reach = self.config.interaction_radius_px() * 2.0;
        let origin = if target.distance(self.player.pos) <= reach {
            target
        } else {
            self.player.pos
        };
        let rect = item.rect(tile_size).with_center(origin);
        let clear = !self.layer.blocks(&rect);
        let spot = if clear && origin == target {
            Some(target)
        } else {
            self.free_tile_near(origin, DROP_SEARCH_RADIUS)
        };
        match spot {
            Some(pos) => {
                item.pos = pos;
                self.ground.push(item);
                Ok(())
            }
            None => Err(item),
        }
    }

    /// Merges into matching stacks of the target, then takes a free slot.
    /// Whatever does not fit returns to `source`.
    pub fn transfer_item_stack(
        &mut self,
        source: &SourceLocation,
        target: TransferTarget,
    ) -> Result<(), InventoryError> {
        let item = self.item_at(source).ok_or(InventoryError::NoItem)?;
        match (self.target_container_id(target), target) {
            (Some(target_id), _) => {
                if item.id == target_id || item.contains_id(target_id) {
                    return Err(InventoryError::ContainerIntoItself);
                }
            }
            (None, TransferTarget::Inventory) => {}
            (None, TransferTarget::Backpack) => return Err(InventoryError::NotABackpack),
            (None, TransferTarget::Utility) => return Err(InventoryError::NotUtility),
            (None, TransferTarget::Container(_)) => return Err(InventoryError::NoItem),
        }

        let mut moving = self.take_from(source)?;
        let original_load = moving.stack_load();
        let Some((items, capacity, name)) = self.target_items_mut(target) else {
            self.put_back(source, moving);
            return Err(InventoryError::NoItem);
        };
        transfer_all(items, &mut moving);
        let merged_all = moving.is_stackable() && moving.stack_load() == 0;
        let rest = if merged_all {
            None
        } else if items.len() < capacity {
            items.push(moving);
            None
        } else {
            Some(moving)
        };
        match rest {
            None => Ok(()),
            Some(rest) => {
                let untouched = rest.stack_load() == original_load;
                self.put_back(source, rest);
                if untouched {
                    Err(InventoryError::ContainerFull(name))
                } else {
                    Ok(())
                }
            }
        }
    }

    pub fn place_on_backpack(&mut self, source: &SourceLocation) -> Result<(), InventoryError> {
        if self.player.backpack.is_none() {
            return Err(InventoryError::NotABackpack);
        }
        self.transfer_item_stack(source, TransferTarget::Backpack)
    }

    pub fn toggle_door_state(&mut self, grid_x: i32, grid_y: i32) -> Result<DoorState, DoorError> {
        let blocker = self.player.rect();
        let state = self.layer.toggle_door_state(grid_x, grid_y, &blocker)?;
        debug!(grid_x, grid_y, state = state.as_str(), "door_toggled");
        Ok(state)
    }

    pub fn report(&mut self, error: impl std::fmt::Display) {
        self.notify(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemAttrs, RangedAttrs};
    use crate::world::test_support::open_room;
    use crate::world::tile_center;

    fn make(world: &mut GameWorld, name: &str) -> Item {
        world
            .registry
            .create_from_name(name, false, &mut world.ids, &mut world.rng)
            .expect(name)
    }

    fn matches(world: &mut GameWorld, load: u32) -> Item {
        make(world, "Matches").with_load(load)
    }

    #[test]
    fn grab_moves_whole_stack_into_inventory() {
        let mut world = open_room();
        let water = make(&mut world, "Water Bottle").with_load(3).with_pos(world.player.pos);
        world.ground.push(water);

        world.grab_nearest(false).expect("grab");
        assert!(world.ground.is_empty());
        assert_eq!(world.player.inventory.len(), 1);
        assert_eq!(world.player.inventory[0].load, Some(3));
        assert_eq!(world.player.inventory[0].capacity, Some(5));
    }

    #[test]
    fn grab_out_of_reach_is_rejected() {
        let mut world = open_room();
        let far = world.player.pos + Vec2::new(32.0 * 3.0, 0.0);
        let water = make(&mut world, "Water Bottle").with_pos(far);
        world.ground.push(water);
        assert_eq!(world.grab_nearest(false), Err(InventoryError::NothingToGrab));
        assert_eq!(world.grab(&SourceLocation::Ground(0), false), Err(InventoryError::TooFar));
        assert_eq!(world.ground.len(), 1);
    }

    #[test]
    fn grab_prefers_backpack_when_asked() {
        let mut world = open_room();
        let pack = make(&mut world, "Backpack");
        world.player.backpack = Some(pack);
        let water = make(&mut world, "Water Bottle").with_pos(world.player.pos);
        world.ground.push(water);
        world.grab_nearest(true).expect("grab");
        assert!(world.player.inventory.is_empty());
        assert_eq!(world.player.backpack.as_ref().map(Item::slots_used), Some(1));
    }

    #[test]
    fn grab_with_full_inventory_leaves_item_on_ground() {
        let mut world = open_room();
        for _ in 0..INVENTORY_SLOTS {
            let note = make(&mut world, "Note");
            world.player.inventory.push(note);
        }
        for slot in 0..world.player.belt.len() {
            world.player.belt[slot] = Some(make(&mut world, "Note"));
        }
        let bat = make(&mut world, "Bat").with_pos(world.player.pos);
        let bat_id = bat.id;
        world.ground.push(bat);
        assert_eq!(world.grab_nearest(false), Err(InventoryError::InventoryFull));
        assert_eq!(world.ground[0].id, bat_id);
    }

    #[test]
    fn reload_moves_partial_ammo_and_removes_empty_stack() {
        let mut world = open_room();
        let shotgun = make(&mut world, "Shotgun").with_load(2);
        world.player.belt[0] = Some(shotgun);
        world.player.select_belt_slot(0);
        let shells = make(&mut world, "Shells").with_load(5);
        world.player.inventory.push(shells);

        world.request_reload().expect("reload");
        assert_eq!(world.request_reload(), Err(InventoryError::AlreadyReloading));
        world.finish_reload();
        assert_eq!(world.player.active_weapon().and_then(|w| w.load), Some(7));
        assert!(world.player.inventory.is_empty());
        assert!(!world.player.is_reloading());
    }

    #[test]
    fn reload_rejections_leave_state_alone() {
        let mut world = open_room();
        assert_eq!(world.request_reload(), Err(InventoryError::NoAmmoWeapon));

        let shotgun = make(&mut world, "Shotgun").with_load(8);
        world.player.belt[0] = Some(shotgun);
        world.player.select_belt_slot(0);
        assert_eq!(world.request_reload(), Err(InventoryError::MagazineFull));

        world.player.active_weapon_mut().expect("gun").load = Some(3);
        assert_eq!(world.request_reload(), Err(InventoryError::NoAmmo));
        assert!(!world.player.is_reloading());
    }

    #[test]
    fn consuming_water_restores_and_decrements() {
        let mut world = open_room();
        world.player.stats.set(StatKind::Water, 40.0);
        let water = make(&mut world, "Water Bottle").with_load(2);
        world.player.inventory.push(water);

        world.consume_item(&SourceLocation::Inventory(0)).expect("drink");
        let water_level = world.player.stats.get(StatKind::Water);
        assert!((50.0..=60.0).contains(&water_level));
        assert_eq!(world.player.inventory[0].load, Some(1));

        world.consume_item(&SourceLocation::Inventory(0)).expect("drink");
        assert!(world.player.inventory.is_empty());
    }

    #[test]
    fn sure_cure_clears_infection() {
        let mut world = open_room();
        world.player.stats.set(StatKind::Infection, 45.0);
        let pills = make(&mut world, "Antibiotics");
        world.player.belt[1] = Some(pills);
        world.use_belt_slot(1).expect("cure");
        assert_eq!(world.player.stats.get(StatKind::Infection), 0.0);
        assert_eq!(world.player.belt[1].as_ref().and_then(|p| p.load), Some(2));
    }

    #[test]
    fn ammo_consumable_triggers_reload() {
        let mut world = open_room();
        let shells = make(&mut world, "Shells").with_load(4);
        world.player.inventory.push(shells);
        assert_eq!(
            world.consume_item(&SourceLocation::Inventory(0)),
            Err(InventoryError::NoAmmoWeapon)
        );
    }

    #[test]
    fn equip_routes_by_kind_and_unequip_round_trips() {
        let mut world = open_room();
        let bat = make(&mut world, "Bat");
        let bat_id = bat.id;
        let jacket = make(&mut world, "Jacket");
        let pack = make(&mut world, "Backpack");
        world.player.inventory.extend([bat, jacket, pack]);

        world.equip(&SourceLocation::Inventory(0)).expect("bat");
        assert_eq!(world.player.active_weapon_id(), Some(bat_id));
        world.equip(&SourceLocation::Inventory(0)).expect("jacket");
        assert!(world.player.worn.contains_key(&crate::item::WornSlot::Torso));
        world.equip(&SourceLocation::Inventory(0)).expect("pack");
        assert!(world.player.backpack.is_some());
        assert!(world.player.inventory.is_empty());

        world.unequip(&SourceLocation::Belt(0)).expect("bat off");
        assert!(world.player.active_weapon_id().is_none());
        assert_eq!(world.player.inventory[0].id, bat_id);
        world.equip(&SourceLocation::Inventory(0)).expect("bat again");
        assert_eq!(world.player.belt[0].as_ref().map(|i| i.id), Some(bat_id));
    }

    #[test]
    fn backpack_slot_must_be_free_to_equip() {
        let mut world = open_room();
        let first = make(&mut world, "Backpack");
        let second = make(&mut world, "Backpack");
        world.player.backpack = Some(first);
        world.player.inventory.push(second);
        assert_eq!(
            world.equip(&SourceLocation::Inventory(0)),
            Err(InventoryError::SlotOccupied)
        );
        assert_eq!(world.player.inventory.len(), 1);
    }

    #[test]
    fn drop_one_splits_the_stack() {
        let mut world = open_room();
        let stack = matches(&mut world, 6);
        world.player.inventory.push(stack);
        world
            .drop_item_stack(&SourceLocation::Inventory(0), StackQuantity::One)
            .expect("drop one");
        assert_eq!(world.player.inventory[0].load, Some(5));
        assert_eq!(world.ground.len(), 1);
        assert_eq!(world.ground[0].load, Some(1));
        assert_ne!(world.ground[0].id, world.player.inventory[0].id);

        assert_eq!(
            world.drop_item(&SourceLocation::Inventory(0)),
            Err(InventoryError::DropCooldown)
        );
        world.player.drop_cooldown = 0;
        world.drop_item(&SourceLocation::Inventory(0)).expect("drop all");
        assert!(world.player.inventory.is_empty());
        assert_eq!(world.ground.len(), 2);
    }

    #[test]
    fn drop_in_obstructed_area_keeps_item() {
        let mut world = open_room();
        let (px, py) = (4, 3);
        for y in (py - 3)..=(py + 3) {
            for x in (px - 3)..=(px + 3) {
                let filler = make(&mut world, "Note").with_pos(tile_center(x, y, 32.0));
                world.ground.push(filler);
            }
        }
        let ground_before = world.ground.len();
        let bat = make(&mut world, "Bat");
        world.player.inventory.push(bat);
        assert_eq!(
            world.drop_item(&SourceLocation::Inventory(0)),
            Err(InventoryError::NoFreeTile)
        );
        assert_eq!(world.player.inventory.len(), 1);
        assert_eq!(world.ground.len(), ground_before);
    }

    #[test]
    fn transfer_there_and_back_keeps_total_load() {
        let mut world = open_room();
        let pack = make(&mut world, "Backpack");
        world.player.backpack = Some(pack);
        let in_pack = matches(&mut world, 8);
        world
            .player
            .backpack
            .as_mut()
            .and_then(|p| p.inventory.as_mut())
            .expect("pack")
            .push(in_pack);
        let carried = matches(&mut world, 7);
        world.player.inventory.push(carried);

        world
            .transfer_item_stack(&SourceLocation::Inventory(0), TransferTarget::Backpack)
            .expect("send");
        let pack_total = |w: &GameWorld| {
            w.player.backpack.as_ref().map_or(0, |p| {
                p.inventory.iter().flatten().map(Item::stack_load).sum::<u32>()
            })
        };
        let inventory_total =
            |w: &GameWorld| w.player.inventory.iter().map(Item::stack_load).sum::<u32>();
        assert_eq!(pack_total(&world) + inventory_total(&world), 15);
        assert_eq!(pack_total(&world), 15);

        let pack_id = world.player.backpack.as_ref().map(|p| p.id).expect("id");
        world
            .transfer_item_stack(
                &SourceLocation::Container {
                    container: pack_id,
                    index: 0,
                },
                TransferTarget::Inventory,
            )
            .expect("back");
        assert_eq!(pack_total(&world) + inventory_total(&world), 15);
    }

    #[test]
    fn container_cannot_go_into_itself() {
        let mut world = open_room();
        let pack = make(&mut world, "Backpack");
        world.player.backpack = Some(pack);
        assert_eq!(
            world.transfer_item_stack(&SourceLocation::Backpack, TransferTarget::Backpack),
            Err(InventoryError::ContainerIntoItself)
        );
        assert!(world.player.backpack.is_some());
    }

    #[test]
    fn utility_power_and_refuel() {
        let mut world = open_room();
        let mut lantern = make(&mut world, "Lantern");
        if let Some(attrs) = lantern.utility_mut() {
            attrs.fuel = Some("Matches".to_string());
        }
        lantern.durability = Some(0.0);
        world.player.utility = Some(lantern);
        assert!(world.set_utility_power(&SourceLocation::Utility, true).is_err());

        let fuel = matches(&mut world, 2);
        world.player.inventory.push(fuel);
        world.reload_utility(&SourceLocation::Utility).expect("refuel");
        assert_eq!(world.player.inventory[0].load, Some(1));
        world.set_utility_power(&SourceLocation::Utility, true).expect("on");
        assert!(world.player.utility.as_ref().is_some_and(Item::is_on));
    }

    #[test]
    fn drop_at_merges_with_stack_under_cursor() {
        let mut world = open_room();
        let target = tile_center(5, 3, 32.0);
        let on_ground = matches(&mut world, 4).with_pos(target);
        world.ground.push(on_ground);
        let dragged = matches(&mut world, 3);
        assert!(world.drop_at(dragged, target).is_ok());
        assert_eq!(world.ground.len(), 1);
        assert_eq!(world.ground[0].load, Some(7));
    }

    #[test]
    fn non_stackable_weapon_transfer_uses_a_slot() {
        let mut world = open_room();
        let pack = make(&mut world, "Backpack");
        world.player.backpack = Some(pack);
        let gun = Item::new(
            world.ids.allocate(),
            "Pistol",
            ItemAttrs::WeaponRanged(RangedAttrs {
                damage: ValueRange::new(4.0, 6.0),
                ammo_kind: "9mm".to_string(),
                firing: engine::FiringSpec {
                    pellets: 1,
                    spread_degrees: 2.0,
                },
            }),
        )
        .with_capacity(12)
        .with_load(0);
        world.player.inventory.push(gun);
        world
            .transfer_item_stack(&SourceLocation::Inventory(0), TransferTarget::Backpack)
            .expect("send");
        assert_eq!(world.player.backpack.as_ref().map(Item::slots_used), Some(1));
    }
}
