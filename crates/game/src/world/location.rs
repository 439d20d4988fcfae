use engine::Vec2;

use crate::entity::INVENTORY_SLOTS;
use crate::error::InventoryError;
use crate::item::{Item, ItemId, WornSlot};

use super::GameWorld;

/// Where an item sits, as seen by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Ground(usize),
    Inventory(usize),
    Belt(usize),
    Backpack,
    Utility,
    Worn(WornSlot),
    /// Slot of an open container window.
    Container { container: ItemId, index: usize },
    /// Slot of a world container or corpse listed as nearby.
    Nearby { container: ItemId, index: usize },
    /// A unit split off the stack at the inner location.
    StackSplit(Box<SourceLocation>),
}

impl SourceLocation {
    pub fn split_of(inner: SourceLocation) -> Self {
        Self::StackSplit(Box::new(inner))
    }

    /// The concrete location, with any split tag removed.
    pub fn base(&self) -> &SourceLocation {
        match self {
            Self::StackSplit(inner) => inner.base(),
            other => other,
        }
    }

    pub fn is_split(&self) -> bool {
        matches!(self, Self::StackSplit(_))
    }

    pub fn is_equipped_slot(&self) -> bool {
        matches!(
            self.base(),
            Self::Belt(_) | Self::Backpack | Self::Utility | Self::Worn(_)
        )
    }

    /// Items lying in the world rather than carried.
    pub fn is_outside_player(&self) -> bool {
        matches!(self.base(), Self::Ground(_) | Self::Nearby { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerRoot {
    Backpack,
    Utility,
    Inventory(usize),
    Belt(usize),
    Worn(WornSlot),
    Ground(usize),
    World(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ContainerPath {
    root: ContainerRoot,
    nested: Vec<usize>,
}

fn search_nested(item: &Item, id: ItemId, path: &mut Vec<usize>) -> bool {
    let Some(items) = &item.inventory else {
        return false;
    };
    for (index, child) in items.iter().enumerate() {
        path.push(index);
        if (child.id == id && child.is_container()) || search_nested(child, id, path) {
            return true;
        }
        path.pop();
    }
    false
}

impl GameWorld {
    fn container_roots(&self) -> Vec<(ContainerRoot, &Item)> {
        let player = &self.player;
        let mut roots = Vec::new();
        roots.extend(player.backpack.iter().map(|item| (ContainerRoot::Backpack, item)));
        roots.extend(player.utility.iter().map(|item| (ContainerRoot::Utility, item)));
        roots.extend(
            player
                .inventory
                .iter()
                .enumerate()
                .map(|(index, item)| (ContainerRoot::Inventory(index), item)),
        );
        roots.extend(
            player
                .belt
                .iter()
                .enumerate()
                .filter_map(|(index, cell)| cell.as_ref().map(|item| (ContainerRoot::Belt(index), item))),
        );
        roots.extend(
            player
                .worn
                .iter()
                .map(|(slot, item)| (ContainerRoot::Worn(*slot), item)),
        );
        roots.extend(
            self.ground
                .iter()
                .enumerate()
                .map(|(index, item)| (ContainerRoot::Ground(index), item)),
        );
        roots.extend(
            self.layer
                .containers()
                .iter()
                .enumerate()
                .map(|(index, item)| (ContainerRoot::World(index), item)),
        );
        roots
    }

    fn find_container_path(&self, id: ItemId) -> Option<ContainerPath> {
        for (root, item) in self.container_roots() {
            if item.id == id && item.is_container() {
                return Some(ContainerPath {
                    root,
                    nested: Vec::new(),
                });
            }
            let mut nested = Vec::new();
            if search_nested(item, id, &mut nested) {
                return Some(ContainerPath { root, nested });
            }
        }
        None
    }

    fn root_mut(&mut self, root: ContainerRoot) -> Option<&mut Item> {
        match root {
            ContainerRoot::Backpack => self.player.backpack.as_mut(),
            ContainerRoot::Utility => self.player.utility.as_mut(),
            ContainerRoot::Inventory(index) => self.player.inventory.get_mut(index),
            ContainerRoot::Belt(index) => self.player.belt.get_mut(index)?.as_mut(),
            ContainerRoot::Worn(slot) => self.player.worn.get_mut(&slot),
            ContainerRoot::Ground(index) => self.ground.get_mut(index),
            ContainerRoot::World(index) => self.layer.containers_mut().get_mut(index),
        }
    }

    pub fn container(&self, id: ItemId) -> Option<&Item> {
        let path = self.find_container_path(id)?;
        let (_, mut item) = self
            .container_roots()
            .into_iter()
            .find(|(root, _)| *root == path.root)?;
        for index in path.nested {
            item = item.inventory.as_ref()?.get(index)?;
        }
        Some(item)
    }

    pub fn container_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        let path = self.find_container_path(id)?;
        let mut item = self.root_mut(path.root)?;
        for index in path.nested {
            item = item.inventory.as_mut()?.get_mut(index)?;
        }
        Some(item)
    }

    /// World position of a container lying outside the player, if any.
    pub fn container_world_pos(&self, id: ItemId) -> Option<Vec2> {
        let path = self.find_container_path(id)?;
        match path.root {
            ContainerRoot::Ground(index) => self.ground.get(index).map(|item| item.pos),
            ContainerRoot::World(index) => self.layer.containers().get(index).map(|item| item.pos),
            _ => None,
        }
    }

    pub fn container_is_carried(&self, id: ItemId) -> bool {
        self.find_container_path(id).is_some_and(|path| {
            !matches!(path.root, ContainerRoot::Ground(_) | ContainerRoot::World(_))
        })
    }

    pub fn item_at(&self, source: &SourceLocation) -> Option<&Item> {
        match source.base() {
            SourceLocation::Ground(index) => self.ground.get(*index),
            SourceLocation::Inventory(index) => self.player.inventory.get(*index),
            SourceLocation::Belt(index) => self.player.belt.get(*index)?.as_ref(),
            SourceLocation::Backpack => self.player.backpack.as_ref(),
            SourceLocation::Utility => self.player.utility.as_ref(),
            SourceLocation::Worn(slot) => self.player.worn.get(slot),
            SourceLocation::Container { container, index }
            | SourceLocation::Nearby { container, index } => {
                self.container(*container)?.inventory.as_ref()?.get(*index)
            }
            SourceLocation::StackSplit(_) => None,
        }
    }

    pub fn item_at_mut(&mut self, source: &SourceLocation) -> Option<&mut Item> {
        match source.base() {
            SourceLocation::Ground(index) => self.ground.get_mut(*index),
            SourceLocation::Inventory(index) => self.player.inventory.get_mut(*index),
            SourceLocation::Belt(index) => self.player.belt.get_mut(*index)?.as_mut(),
            SourceLocation::Backpack => self.player.backpack.as_mut(),
            SourceLocation::Utility => self.player.utility.as_mut(),
            SourceLocation::Worn(slot) => self.player.worn.get_mut(slot),
            SourceLocation::Container { container, index }
            | SourceLocation::Nearby { container, index } => self
                .container_mut(*container)?
                .inventory
                .as_mut()?
                .get_mut(*index),
            SourceLocation::StackSplit(_) => None,
        }
    }

    /// Removes the item at `source`, keeping the active weapon consistent.
    pub fn take_from(&mut self, source: &SourceLocation) -> Result<Item, InventoryError> {
        let item = match source.base() {
            SourceLocation::Ground(index) => {
                (*index < self.ground.len()).then(|| self.ground.remove(*index))
            }
            SourceLocation::Inventory(index) => (*index < self.player.inventory.len())
                .then(|| self.player.inventory.remove(*index)),
            SourceLocation::Belt(index) => self.player.belt.get_mut(*index).and_then(Option::take),
            SourceLocation::Backpack => self.player.backpack.take(),
            SourceLocation::Utility => self.player.utility.take(),
            SourceLocation::Worn(slot) => self.player.worn.remove(slot),
            SourceLocation::Container { container, index }
            | SourceLocation::Nearby { container, index } => {
                let index = *index;
                self.container_mut(*container)
                    .and_then(|owner| owner.inventory.as_mut())
                    .and_then(|items| (index < items.len()).then(|| items.remove(index)))
            }
            SourceLocation::StackSplit(_) => None,
        };
        self.player.validate_active_weapon();
        item.ok_or(InventoryError::NoItem)
    }

    /// Re-inserts an item where it came from. When that place is gone or
    /// taken it lands in the inventory, or at the player's feet.
    pub fn put_back(&mut self, source: &SourceLocation, item: Item) {
        let leftover = match source.base() {
            SourceLocation::Ground(index) => {
                let index = (*index).min(self.ground.len());
                self.ground.insert(index, item);
                None
            }
            SourceLocation::Inventory(index) => {
                if self.player.inventory.len() < INVENTORY_SLOTS {
                    let index = (*index).min(self.player.inventory.len());
                    self.player.inventory.insert(index, item);
                    None
                } else {
                    Some(item)
                }
            }
            SourceLocation::Belt(index) => match self.player.belt.get_mut(*index) {
                Some(cell) if cell.is_none() => {
                    *cell = Some(item);
                    None
                }
                _ => Some(item),
            },
            SourceLocation::Backpack if self.player.backpack.is_none() && item.is_backpack() => {
                self.player.backpack = Some(item);
                None
            }
            SourceLocation::Utility if self.player.utility.is_none() && item.fits_utility_slot() => {
                self.player.utility = Some(item);
                None
            }
            SourceLocation::Worn(slot)
                if !self.player.worn.contains_key(slot)
                    && item.cloth().is_some_and(|cloth| cloth.slot == *slot) =>
            {
                self.player.worn.insert(*slot, item);
                None
            }
            SourceLocation::Container { container, index }
            | SourceLocation::Nearby { container, index } => {
                let index = *index;
                match self.container_mut(*container) {
                    Some(owner) if owner.has_free_slot() => {
                        if let Some(items) = owner.inventory.as_mut() {
                            let index = index.min(items.len());
                            items.insert(index, item);
                        }
                        None
                    }
                    _ => Some(item),
                }
            }
            _ => Some(item),
        };
        if let Some(item) = leftover {
            self.place_fallback(item);
        }
    }

    fn place_fallback(&mut self, item: Item) {
        if let Err(mut rest) = self.player.stack_item_in_inventory(item) {
            let pos = self.player.pos;
            rest.pos = self
                .free_tile_near(pos, super::DROP_SEARCH_RADIUS)
                .unwrap_or(pos);
            self.ground.push(rest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ConsumableAttrs, ItemAttrs};
    use crate::world::test_support::open_room;

    fn stack(world: &mut GameWorld, name: &str, load: u32) -> Item {
        Item::new(
            world.ids.allocate(),
            name,
            ItemAttrs::Consumable(ConsumableAttrs::default()),
        )
        .with_capacity(10)
        .with_load(load)
    }

    fn backpack(world: &mut GameWorld) -> Item {
        Item::new(world.ids.allocate(), "Backpack", ItemAttrs::Backpack).with_capacity(4)
    }

    #[test]
    fn finds_nested_containers_by_id() {
        let mut world = open_room();
        let mut outer = backpack(&mut world);
        let mut inner = Item::new(world.ids.allocate(), "Tin", ItemAttrs::Container).with_capacity(2);
        let inner_id = inner.id;
        let matches = stack(&mut world, "Matches", 3);
        inner.inventory.as_mut().expect("tin").push(matches);
        outer.inventory.as_mut().expect("pack").push(inner);
        world.player.backpack = Some(outer);

        assert_eq!(world.container(inner_id).map(|c| c.name.as_str()), Some("Tin"));
        let source = SourceLocation::Container {
            container: inner_id,
            index: 0,
        };
        assert_eq!(world.item_at(&source).map(|i| i.load), Some(Some(3)));
        assert!(world.container_is_carried(inner_id));
        assert!(world.container_world_pos(inner_id).is_none());

        let taken = world.take_from(&source).expect("take");
        assert_eq!(world.container(inner_id).map(Item::slots_used), Some(0));
        world.put_back(&source, taken);
        assert_eq!(world.container(inner_id).map(Item::slots_used), Some(1));
    }

    #[test]
    fn put_back_restores_original_index() {
        let mut world = open_room();
        for load in [1, 2, 3] {
            let item = stack(&mut world, &format!("Thing {load}"), load);
            world.player.inventory.push(item);
        }
        let source = SourceLocation::Inventory(1);
        let taken = world.take_from(&source).expect("take");
        assert_eq!(taken.load, Some(2));
        world.put_back(&source, taken);
        let loads = world
            .player
            .inventory
            .iter()
            .map(|item| item.load)
            .collect::<Vec<_>>();
        assert_eq!(loads, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn taking_the_active_weapon_clears_it() {
        use crate::item::MeleeAttrs;
        let mut world = open_room();
        let bat = Item::new(
            world.ids.allocate(),
            "Bat",
            ItemAttrs::WeaponMelee(MeleeAttrs {
                damage: engine::ValueRange::new(2.0, 4.0),
            }),
        );
        world.player.belt[2] = Some(bat);
        assert!(world.player.select_belt_slot(2));
        world.take_from(&SourceLocation::Belt(2)).expect("take");
        assert!(world.player.active_weapon_id().is_none());
    }

    #[test]
    fn split_tag_resolves_to_inner_location() {
        let split = SourceLocation::split_of(SourceLocation::Belt(3));
        assert_eq!(split.base(), &SourceLocation::Belt(3));
        assert!(split.is_split());
        assert!(split.is_equipped_slot());
        assert!(SourceLocation::Ground(0).is_outside_player());
    }
}
