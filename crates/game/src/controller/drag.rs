use engine::Vec2;
use tracing::debug;

use crate::entity::INVENTORY_SLOTS;
use crate::item::{merge_stack, split_stack, Item, ItemId, WornSlot};
use crate::world::{GameWorld, SourceLocation};

use super::layout::SlotTarget;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    /// Pressed on an item; nothing has moved yet.
    Candidate {
        source: SourceLocation,
        start: Vec2,
        offset: Vec2,
    },
    /// The item is in hand and out of its source.
    Dragging {
        item: Item,
        source: SourceLocation,
        offset: Vec2,
    },
}

impl DragState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn dragged(&self) -> Option<(&Item, Vec2)> {
        match self {
            Self::Dragging { item, offset, .. } => Some((item, *offset)),
            _ => None,
        }
    }
}

/// Where a released item is headed.
#[derive(Debug, Clone, PartialEq)]
pub enum DropTarget {
    Slot(SlotTarget),
    /// Empty part of the nearby window: the item goes to the player's feet.
    NearbyFloor,
    /// Game area under the cursor, in world pixels.
    World(Vec2),
    /// Any other window body.
    Blocked,
}

/// Lifts the item out of `source`. With `split` a single unit comes off a
/// stack and the source is tagged so a bounce can give it back.
pub fn pick_up(
    world: &mut GameWorld,
    source: &SourceLocation,
    split: bool,
) -> Option<(Item, SourceLocation)> {
    let splittable = world
        .item_at(source)
        .is_some_and(|item| item.is_stackable() && item.stack_load() > 1);
    if split && splittable {
        let id = world.ids.allocate();
        let stack = world.item_at_mut(source)?;
        let unit = split_stack(stack, 1, id)?;
        return Some((unit, SourceLocation::split_of(source.clone())));
    }
    let item = world.take_from(source).ok()?;
    Some((item, source.clone()))
}

/// Returns a dragged item to where it came from. A split unit is merged
/// back into its stack.
pub fn bounce(world: &mut GameWorld, source: &SourceLocation, mut item: Item) {
    if source.is_split() {
        if let Some(stack) = world.item_at_mut(source.base()) {
            merge_stack(stack, &mut item);
            if item.stack_load() == 0 {
                return;
            }
        }
    }
    debug!(item = %item.name, "drag_bounced");
    world.put_back(source.base(), item);
}

/// Tries the target; on `Err` the item comes back unplaced.
pub fn place(
    world: &mut GameWorld,
    item: Item,
    source: &SourceLocation,
    target: &DropTarget,
) -> Result<(), Item> {
    let result = match target {
        DropTarget::Slot(slot) if slot.source() == *source.base() => Err(item),
        DropTarget::Slot(SlotTarget::Belt(_)) if item.is_backpack() => Err(item),
        DropTarget::Slot(SlotTarget::Backpack) if !item.is_backpack() => Err(item),
        DropTarget::Slot(SlotTarget::Utility) if !item.fits_utility_slot() => Err(item),
        DropTarget::Slot(
            slot @ (SlotTarget::Belt(_) | SlotTarget::Backpack | SlotTarget::Utility),
        ) => swap_into(world, item, source, slot),
        DropTarget::Slot(SlotTarget::Inventory(index)) => {
            place_in_inventory(world, item, source, *index)
        }
        DropTarget::Slot(SlotTarget::Worn(slot)) => place_worn(world, item, source, *slot),
        DropTarget::Slot(SlotTarget::Container { container, index })
        | DropTarget::Slot(SlotTarget::Nearby { container, index }) => {
            place_in_container(world, item, source, *container, *index)
        }
        DropTarget::Slot(SlotTarget::Ground(index)) => place_on_ground_item(world, item, *index),
        DropTarget::NearbyFloor => {
            let feet = world.player.pos;
            world.drop_at(item, feet)
        }
        DropTarget::World(point) => world.drop_at(item, *point),
        DropTarget::Blocked => Err(item),
    };
    world.player.validate_active_weapon();
    result
}

/// Merges into a compatible stack. Whatever does not fit is handed back.
fn merge_or_return(existing: &mut Item, mut item: Item) -> Result<(), Item> {
    merge_stack(existing, &mut item);
    if item.stack_load() == 0 {
        Ok(())
    } else {
        Err(item)
    }
}

fn equipment_cell<'a>(world: &'a mut GameWorld, target: &SlotTarget) -> Option<&'a mut Option<Item>> {
    match target {
        SlotTarget::Belt(index) => world.player.belt.get_mut(*index),
        SlotTarget::Backpack => Some(&mut world.player.backpack),
        SlotTarget::Utility => Some(&mut world.player.utility),
        _ => None,
    }
}

/// The occupant of a swapped slot takes the dragged item's old place. On
/// the ground that includes its position.
fn return_displaced(world: &mut GameWorld, source: &SourceLocation, mut displaced: Item, origin: Vec2) {
    if matches!(source.base(), SourceLocation::Ground(_)) {
        displaced.pos = origin;
    }
    world.put_back(source.base(), displaced);
}

/// Index the held item left when it came out of the same list as `slot`.
/// Split units leave no hole.
fn hole_in_same_list(held: &SourceLocation, slot: &SourceLocation) -> Option<usize> {
    match (held, slot) {
        (SourceLocation::Inventory(from), SourceLocation::Inventory(_)) => Some(*from),
        (
            SourceLocation::Container { container: held_in, index: from }
            | SourceLocation::Nearby { container: held_in, index: from },
            SourceLocation::Container { container: slot_in, .. }
            | SourceLocation::Nearby { container: slot_in, .. },
        ) if held_in == slot_in => Some(*from),
        _ => None,
    }
}

/// Slot cells keep their pre-drag meaning: the held item's cell shows a
/// hole and later cells map one down in the shortened list.
fn index_after_take(held: &SourceLocation, slot: &SourceLocation, index: usize) -> usize {
    match hole_in_same_list(held, slot) {
        Some(from) if from < index => index - 1,
        _ => index,
    }
}

/// What a slot cell shows while `held` is in hand.
pub fn shown_location(held: Option<&SourceLocation>, target: &SlotTarget) -> Option<SourceLocation> {
    let location = target.source();
    let Some(held) = held else {
        return Some(location);
    };
    let shifted = |index: usize| index_after_take(held, &location, index);
    match (&location, hole_in_same_list(held, &location)) {
        (SourceLocation::Inventory(index), Some(from)) if *index == from => None,
        (SourceLocation::Container { index, .. } | SourceLocation::Nearby { index, .. }, Some(from))
            if *index == from =>
        {
            None
        }
        (SourceLocation::Inventory(index), _) => Some(SourceLocation::Inventory(shifted(*index))),
        (SourceLocation::Container { container, index }, _) => Some(SourceLocation::Container {
            container: *container,
            index: shifted(*index),
        }),
        (SourceLocation::Nearby { container, index }, _) => Some(SourceLocation::Nearby {
            container: *container,
            index: shifted(*index),
        }),
        _ => Some(location),
    }
}

/// Fills an empty cell, merges into a matching stack, or swaps with the
/// occupant, which goes back to where the dragged item came from.
fn swap_into(
    world: &mut GameWorld,
    item: Item,
    source: &SourceLocation,
    target: &SlotTarget,
) -> Result<(), Item> {
    let origin = item.pos;
    let Some(cell) = equipment_cell(world, target) else {
        return Err(item);
    };
    if let Some(existing) = cell.as_mut() {
        if existing.can_stack_with(&item) {
            return merge_or_return(existing, item);
        }
    }
    if let Some(displaced) = cell.replace(item) {
        return_displaced(world, source, displaced, origin);
    }
    Ok(())
}

fn place_worn(
    world: &mut GameWorld,
    item: Item,
    source: &SourceLocation,
    slot: WornSlot,
) -> Result<(), Item> {
    if !item.cloth().is_some_and(|cloth| cloth.slot == slot) {
        return Err(item);
    }
    let origin = item.pos;
    if let Some(displaced) = world.player.worn.insert(slot, item) {
        return_displaced(world, source, displaced, origin);
    }
    Ok(())
}

fn place_in_inventory(
    world: &mut GameWorld,
    item: Item,
    source: &SourceLocation,
    index: usize,
) -> Result<(), Item> {
    let index = index_after_take(source, &SourceLocation::Inventory(index), index);
    let origin = item.pos;
    let inventory = &mut world.player.inventory;
    if index >= inventory.len() {
        if inventory.len() >= INVENTORY_SLOTS {
            return Err(item);
        }
        inventory.push(item);
        return Ok(());
    }
    let existing = &mut inventory[index];
    if existing.can_stack_with(&item) {
        return merge_or_return(existing, item);
    }
    let displaced = std::mem::replace(existing, item);
    return_displaced(world, source, displaced, origin);
    Ok(())
}

fn place_in_container(
    world: &mut GameWorld,
    item: Item,
    source: &SourceLocation,
    container: ItemId,
    index: usize,
) -> Result<(), Item> {
    if item.id == container || item.contains_id(container) {
        return Err(item);
    }
    let index = index_after_take(source, &SourceLocation::Container { container, index }, index);
    let origin = item.pos;
    let Some(owner) = world.container_mut(container) else {
        return Err(item);
    };
    let capacity = owner.slot_capacity();
    let Some(items) = owner.inventory.as_mut() else {
        return Err(item);
    };
    if index >= items.len() {
        if items.len() >= capacity {
            return Err(item);
        }
        items.push(item);
        return Ok(());
    }
    let existing = &mut items[index];
    if existing.can_stack_with(&item) {
        return merge_or_return(existing, item);
    }
    let displaced = std::mem::replace(existing, item);
    return_displaced(world, source, displaced, origin);
    Ok(())
}

fn place_on_ground_item(world: &mut GameWorld, item: Item, index: usize) -> Result<(), Item> {
    let feet = world.player.pos;
    match world.ground.get_mut(index) {
        Some(existing) if existing.can_stack_with(&item) => match merge_or_return(existing, item) {
            Ok(()) => Ok(()),
            Err(rest) => world.drop_at(rest, feet),
        },
        _ => world.drop_at(item, feet),
    }
}
