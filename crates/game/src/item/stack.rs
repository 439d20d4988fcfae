use super::{Item, ItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackQuantity {
    One,
    All,
    Count(u32),
}

impl StackQuantity {
    pub fn resolve(self, load: u32) -> u32 {
        match self {
            Self::One => 1.min(load),
            Self::All => load,
            Self::Count(count) => count.min(load),
        }
    }
}

/// Moves as much of `src` into `dst` as fits. Returns the amount moved.
pub fn merge_stack(dst: &mut Item, src: &mut Item) -> u32 {
    if !dst.can_stack_with(src) {
        return 0;
    }
    let moved = src.stack_load().min(dst.stack_room());
    dst.load = Some(dst.stack_load() + moved);
    src.load = Some(src.stack_load() - moved);
    moved
}

/// Splits `quantity` units off a stack into a new item. Returns `None` when
/// the item is not a stack or the split would take the whole stack.
pub fn split_stack(item: &mut Item, quantity: u32, new_id: ItemId) -> Option<Item> {
    let load = item.stack_load();
    if !item.is_stackable() || quantity == 0 || quantity >= load {
        return None;
    }
    let mut split = item.clone();
    split.id = new_id;
    split.load = Some(quantity);
    item.load = Some(load - quantity);
    Some(split)
}

/// Merges into every compatible stack, then takes a free slot for the rest.
/// The remainder comes back as `Err` when no slot is free.
pub fn insert_stacking(items: &mut Vec<Item>, capacity: usize, mut item: Item) -> Result<(), Item> {
    if item.is_stackable() {
        for existing in items.iter_mut() {
            merge_stack(existing, &mut item);
            if item.stack_load() == 0 {
                return Ok(());
            }
        }
    }
    if items.len() < capacity {
        items.push(item);
        Ok(())
    } else {
        Err(item)
    }
}

/// Merges a stack into compatible stacks only, never taking a new slot.
pub fn transfer_all(items: &mut [Item], item: &mut Item) -> u32 {
    let mut moved = 0;
    for existing in items.iter_mut() {
        moved += merge_stack(existing, item);
        if item.stack_load() == 0 {
            break;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use crate::item::{ConsumableAttrs, ItemAttrs};

    use super::*;

    fn matches(id: u64, load: u32) -> Item {
        Item::new(
            ItemId(id),
            "Matches",
            ItemAttrs::Consumable(ConsumableAttrs::default()),
        )
        .with_capacity(10)
        .with_load(load)
    }

    #[test]
    fn merge_past_capacity_keeps_remainder() {
        let mut dst = matches(1, 8);
        let mut src = matches(2, 7);
        assert_eq!(merge_stack(&mut dst, &mut src), 2);
        assert_eq!(dst.load, Some(10));
        assert_eq!(src.load, Some(5));
    }

    #[test]
    fn split_of_single_unit_falls_back() {
        let mut single = matches(1, 1);
        assert!(split_stack(&mut single, 1, ItemId(9)).is_none());
        let mut stack = matches(1, 4);
        let split = split_stack(&mut stack, 1, ItemId(9)).expect("split");
        assert_eq!((split.id, split.load, stack.load), (ItemId(9), Some(1), Some(3)));
    }

    #[test]
    fn insert_fills_stacks_then_free_slot() {
        let mut items = vec![matches(1, 9), matches(2, 9)];
        assert!(insert_stacking(&mut items, 3, matches(3, 5)).is_ok());
        let loads = items.iter().map(|i| i.load).collect::<Vec<_>>();
        assert_eq!(loads, vec![Some(10), Some(10), Some(3)]);

        let rest = insert_stacking(&mut items, 3, matches(4, 9)).expect_err("no room");
        assert_eq!(rest.load, Some(2));
        assert_eq!(items[2].load, Some(10));
    }

    #[test]
    fn quantity_resolution_clamps_to_load() {
        assert_eq!(StackQuantity::One.resolve(5), 1);
        assert_eq!(StackQuantity::All.resolve(5), 5);
        assert_eq!(StackQuantity::Count(9).resolve(5), 5);
    }
}
