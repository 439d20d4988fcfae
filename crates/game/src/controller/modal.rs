use crate::item::ItemId;
use crate::world::GameWorld;

/// Distance, in tiles, past which a container window on a map tile closes.
const WORLD_CONTAINER_REACH_TILES: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKind {
    Inventory,
    Status,
    Nearby,
    Messages,
    Container(ItemId),
}

impl ModalKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::Inventory => "Inventory",
            Self::Status => "Status",
            Self::Nearby => "Nearby",
            Self::Messages => "Messages",
            Self::Container(_) => "Container",
        }
    }
}

/// Open windows, bottom first. The last entry is drawn on top and takes
/// input first.
#[derive(Debug, Clone, Default)]
pub struct ModalStack {
    open: Vec<ModalKind>,
}

impl ModalStack {
    pub fn is_open(&self, kind: ModalKind) -> bool {
        self.open.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    /// Opens `kind` on top, or raises it when already open.
    pub fn open(&mut self, kind: ModalKind) {
        self.open.retain(|open| *open != kind);
        self.open.push(kind);
    }

    pub fn close(&mut self, kind: ModalKind) {
        self.open.retain(|open| *open != kind);
    }

    /// Returns whether the window is open afterwards.
    pub fn toggle(&mut self, kind: ModalKind) -> bool {
        if self.is_open(kind) {
            self.close(kind);
            false
        } else {
            self.open(kind);
            true
        }
    }

    pub fn pop_top(&mut self) -> Option<ModalKind> {
        self.open.pop()
    }

    pub fn retain(&mut self, keep: impl FnMut(&ModalKind) -> bool) {
        self.open.retain(keep);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = ModalKind> + '_ {
        self.open.iter().copied()
    }
}

/// Whether a container window may stay open. Carried containers always
/// can; ground items stay within interaction reach and map containers
/// within two tiles.
pub fn container_in_reach(world: &GameWorld, id: ItemId) -> bool {
    if world.container(id).is_none() {
        return false;
    }
    if world.container_is_carried(id) {
        return true;
    }
    let Some(pos) = world.container_world_pos(id) else {
        return false;
    };
    let on_ground = world.ground.iter().any(|item| item.id == id);
    let reach = if on_ground {
        world.config.interaction_radius_px()
    } else {
        world.config.tile_size * WORLD_CONTAINER_REACH_TILES
    };
    pos.distance(world.player.pos) <= reach
}

/// Drops container windows whose container walked out of reach or no
/// longer exists.
pub fn auto_close_containers(modals: &mut ModalStack, world: &GameWorld) {
    modals.retain(|kind| match kind {
        ModalKind::Container(id) => container_in_reach(world, *id),
        _ => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_and_open_keep_one_entry_per_window() {
        let mut modals = ModalStack::default();
        assert!(modals.toggle(ModalKind::Inventory));
        modals.open(ModalKind::Messages);
        modals.open(ModalKind::Inventory);
        assert_eq!(
            modals.iter().collect::<Vec<_>>(),
            vec![ModalKind::Messages, ModalKind::Inventory]
        );
        assert!(!modals.toggle(ModalKind::Inventory));
        assert_eq!(modals.pop_top(), Some(ModalKind::Messages));
        assert!(modals.is_empty());
        assert_eq!(modals.pop_top(), None);
    }
}
