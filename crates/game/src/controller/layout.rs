use engine::{ScreenRect, Vec2, Viewport};

use crate::entity::{BELT_SLOTS, INVENTORY_SLOTS};
use crate::item::{ItemId, WornSlot};
use crate::world::{GameWorld, SourceLocation};

use super::modal::{ModalKind, ModalStack};

pub const SLOT_PX: i32 = 36;
pub const SLOT_GAP_PX: i32 = 4;
pub const PANEL_HEADER_PX: i32 = 20;
const PANEL_COLUMNS: i32 = 8;
const PANEL_ORIGIN_PX: i32 = 16;
const PANEL_CASCADE_PX: i32 = 28;
const TEXT_PANEL_HEIGHT_PX: i32 = 180;
const BAR_MARGIN_PX: i32 = 12;
const NEARBY_GROUND_LIMIT: usize = 8;
const NEARBY_CONTAINER_LIMIT: usize = 3;
const CONTAINER_SLOT_LIMIT: usize = 32;

/// A slot the pointer can land on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotTarget {
    Belt(usize),
    Backpack,
    Utility,
    Inventory(usize),
    Worn(WornSlot),
    Container { container: ItemId, index: usize },
    Nearby { container: ItemId, index: usize },
    Ground(usize),
}

impl SlotTarget {
    pub fn source(&self) -> SourceLocation {
        match self {
            Self::Belt(index) => SourceLocation::Belt(*index),
            Self::Backpack => SourceLocation::Backpack,
            Self::Utility => SourceLocation::Utility,
            Self::Inventory(index) => SourceLocation::Inventory(*index),
            Self::Worn(slot) => SourceLocation::Worn(*slot),
            Self::Container { container, index } => SourceLocation::Container {
                container: *container,
                index: *index,
            },
            Self::Nearby { container, index } => SourceLocation::Nearby {
                container: *container,
                index: *index,
            },
            Self::Ground(index) => SourceLocation::Ground(*index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRect {
    pub target: SlotTarget,
    pub rect: ScreenRect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRect {
    pub kind: ModalKind,
    pub rect: ScreenRect,
    pub slots: Vec<SlotRect>,
}

/// Screen placement of the HUD and open windows for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HudLayout {
    pub viewport: Viewport,
    pub belt: Vec<SlotRect>,
    pub equipment: Vec<SlotRect>,
    /// Bottom first, like the modal stack.
    pub panels: Vec<PanelRect>,
}

pub fn rect_center(rect: ScreenRect) -> Vec2 {
    Vec2::new(
        rect.x as f32 + rect.width as f32 * 0.5,
        rect.y as f32 + rect.height as f32 * 0.5,
    )
}

/// Ground items in grabbing reach, nearest first. Corpses are listed as
/// containers instead.
pub fn nearby_ground(world: &GameWorld) -> Vec<usize> {
    let reach = world.config.interaction_radius_px();
    let mut found = world
        .ground
        .iter()
        .enumerate()
        .filter(|(_, item)| !item.is_corpse())
        .map(|(index, item)| (index, item.pos.distance(world.player.pos)))
        .filter(|(_, distance)| *distance <= reach)
        .collect::<Vec<_>>();
    found.sort_by(|a, b| a.1.total_cmp(&b.1));
    found
        .into_iter()
        .take(NEARBY_GROUND_LIMIT)
        .map(|(index, _)| index)
        .collect()
}

/// Corpses in reach and map containers within two tiles.
pub fn nearby_containers(world: &GameWorld) -> Vec<ItemId> {
    let player = world.player.pos;
    let reach = world.config.interaction_radius_px();
    let map_reach = world.config.tile_size * 2.0;
    world
        .ground
        .iter()
        .filter(|item| item.is_corpse() && item.pos.distance(player) <= reach)
        .chain(
            world
                .layer
                .containers()
                .iter()
                .filter(|item| item.pos.distance(player) <= map_reach),
        )
        .map(|item| item.id)
        .take(NEARBY_CONTAINER_LIMIT)
        .collect()
}

fn slot_row(x: i32, y: i32, targets: impl IntoIterator<Item = SlotTarget>) -> Vec<SlotRect> {
    targets
        .into_iter()
        .enumerate()
        .map(|(column, target)| SlotRect {
            target,
            rect: ScreenRect::new(
                x + column as i32 * (SLOT_PX + SLOT_GAP_PX),
                y,
                SLOT_PX,
                SLOT_PX,
            ),
        })
        .collect()
}

/// Lays targets out in rows of `PANEL_COLUMNS`, returning the slots and the
/// y just below the last row.
fn slot_grid(x: i32, y: i32, targets: Vec<SlotTarget>) -> (Vec<SlotRect>, i32) {
    let mut slots = Vec::with_capacity(targets.len());
    let mut row_y = y;
    for chunk in targets.chunks(PANEL_COLUMNS as usize) {
        slots.extend(slot_row(x, row_y, chunk.iter().cloned()));
        row_y += SLOT_PX + SLOT_GAP_PX;
    }
    if targets.is_empty() {
        row_y += SLOT_PX + SLOT_GAP_PX;
    }
    (slots, row_y)
}

fn panel_width() -> i32 {
    PANEL_COLUMNS * (SLOT_PX + SLOT_GAP_PX) + SLOT_GAP_PX
}

fn panel_slots(kind: ModalKind, world: &GameWorld, x: i32, y: i32) -> (Vec<SlotRect>, i32) {
    match kind {
        ModalKind::Inventory => {
            let mut slots = slot_row(x, y, (0..INVENTORY_SLOTS).map(SlotTarget::Inventory));
            let worn_y = y + SLOT_PX + SLOT_GAP_PX;
            slots.extend(slot_row(x, worn_y, WornSlot::ALL.map(SlotTarget::Worn)));
            (slots, worn_y + SLOT_PX + SLOT_GAP_PX)
        }
        ModalKind::Container(container) => {
            let capacity = world
                .container(container)
                .map_or(0, |item| item.slot_capacity().min(CONTAINER_SLOT_LIMIT));
            let targets = (0..capacity)
                .map(|index| SlotTarget::Container { container, index })
                .collect();
            slot_grid(x, y, targets)
        }
        ModalKind::Nearby => {
            let ground = nearby_ground(world)
                .into_iter()
                .map(SlotTarget::Ground)
                .collect();
            let (mut slots, mut next_y) = slot_grid(x, y, ground);
            for container in nearby_containers(world) {
                let capacity = world
                    .container(container)
                    .map_or(0, |item| item.slot_capacity().min(CONTAINER_SLOT_LIMIT));
                let targets = (0..capacity)
                    .map(|index| SlotTarget::Nearby { container, index })
                    .collect();
                let (rows, below) = slot_grid(x, next_y, targets);
                slots.extend(rows);
                next_y = below;
            }
            (slots, next_y)
        }
        ModalKind::Status | ModalKind::Messages => (Vec::new(), y + TEXT_PANEL_HEIGHT_PX),
    }
}

impl HudLayout {
    pub fn build(viewport: Viewport, modals: &ModalStack, world: &GameWorld) -> Self {
        let width = viewport.width as i32;
        let height = viewport.height as i32;
        let bar_width = BELT_SLOTS as i32 * (SLOT_PX + SLOT_GAP_PX) - SLOT_GAP_PX;
        let belt_x = (width - bar_width) / 2;
        let bar_y = height - SLOT_PX - BAR_MARGIN_PX;
        let belt = slot_row(belt_x, bar_y, (0..BELT_SLOTS).map(SlotTarget::Belt));
        let equipment_x = belt_x - 2 * (SLOT_PX + SLOT_GAP_PX) - BAR_MARGIN_PX;
        let equipment = slot_row(equipment_x, bar_y, [SlotTarget::Backpack, SlotTarget::Utility]);

        let panels = modals
            .iter()
            .enumerate()
            .map(|(depth, kind)| {
                let x = PANEL_ORIGIN_PX + depth as i32 * PANEL_CASCADE_PX;
                let y = PANEL_ORIGIN_PX + depth as i32 * PANEL_CASCADE_PX;
                let content_x = x + SLOT_GAP_PX;
                let content_y = y + PANEL_HEADER_PX;
                let (slots, bottom) = panel_slots(kind, world, content_x, content_y);
                PanelRect {
                    kind,
                    rect: ScreenRect::new(x, y, panel_width(), bottom - y + SLOT_GAP_PX),
                    slots,
                }
            })
            .collect();

        Self {
            viewport,
            belt,
            equipment,
            panels,
        }
    }

    /// Topmost window under the pointer.
    pub fn panel_at(&self, point: Vec2) -> Option<&PanelRect> {
        self.panels.iter().rev().find(|panel| panel.rect.contains(point))
    }

    /// Slot under the pointer: the topmost window hides everything below it,
    /// then the equipment bar and the belt.
    pub fn slot_at(&self, point: Vec2) -> Option<&SlotRect> {
        if let Some(panel) = self.panel_at(point) {
            return panel.slots.iter().find(|slot| slot.rect.contains(point));
        }
        self.equipment
            .iter()
            .chain(&self.belt)
            .find(|slot| slot.rect.contains(point))
    }

    pub fn over_ui(&self, point: Vec2) -> bool {
        self.panel_at(point).is_some() || self.slot_at(point).is_some()
    }

    pub fn slot_rect(&self, target: &SlotTarget) -> Option<ScreenRect> {
        self.panels
            .iter()
            .rev()
            .flat_map(|panel| panel.slots.iter())
            .chain(&self.equipment)
            .chain(&self.belt)
            .find(|slot| slot.target == *target)
            .map(|slot| slot.rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::open_room;

    const VIEWPORT: Viewport = Viewport {
        width: 960,
        height: 640,
    };

    #[test]
    fn belt_sits_centered_at_the_bottom() {
        let world = open_room();
        let layout = HudLayout::build(VIEWPORT, &ModalStack::default(), &world);
        assert_eq!(layout.belt.len(), BELT_SLOTS);
        let first = layout.belt[0].rect;
        let last = layout.belt[BELT_SLOTS - 1].rect;
        assert_eq!(first.x + last.x + last.width, 960);
        assert_eq!(first.y + first.height + BAR_MARGIN_PX, 640);
        let hit = layout.slot_at(rect_center(layout.belt[2].rect));
        assert_eq!(hit.map(|slot| &slot.target), Some(&SlotTarget::Belt(2)));
    }

    #[test]
    fn top_window_hides_slots_below_it() {
        let world = open_room();
        let mut modals = ModalStack::default();
        modals.open(ModalKind::Inventory);
        modals.open(ModalKind::Status);
        let layout = HudLayout::build(VIEWPORT, &modals, &world);
        let inventory_slot = layout
            .slot_rect(&SlotTarget::Inventory(4))
            .expect("inventory slot");
        let center = rect_center(inventory_slot);
        assert_eq!(layout.panel_at(center).map(|panel| panel.kind), Some(ModalKind::Status));
        assert!(layout.slot_at(center).is_none());
        assert!(layout.over_ui(center));
    }
}
