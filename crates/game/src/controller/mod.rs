//! Turns input snapshots into world operations: keys, clicks, drag and
//! drop, the context menu and the window stack.

mod context_menu;
mod drag;
mod layout;
mod modal;

use engine::{screen_to_world_px, InputAction, InputSnapshot, Vec2, Viewport};
use tracing::debug;

use crate::error::InventoryError;
use crate::item::ItemId;
use crate::messages::MESSAGE_LOG_CAPACITY;
use crate::sim::{attack_toward, AttackOutcome};
use crate::world::{snap_to_tile, tile_center, GameState, GameWorld, SourceLocation};

pub use context_menu::{
    apply_option, options_for, ContextMenu, MenuOption, MenuSubject, MENU_ROW_PX, MENU_WIDTH_PX,
};
pub use drag::{shown_location, DragState, DropTarget};
pub use layout::{
    nearby_containers, nearby_ground, rect_center, HudLayout, PanelRect, SlotRect, SlotTarget,
    PANEL_HEADER_PX, SLOT_GAP_PX, SLOT_PX,
};
pub use modal::{auto_close_containers, container_in_reach, ModalKind, ModalStack};

pub const DEFAULT_VIEWPORT: Viewport = Viewport {
    width: 960,
    height: 640,
};
const MAP_CONTAINER_REACH_TILES: f32 = 2.0;

/// Window size from the snapshot, or a default before the first resize.
pub fn viewport_of(input: &InputSnapshot) -> Viewport {
    match input.window_size() {
        (0, _) | (_, 0) => DEFAULT_VIEWPORT,
        (width, height) => Viewport { width, height },
    }
}

#[derive(Debug, Default)]
pub struct Controller {
    pub modals: ModalStack,
    drag: DragState,
    menu: Option<ContextMenu>,
    cursor: Option<Vec2>,
    message_scroll: usize,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drag(&self) -> &DragState {
        &self.drag
    }

    /// Where the item in hand came from, while one is being dragged.
    pub fn held_source(&self) -> Option<&SourceLocation> {
        match &self.drag {
            DragState::Dragging { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    pub fn cursor(&self) -> Option<Vec2> {
        self.cursor
    }

    /// Messages hidden below the bottom of the messages window.
    pub fn message_scroll(&self) -> usize {
        self.message_scroll
    }

    pub fn layout(&self, world: &GameWorld, viewport: Viewport) -> HudLayout {
        HudLayout::build(viewport, &self.modals, world)
    }

    /// One frame of input. Pause and escape work in every state; the rest
    /// only while playing.
    pub fn update(&mut self, world: &mut GameWorld, input: &InputSnapshot) {
        self.cursor = input.cursor_position_px();
        if input.was_pressed(InputAction::Pause) {
            world.toggle_pause();
            debug!(state = ?world.state, "pause_toggled");
        }
        if input.was_pressed(InputAction::Escape) {
            self.escape(world);
        }
        if world.state != GameState::Playing {
            world.player.velocity = Vec2::ZERO;
            return;
        }
        self.handle_keys(world, input);
        self.handle_pointer(world, input);
        auto_close_containers(&mut self.modals, world);
    }

    fn escape(&mut self, world: &mut GameWorld) {
        if self.menu.take().is_some() {
            return;
        }
        if let DragState::Dragging { item, source, .. } = std::mem::take(&mut self.drag) {
            drag::bounce(world, &source, item);
            return;
        }
        self.modals.pop_top();
    }

    fn handle_keys(&mut self, world: &mut GameWorld, input: &InputSnapshot) {
        let axis = |negative, positive| {
            f32::from(u8::from(input.is_down(positive))) - f32::from(u8::from(input.is_down(negative)))
        };
        world.player.velocity = Vec2::new(
            axis(InputAction::MoveLeft, InputAction::MoveRight),
            axis(InputAction::MoveUp, InputAction::MoveDown),
        );

        for (slot, action) in InputAction::BELT.into_iter().enumerate() {
            if input.was_pressed(action) {
                let result = world_result(world.use_belt_slot(slot));
                report(world, result);
            }
        }
        if input.was_pressed(InputAction::Grab) {
            let into_backpack = world
                .player
                .backpack
                .as_ref()
                .is_some_and(|pack| self.modals.is_open(ModalKind::Container(pack.id)));
            let result = world.grab_nearest(into_backpack);
            report(world, result);
        }
        if input.was_pressed(InputAction::Reload) {
            let result = world.request_reload();
            report(world, result);
        }
        let toggles = [
            (InputAction::ToggleInventory, ModalKind::Inventory),
            (InputAction::ToggleStatus, ModalKind::Status),
            (InputAction::ToggleNearby, ModalKind::Nearby),
            (InputAction::ToggleMessages, ModalKind::Messages),
        ];
        for (action, kind) in toggles {
            if input.was_pressed(action) {
                self.modals.toggle(kind);
            }
        }
        if self.modals.is_open(ModalKind::Messages) && input.wheel_steps() != 0 {
            let scrolled = self.message_scroll as i64 + i64::from(input.wheel_steps());
            let max = world.messages.len().min(MESSAGE_LOG_CAPACITY) as i64;
            self.message_scroll = scrolled.clamp(0, max) as usize;
        }
    }

    fn handle_pointer(&mut self, world: &mut GameWorld, input: &InputSnapshot) {
        let Some(cursor) = input.cursor_position_px() else {
            return;
        };
        let viewport = viewport_of(input);
        if input.right_click_pressed() {
            let layout = self.layout(world, viewport);
            self.open_menu(world, &layout, cursor, viewport);
            return;
        }
        if input.left_click_pressed() {
            let layout = self.layout(world, viewport);
            self.left_press(world, &layout, cursor, viewport, input.shift_held());
        }
        if input.left_button_down() {
            self.drag_motion(world, cursor, input.ctrl_held());
        }
        if input.left_click_released() {
            let layout = self.layout(world, viewport);
            self.release(world, &layout, cursor, viewport);
        }
    }

    fn left_press(
        &mut self,
        world: &mut GameWorld,
        layout: &HudLayout,
        cursor: Vec2,
        viewport: Viewport,
        shift: bool,
    ) {
        if let Some(menu) = self.menu.take() {
            if let Some(option) = menu.option_at(cursor) {
                let result = apply_option(world, &mut self.modals, &menu.subject, option);
                report(world, result);
            }
            return;
        }
        if let DragState::Dragging { item, source, .. } = std::mem::take(&mut self.drag) {
            drag::bounce(world, &source, item);
        }

        if shift {
            if layout.over_ui(cursor) {
                return;
            }
            let target = screen_to_world_px(cursor, world.player.pos, viewport);
            match attack_toward(world, target) {
                Ok(AttackOutcome::Cooling) => {}
                Ok(outcome) => debug!(?outcome, "player_attack"),
                Err(error) => world.report(error),
            }
            return;
        }

        if let Some(slot) = layout.slot_at(cursor) {
            let source = slot.target.source();
            if world.item_at(&source).is_some() {
                let corner = Vec2::new(slot.rect.x as f32, slot.rect.y as f32);
                self.drag = DragState::Candidate {
                    source,
                    start: cursor,
                    offset: cursor - corner,
                };
            }
            return;
        }
        if layout.over_ui(cursor) {
            return;
        }
        let point = screen_to_world_px(cursor, world.player.pos, viewport);
        self.click_world(world, point);
    }

    fn drag_motion(&mut self, world: &mut GameWorld, cursor: Vec2, split: bool) {
        let DragState::Candidate {
            source,
            start,
            offset,
        } = &self.drag
        else {
            return;
        };
        if cursor.distance(*start) <= world.config.drag_threshold_px {
            return;
        }
        let (source, offset) = (source.clone(), *offset);
        self.drag = match drag::pick_up(world, &source, split) {
            Some((item, source)) => {
                debug!(item = %item.name, split = source.is_split(), "drag_started");
                DragState::Dragging {
                    item,
                    source,
                    offset,
                }
            }
            None => DragState::Idle,
        };
    }

    fn release(&mut self, world: &mut GameWorld, layout: &HudLayout, cursor: Vec2, viewport: Viewport) {
        match std::mem::take(&mut self.drag) {
            DragState::Idle => {}
            DragState::Candidate { source, .. } => {
                if let SourceLocation::Belt(slot) = source {
                    world.player.select_belt_slot(slot);
                }
            }
            DragState::Dragging { item, source, .. } => {
                let target = drop_target(world, layout, cursor, viewport);
                if let Err(item) = drag::place(world, item, &source, &target) {
                    drag::bounce(world, &source, item);
                }
            }
        }
    }

    /// Left click on the map: open a corpse or map container, or work a door.
    fn click_world(&mut self, world: &mut GameWorld, point: Vec2) {
        let tile_size = world.tile_size();
        let player = world.player.pos;
        let reach = world.config.interaction_radius_px();
        let tile = snap_to_tile(point, tile_size);

        let corpse = world
            .ground
            .iter()
            .find(|item| item.is_corpse() && item.rect(tile_size).contains_point(point))
            .map(|item| (item.id, item.pos));
        if let Some((id, pos)) = corpse {
            self.open_in_reach(world, id, pos.distance(player) <= reach);
            return;
        }
        let container = world
            .layer
            .containers()
            .iter()
            .find(|item| snap_to_tile(item.pos, tile_size) == tile)
            .map(|item| (item.id, item.pos));
        if let Some((id, pos)) = container {
            let in_reach = pos.distance(player) <= tile_size * MAP_CONTAINER_REACH_TILES;
            self.open_in_reach(world, id, in_reach);
            return;
        }
        if world.layer.door_state(tile.0, tile.1).is_some() {
            if tile_center(tile.0, tile.1, tile_size).distance(player) > reach {
                world.report(InventoryError::TooFar);
                return;
            }
            if let Err(error) = world.toggle_door_state(tile.0, tile.1) {
                world.report(error);
            }
        }
    }

    fn open_in_reach(&mut self, world: &mut GameWorld, id: ItemId, in_reach: bool) {
        if in_reach {
            self.modals.open(ModalKind::Container(id));
        } else {
            world.report(InventoryError::TooFar);
        }
    }

    /// Right click: the first item under the pointer, looking through open
    /// windows, then the ground, then map containers within two tiles.
    fn open_menu(&mut self, world: &GameWorld, layout: &HudLayout, cursor: Vec2, viewport: Viewport) {
        self.menu = None;
        if !self.drag.is_idle() {
            return;
        }
        if let Some(slot) = layout.slot_at(cursor) {
            self.menu = ContextMenu::for_slot(world, slot.target.source(), cursor);
            return;
        }
        if layout.over_ui(cursor) {
            return;
        }
        let point = screen_to_world_px(cursor, world.player.pos, viewport);
        let tile_size = world.tile_size();
        if let Some(index) = world
            .ground
            .iter()
            .position(|item| item.rect(tile_size).contains_point(point))
        {
            self.menu = ContextMenu::for_slot(world, SourceLocation::Ground(index), cursor);
            return;
        }
        let tile = snap_to_tile(point, tile_size);
        let reach = tile_size * MAP_CONTAINER_REACH_TILES;
        self.menu = world
            .layer
            .containers()
            .iter()
            .find(|item| {
                snap_to_tile(item.pos, tile_size) == tile && item.pos.distance(world.player.pos) <= reach
            })
            .map(|item| ContextMenu::for_world_container(item.id, cursor));
    }
}

fn drop_target(world: &GameWorld, layout: &HudLayout, cursor: Vec2, viewport: Viewport) -> DropTarget {
    if let Some(slot) = layout.slot_at(cursor) {
        return DropTarget::Slot(slot.target.clone());
    }
    match layout.panel_at(cursor) {
        Some(panel) if panel.kind == ModalKind::Nearby => DropTarget::NearbyFloor,
        Some(_) => DropTarget::Blocked,
        None if layout.over_ui(cursor) => DropTarget::Blocked,
        None => DropTarget::World(screen_to_world_px(cursor, world.player.pos, viewport)),
    }
}

/// Belt keys on an empty slot do nothing rather than complain.
fn world_result(result: Result<(), InventoryError>) -> Result<(), InventoryError> {
    match result {
        Err(InventoryError::NoItem) => Ok(()),
        other => other,
    }
}

fn report(world: &mut GameWorld, result: Result<(), InventoryError>) {
    if let Err(error) = result {
        world.report(error);
    }
}
