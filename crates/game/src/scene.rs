//! The engine-facing scene: feeds input to the controller, runs the
//! simulation tick and turns the world into a draw list.

use std::time::Duration;

use engine::{
    world_to_screen_px, DrawList, InputAction, InputSnapshot, Scene, SceneCommand, ScreenRect,
    TileDef, TileKind, Vec2, Viewport,
};
use tracing::{info, warn};

use crate::controller::{
    shown_location, Controller, ContextMenu, HudLayout, ModalKind, PanelRect, SlotRect,
    SlotTarget, PANEL_HEADER_PX, SLOT_PX,
};
use crate::daynight::{visibility_alpha, DayPhase};
use crate::entity::{Skill, StatKind, ZombieState};
use crate::error::WorldLoadError;
use crate::geometry::Rect;
use crate::item::Item;
use crate::world::{DoorState, GameState, GameWorld, SourceLocation};

const CLEAR_COLOR: [u8; 4] = [8, 8, 12, 255];
const FLOOR_COLOR: [u8; 3] = [62, 66, 54];
const WALL_COLOR: [u8; 3] = [96, 92, 88];
const CONTAINER_COLOR: [u8; 3] = [120, 84, 48];
const TELEPORT_COLOR: [u8; 3] = [110, 70, 150];
const DOOR_OPEN_COLOR: [u8; 3] = [92, 70, 40];
const DOOR_CLOSED_COLOR: [u8; 3] = [140, 100, 52];
const CORPSE_COLOR: [u8; 3] = [110, 30, 30];
const ZOMBIE_COLOR: [u8; 3] = [88, 140, 72];
const CHASING_COLOR: [u8; 3] = [150, 170, 60];
const PLAYER_COLOR: [u8; 4] = [70, 130, 220, 255];
const PROJECTILE_COLOR: [u8; 4] = [250, 230, 120, 255];
const HOVER_COLOR: [u8; 4] = [255, 255, 255, 40];

const PANEL_COLOR: [u8; 4] = [24, 26, 32, 230];
const HEADER_COLOR: [u8; 4] = [48, 52, 64, 255];
const SLOT_COLOR: [u8; 4] = [40, 42, 50, 255];
const ACTIVE_SLOT_COLOR: [u8; 4] = [180, 160, 60, 255];
const TEXT_COLOR: [u8; 4] = [200, 200, 200, 255];
const BAR_BACK_COLOR: [u8; 4] = [30, 30, 30, 200];
const MENU_COLOR: [u8; 4] = [36, 38, 46, 245];
const MENU_ROW_ALT_COLOR: [u8; 4] = [44, 46, 56, 245];

const HUD_BAR_WIDTH: i32 = 160;
const HUD_BAR_HEIGHT: i32 = 8;
const HUD_MARGIN: i32 = 12;
const GLYPH_PX: i32 = 6;
const LINE_PX: i32 = 12;
const SLOT_INSET: i32 = 4;
const GHOST_ALPHA: u8 = 180;

const HUD_STATS: [(StatKind, [u8; 3]); 5] = [
    (StatKind::Health, [200, 50, 50]),
    (StatKind::Water, [60, 130, 220]),
    (StatKind::Food, [200, 150, 60]),
    (StatKind::Stamina, [90, 190, 90]),
    (StatKind::Infection, [150, 60, 170]),
];

/// Builds a fresh world when a finished game restarts.
pub type WorldFactory = Box<dyn FnMut() -> Result<GameWorld, WorldLoadError>>;

pub struct BitRotScene {
    world: GameWorld,
    controller: Controller,
    simulation: crate::sim::Simulation,
    restart: Option<WorldFactory>,
}

impl BitRotScene {
    pub fn new(world: GameWorld) -> Self {
        Self {
            world,
            controller: Controller::new(),
            simulation: crate::sim::Simulation::new(),
            restart: None,
        }
    }

    pub fn with_restart(mut self, factory: WorldFactory) -> Self {
        self.restart = Some(factory);
        self
    }

    pub fn world(&self) -> &GameWorld {
        &self.world
    }

    fn restart(&mut self) {
        let Some(factory) = self.restart.as_mut() else {
            return;
        };
        match factory() {
            Ok(world) => {
                self.world = world;
                self.controller = Controller::new();
                info!("game_restarted");
            }
            Err(error) => warn!(error = %error, "restart_failed"),
        }
    }
}

impl Scene for BitRotScene {
    fn load(&mut self) {
        info!(
            layer = self.world.current_layer(),
            zombies = self.world.zombies.len(),
            "scene_loaded"
        );
    }

    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if input.quit_requested() {
            return SceneCommand::Quit;
        }
        if self.world.is_game_over() {
            if input.was_pressed(InputAction::Escape) {
                self.restart();
            }
            return SceneCommand::None;
        }
        self.controller.update(&mut self.world, input);
        let dt = Duration::from_secs_f32(fixed_dt_seconds.max(0.0));
        self.simulation.tick(&mut self.world, dt);
        SceneCommand::None
    }

    fn render(&mut self, viewport: Viewport, out: &mut DrawList) {
        out.clear(CLEAR_COLOR);
        let mut painter = WorldPainter {
            out: &mut *out,
            camera: self.world.player.pos,
            viewport,
            view_radius: self.world.view_radius_px(),
            ambient: self.world.day_night.ambient_light(),
        };
        painter.tiles(&self.world);
        painter.ground_items(&self.world);
        painter.zombies(&self.world);
        painter.projectiles(&self.world);
        painter.player(&self.world);

        let layout = self.controller.layout(&self.world, viewport);
        draw_stat_bars(out, &self.world);
        let held = self.controller.held_source();
        draw_slots(out, &self.world, held, &layout.equipment);
        draw_slots(out, &self.world, held, &layout.belt);
        for panel in &layout.panels {
            draw_panel(out, &self.world, &self.controller, panel);
        }
        draw_latest_message(out, &self.world, &layout);
        if let Some((item, offset)) = self.controller.drag().dragged() {
            if let Some(cursor) = self.controller.cursor() {
                draw_ghost(out, item, cursor - offset);
            }
        }
        if let Some(menu) = self.controller.menu() {
            draw_menu(out, menu);
        }
        draw_state_overlay(out, self.world.state, viewport);
    }

    fn unload(&mut self) {
        info!(messages = self.world.messages.len(), "scene_unloaded");
    }

    fn debug_title(&self) -> Option<String> {
        let phase = match self.world.day_night.phase() {
            DayPhase::Day => "day",
            DayPhase::TransitionToNight => "dusk",
            DayPhase::Night => "night",
            DayPhase::TransitionToDay => "dawn",
        };
        Some(format!(
            "Bit Rot | L{} chunk {} | {} | zombies {}",
            self.world.current_layer(),
            self.world.layer.chunk_id(),
            phase,
            self.world.zombies.len()
        ))
    }
}

fn shade(rgb: [u8; 3], ambient: u8, alpha: u8) -> [u8; 4] {
    let scale = |channel: u8| (u16::from(channel) * u16::from(ambient) / 255) as u8;
    [scale(rgb[0]), scale(rgb[1]), scale(rgb[2]), alpha]
}

fn tile_color(def: &TileDef, door: Option<DoorState>) -> [u8; 3] {
    match (def.kind, door) {
        (_, Some(DoorState::Open)) => DOOR_OPEN_COLOR,
        (_, Some(DoorState::Closed)) => DOOR_CLOSED_COLOR,
        (TileKind::Container, None) => CONTAINER_COLOR,
        (TileKind::Teleport(_), None) => TELEPORT_COLOR,
        (TileKind::Plain, None) if def.is_obstacle => WALL_COLOR,
        (TileKind::Plain, None) => FLOOR_COLOR,
    }
}

/// Draws world-space rectangles faded by distance from the player.
struct WorldPainter<'a> {
    out: &'a mut DrawList,
    camera: Vec2,
    viewport: Viewport,
    view_radius: f32,
    ambient: u8,
}

impl WorldPainter<'_> {
    fn screen_rect(&self, rect: Rect) -> ScreenRect {
        let top_left = world_to_screen_px(Vec2::new(rect.x, rect.y), self.camera, self.viewport);
        ScreenRect::new(
            top_left.x.round() as i32,
            top_left.y.round() as i32,
            rect.w.round() as i32,
            rect.h.round() as i32,
        )
    }

    fn faded(&mut self, rect: Rect, rgb: [u8; 3]) {
        let distance = rect.center().distance(self.camera);
        if let Some(alpha) = visibility_alpha(distance, self.view_radius) {
            let screen = self.screen_rect(rect);
            self.out.push_rect(screen, shade(rgb, self.ambient, alpha));
        }
    }

    fn tiles(&mut self, world: &GameWorld) {
        let tile_size = world.tile_size();
        let reach = (self.view_radius / tile_size).ceil() as i32 + 1;
        let center_x = (self.camera.x / tile_size).floor() as i32;
        let center_y = (self.camera.y / tile_size).floor() as i32;
        let max_x = world.layer.width() as i32 - 1;
        let max_y = world.layer.height() as i32 - 1;
        for grid_y in (center_y - reach).max(0)..=(center_y + reach).min(max_y) {
            for grid_x in (center_x - reach).max(0)..=(center_x + reach).min(max_x) {
                let Some(def) = world.layer.get_tile_at(grid_x, grid_y) else {
                    continue;
                };
                let color = tile_color(def, world.layer.door_state(grid_x, grid_y));
                self.faded(Rect::tile(grid_x, grid_y, tile_size), color);
            }
        }
        if let Some((grid_x, grid_y)) = world.hover_tile {
            let screen = self.screen_rect(Rect::tile(grid_x, grid_y, tile_size));
            self.out.push_rect(screen, HOVER_COLOR);
        }
    }

    fn ground_items(&mut self, world: &GameWorld) {
        let tile_size = world.tile_size();
        for item in &world.ground {
            let color = if item.is_corpse() { CORPSE_COLOR } else { item.color };
            self.faded(item.rect(tile_size).inflate(-tile_size * 0.2, -tile_size * 0.2), color);
        }
    }

    fn zombies(&mut self, world: &GameWorld) {
        for zombie in &world.zombies {
            let color = match zombie.state {
                ZombieState::Chasing => CHASING_COLOR,
                ZombieState::Wandering => ZOMBIE_COLOR,
            };
            let rect = zombie.rect();
            self.faded(rect, color);
            if zombie.health < zombie.max_health {
                let fraction = (zombie.health / zombie.max_health).clamp(0.0, 1.0);
                let bar = Rect::new(rect.x, rect.y - 5.0, rect.w * fraction, 3.0);
                self.faded(bar, [200, 40, 40]);
            }
        }
    }

    fn projectiles(&mut self, world: &GameWorld) {
        for projectile in &world.projectiles {
            let screen = self.screen_rect(projectile.rect());
            self.out.push_rect(screen, PROJECTILE_COLOR);
        }
    }

    fn player(&mut self, world: &GameWorld) {
        let player = &world.player;
        let screen = self.screen_rect(player.rect());
        self.out.push_rect(screen, PLAYER_COLOR);
        if player.melee_swing_ticks > 0 || player.gun_flash_ticks > 0 {
            let tip = player.pos + Vec2::from_angle(player.aim_angle) * player.size;
            let flash = self.screen_rect(Rect::from_center(tip, 6.0, 6.0));
            self.out.push_rect(flash, [255, 220, 140, 220]);
        }
    }
}

fn draw_bar(out: &mut DrawList, x: i32, y: i32, width: i32, fraction: f32, rgb: [u8; 3]) {
    out.push_rect(ScreenRect::new(x, y, width, HUD_BAR_HEIGHT), BAR_BACK_COLOR);
    let filled = (width as f32 * fraction.clamp(0.0, 1.0)).round() as i32;
    out.push_rect(
        ScreenRect::new(x, y, filled, HUD_BAR_HEIGHT),
        [rgb[0], rgb[1], rgb[2], 255],
    );
}

/// Text stands in as a bar one glyph wide per character.
fn draw_text_line(out: &mut DrawList, x: i32, y: i32, text: &str, max_width: i32) {
    let width = (text.chars().count() as i32 * GLYPH_PX).min(max_width);
    out.push_rect(ScreenRect::new(x, y + 3, width, LINE_PX - 6), TEXT_COLOR);
}

fn draw_stat_bars(out: &mut DrawList, world: &GameWorld) {
    let stats = &world.player.stats;
    for (row, (kind, rgb)) in HUD_STATS.iter().enumerate() {
        let max = stats.max(*kind);
        let fraction = if max > 0.0 { stats.get(*kind) / max } else { 0.0 };
        let y = HUD_MARGIN + row as i32 * (HUD_BAR_HEIGHT + 4);
        draw_bar(out, HUD_MARGIN, y, HUD_BAR_WIDTH, fraction, *rgb);
    }
}

fn draw_item_swatch(out: &mut DrawList, item: &Item, rect: ScreenRect, alpha: u8) {
    let inner = ScreenRect::new(
        rect.x + SLOT_INSET,
        rect.y + SLOT_INSET,
        rect.width - SLOT_INSET * 2,
        rect.height - SLOT_INSET * 2,
    );
    let [r, g, b] = if item.is_corpse() { CORPSE_COLOR } else { item.color };
    out.push_rect(inner, [r, g, b, alpha]);

    let bar_width = inner.width;
    if let (Some(load), Some(capacity)) = (item.load, item.capacity) {
        if capacity > 0 {
            let filled = (bar_width as f32 * load as f32 / capacity as f32).round() as i32;
            out.push_rect(
                ScreenRect::new(inner.x, inner.y + inner.height - 3, filled.min(bar_width), 3),
                [240, 240, 240, alpha],
            );
        }
    }
    if let Some(fraction) = item.durability_fraction() {
        let filled = (bar_width as f32 * fraction.clamp(0.0, 1.0)).round() as i32;
        out.push_rect(
            ScreenRect::new(inner.x, inner.y, filled, 3),
            [90, 200, 90, alpha],
        );
    }
}

fn draw_slots(
    out: &mut DrawList,
    world: &GameWorld,
    held: Option<&SourceLocation>,
    slots: &[SlotRect],
) {
    let active = world.player.active_weapon_slot();
    for slot in slots {
        let color = match slot.target {
            SlotTarget::Belt(index) if Some(index) == active => ACTIVE_SLOT_COLOR,
            _ => SLOT_COLOR,
        };
        out.push_rect(slot.rect, color);
        let shown = shown_location(held, &slot.target);
        if let Some(item) = shown.and_then(|location| world.item_at(&location)) {
            draw_item_swatch(out, item, slot.rect, 255);
        }
    }
}

fn draw_panel(out: &mut DrawList, world: &GameWorld, controller: &Controller, panel: &PanelRect) {
    let rect = panel.rect;
    out.push_rect(rect, PANEL_COLOR);
    out.push_rect(
        ScreenRect::new(rect.x, rect.y, rect.width, PANEL_HEADER_PX),
        HEADER_COLOR,
    );
    draw_text_line(out, rect.x + 6, rect.y + 4, panel.kind.title(), rect.width - 12);

    let body_y = rect.y + PANEL_HEADER_PX + 4;
    match panel.kind {
        ModalKind::Status => draw_status_body(out, world, rect.x + 8, body_y, rect.width - 16),
        ModalKind::Messages => {
            let rows = ((rect.height - PANEL_HEADER_PX - 8) / LINE_PX).max(0) as usize;
            let shown: Vec<_> = world
                .messages
                .iter()
                .rev()
                .skip(controller.message_scroll())
                .take(rows)
                .collect();
            for (line, message) in shown.iter().rev().enumerate() {
                let y = body_y + line as i32 * LINE_PX;
                draw_text_line(out, rect.x + 8, y, &message.text, rect.width - 16);
            }
        }
        ModalKind::Inventory | ModalKind::Nearby | ModalKind::Container(_) => {
            draw_slots(out, world, controller.held_source(), &panel.slots)
        }
    }
}

fn draw_status_body(out: &mut DrawList, world: &GameWorld, x: i32, y: i32, width: i32) {
    let stats = &world.player.stats;
    let mut row_y = y;
    for kind in StatKind::ALL {
        let max = stats.max(kind);
        let fraction = if max > 0.0 { stats.get(kind) / max } else { 0.0 };
        draw_bar(out, x, row_y, width, fraction, [170, 170, 190]);
        row_y += HUD_BAR_HEIGHT + 4;
    }
    let progression = &world.player.progression;
    for skill in [Skill::Strength, Skill::Fitness, Skill::Melee, Skill::Ranged] {
        let level = progression.skill(skill).level as i32;
        for pip in 0..level {
            out.push_rect(
                ScreenRect::new(x + pip * 8, row_y, 6, 6),
                [220, 200, 90, 255],
            );
        }
        row_y += 10;
    }
}

fn draw_latest_message(out: &mut DrawList, world: &GameWorld, layout: &HudLayout) {
    let Some(message) = world.messages.latest() else {
        return;
    };
    let Some(first_belt) = layout.belt.first() else {
        return;
    };
    let y = first_belt.rect.y - LINE_PX - 6;
    draw_text_line(
        out,
        first_belt.rect.x,
        y,
        &message.text,
        layout.viewport.width as i32,
    );
}

fn draw_ghost(out: &mut DrawList, item: &Item, top_left: Vec2) {
    let rect = ScreenRect::new(top_left.x as i32, top_left.y as i32, SLOT_PX, SLOT_PX);
    draw_item_swatch(out, item, rect, GHOST_ALPHA);
}

fn draw_menu(out: &mut DrawList, menu: &ContextMenu) {
    out.push_rect(menu.rect(), MENU_COLOR);
    for (row, option) in menu.options.iter().enumerate() {
        let rect = menu.option_rect(row);
        if row % 2 == 1 {
            out.push_rect(rect, MENU_ROW_ALT_COLOR);
        }
        draw_text_line(out, rect.x + 6, rect.y + 3, option.label(), rect.width - 12);
    }
}

fn draw_state_overlay(out: &mut DrawList, state: GameState, viewport: Viewport) {
    let color = match state {
        GameState::Playing => return,
        GameState::Paused => [0, 0, 0, 120],
        GameState::GameOver => [90, 0, 0, 150],
    };
    out.push_rect(
        ScreenRect::new(0, 0, viewport.width as i32, viewport.height as i32),
        color,
    );
}
