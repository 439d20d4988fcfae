//! Fixed-order simulation tick over a [`GameWorld`].

mod ai;
mod combat;
mod physiology;

use std::time::Duration;

use engine::{EdgeDirection, Vec2};

use crate::entity::{Facing, Skill};
use crate::world::{snap_to_tile, GameState, GameWorld, Obstacles};

pub use combat::{attack_toward, kill_zombie, AttackOutcome, ATTACK_INTERVAL_MS};

const FITNESS_XP_PER_TILE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimStep {
    PlayerMovement,
    Teleport,
    HoverTile,
    Respawn,
    Physiology,
    Projectiles,
    ZombieAi,
    CorpseExpiry,
}

impl SimStep {
    pub fn name(self) -> &'static str {
        match self {
            Self::PlayerMovement => "PlayerMovement",
            Self::Teleport => "Teleport",
            Self::HoverTile => "HoverTile",
            Self::Respawn => "Respawn",
            Self::Physiology => "Physiology",
            Self::Projectiles => "Projectiles",
            Self::ZombieAi => "ZombieAi",
            Self::CorpseExpiry => "CorpseExpiry",
        }
    }
}

pub const TICK_ORDER: [SimStep; 8] = [
    SimStep::PlayerMovement,
    SimStep::Teleport,
    SimStep::HoverTile,
    SimStep::Respawn,
    SimStep::Physiology,
    SimStep::Projectiles,
    SimStep::ZombieAi,
    SimStep::CorpseExpiry,
];

#[derive(Debug, Default)]
pub struct Simulation {
    last_tick_order: Vec<SimStep>,
}

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps that ran during the last tick, in order.
    pub fn last_tick_order(&self) -> &[SimStep] {
        &self.last_tick_order
    }

    /// Advances the clock and runs every step once. Paused and finished
    /// games do not tick, so their clock stands still.
    pub fn tick(&mut self, world: &mut GameWorld, dt: Duration) {
        self.last_tick_order.clear();
        if world.state != GameState::Playing {
            return;
        }
        world.clock.advance_tick(dt);
        let now = world.now_ms();
        world.day_night.update(now);

        for step in TICK_ORDER {
            if world.state != GameState::Playing {
                break;
            }
            self.last_tick_order.push(step);
            run_step(step, world);
        }
    }
}

fn run_step(step: SimStep, world: &mut GameWorld) {
    match step {
        SimStep::PlayerMovement => move_player(world),
        SimStep::Teleport => {
            world.check_teleport();
        }
        SimStep::HoverTile => update_hover_tile(world),
        SimStep::Respawn => {
            world.respawn_check();
        }
        SimStep::Physiology => physiology::update(world),
        SimStep::Projectiles => combat::update_projectiles(world),
        SimStep::ZombieAi => ai::update_zombies(world),
        SimStep::CorpseExpiry => expire_corpses(world),
    }
}

fn facing_for(step: Vec2) -> Facing {
    if step.x.abs() > step.y.abs() {
        if step.x > 0.0 {
            Facing::Right
        } else {
            Facing::Left
        }
    } else if step.y > 0.0 {
        Facing::Down
    } else {
        Facing::Up
    }
}

/// Map edge the player's rect would cross by moving `step`, if any.
fn edge_crossed(world: &GameWorld, step: Vec2) -> Option<EdgeDirection> {
    let bounds = world.layer.bounds();
    let rect = world.player.rect().translated(step.x, step.y);
    if step.x < 0.0 && rect.x < bounds.x {
        Some(EdgeDirection::Left)
    } else if step.x > 0.0 && rect.right() > bounds.right() {
        Some(EdgeDirection::Right)
    } else if step.y < 0.0 && rect.y < bounds.y {
        Some(EdgeDirection::Top)
    } else if step.y > 0.0 && rect.bottom() > bounds.bottom() {
        Some(EdgeDirection::Bottom)
    } else {
        None
    }
}

/// Axis-separated move; a blocked axis keeps its old coordinate. Walking
/// off a per-chunk layer hands over to the neighbouring chunk.
fn move_player(world: &mut GameWorld) {
    let direction = world.player.velocity.normalized();
    if direction == Vec2::ZERO {
        return;
    }
    let speed = world.player.move_speed(world.config.player_speed);
    let step = direction * speed;
    world.player.facing = facing_for(step);

    let start = world.player.pos;
    if !world.layer.is_giant() {
        if let Some(edge) = edge_crossed(world, step) {
            if world.try_edge_transition(edge) {
                return;
            }
        }
    }

    let rect = world.player.rect();
    let mut pos = start;
    let moved_x = rect.with_center(Vec2::new(pos.x + step.x, pos.y));
    if !world.layer.blocks(&moved_x) {
        pos.x += step.x;
    }
    let moved_y = rect.with_center(Vec2::new(pos.x, pos.y + step.y));
    if !world.layer.blocks(&moved_y) {
        pos.y += step.y;
    }
    let bounds = world.layer.bounds();
    let half = world.player.size * 0.5;
    pos.x = pos.x.clamp(bounds.x + half, (bounds.right() - half).max(bounds.x + half));
    pos.y = pos.y.clamp(bounds.y + half, (bounds.bottom() - half).max(bounds.y + half));
    world.player.pos = pos;

    let tile_size = world.config.tile_size;
    world.player.walked_px += start.distance(pos);
    while world.player.walked_px >= tile_size {
        world.player.walked_px -= tile_size;
        world.player.progression.add_xp(Skill::Fitness, FITNESS_XP_PER_TILE);
    }
}

fn update_hover_tile(world: &mut GameWorld) {
    let (x, y) = snap_to_tile(world.player.pos, world.config.tile_size);
    let (dx, dy) = world.player.facing.grid_offset();
    world.hover_tile = Some((x + dx, y + dy));
}

fn expire_corpses(world: &mut GameWorld) {
    let now = world.now_ms();
    if world.config.spill_corpses_on_decay {
        let expired = world
            .ground
            .iter()
            .enumerate()
            .filter(|(_, item)| item.corpse.is_some_and(|clock| clock.is_expired(now)))
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        for index in expired {
            world.spill_contents(index);
        }
    }
    let before = world.ground.len();
    world
        .ground
        .retain(|item| !item.corpse.is_some_and(|clock| clock.is_expired(now)));
    let removed = before - world.ground.len();
    if removed > 0 {
        tracing::debug!(removed, "corpses_decayed");
    }
}
