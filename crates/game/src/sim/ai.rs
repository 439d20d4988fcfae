use engine::Vec2;
use rand::Rng;
use tracing::debug;

use crate::entity::{StatKind, ZombieState};
use crate::item::sample_range;
use crate::world::{GameWorld, Obstacles};

const WANDER_BOX_TILES: f32 = 2.5;
const CHASE_STOP_FACTOR: f32 = 0.9;
const ZOMBIE_SWING_TICKS: u32 = 10;

pub(super) fn update_zombies(world: &mut GameWorld) {
    for index in 0..world.zombies.len() {
        let target = choose_target(world, index);
        if let Some((target, stop_distance)) = target {
            step_toward(world, index, target, stop_distance);
        }
        try_attack(world, index);
        let zombie = &mut world.zombies[index];
        zombie.swing_ticks = zombie.swing_ticks.saturating_sub(1);
    }
}

/// Chase a visible player inside the detection radius, otherwise wander
/// toward a random point near the zombie.
fn choose_target(world: &mut GameWorld, index: usize) -> Option<(Vec2, f32)> {
    let now = world.now_ms();
    let tile_size = world.config.tile_size;
    let detection = world.config.zombie_detection_radius_tiles * tile_size;
    let player_pos = world.player.pos;
    let zombie_pos = world.zombies[index].pos;
    let distance = zombie_pos.distance(player_pos);
    let sees_player = distance < detection && world.line_of_sight(zombie_pos, player_pos);

    if sees_player {
        let zombie = &mut world.zombies[index];
        if zombie.state != ZombieState::Chasing {
            debug!(zombie = zombie.id.0, distance, "zombie_chasing");
        }
        zombie.state = ZombieState::Chasing;
        return Some((player_pos, zombie.attack_range * CHASE_STOP_FACTOR));
    }

    let interval = world.config.zombie_wander_interval_ms;
    let zombie = &world.zombies[index];
    let reached = zombie
        .wander_target
        .map_or(true, |target| target.distance(zombie_pos) <= tile_size * 0.5);
    let stale = now.saturating_sub(zombie.last_wander_change_ms) >= interval;
    let needs_target = zombie.state == ZombieState::Chasing || reached || stale;

    if needs_target {
        let reach = WANDER_BOX_TILES * tile_size;
        let dx = world.rng.random_range(-reach..=reach);
        let dy = world.rng.random_range(-reach..=reach);
        let zombie = &mut world.zombies[index];
        zombie.wander_target = Some(Vec2::new(zombie_pos.x + dx, zombie_pos.y + dy));
        zombie.last_wander_change_ms = now;
    }
    let zombie = &mut world.zombies[index];
    zombie.state = ZombieState::Wandering;
    zombie.wander_target.map(|target| (target, tile_size * 0.5))
}

/// Axis-separated step; an axis that would hit terrain, another zombie or
/// the player is reverted.
fn step_toward(world: &mut GameWorld, index: usize, target: Vec2, stop_distance: f32) {
    let zombie = &world.zombies[index];
    let offset = target - zombie.pos;
    if offset.length() <= stop_distance {
        return;
    }
    let step = offset.normalized() * zombie.speed.min(offset.length() - stop_distance);
    let mut pos = zombie.pos;

    let candidate = Vec2::new(pos.x + step.x, pos.y);
    if is_clear(world, index, candidate) {
        pos = candidate;
    }
    let candidate = Vec2::new(pos.x, pos.y + step.y);
    if is_clear(world, index, candidate) {
        pos = candidate;
    }
    world.zombies[index].pos = pos;
}

fn is_clear(world: &GameWorld, index: usize, pos: Vec2) -> bool {
    let rect = world.zombies[index].rect_at(pos);
    if world.layer.blocks(&rect) || rect.intersects(&world.player.rect()) {
        return false;
    }
    !world
        .zombies
        .iter()
        .enumerate()
        .any(|(other, zombie)| other != index && zombie.rect().intersects(&rect))
}

fn try_attack(world: &mut GameWorld, index: usize) {
    let now = world.now_ms();
    let cooldown = world.config.zombie_attack_cooldown_ms;
    let player_pos = world.player.pos;
    let zombie = &world.zombies[index];
    if zombie.pos.distance(player_pos) > zombie.attack_range || !zombie.can_attack(now, cooldown) {
        return;
    }
    let damage = sample_range(&mut world.rng, zombie.damage);
    let infection = sample_range(&mut world.rng, zombie.infection);
    let hit = world.player.apply_hit(damage, infection, &mut world.rng);

    let zombie = &mut world.zombies[index];
    zombie.last_attack_ms = Some(now);
    zombie.swing_ticks = ZOMBIE_SWING_TICKS;
    zombie.swing_angle = zombie.pos.angle_to(player_pos);
    debug!(
        zombie = zombie.id.0,
        damage = hit.damage,
        infection = hit.infection,
        health = world.player.stats.get(StatKind::Health),
        "zombie_attack"
    );
    if let Some(slot) = hit.broken_cloth {
        world.notify(format!("Your {} gear fell apart.", slot.as_str()));
    }
}
