use engine::{ValueRange, Vec2};
use rand::Rng;
use tracing::{debug, info};

use crate::entity::{Projectile, Skill, StatKind, ZombieId};
use crate::error::InventoryError;
use crate::item::{sample_range, CorpseClock, Item, ItemAttrs, ItemKind};
use crate::world::{GameWorld, Obstacles, DROP_SEARCH_RADIUS};

/// Minimum gap between two player attacks.
pub const ATTACK_INTERVAL_MS: u64 = 300;
const MELEE_SWING_TICKS: u32 = 12;
const GUN_FLASH_TICKS: u32 = 6;
const UNARMED_DAMAGE: ValueRange = ValueRange::new(1.0, 3.0);
const STRENGTH_XP_PER_HIT: f32 = 1.0;
const MELEE_XP_PER_HIT: f32 = 2.0;
const RANGED_XP_PER_HIT: f32 = 2.0;
const WEAPON_WEAR_PER_USE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    /// Still inside the attack interval; nothing happened.
    Cooling,
    Fired { pellets: u32 },
    Hit { zombie: ZombieId, killed: bool },
    Missed,
}

/// Attacks toward a world point with the active weapon, or bare hands.
pub fn attack_toward(world: &mut GameWorld, target: Vec2) -> Result<AttackOutcome, InventoryError> {
    let now = world.now_ms();
    if world
        .player
        .last_attack_ms
        .is_some_and(|last| now.saturating_sub(last) < ATTACK_INTERVAL_MS)
    {
        return Ok(AttackOutcome::Cooling);
    }
    world.player.aim_angle = world.player.pos.angle_to(target);
    let ranged = world
        .player
        .active_weapon()
        .is_some_and(|weapon| weapon.kind() == ItemKind::WeaponRanged);
    let outcome = if ranged {
        fire(world)?
    } else {
        swing(world)?
    };
    world.player.last_attack_ms = Some(now);
    Ok(outcome)
}

fn fire(world: &mut GameWorld) -> Result<AttackOutcome, InventoryError> {
    if world.player.is_reloading() {
        return Err(InventoryError::AlreadyReloading);
    }
    let spread_multiplier = world.player.progression.spread_multiplier();
    let speed = world.config.projectile_speed;
    let origin = world.player.pos;
    let aim = world.player.aim_angle;
    let Some(weapon) = world.player.active_weapon_mut() else {
        return Err(InventoryError::NoAmmoWeapon);
    };
    if weapon.load.unwrap_or(0) == 0 {
        return Err(InventoryError::NoAmmo);
    }
    let firing = match &weapon.attrs {
        ItemAttrs::WeaponRanged(attrs) => attrs.firing,
        _ => return Err(InventoryError::NoAmmoWeapon),
    };
    weapon.load = weapon.load.map(|load| load - 1);
    let pellets = firing.pellets.max(1);
    let half_spread = (firing.spread_degrees * spread_multiplier).to_radians() * 0.5;

    let mut shots = Vec::with_capacity(pellets as usize);
    for _ in 0..pellets {
        let jitter = if half_spread > 0.0 {
            world.rng.random_range(-half_spread..=half_spread)
        } else {
            0.0
        };
        let damage = weapon.roll_damage(&mut world.rng);
        shots.push(Projectile::new(origin, aim + jitter, speed, damage));
    }
    let broke = weapon.wear(WEAPON_WEAR_PER_USE);
    let name = weapon.name.clone();
    world.projectiles.extend(shots);
    world.player.gun_flash_ticks = GUN_FLASH_TICKS;
    if broke {
        break_active_weapon(world, &name);
    }
    debug!(weapon = %name, pellets, "weapon_fired");
    Ok(AttackOutcome::Fired { pellets })
}

fn swing(world: &mut GameWorld) -> Result<AttackOutcome, InventoryError> {
    let progression = &world.player.progression;
    let cost = world.config.melee_stamina_cost * progression.melee_stamina_multiplier();
    let multiplier = progression.melee_damage_multiplier();
    if world.player.stats.get(StatKind::Stamina) < cost {
        return Err(InventoryError::NoStamina);
    }
    world.player.stats.add(StatKind::Stamina, -cost);
    world.player.melee_swing_ticks = MELEE_SWING_TICKS;

    let tile_size = world.config.tile_size;
    let ahead = Vec2::from_angle(world.player.aim_angle) * (tile_size * 0.75);
    let reach = world
        .player
        .rect()
        .translated(ahead.x, ahead.y)
        .inflate(tile_size * 0.25, tile_size * 0.25);
    let Some(index) = world
        .zombies
        .iter()
        .position(|zombie| zombie.rect().intersects(&reach))
    else {
        return Ok(AttackOutcome::Missed);
    };

    let (base, broke, name) = match world.player.active_weapon_mut() {
        Some(weapon) => {
            let base = weapon.roll_damage(&mut world.rng) as f32;
            let broke = weapon.wear(WEAPON_WEAR_PER_USE);
            (base, broke, Some(weapon.name.clone()))
        }
        None => (sample_range(&mut world.rng, UNARMED_DAMAGE).round(), false, None),
    };
    let damage = base * multiplier;
    let zombie = &mut world.zombies[index];
    let zombie_id = zombie.id;
    let killed = zombie.take_damage(damage);
    debug!(zombie = zombie_id.0, damage, killed, "melee_hit");

    let progression = &mut world.player.progression;
    progression.add_xp(Skill::Strength, STRENGTH_XP_PER_HIT);
    progression.add_xp(Skill::Melee, MELEE_XP_PER_HIT);
    if killed {
        kill_zombie(world, index, Skill::Melee);
    }
    if let (true, Some(name)) = (broke, name) {
        break_active_weapon(world, &name);
    }
    Ok(AttackOutcome::Hit {
        zombie: zombie_id,
        killed,
    })
}

fn break_active_weapon(world: &mut GameWorld, name: &str) {
    if let Some(slot) = world.player.active_weapon_slot() {
        world.player.belt[slot] = None;
    }
    world.player.validate_active_weapon();
    info!(weapon = name, "weapon_broke");
    world.notify(format!("Your {name} broke."));
}

/// Moves projectiles and resolves their first hit. Terrain, the map edge
/// and zombies all stop a projectile.
pub(super) fn update_projectiles(world: &mut GameWorld) {
    let bounds = world.layer.bounds();
    let projectiles = std::mem::take(&mut world.projectiles);
    let mut flying = Vec::with_capacity(projectiles.len());
    for mut projectile in projectiles {
        projectile.advance();
        let rect = projectile.rect();
        if !bounds.contains_point(projectile.pos) || world.layer.blocks(&rect) {
            continue;
        }
        let hit = world
            .zombies
            .iter()
            .position(|zombie| zombie.rect().intersects(&rect));
        let Some(index) = hit else {
            flying.push(projectile);
            continue;
        };
        let killed = world.zombies[index].take_damage(projectile.damage as f32);
        world
            .player
            .progression
            .add_xp(Skill::Ranged, RANGED_XP_PER_HIT);
        if killed {
            kill_zombie(world, index, Skill::Ranged);
        }
    }
    world.projectiles = flying;
}

/// Replaces a dead zombie with a corpse holding its loot and clothes. The
/// zombie's xp goes to the skill that made the kill.
pub fn kill_zombie(world: &mut GameWorld, index: usize, skill: Skill) {
    if index >= world.zombies.len() {
        return;
    }
    let mut zombie = world.zombies.remove(index);
    world.player.progression.add_xp(skill, zombie.xp_value);
    let contents = zombie.take_remains();
    let now = world.now_ms();
    let clock = CorpseClock {
        spawned_ms: now,
        decay_ms: world.config.corpse_decay_ms,
    };
    let pos = world
        .free_tile_near(zombie.pos, DROP_SEARCH_RADIUS)
        .unwrap_or(zombie.pos);
    let id = world.ids.allocate();
    let corpse = Item::corpse(id, format!("Corpse of {}", zombie.profile.name), contents, clock)
        .with_pos(pos);
    info!(
        zombie = zombie.id.0,
        name = %zombie.profile.name,
        items = corpse.slots_used(),
        "zombie_died"
    );
    world.ground.push(corpse);
}
