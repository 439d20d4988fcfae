use tracing::{debug, info};

use crate::entity::{StatKind, ZombieState};
use crate::item::StatusEffect;
use crate::world::{GameState, GameWorld, SourceLocation};

const AUTO_DRINK_INTERVAL_MS: u64 = 1_000;
const EXHAUSTED_TIRENESS: f32 = 90.0;
const BASE_MAX_STAMINA: f32 = 100.0;

/// Stats, timers and cooldowns. Per-second rates are scaled by the game
/// time elapsed since the previous update.
pub(super) fn update(world: &mut GameWorld) {
    let now = world.now_ms();
    let seconds = now.saturating_sub(world.last_decay_ms()) as f32 / 1000.0;
    world.set_last_decay_ms(now);
    decay_stats(world, seconds);
    auto_drink(world, now);
    advance_reload(world);
    drain_utilities(world);

    let player = &mut world.player;
    player.drop_cooldown = player.drop_cooldown.saturating_sub(1);
    player.layer_switch_cooldown = player.layer_switch_cooldown.saturating_sub(1);
    player.melee_swing_ticks = player.melee_swing_ticks.saturating_sub(1);
    player.gun_flash_ticks = player.gun_flash_ticks.saturating_sub(1);
    let max_stamina = BASE_MAX_STAMINA + player.progression.bonus_max_stamina();
    player.stats.set_max_stamina(max_stamina);

    let health = player.stats.get(StatKind::Health);
    let infection = player.stats.get(StatKind::Infection);
    if health <= 1.0 || infection >= 100.0 {
        world.state = GameState::GameOver;
        info!(health, infection, at_ms = now, "game_over");
        world.notify("You did not make it.");
    }
}

fn decay_stats(world: &mut GameWorld, seconds: f32) {
    if seconds <= 0.0 {
        return;
    }
    let rates = &world.config.physiology;
    let night = world.day_night.phase().is_night_side();
    let chased = world
        .zombies
        .iter()
        .any(|zombie| zombie.state == ZombieState::Chasing);
    let attacking = world.player.melee_swing_ticks > 0;
    let stats = &mut world.player.stats;

    stats.add(StatKind::Water, -rates.water_decay * seconds);
    stats.add(StatKind::Food, -rates.food_decay * seconds);
    stats.add(StatKind::Tireness, rates.tireness_gain * seconds);

    if !attacking {
        let mut regen = rates.stamina_regen;
        if stats.get(StatKind::Tireness) >= EXHAUSTED_TIRENESS {
            regen *= 0.5;
        }
        stats.add(StatKind::Stamina, regen * seconds);
    }

    let mut anxiety = if night {
        rates.anxiety_night_drift
    } else {
        rates.anxiety_day_drift
    };
    if chased {
        anxiety += rates.anxiety_chased_gain;
    }
    stats.add(StatKind::Anxiety, anxiety * seconds);

    if stats.get(StatKind::Water) <= 0.0 || stats.get(StatKind::Food) <= 0.0 {
        stats.add(StatKind::Health, -rates.starvation_damage * seconds);
    }

    let infection = stats.get(StatKind::Infection);
    if infection > 0.0 {
        stats.add(StatKind::Infection, rates.infection_growth * seconds);
        let drain = rates.infection_damage_per_10 * (infection / 10.0);
        stats.add(StatKind::Health, -drain * seconds);
    } else if stats.get(StatKind::Water) > 50.0 && stats.get(StatKind::Food) > 50.0 {
        stats.add(StatKind::Health, rates.health_regen * seconds);
    }
}

fn is_water(item: &crate::item::Item) -> bool {
    item.consumable()
        .is_some_and(|attrs| attrs.effect == Some(StatusEffect::Stat(StatKind::Water)))
}

fn auto_drink(world: &mut GameWorld, now: u64) {
    if world.player.stats.get(StatKind::Water) >= world.config.physiology.auto_drink_threshold {
        return;
    }
    if world
        .player
        .last_auto_drink_ms
        .is_some_and(|last| now.saturating_sub(last) < AUTO_DRINK_INTERVAL_MS)
    {
        return;
    }
    let belt = world
        .player
        .belt
        .iter()
        .position(|cell| cell.as_ref().is_some_and(is_water))
        .map(SourceLocation::Belt);
    let source = belt.or_else(|| {
        world
            .player
            .inventory
            .iter()
            .position(is_water)
            .map(SourceLocation::Inventory)
    });
    let Some(source) = source else {
        return;
    };
    if world.consume_item(&source).is_ok() {
        world.player.last_auto_drink_ms = Some(now);
        debug!(at_ms = now, "auto_drink");
    }
}

fn advance_reload(world: &mut GameWorld) {
    match world.player.reload_ticks_left {
        Some(left) if left <= 1 => world.finish_reload(),
        Some(left) => world.player.reload_ticks_left = Some(left - 1),
        None => {}
    }
}

/// Switched-on utilities burn durability each tick and go dark at zero.
fn drain_utilities(world: &mut GameWorld) {
    let drain = world.config.physiology.utility_drain_per_tick;
    let player = &mut world.player;
    let mut burnt_out = Vec::new();
    for item in player.utility.iter_mut().chain(player.belt.iter_mut().flatten()) {
        if !item.is_on() || item.durability.is_none() {
            continue;
        }
        if item.wear(drain) {
            if let Some(attrs) = item.utility_mut() {
                attrs.is_on = false;
            }
            burnt_out.push(item.name.clone());
        }
    }
    for name in burnt_out {
        world.notify(format!("The {name} went out."));
    }
}
