use std::collections::BTreeMap;

use engine::{ValueRange, Vec2};

use crate::geometry::Rect;
use crate::item::{Item, WornSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZombieId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZombieState {
    #[default]
    Wandering,
    Chasing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZombieProfile {
    pub template_id: String,
    pub name: String,
    pub sex: String,
    pub profession: String,
    pub vaccine: bool,
}

#[derive(Debug, Clone)]
pub struct Zombie {
    pub id: ZombieId,
    pub pos: Vec2,
    pub size: f32,
    pub health: f32,
    pub max_health: f32,
    pub speed: f32,
    pub attack_range: f32,
    pub damage: ValueRange,
    pub infection: ValueRange,
    pub xp_value: f32,
    pub loot: Vec<Item>,
    pub worn: BTreeMap<WornSlot, Item>,
    pub state: ZombieState,
    pub wander_target: Option<Vec2>,
    pub last_wander_change_ms: u64,
    pub last_attack_ms: Option<u64>,
    pub swing_ticks: u32,
    pub swing_angle: f32,
    pub profile: ZombieProfile,
}

impl Zombie {
    pub fn rect(&self) -> Rect {
        Rect::from_center(self.pos, self.size, self.size)
    }

    pub fn rect_at(&self, pos: Vec2) -> Rect {
        Rect::from_center(pos, self.size, self.size)
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    /// Returns true when this hit killed the zombie.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        let was_alive = !self.is_dead();
        self.health = (self.health - amount).max(0.0);
        was_alive && self.is_dead()
    }

    pub fn can_attack(&self, now_ms: u64, cooldown_ms: u64) -> bool {
        self.last_attack_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= cooldown_ms)
    }

    /// Loot table plus every worn piece, consumed on death.
    pub fn take_remains(&mut self) -> Vec<Item> {
        let mut remains = std::mem::take(&mut self.loot);
        remains.extend(std::mem::take(&mut self.worn).into_values());
        remains
    }
}

#[cfg(test)]
pub(crate) fn test_zombie(id: u64, pos: Vec2) -> Zombie {
    Zombie {
        id: ZombieId(id),
        pos,
        size: 24.0,
        health: 50.0,
        max_health: 50.0,
        speed: 1.0,
        attack_range: 40.0,
        damage: ValueRange::new(5.0, 5.0),
        infection: ValueRange::new(2.0, 2.0),
        xp_value: 10.0,
        loot: Vec::new(),
        worn: BTreeMap::new(),
        state: ZombieState::Wandering,
        wander_target: None,
        last_wander_change_ms: 0,
        last_attack_ms: None,
        swing_ticks: 0,
        swing_angle: 0.0,
        profile: ZombieProfile {
            template_id: "generic".to_string(),
            name: "Walker".to_string(),
            sex: "male".to_string(),
            profession: "none".to_string(),
            vaccine: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_reports_kill_once() {
        let mut zombie = test_zombie(1, Vec2::ZERO);
        assert!(!zombie.take_damage(20.0));
        assert!(zombie.take_damage(40.0));
        assert!(!zombie.take_damage(5.0));
        assert_eq!(zombie.health, 0.0);
    }

    #[test]
    fn attack_cooldown_gates_repeat_hits() {
        let mut zombie = test_zombie(1, Vec2::ZERO);
        assert!(zombie.can_attack(0, 500));
        zombie.last_attack_ms = Some(1_000);
        assert!(!zombie.can_attack(1_499, 500));
        assert!(zombie.can_attack(1_500, 500));
    }
}
