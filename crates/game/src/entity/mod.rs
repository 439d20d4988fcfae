pub mod player;
pub mod progression;
pub mod projectile;
pub mod stats;
pub mod zombie;

pub use player::{AmmoSource, Facing, HitResult, Player, BELT_SLOTS, INVENTORY_SLOTS};
pub use progression::{PlayerProgression, Skill, SkillLevel};
pub use projectile::Projectile;
pub use stats::{StatKind, Stats};
pub use zombie::{Zombie, ZombieId, ZombieProfile, ZombieState};
