mod stack;

use engine::{FiringSpec, TemplateKind, ValueRange, Vec2};
use rand::rngs::StdRng;
use rand::Rng;

use crate::entity::stats::StatKind;
use crate::geometry::Rect;

pub use stack::{insert_stacking, merge_stack, split_stack, transfer_all, StackQuantity};

pub type ItemKind = TemplateKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub u64);

#[derive(Debug, Clone)]
pub struct ItemIdAllocator {
    next: u64,
}

impl ItemIdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn allocate(&mut self) -> ItemId {
        let id = ItemId(self.next);
        self.next += 1;
        id
    }
}

impl Default for ItemIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WornSlot {
    Head,
    Torso,
    Legs,
    Feet,
    Body,
    Hands,
}

impl WornSlot {
    pub const ALL: [WornSlot; 6] = [
        WornSlot::Head,
        WornSlot::Torso,
        WornSlot::Legs,
        WornSlot::Feet,
        WornSlot::Body,
        WornSlot::Hands,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        let slot = match raw.trim().to_ascii_lowercase().as_str() {
            "head" => Self::Head,
            "torso" => Self::Torso,
            "legs" => Self::Legs,
            "feet" => Self::Feet,
            "body" => Self::Body,
            "hands" => Self::Hands,
            _ => return None,
        };
        Some(slot)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Torso => "torso",
            Self::Legs => "legs",
            Self::Feet => "feet",
            Self::Body => "body",
            Self::Hands => "hands",
        }
    }
}

/// What a consumable does when used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEffect {
    Stat(StatKind),
    Cure,
    Ammo,
}

impl StatusEffect {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ammo" => Some(Self::Ammo),
            "infection" | "cure" => Some(Self::Cure),
            other => StatKind::parse(other).map(Self::Stat),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConsumableAttrs {
    pub effect: Option<StatusEffect>,
    pub restore: Option<ValueRange>,
    pub reduce: Option<ValueRange>,
    pub cure: Option<ValueRange>,
    pub hp: Option<ValueRange>,
    /// Ammo kind this stack provides, when it is ammunition.
    pub ammo_kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeleeAttrs {
    pub damage: ValueRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangedAttrs {
    pub damage: ValueRange,
    pub ammo_kind: String,
    pub firing: FiringSpec,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UtilityAttrs {
    pub light: Option<ValueRange>,
    pub fuel: Option<String>,
    pub is_on: bool,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClothAttrs {
    pub slot: WornSlot,
    pub defence: f32,
    pub speed: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemAttrs {
    Consumable(ConsumableAttrs),
    Utility(UtilityAttrs),
    Mobile(UtilityAttrs),
    WeaponMelee(MeleeAttrs),
    WeaponRanged(RangedAttrs),
    Tool(MeleeAttrs),
    Backpack,
    Container,
    Cloth(ClothAttrs),
    Text { text: String },
    Skill { text: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpseClock {
    pub spawned_ms: u64,
    pub decay_ms: u64,
}

impl CorpseClock {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.spawned_ms) > self.decay_ms
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub attrs: ItemAttrs,
    pub durability: Option<f32>,
    pub max_durability: Option<f32>,
    pub load: Option<u32>,
    pub capacity: Option<u32>,
    pub color: [u8; 3],
    pub sprite: Option<String>,
    /// Centre in world pixels; meaningful only while on the ground or placed in the map.
    pub pos: Vec2,
    pub inventory: Option<Vec<Item>>,
    pub corpse: Option<CorpseClock>,
}

impl Item {
    pub fn new(id: ItemId, name: impl Into<String>, attrs: ItemAttrs) -> Self {
        let inventory = matches!(attrs, ItemAttrs::Backpack | ItemAttrs::Container).then(Vec::new);
        Self {
            id,
            name: name.into(),
            attrs,
            durability: None,
            max_durability: None,
            load: None,
            capacity: None,
            color: [255, 255, 255],
            sprite: None,
            pos: Vec2::ZERO,
            inventory,
            corpse: None,
        }
    }

    pub fn with_load(mut self, load: u32) -> Self {
        self.load = Some(load);
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_durability(mut self, durability: f32, max: f32) -> Self {
        self.max_durability = Some(max);
        self.durability = Some(durability.clamp(0.0, max));
        self
    }

    pub fn with_pos(mut self, pos: Vec2) -> Self {
        self.pos = pos;
        self
    }

    pub fn corpse(id: ItemId, name: impl Into<String>, contents: Vec<Item>, clock: CorpseClock) -> Self {
        let capacity = contents.len().max(1) as u32;
        let mut corpse = Self::new(id, name, ItemAttrs::Container).with_capacity(capacity);
        corpse.inventory = Some(contents);
        corpse.corpse = Some(clock);
        corpse.color = [120, 40, 40];
        corpse
    }

    pub fn kind(&self) -> ItemKind {
        match &self.attrs {
            ItemAttrs::Consumable(_) => ItemKind::Consumable,
            ItemAttrs::Utility(_) => ItemKind::Utility,
            ItemAttrs::Mobile(_) => ItemKind::Mobile,
            ItemAttrs::WeaponMelee(_) => ItemKind::WeaponMelee,
            ItemAttrs::WeaponRanged(_) => ItemKind::WeaponRanged,
            ItemAttrs::Tool(_) => ItemKind::Tool,
            ItemAttrs::Backpack => ItemKind::Backpack,
            ItemAttrs::Container => ItemKind::Container,
            ItemAttrs::Cloth(_) => ItemKind::Cloth,
            ItemAttrs::Text { .. } => ItemKind::Text,
            ItemAttrs::Skill { .. } => ItemKind::Skill,
        }
    }

    pub fn rect(&self, tile_size: f32) -> Rect {
        let size = tile_size * 0.75;
        Rect::from_center(self.pos, size, size)
    }

    pub fn is_stackable(&self) -> bool {
        self.capacity.unwrap_or(0) > 1
            && self.durability.is_none()
            && matches!(self.kind(), ItemKind::Consumable | ItemKind::Utility)
    }

    pub fn can_stack_with(&self, other: &Item) -> bool {
        self.is_stackable()
            && other.is_stackable()
            && self.name == other.name
            && self.kind() == other.kind()
    }

    pub fn stack_load(&self) -> u32 {
        self.load.unwrap_or(1)
    }

    pub fn stack_room(&self) -> u32 {
        self.capacity
            .unwrap_or(1)
            .saturating_sub(self.stack_load())
    }

    pub fn is_container(&self) -> bool {
        self.inventory.is_some()
    }

    pub fn is_corpse(&self) -> bool {
        self.corpse.is_some()
    }

    pub fn is_backpack(&self) -> bool {
        matches!(self.attrs, ItemAttrs::Backpack)
    }

    pub fn is_weapon(&self) -> bool {
        matches!(
            self.attrs,
            ItemAttrs::WeaponMelee(_) | ItemAttrs::WeaponRanged(_) | ItemAttrs::Tool(_)
        )
    }

    pub fn consumable(&self) -> Option<&ConsumableAttrs> {
        match &self.attrs {
            ItemAttrs::Consumable(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn is_ammo(&self) -> bool {
        self.consumable().is_some_and(|attrs| {
            attrs.effect == Some(StatusEffect::Ammo) || attrs.ammo_kind.is_some()
        })
    }

    /// True when this stack can feed a weapon chambered for `ammo_kind`.
    pub fn provides_ammo(&self, ammo_kind: &str) -> bool {
        self.is_ammo()
            && (self.name == ammo_kind
                || self
                    .consumable()
                    .and_then(|attrs| attrs.ammo_kind.as_deref())
                    == Some(ammo_kind))
    }

    pub fn weapon_ammo_kind(&self) -> Option<&str> {
        match &self.attrs {
            ItemAttrs::WeaponRanged(attrs) => Some(attrs.ammo_kind.as_str()),
            _ => None,
        }
    }

    pub fn utility(&self) -> Option<&UtilityAttrs> {
        match &self.attrs {
            ItemAttrs::Utility(attrs) | ItemAttrs::Mobile(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn utility_mut(&mut self) -> Option<&mut UtilityAttrs> {
        match &mut self.attrs {
            ItemAttrs::Utility(attrs) | ItemAttrs::Mobile(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn is_on(&self) -> bool {
        self.utility().is_some_and(|attrs| attrs.is_on)
    }

    pub fn cloth(&self) -> Option<&ClothAttrs> {
        match &self.attrs {
            ItemAttrs::Cloth(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.attrs {
            ItemAttrs::Text { text } => Some(text.as_str()),
            ItemAttrs::Skill { text } => text.as_deref(),
            ItemAttrs::Utility(attrs) | ItemAttrs::Mobile(attrs) => attrs.text.as_deref(),
            _ => None,
        }
    }

    /// Items allowed in the utility slot.
    pub fn fits_utility_slot(&self) -> bool {
        match self.kind() {
            ItemKind::Utility => true,
            ItemKind::Container => !self.is_corpse(),
            ItemKind::Consumable => self.is_ammo(),
            _ => false,
        }
    }

    pub fn durability_fraction(&self) -> Option<f32> {
        match (self.durability, self.max_durability) {
            (Some(current), Some(max)) if max > 0.0 => Some((current / max).clamp(0.0, 1.0)),
            _ => None,
        }
    }

    /// Reduces durability, returning true once it reaches zero.
    pub fn wear(&mut self, amount: f32) -> bool {
        match self.durability.as_mut() {
            Some(durability) => {
                *durability = (*durability - amount).max(0.0);
                *durability <= 0.0
            }
            None => false,
        }
    }

    pub fn current_light_radius(&self, tile_size: f32) -> f32 {
        let Some(attrs) = self.utility() else {
            return 0.0;
        };
        let (Some(light), true) = (attrs.light, attrs.is_on) else {
            return 0.0;
        };
        let Some(fraction) = self.durability_fraction() else {
            return light.max * tile_size;
        };
        (light.min + (light.max - light.min) * fraction) * tile_size
    }

    pub fn damage_range(&self) -> Option<ValueRange> {
        match &self.attrs {
            ItemAttrs::WeaponMelee(attrs) | ItemAttrs::Tool(attrs) => Some(attrs.damage),
            ItemAttrs::WeaponRanged(attrs) => Some(attrs.damage),
            _ => None,
        }
    }

    /// Uniform integer damage in the weapon's range, scaled by durability.
    pub fn roll_damage(&self, rng: &mut StdRng) -> u32 {
        let Some(range) = self.damage_range() else {
            return 0;
        };
        let low = range.min.max(0.0).round() as u32;
        let high = range.max.max(range.min).round() as u32;
        let base = rng.random_range(low..=high.max(low)) as f32;
        let scaled = match self.durability_fraction() {
            Some(fraction) => base * fraction,
            None => base,
        };
        scaled.round() as u32
    }

    pub fn slots_used(&self) -> usize {
        self.inventory.as_ref().map_or(0, Vec::len)
    }

    pub fn slot_capacity(&self) -> usize {
        self.capacity.unwrap_or(0) as usize
    }

    pub fn has_free_slot(&self) -> bool {
        self.is_container() && self.slots_used() < self.slot_capacity()
    }

    pub fn contains_id(&self, id: ItemId) -> bool {
        self.inventory
            .as_ref()
            .is_some_and(|items| items.iter().any(|item| item.id == id || item.contains_id(id)))
    }

    pub fn take_inventory(&mut self) -> Vec<Item> {
        self.inventory.as_mut().map(std::mem::take).unwrap_or_default()
    }

    pub fn for_each_nested<'a>(&'a self, visit: &mut impl FnMut(&'a Item)) {
        if let Some(items) = &self.inventory {
            for item in items {
                visit(item);
                item.for_each_nested(visit);
            }
        }
    }
}

/// Uniform sample from an inclusive range, tolerant of `min == max`.
pub fn sample_range(rng: &mut StdRng, range: ValueRange) -> f32 {
    if range.max <= range.min {
        return range.min;
    }
    rng.random_range(range.min..=range.max)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn water(id: u64, load: u32) -> Item {
        Item::new(
            ItemId(id),
            "Water Bottle",
            ItemAttrs::Consumable(ConsumableAttrs {
                effect: Some(StatusEffect::Stat(StatKind::Water)),
                ..ConsumableAttrs::default()
            }),
        )
        .with_capacity(5)
        .with_load(load)
    }

    #[test]
    fn stackability_requires_capacity_and_no_durability() {
        assert!(water(1, 3).is_stackable());
        assert!(water(1, 3).can_stack_with(&water(2, 1)));
        assert!(!water(1, 3).with_capacity(1).is_stackable());
        assert!(!water(1, 3).with_durability(5.0, 10.0).is_stackable());

        let knife = Item::new(
            ItemId(3),
            "Knife",
            ItemAttrs::WeaponMelee(MeleeAttrs {
                damage: ValueRange::new(3.0, 6.0),
            }),
        )
        .with_capacity(5);
        assert!(!knife.is_stackable());
    }

    #[test]
    fn light_radius_follows_state_and_durability() {
        let mut lamp = Item::new(
            ItemId(1),
            "Lantern",
            ItemAttrs::Utility(UtilityAttrs {
                light: Some(ValueRange::new(2.0, 6.0)),
                ..UtilityAttrs::default()
            }),
        )
        .with_durability(50.0, 100.0);
        assert_eq!(lamp.current_light_radius(32.0), 0.0);
        lamp.utility_mut().expect("utility").is_on = true;
        assert_eq!(lamp.current_light_radius(32.0), 4.0 * 32.0);
    }

    #[test]
    fn damage_scales_with_durability() {
        let mut rng = StdRng::seed_from_u64(7);
        let bat = Item::new(
            ItemId(1),
            "Bat",
            ItemAttrs::WeaponMelee(MeleeAttrs {
                damage: ValueRange::new(10.0, 10.0),
            }),
        )
        .with_durability(25.0, 100.0);
        assert_eq!(bat.roll_damage(&mut rng), 3);
    }

    #[test]
    fn corpse_expires_strictly_after_decay() {
        let clock = CorpseClock {
            spawned_ms: 1_000,
            decay_ms: 500,
        };
        assert!(!clock.is_expired(1_500));
        assert!(clock.is_expired(1_501));
    }

    #[test]
    fn utility_slot_accepts_only_allowed_kinds() {
        let shells = Item::new(
            ItemId(1),
            "Shells",
            ItemAttrs::Consumable(ConsumableAttrs {
                effect: Some(StatusEffect::Ammo),
                ..ConsumableAttrs::default()
            }),
        );
        assert!(shells.fits_utility_slot());
        assert!(!water(2, 1).fits_utility_slot());
        assert!(Item::new(ItemId(3), "Crate", ItemAttrs::Container).fits_utility_slot());
        assert!(!Item::new(ItemId(4), "Pack", ItemAttrs::Backpack).fits_utility_slot());
    }

    #[test]
    fn nested_lookup_finds_deep_items() {
        let mut bag = Item::new(ItemId(1), "Bag", ItemAttrs::Backpack).with_capacity(4);
        let mut pouch = Item::new(ItemId(2), "Pouch", ItemAttrs::Container).with_capacity(2);
        pouch.inventory = Some(vec![water(3, 1)]);
        bag.inventory = Some(vec![pouch]);
        assert!(bag.contains_id(ItemId(3)));
        assert!(!bag.contains_id(ItemId(9)));
    }
}
