use std::collections::BTreeMap;

use engine::{
    FiringSpec, ItemTemplate, LoadSpec, LootEntry, TemplateDatabase, TemplateKind, TileDef,
    ValueRange, ZombieTemplate,
};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::warn;

use crate::config::GameConfig;
use crate::item::{
    sample_range, ClothAttrs, ConsumableAttrs, Item, ItemAttrs, ItemIdAllocator, MeleeAttrs,
    RangedAttrs, StatusEffect, UtilityAttrs, WornSlot,
};

const DEFAULT_CLOTH_DURABILITY: ValueRange = ValueRange::new(50.0, 100.0);
const DEFAULT_FIRING: FiringSpec = FiringSpec {
    pellets: 1,
    spread_degrees: 4.0,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistryTuning {
    pub durability_multiplier: f32,
    pub weapon_durability_multiplier: f32,
    pub tool_durability_multiplier: f32,
    pub spawn_multiplier: f32,
}

impl RegistryTuning {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            durability_multiplier: config.durability_multiplier,
            weapon_durability_multiplier: config.weapon_durability_multiplier,
            tool_durability_multiplier: config.tool_durability_multiplier,
            spawn_multiplier: config.spawn_multiplier,
        }
    }
}

impl Default for RegistryTuning {
    fn default() -> Self {
        Self::from_config(&GameConfig::default())
    }
}

/// Immutable templates plus the item factories built on them.
#[derive(Debug, Clone)]
pub struct Registry {
    templates: TemplateDatabase,
    spawn_table: Vec<(String, f32)>,
    cloth_by_slot: BTreeMap<WornSlot, Vec<String>>,
    tuning: RegistryTuning,
}

impl Registry {
    pub fn new(templates: TemplateDatabase, tuning: RegistryTuning) -> Self {
        let spawn_table = templates
            .items()
            .filter_map(|template| {
                template
                    .spawn_chance
                    .filter(|chance| *chance > 0.0)
                    .map(|chance| (template.name.clone(), chance))
            })
            .collect();
        let mut cloth_by_slot = BTreeMap::<WornSlot, Vec<String>>::new();
        for template in templates.items().filter(|t| t.kind == TemplateKind::Cloth) {
            if let Some(slot) = template.slot.as_deref().and_then(WornSlot::parse) {
                cloth_by_slot.entry(slot).or_default().push(template.name.clone());
            }
        }
        Self {
            templates,
            spawn_table,
            cloth_by_slot,
            tuning,
        }
    }

    pub fn templates(&self) -> &TemplateDatabase {
        &self.templates
    }

    pub fn item_template(&self, name: &str) -> Option<&ItemTemplate> {
        self.templates.item(name)
    }

    pub fn tile(&self, id: &str) -> Option<&TileDef> {
        if id.is_empty() {
            return None;
        }
        self.templates.tile(id)
    }

    pub fn create_from_name(
        &self,
        name: &str,
        randomize_durability: bool,
        ids: &mut ItemIdAllocator,
        rng: &mut StdRng,
    ) -> Option<Item> {
        let Some(template) = self.templates.item(name) else {
            warn!(name, "unknown_item_template");
            return None;
        };
        let attrs = self.attrs_for(template)?;
        let mut item = Item::new(ids.allocate(), template.name.clone(), attrs);
        item.capacity = template.capacity;
        item.sprite = template.sprite.clone();
        if let Some([r, g, b]) = template.color {
            item.color = [r, g, b];
        }

        let durability_range = template.durability.or(
            (template.kind == TemplateKind::Cloth).then_some(DEFAULT_CLOTH_DURABILITY),
        );
        if let Some(range) = durability_range {
            let scale = self.tuning.durability_multiplier * self.kind_multiplier(template.kind);
            let max = range.max * scale;
            let value = if randomize_durability {
                sample_range(rng, range) * scale
            } else {
                max
            };
            item = item.with_durability(value, max);
        }

        item.load = match template.load {
            Some(LoadSpec::Range { min, max }) => Some(rng.random_range(min..=max.max(min))),
            Some(LoadSpec::Value(value)) => Some(value),
            None => None,
        };
        if let (Some(load), Some(capacity)) = (item.load, item.capacity) {
            item.load = Some(load.min(capacity));
        }
        if item.is_stackable() && item.load.unwrap_or(0) == 0 {
            item.load = Some(1);
        }
        if item.load.is_none() && matches!(item.attrs, ItemAttrs::WeaponRanged(_)) {
            item.load = Some(0);
        }

        if !template.loot.is_empty() {
            let limit = item.slot_capacity();
            let contents = self.roll_loot(&template.loot, 1.0, limit, ids, rng);
            item.inventory.get_or_insert_with(Vec::new).extend(contents);
        }
        Some(item)
    }

    fn kind_multiplier(&self, kind: TemplateKind) -> f32 {
        match kind {
            TemplateKind::WeaponMelee | TemplateKind::WeaponRanged => {
                self.tuning.weapon_durability_multiplier
            }
            TemplateKind::Tool => self.tuning.tool_durability_multiplier,
            _ => 1.0,
        }
    }

    fn attrs_for(&self, template: &ItemTemplate) -> Option<ItemAttrs> {
        let damage = template.damage.unwrap_or(ValueRange::fixed(1.0));
        let utility = || UtilityAttrs {
            light: template.light,
            fuel: template.fuel.clone(),
            is_on: false,
            text: template.text.clone(),
        };
        let attrs = match template.kind {
            TemplateKind::Consumable => ItemAttrs::Consumable(ConsumableAttrs {
                effect: template.effect.as_deref().and_then(StatusEffect::parse),
                restore: template.restore,
                reduce: template.reduce,
                cure: template.cure,
                hp: template.hp,
                ammo_kind: template.ammo.clone(),
            }),
            TemplateKind::Utility => ItemAttrs::Utility(utility()),
            TemplateKind::Mobile => ItemAttrs::Mobile(utility()),
            TemplateKind::WeaponMelee => ItemAttrs::WeaponMelee(MeleeAttrs { damage }),
            TemplateKind::Tool => ItemAttrs::Tool(MeleeAttrs { damage }),
            TemplateKind::WeaponRanged => ItemAttrs::WeaponRanged(RangedAttrs {
                damage,
                ammo_kind: template.ammo.clone().unwrap_or_else(|| template.name.clone()),
                firing: template.firing.unwrap_or(DEFAULT_FIRING),
            }),
            TemplateKind::Backpack => ItemAttrs::Backpack,
            TemplateKind::Container => ItemAttrs::Container,
            TemplateKind::Cloth => {
                let Some(slot) = template.slot.as_deref().and_then(WornSlot::parse) else {
                    warn!(name = %template.name, slot = ?template.slot, "cloth_template_bad_slot");
                    return None;
                };
                ItemAttrs::Cloth(ClothAttrs {
                    slot,
                    defence: template.defence.unwrap_or(0.0),
                    speed: template.speed.unwrap_or(0.0),
                })
            }
            TemplateKind::Text => ItemAttrs::Text {
                text: template.text.clone().unwrap_or_default(),
            },
            TemplateKind::Skill => ItemAttrs::Skill {
                text: template.text.clone(),
            },
        };
        Some(attrs)
    }

    /// Weighted pick over templates with a spawn chance.
    pub fn generate_random(&self, ids: &mut ItemIdAllocator, rng: &mut StdRng) -> Option<Item> {
        let total: f32 = self
            .spawn_table
            .iter()
            .map(|(_, chance)| chance * self.tuning.spawn_multiplier)
            .sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = rng.random_range(0.0..total);
        for (name, chance) in &self.spawn_table {
            let weight = chance * self.tuning.spawn_multiplier;
            if roll < weight {
                return self.create_from_name(name, true, ids, rng);
            }
            roll -= weight;
        }
        let (name, _) = self.spawn_table.last()?;
        self.create_from_name(name, true, ids, rng)
    }

    /// Rolls each entry independently; `luck` scales every chance.
    pub fn roll_loot(
        &self,
        entries: &[LootEntry],
        luck: f32,
        limit: usize,
        ids: &mut ItemIdAllocator,
        rng: &mut StdRng,
    ) -> Vec<Item> {
        let mut items = Vec::new();
        for entry in entries {
            if items.len() >= limit {
                break;
            }
            let chance = (entry.chance * luck).clamp(0.0, 1.0);
            if rng.random::<f32>() < chance {
                if let Some(item) = self.create_from_name(&entry.name, true, ids, rng) {
                    items.push(item);
                }
            }
        }
        items
    }

    pub fn random_cloth(
        &self,
        slot: WornSlot,
        ids: &mut ItemIdAllocator,
        rng: &mut StdRng,
    ) -> Option<Item> {
        let pool = self.cloth_by_slot.get(&slot)?;
        if pool.is_empty() {
            return None;
        }
        let name = &pool[rng.random_range(0..pool.len())];
        self.create_from_name(name, true, ids, rng)
    }

    pub fn random_zombie_template(&self, rng: &mut StdRng) -> ZombieTemplate {
        let templates = self.templates.zombies().collect::<Vec<_>>();
        if templates.is_empty() {
            return ZombieTemplate::generic();
        }
        templates[rng.random_range(0..templates.len())].clone()
    }
}

#[cfg(test)]
pub(crate) fn test_registry() -> Registry {
    use engine::TileKind;

    let mut db = TemplateDatabase::default();
    let mut water = ItemTemplate::new("Water Bottle", TemplateKind::Consumable);
    water.capacity = Some(5);
    water.load = Some(LoadSpec::Range { min: 1, max: 5 });
    water.effect = Some("water".to_string());
    water.restore = Some(ValueRange::new(10.0, 20.0));
    water.spawn_chance = Some(1.0);
    db.insert_item(water);

    let mut matches = ItemTemplate::new("Matches", TemplateKind::Consumable);
    matches.capacity = Some(10);
    matches.load = Some(LoadSpec::Value(10));
    db.insert_item(matches);

    let mut shells = ItemTemplate::new("Shells", TemplateKind::Consumable);
    shells.capacity = Some(20);
    shells.load = Some(LoadSpec::Range { min: 2, max: 6 });
    shells.effect = Some("ammo".to_string());
    db.insert_item(shells);

    let mut shotgun = ItemTemplate::new("Shotgun", TemplateKind::WeaponRanged);
    shotgun.capacity = Some(8);
    shotgun.load = Some(LoadSpec::Value(0));
    shotgun.ammo = Some("Shells".to_string());
    shotgun.damage = Some(ValueRange::new(10.0, 14.0));
    shotgun.durability = Some(ValueRange::new(40.0, 80.0));
    shotgun.firing = Some(FiringSpec {
        pellets: 3,
        spread_degrees: 12.0,
    });
    db.insert_item(shotgun);

    let mut bat = ItemTemplate::new("Bat", TemplateKind::WeaponMelee);
    bat.damage = Some(ValueRange::new(6.0, 9.0));
    bat.durability = Some(ValueRange::new(50.0, 100.0));
    db.insert_item(bat);

    let mut pack = ItemTemplate::new("Backpack", TemplateKind::Backpack);
    pack.capacity = Some(8);
    db.insert_item(pack);

    let mut lantern = ItemTemplate::new("Lantern", TemplateKind::Utility);
    lantern.light = Some(ValueRange::new(2.0, 6.0));
    lantern.durability = Some(ValueRange::new(100.0, 100.0));
    db.insert_item(lantern);

    let mut pills = ItemTemplate::new("Antibiotics", TemplateKind::Consumable);
    pills.capacity = Some(3);
    pills.load = Some(LoadSpec::Value(3));
    pills.effect = Some("infection".to_string());
    pills.cure = Some(ValueRange::new(100.0, 100.0));
    db.insert_item(pills);

    let mut note = ItemTemplate::new("Note", TemplateKind::Text);
    note.text = Some("Stay inside after dark.".to_string());
    db.insert_item(note);

    let mut jacket = ItemTemplate::new("Jacket", TemplateKind::Cloth);
    jacket.slot = Some("torso".to_string());
    jacket.defence = Some(10.0);
    db.insert_item(jacket);

    let mut crate_loot = ItemTemplate::new("Crate", TemplateKind::Container);
    crate_loot.capacity = Some(4);
    db.insert_item(crate_loot);

    db.insert_tile(engine::TileDef::plain("#", true));
    db.insert_tile(engine::TileDef::plain(".", false));
    let mut door = engine::TileDef::plain("D", true);
    door.is_statable = true;
    door.state = Some("close".to_string());
    db.insert_tile(door);
    let mut chest = engine::TileDef::plain("C", true);
    chest.kind = TileKind::Container;
    chest.capacity = Some(4);
    chest.loot = vec![LootEntry {
        name: "Matches".to_string(),
        chance: 1.0,
    }];
    db.insert_tile(chest);
    let mut stairs = engine::TileDef::plain("[2]", false);
    stairs.kind = TileKind::Teleport(2);
    db.insert_tile(stairs);
    let mut stairs_down = engine::TileDef::plain("[1]", false);
    stairs_down.kind = TileKind::Teleport(1);
    db.insert_tile(stairs_down);

    Registry::new(db, RegistryTuning::default())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::item::ItemKind;

    #[test]
    fn cloth_gets_default_durability_band() {
        let registry = test_registry();
        let mut ids = ItemIdAllocator::new();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let jacket = registry
                .create_from_name("Jacket", true, &mut ids, &mut rng)
                .expect("jacket");
            let durability = jacket.durability.expect("durability");
            assert!((50.0..=100.0).contains(&durability));
            assert_eq!(jacket.max_durability, Some(100.0));
        }
    }

    #[test]
    fn stackable_load_is_within_template_range() {
        let registry = test_registry();
        let mut ids = ItemIdAllocator::new();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let water = registry
                .create_from_name("Water Bottle", true, &mut ids, &mut rng)
                .expect("water");
            assert!((1..=5).contains(&water.load.unwrap_or(0)));
            assert!(water.is_stackable());
        }
    }

    #[test]
    fn ranged_weapon_without_declared_load_starts_empty() {
        let mut db = TemplateDatabase::default();
        let mut rifle = ItemTemplate::new("Rifle", TemplateKind::WeaponRanged);
        rifle.capacity = Some(5);
        rifle.ammo = Some("Shells".to_string());
        db.insert_item(rifle);
        let registry = Registry::new(db, RegistryTuning::default());
        let mut ids = ItemIdAllocator::new();
        let mut rng = StdRng::seed_from_u64(5);
        let rifle = registry
            .create_from_name("Rifle", false, &mut ids, &mut rng)
            .expect("rifle");
        assert_eq!(rifle.load, Some(0));
        assert_eq!(rifle.stack_room(), 5);
    }

    #[test]
    fn unknown_name_is_none() {
        let registry = test_registry();
        let mut ids = ItemIdAllocator::new();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(registry
            .create_from_name("Plasma Rifle", true, &mut ids, &mut rng)
            .is_none());
    }

    #[test]
    fn generate_random_only_uses_spawnable_templates() {
        let registry = test_registry();
        let mut ids = ItemIdAllocator::new();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..10 {
            let item = registry.generate_random(&mut ids, &mut rng).expect("item");
            assert_eq!(item.name, "Water Bottle");
        }
    }

    #[test]
    fn loot_respects_limit_and_ids_are_unique() {
        let registry = test_registry();
        let mut ids = ItemIdAllocator::new();
        let mut rng = StdRng::seed_from_u64(5);
        let entries = vec![
            LootEntry {
                name: "Matches".to_string(),
                chance: 1.0,
            };
            5
        ];
        let loot = registry.roll_loot(&entries, 1.0, 3, &mut ids, &mut rng);
        assert_eq!(loot.len(), 3);
        assert!(loot[0].id != loot[1].id);
        assert_eq!(loot[0].kind(), ItemKind::Consumable);
    }

    #[test]
    fn weapon_durability_uses_weapon_multiplier() {
        let templates = test_registry().templates().clone();
        let registry = Registry::new(
            templates,
            RegistryTuning {
                weapon_durability_multiplier: 2.0,
                ..RegistryTuning::default()
            },
        );
        let mut ids = ItemIdAllocator::new();
        let mut rng = StdRng::seed_from_u64(5);
        let bat = registry
            .create_from_name("Bat", false, &mut ids, &mut rng)
            .expect("bat");
        assert_eq!(bat.max_durability, Some(200.0));
        assert_eq!(bat.durability, Some(200.0));
    }
}
