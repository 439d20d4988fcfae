use std::collections::BTreeMap;

/// Inclusive numeric range as written in template data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub const fn fixed(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateKind {
    Consumable,
    Utility,
    Mobile,
    WeaponMelee,
    WeaponRanged,
    Tool,
    Backpack,
    Container,
    Cloth,
    Text,
    Skill,
}

impl TemplateKind {
    pub fn parse(raw: &str) -> Option<Self> {
        let kind = match raw.trim() {
            "consumable" => Self::Consumable,
            "utility" => Self::Utility,
            "mobile" => Self::Mobile,
            "weapon_melee" => Self::WeaponMelee,
            "weapon_ranged" => Self::WeaponRanged,
            "tool" => Self::Tool,
            "backpack" => Self::Backpack,
            "container" => Self::Container,
            "cloth" => Self::Cloth,
            "text" => Self::Text,
            "skill" => Self::Skill,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Consumable => "consumable",
            Self::Utility => "utility",
            Self::Mobile => "mobile",
            Self::WeaponMelee => "weapon_melee",
            Self::WeaponRanged => "weapon_ranged",
            Self::Tool => "tool",
            Self::Backpack => "backpack",
            Self::Container => "container",
            Self::Cloth => "cloth",
            Self::Text => "text",
            Self::Skill => "skill",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadSpec {
    Range { min: u32, max: u32 },
    Value(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiringSpec {
    pub pellets: u32,
    pub spread_degrees: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LootEntry {
    pub name: String,
    /// Probability in `[0, 1]`.
    pub chance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemTemplate {
    pub name: String,
    pub kind: TemplateKind,
    pub durability: Option<ValueRange>,
    pub load: Option<LoadSpec>,
    pub capacity: Option<u32>,
    pub color: Option<[u8; 3]>,
    pub ammo: Option<String>,
    pub firing: Option<FiringSpec>,
    pub sprite: Option<String>,
    pub damage: Option<ValueRange>,
    pub cure: Option<ValueRange>,
    pub hp: Option<ValueRange>,
    pub effect: Option<String>,
    pub restore: Option<ValueRange>,
    pub reduce: Option<ValueRange>,
    pub slot: Option<String>,
    pub defence: Option<f32>,
    pub speed: Option<f32>,
    pub light: Option<ValueRange>,
    pub fuel: Option<String>,
    pub text: Option<String>,
    pub spawn_chance: Option<f32>,
    pub loot: Vec<LootEntry>,
}

impl ItemTemplate {
    pub fn new(name: impl Into<String>, kind: TemplateKind) -> Self {
        Self {
            name: name.into(),
            kind,
            durability: None,
            load: None,
            capacity: None,
            color: None,
            ammo: None,
            firing: None,
            sprite: None,
            damage: None,
            cure: None,
            hp: None,
            effect: None,
            restore: None,
            reduce: None,
            slot: None,
            defence: None,
            speed: None,
            light: None,
            fuel: None,
            text: None,
            spawn_chance: None,
            loot: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZombieTemplate {
    pub id: String,
    /// Literal name or `RANDOM`.
    pub name: String,
    pub sex: String,
    pub profession: String,
    /// `true`, `false` or `RANDOM`.
    pub vaccine: String,
    pub health: ValueRange,
    pub speed: ValueRange,
    pub infection: ValueRange,
    pub xp: ValueRange,
    pub damage: ValueRange,
    pub attack_range: f32,
    pub sprite: Option<String>,
    pub loot: Vec<LootEntry>,
    pub clothes: Vec<String>,
}

impl ZombieTemplate {
    /// Fallback used when no zombie template loaded.
    pub fn generic() -> Self {
        Self {
            id: "generic".to_string(),
            name: "RANDOM".to_string(),
            sex: "RANDOM".to_string(),
            profession: "RANDOM".to_string(),
            vaccine: "false".to_string(),
            health: ValueRange::new(40.0, 60.0),
            speed: ValueRange::new(0.8, 1.4),
            infection: ValueRange::new(1.0, 4.0),
            xp: ValueRange::new(8.0, 15.0),
            damage: ValueRange::new(4.0, 9.0),
            attack_range: 40.0,
            sprite: None,
            loot: Vec::new(),
            clothes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Plain,
    Container,
    Teleport(u8),
}

impl TileKind {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw {
            "plain" | "" => return Some(Self::Plain),
            "maptile_container" => return Some(Self::Container),
            _ => {}
        }
        let layer = raw
            .strip_prefix("teleport[")?
            .strip_suffix(']')?
            .parse::<u8>()
            .ok()?;
        (1..=9).contains(&layer).then_some(Self::Teleport(layer))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileDef {
    pub id: String,
    pub kind: TileKind,
    pub is_obstacle: bool,
    pub is_statable: bool,
    pub state: Option<String>,
    pub sprite: Option<String>,
    pub capacity: Option<u32>,
    pub loot: Vec<LootEntry>,
}

impl TileDef {
    pub fn plain(id: impl Into<String>, is_obstacle: bool) -> Self {
        Self {
            id: id.into(),
            kind: TileKind::Plain,
            is_obstacle,
            is_statable: false,
            state: None,
            sprite: None,
            capacity: None,
            loot: Vec::new(),
        }
    }
}

/// Immutable template registry produced by the content pipeline.
#[derive(Debug, Default, Clone)]
pub struct TemplateDatabase {
    items: BTreeMap<String, ItemTemplate>,
    zombies: BTreeMap<String, ZombieTemplate>,
    tiles: BTreeMap<String, TileDef>,
}

impl TemplateDatabase {
    pub fn insert_item(&mut self, template: ItemTemplate) {
        self.items.insert(template.name.clone(), template);
    }

    pub fn insert_zombie(&mut self, template: ZombieTemplate) {
        self.zombies.insert(template.id.clone(), template);
    }

    pub fn insert_tile(&mut self, tile: TileDef) {
        self.tiles.insert(tile.id.clone(), tile);
    }

    pub fn item(&self, name: &str) -> Option<&ItemTemplate> {
        self.items.get(name)
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemTemplate> {
        self.items.values()
    }

    pub fn zombie(&self, id: &str) -> Option<&ZombieTemplate> {
        self.zombies.get(id)
    }

    pub fn zombies(&self) -> impl Iterator<Item = &ZombieTemplate> {
        self.zombies.values()
    }

    pub fn tile(&self, id: &str) -> Option<&TileDef> {
        self.tiles.get(id)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &TileDef> {
        self.tiles.values()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn zombie_count(&self) -> usize {
        self.zombies.len()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_kind_parses_teleports_in_range_only() {
        assert_eq!(TileKind::parse("teleport[2]"), Some(TileKind::Teleport(2)));
        assert_eq!(TileKind::parse("teleport[0]"), None);
        assert_eq!(TileKind::parse("teleport[12]"), None);
        assert_eq!(TileKind::parse("maptile_container"), Some(TileKind::Container));
        assert_eq!(TileKind::parse("plain"), Some(TileKind::Plain));
    }

    #[test]
    fn template_kind_round_trips_names() {
        for raw in ["consumable", "weapon_ranged", "backpack", "cloth"] {
            let kind = TemplateKind::parse(raw).expect("known kind");
            assert_eq!(kind.as_str(), raw);
        }
        assert_eq!(TemplateKind::parse("spaceship"), None);
    }

    #[test]
    fn later_insert_replaces_by_name() {
        let mut db = TemplateDatabase::default();
        db.insert_item(ItemTemplate::new("Matches", TemplateKind::Consumable));
        let mut replacement = ItemTemplate::new("Matches", TemplateKind::Utility);
        replacement.capacity = Some(20);
        db.insert_item(replacement);
        assert_eq!(db.item_count(), 1);
        assert_eq!(db.item("Matches").and_then(|t| t.capacity), Some(20));
    }
}
