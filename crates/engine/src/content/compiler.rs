use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use super::database::{
    FiringSpec, ItemTemplate, LoadSpec, LootEntry, TemplateKind, TileDef, TileKind, ValueRange,
    ZombieTemplate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    Discovery,
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    MissingField,
    InvalidValue,
    DuplicateDefInMod,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub mod_id: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (mod={}, file={}, line={}, column={})",
                self.code,
                self.message,
                self.mod_id,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (mod={}, file={})",
                self.code,
                self.message,
                self.mod_id,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CompiledDef {
    Item(ItemTemplate),
    Zombie(ZombieTemplate),
    Tile(TileDef),
}

impl CompiledDef {
    fn key(&self) -> String {
        match self {
            Self::Item(item) => format!("item:{}", item.name),
            Self::Zombie(zombie) => format!("zombie:{}", zombie.id),
            Self::Tile(tile) => format!("tile:{}", tile.id),
        }
    }
}

/// Definitions that compiled plus the per-definition errors that were skipped.
#[derive(Debug, Default)]
pub(crate) struct DocumentOutcome {
    pub defs: Vec<CompiledDef>,
    pub errors: Vec<ContentCompileError>,
}

struct Ctx<'a, 'input> {
    mod_id: &'a str,
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl Ctx<'_, '_> {
    fn error(&self, code: ContentErrorCode, message: String, node: Node<'_, '_>) -> ContentCompileError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentCompileError {
            code,
            message,
            mod_id: self.mod_id.to_string(),
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }
}

/// Parses one `<Defs>` document. A document-level failure rejects the whole
/// file; a bad definition is reported in the outcome and skipped.
pub(crate) fn parse_defs_document(
    mod_id: &str,
    file_path: &Path,
    raw: &str,
) -> Result<DocumentOutcome, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        mod_id: mod_id.to_string(),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let ctx = Ctx {
        mod_id,
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(ctx.error(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            root,
        ));
    }

    let mut outcome = DocumentOutcome::default();
    let mut seen = HashSet::<String>::new();
    for child in root.children().filter(|node| node.is_element()) {
        let parsed = match child.tag_name().name() {
            "item" => parse_item(&ctx, child).map(CompiledDef::Item),
            "cloth" => parse_cloth(&ctx, child).map(CompiledDef::Item),
            "zombie" => parse_zombie(&ctx, child).map(CompiledDef::Zombie),
            "tile" => parse_tile(&ctx, child).map(CompiledDef::Tile),
            other => Err(ctx.error(
                ContentErrorCode::UnknownDefType,
                format!("unsupported def type <{other}>; expected item, cloth, zombie or tile"),
                child,
            )),
        };
        match parsed {
            Ok(def) => {
                if seen.insert(def.key()) {
                    outcome.defs.push(def);
                } else {
                    outcome.errors.push(ctx.error(
                        ContentErrorCode::DuplicateDefInMod,
                        format!("duplicate definition '{}' in one file", def.key()),
                        child,
                    ));
                }
            }
            Err(error) => outcome.errors.push(error),
        }
    }
    Ok(outcome)
}

fn parse_item(ctx: &Ctx<'_, '_>, node: Node<'_, '_>) -> Result<ItemTemplate, ContentCompileError> {
    let name = required_attr(ctx, node, "name")?;
    let kind_raw = required_attr(ctx, node, "kind")?;
    let kind = TemplateKind::parse(&kind_raw).ok_or_else(|| {
        ctx.error(
            ContentErrorCode::InvalidValue,
            format!("unknown item kind '{kind_raw}'"),
            node,
        )
    })?;
    let mut template = ItemTemplate::new(name, kind);
    let mut seen_fields = HashSet::<&str>::new();

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name();
        if !seen_fields.insert(field_name) {
            return Err(ctx.error(
                ContentErrorCode::InvalidValue,
                format!("duplicate field <{field_name}> in <item>"),
                field,
            ));
        }
        match field_name {
            "durability" => template.durability = Some(range(ctx, field)?),
            "load" => template.load = Some(load_spec(ctx, field)?),
            "capacity" => template.capacity = Some(u32_attr(ctx, field, "value")?),
            "color" => {
                template.color = Some([
                    u8_attr(ctx, field, "r")?,
                    u8_attr(ctx, field, "g")?,
                    u8_attr(ctx, field, "b")?,
                ])
            }
            "ammo" => template.ammo = Some(required_attr(ctx, field, "kind")?),
            "firing" => {
                template.firing = Some(FiringSpec {
                    pellets: u32_attr(ctx, field, "pellets")?.max(1),
                    spread_degrees: f32_attr(ctx, field, "spread")?,
                })
            }
            "sprite" => template.sprite = Some(required_attr(ctx, field, "file")?),
            "damage" => template.damage = Some(range(ctx, field)?),
            "cure" => template.cure = Some(range(ctx, field)?),
            "hp" => template.hp = Some(range(ctx, field)?),
            "effect" => template.effect = Some(required_attr(ctx, field, "status")?),
            "restore" => template.restore = Some(range(ctx, field)?),
            "reduce" => template.reduce = Some(range(ctx, field)?),
            "slot" => template.slot = Some(required_attr(ctx, field, "value")?),
            "defence" => template.defence = Some(f32_attr(ctx, field, "value")?),
            "speed" => template.speed = Some(f32_attr(ctx, field, "value")?),
            "light" => template.light = Some(range(ctx, field)?),
            "fuel" => template.fuel = Some(required_attr(ctx, field, "type")?),
            "text" => {
                template.text = Some(field.text().map(str::trim).unwrap_or_default().to_string())
            }
            "spawn" => template.spawn_chance = Some(f32_attr(ctx, field, "chance")?),
            "loot" => template.loot = loot_entries(ctx, field)?,
            other => {
                return Err(ctx.error(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{other}> in <item>"),
                    field,
                ))
            }
        }
    }
    Ok(template)
}

fn parse_cloth(ctx: &Ctx<'_, '_>, node: Node<'_, '_>) -> Result<ItemTemplate, ContentCompileError> {
    let mut template = ItemTemplate::new(required_attr(ctx, node, "name")?, TemplateKind::Cloth);
    template.slot = Some(required_attr(ctx, node, "slot")?);
    template.defence = Some(optional_f32_attr(ctx, node, "defence")?.unwrap_or(0.0));
    template.speed = Some(optional_f32_attr(ctx, node, "speed")?.unwrap_or(0.0));

    for field in node.children().filter(|child| child.is_element()) {
        match field.tag_name().name() {
            "sprite" => template.sprite = Some(required_attr(ctx, field, "file")?),
            "durability" => template.durability = Some(range(ctx, field)?),
            "spawn" => template.spawn_chance = Some(f32_attr(ctx, field, "chance")?),
            other => {
                return Err(ctx.error(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{other}> in <cloth>"),
                    field,
                ))
            }
        }
    }
    Ok(template)
}

fn parse_zombie(ctx: &Ctx<'_, '_>, node: Node<'_, '_>) -> Result<ZombieTemplate, ContentCompileError> {
    let fallback = ZombieTemplate::generic();
    let mut template = ZombieTemplate {
        id: required_attr(ctx, node, "id")?,
        name: node.attribute("name").unwrap_or("RANDOM").to_string(),
        sex: node.attribute("sex").unwrap_or("RANDOM").to_string(),
        profession: node.attribute("profession").unwrap_or("RANDOM").to_string(),
        vaccine: node.attribute("vaccine").unwrap_or("false").to_string(),
        ..fallback
    };

    for field in node.children().filter(|child| child.is_element()) {
        match field.tag_name().name() {
            "health" => template.health = range(ctx, field)?,
            "speed" => template.speed = range(ctx, field)?,
            "infection" => template.infection = range(ctx, field)?,
            "xp" => template.xp = range(ctx, field)?,
            "damage" => template.damage = range(ctx, field)?,
            "attack" => template.attack_range = f32_attr(ctx, field, "range")?,
            "sprite" => template.sprite = Some(required_attr(ctx, field, "file")?),
            "loot" => template.loot = loot_entries(ctx, field)?,
            "clothes" => {
                let mut slots = Vec::new();
                for slot in field.children().filter(|child| child.is_element()) {
                    if slot.tag_name().name() != "slot" {
                        return Err(ctx.error(
                            ContentErrorCode::UnknownField,
                            format!("unknown field <{}> in <clothes>", slot.tag_name().name()),
                            slot,
                        ));
                    }
                    slots.push(required_attr(ctx, slot, "value")?);
                }
                template.clothes = slots;
            }
            other => {
                return Err(ctx.error(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{other}> in <zombie>"),
                    field,
                ))
            }
        }
    }
    Ok(template)
}

fn parse_tile(ctx: &Ctx<'_, '_>, node: Node<'_, '_>) -> Result<TileDef, ContentCompileError> {
    let id = required_attr(ctx, node, "id")?;
    let kind_raw = node.attribute("type").unwrap_or("plain");
    let kind = TileKind::parse(kind_raw).ok_or_else(|| {
        ctx.error(
            ContentErrorCode::InvalidValue,
            format!("unknown tile type '{kind_raw}'"),
            node,
        )
    })?;
    let mut tile = TileDef {
        id,
        kind,
        is_obstacle: optional_bool_attr(ctx, node, "obstacle")?.unwrap_or(false),
        is_statable: optional_bool_attr(ctx, node, "statable")?.unwrap_or(false),
        state: node.attribute("state").map(str::to_string),
        sprite: node.attribute("sprite").map(str::to_string),
        capacity: None,
        loot: Vec::new(),
    };

    for field in node.children().filter(|child| child.is_element()) {
        match field.tag_name().name() {
            "capacity" => tile.capacity = Some(u32_attr(ctx, field, "value")?),
            "loot" => tile.loot = loot_entries(ctx, field)?,
            other => {
                return Err(ctx.error(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{other}> in <tile>"),
                    field,
                ))
            }
        }
    }
    Ok(tile)
}

fn loot_entries(ctx: &Ctx<'_, '_>, node: Node<'_, '_>) -> Result<Vec<LootEntry>, ContentCompileError> {
    let mut entries = Vec::new();
    for entry in node.children().filter(|child| child.is_element()) {
        if entry.tag_name().name() != "entry" {
            return Err(ctx.error(
                ContentErrorCode::UnknownField,
                format!("unknown field <{}> in <loot>", entry.tag_name().name()),
                entry,
            ));
        }
        let chance = f32_attr(ctx, entry, "chance")?;
        if !(0.0..=1.0).contains(&chance) {
            return Err(ctx.error(
                ContentErrorCode::InvalidValue,
                format!("loot chance {chance} must be within [0, 1]"),
                entry,
            ));
        }
        entries.push(LootEntry {
            name: required_attr(ctx, entry, "name")?,
            chance,
        });
    }
    Ok(entries)
}

fn load_spec(ctx: &Ctx<'_, '_>, node: Node<'_, '_>) -> Result<LoadSpec, ContentCompileError> {
    if node.attribute("value").is_some() {
        return Ok(LoadSpec::Value(u32_attr(ctx, node, "value")?));
    }
    let min = u32_attr(ctx, node, "min")?;
    let max = u32_attr(ctx, node, "max")?;
    if min > max {
        return Err(ctx.error(
            ContentErrorCode::InvalidValue,
            format!("load min {min} exceeds max {max}"),
            node,
        ));
    }
    Ok(LoadSpec::Range { min, max })
}

fn range(ctx: &Ctx<'_, '_>, node: Node<'_, '_>) -> Result<ValueRange, ContentCompileError> {
    let min = f32_attr(ctx, node, "min")?;
    let max = f32_attr(ctx, node, "max")?;
    if min > max {
        return Err(ctx.error(
            ContentErrorCode::InvalidValue,
            format!("<{}> min {min} exceeds max {max}", node.tag_name().name()),
            node,
        ));
    }
    Ok(ValueRange::new(min, max))
}

fn required_attr(
    ctx: &Ctx<'_, '_>,
    node: Node<'_, '_>,
    attr: &str,
) -> Result<String, ContentCompileError> {
    let value = node.attribute(attr).map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(ctx.error(
            ContentErrorCode::MissingField,
            format!(
                "missing required attribute '{attr}' on <{}>",
                node.tag_name().name()
            ),
            node,
        ));
    }
    Ok(value.to_string())
}

fn f32_attr(ctx: &Ctx<'_, '_>, node: Node<'_, '_>, attr: &str) -> Result<f32, ContentCompileError> {
    let raw = required_attr(ctx, node, attr)?;
    match raw.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ctx.error(
            ContentErrorCode::InvalidValue,
            format!("attribute '{attr}' value '{raw}' is not a finite number"),
            node,
        )),
    }
}

fn optional_f32_attr(
    ctx: &Ctx<'_, '_>,
    node: Node<'_, '_>,
    attr: &str,
) -> Result<Option<f32>, ContentCompileError> {
    if node.attribute(attr).is_none() {
        return Ok(None);
    }
    f32_attr(ctx, node, attr).map(Some)
}

fn u32_attr(ctx: &Ctx<'_, '_>, node: Node<'_, '_>, attr: &str) -> Result<u32, ContentCompileError> {
    let raw = required_attr(ctx, node, attr)?;
    raw.parse::<u32>().map_err(|_| {
        ctx.error(
            ContentErrorCode::InvalidValue,
            format!("attribute '{attr}' value '{raw}' is not a non-negative integer"),
            node,
        )
    })
}

fn u8_attr(ctx: &Ctx<'_, '_>, node: Node<'_, '_>, attr: &str) -> Result<u8, ContentCompileError> {
    let raw = required_attr(ctx, node, attr)?;
    raw.parse::<u8>().map_err(|_| {
        ctx.error(
            ContentErrorCode::InvalidValue,
            format!("attribute '{attr}' value '{raw}' is not within 0..=255"),
            node,
        )
    })
}

fn optional_bool_attr(
    ctx: &Ctx<'_, '_>,
    node: Node<'_, '_>,
    attr: &str,
) -> Result<Option<bool>, ContentCompileError> {
    match node.attribute(attr).map(str::trim) {
        None => Ok(None),
        Some("true" | "1" | "yes") => Ok(Some(true)),
        Some("false" | "0" | "no") => Ok(Some(false)),
        Some(other) => Err(ctx.error(
            ContentErrorCode::InvalidValue,
            format!("attribute '{attr}' value '{other}' is not a boolean"),
            node,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> DocumentOutcome {
        parse_defs_document("base", Path::new("defs.xml"), raw).expect("document parses")
    }

    #[test]
    fn item_fields_compile() {
        let outcome = parse(
            r#"<Defs>
                <item name="Shotgun" kind="weapon_ranged">
                    <durability min="40" max="80"/>
                    <load min="0" max="2"/>
                    <capacity value="2"/>
                    <ammo kind="Shells"/>
                    <firing pellets="6" spread="20"/>
                    <damage min="8" max="12"/>
                    <spawn chance="0.5"/>
                </item>
            </Defs>"#,
        );
        assert!(outcome.errors.is_empty());
        let CompiledDef::Item(item) = &outcome.defs[0] else {
            panic!("expected item");
        };
        assert_eq!(item.kind, TemplateKind::WeaponRanged);
        assert_eq!(item.load, Some(LoadSpec::Range { min: 0, max: 2 }));
        assert_eq!(item.firing.map(|f| f.pellets), Some(6));
        assert_eq!(item.ammo.as_deref(), Some("Shells"));
    }

    #[test]
    fn bad_definition_is_skipped_not_fatal() {
        let outcome = parse(
            r#"<Defs>
                <item name="Broken" kind="consumable"><mood value="sad"/></item>
                <item name="Water Bottle" kind="consumable"><capacity value="5"/></item>
                <vehicle name="Car"/>
            </Defs>"#,
        );
        assert_eq!(outcome.defs.len(), 1);
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.errors[0].code, ContentErrorCode::UnknownField);
        assert!(outcome.errors[0].location.is_some());
        assert_eq!(outcome.errors[1].code, ContentErrorCode::UnknownDefType);
    }

    #[test]
    fn cloth_becomes_cloth_item() {
        let outcome = parse(r#"<Defs><cloth name="Jacket" slot="torso" defence="12" speed="-0.1"/></Defs>"#);
        let CompiledDef::Item(item) = &outcome.defs[0] else {
            panic!("expected item");
        };
        assert_eq!(item.kind, TemplateKind::Cloth);
        assert_eq!(item.slot.as_deref(), Some("torso"));
        assert_eq!(item.defence, Some(12.0));
        assert!(item.durability.is_none());
    }

    #[test]
    fn zombie_defaults_missing_ranges() {
        let outcome = parse(
            r#"<Defs><zombie id="runner" vaccine="RANDOM"><speed min="1.5" max="2"/>
                <clothes><slot value="torso"/><slot value="legs"/></clothes></zombie></Defs>"#,
        );
        let CompiledDef::Zombie(zombie) = &outcome.defs[0] else {
            panic!("expected zombie");
        };
        assert_eq!(zombie.speed, ValueRange::new(1.5, 2.0));
        assert_eq!(zombie.health, ZombieTemplate::generic().health);
        assert_eq!(zombie.clothes, vec!["torso".to_string(), "legs".to_string()]);
        assert_eq!(zombie.name, "RANDOM");
    }

    #[test]
    fn tile_with_state_and_loot() {
        let outcome = parse(
            r#"<Defs>
                <tile id="D" obstacle="true" statable="true" state="close"/>
                <tile id="C" type="maptile_container" obstacle="true">
                    <capacity value="6"/><loot><entry name="Matches" chance="0.4"/></loot>
                </tile>
                <tile id="[2]" type="teleport[2]"/>
            </Defs>"#,
        );
        assert!(outcome.errors.is_empty());
        let tiles = outcome
            .defs
            .iter()
            .filter_map(|def| match def {
                CompiledDef::Tile(tile) => Some(tile),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(tiles[0].state.as_deref(), Some("close"));
        assert!(tiles[0].is_statable);
        assert_eq!(tiles[1].capacity, Some(6));
        assert_eq!(tiles[1].loot[0].name, "Matches");
        assert_eq!(tiles[2].kind, TileKind::Teleport(2));
    }

    #[test]
    fn inverted_range_is_invalid() {
        let outcome = parse(r#"<Defs><item name="X" kind="tool"><damage min="9" max="2"/></item></Defs>"#);
        assert!(outcome.defs.is_empty());
        assert_eq!(outcome.errors[0].code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn duplicate_in_file_keeps_first() {
        let outcome = parse(
            r#"<Defs><item name="A" kind="text"/><item name="A" kind="tool"/></Defs>"#,
        );
        assert_eq!(outcome.defs.len(), 1);
        assert_eq!(outcome.errors[0].code, ContentErrorCode::DuplicateDefInMod);
    }

    #[test]
    fn malformed_document_is_rejected_with_location() {
        let err = parse_defs_document("base", Path::new("defs.xml"), "<Defs><item></Defs>")
            .expect_err("malformed");
        assert_eq!(err.code, ContentErrorCode::XmlMalformed);
        assert!(err.location.is_some());

        let err = parse_defs_document("base", Path::new("defs.xml"), "<Things/>")
            .expect_err("bad root");
        assert_eq!(err.code, ContentErrorCode::InvalidRoot);
    }
}
