//! Character presets: a name, starting traits and the clothes to wear,
//! stored as one small XML file per preset.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use roxmltree::Document;
use thiserror::Error;
use tracing::{info, warn};

use crate::entity::{Player, SkillLevel};
use crate::item::WornSlot;
use crate::world::GameWorld;

const TRAINED_LEVEL: u32 = 2;
const LUCKY_BONUS: f32 = 0.25;
const FAST_BONUS: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Trait {
    Lucky,
    Fast,
    Strong,
    Athletic,
    Marksman,
    Brawler,
}

impl Trait {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lucky" => Some(Self::Lucky),
            "fast" => Some(Self::Fast),
            "strong" => Some(Self::Strong),
            "athletic" => Some(Self::Athletic),
            "marksman" => Some(Self::Marksman),
            "brawler" => Some(Self::Brawler),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lucky => "lucky",
            Self::Fast => "fast",
            Self::Strong => "strong",
            Self::Athletic => "athletic",
            Self::Marksman => "marksman",
            Self::Brawler => "brawler",
        }
    }

    fn apply(self, player: &mut Player) {
        let progression = &mut player.progression;
        match self {
            Self::Lucky => progression.lucky += LUCKY_BONUS,
            Self::Fast => progression.speed += FAST_BONUS,
            Self::Strong => progression.strength = SkillLevel::at_level(TRAINED_LEVEL),
            Self::Athletic => progression.fitness = SkillLevel::at_level(TRAINED_LEVEL),
            Self::Marksman => progression.ranged = SkillLevel::at_level(TRAINED_LEVEL),
            Self::Brawler => progression.melee = SkillLevel::at_level(TRAINED_LEVEL),
        }
    }
}

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("invalid preset name {0:?}")]
    InvalidName(String),
    #[error("failed to read preset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write preset {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed preset {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Preset {
    pub name: String,
    pub traits: Vec<Trait>,
    pub clothes: BTreeMap<WornSlot, String>,
}

fn validate_name(name: &str) -> Result<(), PresetError> {
    let valid = !name.trim().is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ' '));
    if valid {
        Ok(())
    } else {
        Err(PresetError::InvalidName(name.to_string()))
    }
}

pub fn preset_path(dir: &Path, name: &str) -> Result<PathBuf, PresetError> {
    validate_name(name)?;
    Ok(dir.join(format!("{name}.xml")))
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

impl Preset {
    /// Unknown traits and slots are logged and skipped.
    pub fn parse(raw: &str, path: &Path) -> Result<Self, PresetError> {
        let malformed = |message: String| PresetError::Malformed {
            path: path.to_path_buf(),
            message,
        };
        let doc = Document::parse(raw).map_err(|error| malformed(error.to_string()))?;
        let root = doc.root_element();
        if root.tag_name().name() != "preset" {
            return Err(malformed("root element must be <preset>".to_string()));
        }
        let name = root
            .attribute("name")
            .ok_or_else(|| malformed("missing name attribute".to_string()))?
            .to_string();

        let mut preset = Preset {
            name,
            ..Preset::default()
        };
        for child in root.children().filter(|node| node.is_element()) {
            match child.tag_name().name() {
                "trait" => match child.attribute("name").and_then(Trait::parse) {
                    Some(found) if !preset.traits.contains(&found) => preset.traits.push(found),
                    Some(_) => {}
                    None => warn!(
                        path = %path.display(),
                        value = child.attribute("name").unwrap_or_default(),
                        "preset_unknown_trait"
                    ),
                },
                "cloth" => {
                    let slot = child.attribute("slot").and_then(WornSlot::parse);
                    match (slot, child.attribute("name")) {
                        (Some(slot), Some(item)) => {
                            preset.clothes.insert(slot, item.to_string());
                        }
                        _ => warn!(path = %path.display(), "preset_bad_cloth_entry"),
                    }
                }
                other => warn!(path = %path.display(), element = other, "preset_unknown_element"),
            }
        }
        Ok(preset)
    }

    pub fn to_xml(&self) -> String {
        let mut xml = format!("<preset name=\"{}\">\n", escape_xml(&self.name));
        for found in &self.traits {
            xml.push_str(&format!("  <trait name=\"{}\"/>\n", found.as_str()));
        }
        for (slot, item) in &self.clothes {
            xml.push_str(&format!(
                "  <cloth slot=\"{}\" name=\"{}\"/>\n",
                slot.as_str(),
                escape_xml(item)
            ));
        }
        xml.push_str("</preset>\n");
        xml
    }

    pub fn load(dir: &Path, name: &str) -> Result<Self, PresetError> {
        let path = preset_path(dir, name)?;
        let raw = fs::read_to_string(&path).map_err(|source| PresetError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&raw, &path)
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf, PresetError> {
        let path = preset_path(dir, &self.name)?;
        let write_error = |source| PresetError::Write {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(dir).map_err(write_error)?;
        fs::write(&path, self.to_xml()).map_err(write_error)?;
        info!(path = %path.display(), "preset_saved");
        Ok(path)
    }

    pub fn apply_traits(&self, player: &mut Player) {
        for found in &self.traits {
            found.apply(player);
        }
    }

    /// Traits plus the listed clothes, created fresh from the registry.
    /// Returns how many pieces were put on.
    pub fn apply(&self, world: &mut GameWorld) -> usize {
        self.apply_traits(&mut world.player);
        let mut worn = 0;
        for (slot, name) in &self.clothes {
            let Some(piece) = world.create_item(name, false) else {
                continue;
            };
            if piece.cloth().map(|cloth| cloth.slot) != Some(*slot) {
                warn!(item = %name, slot = slot.as_str(), "preset_cloth_slot_mismatch");
                continue;
            }
            world.player.worn.insert(*slot, piece);
            worn += 1;
        }
        info!(preset = %self.name, traits = self.traits.len(), worn, "preset_applied");
        worn
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::entity::StatKind;
    use crate::world::test_support::open_room;

    fn survivor() -> Preset {
        Preset {
            name: "Survivor".to_string(),
            traits: vec![Trait::Lucky, Trait::Strong],
            clothes: BTreeMap::from([(WornSlot::Torso, "Jacket".to_string())]),
        }
    }

    #[test]
    fn saved_preset_loads_back() {
        let temp = TempDir::new().expect("temp");
        let path = survivor().save(temp.path()).expect("save");
        assert_eq!(path, temp.path().join("Survivor.xml"));
        let loaded = Preset::load(temp.path(), "Survivor").expect("load");
        assert_eq!(loaded, survivor());
    }

    #[test]
    fn names_are_escaped_in_xml() {
        let preset = Preset {
            name: "A".to_string(),
            traits: Vec::new(),
            clothes: BTreeMap::from([(WornSlot::Head, "Cap \"Lucky\" & Co".to_string())]),
        };
        let xml = preset.to_xml();
        assert!(xml.contains("Cap &quot;Lucky&quot; &amp; Co"));
        let parsed = Preset::parse(&xml, Path::new("a.xml")).expect("parse");
        assert_eq!(parsed, preset);
    }

    #[test]
    fn unknown_entries_are_skipped() {
        let raw = r#"<preset name="Odd">
            <trait name="lucky"/>
            <trait name="telepathic"/>
            <cloth slot="tail" name="Ribbon"/>
            <pet name="Dog"/>
        </preset>"#;
        let preset = Preset::parse(raw, Path::new("odd.xml")).expect("parse");
        assert_eq!(preset.traits, vec![Trait::Lucky]);
        assert!(preset.clothes.is_empty());
    }

    #[test]
    fn wrong_root_and_bad_names_are_errors() {
        let error = Preset::parse("<character/>", Path::new("x.xml")).expect_err("root");
        assert!(matches!(error, PresetError::Malformed { .. }));
        let temp = TempDir::new().expect("temp");
        let error = Preset::load(temp.path(), "../escape").expect_err("name");
        assert!(matches!(error, PresetError::InvalidName(_)));
        let error = Preset::load(temp.path(), "missing").expect_err("missing");
        assert!(matches!(error, PresetError::Read { .. }));
    }

    #[test]
    fn applying_sets_traits_and_wears_clothes() {
        let mut world = open_room();
        let worn = survivor().apply(&mut world);
        assert_eq!(worn, 1);
        assert!((world.player.progression.lucky - 1.25).abs() < f32::EPSILON);
        assert_eq!(world.player.progression.strength.level, 2);
        assert_eq!(
            world.player.worn.get(&WornSlot::Torso).map(|item| item.name.as_str()),
            Some("Jacket")
        );
        assert!(world.player.total_defence() > 0.0);
        assert!(world.player.stats.get(StatKind::Health) > 0.0);
    }
}
