use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse config json at {json_path}: {message}")]
    Parse { json_path: String, message: String },
}

/// Per-second physiology rates applied during the stats step of a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysiologyConfig {
    pub water_decay: f32,
    pub food_decay: f32,
    pub tireness_gain: f32,
    pub stamina_regen: f32,
    pub anxiety_day_drift: f32,
    pub anxiety_night_drift: f32,
    pub anxiety_chased_gain: f32,
    pub starvation_damage: f32,
    pub infection_growth: f32,
    pub infection_damage_per_10: f32,
    pub health_regen: f32,
    pub auto_drink_threshold: f32,
    pub utility_drain_per_tick: f32,
}

impl Default for PhysiologyConfig {
    fn default() -> Self {
        Self {
            water_decay: 0.12,
            food_decay: 0.08,
            tireness_gain: 0.03,
            stamina_regen: 6.0,
            anxiety_day_drift: -0.2,
            anxiety_night_drift: 0.1,
            anxiety_chased_gain: 1.0,
            starvation_damage: 0.5,
            infection_growth: 0.15,
            infection_damage_per_10: 0.05,
            health_regen: 0.1,
            auto_drink_threshold: 20.0,
            utility_drain_per_tick: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub tile_size: f32,
    pub spawn_cell_size: f32,
    pub seed: Option<u64>,
    pub start_chunk: u32,
    pub player_speed: f32,
    pub day_duration_ms: u64,
    pub night_duration_ms: u64,
    pub transition_duration_ms: u64,
    pub day_view_radius_tiles: f32,
    pub night_view_radius_tiles: f32,
    pub day_ambient: u8,
    pub night_ambient: u8,
    pub zombie_detection_radius_tiles: f32,
    pub zombie_wander_interval_ms: u64,
    pub zombie_attack_cooldown_ms: u64,
    pub zombie_respawn_interval_ms: i64,
    pub max_zombies: usize,
    pub corpse_decay_ms: u64,
    /// Expiring corpses leave their contents on the ground.
    pub spill_corpses_on_decay: bool,
    pub reload_ticks: u32,
    pub layer_switch_cooldown_ticks: u32,
    pub drop_cooldown_ticks: u32,
    pub durability_multiplier: f32,
    pub weapon_durability_multiplier: f32,
    pub tool_durability_multiplier: f32,
    pub spawn_multiplier: f32,
    pub line_of_sight: bool,
    pub drag_threshold_px: f32,
    pub melee_stamina_cost: f32,
    pub projectile_speed: f32,
    pub physiology: PhysiologyConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_size: 32.0,
            spawn_cell_size: 512.0,
            seed: None,
            start_chunk: 1,
            player_speed: 2.5,
            day_duration_ms: 300_000,
            night_duration_ms: 180_000,
            transition_duration_ms: 20_000,
            day_view_radius_tiles: 14.0,
            night_view_radius_tiles: 5.0,
            day_ambient: 255,
            night_ambient: 60,
            zombie_detection_radius_tiles: 8.0,
            zombie_wander_interval_ms: 4_000,
            zombie_attack_cooldown_ms: 500,
            zombie_respawn_interval_ms: 120_000,
            max_zombies: 60,
            corpse_decay_ms: 300_000,
            spill_corpses_on_decay: false,
            reload_ticks: 90,
            layer_switch_cooldown_ticks: 30,
            drop_cooldown_ticks: 10,
            durability_multiplier: 1.0,
            weapon_durability_multiplier: 1.0,
            tool_durability_multiplier: 1.0,
            spawn_multiplier: 1.0,
            line_of_sight: true,
            drag_threshold_px: 5.0,
            melee_stamina_cost: 8.0,
            projectile_speed: 14.0,
            physiology: PhysiologyConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn parse_json(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize::<_, GameConfig>(&mut deserializer).map_err(|error| {
            let json_path = error.path().to_string();
            ConfigError::Parse {
                json_path,
                message: error.into_inner().to_string(),
            }
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_json(&raw)
    }

    /// Missing file means defaults; a broken file is reported and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.is_file() {
            info!(path = %path.display(), "config_default");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                info!(path = %path.display(), "config_loaded");
                config
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "config_invalid_using_defaults");
                Self::default()
            }
        }
    }

    pub fn interaction_radius_px(&self) -> f32 {
        self.tile_size * 1.5
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = GameConfig::parse_json(r#"{"tile_size": 16, "physiology": {"water_decay": 1.0}}"#)
            .expect("parse");
        assert_eq!(config.tile_size, 16.0);
        assert_eq!(config.physiology.water_decay, 1.0);
        assert_eq!(config.physiology.food_decay, 0.08);
        assert_eq!(config.reload_ticks, 90);
    }

    #[test]
    fn parse_error_reports_json_path() {
        let err = GameConfig::parse_json(r#"{"physiology": {"food_decay": "fast"}}"#)
            .expect_err("bad type");
        match err {
            ConfigError::Parse { json_path, .. } => assert_eq!(json_path, "physiology.food_decay"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("config.json");
        fs::write(&path, "{not json").expect("write");
        assert_eq!(GameConfig::load_or_default(&path), GameConfig::default());
        assert_eq!(
            GameConfig::load_or_default(&temp.path().join("missing.json")),
            GameConfig::default()
        );
    }
}
