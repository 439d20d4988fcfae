use std::path::Path;

use engine::{
    build_template_database, resolve_app_paths, ChunkCatalog, ContentPipelineError,
    ContentRequest, LoopConfig, MapLoadError, Scene, StartupError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::clock::Clock;
use crate::config::GameConfig;
use crate::error::WorldLoadError;
use crate::preset::Preset;
use crate::registry::{Registry, RegistryTuning};
use crate::scene::{BitRotScene, WorldFactory};
use crate::world::{GameWorld, WorldMaps};

const ENABLED_MODS_ENV_VAR: &str = "BITROT_ENABLED_MODS";
const PRESET_ENV_VAR: &str = "BITROT_PRESET";

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Content(#[from] ContentPipelineError),
    #[error(transparent)]
    Maps(#[from] MapLoadError),
    #[error(transparent)]
    World(#[from] WorldLoadError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Bit Rot Startup ===");

    let paths = resolve_app_paths()?;
    let config = GameConfig::load_or_default(&paths.config_path());
    let (templates, _) = build_template_database(&paths, &enabled_mods_from_env())?;
    let registry = Registry::new(templates, RegistryTuning::from_config(&config));
    let maps = WorldMaps::new(ChunkCatalog::discover(&paths.maps_dir())?);
    let preset = preset_from_env(&paths.presets_dir);

    let mut factory = world_factory(config, registry, maps, preset);
    let world = factory()?;
    let scene = BitRotScene::new(world).with_restart(factory);

    Ok(AppWiring {
        config: LoopConfig::default(),
        scene: Box::new(scene),
    })
}

/// Every call builds a new world from the same content. A configured seed
/// makes each run, and each restart, identical.
fn world_factory(
    config: GameConfig,
    registry: Registry,
    maps: WorldMaps,
    preset: Option<Preset>,
) -> WorldFactory {
    Box::new(move || {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut world = GameWorld::new(
            config.clone(),
            registry.clone(),
            maps.clone(),
            Clock::new(),
            rng,
        )?;
        if let Some(preset) = &preset {
            preset.apply(&mut world);
        }
        Ok(world)
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn enabled_mods_from_env() -> ContentRequest {
    std::env::var(ENABLED_MODS_ENV_VAR)
        .map(|raw| ContentRequest::from_mod_list(&raw))
        .unwrap_or_default()
}

fn preset_from_env(presets_dir: &Path) -> Option<Preset> {
    let name = std::env::var(PRESET_ENV_VAR).ok()?;
    match Preset::load(presets_dir, name.trim()) {
        Ok(preset) => Some(preset),
        Err(error) => {
            warn!(error = %error, "preset_load_failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use engine::AppPaths;
    use tempfile::TempDir;

    use super::*;

    const DEFS: &str = r##"<Defs>
        <tile id="#" type="plain" obstacle="true"/>
        <tile id="." type="plain"/>
        <item name="Water Bottle" kind="consumable">
            <load min="1" max="3"/>
            <capacity value="5"/>
            <effect status="water"/>
            <restore min="10" max="20"/>
        </item>
        <cloth name="Jacket" slot="torso" defence="2" speed="0"/>
    </Defs>"##;

    fn write_root(temp: &TempDir) -> AppPaths {
        let paths = AppPaths::from_root(temp.path().to_path_buf());
        let data = paths.base_content_dir.join("data");
        fs::create_dir_all(&data).expect("data dir");
        fs::write(data.join("defs.xml"), DEFS).expect("defs");
        let maps = paths.maps_dir();
        fs::create_dir_all(&maps).expect("maps dir");
        let stem = maps.join("map_L1_P1_0_0_0_0");
        fs::write(
            format!("{}_map.csv", stem.display()),
            "#,#,#,#\n#,,,#\n#,,,#\n#,#,#,#\n",
        )
        .expect("map");
        fs::write(
            format!("{}_ground.csv", stem.display()),
            ".,.,.,.\n.,.,.,.\n.,.,.,.\n.,.,.,.\n",
        )
        .expect("ground");
        fs::write(format!("{}_spawn.csv", stem.display()), ",,,\n,P,,\n,,,\n,,,\n")
            .expect("spawn");
        paths
    }

    #[test]
    fn factory_builds_seeded_worlds_with_the_preset() {
        let temp = TempDir::new().expect("temp");
        let paths = write_root(&temp);
        let config = GameConfig {
            seed: Some(3),
            ..GameConfig::default()
        };
        let (templates, _) =
            build_template_database(&paths, &ContentRequest::default()).expect("content");
        let registry = Registry::new(templates, RegistryTuning::from_config(&config));
        let maps = WorldMaps::new(ChunkCatalog::discover(&paths.maps_dir()).expect("catalog"));
        let preset = Preset::parse(
            r#"<preset name="Runner"><trait name="fast"/><cloth slot="torso" name="Jacket"/></preset>"#,
            Path::new("Runner.xml"),
        )
        .expect("preset");

        let mut factory = world_factory(config, registry, maps, Some(preset));
        let first = factory().expect("world");
        let second = factory().expect("world");
        assert_eq!(first.player.pos, second.player.pos);
        assert_eq!(first.player.worn.len(), 1);
        assert!(first.player.progression.speed > 1.0);
    }
}
