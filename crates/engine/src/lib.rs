use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;

pub use app::{
    run_app, run_app_with_metrics, screen_to_world_px, world_to_screen_px, AppError, DrawCommand,
    DrawList, InputAction, InputSnapshot, LoopConfig, LoopMetricsSnapshot, MetricsHandle, Renderer,
    Scene, SceneCommand, ScreenRect, Vec2, Viewport, SLOW_FRAME_ENV_VAR,
};
pub use content::{
    build_template_database, load_chunk_layers, ChunkCatalog, ChunkDescriptor, ChunkEdges,
    ChunkKey, ChunkLayers, ContentCompileError, ContentDiscoveryError, ContentErrorCode,
    ContentPipelineError, ContentRequest, ContentStatusSummary, EdgeDirection, FiringSpec, Grid,
    ItemTemplate, LoadSpec, LootEntry, MapLoadError, TemplateDatabase, TemplateKind, TileDef,
    TileKind, ValueRange, ZombieTemplate,
};

pub const ROOT_ENV_VAR: &str = "BITROT_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub base_content_dir: PathBuf,
    pub mods_dir: PathBuf,
    pub presets_dir: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: PathBuf) -> Self {
        Self {
            base_content_dir: root.join("assets").join("base"),
            mods_dir: root.join("mods"),
            presets_dir: root.join("presets"),
            root,
        }
    }

    pub fn maps_dir(&self) -> PathBuf {
        self.base_content_dir.join("maps")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("assets").join("config.json")
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "BITROT_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/bitrot\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    resolve_root().map(AppPaths::from_root)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
