use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Default)]
pub struct ContentRequest {
    pub enabled_mods: Vec<String>,
}

impl ContentRequest {
    /// Parses a comma-separated mod list, ignoring blanks.
    pub fn from_mod_list(raw: &str) -> Self {
        Self {
            enabled_mods: raw
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentStatusSummary {
    pub total_mods: usize,
    pub files_read: usize,
    pub defs_loaded: usize,
    pub defs_skipped: usize,
}

#[derive(Debug, Error)]
pub enum ContentDiscoveryError {
    #[error("duplicate enabled mod id in request: {mod_id}")]
    DuplicateEnabledMod { mod_id: String },
    #[error("enabled mod does not exist on disk: {mod_id} at {expected_dir}")]
    EnabledModMissing {
        mod_id: String,
        expected_dir: PathBuf,
    },
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
