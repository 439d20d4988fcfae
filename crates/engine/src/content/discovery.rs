use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::AppPaths;

use super::types::{ContentDiscoveryError, ContentRequest};

pub(crate) const DATA_DIR_NAME: &str = "data";

#[derive(Debug, Clone)]
pub(crate) struct ModSource {
    pub mod_id: String,
    pub mod_load_index: u32,
    pub data_dir: PathBuf,
}

/// Base content always loads first; enabled mods follow in request order.
pub(crate) fn discover_mod_sources(
    app_paths: &AppPaths,
    request: &ContentRequest,
) -> Result<Vec<ModSource>, ContentDiscoveryError> {
    let mut seen = HashSet::<String>::new();
    let mut sources = vec![ModSource {
        mod_id: "base".to_string(),
        mod_load_index: 0,
        data_dir: app_paths.base_content_dir.join(DATA_DIR_NAME),
    }];

    for mod_id in &request.enabled_mods {
        let trimmed = mod_id.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !seen.insert(trimmed.to_string()) {
            return Err(ContentDiscoveryError::DuplicateEnabledMod {
                mod_id: trimmed.to_string(),
            });
        }
        let mod_dir = app_paths.mods_dir.join(trimmed);
        if !mod_dir.is_dir() {
            return Err(ContentDiscoveryError::EnabledModMissing {
                mod_id: trimmed.to_string(),
                expected_dir: mod_dir,
            });
        }
        sources.push(ModSource {
            mod_id: trimmed.to_string(),
            mod_load_index: sources.len() as u32,
            data_dir: mod_dir.join(DATA_DIR_NAME),
        });
    }

    Ok(sources)
}

/// Lists `*.xml` files under `root` in a stable, path-sorted order.
/// A missing directory yields an empty list.
pub(crate) fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ContentDiscoveryError> {
    let mut files = Vec::<PathBuf>::new();
    if root.is_dir() {
        collect_recursive(root, &mut files)?;
    }
    files.sort_by_key(|path| {
        normalize_rel_path(path.strip_prefix(root).unwrap_or(path.as_path()))
    });
    Ok(files)
}

fn collect_recursive(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), ContentDiscoveryError> {
    let entries = fs::read_dir(current).map_err(|source| ContentDiscoveryError::ReadDir {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ContentDiscoveryError::ReadDir {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(&path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            files.push(path);
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn app_paths(root: &Path) -> AppPaths {
        AppPaths {
            root: root.to_path_buf(),
            base_content_dir: root.join("assets").join("base"),
            mods_dir: root.join("mods"),
            presets_dir: root.join("presets"),
        }
    }

    #[test]
    fn base_is_first_then_enabled_order() {
        let temp = TempDir::new().expect("tempdir");
        let app = app_paths(temp.path());
        fs::create_dir_all(&app.base_content_dir).expect("create base");
        fs::create_dir_all(app.mods_dir.join("b")).expect("create mod b");
        fs::create_dir_all(app.mods_dir.join("a")).expect("create mod a");
        let request = ContentRequest::from_mod_list("b, a,");

        let sources = discover_mod_sources(&app, &request).expect("discover");
        let ids = sources.iter().map(|s| s.mod_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["base", "b", "a"]);
        assert_eq!(sources[2].mod_load_index, 2);
        assert!(sources[0].data_dir.ends_with(Path::new("base").join("data")));
    }

    #[test]
    fn missing_mod_is_reported() {
        let temp = TempDir::new().expect("tempdir");
        let app = app_paths(temp.path());
        let err = discover_mod_sources(&app, &ContentRequest::from_mod_list("ghost"))
            .expect_err("missing");
        assert!(matches!(err, ContentDiscoveryError::EnabledModMissing { .. }));
    }

    #[test]
    fn duplicate_mod_is_reported() {
        let temp = TempDir::new().expect("tempdir");
        let app = app_paths(temp.path());
        fs::create_dir_all(app.mods_dir.join("a")).expect("create mod a");
        let err = discover_mod_sources(&app, &ContentRequest::from_mod_list("a,a"))
            .expect_err("duplicate");
        assert!(matches!(err, ContentDiscoveryError::DuplicateEnabledMod { .. }));
    }

    #[test]
    fn xml_files_are_sorted_and_missing_dir_is_empty() {
        let temp = TempDir::new().expect("tempdir");
        let root = temp.path().join("data");
        fs::create_dir_all(root.join("nested")).expect("mkdir");
        fs::write(root.join("zeta.xml"), "<Defs/>").expect("write");
        fs::write(root.join("nested").join("alpha.xml"), "<Defs/>").expect("write");
        fs::write(root.join("notes.txt"), "skip").expect("write");

        let files = collect_xml_files_sorted(&root).expect("collect");
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with(Path::new("nested").join("alpha.xml")));

        let empty = collect_xml_files_sorted(&temp.path().join("nope")).expect("collect");
        assert!(empty.is_empty());
    }
}
