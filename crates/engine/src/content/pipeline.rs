use std::fs;

use thiserror::Error;
use tracing::{info, warn};

use crate::AppPaths;

use super::compiler::{parse_defs_document, CompiledDef, ContentCompileError, ContentErrorCode};
use super::database::TemplateDatabase;
use super::discovery::{collect_xml_files_sorted, discover_mod_sources};
use super::types::{ContentDiscoveryError, ContentRequest, ContentStatusSummary};

#[derive(Debug, Error)]
pub enum ContentPipelineError {
    #[error(transparent)]
    Discovery(#[from] ContentDiscoveryError),
}

/// Compiles base content and enabled mods into one registry. Later mods
/// override earlier definitions by name; broken files and definitions are
/// logged and skipped.
pub fn build_template_database(
    app_paths: &AppPaths,
    request: &ContentRequest,
) -> Result<(TemplateDatabase, ContentStatusSummary), ContentPipelineError> {
    let sources = discover_mod_sources(app_paths, request)?;
    let mut database = TemplateDatabase::default();
    let mut summary = ContentStatusSummary {
        total_mods: sources.len(),
        ..ContentStatusSummary::default()
    };

    for source in &sources {
        let xml_files = collect_xml_files_sorted(&source.data_dir)?;
        for xml_file in xml_files {
            let raw = match fs::read_to_string(&xml_file) {
                Ok(raw) => raw,
                Err(error) => {
                    log_compile_error(&ContentCompileError {
                        code: ContentErrorCode::ReadFile,
                        message: format!("failed to read XML file: {error}"),
                        mod_id: source.mod_id.clone(),
                        file_path: xml_file.clone(),
                        location: None,
                    });
                    continue;
                }
            };
            summary.files_read += 1;

            let outcome = match parse_defs_document(&source.mod_id, &xml_file, &raw) {
                Ok(outcome) => outcome,
                Err(error) => {
                    log_compile_error(&error);
                    continue;
                }
            };
            summary.defs_skipped += outcome.errors.len();
            for error in &outcome.errors {
                log_compile_error(error);
            }
            for def in outcome.defs {
                summary.defs_loaded += 1;
                match def {
                    CompiledDef::Item(item) => database.insert_item(item),
                    CompiledDef::Zombie(zombie) => database.insert_zombie(zombie),
                    CompiledDef::Tile(tile) => database.insert_tile(tile),
                }
            }
        }
        info!(
            mod_id = %source.mod_id,
            mod_load_index = source.mod_load_index,
            data_dir = %source.data_dir.display(),
            "content_mod_loaded"
        );
    }

    info!(
        items = database.item_count(),
        zombies = database.zombie_count(),
        tiles = database.tile_count(),
        skipped = summary.defs_skipped,
        "content_loaded"
    );
    Ok((database, summary))
}

fn log_compile_error(error: &ContentCompileError) {
    warn!(
        code = ?error.code,
        mod_id = %error.mod_id,
        file = %error.file_path.display(),
        line = error.location.map(|loc| loc.line),
        column = error.location.map(|loc| loc.column),
        message = %error.message,
        "content_definition_skipped"
    );
}
