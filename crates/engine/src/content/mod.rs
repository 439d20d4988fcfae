mod compiler;
mod database;
mod discovery;
mod maps;
mod pipeline;
mod types;

pub use compiler::{ContentCompileError, ContentErrorCode, SourceLocation};
pub use database::{
    FiringSpec, ItemTemplate, LoadSpec, LootEntry, TemplateDatabase, TemplateKind, TileDef,
    TileKind, ValueRange, ZombieTemplate,
};
pub use maps::{
    load_chunk_layers, parse_csv_grid, read_csv_grid, ChunkCatalog, ChunkDescriptor, ChunkEdges,
    ChunkKey, ChunkLayers, EdgeDirection, Grid, MapLoadError,
};
pub use pipeline::{build_template_database, ContentPipelineError};
pub use types::{ContentDiscoveryError, ContentRequest, ContentStatusSummary};
