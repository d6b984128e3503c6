//! Facade crate for the atlas tile engine.
//!
//! Re-exports the tile file format, classifier and query engine from
//! `atlas-core`, and the OSM PBF ingestion pipeline from `atlas-data`
//! behind the `ingest` feature.

#![forbid(unsafe_code)]

pub use atlas_core::{
    BoundingBox, Category, Coordinate, Feature, FeatureRecord, GeometryType, TileFile,
    TileFileError, TileFileStats, TileFileWriteError, TileId, classify, write_tile_file,
};

#[cfg(feature = "ingest")]
pub use atlas_data::{
    OsmIngestError, OsmIngestReport, OsmIngestSummary, TileBuildReport, build_tile_file,
    ingest_osm_pbf, ingest_osm_pbf_report,
};
