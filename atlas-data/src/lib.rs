//! OSM PBF decoding and ingestion for the atlas engine.
//!
//! Responsibilities:
//! - Frame and decode `.osm.pbf` extracts ([`pbf`]).
//! - Turn decoded elements into tile-file features and element summaries
//!   ([`ingest`]).
//!
//! Boundaries:
//! - Feature classification and the tile file format live in `atlas-core`.
//! - Decoding is synchronous; parallelism comes from the rayon pool.
//!
//! Invariants:
//! - No global mutable state.
//! - Blobs are decoded independently; a corrupt blob never yields partial
//!   elements.

pub mod ingest;
pub mod pbf;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use ingest::{
    OsmIngestError, OsmIngestReport, OsmIngestSummary, TileBuildReport, build_tile_file,
    ingest_osm_pbf, ingest_osm_pbf_report,
};
