//! Parallel ingestion of OSM PBF extracts into tile-file features.
//!
//! Blobs are framed sequentially and decoded on the rayon pool; each worker
//! owns its blob, inflated buffer and string table, and folds the decoded
//! elements into a private accumulator. Accumulators are merged once all
//! blobs are done.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use atlas_core::{Coordinate, Feature, TileFileStats, TileFileWriteError, write_tile_file};
use geo::{Coord, Rect};
use log::{debug, warn};
use rayon::iter::{ParallelBridge, ParallelIterator};
use thiserror::Error;

use crate::pbf::{Blob, BlobError, BlobKind, BlobReader, BlockError, Element};

mod accumulator;
mod ids;
mod tags;

use accumulator::{FeatureAccumulator, validated_coordinate};
pub use ids::{FeatureOrigin, decode_feature_id};

/// Summary of raw OSM elements discovered during ingestion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OsmIngestSummary {
    /// Number of nodes discovered, including dense-node entries.
    pub nodes: u64,
    /// Number of ways discovered.
    pub ways: u64,
    /// Number of relations discovered.
    pub relations: u64,
    /// Number of changesets discovered.
    pub changesets: u64,
    /// Bounding box covering all valid node coordinates, if any.
    /// Coordinates are WGS84 with `x = longitude`, `y = latitude`.
    pub bounds: Option<Rect<f64>>,
}

impl OsmIngestSummary {
    fn combine(mut self, other: Self) -> Self {
        self.nodes += other.nodes;
        self.ways += other.ways;
        self.relations += other.relations;
        self.changesets += other.changesets;
        if let Some(bounds) = other.bounds {
            self.include_bounds(bounds);
        }
        self
    }

    fn include_bounds(&mut self, bounds: Rect<f64>) {
        match &mut self.bounds {
            Some(existing) => {
                let min = Coord {
                    x: existing.min().x.min(bounds.min().x),
                    y: existing.min().y.min(bounds.min().y),
                };
                let max = Coord {
                    x: existing.max().x.max(bounds.max().x),
                    y: existing.max().y.max(bounds.max().y),
                };
                *existing = Rect::new(min, max);
            }
            None => self.bounds = Some(bounds),
        }
    }

    fn record(&mut self, element: &Element) {
        match element {
            Element::Node(node) => self.record_node(node.longitude, node.latitude),
            Element::Way(_) => self.record_way(),
            Element::Relation(_) => self.record_relation(),
            Element::ChangeSet(_) => self.record_changeset(),
        }
    }

    fn record_node(&mut self, lon: f64, lat: f64) {
        self.nodes += 1;
        if let Some(location) = validated_coordinate(lon, lat) {
            let point = Coord::from(location);
            self.include_bounds(Rect::new(point, point));
        }
    }

    fn record_way(&mut self) {
        self.ways += 1;
    }

    fn record_relation(&mut self) {
        self.relations += 1;
    }

    fn record_changeset(&mut self) {
        self.changesets += 1;
    }
}

/// Detailed report of an OSM ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct OsmIngestReport {
    /// Element counts and bounding box information.
    pub summary: OsmIngestSummary,
    /// Features derived from tagged nodes and ways, ordered by id.
    pub features: Vec<Feature>,
    /// Tagged ways dropped because a referenced node had no coordinates.
    pub skipped_ways: u64,
}

/// Outcome of [`build_tile_file`].
#[derive(Debug, Clone, PartialEq)]
pub struct TileBuildReport {
    /// Element counts of the input.
    pub summary: OsmIngestSummary,
    /// Features handed to the writer.
    pub features: usize,
    /// Tagged ways dropped during ingestion.
    pub skipped_ways: u64,
    /// Shape of the written tile file.
    pub tiles: TileFileStats,
}

/// Errors returned when ingesting an OSM PBF file.
#[derive(Debug, Error)]
pub enum OsmIngestError {
    /// The input file could not be opened.
    #[error("failed to open OSM PBF file at {path:?}")]
    Open {
        /// Input path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The blob stream is malformed.
    #[error("failed to read OSM PBF blobs from {path:?}")]
    Read {
        /// Input path.
        path: PathBuf,
        /// Framing error.
        #[source]
        source: BlobError,
    },
    /// A blob could not be decoded.
    #[error("failed to decode OSM PBF data in {path:?}")]
    Decode {
        /// Input path.
        path: PathBuf,
        /// Block decoding error.
        #[source]
        source: BlockError,
    },
    /// Writing the tile file failed.
    #[error("failed to write tile file")]
    Write {
        /// Writer error, carrying the output path where relevant.
        #[source]
        source: TileFileWriteError,
    },
}

/// Parallel OSM PBF ingestion that summarises the raw element counts.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
/// use atlas_data::ingest_osm_pbf;
///
/// # fn main() -> Result<(), atlas_data::OsmIngestError> {
/// let summary = ingest_osm_pbf(Path::new("planet.osm.pbf"))?;
/// println!("Nodes: {}", summary.nodes);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Returns [`OsmIngestError`] when the file cannot be opened, framed or
/// decoded.
pub fn ingest_osm_pbf(path: &Path) -> Result<OsmIngestSummary, OsmIngestError> {
    fold_blobs(
        path,
        |summary: &mut OsmIngestSummary, element| summary.record(&element),
        OsmIngestSummary::combine,
    )
}

/// Ingest an OSM PBF file, producing both counts and derived features.
///
/// Tagged nodes become points. Tagged ways become polygons when closed
/// (first and last reference equal, at least four references) and polylines
/// otherwise. The `name` tag is used as the label and every tag is kept as a
/// property. Relations are counted only.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
/// use atlas_data::ingest_osm_pbf_report;
///
/// # fn main() -> Result<(), atlas_data::OsmIngestError> {
/// let report = ingest_osm_pbf_report(Path::new("berlin.osm.pbf"))?;
/// println!("Derived {} features", report.features.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Returns [`OsmIngestError`] when the file cannot be opened, framed or
/// decoded.
pub fn ingest_osm_pbf_report(path: &Path) -> Result<OsmIngestReport, OsmIngestError> {
    let mut accumulator = fold_blobs(
        path,
        FeatureAccumulator::process_element,
        FeatureAccumulator::combine,
    )?;

    if accumulator.has_pending_nodes() {
        let pending = accumulator.pending_way_nodes();
        debug!(
            "resolving {} way node references in a second pass",
            pending.len()
        );
        let found = resolve_nodes(path, pending)?;
        accumulator.resolve_pending_nodes(found);
        if accumulator.has_pending_nodes() {
            warn!(
                "{} way node references have no coordinates",
                accumulator.pending_way_nodes().len()
            );
        }
    }

    Ok(accumulator.into_report())
}

/// Ingest `input` and write its features as a tile file at `output`.
///
/// # Errors
/// Returns [`OsmIngestError`] when ingestion fails or the tile file cannot
/// be written.
pub fn build_tile_file(input: &Path, output: &Path) -> Result<TileBuildReport, OsmIngestError> {
    let report = ingest_osm_pbf_report(input)?;
    let tiles = write_tile_file(output, &report.features)
        .map_err(|source| OsmIngestError::Write { source })?;
    debug!(
        "built {} from {} features of {}",
        output.display(),
        report.features.len(),
        input.display()
    );
    Ok(TileBuildReport {
        summary: report.summary,
        features: report.features.len(),
        skipped_ways: report.skipped_ways,
        tiles,
    })
}

fn resolve_nodes(
    path: &Path,
    pending: &HashSet<i64>,
) -> Result<HashMap<i64, Coordinate>, OsmIngestError> {
    fold_blobs(
        path,
        |found: &mut HashMap<i64, Coordinate>, element| {
            if let Element::Node(node) = element
                && pending.contains(&node.id)
                && let Some(location) = validated_coordinate(node.longitude, node.latitude)
            {
                found.insert(node.id, location);
            }
        },
        |mut left, right| {
            left.extend(right);
            left
        },
    )
}

/// Decode every blob of `path` in parallel, folding elements into one
/// accumulator per blob and merging the results.
fn fold_blobs<A, F, C>(path: &Path, process: F, combine: C) -> Result<A, OsmIngestError>
where
    A: Default + Send,
    F: Fn(&mut A, Element) + Sync + Send,
    C: Fn(A, A) -> A + Sync + Send,
{
    let reader = BlobReader::from_path(path).map_err(|source| OsmIngestError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    reader
        .par_bridge()
        .map(|blob| {
            let blob = blob.map_err(|source| OsmIngestError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let elements = decode_blob(&blob).map_err(|source| OsmIngestError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
            let mut accumulator = A::default();
            for element in elements {
                process(&mut accumulator, element);
            }
            Ok(accumulator)
        })
        .try_reduce(A::default, |left, right| Ok(combine(left, right)))
}

fn decode_blob(blob: &Blob) -> Result<Vec<Element>, BlockError> {
    match blob.kind() {
        BlobKind::Header => {
            let header = blob.decode_header()?;
            debug!(
                "PBF header written by {}",
                header.writing_program.as_deref().unwrap_or("an unknown program")
            );
            Ok(Vec::new())
        }
        BlobKind::Primitive => blob.decode_primitive()?.elements(),
    }
}
