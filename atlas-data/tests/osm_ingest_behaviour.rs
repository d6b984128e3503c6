//! Behavioural tests for the ingestion entry points.

use std::cell::RefCell;
use std::path::PathBuf;

use atlas_core::{BoundingBox, GeometryType, TileFile};
use atlas_data::pbf::{BlobError, MemberKind};
use atlas_data::test_support::{Payload, PbfFixture, frame};
use atlas_data::{
    OsmIngestError, OsmIngestReport, TileBuildReport, build_tile_file, ingest_osm_pbf_report,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

type IngestOutcome = Option<Result<OsmIngestReport, OsmIngestError>>;
type BuildOutcome = Option<Result<TileBuildReport, OsmIngestError>>;

/// Scratch directory plus the input path chosen by a `Given` step.
#[derive(Default)]
struct Workspace {
    dir: Option<TempDir>,
    input: Option<PathBuf>,
}

impl Workspace {
    fn prepare(&mut self, name: &str, bytes: Option<&[u8]>) {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join(name);
        if let Some(bytes) = bytes {
            std::fs::write(&path, bytes).expect("write extract");
        }
        self.input = Some(path);
        self.dir = Some(dir);
    }

    fn input(&self) -> PathBuf {
        self.input.clone().expect("input prepared")
    }

    fn output(&self) -> PathBuf {
        self.dir
            .as_ref()
            .expect("workspace prepared")
            .path()
            .join("extract.tiles")
    }
}

#[fixture]
fn workspace() -> RefCell<Workspace> {
    RefCell::new(Workspace::default())
}

#[fixture]
fn ingestion() -> RefCell<IngestOutcome> {
    RefCell::new(None)
}

#[fixture]
fn build() -> RefCell<BuildOutcome> {
    RefCell::new(None)
}

fn park_extract() -> Vec<u8> {
    PbfFixture::new()
        .node(1, 48.8500, 2.3500, &[])
        .node(2, 48.8500, 2.3600, &[])
        .node(3, 48.8600, 2.3600, &[])
        .node(4, 48.8600, 2.3500, &[])
        .node(5, 48.8550, 2.3550, &[("shop", "kiosk"), ("name", "Kiosk")])
        .way(
            100,
            &[1, 2, 3, 4, 1],
            &[("leisure", "park"), ("name", "Jardin")],
        )
        .way(101, &[2, 3], &[("highway", "footway")])
        .relation(
            200,
            &[(100, MemberKind::Way, "outer")],
            &[("type", "multipolygon")],
        )
        .blob_per_group()
        .to_bytes()
}

fn report(ingestion: &RefCell<IngestOutcome>) -> OsmIngestReport {
    match ingestion.borrow().as_ref().expect("ingestion attempted") {
        Ok(report) => report.clone(),
        Err(error) => panic!("ingestion failed: {error}"),
    }
}

#[given("an extract with a park, a kiosk and a footpath")]
fn given_park(#[from(workspace)] workspace: &RefCell<Workspace>) {
    workspace
        .borrow_mut()
        .prepare("park.osm.pbf", Some(&park_extract()));
}

#[given("a path to a missing extract")]
fn given_missing(#[from(workspace)] workspace: &RefCell<Workspace>) {
    workspace.borrow_mut().prepare("missing.osm.pbf", None);
}

#[given("an extract containing a Zstd-compressed blob")]
fn given_zstd(#[from(workspace)] workspace: &RefCell<Workspace>) {
    let mut bytes = PbfFixture::new().node(1, 0.0, 0.0, &[]).to_bytes();
    bytes.extend(frame("OSMData", Payload::Zstd(vec![0x28, 0xb5, 0x2f, 0xfd])));
    workspace.borrow_mut().prepare("zstd.osm.pbf", Some(&bytes));
}

#[when("I ingest the extract")]
fn when_ingest(
    #[from(workspace)] workspace: &RefCell<Workspace>,
    #[from(ingestion)] ingestion: &RefCell<IngestOutcome>,
) {
    let input = workspace.borrow().input();
    *ingestion.borrow_mut() = Some(ingest_osm_pbf_report(&input));
}

#[when("I build a tile file from the extract")]
fn when_build(
    #[from(workspace)] workspace: &RefCell<Workspace>,
    #[from(build)] build: &RefCell<BuildOutcome>,
) {
    let (input, output) = {
        let workspace = workspace.borrow();
        (workspace.input(), workspace.output())
    };
    *build.borrow_mut() = Some(build_tile_file(&input, &output));
}

#[then("the summary counts 5 nodes, 2 ways and 1 relation")]
fn then_counts(#[from(ingestion)] ingestion: &RefCell<IngestOutcome>) {
    let summary = report(ingestion).summary;
    assert_eq!(
        (summary.nodes, summary.ways, summary.relations),
        (5, 2, 1)
    );
}

#[then("the report holds a point, a polygon and a polyline")]
fn then_features(#[from(ingestion)] ingestion: &RefCell<IngestOutcome>) {
    let kinds: Vec<GeometryType> = report(ingestion)
        .features
        .iter()
        .map(|feature| feature.geometry_type)
        .collect();
    assert_eq!(
        kinds,
        vec![
            GeometryType::Point,
            GeometryType::Polygon,
            GeometryType::Polyline,
        ]
    );
}

#[then("querying the park returns the kiosk and the park")]
fn then_query(
    #[from(workspace)] workspace: &RefCell<Workspace>,
    #[from(build)] build: &RefCell<BuildOutcome>,
) {
    match build.borrow().as_ref().expect("build attempted") {
        Ok(report) => assert_eq!(report.features, 3),
        Err(error) => panic!("build failed: {error}"),
    }
    let tiles = TileFile::open(workspace.borrow().output()).expect("open tile file");
    let mut labels: Vec<String> = tiles
        .features_in(&BoundingBox::new(48.84, 2.34, 48.87, 2.37))
        .expect("query tile file")
        .into_iter()
        .filter_map(|feature| feature.label)
        .collect();
    labels.sort();
    assert_eq!(labels, vec!["Jardin".to_owned(), "Kiosk".to_owned()]);
}

#[then("an open error is returned")]
fn then_open_error(#[from(ingestion)] ingestion: &RefCell<IngestOutcome>) {
    let borrowed = ingestion.borrow();
    match borrowed.as_ref().expect("ingestion attempted") {
        Err(OsmIngestError::Open { path, .. }) => {
            assert!(path.ends_with("missing.osm.pbf"), "unexpected path {path:?}");
        }
        other => panic!("expected an open error, got {other:?}"),
    }
}

#[then("a read error is returned")]
fn then_read_error(#[from(ingestion)] ingestion: &RefCell<IngestOutcome>) {
    let borrowed = ingestion.borrow();
    let outcome = borrowed.as_ref().expect("ingestion attempted");
    assert!(
        matches!(
            outcome,
            Err(OsmIngestError::Read {
                source: BlobError::UnsupportedCompression { .. },
                ..
            })
        ),
        "unexpected outcome: {outcome:?}"
    );
}

#[scenario(path = "tests/features/osm_ingest.feature", index = 0)]
fn scenario_summary(
    workspace: RefCell<Workspace>,
    ingestion: RefCell<IngestOutcome>,
    build: RefCell<BuildOutcome>,
) {
    let _ = (workspace, ingestion, build);
}

#[scenario(path = "tests/features/osm_ingest.feature", index = 1)]
fn scenario_build(
    workspace: RefCell<Workspace>,
    ingestion: RefCell<IngestOutcome>,
    build: RefCell<BuildOutcome>,
) {
    let _ = (workspace, ingestion, build);
}

#[scenario(path = "tests/features/osm_ingest.feature", index = 2)]
fn scenario_missing(
    workspace: RefCell<Workspace>,
    ingestion: RefCell<IngestOutcome>,
    build: RefCell<BuildOutcome>,
) {
    let _ = (workspace, ingestion, build);
}

#[scenario(path = "tests/features/osm_ingest.feature", index = 3)]
fn scenario_zstd(
    workspace: RefCell<Workspace>,
    ingestion: RefCell<IngestOutcome>,
    build: RefCell<BuildOutcome>,
) {
    let _ = (workspace, ingestion, build);
}
