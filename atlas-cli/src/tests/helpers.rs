//! Scratch extracts shared by the CLI tests.

use atlas_data::test_support::PbfFixture;
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// Temporary directory holding a small extract near the Louvre.
///
/// The extract has three nodes, one of them a named cafe, and a footway
/// between the two untagged nodes.
pub(super) struct ExtractFiles {
    _dir: TempDir,
    root: Utf8PathBuf,
    extract: Utf8PathBuf,
}

impl ExtractFiles {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        let extract = root.join("louvre.osm.pbf");
        PbfFixture::new()
            .node(1, 48.8606, 2.3376, &[("amenity", "cafe"), ("name", "Café Marly")])
            .node(2, 48.8610, 2.3360, &[])
            .node(3, 48.8615, 2.3390, &[])
            .way(10, &[2, 3], &[("highway", "footway")])
            .write_to(extract.as_std_path())
            .expect("write extract");
        Self {
            _dir: dir,
            root,
            extract,
        }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn extract(&self) -> &Utf8Path {
        &self.extract
    }

    pub(super) fn output(&self) -> Utf8PathBuf {
        self.root.join("tiles").join("louvre.tiles")
    }
}
