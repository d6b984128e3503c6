//! Synthetic PBF files for tests.
//!
//! The helpers encode protobuf messages directly and compress them with
//! zlib, so tests need no binary fixtures. They are gated behind the
//! `test-support` feature (and `cfg(test)`).

use std::{collections::HashMap, fs, io::Write, path::Path};

use flate2::{Compression, write::ZlibEncoder};
use prost::Message;

use crate::pbf::MemberKind;
use crate::pbf::proto::{self, blob::Data};

/// Payload encoding for [`frame`].
#[derive(Debug, Clone)]
pub enum Payload {
    /// Uncompressed bytes.
    Raw(Vec<u8>),
    /// Bytes to be zlib-compressed; `raw_size` is recorded.
    Zlib(Vec<u8>),
    /// Bytes stored under the Zstd field, which the decoder rejects.
    Zstd(Vec<u8>),
    /// A blob with no data field set.
    Missing,
}

/// Frame one blob record: length prefix, `BlobHeader`, `Blob`.
///
/// # Examples
/// ```rust
/// use atlas_data::pbf::BlobReader;
/// use atlas_data::test_support::{Payload, frame};
///
/// let bytes = frame("OSMData", Payload::Raw(vec![1, 2, 3]));
/// let blob = BlobReader::new(bytes.as_slice()).next().expect("one blob").expect("valid blob");
/// assert_eq!(blob.payload(), &[1, 2, 3]);
/// ```
#[must_use]
pub fn frame(blob_type: &str, payload: Payload) -> Vec<u8> {
    let (raw_size, data) = match payload {
        Payload::Raw(bytes) => (None, Some(Data::Raw(bytes))),
        Payload::Zlib(bytes) => (
            Some(i32::try_from(bytes.len()).expect("payload fits i32")),
            Some(Data::ZlibData(zlib(&bytes))),
        ),
        Payload::Zstd(bytes) => (None, Some(Data::ZstdData(bytes))),
        Payload::Missing => (None, None),
    };
    let blob = proto::Blob { raw_size, data }.encode_to_vec();
    let header = proto::BlobHeader {
        r#type: blob_type.to_owned(),
        datasize: i32::try_from(blob.len()).expect("blob fits i32"),
    }
    .encode_to_vec();
    let mut out = Vec::with_capacity(4 + header.len() + blob.len());
    out.extend_from_slice(&u32::try_from(header.len()).expect("header fits u32").to_be_bytes());
    out.extend_from_slice(&header);
    out.extend_from_slice(&blob);
    out
}

/// Compress `bytes` with zlib.
#[must_use]
pub fn zlib(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("write to memory");
    encoder.finish().expect("finish zlib stream")
}

#[derive(Debug, Clone)]
struct FixtureNode {
    id: i64,
    lat: f64,
    lon: f64,
    tags: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct FixtureWay {
    id: i64,
    refs: Vec<i64>,
    tags: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct FixtureRelation {
    id: i64,
    members: Vec<(i64, MemberKind, String)>,
    tags: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Nodes,
    Ways,
    Relations,
    ChangeSets,
}

/// Builder for a small PBF extract.
///
/// The file holds one header blob followed by data blobs. Nodes are written
/// as a dense run when there is more than one of them and as a plain node
/// otherwise. Coordinates use the default granularity of 100 nanodegrees.
///
/// # Examples
/// ```rust
/// use atlas_data::test_support::PbfFixture;
///
/// let bytes = PbfFixture::new()
///     .node(1, 52.5, 13.4, &[("amenity", "cafe")])
///     .node(2, 52.6, 13.5, &[])
///     .way(10, &[1, 2], &[("highway", "residential")])
///     .to_bytes();
/// assert!(!bytes.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct PbfFixture {
    required_features: Vec<String>,
    optional_features: Vec<String>,
    nodes: Vec<FixtureNode>,
    ways: Vec<FixtureWay>,
    relations: Vec<FixtureRelation>,
    changesets: Vec<i64>,
    compressed: bool,
    blob_per_group: bool,
}

impl Default for PbfFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl PbfFixture {
    /// Empty extract requiring `OsmSchema-V0.6` and `DenseNodes`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            required_features: vec!["OsmSchema-V0.6".to_owned(), "DenseNodes".to_owned()],
            optional_features: Vec::new(),
            nodes: Vec::new(),
            ways: Vec::new(),
            relations: Vec::new(),
            changesets: Vec::new(),
            compressed: true,
            blob_per_group: false,
        }
    }

    /// Add a required header feature.
    #[must_use]
    pub fn required_feature(mut self, name: &str) -> Self {
        self.required_features.push(name.to_owned());
        self
    }

    /// Add an optional header feature.
    #[must_use]
    pub fn optional_feature(mut self, name: &str) -> Self {
        self.optional_features.push(name.to_owned());
        self
    }

    /// Add a node.
    #[must_use]
    pub fn node(mut self, id: i64, lat: f64, lon: f64, tags: &[(&str, &str)]) -> Self {
        self.nodes.push(FixtureNode {
            id,
            lat,
            lon,
            tags: owned(tags),
        });
        self
    }

    /// Add a way over existing or missing node ids.
    #[must_use]
    pub fn way(mut self, id: i64, refs: &[i64], tags: &[(&str, &str)]) -> Self {
        self.ways.push(FixtureWay {
            id,
            refs: refs.to_vec(),
            tags: owned(tags),
        });
        self
    }

    /// Add a relation.
    #[must_use]
    pub fn relation(
        mut self,
        id: i64,
        members: &[(i64, MemberKind, &str)],
        tags: &[(&str, &str)],
    ) -> Self {
        self.relations.push(FixtureRelation {
            id,
            members: members
                .iter()
                .map(|(member, kind, role)| (*member, *kind, (*role).to_owned()))
                .collect(),
            tags: owned(tags),
        });
        self
    }

    /// Add a changeset.
    #[must_use]
    pub fn changeset(mut self, id: i64) -> Self {
        self.changesets.push(id);
        self
    }

    /// Store blobs uncompressed.
    #[must_use]
    pub const fn uncompressed(mut self) -> Self {
        self.compressed = false;
        self
    }

    /// Put each element kind in its own data blob.
    #[must_use]
    pub const fn blob_per_group(mut self) -> Self {
        self.blob_per_group = true;
        self
    }

    /// Encode the extract.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.wrap("OSMHeader", self.header_block().encode_to_vec());
        let parts: Vec<Part> = [
            (Part::Nodes, !self.nodes.is_empty()),
            (Part::Ways, !self.ways.is_empty()),
            (Part::Relations, !self.relations.is_empty()),
            (Part::ChangeSets, !self.changesets.is_empty()),
        ]
        .into_iter()
        .filter_map(|(part, present)| present.then_some(part))
        .collect();
        if self.blob_per_group {
            for part in parts {
                out.extend(self.wrap("OSMData", self.block(&[part]).encode_to_vec()));
            }
        } else if !parts.is_empty() {
            out.extend(self.wrap("OSMData", self.block(&parts).encode_to_vec()));
        }
        out
    }

    /// Encode the extract into `path`.
    ///
    /// # Errors
    /// Returns the I/O error raised while writing.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        fs::write(path, self.to_bytes())
    }

    fn wrap(&self, blob_type: &str, bytes: Vec<u8>) -> Vec<u8> {
        let payload = if self.compressed {
            Payload::Zlib(bytes)
        } else {
            Payload::Raw(bytes)
        };
        frame(blob_type, payload)
    }

    fn header_block(&self) -> proto::HeaderBlock {
        proto::HeaderBlock {
            bbox: None,
            required_features: self.required_features.clone(),
            optional_features: self.optional_features.clone(),
            writingprogram: Some("atlas-test".to_owned()),
            source: None,
        }
    }

    fn block(&self, parts: &[Part]) -> proto::PrimitiveBlock {
        let mut strings = Strings::default();
        let mut groups = Vec::new();
        for part in parts {
            let mut group = proto::PrimitiveGroup::default();
            match part {
                Part::Nodes => self.encode_nodes(&mut strings, &mut group),
                Part::Ways => {
                    group.ways = self
                        .ways
                        .iter()
                        .map(|way| {
                            let (keys, vals) = strings.tags(&way.tags);
                            proto::Way {
                                id: way.id,
                                keys,
                                vals,
                                refs: delta_encode(way.refs.iter().copied()),
                            }
                        })
                        .collect();
                }
                Part::Relations => {
                    group.relations = self
                        .relations
                        .iter()
                        .map(|relation| {
                            let (keys, vals) = strings.tags(&relation.tags);
                            proto::Relation {
                                id: relation.id,
                                keys,
                                vals,
                                roles_sid: relation
                                    .members
                                    .iter()
                                    .map(|(_, _, role)| strings.signed(role))
                                    .collect(),
                                memids: delta_encode(relation.members.iter().map(|(id, _, _)| *id)),
                                types: relation
                                    .members
                                    .iter()
                                    .map(|(_, kind, _)| member_type(*kind) as i32)
                                    .collect(),
                            }
                        })
                        .collect();
                }
                Part::ChangeSets => {
                    group.changesets = self
                        .changesets
                        .iter()
                        .map(|id| proto::ChangeSet { id: *id })
                        .collect();
                }
            }
            groups.push(group);
        }
        proto::PrimitiveBlock {
            stringtable: proto::StringTable { s: strings.entries },
            primitivegroup: groups,
            granularity: None,
            date_granularity: None,
            lat_offset: None,
            lon_offset: None,
        }
    }

    fn encode_nodes(&self, strings: &mut Strings, group: &mut proto::PrimitiveGroup) {
        if let [node] = self.nodes.as_slice() {
            let (keys, vals) = strings.tags(&node.tags);
            group.nodes.push(proto::Node {
                id: node.id,
                keys,
                vals,
                lat: raw_coordinate(node.lat),
                lon: raw_coordinate(node.lon),
            });
            return;
        }
        let mut keys_vals = Vec::new();
        for node in &self.nodes {
            for (key, value) in &node.tags {
                keys_vals.push(strings.signed(key));
                keys_vals.push(strings.signed(value));
            }
            keys_vals.push(0);
        }
        group.dense = Some(proto::DenseNodes {
            id: delta_encode(self.nodes.iter().map(|node| node.id)),
            lat: delta_encode(self.nodes.iter().map(|node| raw_coordinate(node.lat))),
            lon: delta_encode(self.nodes.iter().map(|node| raw_coordinate(node.lon))),
            keys_vals,
        });
    }
}

#[derive(Debug)]
struct Strings {
    index: HashMap<String, u32>,
    entries: Vec<Vec<u8>>,
}

impl Default for Strings {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: vec![Vec::new()],
        }
    }
}

impl Strings {
    fn id(&mut self, value: &str) -> u32 {
        if let Some(id) = self.index.get(value) {
            return *id;
        }
        let id = u32::try_from(self.entries.len()).expect("string table fits u32");
        self.entries.push(value.as_bytes().to_vec());
        self.index.insert(value.to_owned(), id);
        id
    }

    fn signed(&mut self, value: &str) -> i32 {
        i32::try_from(self.id(value)).expect("string id fits i32")
    }

    fn tags(&mut self, tags: &[(String, String)]) -> (Vec<u32>, Vec<u32>) {
        tags.iter()
            .map(|(key, value)| (self.id(key), self.id(value)))
            .unzip()
    }
}

fn owned(tags: &[(&str, &str)]) -> Vec<(String, String)> {
    tags.iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

fn delta_encode(values: impl Iterator<Item = i64>) -> Vec<i64> {
    values
        .scan(0_i64, |previous, value| {
            let delta = value - *previous;
            *previous = value;
            Some(delta)
        })
        .collect()
}

/// Degrees to units of the default 100-nanodegree granularity.
fn raw_coordinate(degrees: f64) -> i64 {
    (degrees * 1e7).round() as i64
}

const fn member_type(kind: MemberKind) -> proto::MemberType {
    match kind {
        MemberKind::Node => proto::MemberType::Node,
        MemberKind::Way => proto::MemberType::Way,
        MemberKind::Relation => proto::MemberType::Relation,
    }
}
