//! Primitive blocks and their groups.

use std::slice;

use log::trace;

use super::blob::{Blob, BlobKind};
use super::dense::DenseNodeIter;
use super::element::{ChangeSet, Element, Member, MemberKind, Node, Relation, Way};
use super::error::BlockError;
use super::nanodegrees_to_degrees;
use super::proto::{self, MemberType};
use super::strings::StringTable;

/// Decoded `OSMData` block: coordinate scaling, string table and groups.
#[derive(Debug, Clone)]
pub struct PrimitiveBlock {
    strings: StringTable,
    groups: Vec<proto::PrimitiveGroup>,
    granularity: i64,
    date_granularity: i64,
    lat_offset: i64,
    lon_offset: i64,
}

impl PrimitiveBlock {
    /// Inflate and decode the block carried by `blob`.
    ///
    /// # Errors
    /// Returns [`BlockError::UnexpectedKind`] for header blobs and a decoding
    /// error for corrupt payloads.
    pub fn decode(blob: &Blob) -> Result<Self, BlockError> {
        let message: proto::PrimitiveBlock = blob.decode_message(BlobKind::Primitive)?;
        let granularity = i64::from(message.granularity());
        let date_granularity = i64::from(message.date_granularity());
        let lat_offset = message.lat_offset();
        let lon_offset = message.lon_offset();
        trace!(
            "decoded block at byte {} with {} groups",
            blob.offset(),
            message.primitivegroup.len()
        );
        Ok(Self {
            strings: StringTable::new(message.stringtable.s),
            groups: message.primitivegroup,
            granularity,
            date_granularity,
            lat_offset,
            lon_offset,
        })
    }

    /// Coordinate resolution in nanodegrees (default 100).
    #[must_use]
    pub const fn granularity(&self) -> i64 {
        self.granularity
    }

    /// Timestamp resolution in milliseconds (default 1000).
    #[must_use]
    pub const fn date_granularity(&self) -> i64 {
        self.date_granularity
    }

    /// Latitude offset in nanodegrees.
    #[must_use]
    pub const fn lat_offset(&self) -> i64 {
        self.lat_offset
    }

    /// Longitude offset in nanodegrees.
    #[must_use]
    pub const fn lon_offset(&self) -> i64 {
        self.lon_offset
    }

    /// The block's string table.
    #[must_use]
    pub const fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// Groups in stored order.
    pub fn groups(&self) -> impl ExactSizeIterator<Item = PrimitiveGroup<'_>> {
        self.groups.iter().map(|group| PrimitiveGroup::new(self, group))
    }

    /// Decode every element of every group.
    ///
    /// # Errors
    /// Returns the first [`BlockError`] met; no elements are returned in
    /// that case.
    pub fn elements(&self) -> Result<Vec<Element>, BlockError> {
        let mut elements = Vec::new();
        for group in self.groups() {
            elements.extend(group.decode_all()?);
        }
        Ok(elements)
    }

    /// Latitude in degrees of a raw stored value.
    #[must_use]
    pub fn latitude(&self, raw: i64) -> f64 {
        scale(self.lat_offset, self.granularity, raw)
    }

    /// Longitude in degrees of a raw stored value.
    #[must_use]
    pub fn longitude(&self, raw: i64) -> f64 {
        scale(self.lon_offset, self.granularity, raw)
    }

    fn node(&self, node: &proto::Node) -> Result<Node, BlockError> {
        Ok(Node {
            id: node.id,
            latitude: self.latitude(node.lat),
            longitude: self.longitude(node.lon),
            tags: self.strings.resolve_pairs(&node.keys, &node.vals, "node tag")?,
        })
    }

    fn way(&self, way: &proto::Way) -> Result<Way, BlockError> {
        Ok(Way {
            id: way.id,
            tags: self.strings.resolve_pairs(&way.keys, &way.vals, "way tag")?,
            node_ids: delta_decode(&way.refs),
        })
    }

    fn relation(&self, relation: &proto::Relation) -> Result<Relation, BlockError> {
        let expected = relation.memids.len();
        for (what, actual) in [
            ("relation role", relation.roles_sid.len()),
            ("relation member type", relation.types.len()),
        ] {
            if actual != expected {
                return Err(BlockError::MismatchedLengths {
                    what,
                    expected,
                    actual,
                });
            }
        }
        let members = delta_decode(&relation.memids)
            .into_iter()
            .zip(relation.roles_sid.iter().zip(&relation.types))
            .map(|(id, (&role, &kind))| -> Result<Member, BlockError> {
                Ok(Member {
                    id,
                    role: self.strings.get(i64::from(role))?.to_owned(),
                    kind: member_kind(relation.id, kind)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Relation {
            id: relation.id,
            tags: self
                .strings
                .resolve_pairs(&relation.keys, &relation.vals, "relation tag")?,
            members,
        })
    }
}

fn scale(offset: i64, granularity: i64, raw: i64) -> f64 {
    nanodegrees_to_degrees(offset.saturating_add(granularity.saturating_mul(raw)))
}

fn delta_decode(deltas: &[i64]) -> Vec<i64> {
    deltas
        .iter()
        .scan(0_i64, |current, delta| {
            *current = current.wrapping_add(*delta);
            Some(*current)
        })
        .collect()
}

fn member_kind(relation: i64, raw: i32) -> Result<MemberKind, BlockError> {
    match MemberType::try_from(raw) {
        Ok(MemberType::Node) => Ok(MemberKind::Node),
        Ok(MemberType::Way) => Ok(MemberKind::Way),
        Ok(MemberType::Relation) => Ok(MemberKind::Relation),
        Err(_) => Err(BlockError::UnknownMemberType {
            relation,
            value: raw,
        }),
    }
}

/// Element kind held by a primitive group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// Plain nodes.
    Nodes,
    /// A dense node run.
    DenseNodes,
    /// Ways.
    Ways,
    /// Relations.
    Relations,
    /// Changesets.
    ChangeSets,
    /// Nothing recognisable; yields no elements.
    Unknown,
}

/// A homogeneous collection of elements within a block.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveGroup<'a> {
    block: &'a PrimitiveBlock,
    group: &'a proto::PrimitiveGroup,
    kind: GroupKind,
}

impl<'a> PrimitiveGroup<'a> {
    fn new(block: &'a PrimitiveBlock, group: &'a proto::PrimitiveGroup) -> Self {
        // A group holds one kind only; the first populated array decides.
        let kind = if !group.nodes.is_empty() {
            GroupKind::Nodes
        } else if !group.ways.is_empty() {
            GroupKind::Ways
        } else if !group.relations.is_empty() {
            GroupKind::Relations
        } else if !group.changesets.is_empty() {
            GroupKind::ChangeSets
        } else if group.dense.as_ref().is_some_and(|dense| dense.id.len() > 1) {
            GroupKind::DenseNodes
        } else {
            GroupKind::Unknown
        };
        Self { block, group, kind }
    }

    /// Element kind of the group.
    #[must_use]
    pub const fn kind(&self) -> GroupKind {
        self.kind
    }

    /// Number of elements the group yields.
    #[must_use]
    pub fn len(&self) -> usize {
        match self.kind {
            GroupKind::Nodes => self.group.nodes.len(),
            GroupKind::DenseNodes => self.group.dense.as_ref().map_or(0, |dense| dense.id.len()),
            GroupKind::Ways => self.group.ways.len(),
            GroupKind::Relations => self.group.relations.len(),
            GroupKind::ChangeSets => self.group.changesets.len(),
            GroupKind::Unknown => 0,
        }
    }

    /// Whether the group yields no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazily decode the group's elements in stored order.
    #[must_use]
    pub fn elements(&self) -> Elements<'a> {
        let source = match self.kind {
            GroupKind::Nodes => Source::Nodes(self.group.nodes.iter()),
            GroupKind::DenseNodes => self
                .group
                .dense
                .as_ref()
                .map_or(Source::Empty, |dense| Source::Dense(DenseNodeIter::new(self.block, dense))),
            GroupKind::Ways => Source::Ways(self.group.ways.iter()),
            GroupKind::Relations => Source::Relations(self.group.relations.iter()),
            GroupKind::ChangeSets => Source::ChangeSets(self.group.changesets.iter()),
            GroupKind::Unknown => Source::Empty,
        };
        Elements {
            block: self.block,
            source,
        }
    }

    /// Decode the whole group, or nothing if any element fails.
    ///
    /// # Errors
    /// Returns the first [`BlockError`] raised by an element.
    pub fn decode_all(&self) -> Result<Vec<Element>, BlockError> {
        self.elements().collect()
    }
}

/// Lazy element sequence of one [`PrimitiveGroup`].
pub struct Elements<'a> {
    block: &'a PrimitiveBlock,
    source: Source<'a>,
}

enum Source<'a> {
    Nodes(slice::Iter<'a, proto::Node>),
    Dense(DenseNodeIter<'a>),
    Ways(slice::Iter<'a, proto::Way>),
    Relations(slice::Iter<'a, proto::Relation>),
    ChangeSets(slice::Iter<'a, proto::ChangeSet>),
    Empty,
}

impl Iterator for Elements<'_> {
    type Item = Result<Element, BlockError>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.block;
        match &mut self.source {
            Source::Nodes(nodes) => nodes.next().map(|node| block.node(node).map(Element::Node)),
            Source::Dense(dense) => dense.next().map(|node| node.map(Element::Node)),
            Source::Ways(ways) => ways.next().map(|way| block.way(way).map(Element::Way)),
            Source::Relations(relations) => relations
                .next()
                .map(|relation| block.relation(relation).map(Element::Relation)),
            Source::ChangeSets(changesets) => changesets
                .next()
                .map(|changeset| Ok(Element::ChangeSet(ChangeSet { id: changeset.id }))),
            Source::Empty => None,
        }
    }
}

impl Blob {
    /// Decode this blob as an `OSMData` block.
    ///
    /// # Errors
    /// See [`PrimitiveBlock::decode`].
    pub fn decode_primitive(&self) -> Result<PrimitiveBlock, BlockError> {
        PrimitiveBlock::decode(self)
    }
}
