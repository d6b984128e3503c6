//! Decoded OSM primitives.

/// A node with its position in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// OSM node id.
    pub id: i64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Tags in stored order.
    pub tags: Vec<(String, String)>,
}

/// An ordered list of node references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Way {
    /// OSM way id.
    pub id: i64,
    /// Tags in stored order.
    pub tags: Vec<(String, String)>,
    /// Referenced node ids, delta-decoded.
    pub node_ids: Vec<i64>,
}

/// Element kind referenced by a relation member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Member is a node.
    Node,
    /// Member is a way.
    Way,
    /// Member is another relation.
    Relation,
}

/// One member of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Referenced element id, delta-decoded.
    pub id: i64,
    /// Role string, possibly empty.
    pub role: String,
    /// Referenced element kind.
    pub kind: MemberKind,
}

/// A group of members with tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// OSM relation id.
    pub id: i64,
    /// Tags in stored order.
    pub tags: Vec<(String, String)>,
    /// Members in stored order.
    pub members: Vec<Member>,
}

/// A changeset record. Only its id is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSet {
    /// Changeset id.
    pub id: i64,
}

/// Any primitive a group can yield.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Plain or dense node.
    Node(Node),
    /// Way.
    Way(Way),
    /// Relation.
    Relation(Relation),
    /// Changeset.
    ChangeSet(ChangeSet),
}

impl Element {
    /// Element id.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Node(node) => node.id,
            Self::Way(way) => way.id,
            Self::Relation(relation) => relation.id,
            Self::ChangeSet(changeset) => changeset.id,
        }
    }

    /// Element tags; changesets have none.
    #[must_use]
    pub fn tags(&self) -> &[(String, String)] {
        match self {
            Self::Node(node) => &node.tags,
            Self::Way(way) => &way.tags,
            Self::Relation(relation) => &relation.tags,
            Self::ChangeSet(_) => &[],
        }
    }
}
