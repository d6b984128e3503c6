//! Per-worker state for turning decoded elements into features.
//!
//! Each blob is folded into its own accumulator; accumulators are merged
//! afterwards. Ways may reference nodes decoded by another worker, so node
//! references that no accumulator could resolve stay pending until a second
//! pass over the file looks them up.

use std::collections::{HashMap, HashSet};

use atlas_core::{Coordinate, Feature, GeometryType};
use log::warn;

use super::ids::{FeatureOrigin, encode_feature_id};
use super::tags::{has_descriptive_tags, label_of};
use super::{OsmIngestReport, OsmIngestSummary};
use crate::pbf::{Element, Node, Way};

#[derive(Debug, Default)]
pub(super) struct FeatureAccumulator {
    summary: OsmIngestSummary,
    nodes: HashMap<i64, Coordinate>,
    pending_way_nodes: HashSet<i64>,
    points: Vec<Feature>,
    way_candidates: Vec<WayCandidate>,
}

impl FeatureAccumulator {
    pub(super) fn process_element(&mut self, element: Element) {
        match element {
            Element::Node(node) => self.process_node(node),
            Element::Way(way) => self.process_way(way),
            Element::Relation(_) => self.summary.record_relation(),
            Element::ChangeSet(_) => self.summary.record_changeset(),
        }
    }

    fn process_node(&mut self, node: Node) {
        self.summary.record_node(node.longitude, node.latitude);
        let Some(location) = validated_coordinate(node.longitude, node.latitude) else {
            self.pending_way_nodes.remove(&node.id);
            return;
        };

        let is_feature = has_descriptive_tags(&node.tags);
        let was_pending = self.pending_way_nodes.remove(&node.id);
        if !is_feature && !was_pending {
            return;
        }
        self.nodes.insert(node.id, location);

        if is_feature && let Some(id) = encode_feature_id(FeatureOrigin::Node, node.id) {
            self.points
                .push(feature(id, GeometryType::Point, vec![location], node.tags));
        }
    }

    fn process_way(&mut self, way: Way) {
        self.summary.record_way();
        if !has_descriptive_tags(&way.tags) {
            return;
        }
        let Some(id) = encode_feature_id(FeatureOrigin::Way, way.id) else {
            return;
        };
        for node_id in &way.node_ids {
            if !self.nodes.contains_key(node_id) {
                self.pending_way_nodes.insert(*node_id);
            }
        }
        self.way_candidates.push(WayCandidate {
            id,
            node_refs: way.node_ids,
            tags: way.tags,
        });
    }

    pub(super) fn combine(mut self, other: Self) -> Self {
        self.summary = self.summary.combine(other.summary);
        for (id, location) in other.nodes {
            self.nodes.entry(id).or_insert(location);
        }
        self.points.extend(other.points);
        self.way_candidates.extend(other.way_candidates);
        self.pending_way_nodes.extend(other.pending_way_nodes);
        self.pending_way_nodes
            .retain(|node_id| !self.nodes.contains_key(node_id));
        self
    }

    pub(super) fn has_pending_nodes(&self) -> bool {
        !self.pending_way_nodes.is_empty()
    }

    pub(super) const fn pending_way_nodes(&self) -> &HashSet<i64> {
        &self.pending_way_nodes
    }

    /// Record coordinates found by a resolution pass.
    pub(super) fn resolve_pending_nodes(&mut self, found: HashMap<i64, Coordinate>) {
        for (id, location) in found {
            if self.pending_way_nodes.remove(&id) {
                self.nodes.insert(id, location);
            }
        }
    }

    pub(super) fn into_report(self) -> OsmIngestReport {
        let mut features = self.points;
        let mut skipped_ways = 0_u64;
        for candidate in self.way_candidates {
            let coordinates: Option<Vec<Coordinate>> = candidate
                .node_refs
                .iter()
                .map(|node_id| self.nodes.get(node_id).copied())
                .collect();
            match coordinates {
                Some(coordinates) if !coordinates.is_empty() => {
                    let geometry_type = way_geometry(&candidate.node_refs);
                    features.push(feature(
                        candidate.id,
                        geometry_type,
                        coordinates,
                        candidate.tags,
                    ));
                }
                _ => skipped_ways += 1,
            }
        }
        if skipped_ways > 0 {
            warn!("skipped {skipped_ways} ways referencing nodes without coordinates");
        }
        features.sort_by_key(|feature| feature.id);
        OsmIngestReport {
            summary: self.summary,
            features,
            skipped_ways,
        }
    }
}

#[derive(Debug)]
struct WayCandidate {
    id: i64,
    node_refs: Vec<i64>,
    tags: Vec<(String, String)>,
}

/// Closed rings of at least four references are areas; everything else is
/// a line.
fn way_geometry(node_refs: &[i64]) -> GeometryType {
    match (node_refs.first(), node_refs.last()) {
        (Some(first), Some(last)) if node_refs.len() >= 4 && first == last => GeometryType::Polygon,
        _ => GeometryType::Polyline,
    }
}

fn feature(
    id: i64,
    geometry_type: GeometryType,
    coordinates: Vec<Coordinate>,
    tags: Vec<(String, String)>,
) -> Feature {
    let mut feature = Feature::new(id, geometry_type, coordinates);
    feature.label = label_of(&tags).map(str::to_owned);
    feature.properties = tags;
    feature
}

pub(super) fn validated_coordinate(lon: f64, lat: f64) -> Option<Coordinate> {
    (lon.is_finite()
        && lat.is_finite()
        && (-180.0..=180.0).contains(&lon)
        && (-90.0..=90.0).contains(&lat))
    .then(|| Coordinate::new(lat, lon))
}
