//! Feature identifiers derived from OSM element ids.
//!
//! Nodes and ways are numbered independently in OSM, so bit 60 of a feature
//! id records which kind the feature came from. Raw ids must be positive
//! and fit in the low 60 bits.

use log::warn;

const WAY_ID_FLAG: i64 = 1 << 60;
const RAW_ID_MASK: i64 = WAY_ID_FLAG - 1;

/// OSM element kind a feature was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureOrigin {
    /// A tagged node.
    Node,
    /// A tagged way.
    Way,
}

/// Feature id for an element, or `None` (with a warning) when the raw id
/// cannot be encoded.
pub(super) fn encode_feature_id(origin: FeatureOrigin, raw_id: i64) -> Option<i64> {
    if !(0..=RAW_ID_MASK).contains(&raw_id) {
        warn!("skipped OSM {origin:?} {raw_id}: id outside 0..={RAW_ID_MASK}");
        return None;
    }
    Some(match origin {
        FeatureOrigin::Node => raw_id,
        FeatureOrigin::Way => WAY_ID_FLAG | raw_id,
    })
}

/// Split a feature id written by the ingester into its origin and raw OSM id.
///
/// # Examples
/// ```rust
/// use atlas_data::ingest::{FeatureOrigin, decode_feature_id};
///
/// assert_eq!(decode_feature_id(42), Some((FeatureOrigin::Node, 42)));
/// assert_eq!(decode_feature_id((1 << 60) | 7), Some((FeatureOrigin::Way, 7)));
/// assert_eq!(decode_feature_id(-1), None);
/// ```
#[must_use]
pub fn decode_feature_id(id: i64) -> Option<(FeatureOrigin, i64)> {
    if id < 0 || id & !(WAY_ID_FLAG | RAW_ID_MASK) != 0 {
        return None;
    }
    let origin = if id & WAY_ID_FLAG == 0 {
        FeatureOrigin::Node
    } else {
        FeatureOrigin::Way
    };
    Some((origin, id & RAW_ID_MASK))
}
