//! Streaming decoder for OpenStreetMap PBF extracts.
//!
//! Decoding happens in three layers:
//!
//! 1. [`BlobReader`] frames the byte stream into [`Blob`]s, enforcing the
//!    format's size limits and rejecting unsupported compression.
//! 2. [`Blob::decode_header`] and [`Blob::decode_primitive`] inflate the
//!    payload and decode a [`HeaderBlock`] or [`PrimitiveBlock`].
//! 3. [`PrimitiveGroup::elements`] yields typed [`Element`]s, resolving tags
//!    through the block's [`StringTable`] and undoing delta coding.
//!
//! Blobs are independent of each other, so callers may decode them on
//! separate threads once framed.

mod blob;
mod block;
mod dense;
mod element;
mod error;
mod header;
pub(crate) mod proto;
mod strings;

pub use blob::{Blob, BlobKind, BlobReader, MAX_BLOB_HEADER_SIZE, MAX_BLOB_SIZE};
pub use block::{Elements, GroupKind, PrimitiveBlock, PrimitiveGroup};
pub use element::{ChangeSet, Element, Member, MemberKind, Node, Relation, Way};
pub use error::{BlobError, BlockError};
pub use header::{HeaderBlock, HeaderFeature};
pub use strings::StringTable;

const NANODEGREE: f64 = 1e-9;

/// Convert a coordinate in nanodegrees to degrees.
#[expect(
    clippy::cast_precision_loss,
    reason = "valid coordinates stay below 2^53 nanodegrees, where f64 is exact"
)]
fn nanodegrees_to_degrees(nanodegrees: i64) -> f64 {
    nanodegrees as f64 * NANODEGREE
}

#[cfg(test)]
mod tests {
    use super::nanodegrees_to_degrees;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0.0)]
    #[case(13_405_000_000, 13.405)]
    #[case(-180_000_000_000, -180.0)]
    fn converts_nanodegrees(#[case] raw: i64, #[case] degrees: f64) {
        assert!((nanodegrees_to_degrees(raw) - degrees).abs() < 1e-12);
    }
}
