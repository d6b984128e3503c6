//! Error types for PBF framing and block decoding.

use thiserror::Error;

use super::blob::{BlobKind, MAX_BLOB_HEADER_SIZE, MAX_BLOB_SIZE};

/// Error emitted while splitting a PBF stream into blobs.
///
/// Framing errors are fatal to the stream: the reader yields `None` after
/// returning one. `offset` is the byte position of the record that failed.
#[derive(Debug, Error)]
pub enum BlobError {
    /// Reading from the underlying source failed.
    #[error("failed to read PBF stream at byte {offset}: {source}")]
    Io {
        /// Start of the record being read.
        offset: u64,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The declared blob header length reaches the 64 KiB limit.
    #[error("blob header at byte {offset} declares {size} bytes; the limit is {MAX_BLOB_HEADER_SIZE}")]
    HeaderTooLarge {
        /// Start of the record.
        offset: u64,
        /// Declared header length.
        size: u32,
    },
    /// The declared payload size reaches the 32 MiB limit or is negative.
    #[error("blob at byte {offset} declares {size} bytes; the limit is {MAX_BLOB_SIZE}")]
    BlobTooLarge {
        /// Start of the record.
        offset: u64,
        /// Declared payload size.
        size: i64,
    },
    /// The blob declares an inflated size outside `0..MAX_BLOB_SIZE`.
    #[error("blob at byte {offset} declares a raw size of {size} bytes; the limit is {MAX_BLOB_SIZE}")]
    RawSizeOutOfRange {
        /// Start of the record.
        offset: u64,
        /// Declared `raw_size`.
        size: i64,
    },
    /// The blob header names a type other than `OSMHeader` or `OSMData`.
    #[error("blob at byte {offset} has unknown type {kind:?}")]
    UnknownBlobType {
        /// Start of the record.
        offset: u64,
        /// Type string found in the header.
        kind: String,
    },
    /// The payload uses a compression scheme the decoder does not implement.
    #[error("blob at byte {offset} uses unsupported {compression} compression")]
    UnsupportedCompression {
        /// Start of the record.
        offset: u64,
        /// Name of the compression scheme.
        compression: &'static str,
    },
    /// The blob carries no payload at all.
    #[error("blob at byte {offset} contains no data")]
    MissingData {
        /// Start of the record.
        offset: u64,
    },
    /// The stream ended inside a record.
    #[error("PBF stream truncated at byte {offset}: expected {expected} bytes, found {available}")]
    Truncated {
        /// Position where the short read began.
        offset: u64,
        /// Bytes the record declared.
        expected: u64,
        /// Bytes left in the stream.
        available: u64,
    },
    /// A frame message could not be decoded.
    #[error("failed to decode blob frame at byte {offset}: {source}")]
    Decode {
        /// Start of the record.
        offset: u64,
        /// Protobuf decoder error.
        #[source]
        source: prost::DecodeError,
    },
}

/// Error emitted while decoding the contents of a single blob.
///
/// A failed blob yields no elements from the failing group; other blobs are
/// unaffected.
#[derive(Debug, Error)]
pub enum BlockError {
    /// The decompressed payload is not a valid block message.
    #[error("failed to decode block in blob at byte {offset}: {source}")]
    Protobuf {
        /// Start of the blob record.
        offset: u64,
        /// Protobuf decoder error.
        #[source]
        source: prost::DecodeError,
    },
    /// Inflating the zlib payload failed.
    #[error("failed to inflate blob at byte {offset}: {source}")]
    Inflate {
        /// Start of the blob record.
        offset: u64,
        /// Decompressor error.
        #[source]
        source: std::io::Error,
    },
    /// The inflated payload does not have the declared size.
    #[error("blob at byte {offset} inflated to {actual} bytes, expected {expected}")]
    SizeMismatch {
        /// Start of the blob record.
        offset: u64,
        /// Declared `raw_size`.
        expected: usize,
        /// Bytes produced.
        actual: usize,
    },
    /// Inflating produced at least [`MAX_BLOB_SIZE`] bytes.
    #[error("blob at byte {offset} inflates past the {limit} byte limit")]
    InflatedTooLarge {
        /// Start of the blob record.
        offset: u64,
        /// Size limit that was reached.
        limit: i64,
    },
    /// A header was requested from a data blob or vice versa.
    #[error("blob at byte {offset} is {found:?}, expected {expected:?}")]
    UnexpectedKind {
        /// Start of the blob record.
        offset: u64,
        /// Kind the caller asked for.
        expected: BlobKind,
        /// Kind of the blob.
        found: BlobKind,
    },
    /// The header lists a required feature this decoder does not support.
    #[error("unsupported required feature {name:?}")]
    UnsupportedRequiredFeature {
        /// Feature name from the header.
        name: String,
    },
    /// A string id lies outside the block's string table.
    #[error("string index {index} out of range for table of {len} entries")]
    StringIndex {
        /// Requested index.
        index: i64,
        /// Entries in the table.
        len: usize,
    },
    /// A string table entry is not valid UTF-8.
    #[error("string table entry {index} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        /// Entry index.
        index: usize,
        /// UTF-8 decoding error.
        #[source]
        source: std::str::Utf8Error,
    },
    /// A dense node's key/value run has an odd length.
    #[error("dense node {id} has an unpaired tag id")]
    UnpairedTags {
        /// Decoded node id.
        id: i64,
    },
    /// Parallel arrays of one element disagree in length.
    #[error("{what} arrays differ in length: {expected} vs {actual}")]
    MismatchedLengths {
        /// Arrays being compared.
        what: &'static str,
        /// Length of the reference array.
        expected: usize,
        /// Length of the mismatching array.
        actual: usize,
    },
    /// A relation member has a type outside node/way/relation.
    #[error("relation {relation} has a member of unknown type {value}")]
    UnknownMemberType {
        /// Relation id.
        relation: i64,
        /// Raw member type.
        value: i32,
    },
}
