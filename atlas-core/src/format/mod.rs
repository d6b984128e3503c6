//! Byte layout of the tile file.
//!
//! All records are little-endian with 1-byte packing:
//!
//! ```text
//! FileHeader                      version:i64 tile_count:i32            (12 bytes)
//! TileHeaderEntry * tile_count    id:i32 offset:u64                     (12 bytes each, unordered)
//! per tile, at `offset`:
//!   TileBlockHeader               counts and absolute array offsets     (40 bytes)
//!   MapFeature * features_count                                         (29 bytes each)
//!   Coordinate * coordinates_count                                      (16 bytes each)
//!   StringEntry * string_count    offset/length in UTF-16 code units    (8 bytes each)
//!   u16 * characters_count        UTF-16LE character pool
//! ```
//!
//! Each record type derives the `zerocopy` traits so the reader can take
//! bounds-checked typed views straight out of the memory mapping, and the
//! writer can emit the same structs byte for byte.

use std::mem::size_of;

use zerocopy::byteorder::little_endian::{I32, I64, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

mod writer;

pub use writer::{Feature, TileFileStats, TileFileWriteError, encode_tile_file, write_tile_file};

/// Version written into new files. Readers accept any value.
pub const FORMAT_VERSION: i64 = 1;

/// `label_offset` value for features without a label.
pub(crate) const NO_LABEL: i32 = -1;

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub(crate) struct FileHeader {
    pub(crate) version: I64,
    pub(crate) tile_count: I32,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub(crate) struct TileHeaderEntry {
    pub(crate) id: I32,
    pub(crate) offset: U64,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub(crate) struct TileBlockHeader {
    pub(crate) features_count: I32,
    pub(crate) coordinates_count: I32,
    pub(crate) string_count: I32,
    pub(crate) characters_count: I32,
    pub(crate) coordinates_offset: U64,
    pub(crate) strings_offset: U64,
    pub(crate) characters_offset: U64,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub(crate) struct MapFeatureRecord {
    pub(crate) id: I64,
    pub(crate) label_offset: I32,
    pub(crate) geometry_type: u8,
    pub(crate) coordinate_offset: I32,
    pub(crate) coordinate_count: I32,
    pub(crate) properties_offset: I32,
    pub(crate) property_count: I32,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub(crate) struct StringEntry {
    pub(crate) offset: I32,
    pub(crate) length: I32,
}

pub(crate) const FILE_HEADER_SIZE: u64 = size_of::<FileHeader>() as u64;
pub(crate) const TILE_HEADER_ENTRY_SIZE: u64 = size_of::<TileHeaderEntry>() as u64;
pub(crate) const TILE_BLOCK_HEADER_SIZE: u64 = size_of::<TileBlockHeader>() as u64;
pub(crate) const MAP_FEATURE_SIZE: u64 = size_of::<MapFeatureRecord>() as u64;
pub(crate) const COORDINATE_SIZE: u64 = size_of::<crate::Coordinate>() as u64;
pub(crate) const STRING_ENTRY_SIZE: u64 = size_of::<StringEntry>() as u64;
pub(crate) const CHARACTER_SIZE: u64 = 2;

const _: () = assert!(FILE_HEADER_SIZE == 12);
const _: () = assert!(TILE_HEADER_ENTRY_SIZE == 12);
const _: () = assert!(TILE_BLOCK_HEADER_SIZE == 40);
const _: () = assert!(MAP_FEATURE_SIZE == 29);
const _: () = assert!(COORDINATE_SIZE == 16);
const _: () = assert!(STRING_ENTRY_SIZE == 8);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn map_feature_fields_sit_at_packed_offsets() {
        let record = MapFeatureRecord {
            id: I64::new(0x0102_0304_0506_0708),
            label_offset: I32::new(-1),
            geometry_type: 2,
            coordinate_offset: I32::new(3),
            coordinate_count: I32::new(4),
            properties_offset: I32::new(5),
            property_count: I32::new(6),
        };
        let bytes = record.as_bytes();
        assert_eq!(bytes.len(), 29);
        assert_eq!(bytes.get(0..8), Some(&0x0102_0304_0506_0708_i64.to_le_bytes()[..]));
        assert_eq!(bytes.get(8..12), Some(&(-1_i32).to_le_bytes()[..]));
        assert_eq!(bytes.get(12), Some(&2));
        assert_eq!(bytes.get(13..17), Some(&3_i32.to_le_bytes()[..]));
        assert_eq!(bytes.get(17..21), Some(&4_i32.to_le_bytes()[..]));
        assert_eq!(bytes.get(21..25), Some(&5_i32.to_le_bytes()[..]));
        assert_eq!(bytes.get(25..29), Some(&6_i32.to_le_bytes()[..]));
    }

    #[rstest]
    fn tile_header_entry_packs_offset_after_id() {
        let entry = TileHeaderEntry {
            id: I32::new(7),
            offset: U64::new(1 << 40),
        };
        let bytes = entry.as_bytes();
        assert_eq!(bytes.get(0..4), Some(&7_i32.to_le_bytes()[..]));
        assert_eq!(bytes.get(4..12), Some(&(1_u64 << 40).to_le_bytes()[..]));
    }
}
