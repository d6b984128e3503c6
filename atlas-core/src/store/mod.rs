//! Memory-mapped, read-only access to a tile file.
//!
//! [`TileFile`] validates the file header and tile directory once when it is
//! opened. Queries then walk the tiles overlapping a bounding box and hand
//! borrowed [`FeatureRecord`]s to a visitor without copying coordinates or
//! text out of the mapping. Every offset read from the file is bounds-checked
//! before use; corrupt data surfaces as [`TileFileError`].

use std::{
    collections::HashSet,
    fmt,
    fs::File,
    path::{Path, PathBuf},
};

use log::{debug, trace};
use memmap2::Mmap;
use thiserror::Error;
use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::category::classify;
use crate::format::{FileHeader, MapFeatureRecord, StringEntry, TileBlockHeader, TileHeaderEntry};
use crate::tiles::{TileId, tiles_for_bbox};
use crate::{BoundingBox, Coordinate, GeometryType};

mod record;

pub use record::{FeatureRecord, Properties, Utf16Text};

const FILE_HEADER_LEN: usize = size_of::<FileHeader>();
const TILE_BLOCK_HEADER_LEN: usize = size_of::<TileBlockHeader>();

/// Error emitted when opening or querying a tile file.
#[derive(Debug, Error)]
pub enum TileFileError {
    /// The file could not be opened.
    #[error("failed to open tile file {path}: {source}")]
    Open {
        /// Location of the tile file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file could not be memory-mapped.
    #[error("failed to map tile file {path}: {source}")]
    Map {
        /// Location of the tile file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A structure extends past the end of the file.
    #[error("{what} at byte {offset} ({length} bytes) exceeds file length {file_length}")]
    OutOfBounds {
        /// Structure being read.
        what: &'static str,
        /// Absolute start of the structure.
        offset: u64,
        /// Bytes required.
        length: u64,
        /// Bytes available in the file.
        file_length: u64,
    },
    /// A count field held a negative value.
    #[error("negative {what} count {value}")]
    NegativeCount {
        /// Field being read.
        what: &'static str,
        /// Raw value.
        value: i32,
    },
    /// The directory lists the same tile twice.
    #[error("tile {id} appears more than once in the directory")]
    DuplicateTile {
        /// Repeated tile id.
        id: TileId,
    },
    /// A feature's coordinate slice lies outside its tile.
    #[error(
        "feature {feature} of tile {tile} references coordinates {offset}+{count} of {available}"
    )]
    CoordinateRange {
        /// Tile holding the feature.
        tile: TileId,
        /// Index of the feature within the tile.
        feature: usize,
        /// Stored coordinate offset.
        offset: i32,
        /// Stored coordinate count.
        count: i32,
        /// Coordinates in the tile.
        available: usize,
    },
    /// A feature's property pairs lie outside the string table.
    #[error(
        "feature {feature} of tile {tile} references property pairs {offset}+{count} beyond {available} strings"
    )]
    PropertyRange {
        /// Tile holding the feature.
        tile: TileId,
        /// Index of the feature within the tile.
        feature: usize,
        /// Stored property offset, in pairs.
        offset: i32,
        /// Stored property count.
        count: i32,
        /// Strings in the tile.
        available: usize,
    },
    /// A property key was addressed at an odd string index.
    #[error("property key at odd string index {index} in tile {tile}")]
    MisalignedProperty {
        /// Tile holding the feature.
        tile: TileId,
        /// Offending string index.
        index: i64,
    },
    /// A string index lies outside the string table.
    #[error("string index {index} out of range for {available} strings in tile {tile}")]
    StringIndex {
        /// Tile holding the string.
        tile: TileId,
        /// Offending index.
        index: i64,
        /// Strings in the tile.
        available: usize,
    },
    /// A string entry points outside the character pool.
    #[error(
        "string {index} of tile {tile} spans characters {offset}+{length} of {available}"
    )]
    CharacterRange {
        /// Tile holding the string.
        tile: TileId,
        /// String index.
        index: usize,
        /// Stored character offset.
        offset: i32,
        /// Stored length in code units.
        length: i32,
        /// Code units in the pool.
        available: usize,
    },
    /// A feature used an unknown geometry discriminant.
    #[error("feature {feature} of tile {tile} has unknown geometry type {value}")]
    InvalidGeometryType {
        /// Tile holding the feature.
        tile: TileId,
        /// Index of the feature within the tile.
        feature: usize,
        /// Raw discriminant.
        value: u8,
    },
}

/// Read-only tile file backed by a memory mapping.
///
/// The type is generic over the byte source so tests and embedders can
/// query in-memory images; [`TileFile::open`] yields the mapped form.
/// Queries take `&self`, so a `TileFile` can be shared across threads.
///
/// # Examples
/// ```
/// use atlas_core::{BoundingBox, Coordinate, Feature, GeometryType, TileFile, encode_tile_file};
///
/// let cafe = Feature::new(1, GeometryType::Point, vec![Coordinate::new(48.85, 2.35)])
///     .with_label("Café")
///     .with_property("amenity", "cafe");
/// let image = encode_tile_file(&[cafe]).expect("encode");
/// let tiles = TileFile::from_bytes(image).expect("valid image");
///
/// let mut labels = Vec::new();
/// tiles
///     .for_each_feature(&BoundingBox::new(48.0, 2.0, 49.0, 3.0), |feature| {
///         labels.push(feature.label.to_string());
///         true
///     })
///     .expect("query");
/// assert_eq!(labels, ["Café"]);
/// ```
pub struct TileFile<B = Mmap> {
    bytes: B,
    version: i64,
    tile_count: usize,
    path: Option<PathBuf>,
}

impl<B> fmt::Debug for TileFile<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileFile")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("tile_count", &self.tile_count)
            .finish_non_exhaustive()
    }
}

impl TileFile<Mmap> {
    /// Map the file at `path` and validate its header and directory.
    ///
    /// # Errors
    /// Returns [`TileFileError::Open`] or [`TileFileError::Map`] when the file
    /// is unavailable, and a format error when the header or directory is
    /// malformed.
    #[expect(unsafe_code, reason = "memory mapping a file is inherently unsafe")]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TileFileError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TileFileError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        // SAFETY: the mapping is read-only. Tile files are written once and
        // must not be truncated or rewritten while a reader has them mapped.
        let map = unsafe { Mmap::map(&file) }.map_err(|source| TileFileError::Map {
            path: path.to_path_buf(),
            source,
        })?;
        let mut tiles = Self::from_bytes(map)?;
        debug!(
            "opened tile file {} (version {}, {} tiles)",
            path.display(),
            tiles.version,
            tiles.tile_count
        );
        tiles.path = Some(path.to_path_buf());
        Ok(tiles)
    }
}

impl<B: AsRef<[u8]>> TileFile<B> {
    /// Validate an in-memory tile file image.
    ///
    /// # Errors
    /// Returns a format error when the header or directory is malformed or a
    /// tile id repeats.
    pub fn from_bytes(bytes: B) -> Result<Self, TileFileError> {
        let data = bytes.as_ref();
        let header: &FileHeader = read_record(data, 0, "file header")?;
        let version = header.version.get();
        let tile_count = count(header.tile_count.get(), "tile")?;
        let directory = read_slice::<TileHeaderEntry>(data, FILE_HEADER_LEN as u64, tile_count, "tile directory")?;

        let mut seen = HashSet::with_capacity(tile_count);
        if let Some(entry) = directory.iter().find(|entry| !seen.insert(entry.id.get())) {
            return Err(TileFileError::DuplicateTile {
                id: entry.id.get(),
            });
        }

        Ok(Self {
            bytes,
            version,
            tile_count,
            path: None,
        })
    }

    /// Format version stored in the header.
    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }

    /// Number of tiles listed in the directory.
    #[must_use]
    pub const fn tile_count(&self) -> usize {
        self.tile_count
    }

    /// Path the file was opened from, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Visit every feature with at least one coordinate inside `bbox`.
    ///
    /// Tiles are visited in ascending id order. Within a tile features are
    /// visited in stored order; returning `false` from the visitor skips the
    /// rest of the current tile and the query moves on to the next one. A
    /// feature spanning several tiles is reported once per tile that stores
    /// it.
    ///
    /// # Errors
    /// Returns a [`TileFileError`] describing the first malformed structure
    /// met while walking the overlapping tiles.
    pub fn for_each_feature<'a, F>(&'a self, bbox: &BoundingBox, mut visitor: F) -> Result<(), TileFileError>
    where
        F: FnMut(FeatureRecord<'a>) -> bool,
    {
        let directory = self.directory()?;
        for tile_id in tiles_for_bbox(bbox) {
            let Some(entry) = directory.iter().find(|entry| entry.id.get() == tile_id) else {
                trace!("tile {tile_id} not present");
                continue;
            };
            let tile = TileView::read(self.bytes.as_ref(), tile_id, entry.offset.get())?;
            tile.visit(bbox, &mut visitor)?;
        }
        Ok(())
    }

    /// Collect owned copies of every feature inside `bbox`.
    ///
    /// # Errors
    /// Propagates errors from [`TileFile::for_each_feature`].
    pub fn features_in(&self, bbox: &BoundingBox) -> Result<Vec<crate::Feature>, TileFileError> {
        let mut features = Vec::new();
        self.for_each_feature(bbox, |record| {
            features.push(record.to_feature());
            true
        })?;
        Ok(features)
    }

    fn directory(&self) -> Result<&[TileHeaderEntry], TileFileError> {
        read_slice(self.bytes.as_ref(), FILE_HEADER_LEN as u64, self.tile_count, "tile directory")
    }
}

/// Typed views over one tile block.
struct TileView<'a> {
    id: TileId,
    features: &'a [MapFeatureRecord],
    coordinates: &'a [Coordinate],
    strings: &'a [StringEntry],
    characters: &'a [U16],
}

impl<'a> TileView<'a> {
    fn read(data: &'a [u8], id: TileId, offset: u64) -> Result<Self, TileFileError> {
        let header: &TileBlockHeader = read_record(data, offset, "tile header")?;
        let features_count = count(header.features_count.get(), "feature")?;
        let coordinates_count = count(header.coordinates_count.get(), "coordinate")?;
        let string_count = count(header.string_count.get(), "string")?;
        let characters_count = count(header.characters_count.get(), "character")?;
        Ok(Self {
            id,
            features: read_slice(data, offset + TILE_BLOCK_HEADER_LEN as u64, features_count, "feature records")?,
            coordinates: read_slice(data, header.coordinates_offset.get(), coordinates_count, "coordinates")?,
            strings: read_slice(data, header.strings_offset.get(), string_count, "string entries")?,
            characters: read_slice(data, header.characters_offset.get(), characters_count, "characters")?,
        })
    }

    fn visit<F>(&self, bbox: &BoundingBox, visitor: &mut F) -> Result<(), TileFileError>
    where
        F: FnMut(FeatureRecord<'a>) -> bool,
    {
        for (index, feature) in self.features.iter().enumerate() {
            let coordinates = self.coordinates_of(index, feature)?;
            if !coordinates.iter().any(|coordinate| bbox.contains(coordinate)) {
                continue;
            }
            let raw_type = feature.geometry_type;
            let geometry_type =
                GeometryType::try_from(raw_type).map_err(|value| TileFileError::InvalidGeometryType {
                    tile: self.id,
                    feature: index,
                    value,
                })?;
            let label_offset = feature.label_offset.get();
            let label = if label_offset >= 0 {
                self.string(i64::from(label_offset))?
            } else {
                Utf16Text::default()
            };
            let properties = self.properties_of(index, feature)?;
            let category = classify(&properties, geometry_type);
            let record = FeatureRecord {
                id: feature.id.get(),
                geometry_type,
                label,
                coordinates,
                properties,
                category,
            };
            if !visitor(record) {
                trace!("visitor stopped early in tile {}", self.id);
                break;
            }
        }
        Ok(())
    }

    fn coordinates_of(&self, index: usize, feature: &MapFeatureRecord) -> Result<&'a [Coordinate], TileFileError> {
        let offset = feature.coordinate_offset.get();
        let count = feature.coordinate_count.get();
        let range = usize::try_from(offset)
            .ok()
            .zip(usize::try_from(count).ok())
            .and_then(|(start, len)| Some(start..start.checked_add(len)?));
        range
            .and_then(|range| self.coordinates.get(range))
            .ok_or(TileFileError::CoordinateRange {
                tile: self.id,
                feature: index,
                offset,
                count,
                available: self.coordinates.len(),
            })
    }

    fn properties_of(&self, index: usize, feature: &MapFeatureRecord) -> Result<Properties<'a>, TileFileError> {
        let offset = feature.properties_offset.get();
        let count = feature.property_count.get();
        let start = i64::from(offset) * 2;
        let end = start + i64::from(count) * 2;
        let in_range = offset >= 0
            && count >= 0
            && usize::try_from(end).is_ok_and(|end| end <= self.strings.len());
        if !in_range {
            return Err(TileFileError::PropertyRange {
                tile: self.id,
                feature: index,
                offset,
                count,
                available: self.strings.len(),
            });
        }
        let pairs = (0..i64::from(count))
            .map(|pair| self.property(start + pair * 2))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Properties::new(pairs))
    }

    /// Key and value stored at string indices `index` and `index + 1`.
    fn property(&self, index: i64) -> Result<(Utf16Text<'a>, Utf16Text<'a>), TileFileError> {
        if index % 2 != 0 {
            return Err(TileFileError::MisalignedProperty {
                tile: self.id,
                index,
            });
        }
        Ok((self.string(index)?, self.string(index + 1)?))
    }

    fn string(&self, index: i64) -> Result<Utf16Text<'a>, TileFileError> {
        let position = usize::try_from(index).ok();
        let entry = position
            .and_then(|position| self.strings.get(position).map(|entry| (position, entry)));
        let Some((position, entry)) = entry else {
            return Err(TileFileError::StringIndex {
                tile: self.id,
                index,
                available: self.strings.len(),
            });
        };
        let offset = entry.offset.get();
        let length = entry.length.get();
        let range = usize::try_from(offset)
            .ok()
            .zip(usize::try_from(length).ok())
            .and_then(|(start, len)| Some(start..start.checked_add(len)?));
        range
            .and_then(|range| self.characters.get(range))
            .map(Utf16Text::new)
            .ok_or(TileFileError::CharacterRange {
                tile: self.id,
                index: position,
                offset,
                length,
                available: self.characters.len(),
            })
    }
}

fn count(value: i32, what: &'static str) -> Result<usize, TileFileError> {
    usize::try_from(value).map_err(|_| TileFileError::NegativeCount { what, value })
}

fn read_record<'a, T>(data: &'a [u8], offset: u64, what: &'static str) -> Result<&'a T, TileFileError>
where
    T: FromBytes + KnownLayout + Immutable,
{
    let length = size_of::<T>() as u64;
    tail(data, offset)
        .and_then(|bytes| T::ref_from_prefix(bytes).ok())
        .map(|(record, _)| record)
        .ok_or(TileFileError::OutOfBounds {
            what,
            offset,
            length,
            file_length: data.len() as u64,
        })
}

fn read_slice<'a, T>(
    data: &'a [u8],
    offset: u64,
    count: usize,
    what: &'static str,
) -> Result<&'a [T], TileFileError>
where
    T: FromBytes + KnownLayout + Immutable,
{
    let length = (size_of::<T>() as u64).saturating_mul(count as u64);
    tail(data, offset)
        .and_then(|bytes| <[T]>::ref_from_prefix_with_elems(bytes, count).ok())
        .map(|(records, _)| records)
        .ok_or(TileFileError::OutOfBounds {
            what,
            offset,
            length,
            file_length: data.len() as u64,
        })
}

fn tail(data: &[u8], offset: u64) -> Option<&[u8]> {
    usize::try_from(offset).ok().and_then(|start| data.get(start..))
}
