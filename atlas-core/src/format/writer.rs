//! Serialise features into the tile file layout.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, warn};
use thiserror::Error;
use zerocopy::IntoBytes;
use zerocopy::byteorder::little_endian::{I32, I64, U16, U64};

use super::{
    CHARACTER_SIZE, COORDINATE_SIZE, FILE_HEADER_SIZE, FORMAT_VERSION, FileHeader,
    MAP_FEATURE_SIZE, MapFeatureRecord, NO_LABEL, STRING_ENTRY_SIZE, StringEntry,
    TILE_BLOCK_HEADER_SIZE, TILE_HEADER_ENTRY_SIZE, TileBlockHeader, TileHeaderEntry,
};
use crate::tiles::{TileId, tile_of_coordinate};
use crate::{Coordinate, GeometryType};

/// Owned feature handed to the writer.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Source identifier, usually the OSM element id.
    pub id: i64,
    /// Shape of [`Feature::coordinates`].
    pub geometry_type: GeometryType,
    /// Display label, typically the `name` tag.
    pub label: Option<String>,
    /// Positions in order.
    pub coordinates: Vec<Coordinate>,
    /// Key/value pairs kept for classification.
    pub properties: Vec<(String, String)>,
}

impl Feature {
    /// Unlabelled feature without properties.
    #[must_use]
    pub fn new(id: i64, geometry_type: GeometryType, coordinates: Vec<Coordinate>) -> Self {
        Self {
            id,
            geometry_type,
            label: None,
            coordinates,
            properties: Vec::new(),
        }
    }

    /// Attach a label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Append a property pair.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }
}

/// Shape of a written file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TileFileStats {
    /// Tiles listed in the directory.
    pub tiles: usize,
    /// Feature entries across all tiles. Features spanning several tiles
    /// count once per tile.
    pub feature_entries: usize,
    /// Total file length in bytes.
    pub bytes: u64,
}

/// Error emitted when producing a tile file.
#[derive(Debug, Error)]
pub enum TileFileWriteError {
    /// Writing bytes to disk failed.
    #[error("failed to write tile file to {path}: {source}")]
    Io {
        /// Destination file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A count or offset does not fit the 32-bit fields of the format.
    #[error("tile {tile} has too many {what} for the tile file format")]
    TooLarge {
        /// Tile being assembled.
        tile: TileId,
        /// Array that overflowed.
        what: &'static str,
    },
    /// The directory itself would overflow.
    #[error("too many tiles for the tile file format: {count}")]
    TooManyTiles {
        /// Number of populated tiles.
        count: usize,
    },
    /// A feature carried a non-finite coordinate.
    #[error("feature {id} has a non-finite coordinate")]
    InvalidCoordinate {
        /// Offending feature id.
        id: i64,
    },
}

/// Write `features` to `path` in the tile file layout.
///
/// Each feature is stored in every tile touched by one of its coordinates;
/// features without coordinates are skipped. Existing files are truncated.
///
/// # Errors
/// Returns [`TileFileWriteError`] when a feature cannot be encoded or the
/// file cannot be written.
pub fn write_tile_file(
    path: &Path,
    features: &[Feature],
) -> Result<TileFileStats, TileFileWriteError> {
    let (bytes, stats) = encode(features)?;
    let io_error = |source| TileFileWriteError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes).map_err(io_error)?;
    let file = writer
        .into_inner()
        .map_err(|error| io_error(error.into_error()))?;
    file.sync_all().map_err(io_error)?;

    debug!(
        "wrote {} tiles ({} feature entries) to {}",
        stats.tiles,
        stats.feature_entries,
        path.display()
    );
    Ok(stats)
}

/// Encode `features` into an in-memory tile file image.
///
/// # Errors
/// Returns [`TileFileWriteError`] when a coordinate is not finite or a tile
/// outgrows the 32-bit fields of the format.
pub fn encode_tile_file(features: &[Feature]) -> Result<Vec<u8>, TileFileWriteError> {
    encode(features).map(|(bytes, _)| bytes)
}

fn encode(features: &[Feature]) -> Result<(Vec<u8>, TileFileStats), TileFileWriteError> {
    let tiles = assign_tiles(features)?;
    let tile_count =
        i32::try_from(tiles.len()).map_err(|_| TileFileWriteError::TooManyTiles {
            count: tiles.len(),
        })?;

    let mut blocks = Vec::with_capacity(tiles.len());
    for (tile, members) in &tiles {
        blocks.push(TileBlock::build(*tile, members)?);
    }

    let mut out = Vec::new();
    out.extend_from_slice(
        FileHeader {
            version: I64::new(FORMAT_VERSION),
            tile_count: I32::new(tile_count),
        }
        .as_bytes(),
    );

    let mut offset = FILE_HEADER_SIZE + TILE_HEADER_ENTRY_SIZE * blocks.len() as u64;
    for block in &blocks {
        out.extend_from_slice(
            TileHeaderEntry {
                id: I32::new(block.tile),
                offset: U64::new(offset),
            }
            .as_bytes(),
        );
        offset += block.encoded_len();
    }
    for block in &blocks {
        let start = out.len() as u64;
        block.write_into(start, &mut out);
    }
    let stats = TileFileStats {
        tiles: blocks.len(),
        feature_entries: blocks.iter().map(|block| block.features.len()).sum(),
        bytes: out.len() as u64,
    };
    Ok((out, stats))
}

fn assign_tiles(features: &[Feature]) -> Result<BTreeMap<TileId, Vec<&Feature>>, TileFileWriteError> {
    let mut tiles: BTreeMap<TileId, Vec<&Feature>> = BTreeMap::new();
    for feature in features {
        if feature.coordinates.is_empty() {
            warn!("skipping feature {} without coordinates", feature.id);
            continue;
        }
        let finite = feature
            .coordinates
            .iter()
            .all(|c| c.latitude().is_finite() && c.longitude().is_finite());
        if !finite {
            return Err(TileFileWriteError::InvalidCoordinate { id: feature.id });
        }
        let touched: BTreeSet<TileId> = feature.coordinates.iter().map(tile_of_coordinate).collect();
        for tile in touched {
            tiles.entry(tile).or_default().push(feature);
        }
    }
    Ok(tiles)
}

/// One tile's arrays before they are laid out.
struct TileBlock {
    tile: TileId,
    features: Vec<MapFeatureRecord>,
    coordinates: Vec<Coordinate>,
    strings: Vec<StringEntry>,
    characters: Vec<U16>,
}

impl TileBlock {
    fn build(tile: TileId, members: &[&Feature]) -> Result<Self, TileFileWriteError> {
        let mut block = Self {
            tile,
            features: Vec::with_capacity(members.len()),
            coordinates: Vec::new(),
            strings: Vec::new(),
            characters: Vec::new(),
        };

        // Property pairs go first so every key lands on an even string index.
        for feature in members {
            let coordinate_offset = block.index(block.coordinates.len(), "coordinates")?;
            let coordinate_count = block.index(feature.coordinates.len(), "coordinates")?;
            block.coordinates.extend_from_slice(&feature.coordinates);
            let properties_offset = block.index(block.strings.len() / 2, "strings")?;
            let property_count = block.index(feature.properties.len(), "properties")?;
            for (key, value) in &feature.properties {
                block.push_string(key)?;
                block.push_string(value)?;
            }
            block.features.push(MapFeatureRecord {
                id: I64::new(feature.id),
                label_offset: I32::new(NO_LABEL),
                geometry_type: feature.geometry_type as u8,
                coordinate_offset: I32::new(coordinate_offset),
                coordinate_count: I32::new(coordinate_count),
                properties_offset: I32::new(properties_offset),
                property_count: I32::new(property_count),
            });
        }

        for (record, feature) in block.features.iter_mut().zip(members) {
            if let Some(label) = &feature.label {
                let index = i32::try_from(block.strings.len())
                    .map_err(|_| TileFileWriteError::TooLarge { tile, what: "strings" })?;
                push_string(tile, &mut block.strings, &mut block.characters, label)?;
                record.label_offset = I32::new(index);
            }
        }
        Ok(block)
    }

    fn index(&self, value: usize, what: &'static str) -> Result<i32, TileFileWriteError> {
        i32::try_from(value).map_err(|_| TileFileWriteError::TooLarge {
            tile: self.tile,
            what,
        })
    }

    fn push_string(&mut self, text: &str) -> Result<(), TileFileWriteError> {
        push_string(self.tile, &mut self.strings, &mut self.characters, text)
    }

    fn encoded_len(&self) -> u64 {
        TILE_BLOCK_HEADER_SIZE
            + MAP_FEATURE_SIZE * self.features.len() as u64
            + COORDINATE_SIZE * self.coordinates.len() as u64
            + STRING_ENTRY_SIZE * self.strings.len() as u64
            + CHARACTER_SIZE * self.characters.len() as u64
    }

    /// Append the block to `out`, which must already be `start` bytes long.
    fn write_into(&self, start: u64, out: &mut Vec<u8>) {
        let coordinates_offset =
            start + TILE_BLOCK_HEADER_SIZE + MAP_FEATURE_SIZE * self.features.len() as u64;
        let strings_offset = coordinates_offset + COORDINATE_SIZE * self.coordinates.len() as u64;
        let characters_offset = strings_offset + STRING_ENTRY_SIZE * self.strings.len() as u64;
        // Counts were bounded to i32 while the block was built.
        let header = TileBlockHeader {
            features_count: I32::new(clamp_count(self.features.len())),
            coordinates_count: I32::new(clamp_count(self.coordinates.len())),
            string_count: I32::new(clamp_count(self.strings.len())),
            characters_count: I32::new(clamp_count(self.characters.len())),
            coordinates_offset: U64::new(coordinates_offset),
            strings_offset: U64::new(strings_offset),
            characters_offset: U64::new(characters_offset),
        };
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(self.features.as_bytes());
        out.extend_from_slice(self.coordinates.as_bytes());
        out.extend_from_slice(self.strings.as_bytes());
        out.extend_from_slice(self.characters.as_bytes());
    }
}

fn push_string(
    tile: TileId,
    strings: &mut Vec<StringEntry>,
    characters: &mut Vec<U16>,
    text: &str,
) -> Result<(), TileFileWriteError> {
    let too_large = |what| TileFileWriteError::TooLarge { tile, what };
    let offset = i32::try_from(characters.len()).map_err(|_| too_large("characters"))?;
    characters.extend(text.encode_utf16().map(U16::new));
    let end = i32::try_from(characters.len()).map_err(|_| too_large("characters"))?;
    strings.push(StringEntry {
        offset: I32::new(offset),
        length: I32::new(end - offset),
    });
    Ok(())
}

fn clamp_count(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn museum() -> Feature {
        Feature::new(7, GeometryType::Point, vec![Coordinate::new(52.52, 13.405)])
            .with_label("Museum")
            .with_property("tourism", "museum")
            .with_property("name", "Museum")
    }

    fn read_i32(bytes: &[u8], at: usize) -> i32 {
        let raw = bytes.get(at..at + 4).expect("in bounds");
        i32::from_le_bytes(raw.try_into().expect("four bytes"))
    }

    fn read_u64(bytes: &[u8], at: usize) -> u64 {
        let raw = bytes.get(at..at + 8).expect("in bounds");
        u64::from_le_bytes(raw.try_into().expect("eight bytes"))
    }

    #[rstest]
    fn empty_input_produces_header_only() {
        let bytes = encode_tile_file(&[]).expect("encode");
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytes.get(..8), Some(&FORMAT_VERSION.to_le_bytes()[..]));
        assert_eq!(read_i32(&bytes, 8), 0);
    }

    #[rstest]
    fn single_feature_layout_is_contiguous(museum: Feature) {
        let bytes = encode_tile_file(&[museum]).expect("encode");
        assert_eq!(read_i32(&bytes, 8), 1);
        let tile_offset = read_u64(&bytes, 16);
        assert_eq!(tile_offset, 24);

        let block = usize::try_from(tile_offset).expect("offset fits");
        assert_eq!(read_i32(&bytes, block), 1, "features");
        assert_eq!(read_i32(&bytes, block + 4), 1, "coordinates");
        assert_eq!(read_i32(&bytes, block + 8), 5, "strings: two pairs and a label");
        assert_eq!(read_u64(&bytes, block + 16), 24 + 40 + 29);
        assert_eq!(read_u64(&bytes, block + 24), 24 + 40 + 29 + 16);
        assert_eq!(read_u64(&bytes, block + 32), 24 + 40 + 29 + 16 + 5 * 8);

        let feature = block + 40;
        assert_eq!(read_i32(&bytes, feature + 8), 4, "label follows properties");
        assert_eq!(read_i32(&bytes, feature + 21), 0, "properties_offset in pairs");
        assert_eq!(read_i32(&bytes, feature + 25), 2);
    }

    #[rstest]
    fn features_spanning_tiles_are_stored_in_each() {
        let line = Feature::new(
            1,
            GeometryType::Polyline,
            vec![Coordinate::new(0.1, 0.1), Coordinate::new(0.1, 0.6)],
        );
        let bytes = encode_tile_file(&[line]).expect("encode");
        assert_eq!(read_i32(&bytes, 8), 2);
    }

    #[rstest]
    fn unlabelled_features_store_no_label() {
        let point = Feature::new(3, GeometryType::Point, vec![Coordinate::new(1.0, 1.0)]);
        let bytes = encode_tile_file(&[point]).expect("encode");
        let feature = 24 + 40;
        assert_eq!(read_i32(&bytes, feature + 8), NO_LABEL);
    }

    #[rstest]
    fn features_without_coordinates_are_skipped() {
        let empty = Feature::new(9, GeometryType::Point, vec![]);
        let bytes = encode_tile_file(&[empty]).expect("encode");
        assert_eq!(read_i32(&bytes, 8), 0);
    }

    #[rstest]
    fn non_finite_coordinates_are_rejected() {
        let broken = Feature::new(9, GeometryType::Point, vec![Coordinate::new(f64::NAN, 0.0)]);
        let error = encode_tile_file(&[broken]).expect_err("should fail");
        assert!(matches!(error, TileFileWriteError::InvalidCoordinate { id: 9 }));
    }

    #[rstest]
    fn write_tile_file_persists_bytes(museum: Feature) {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("world.tiles");
        let stats = write_tile_file(&path, &[museum.clone()]).expect("write");
        let on_disk = std::fs::read(&path).expect("read back");
        assert_eq!(on_disk, encode_tile_file(&[museum]).expect("encode"));
        assert_eq!(
            stats,
            TileFileStats {
                tiles: 1,
                feature_entries: 1,
                bytes: on_disk.len() as u64,
            }
        );
    }

    #[rstest]
    fn write_tile_file_reports_io_errors(museum: Feature) {
        let path = PathBuf::from("/non-existent/dir/world.tiles");
        let error = write_tile_file(&path, &[museum]).expect_err("missing dir");
        assert!(matches!(error, TileFileWriteError::Io { .. }));
    }
}
