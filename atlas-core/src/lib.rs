//! Core types for the atlas tile engine.
//!
//! The crate covers the offline half of the pipeline's output and the whole
//! of its online half:
//!
//! - [`geometry`]: coordinates, geometry types and bounding boxes.
//! - [`category`]: the tag classifier mapping OSM-style properties onto
//!   fixed rendering categories.
//! - [`tiles`]: the equirectangular tile grid used to bucket features.
//! - [`format`]: the packed little-endian tile file layout and its writer.
//! - [`store`]: the memory-mapped [`TileFile`] and its bounding-box query.
//!
//! # Examples
//! ```
//! use atlas_core::{BoundingBox, Category, Coordinate, Feature, GeometryType, TileFile, encode_tile_file};
//!
//! let road = Feature::new(
//!     7,
//!     GeometryType::Polyline,
//!     vec![Coordinate::new(52.50, 13.40), Coordinate::new(52.51, 13.41)],
//! )
//! .with_property("highway", "residential");
//!
//! let tiles = TileFile::from_bytes(encode_tile_file(&[road]).expect("encode")).expect("open");
//! let mut categories = Vec::new();
//! tiles
//!     .for_each_feature(&BoundingBox::new(52.0, 13.0, 53.0, 14.0), |feature| {
//!         categories.push(feature.category);
//!         true
//!     })
//!     .expect("query");
//! assert_eq!(categories, [Category::HighwayResidential]);
//! ```

#![deny(unsafe_code)]

pub mod category;
pub mod format;
pub mod geometry;
pub mod store;
pub mod tiles;

pub use category::{Category, TagSource, TagValue, classify};
pub use format::{
    FORMAT_VERSION, Feature, TileFileStats, TileFileWriteError, encode_tile_file, write_tile_file,
};
pub use geometry::{BoundingBox, Coordinate, GeometryType};
pub use store::{FeatureRecord, Properties, TileFile, TileFileError, Utf16Text};
pub use tiles::TileId;
