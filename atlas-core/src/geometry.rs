//! Geographic primitives shared by the writer and the query engine.
//!
//! Coordinates are stored as `(latitude, longitude)` pairs in degrees. When
//! converting to and from [`geo`] types the usual convention applies:
//! `x = longitude`, `y = latitude`.

use std::fmt;

use geo::{Coord, Rect};
use zerocopy::byteorder::little_endian::F64;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// A WGS84 position as laid out in the tile file (16 bytes, little-endian).
///
/// The type is a zero-copy view: query results borrow slices of
/// `Coordinate` straight out of the memory mapping.
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct Coordinate {
    latitude: F64,
    longitude: F64,
}

impl Coordinate {
    /// Build a coordinate from degrees.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: F64::new(latitude),
            longitude: F64::new(longitude),
        }
    }

    /// Latitude in degrees.
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude.get()
    }

    /// Longitude in degrees.
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude.get()
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.latitude() == other.latitude() && self.longitude() == other.longitude()
    }
}

impl fmt::Debug for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinate")
            .field("latitude", &self.latitude())
            .field("longitude", &self.longitude())
            .finish()
    }
}

impl From<Coord<f64>> for Coordinate {
    fn from(value: Coord<f64>) -> Self {
        Self::new(value.y, value.x)
    }
}

impl From<Coordinate> for Coord<f64> {
    fn from(value: Coordinate) -> Self {
        Self {
            x: value.longitude(),
            y: value.latitude(),
        }
    }
}

/// Shape of a feature's coordinate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum GeometryType {
    /// Open line string.
    Polyline = 0,
    /// Closed ring.
    Polygon = 1,
    /// Single position.
    Point = 2,
}

impl TryFrom<u8> for GeometryType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Polyline),
            1 => Ok(Self::Polygon),
            2 => Ok(Self::Point),
            other => Err(other),
        }
    }
}

/// Closed latitude/longitude query box in degrees.
///
/// # Examples
/// ```
/// use atlas_core::{BoundingBox, Coordinate};
///
/// let bbox = BoundingBox::new(0.0, 0.0, 20.0, 20.0);
/// assert!(bbox.contains(&Coordinate::new(10.0, 10.0)));
/// assert!(bbox.contains(&Coordinate::new(20.0, 0.0)));
/// assert!(!bbox.contains(&Coordinate::new(50.0, 50.0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

impl BoundingBox {
    /// Build a box from its corners. Bounds are used as given.
    #[must_use]
    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// The whole WGS84 extent.
    #[must_use]
    pub const fn world() -> Self {
        Self::new(-90.0, -180.0, 90.0, 180.0)
    }

    /// Closed-interval containment on both axes.
    #[must_use]
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        let lat = coordinate.latitude();
        let lon = coordinate.longitude();
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(value: Rect<f64>) -> Self {
        let min = value.min();
        let max = value.max();
        Self::new(min.y, min.x, max.y, max.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use zerocopy::IntoBytes;

    #[rstest]
    fn coordinate_is_sixteen_little_endian_bytes() {
        let coordinate = Coordinate::new(1.5, -2.25);
        let bytes = coordinate.as_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes.get(..8), Some(&1.5_f64.to_le_bytes()[..]));
        assert_eq!(bytes.get(8..), Some(&(-2.25_f64).to_le_bytes()[..]));
    }

    #[rstest]
    #[case(0, Some(GeometryType::Polyline))]
    #[case(1, Some(GeometryType::Polygon))]
    #[case(2, Some(GeometryType::Point))]
    #[case(3, None)]
    fn geometry_type_from_raw(#[case] raw: u8, #[case] expected: Option<GeometryType>) {
        assert_eq!(GeometryType::try_from(raw).ok(), expected);
    }

    #[rstest]
    fn bounding_box_from_rect_swaps_axes() {
        let rect = Rect::new(Coord { x: 10.0, y: 50.0 }, Coord { x: 12.0, y: 52.0 });
        let bbox = BoundingBox::from(rect);
        assert_eq!(bbox, BoundingBox::new(50.0, 10.0, 52.0, 12.0));
    }

    #[rstest]
    fn coordinate_round_trips_through_geo() {
        let coord = Coord { x: 13.4, y: 52.5 };
        let coordinate = Coordinate::from(coord);
        assert_eq!(coordinate.latitude(), 52.5);
        assert_eq!(Coord::from(coordinate), coord);
    }
}
