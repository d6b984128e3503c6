//! Fixed equirectangular tile grid shared by the writer and the reader.
//!
//! The plane is cut into square cells of [`TILE_SIZE_DEGREES`]. Cells are
//! numbered row-major from the south-west corner:
//! `id = row * TILE_COLUMNS + column`. The grid does not depend on any file;
//! changing it invalidates every tile file written before.

use crate::{BoundingBox, Coordinate};

/// Identifier of a grid cell as stored in the tile directory.
pub type TileId = i32;

/// Edge length of a tile in degrees.
pub const TILE_SIZE_DEGREES: f64 = 0.25;

/// Number of tile columns spanning longitudes `-180..=180`.
pub const TILE_COLUMNS: i32 = 1440;

/// Number of tile rows spanning latitudes `-90..=90`.
pub const TILE_ROWS: i32 = 720;

/// Tile containing the given position.
///
/// Positions on a shared edge belong to the cell to the north/east; the
/// outermost edges (latitude 90, longitude 180) clamp into the last cell.
///
/// # Examples
/// ```
/// use atlas_core::tiles::{tile_of, TILE_COLUMNS};
///
/// assert_eq!(tile_of(-90.0, -180.0), 0);
/// assert_eq!(tile_of(-90.0, -179.75), 1);
/// assert_eq!(tile_of(-89.75, -180.0), TILE_COLUMNS);
/// ```
#[must_use]
pub fn tile_of(latitude: f64, longitude: f64) -> TileId {
    row_of(latitude) * TILE_COLUMNS + column_of(longitude)
}

/// Tile containing a stored coordinate.
#[must_use]
pub fn tile_of_coordinate(coordinate: &Coordinate) -> TileId {
    tile_of(coordinate.latitude(), coordinate.longitude())
}

/// Every tile whose extent intersects the closed query box, in ascending
/// row-major order.
///
/// The result is empty when a bound is NaN or a minimum exceeds its maximum.
/// Boxes reaching past the grid are clamped to it.
#[must_use]
pub fn tiles_overlapping(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Vec<TileId> {
    let bounds = [min_lat, min_lon, max_lat, max_lon];
    if bounds.iter().any(|value| value.is_nan()) || min_lat > max_lat || min_lon > max_lon {
        return Vec::new();
    }
    let rows = row_of(min_lat)..=row_of(max_lat);
    let columns = column_of(min_lon)..=column_of(max_lon);
    rows.flat_map(|row| columns.clone().map(move |column| row * TILE_COLUMNS + column))
        .collect()
}

/// Tiles overlapping a [`BoundingBox`].
#[must_use]
pub fn tiles_for_bbox(bbox: &BoundingBox) -> Vec<TileId> {
    tiles_overlapping(bbox.min_lat, bbox.min_lon, bbox.max_lat, bbox.max_lon)
}

/// Geographic extent of a tile, or `None` for ids outside the grid.
#[must_use]
pub fn tile_bounds(id: TileId) -> Option<BoundingBox> {
    if !(0..TILE_ROWS * TILE_COLUMNS).contains(&id) {
        return None;
    }
    let row = id / TILE_COLUMNS;
    let column = id % TILE_COLUMNS;
    let min_lat = f64::from(row).mul_add(TILE_SIZE_DEGREES, -90.0);
    let min_lon = f64::from(column).mul_add(TILE_SIZE_DEGREES, -180.0);
    Some(BoundingBox::new(
        min_lat,
        min_lon,
        min_lat + TILE_SIZE_DEGREES,
        min_lon + TILE_SIZE_DEGREES,
    ))
}

fn row_of(latitude: f64) -> i32 {
    cell_index((latitude + 90.0) / TILE_SIZE_DEGREES, TILE_ROWS)
}

fn column_of(longitude: f64) -> i32 {
    cell_index((longitude + 180.0) / TILE_SIZE_DEGREES, TILE_COLUMNS)
}

fn cell_index(scaled: f64, cells: i32) -> i32 {
    let index = scaled.floor();
    if index.is_nan() || index < 0.0 {
        0
    } else if index >= f64::from(cells) {
        cells - 1
    } else {
        // In range by the checks above.
        index as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(90.0, 180.0, TILE_ROWS * TILE_COLUMNS - 1)]
    #[case(-90.0, -180.0, 0)]
    #[case(0.0, 0.0, 360 * TILE_COLUMNS + 720)]
    #[case(0.1, 0.1, 360 * TILE_COLUMNS + 720)]
    #[case(-0.1, -0.1, 359 * TILE_COLUMNS + 719)]
    #[case(120.0, 400.0, TILE_ROWS * TILE_COLUMNS - 1)]
    fn tile_of_maps_positions(#[case] lat: f64, #[case] lon: f64, #[case] expected: TileId) {
        assert_eq!(tile_of(lat, lon), expected);
    }

    #[rstest]
    fn single_tile_query_returns_one_id() {
        let tiles = tiles_overlapping(10.01, 10.01, 10.2, 10.2);
        assert_eq!(tiles, vec![tile_of(10.1, 10.1)]);
    }

    #[rstest]
    fn query_is_row_major_and_ascending() {
        let tiles = tiles_overlapping(0.0, 0.0, 0.3, 0.3);
        let base = tile_of(0.0, 0.0);
        assert_eq!(
            tiles,
            vec![base, base + 1, base + TILE_COLUMNS, base + TILE_COLUMNS + 1]
        );
        assert!(tiles.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[rstest]
    #[case(1.0, 0.0, 0.0, 1.0)]
    #[case(0.0, 1.0, 1.0, 0.0)]
    #[case(f64::NAN, 0.0, 1.0, 1.0)]
    fn degenerate_boxes_are_empty(
        #[case] min_lat: f64,
        #[case] min_lon: f64,
        #[case] max_lat: f64,
        #[case] max_lon: f64,
    ) {
        assert!(tiles_overlapping(min_lat, min_lon, max_lat, max_lon).is_empty());
    }

    #[rstest]
    #[case(52.52, 13.405)]
    #[case(-33.86, 151.21)]
    #[case(0.25, -0.25)]
    fn every_point_is_covered_by_its_own_query(#[case] lat: f64, #[case] lon: f64) {
        let tiles = tiles_overlapping(lat - 0.3, lon - 0.3, lat + 0.3, lon + 0.3);
        assert!(tiles.contains(&tile_of(lat, lon)));
    }

    #[rstest]
    fn tile_bounds_contain_their_points() {
        let id = tile_of(52.52, 13.405);
        let bounds = tile_bounds(id).expect("tile inside grid");
        assert!(bounds.contains(&Coordinate::new(52.52, 13.405)));
        assert_eq!(bounds.min_lat, 52.5);
        assert_eq!(bounds.min_lon, 13.25);
    }

    #[rstest]
    #[case(-1)]
    #[case(TILE_ROWS * TILE_COLUMNS)]
    fn tile_bounds_reject_foreign_ids(#[case] id: TileId) {
        assert!(tile_bounds(id).is_none());
    }
}
