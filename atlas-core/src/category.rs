//! Rendering categories and the tag classifier that produces them.
//!
//! Categories are a stable contract with the renderer, which looks styles up
//! by discriminant. New variants may be appended; existing values never move.
//!
//! # Examples
//! ```
//! use atlas_core::{Category, GeometryType, classify};
//!
//! let tags = [("highway", "secondary")];
//! assert_eq!(classify(&tags[..], GeometryType::Point), Category::HighwaySecondary);
//! assert_eq!(Category::HighwaySecondary.as_str(), "highway_secondary");
//! ```

use crate::GeometryType;

/// Fixed rendering category assigned to every queried feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Category {
    /// Nothing the renderer knows how to draw.
    Unknown = 0,
    /// Rivers, streams and other water lines or areas.
    Waterway = 1,
    /// Named settlement areas.
    PlaceName = 2,
    /// Unclassified or generic road.
    Highway = 3,
    /// Motorway.
    HighwayMotorway = 4,
    /// Trunk road.
    HighwayTrunk = 5,
    /// Primary road.
    HighwayPrimary = 6,
    /// Secondary road.
    HighwaySecondary = 7,
    /// Tertiary road.
    HighwayTertiary = 8,
    /// Residential street.
    HighwayResidential = 9,
    /// Any railway line.
    Railway = 10,
    /// National border.
    Border = 11,
    /// Building footprint.
    Building = 12,
    /// Natural area without a more specific group.
    Natural = 13,
    /// Woodland.
    Forest = 14,
    /// Open grassland, farmland and parks.
    Plain = 15,
    /// Bare rock and scree.
    NaturalMountains = 16,
    /// Sand and beaches.
    NaturalDesert = 17,
    /// Lakes, reservoirs and basins.
    NaturalWater = 18,
    /// Built-up land.
    Residential = 19,
}

impl Category {
    /// Every category in discriminant order.
    pub const ALL: [Self; 20] = [
        Self::Unknown,
        Self::Waterway,
        Self::PlaceName,
        Self::Highway,
        Self::HighwayMotorway,
        Self::HighwayTrunk,
        Self::HighwayPrimary,
        Self::HighwaySecondary,
        Self::HighwayTertiary,
        Self::HighwayResidential,
        Self::Railway,
        Self::Border,
        Self::Building,
        Self::Natural,
        Self::Forest,
        Self::Plain,
        Self::NaturalMountains,
        Self::NaturalDesert,
        Self::NaturalWater,
        Self::Residential,
    ];

    /// Return the category as a `snake_case` `&str`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Waterway => "waterway",
            Self::PlaceName => "place_name",
            Self::Highway => "highway",
            Self::HighwayMotorway => "highway_motorway",
            Self::HighwayTrunk => "highway_trunk",
            Self::HighwayPrimary => "highway_primary",
            Self::HighwaySecondary => "highway_secondary",
            Self::HighwayTertiary => "highway_tertiary",
            Self::HighwayResidential => "highway_residential",
            Self::Railway => "railway",
            Self::Border => "border",
            Self::Building => "building",
            Self::Natural => "natural",
            Self::Forest => "forest",
            Self::Plain => "plain",
            Self::NaturalMountains => "natural_mountains",
            Self::NaturalDesert => "natural_desert",
            Self::NaturalWater => "natural_water",
            Self::Residential => "residential",
        }
    }

    /// Stable numeric value shared with the renderer.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tag value that can be compared without decoding it.
pub trait TagValue {
    /// Whether the value equals `text`.
    fn is(&self, text: &str) -> bool;

    /// Whether the value begins with `prefix`.
    fn starts_with(&self, prefix: &str) -> bool;
}

impl TagValue for &str {
    fn is(&self, text: &str) -> bool {
        *self == text
    }

    fn starts_with(&self, prefix: &str) -> bool {
        str::starts_with(self, prefix)
    }
}

/// Read access to a key/value tag set.
///
/// Implemented for owned ingest tags and for the borrowed property views
/// returned by queries, so both sides classify identically.
pub trait TagSource {
    /// View of one value; borrowed from the tag set.
    type Value<'v>: TagValue
    where
        Self: 'v;

    /// Value stored under `key`, if any.
    fn tag(&self, key: &str) -> Option<Self::Value<'_>>;

    /// Whether any key begins with `prefix`.
    fn any_key_starts_with(&self, prefix: &str) -> bool;

    /// Whether `key` is present.
    fn has_tag(&self, key: &str) -> bool {
        self.tag(key).is_some()
    }
}

impl<K, V> TagSource for [(K, V)]
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    type Value<'v>
        = &'v str
    where
        Self: 'v;

    fn tag(&self, key: &str) -> Option<&str> {
        self.iter()
            .find(|(candidate, _)| candidate.as_ref() == key)
            .map(|(_, value)| value.as_ref())
    }

    fn any_key_starts_with(&self, prefix: &str) -> bool {
        self.iter().any(|(key, _)| key.as_ref().starts_with(prefix))
    }
}

impl<K, V> TagSource for Vec<(K, V)>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    type Value<'v>
        = &'v str
    where
        Self: 'v;

    fn tag(&self, key: &str) -> Option<&str> {
        self.as_slice().tag(key)
    }

    fn any_key_starts_with(&self, prefix: &str) -> bool {
        self.as_slice().any_key_starts_with(prefix)
    }
}

/// Map a tag set and geometry kind to a rendering category.
///
/// Rules are evaluated in order and the first match wins; several rules can
/// match the same tags, so the order is part of the contract.
pub fn classify<T>(tags: &T, geometry: GeometryType) -> Category
where
    T: TagSource + ?Sized,
{
    let is_point = geometry == GeometryType::Point;
    let is_polygon = geometry == GeometryType::Polygon;

    if let Some(highway) = tags.tag("highway") {
        return lookup(&highway, HIGHWAY, Category::Unknown);
    }
    if !is_point && tags.any_key_starts_with("water") {
        return Category::Waterway;
    }
    let boundary = tags.tag("boundary");
    if boundary
        .as_ref()
        .is_some_and(|value| value.starts_with("administrative"))
        && tags.tag("admin_level").is_some_and(|level| level.is("2"))
    {
        return Category::Border;
    }
    if !is_point
        && tags.tag("place").is_some_and(|value| {
            ["city", "town", "locality", "hamlet"]
                .iter()
                .any(|place| value.is(place))
        })
    {
        return Category::PlaceName;
    }
    if tags.has_tag("railway") {
        return Category::Railway;
    }
    if is_polygon && let Some(natural) = tags.tag("natural") {
        return lookup(&natural, NATURAL, Category::Natural);
    }
    if boundary
        .as_ref()
        .is_some_and(|value| value.starts_with("forest"))
    {
        return Category::Forest;
    }
    let landuse = tags.tag("landuse");
    if landuse
        .as_ref()
        .is_some_and(|value| value.starts_with("forest") || value.starts_with("orchard"))
    {
        return Category::Forest;
    }
    if is_polygon && let Some(value) = landuse.as_ref() {
        return lookup(value, LANDUSE, Category::Unknown);
    }
    if is_polygon && tags.has_tag("building") {
        return Category::Building;
    }
    if is_polygon && tags.has_tag("leisure") {
        return Category::Plain;
    }
    if is_polygon && tags.has_tag("amenity") {
        return Category::Residential;
    }
    Category::Unknown
}

fn lookup(value: &impl TagValue, table: &[(&str, Category)], fallback: Category) -> Category {
    table
        .iter()
        .find(|(text, _)| value.is(text))
        .map_or(fallback, |&(_, category)| category)
}

const HIGHWAY: &[(&str, Category)] = &[
    ("motorway", Category::HighwayMotorway),
    ("trunk", Category::HighwayTrunk),
    ("primary", Category::HighwayPrimary),
    ("secondary", Category::HighwaySecondary),
    ("tertiary", Category::HighwayTertiary),
    ("residential", Category::HighwayResidential),
    ("unclassified", Category::Highway),
    ("road", Category::Highway),
];

const NATURAL: &[(&str, Category)] = &[
    ("fell", Category::Plain),
    ("grassland", Category::Plain),
    ("heath", Category::Plain),
    ("moor", Category::Plain),
    ("scrub", Category::Plain),
    ("wetland", Category::Plain),
    ("wood", Category::Forest),
    ("tree_row", Category::Forest),
    ("bare_rock", Category::NaturalMountains),
    ("rock", Category::NaturalMountains),
    ("scree", Category::NaturalMountains),
    ("sand", Category::NaturalDesert),
    ("beach", Category::NaturalDesert),
    ("water", Category::NaturalWater),
];

const LANDUSE: &[(&str, Category)] = &[
    ("residential", Category::Residential),
    ("cemetery", Category::Residential),
    ("industrial", Category::Residential),
    ("commercial", Category::Residential),
    ("square", Category::Residential),
    ("construction", Category::Residential),
    ("military", Category::Residential),
    ("quarry", Category::Residential),
    ("brownfield", Category::Residential),
    ("farm", Category::Plain),
    ("meadow", Category::Plain),
    ("grass", Category::Plain),
    ("greenfield", Category::Plain),
    ("recreation_ground", Category::Plain),
    ("winter_sports", Category::Plain),
    ("allotments", Category::Plain),
    ("reservoir", Category::NaturalWater),
    ("basin", Category::NaturalWater),
];

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn classify_pairs(pairs: &[(&str, &str)], geometry: GeometryType) -> Category {
        classify(pairs, geometry)
    }

    #[rstest]
    #[case(GeometryType::Point)]
    #[case(GeometryType::Polyline)]
    #[case(GeometryType::Polygon)]
    fn highway_secondary_ignores_geometry(#[case] geometry: GeometryType) {
        assert_eq!(
            classify_pairs(&[("highway", "secondary")], geometry),
            Category::HighwaySecondary
        );
    }

    #[rstest]
    #[case("motorway", Category::HighwayMotorway)]
    #[case("trunk", Category::HighwayTrunk)]
    #[case("primary", Category::HighwayPrimary)]
    #[case("tertiary", Category::HighwayTertiary)]
    #[case("residential", Category::HighwayResidential)]
    #[case("unclassified", Category::Highway)]
    #[case("road", Category::Highway)]
    #[case("footway", Category::Unknown)]
    fn highway_values(#[case] value: &str, #[case] expected: Category) {
        assert_eq!(
            classify_pairs(&[("highway", value)], GeometryType::Polyline),
            expected
        );
    }

    #[rstest]
    fn highway_shadows_later_rules() {
        let tags = [("highway", "footway"), ("railway", "rail")];
        assert_eq!(classify_pairs(&tags, GeometryType::Polyline), Category::Unknown);
    }

    #[rstest]
    #[case(GeometryType::Polygon, Category::Building)]
    #[case(GeometryType::Polyline, Category::Unknown)]
    #[case(GeometryType::Point, Category::Unknown)]
    fn building_requires_polygon(#[case] geometry: GeometryType, #[case] expected: Category) {
        assert_eq!(classify_pairs(&[("building", "yes")], geometry), expected);
    }

    #[rstest]
    #[case(GeometryType::Polyline, Category::Waterway)]
    #[case(GeometryType::Point, Category::Unknown)]
    fn water_prefix_skips_points(#[case] geometry: GeometryType, #[case] expected: Category) {
        assert_eq!(classify_pairs(&[("waterway", "river")], geometry), expected);
    }

    #[rstest]
    #[case("2", Category::Border)]
    #[case("4", Category::Unknown)]
    fn border_requires_national_level(#[case] level: &str, #[case] expected: Category) {
        let tags = [("boundary", "administrative"), ("admin_level", level)];
        assert_eq!(classify_pairs(&tags, GeometryType::Polyline), expected);
    }

    #[rstest]
    #[case("town", GeometryType::Polygon, Category::PlaceName)]
    #[case("town", GeometryType::Point, Category::Unknown)]
    #[case("village", GeometryType::Polygon, Category::Unknown)]
    fn place_names(#[case] value: &str, #[case] geometry: GeometryType, #[case] expected: Category) {
        assert_eq!(classify_pairs(&[("place", value)], geometry), expected);
    }

    #[rstest]
    #[case("heath", Category::Plain)]
    #[case("tree_row", Category::Forest)]
    #[case("scree", Category::NaturalMountains)]
    #[case("beach", Category::NaturalDesert)]
    #[case("water", Category::NaturalWater)]
    #[case("glacier", Category::Natural)]
    fn natural_groups(#[case] value: &str, #[case] expected: Category) {
        assert_eq!(
            classify_pairs(&[("natural", value)], GeometryType::Polygon),
            expected
        );
    }

    #[rstest]
    fn forest_boundary_and_landuse_apply_to_lines() {
        assert_eq!(
            classify_pairs(&[("boundary", "forest_compartment")], GeometryType::Polyline),
            Category::Forest
        );
        assert_eq!(
            classify_pairs(&[("landuse", "orchard")], GeometryType::Point),
            Category::Forest
        );
    }

    #[rstest]
    #[case("quarry", Category::Residential)]
    #[case("allotments", Category::Plain)]
    #[case("basin", Category::NaturalWater)]
    #[case("retail", Category::Unknown)]
    fn landuse_groups(#[case] value: &str, #[case] expected: Category) {
        assert_eq!(
            classify_pairs(&[("landuse", value)], GeometryType::Polygon),
            expected
        );
    }

    #[rstest]
    fn landuse_shadows_building() {
        let tags = [("landuse", "retail"), ("building", "yes")];
        assert_eq!(classify_pairs(&tags, GeometryType::Polygon), Category::Unknown);
    }

    #[rstest]
    #[case("leisure", Category::Plain)]
    #[case("amenity", Category::Residential)]
    fn polygon_fallbacks(#[case] key: &str, #[case] expected: Category) {
        assert_eq!(classify_pairs(&[(key, "yes")], GeometryType::Polygon), expected);
    }

    #[rstest]
    fn discriminants_are_stable() {
        for (index, category) in Category::ALL.iter().enumerate() {
            assert_eq!(usize::from(category.code()), index);
        }
        assert_eq!(Category::Residential.code(), 19);
    }

    #[rstest]
    fn display_matches_as_str() {
        assert_eq!(Category::NaturalWater.to_string(), "natural_water");
    }
}
