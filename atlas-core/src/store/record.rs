//! Borrowed views handed to query visitors.

use std::fmt;

use zerocopy::byteorder::little_endian::U16;

use crate::category::{TagSource, TagValue};
use crate::format::Feature;
use crate::{Category, Coordinate, GeometryType};

/// UTF-16 text borrowed from the tile file's character pool.
///
/// Comparisons against `&str` work on code units and never allocate.
#[derive(Clone, Copy, Default)]
pub struct Utf16Text<'a>(&'a [U16]);

impl<'a> Utf16Text<'a> {
    pub(crate) const fn new(units: &'a [U16]) -> Self {
        Self(units)
    }

    /// Whether the text has no code units.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in UTF-16 code units.
    #[must_use]
    pub const fn len_utf16(&self) -> usize {
        self.0.len()
    }

    /// Raw code units in order.
    pub fn code_units(&self) -> impl Iterator<Item = u16> + use<'a> {
        self.0.iter().map(|unit| unit.get())
    }

    /// Decoded characters; unpaired surrogates become U+FFFD.
    pub fn chars(&self) -> impl Iterator<Item = char> + use<'a> {
        char::decode_utf16(self.code_units()).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    /// Whether the text starts with `prefix`.
    #[must_use]
    pub fn starts_with(&self, prefix: &str) -> bool {
        let mut units = self.code_units();
        prefix.encode_utf16().all(|unit| units.next() == Some(unit))
    }
}

impl PartialEq<str> for Utf16Text<'_> {
    fn eq(&self, other: &str) -> bool {
        self.code_units().eq(other.encode_utf16())
    }
}

impl PartialEq<&str> for Utf16Text<'_> {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl PartialEq for Utf16Text<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.code_units().eq(other.code_units())
    }
}

impl fmt::Display for Utf16Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write as _;
        self.chars().try_for_each(|c| f.write_char(c))
    }
}

impl fmt::Debug for Utf16Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string(), f)
    }
}

/// Key/value pairs of one feature, in stored order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties<'a> {
    pairs: Vec<(Utf16Text<'a>, Utf16Text<'a>)>,
}

impl<'a> Properties<'a> {
    pub(crate) const fn new(pairs: Vec<(Utf16Text<'a>, Utf16Text<'a>)>) -> Self {
        Self { pairs }
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the feature carries no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Value stored for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Utf16Text<'a>> {
        self.pairs
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, value)| *value)
    }

    /// Pairs in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (Utf16Text<'a>, Utf16Text<'a>)> + '_ {
        self.pairs.iter().copied()
    }
}

impl TagValue for Utf16Text<'_> {
    fn is(&self, text: &str) -> bool {
        self == text
    }

    fn starts_with(&self, prefix: &str) -> bool {
        Utf16Text::starts_with(self, prefix)
    }
}

impl<'a> TagSource for Properties<'a> {
    type Value<'v>
        = Utf16Text<'a>
    where
        Self: 'v;

    fn tag(&self, key: &str) -> Option<Utf16Text<'a>> {
        self.get(key)
    }

    fn any_key_starts_with(&self, prefix: &str) -> bool {
        self.pairs.iter().any(|(key, _)| key.starts_with(prefix))
    }
}

/// A feature yielded by [`crate::TileFile::for_each_feature`].
///
/// Text and coordinates borrow from the mapped file and stay valid for as
/// long as the [`crate::TileFile`] does.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord<'a> {
    /// Source identifier.
    pub id: i64,
    /// Shape of [`FeatureRecord::coordinates`].
    pub geometry_type: GeometryType,
    /// Label text; empty when the feature has none.
    pub label: Utf16Text<'a>,
    /// Every coordinate of the feature, including those outside the query.
    pub coordinates: &'a [Coordinate],
    /// Stored key/value pairs.
    pub properties: Properties<'a>,
    /// Rendering class derived from the properties.
    pub category: Category,
}

impl FeatureRecord<'_> {
    /// Copy the record into an owned [`Feature`].
    ///
    /// An empty label becomes `None`.
    #[must_use]
    pub fn to_feature(&self) -> Feature {
        Feature {
            id: self.id,
            geometry_type: self.geometry_type,
            label: (!self.label.is_empty()).then(|| self.label.to_string()),
            coordinates: self.coordinates.to_vec(),
            properties: self
                .properties
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }
}
