//! File header block.

use geo::{Coord, Rect};

use super::blob::{Blob, BlobKind};
use super::error::BlockError;
use super::{nanodegrees_to_degrees, proto};

/// Capability listed in a header's required or optional feature list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeaderFeature {
    /// `OsmSchema-V0.6`.
    OsmSchemaV06,
    /// `DenseNodes`.
    DenseNodes,
    /// `HistoricalInformation`.
    HistoricalInformation,
    /// Any other name, kept verbatim.
    Unknown(String),
}

impl HeaderFeature {
    /// Parse a feature name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "OsmSchema-V0.6" => Self::OsmSchemaV06,
            "DenseNodes" => Self::DenseNodes,
            "HistoricalInformation" => Self::HistoricalInformation,
            other => Self::Unknown(other.to_owned()),
        }
    }

    /// Name as written in the file.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::OsmSchemaV06 => "OsmSchema-V0.6",
            Self::DenseNodes => "DenseNodes",
            Self::HistoricalInformation => "HistoricalInformation",
            Self::Unknown(name) => name,
        }
    }
}

/// Decoded `OSMHeader` block.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderBlock {
    /// Extent declared by the writer, in degrees (`x = longitude`).
    pub bbox: Option<Rect<f64>>,
    /// Features a reader must understand.
    pub required_features: Vec<HeaderFeature>,
    /// Features a reader may use.
    pub optional_features: Vec<HeaderFeature>,
    /// Program that wrote the file.
    pub writing_program: Option<String>,
    /// Data source description.
    pub source: Option<String>,
}

impl HeaderBlock {
    /// Decode the header carried by `blob`.
    ///
    /// # Errors
    /// Returns [`BlockError::UnexpectedKind`] for data blobs, a decoding
    /// error for corrupt payloads and
    /// [`BlockError::UnsupportedRequiredFeature`] when a required feature is
    /// unknown.
    pub fn decode(blob: &Blob) -> Result<Self, BlockError> {
        let header: proto::HeaderBlock = blob.decode_message(BlobKind::Header)?;
        let required_features = header
            .required_features
            .iter()
            .map(|name| match HeaderFeature::from_name(name) {
                HeaderFeature::Unknown(name) => Err(BlockError::UnsupportedRequiredFeature { name }),
                known => Ok(known),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let optional_features = header
            .optional_features
            .iter()
            .map(|name| HeaderFeature::from_name(name))
            .collect();
        Ok(Self {
            bbox: header.bbox.as_ref().map(bbox_degrees),
            required_features,
            optional_features,
            writing_program: header.writingprogram,
            source: header.source,
        })
    }
}

fn bbox_degrees(bbox: &proto::HeaderBBox) -> Rect<f64> {
    Rect::new(
        Coord {
            x: nanodegrees_to_degrees(bbox.left),
            y: nanodegrees_to_degrees(bbox.bottom),
        },
        Coord {
            x: nanodegrees_to_degrees(bbox.right),
            y: nanodegrees_to_degrees(bbox.top),
        },
    )
}

impl Blob {
    /// Decode this blob as an `OSMHeader` block.
    ///
    /// # Errors
    /// See [`HeaderBlock::decode`].
    pub fn decode_header(&self) -> Result<HeaderBlock, BlockError> {
        HeaderBlock::decode(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbf::BlobReader;
    use crate::test_support::{Payload, frame};
    use prost::Message;
    use rstest::rstest;

    fn header_blob(header: &proto::HeaderBlock) -> Blob {
        let bytes = frame("OSMHeader", Payload::Zlib(header.encode_to_vec()));
        BlobReader::new(bytes.as_slice())
            .next()
            .expect("one blob")
            .expect("valid framing")
    }

    fn header(required: &[&str], optional: &[&str]) -> proto::HeaderBlock {
        proto::HeaderBlock {
            bbox: None,
            required_features: required.iter().map(|name| (*name).to_owned()).collect(),
            optional_features: optional.iter().map(|name| (*name).to_owned()).collect(),
            writingprogram: Some("osmium/1.16".to_owned()),
            source: None,
        }
    }

    #[rstest]
    fn decodes_known_features_and_metadata() {
        let mut message = header(&["OsmSchema-V0.6", "DenseNodes"], &["Sort.Type_then_ID"]);
        message.bbox = Some(proto::HeaderBBox {
            left: 13_000_000_000,
            right: 14_000_000_000,
            top: 53_000_000_000,
            bottom: 52_000_000_000,
        });
        let decoded = header_blob(&message).decode_header().expect("valid header");

        assert_eq!(
            decoded.required_features,
            vec![HeaderFeature::OsmSchemaV06, HeaderFeature::DenseNodes]
        );
        assert_eq!(
            decoded.optional_features,
            vec![HeaderFeature::Unknown("Sort.Type_then_ID".to_owned())]
        );
        assert_eq!(decoded.writing_program.as_deref(), Some("osmium/1.16"));
        let bbox = decoded.bbox.expect("bbox present");
        assert!((bbox.min().x - 13.0).abs() < 1e-9);
        assert!((bbox.max().y - 53.0).abs() < 1e-9);
    }

    #[rstest]
    fn rejects_unknown_required_feature() {
        let blob = header_blob(&header(&["OsmSchema-V0.6", "LocationsOnWays"], &[]));
        assert!(matches!(
            blob.decode_header(),
            Err(BlockError::UnsupportedRequiredFeature { name }) if name == "LocationsOnWays"
        ));
    }

    #[rstest]
    #[case("OsmSchema-V0.6")]
    #[case("DenseNodes")]
    #[case("HistoricalInformation")]
    #[case("Has_Metadata")]
    fn feature_names_round_trip(#[case] name: &str) {
        assert_eq!(HeaderFeature::from_name(name).name(), name);
    }
}
