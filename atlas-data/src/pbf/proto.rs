//! Protobuf messages of the OSM PBF format (`fileformat.proto` and
//! `osmformat.proto`).
//!
//! Only the fields the decoder reads are declared; prost skips the rest
//! (`Info`, `DenseInfo`, way locations) as unknown fields.

/// Frame header preceding every blob.
#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct BlobHeader {
    #[prost(string, required, tag = "1")]
    pub(crate) r#type: String,
    #[prost(int32, required, tag = "3")]
    pub(crate) datasize: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct Blob {
    #[prost(int32, optional, tag = "2")]
    pub(crate) raw_size: Option<i32>,
    #[prost(oneof = "blob::Data", tags = "1, 3, 4, 5, 6, 7")]
    pub(crate) data: Option<blob::Data>,
}

pub(crate) mod blob {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub(crate) enum Data {
        #[prost(bytes, tag = "1")]
        Raw(Vec<u8>),
        #[prost(bytes, tag = "3")]
        ZlibData(Vec<u8>),
        #[prost(bytes, tag = "4")]
        LzmaData(Vec<u8>),
        #[prost(bytes, tag = "5")]
        ObsoleteBzip2Data(Vec<u8>),
        #[prost(bytes, tag = "6")]
        Lz4Data(Vec<u8>),
        #[prost(bytes, tag = "7")]
        ZstdData(Vec<u8>),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct HeaderBlock {
    #[prost(message, optional, tag = "1")]
    pub(crate) bbox: Option<HeaderBBox>,
    #[prost(string, repeated, tag = "4")]
    pub(crate) required_features: Vec<String>,
    #[prost(string, repeated, tag = "5")]
    pub(crate) optional_features: Vec<String>,
    #[prost(string, optional, tag = "16")]
    pub(crate) writingprogram: Option<String>,
    #[prost(string, optional, tag = "17")]
    pub(crate) source: Option<String>,
}

/// Header bounding box in nanodegrees.
#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct HeaderBBox {
    #[prost(sint64, required, tag = "1")]
    pub(crate) left: i64,
    #[prost(sint64, required, tag = "2")]
    pub(crate) right: i64,
    #[prost(sint64, required, tag = "3")]
    pub(crate) top: i64,
    #[prost(sint64, required, tag = "4")]
    pub(crate) bottom: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct PrimitiveBlock {
    #[prost(message, required, tag = "1")]
    pub(crate) stringtable: StringTable,
    #[prost(message, repeated, tag = "2")]
    pub(crate) primitivegroup: Vec<PrimitiveGroup>,
    #[prost(int32, optional, tag = "17", default = "100")]
    pub(crate) granularity: Option<i32>,
    #[prost(int32, optional, tag = "18", default = "1000")]
    pub(crate) date_granularity: Option<i32>,
    #[prost(int64, optional, tag = "19", default = "0")]
    pub(crate) lat_offset: Option<i64>,
    #[prost(int64, optional, tag = "20", default = "0")]
    pub(crate) lon_offset: Option<i64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct StringTable {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub(crate) s: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct PrimitiveGroup {
    #[prost(message, repeated, tag = "1")]
    pub(crate) nodes: Vec<Node>,
    #[prost(message, optional, tag = "2")]
    pub(crate) dense: Option<DenseNodes>,
    #[prost(message, repeated, tag = "3")]
    pub(crate) ways: Vec<Way>,
    #[prost(message, repeated, tag = "4")]
    pub(crate) relations: Vec<Relation>,
    #[prost(message, repeated, tag = "5")]
    pub(crate) changesets: Vec<ChangeSet>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct Node {
    #[prost(sint64, required, tag = "1")]
    pub(crate) id: i64,
    #[prost(uint32, repeated, packed = "true", tag = "2")]
    pub(crate) keys: Vec<u32>,
    #[prost(uint32, repeated, packed = "true", tag = "3")]
    pub(crate) vals: Vec<u32>,
    #[prost(sint64, required, tag = "8")]
    pub(crate) lat: i64,
    #[prost(sint64, required, tag = "9")]
    pub(crate) lon: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct DenseNodes {
    #[prost(sint64, repeated, packed = "true", tag = "1")]
    pub(crate) id: Vec<i64>,
    #[prost(sint64, repeated, packed = "true", tag = "8")]
    pub(crate) lat: Vec<i64>,
    #[prost(sint64, repeated, packed = "true", tag = "9")]
    pub(crate) lon: Vec<i64>,
    #[prost(int32, repeated, packed = "true", tag = "10")]
    pub(crate) keys_vals: Vec<i32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct Way {
    #[prost(int64, required, tag = "1")]
    pub(crate) id: i64,
    #[prost(uint32, repeated, packed = "true", tag = "2")]
    pub(crate) keys: Vec<u32>,
    #[prost(uint32, repeated, packed = "true", tag = "3")]
    pub(crate) vals: Vec<u32>,
    #[prost(sint64, repeated, packed = "true", tag = "8")]
    pub(crate) refs: Vec<i64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct Relation {
    #[prost(int64, required, tag = "1")]
    pub(crate) id: i64,
    #[prost(uint32, repeated, packed = "true", tag = "2")]
    pub(crate) keys: Vec<u32>,
    #[prost(uint32, repeated, packed = "true", tag = "3")]
    pub(crate) vals: Vec<u32>,
    #[prost(int32, repeated, packed = "true", tag = "8")]
    pub(crate) roles_sid: Vec<i32>,
    #[prost(sint64, repeated, packed = "true", tag = "9")]
    pub(crate) memids: Vec<i64>,
    #[prost(enumeration = "MemberType", repeated, packed = "true", tag = "10")]
    pub(crate) types: Vec<i32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
pub(crate) enum MemberType {
    Node = 0,
    Way = 1,
    Relation = 2,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct ChangeSet {
    #[prost(int64, required, tag = "1")]
    pub(crate) id: i64,
}
