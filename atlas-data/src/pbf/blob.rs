//! Length-prefixed blob framing.
//!
//! A PBF file is a sequence of records:
//!
//! ```text
//! u32 (big-endian)  length of the BlobHeader message
//! BlobHeader        type ("OSMHeader" | "OSMData") and payload size
//! Blob              raw or zlib-compressed block bytes
//! ```
//!
//! [`BlobReader`] validates each record and yields [`Blob`]s whose payload
//! is inflated only when a block is decoded.

use std::{
    borrow::Cow,
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use flate2::read::ZlibDecoder;
use log::debug;
use prost::Message;

use super::error::{BlobError, BlockError};
use super::proto::{self, blob::Data};

/// Blob headers must be strictly shorter than this.
pub const MAX_BLOB_HEADER_SIZE: u32 = 64 * 1024;

/// Blob payloads, compressed or not, must be strictly smaller than this.
pub const MAX_BLOB_SIZE: i64 = 32 * 1024 * 1024;

fn payload_limit() -> usize {
    usize::try_from(MAX_BLOB_SIZE).unwrap_or(usize::MAX)
}

/// Block type announced by a blob header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobKind {
    /// `OSMHeader`: file metadata.
    Header,
    /// `OSMData`: a primitive block.
    Primitive,
}

impl BlobKind {
    fn from_type(kind: &str) -> Option<Self> {
        match kind {
            "OSMHeader" => Some(Self::Header),
            "OSMData" => Some(Self::Primitive),
            _ => None,
        }
    }
}

/// One framed record with its still-compressed payload.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    kind: BlobKind,
    compressed: bool,
    payload: Vec<u8>,
    raw_size: Option<usize>,
    offset: u64,
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("kind", &self.kind)
            .field("compressed", &self.compressed)
            .field("payload_len", &self.payload.len())
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl Blob {
    /// Block type of the payload.
    #[must_use]
    pub const fn kind(&self) -> BlobKind {
        self.kind
    }

    /// Whether the payload is zlib-compressed.
    #[must_use]
    pub const fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Payload bytes as stored in the file.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Byte offset of the record in its stream.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Payload bytes after decompression.
    ///
    /// # Errors
    /// Returns [`BlockError::Inflate`] for corrupt zlib data,
    /// [`BlockError::InflatedTooLarge`] when the output reaches
    /// [`MAX_BLOB_SIZE`], and [`BlockError::SizeMismatch`] when the output
    /// length disagrees with the declared raw size.
    pub fn data(&self) -> Result<Cow<'_, [u8]>, BlockError> {
        if !self.compressed {
            return Ok(Cow::Borrowed(&self.payload));
        }
        let limit = payload_limit();
        // `raw_size` was range-checked while framing.
        let capacity = self.raw_size.unwrap_or(self.payload.len().saturating_mul(4));
        let mut inflated = Vec::with_capacity(capacity.min(limit));
        ZlibDecoder::new(self.payload.as_slice())
            .take(u64::try_from(limit).unwrap_or(u64::MAX))
            .read_to_end(&mut inflated)
            .map_err(|source| BlockError::Inflate {
                offset: self.offset,
                source,
            })?;
        if inflated.len() >= limit {
            return Err(BlockError::InflatedTooLarge {
                offset: self.offset,
                limit: MAX_BLOB_SIZE,
            });
        }
        if let Some(expected) = self.raw_size
            && expected != inflated.len()
        {
            return Err(BlockError::SizeMismatch {
                offset: self.offset,
                expected,
                actual: inflated.len(),
            });
        }
        Ok(Cow::Owned(inflated))
    }

    pub(crate) fn decode_message<M: Message + Default>(
        &self,
        expected: BlobKind,
    ) -> Result<M, BlockError> {
        if self.kind != expected {
            return Err(BlockError::UnexpectedKind {
                offset: self.offset,
                expected,
                found: self.kind,
            });
        }
        let data = self.data()?;
        M::decode(data.as_ref()).map_err(|source| BlockError::Protobuf {
            offset: self.offset,
            source,
        })
    }
}

/// Iterator over the blobs of a PBF stream.
///
/// # Examples
/// ```no_run
/// use atlas_data::pbf::{BlobKind, BlobReader};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut data_blobs = 0;
/// for blob in BlobReader::from_path("berlin.osm.pbf")? {
///     if blob?.kind() == BlobKind::Primitive {
///         data_blobs += 1;
///     }
/// }
/// println!("{data_blobs} data blobs");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BlobReader<R> {
    reader: R,
    offset: u64,
    finished: bool,
}

impl BlobReader<BufReader<File>> {
    /// Open a PBF file for framing.
    ///
    /// # Errors
    /// Returns the I/O error raised when opening the file.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        File::open(path).map(|file| Self::new(BufReader::new(file)))
    }
}

impl<R: Read> BlobReader<R> {
    /// Frame blobs from `reader`, starting at its current position.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            finished: false,
        }
    }

    /// Bytes consumed so far.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.offset
    }

    fn next_blob(&mut self) -> Result<Option<Blob>, BlobError> {
        let start = self.offset;
        let mut prefix = [0_u8; 4];
        let read = self.fill(&mut prefix, start)?;
        if read == 0 {
            return Ok(None);
        }
        if read < prefix.len() {
            return Err(BlobError::Truncated {
                offset: start,
                expected: 4,
                available: read as u64,
            });
        }
        let header_len = u32::from_be_bytes(prefix);
        if header_len >= MAX_BLOB_HEADER_SIZE {
            return Err(BlobError::HeaderTooLarge {
                offset: start,
                size: header_len,
            });
        }

        let header: proto::BlobHeader = self.read_message(header_len as usize, start)?;
        let size = i64::from(header.datasize);
        if !(0..MAX_BLOB_SIZE).contains(&size) {
            return Err(BlobError::BlobTooLarge {
                offset: start,
                size,
            });
        }
        let Some(kind) = BlobKind::from_type(&header.r#type) else {
            return Err(BlobError::UnknownBlobType {
                offset: start,
                kind: header.r#type,
            });
        };

        let blob: proto::Blob = self.read_message(usize::try_from(size).unwrap_or(0), start)?;
        let (compressed, payload) = match blob.data {
            Some(Data::Raw(payload)) => (false, payload),
            Some(Data::ZlibData(payload)) => (true, payload),
            Some(unsupported) => {
                return Err(BlobError::UnsupportedCompression {
                    offset: start,
                    compression: compression_name(&unsupported),
                });
            }
            None => return Err(BlobError::MissingData { offset: start }),
        };
        let raw_size = blob
            .raw_size
            .map(|raw| {
                usize::try_from(raw)
                    .ok()
                    .filter(|&size| size < payload_limit())
                    .ok_or(BlobError::RawSizeOutOfRange {
                        offset: start,
                        size: i64::from(raw),
                    })
            })
            .transpose()?;
        debug!(
            "framed {kind:?} blob at byte {start} ({} payload bytes)",
            payload.len()
        );
        Ok(Some(Blob {
            kind,
            compressed,
            payload,
            raw_size,
            offset: start,
        }))
    }

    fn read_message<M: Message + Default>(&mut self, len: usize, start: u64) -> Result<M, BlobError> {
        let mut buffer = vec![0_u8; len];
        let position = self.offset;
        let read = self.fill(&mut buffer, start)?;
        if read < len {
            return Err(BlobError::Truncated {
                offset: position,
                expected: len as u64,
                available: read as u64,
            });
        }
        M::decode(buffer.as_slice()).map_err(|source| BlobError::Decode {
            offset: start,
            source,
        })
    }

    /// Read until `buffer` is full or the stream ends; returns bytes read.
    fn fill(&mut self, buffer: &mut [u8], start: u64) -> Result<usize, BlobError> {
        let mut filled = 0;
        while filled < buffer.len() {
            let Some(rest) = buffer.get_mut(filled..) else {
                break;
            };
            match self.reader.read(rest) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(source) => return Err(BlobError::Io { offset: start, source }),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }
}

impl<R: Read + Seek> BlobReader<R> {
    /// Rewind to the start of the stream and clear any earlier failure.
    ///
    /// # Errors
    /// Returns [`BlobError::Io`] when seeking fails.
    pub fn reset(&mut self) -> Result<(), BlobError> {
        self.reader
            .seek(SeekFrom::Start(0))
            .map_err(|source| BlobError::Io {
                offset: self.offset,
                source,
            })?;
        self.offset = 0;
        self.finished = false;
        Ok(())
    }
}

impl<R: Read> Iterator for BlobReader<R> {
    type Item = Result<Blob, BlobError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_blob() {
            Ok(Some(blob)) => Some(Ok(blob)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for BlobReader<R> {}

const fn compression_name(data: &Data) -> &'static str {
    match data {
        Data::Raw(_) => "raw",
        Data::ZlibData(_) => "zlib",
        Data::LzmaData(_) => "LZMA",
        Data::ObsoleteBzip2Data(_) => "bzip2",
        Data::Lz4Data(_) => "LZ4",
        Data::ZstdData(_) => "Zstd",
    }
}
