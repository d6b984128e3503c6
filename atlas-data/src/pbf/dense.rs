//! Sequential decoder for delta-coded dense node runs.
//!
//! Ids and coordinates are stored as deltas from the previous node, and the
//! tags of all nodes share one flat array of string ids in which each node's
//! key/value pairs end with a `0`. Each node therefore depends on every node
//! before it, so the run is decoded strictly in order.

use super::block::PrimitiveBlock;
use super::element::Node;
use super::error::BlockError;
use super::proto;

pub(crate) struct DenseNodeIter<'a> {
    block: &'a PrimitiveBlock,
    dense: &'a proto::DenseNodes,
    index: usize,
    tag_cursor: usize,
    id: i64,
    lat: i64,
    lon: i64,
    failed: bool,
}

impl<'a> DenseNodeIter<'a> {
    pub(crate) const fn new(block: &'a PrimitiveBlock, dense: &'a proto::DenseNodes) -> Self {
        Self {
            block,
            dense,
            index: 0,
            tag_cursor: 0,
            id: 0,
            lat: 0,
            lon: 0,
            failed: false,
        }
    }

    fn check_lengths(&self) -> Result<(), BlockError> {
        let expected = self.dense.id.len();
        for (what, actual) in [
            ("dense latitude", self.dense.lat.len()),
            ("dense longitude", self.dense.lon.len()),
        ] {
            if actual != expected {
                return Err(BlockError::MismatchedLengths {
                    what,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Tags of the current node; moves the cursor past its `0` separator.
    fn next_tags(&mut self) -> Result<Vec<(String, String)>, BlockError> {
        let keys_vals = &self.dense.keys_vals;
        let strings = self.block.strings();
        // Blocks in which no node has tags may omit the array entirely.
        if keys_vals.is_empty() {
            return Ok(Vec::new());
        }
        let rest = keys_vals.get(self.tag_cursor..).unwrap_or_default();
        let run = rest.iter().position(|&id| id == 0).unwrap_or(rest.len());
        self.tag_cursor += run + 1;
        if run % 2 != 0 {
            return Err(BlockError::UnpairedTags { id: self.id });
        }
        rest.get(..run)
            .unwrap_or_default()
            .chunks_exact(2)
            .map(|pair| strings.pair(i64::from(pair[0]), i64::from(pair[1])))
            .collect()
    }
}

impl Iterator for DenseNodeIter<'_> {
    type Item = Result<Node, BlockError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.index == 0
            && let Err(error) = self.check_lengths()
        {
            self.failed = true;
            return Some(Err(error));
        }
        let index = self.index;
        let (Some(id), Some(lat), Some(lon)) = (
            self.dense.id.get(index),
            self.dense.lat.get(index),
            self.dense.lon.get(index),
        ) else {
            return None;
        };
        self.index += 1;
        self.id = self.id.wrapping_add(*id);
        self.lat = self.lat.wrapping_add(*lat);
        self.lon = self.lon.wrapping_add(*lon);

        let node = self.next_tags().map(|tags| Node {
            id: self.id,
            latitude: self.block.latitude(self.lat),
            longitude: self.block.longitude(self.lon),
            tags,
        });
        if node.is_err() {
            self.failed = true;
        }
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let remaining = self.dense.id.len().saturating_sub(self.index);
        (0, Some(remaining))
    }
}
