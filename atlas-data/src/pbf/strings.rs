//! Per-block string interning table.

use super::error::BlockError;

/// UTF-8 strings referenced by index from a primitive block.
///
/// Entry 0 is reserved by the format (usually the empty string) and serves
/// as the dense-node tag separator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    entries: Vec<Vec<u8>>,
}

impl StringTable {
    /// Wrap raw table entries.
    #[must_use]
    pub const fn new(entries: Vec<Vec<u8>>) -> Self {
        Self { entries }
    }

    /// Number of entries, including the reserved one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`.
    ///
    /// # Errors
    /// Returns [`BlockError::StringIndex`] for indices outside the table and
    /// [`BlockError::InvalidUtf8`] for entries that are not UTF-8.
    pub fn get(&self, index: i64) -> Result<&str, BlockError> {
        let position = usize::try_from(index).ok();
        let bytes = position
            .and_then(|position| self.entries.get(position))
            .ok_or(BlockError::StringIndex {
                index,
                len: self.entries.len(),
            })?;
        std::str::from_utf8(bytes).map_err(|source| BlockError::InvalidUtf8 {
            index: position.unwrap_or_default(),
            source,
        })
    }

    /// Resolve parallel key and value id arrays into owned pairs.
    pub(crate) fn resolve_pairs(
        &self,
        keys: &[u32],
        values: &[u32],
        what: &'static str,
    ) -> Result<Vec<(String, String)>, BlockError> {
        if keys.len() != values.len() {
            return Err(BlockError::MismatchedLengths {
                what,
                expected: keys.len(),
                actual: values.len(),
            });
        }
        keys.iter()
            .zip(values)
            .map(|(&key, &value)| self.pair(i64::from(key), i64::from(value)))
            .collect()
    }

    pub(crate) fn pair(&self, key: i64, value: i64) -> Result<(String, String), BlockError> {
        Ok((self.get(key)?.to_owned(), self.get(value)?.to_owned()))
    }
}
