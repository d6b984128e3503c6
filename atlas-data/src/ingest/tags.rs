//! Tag helpers for feature extraction.
//!
//! An element becomes a feature when it carries at least one descriptive
//! tag. Editing metadata such as `created_by` or `source` does not count.

const METADATA_KEYS: &[&str] = &[
    "attribution",
    "comment",
    "created_by",
    "fixme",
    "FIXME",
    "note",
    "source",
];

pub(super) fn has_descriptive_tags(tags: &[(String, String)]) -> bool {
    tags.iter().any(|(key, _)| is_descriptive_key(key))
}

/// The non-empty `name` tag, used as the feature label.
pub(super) fn label_of(tags: &[(String, String)]) -> Option<&str> {
    tags.iter()
        .find(|(key, _)| key == "name")
        .map(|(_, value)| value.as_str())
        .filter(|value| !value.is_empty())
}

fn is_descriptive_key(key: &str) -> bool {
    !METADATA_KEYS.contains(&key) && !key.starts_with("source:")
}
