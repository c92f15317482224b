//! Layering of partial-document patches.

use serde_json::Value;

use docenrich_shared::Patch;

use crate::normalize::is_falsy;

/// Merge an ordered sequence of patches into one.
///
/// Top-level keys of later parts overwrite earlier ones. Parts that are not
/// objects, or are falsy, count as empty.
pub fn merge_all<I, V>(parts: I) -> Patch
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    parts
        .into_iter()
        .map(Into::into)
        .filter(|value| !is_falsy(value))
        .fold(Patch::new(), |mut merged, value| {
            merged.merge(Patch::from_value(value));
            merged
        })
}
