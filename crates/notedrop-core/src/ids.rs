//! Identifier normalization and sparse-order sorting.
//!
//! Every other component funnels lists of opaque data-source ids through
//! these two functions, so membership checks and persisted orders always see
//! the same canonical form.

use std::collections::{HashMap, HashSet};

/// Canonicalizes a list of identifiers.
///
/// Each element is trimmed, empty strings are dropped, and duplicates are
/// removed keeping the first occurrence. Relative order is otherwise
/// preserved. Total: never fails, and idempotent.
#[must_use]
pub fn normalize_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in ids {
        let trimmed = id.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_owned()) {
            out.push(trimmed.to_owned());
        }
    }
    out
}

/// Stable-sorts ids by their rank in a persisted order.
///
/// An id's rank is its index in `order`; ids absent from `order` rank after
/// every ordered id. Ties keep their original relative input order (stable
/// sort), so toggling activity never reshuffles unordered ids.
#[must_use]
pub fn sort_ids_by_order(ids: &[String], order: &[String]) -> Vec<String> {
    let rank: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(index, id)| (id.as_str(), index))
        .collect();
    let mut sorted = ids.to_vec();
    sorted.sort_by_key(|id| rank.get(id.as_str()).copied().unwrap_or(usize::MAX));
    sorted
}
