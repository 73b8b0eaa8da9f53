use crate::model::Entry;

/// Most results a single query returns.
pub const SEARCH_LIMIT: usize = 100;

/// Queries shorter than this never match anything.
pub const MIN_QUERY_CHARS: usize = 2;

pub fn is_searchable(query: &str) -> bool {
    !query.trim().is_empty() && query.chars().count() >= MIN_QUERY_CHARS
}

/// Searches `entries` for names containing `query`, ignoring case, and
/// returns the positions of the matches. Callers index back into the same
/// slice, which lets the selection refer to a result by position.
///
/// Results keep the order of `entries` and stop after `limit` matches.
/// Entries without a name or a reference never match.
pub fn search_indices(query: &str, entries: &[Entry], limit: usize) -> Vec<usize> {
    if limit == 0 || !is_searchable(query) {
        return Vec::new();
    }

    let needle = query.to_lowercase();
    let indices: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_linkable() && e.search_key().contains(&needle))
        .map(|(i, _)| i)
        .take(limit)
        .collect();

    log::debug!("search: query='{}', matches={}", query, indices.len());
    indices
}
