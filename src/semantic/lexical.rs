//! Literal (keyword) matching against normalized phrase text.
//!
//! Unlike semantic search there is no ranking: a phrase either contains the
//! normalized query as a substring or it does not, and matches keep the
//! order in which candidates were supplied.

/// Return positions of every candidate whose normalized text contains `query`.
///
/// `query` must already be normalized. An empty query matches nothing.
pub fn match_substring<'a, I>(query: &str, candidates: I) -> Vec<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    if query.is_empty() {
        return vec![];
    }

    candidates
        .into_iter()
        .enumerate()
        .filter_map(|(pos, text)| text.contains(query).then_some(pos))
        .collect()
}
