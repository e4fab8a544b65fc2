//! Term canonicalization.
//!
//! Subject, predicate and object strings are matched by value after trimming
//! and lowercasing, so `"Alice "` and `"alice"` address the same term. These
//! functions are pure and idempotent.

/// Canonical form of a subject/predicate/object term: trimmed, lowercased.
pub fn canonicalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Owner ids are trimmed but keep their case; a blank owner means "none".
pub fn canonicalize_owner(owner: Option<&str>) -> Option<String> {
    owner
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
}

/// Trimmed, non-empty timestamp or `None`.
pub(crate) fn canonicalize_timestamp(ts: Option<&str>) -> Option<String> {
    ts.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
