//! Ordering and truncation rules shared by every backend.
//!
//! Structured results sort by `observed_at` (direction from [`TimeOrder`]),
//! ties broken by `assertion_id` ascending. Semantic results sort by score
//! descending, ties broken the same way. `limit` is always applied after
//! sorting.

use super::model::{TimeOrder, TripleAssertion};

use std::cmp::Ordering;

pub fn sort_by_observed_at(assertions: &mut [TripleAssertion], order: TimeOrder) {
    assertions.sort_by(|a, b| {
        let by_time = a.observed_at().cmp(b.observed_at());
        let by_time = match order {
            TimeOrder::NewestFirst => by_time.reverse(),
            TimeOrder::OldestFirst => by_time,
        };
        by_time.then_with(|| a.assertion_id().cmp(b.assertion_id()))
    });
}

/// Sorts `(assertion, score)` pairs by score descending, then id ascending.
pub fn sort_by_score(scored: &mut [(TripleAssertion, f64)]) {
    scored.sort_by(|(a, sa), (b, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.assertion_id().cmp(b.assertion_id()))
    });
}

pub fn apply_limit<T>(items: &mut Vec<T>, limit: Option<usize>) {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
}
