use super::batch::{
    COL_ASSERTION_ID, COL_CONFIDENCE, COL_OBJECT, COL_OBSERVED_AT, COL_OWNER_ID, COL_PREDICATE,
    COL_SCOPE, COL_SUBJECT, COL_VALID_FROM, COL_VALID_UNTIL,
};
use crate::triples::model::TripleQuery;

/// Quotes a string literal for a Lance filter, doubling embedded quotes.
pub(super) fn sql_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Backtick-quoted column reference.
pub(super) fn column(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn eq(name: &str, value: &str) -> String {
    format!("{} = {}", column(name), sql_quote(value))
}

/// Compiles the structured part of a query into one `WHERE` clause.
/// Timestamps compare as strings, matching the in-memory predicate.
pub(super) fn compile_filter(query: &TripleQuery) -> Option<String> {
    let mut clauses = Vec::new();

    if let Some(subject) = &query.subject {
        clauses.push(eq(COL_SUBJECT, subject));
    }
    if let Some(predicate) = &query.predicate {
        clauses.push(eq(COL_PREDICATE, predicate));
    }
    if let Some(object) = &query.object {
        clauses.push(eq(COL_OBJECT, object));
    }
    if let Some(scope) = query.scope {
        clauses.push(eq(COL_SCOPE, scope.as_str()));
    }
    if let Some(owner) = &query.owner_id {
        clauses.push(eq(COL_OWNER_ID, owner));
    }
    if let Some(since) = &query.since {
        clauses.push(format!("{} >= {}", column(COL_OBSERVED_AT), sql_quote(since)));
    }
    if let Some(until) = &query.until {
        clauses.push(format!("{} <= {}", column(COL_OBSERVED_AT), sql_quote(until)));
    }
    if let Some(instant) = &query.active_at {
        let at = sql_quote(instant);
        clauses.push(format!(
            "({from} IS NULL OR {from} <= {at}) AND ({until} IS NULL OR {until} > {at})",
            from = column(COL_VALID_FROM),
            until = column(COL_VALID_UNTIL),
        ));
    }
    if let Some(min) = query.min_confidence {
        // Stored confidences are finite.
        if min.is_finite() {
            clauses.push(format!("{} >= {min:?}", column(COL_CONFIDENCE)));
        } else if min.is_nan() || min > 0.0 {
            clauses.push("FALSE".to_string());
        }
    }

    (!clauses.is_empty()).then(|| clauses.join(" AND "))
}

/// `filter AND extra`, either side optional.
pub(super) fn and(filter: Option<&str>, extra: &str) -> String {
    match filter {
        Some(f) => format!("({f}) AND {extra}"),
        None => extra.to_string(),
    }
}

pub(super) fn not_null(name: &str) -> String {
    format!("{} IS NOT NULL", column(name))
}

/// `assertion_id IN (...)` for a set of ids.
pub(super) fn ids_in<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    let list = ids.into_iter().map(sql_quote).collect::<Vec<_>>().join(", ");
    format!("{} IN ({list})", column(COL_ASSERTION_ID))
}
