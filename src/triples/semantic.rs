//! Embedding plumbing shared by both backends: write-time embedding of
//! canonical text and resolution of a query's semantic component.

use super::canonical::canonicalize_term;
use super::model::{SemanticQuery, TripleAssertion};
use crate::embeddings::{TextEmbedder, embed_checked};
use crate::error::{Result, StoreError, ValidationError};

use serde_json::{Value, json};

/// Value of `_retrieval.metric` on ranked results.
pub const METRIC_COSINE: &str = "cosine";

/// Embeds every assertion's canonical text in one batch and stores the
/// vectors on the assertions. Without an embedder, any caller-supplied
/// vector is cleared so rows only carry vectors this store produced.
pub(crate) async fn embed_assertions(
    embedder: Option<&dyn TextEmbedder>,
    assertions: &mut [TripleAssertion],
) -> Result<()> {
    let Some(embedder) = embedder else {
        for assertion in assertions.iter_mut() {
            assertion.set_embedding(None);
        }
        return Ok(());
    };

    let texts: Vec<String> = assertions
        .iter()
        .map(TripleAssertion::canonical_text)
        .collect();
    let vectors = embed_checked(embedder, &texts).await?;
    for (assertion, vector) in assertions.iter_mut().zip(vectors) {
        assertion.set_embedding(Some(vector));
    }
    Ok(())
}

/// Turns the query's semantic component into a probe vector.
///
/// `Text` without an embedder is [`StoreError::EmbedderRequired`]; the text
/// is canonicalized the same way stored terms are before embedding.
/// `expected_dims` is the width of stored vectors when the backend knows it.
pub(crate) async fn resolve_probe(
    semantic: Option<&SemanticQuery>,
    embedder: Option<&dyn TextEmbedder>,
    expected_dims: Option<usize>,
) -> Result<Option<Vec<f32>>> {
    match semantic {
        None => Ok(None),
        Some(SemanticQuery::Vector(vector)) => {
            if vector.is_empty() {
                return Err(ValidationError::EmptyQueryVector.into());
            }
            if let Some(expected) = expected_dims
                && expected != vector.len()
            {
                return Err(ValidationError::VectorDimensionMismatch {
                    expected,
                    actual: vector.len(),
                }
                .into());
            }
            Ok(Some(vector.clone()))
        }
        Some(SemanticQuery::Text(text)) => {
            let embedder = embedder.ok_or(StoreError::EmbedderRequired)?;
            let text = canonicalize_term(text);
            if text.is_empty() {
                return Err(ValidationError::EmptyQueryText.into());
            }
            let mut vectors = embed_checked(embedder, &[text]).await?;
            Ok(vectors.pop())
        }
    }
}

pub(crate) fn retrieval_metadata(score: f64, distance: Option<f64>) -> Value {
    match distance {
        Some(distance) => json!({
            "score": score,
            "distance": distance,
            "metric": METRIC_COSINE,
        }),
        None => json!({
            "score": score,
            "metric": METRIC_COSINE,
        }),
    }
}
