//! Volatile backend: a `Vec` of assertions behind a read-write lock.
//!
//! Structured queries are a linear scan; vector queries are brute-force
//! cosine over rows that carry a vector. Contents are lost on drop.

use super::model::{TripleAssertion, TripleQuery};
use super::ordering::{apply_limit, sort_by_observed_at, sort_by_score};
use super::semantic::{embed_assertions, resolve_probe, retrieval_metadata};
use super::traits::TripleStore;
use super::vector::cosine_similarity;
use crate::embeddings::TextEmbedder;
use crate::error::{Result, ValidationError};

use async_trait::async_trait;
use tokio::sync::RwLock;

use std::collections::HashSet;
use std::sync::Arc;

pub struct InMemoryTripleStore {
    rows: RwLock<Vec<TripleAssertion>>,
    embedder: Option<Arc<dyn TextEmbedder>>,
}

impl Default for InMemoryTripleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTripleStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            embedder: None,
        }
    }

    pub fn with_embedder(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            embedder: Some(embedder),
        }
    }

    /// Number of stored assertions.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    async fn append(&self, mut assertions: Vec<TripleAssertion>) -> Result<()> {
        if assertions.is_empty() {
            return Ok(());
        }

        let mut batch_ids = HashSet::with_capacity(assertions.len());
        for assertion in &assertions {
            if !batch_ids.insert(assertion.assertion_id().to_string()) {
                return Err(
                    ValidationError::DuplicateAssertionId(assertion.assertion_id().into()).into(),
                );
            }
        }

        // Embedding happens before the lock is taken; a failure here leaves
        // the store untouched.
        embed_assertions(self.embedder.as_deref(), &mut assertions).await?;

        let mut rows = self.rows.write().await;
        if let Some(existing) = rows
            .iter()
            .find(|row| batch_ids.contains(row.assertion_id()))
        {
            return Err(
                ValidationError::DuplicateAssertionId(existing.assertion_id().into()).into(),
            );
        }
        let added = assertions.len();
        rows.extend(assertions);
        tracing::debug!(added, total = rows.len(), "in-memory triple store append");
        Ok(())
    }

    async fn search(&self, query: TripleQuery) -> Result<Vec<TripleAssertion>> {
        let expected_dims = self
            .embedder
            .as_deref()
            .map(TextEmbedder::dimensions)
            .filter(|d| *d > 0);
        let probe =
            resolve_probe(query.semantic(), self.embedder.as_deref(), expected_dims).await?;

        let matched: Vec<TripleAssertion> = {
            let rows = self.rows.read().await;
            rows.iter().filter(|row| query.matches(row)).cloned().collect()
        };

        let Some(probe) = probe else {
            let mut matched = matched;
            sort_by_observed_at(&mut matched, query.order);
            apply_limit(&mut matched, query.limit_value());
            tracing::debug!(returned = matched.len(), "in-memory structured query");
            return Ok(matched);
        };

        let mut scored = Vec::with_capacity(matched.len());
        for row in matched {
            let Some(vector) = row.embedding() else {
                continue;
            };
            let score = cosine_similarity(vector, &probe).ok_or(
                ValidationError::VectorDimensionMismatch {
                    expected: vector.len(),
                    actual: probe.len(),
                },
            )?;
            scored.push((row, score));
        }

        sort_by_score(&mut scored);
        apply_limit(&mut scored, query.limit_value());
        tracing::debug!(returned = scored.len(), "in-memory vector query");

        Ok(scored
            .into_iter()
            .map(|(mut row, score)| {
                row.attach_retrieval(retrieval_metadata(score, None));
                row
            })
            .collect())
    }
}

#[async_trait]
impl TripleStore for InMemoryTripleStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn add(&self, assertions: Vec<TripleAssertion>) -> Result<()> {
        self.append(assertions).await
    }

    async fn query(&self, query: TripleQuery) -> Result<Vec<TripleAssertion>> {
        self.search(query).await
    }

    async fn health_check(&self) -> bool {
        true
    }
}
