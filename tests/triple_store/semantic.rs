use std::sync::Arc;

use async_trait::async_trait;

use triple_memory::embeddings::TextEmbedder;
use triple_memory::{
    EmbeddingError, InMemoryTripleStore, LanceDbTripleStore, METRIC_COSINE, Scope, StoreError,
    TripleQuery, TripleStore, ValidationError,
};

use super::store_harness::{
    ALL_BACKENDS, Backend, EMBEDDING_DIMS, embedder, fact, fixture, objects,
};

struct OfflineEmbedder;

#[async_trait]
impl TextEmbedder for OfflineEmbedder {
    fn name(&self) -> &str {
        "offline"
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIMS
    }

    async fn embed_texts(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Provider("gateway unreachable".into()))
    }
}

fn seed_facts() -> Vec<triple_memory::TripleAssertion> {
    vec![
        fact("alice", "likes", "green tea", "2026-01-01T00:00:00Z"),
        fact("bob", "likes", "espresso", "2026-01-02T00:00:00Z"),
        fact("carol", "owns", "a cat", "2026-01-03T00:00:00Z")
            .with_scope(Scope::Session)
            .with_owner(Some("s1")),
        fact("dave", "visited", "lisbon", "2026-01-04T00:00:00Z"),
    ]
}

#[tokio::test]
async fn text_query_ranks_by_cosine_with_retrieval_metadata() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, true);
        fx.store.add(seed_facts()).await.unwrap();

        let rows = fx
            .store
            .query(TripleQuery::new().query_text("Bob likes Espresso"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 4, "{backend:?}");
        assert_eq!(rows[0].subject(), "bob", "{backend:?}");

        let top = rows[0].retrieval().unwrap();
        assert_eq!(top["metric"], METRIC_COSINE);
        assert!((top["score"].as_f64().unwrap() - 1.0).abs() < 1e-4, "{backend:?}");
        if matches!(backend, Backend::LanceDb) {
            assert!(top["distance"].as_f64().unwrap().abs() < 1e-4);
        } else {
            assert!(top.get("distance").is_none());
        }

        for pair in rows.windows(2) {
            assert!(
                pair[0].retrieval_score().unwrap() >= pair[1].retrieval_score().unwrap(),
                "{backend:?} scores must be non-increasing"
            );
        }
    }
}

#[tokio::test]
async fn structured_filters_bound_the_vector_pass() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, true);
        fx.store.add(seed_facts()).await.unwrap();

        let rows = fx
            .store
            .query(
                TripleQuery::new()
                    .scope(Scope::Session)
                    .owner("s1")
                    .query_text("bob likes espresso"),
            )
            .await
            .unwrap();
        assert_eq!(objects(&rows), ["a cat"], "{backend:?}");
        assert!(rows[0].retrieval_score().is_some());
    }
}

#[tokio::test]
async fn limit_applies_after_ranking() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, true);
        fx.store.add(seed_facts()).await.unwrap();

        let all = fx
            .store
            .query(TripleQuery::new().query_text("dave visited lisbon"))
            .await
            .unwrap();
        let top2 = fx
            .store
            .query(TripleQuery::new().query_text("dave visited lisbon").limit(2))
            .await
            .unwrap();
        assert_eq!(top2.len(), 2);
        assert_eq!(top2[0].assertion_id(), all[0].assertion_id(), "{backend:?}");
        assert_eq!(top2[1].assertion_id(), all[1].assertion_id(), "{backend:?}");
        assert_eq!(top2[0].subject(), "dave");
    }
}

#[tokio::test]
async fn query_vector_uses_caller_vector() {
    let probe = embedder().vector_for("alice likes green tea");
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, true);
        fx.store.add(seed_facts()).await.unwrap();
        let rows = fx
            .store
            .query(TripleQuery::new().query_vector(probe.clone()).limit(1))
            .await
            .unwrap();
        assert_eq!(rows[0].subject(), "alice", "{backend:?}");
    }
}

#[tokio::test]
async fn query_vector_width_must_match_stored_vectors() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, true);
        fx.store.add(seed_facts()).await.unwrap();
        let err = fx
            .store
            .query(TripleQuery::new().query_vector(vec![1.0, 0.0, 0.0]))
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                StoreError::Validation(ValidationError::VectorDimensionMismatch { .. })
            ),
            "{backend:?}: {err}"
        );
    }
}

#[tokio::test]
async fn blank_query_text_is_rejected() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, true);
        let err = fx
            .store
            .query(TripleQuery::new().query_text("   "))
            .await
            .unwrap_err();
        assert!(
            matches!(err, StoreError::Validation(ValidationError::EmptyQueryText)),
            "{backend:?}"
        );
    }
}

#[tokio::test]
async fn failed_embedding_leaves_store_empty() {
    let tmp = tempfile::TempDir::new().unwrap();
    let stores: Vec<Box<dyn TripleStore>> = vec![
        Box::new(InMemoryTripleStore::with_embedder(Arc::new(OfflineEmbedder))),
        Box::new(LanceDbTripleStore::new(tmp.path(), Some(Arc::new(OfflineEmbedder))).unwrap()),
    ];

    for store in stores {
        let err = store.add(seed_facts()).await.unwrap_err();
        assert!(
            matches!(err, StoreError::Embedding(EmbeddingError::Provider(_))),
            "{}",
            store.name()
        );
        assert!(store.query(TripleQuery::new()).await.unwrap().is_empty());
    }
}
