use serde_json::json;
use tempfile::TempDir;

use triple_memory::{Scope, TripleQuery, TripleStore};

use super::store_harness::{embedder, fact, ids, lancedb_from_path};

#[tokio::test]
async fn assertions_survive_close_and_reopen() {
    let tmp = TempDir::new().unwrap();

    let written = {
        let store = lancedb_from_path(tmp.path(), true);
        let batch: Vec<_> = (0..20_i32)
            .map(|i| {
                let observed_at = format!("2026-01-01T00:00:{i:02}Z");
                let mut provenance = serde_json::Map::new();
                provenance.insert("source".into(), json!("ingest"));
                provenance.insert("batch".into(), json!(i));
                let validity = if i % 2 == 0 {
                    (Some(format!("2026-01-0{}T00:00:00Z", i % 9 + 1)), None)
                } else {
                    (None, Some("2027-01-01T00:00:00Z".to_string()))
                };
                fact("subject", "has_index", &format!("item{i:02}"), &observed_at)
                    .with_scope(Scope::Run)
                    .with_owner(Some("run-7"))
                    .with_confidence(f64::from(i) / 20.0)
                    .unwrap()
                    .with_validity(validity.0, validity.1)
                    .unwrap()
                    .with_provenance(provenance)
                    .with_attribute("rank", i)
                    .with_attribute("tags", json!(["a", {"nested": i % 3}]))
            })
            .collect();
        store.add(batch.clone()).await.unwrap();
        store.close();
        batch
    };

    let reopened = lancedb_from_path(tmp.path(), true);
    let rows = reopened.query(TripleQuery::new()).await.unwrap();
    assert_eq!(rows.len(), written.len());

    let mut expected = written.clone();
    expected.reverse();
    assert_eq!(ids(&rows), ids(&expected));
    for (got, want) in rows.iter().zip(&expected) {
        assert_eq!(got.subject(), want.subject());
        assert_eq!(got.object(), want.object());
        assert_eq!(got.scope(), Scope::Run);
        assert_eq!(got.owner_id(), Some("run-7"));
        assert_eq!(got.observed_at(), want.observed_at());
        assert_eq!(got.predicate(), want.predicate());
        assert_eq!(got.confidence(), want.confidence());
        assert_eq!(got.valid_from(), want.valid_from());
        assert_eq!(got.valid_until(), want.valid_until());
        assert_eq!(got.provenance(), want.provenance());
        assert_eq!(got.attributes(), want.attributes());
        assert!(got.embedding().is_some());
    }

    let hits = reopened
        .query(TripleQuery::new().query_text("subject has_index item07").limit(1))
        .await
        .unwrap();
    assert_eq!(hits[0].object(), "item07");
}

#[tokio::test]
async fn reopened_store_keeps_appending() {
    let tmp = TempDir::new().unwrap();
    {
        let store = lancedb_from_path(tmp.path(), false);
        store
            .add(vec![fact("a", "b", "first", "2026-01-01T00:00:00Z")])
            .await
            .unwrap();
        store.close();
    }

    let store = lancedb_from_path(tmp.path(), false);
    store
        .add(vec![fact("a", "b", "second", "2026-01-02T00:00:00Z")])
        .await
        .unwrap();
    let rows = store.query(TripleQuery::new().subject("a")).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].object(), "second");
}

#[tokio::test]
async fn vectors_remain_searchable_without_embedder() {
    let tmp = TempDir::new().unwrap();
    {
        let store = lancedb_from_path(tmp.path(), true);
        store
            .add(vec![
                fact("x", "y", "z", "2026-01-01T00:00:00Z"),
                fact("p", "q", "r", "2026-01-02T00:00:00Z"),
            ])
            .await
            .unwrap();
        store.close();
    }

    let store = lancedb_from_path(tmp.path(), false);
    let probe = embedder().vector_for("p q r");
    let rows = store
        .query(TripleQuery::new().query_vector(probe).limit(1))
        .await
        .unwrap();
    assert_eq!(rows[0].subject(), "p");
    assert!(store.health_check().await);
}
