use triple_memory::{Scope, StoreError, TimeOrder, TripleAssertion, TripleQuery, ValidationError};

use super::store_harness::{ALL_BACKENDS, fact, fixture, ids, objects};

#[tokio::test]
async fn scrooge_scenario() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, false);
        fx.store
            .add(vec![
                fact("Scrooge", "related_to", "Christmas", "2026-01-01T00:00:00Z")
                    .with_scope(Scope::Session)
                    .with_owner(Some("sess-1")),
            ])
            .await
            .unwrap();

        let rows = fx
            .store
            .query(
                TripleQuery::new()
                    .subject("scrooge")
                    .scope(Scope::Session)
                    .owner("sess-1")
                    .limit(10),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1, "{backend:?}");
        assert_eq!(rows[0].subject(), "scrooge");
        assert_eq!(rows[0].predicate(), "related_to");
        assert_eq!(rows[0].object(), "christmas");
        assert_eq!(rows[0].owner_id(), Some("sess-1"));
    }
}

#[tokio::test]
async fn limit_one_returns_most_recent() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, false);
        fx.store
            .add(vec![
                fact("alice", "lives_in", "paris", "2026-01-01T00:00:00Z"),
                fact("alice", "lives_in", "berlin", "2026-03-01T00:00:00Z"),
            ])
            .await
            .unwrap();

        let rows = fx
            .store
            .query(TripleQuery::new().subject("alice").limit(1))
            .await
            .unwrap();
        assert_eq!(objects(&rows), ["berlin"], "{backend:?}");

        let oldest = fx
            .store
            .query(
                TripleQuery::new()
                    .subject("alice")
                    .order(TimeOrder::OldestFirst)
                    .limit(1),
            )
            .await
            .unwrap();
        assert_eq!(objects(&oldest), ["paris"], "{backend:?}");
    }
}

#[tokio::test]
async fn non_positive_limit_returns_everything() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, false);
        let batch: Vec<_> = (0..5)
            .map(|i| fact("s", "p", &format!("o{i}"), &format!("2026-01-0{}T00:00:00Z", i + 1)))
            .collect();
        fx.store.add(batch).await.unwrap();

        for limit in [0, -3] {
            let rows = fx.store.query(TripleQuery::new().limit(limit)).await.unwrap();
            assert_eq!(objects(&rows), ["o4", "o3", "o2", "o1", "o0"], "{backend:?}");
        }
    }
}

#[tokio::test]
async fn canonicalization_makes_spellings_equal() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, false);
        fx.store
            .add(vec![fact("Alice ", " WORKS_AT", "Acme", "2026-01-01T00:00:00Z")])
            .await
            .unwrap();

        for subject in ["alice", "ALICE", "  Alice"] {
            let rows = fx
                .store
                .query(TripleQuery::new().subject(subject).predicate("works_at"))
                .await
                .unwrap();
            assert_eq!(rows.len(), 1, "{backend:?} {subject:?}");
        }
    }
}

#[tokio::test]
async fn scope_and_owner_isolate_rows() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, false);
        fx.store
            .add(vec![
                fact("a", "p", "run-s1", "2026-01-01T00:00:00Z")
                    .with_scope(Scope::Run)
                    .with_owner(Some("s1")),
                fact("a", "p", "session-s1", "2026-01-02T00:00:00Z")
                    .with_scope(Scope::Session)
                    .with_owner(Some("s1")),
                fact("a", "p", "session-s2", "2026-01-03T00:00:00Z")
                    .with_scope(Scope::Session)
                    .with_owner(Some("s2")),
                fact("a", "p", "global", "2026-01-04T00:00:00Z"),
            ])
            .await
            .unwrap();

        let session_s1 = fx
            .store
            .query(TripleQuery::new().scope(Scope::Session).owner("s1"))
            .await
            .unwrap();
        assert_eq!(objects(&session_s1), ["session-s1"], "{backend:?}");

        let global = fx
            .store
            .query(TripleQuery::new().scope(Scope::Global))
            .await
            .unwrap();
        assert_eq!(objects(&global), ["global"], "{backend:?}");

        let wrong_case = fx.store.query(TripleQuery::new().owner("S1")).await.unwrap();
        assert!(wrong_case.is_empty(), "{backend:?} owner ids keep case");
    }
}

#[tokio::test]
async fn validity_window_end_is_exclusive() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, false);
        fx.store
            .add(vec![
                fact("bob", "employed_by", "initech", "2026-01-01T00:00:00Z")
                    .with_validity(
                        Some("2026-01-01T00:00:00Z".into()),
                        Some("2026-06-01T00:00:00Z".into()),
                    )
                    .unwrap(),
                fact("bob", "employed_by", "globex", "2026-06-01T00:00:00Z")
                    .with_validity(Some("2026-06-01T00:00:00Z".into()), None)
                    .unwrap(),
                fact("bob", "likes", "coffee", "2026-01-01T00:00:00Z"),
            ])
            .await
            .unwrap();

        let march = fx
            .store
            .query(
                TripleQuery::new()
                    .predicate("employed_by")
                    .active_at("2026-03-01T00:00:00Z"),
            )
            .await
            .unwrap();
        assert_eq!(objects(&march), ["initech"], "{backend:?}");

        let boundary = fx
            .store
            .query(
                TripleQuery::new()
                    .predicate("employed_by")
                    .active_at("2026-06-01T00:00:00Z"),
            )
            .await
            .unwrap();
        assert_eq!(objects(&boundary), ["globex"], "{backend:?}");

        let unbounded = fx
            .store
            .query(TripleQuery::new().predicate("likes").active_at("1999-01-01T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(unbounded.len(), 1, "{backend:?}");
    }
}

#[tokio::test]
async fn observed_range_and_confidence_filters() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, false);
        fx.store
            .add(vec![
                fact("x", "p", "jan", "2026-01-01T00:00:00Z")
                    .with_confidence(0.2)
                    .unwrap(),
                fact("x", "p", "feb", "2026-02-01T00:00:00Z")
                    .with_confidence(0.9)
                    .unwrap(),
                fact("x", "p", "mar", "2026-03-01T00:00:00Z")
                    .with_confidence(0.5)
                    .unwrap(),
            ])
            .await
            .unwrap();

        let window = fx
            .store
            .query(
                TripleQuery::new()
                    .since("2026-02-01T00:00:00Z")
                    .until("2026-03-01T00:00:00Z"),
            )
            .await
            .unwrap();
        assert_eq!(objects(&window), ["mar", "feb"], "{backend:?}");

        let confident = fx
            .store
            .query(TripleQuery::new().min_confidence(0.5))
            .await
            .unwrap();
        assert_eq!(objects(&confident), ["mar", "feb"], "{backend:?}");
    }
}

#[tokio::test]
async fn equal_timestamps_tie_break_on_id() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, false);
        let batch: Vec<_> = ["c", "a", "b"]
            .into_iter()
            .map(|o| fact("s", "p", o, "2026-01-01T00:00:00Z"))
            .collect();
        let mut expected = ids(&batch);
        expected.sort();
        fx.store.add(batch).await.unwrap();

        let rows = fx.store.query(TripleQuery::new()).await.unwrap();
        assert_eq!(ids(&rows), expected, "{backend:?}");
    }
}

#[tokio::test]
async fn query_text_without_embedder_is_rejected() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, false);
        fx.store
            .add(vec![fact("a", "b", "c", "2026-01-01T00:00:00Z")])
            .await
            .unwrap();
        let err = fx
            .store
            .query(TripleQuery::new().query_text("a b c"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::EmbedderRequired), "{backend:?}: {err}");
    }
}

#[tokio::test]
async fn duplicate_assertion_ids_are_rejected() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, false);
        let original = fact("a", "b", "c", "2026-01-01T00:00:00Z");
        fx.store.add(vec![original.clone()]).await.unwrap();

        let err = fx
            .store
            .add(vec![
                fact("new", "row", "here", "2026-01-02T00:00:00Z"),
                original.clone(),
            ])
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                StoreError::Validation(ValidationError::DuplicateAssertionId(_))
            ),
            "{backend:?}"
        );

        let rows = fx.store.query(TripleQuery::new()).await.unwrap();
        assert_eq!(ids(&rows), vec![original.assertion_id().to_string()], "{backend:?}");
    }
}

#[tokio::test]
async fn metadata_round_trips() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, false);
        let mut provenance = serde_json::Map::new();
        provenance.insert("source".into(), "chat".into());
        provenance.insert("turn".into(), 7.into());
        let assertion = fact("a", "b", "c", "2026-01-01T00:00:00Z")
            .with_provenance(provenance.clone())
            .with_attribute("evidence_quote", "a said b c");
        fx.store.add(vec![assertion.clone()]).await.unwrap();

        let rows = fx.store.query(TripleQuery::new()).await.unwrap();
        assert_eq!(rows[0], assertion, "{backend:?}");
        assert_eq!(rows[0].provenance(), &provenance);
        assert_eq!(rows[0].attributes()["evidence_quote"], "a said b c");
    }
}

#[tokio::test]
async fn empty_add_is_a_no_op() {
    for backend in ALL_BACKENDS {
        let fx = fixture(backend, false);
        fx.store.add(Vec::<TripleAssertion>::new()).await.unwrap();
        assert!(fx.store.query(TripleQuery::new()).await.unwrap().is_empty());
        assert!(fx.store.health_check().await, "{backend:?}");
    }
}
