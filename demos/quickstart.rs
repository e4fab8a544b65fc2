//! Quickstart: write a few assertions and read them back.
//!
//! Uses the in-memory backend by default. Point `TRIPLE_MEMORY_BACKEND` at
//! `lancedb` (and optionally `TRIPLE_MEMORY_PATH`) to persist instead.
//!
//! Run: `cargo run --example quickstart`

use anyhow::Result;
use triple_memory::telemetry::init_tracing;
use triple_memory::{
    Scope, TimeOrder, TripleAssertion, TripleQuery, TripleStoreConfig, create_triple_store,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info");

    let mut config = TripleStoreConfig::default();
    config.apply_env_overrides();
    let store = create_triple_store(&config)?;
    println!("backend: {}", store.name());

    store
        .add(vec![
            TripleAssertion::new("Scrooge", "related_to", "Christmas")?
                .with_scope(Scope::Session)
                .with_owner(Some("sess-1"))
                .with_observed_at("2026-01-01T00:00:00Z")?,
            TripleAssertion::new("Scrooge", "employs", "Bob Cratchit")?
                .with_scope(Scope::Session)
                .with_owner(Some("sess-1"))
                .with_observed_at("2026-01-02T00:00:00Z")?
                .with_confidence(0.9)?
                .with_attribute("object_type", "person"),
            TripleAssertion::new("Marley", "haunts", "Scrooge")?
                .with_validity(
                    Some("2026-01-01T00:00:00Z".into()),
                    Some("2026-01-02T00:00:00Z".into()),
                )?,
        ])
        .await?;

    let latest = store
        .query(
            TripleQuery::new()
                .subject("scrooge")
                .scope(Scope::Session)
                .owner("sess-1")
                .limit(1),
        )
        .await?;
    for fact in &latest {
        println!("latest: {} {} {}", fact.subject(), fact.predicate(), fact.object());
    }

    let history = store
        .query(TripleQuery::new().order(TimeOrder::OldestFirst))
        .await?;
    for fact in &history {
        println!(
            "{}  {} {} {}",
            fact.observed_at(),
            fact.subject(),
            fact.predicate(),
            fact.object()
        );
    }

    let haunting_later = store
        .query(TripleQuery::new().predicate("haunts").active_at("2026-06-01T00:00:00Z"))
        .await?;
    println!("marley still haunting in june: {}", !haunting_later.is_empty());

    Ok(())
}
