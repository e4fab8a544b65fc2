#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use,
    clippy::too_many_arguments
)]

//! Append-only, bitemporal triple store for agent memory.
//!
//! Assertions are `(subject, predicate, object)` facts with scope, owner,
//! validity window, confidence and free-form metadata. Two backends share
//! one contract: [`InMemoryTripleStore`] for tests and ephemeral sessions,
//! and `LanceDbTripleStore` (feature `lancedb`) for on-disk persistence with
//! optional vector search through a [`TextEmbedder`].

pub mod config;
pub mod embeddings;
pub mod error;
pub mod telemetry;
pub mod triples;

pub use config::{EmbeddingConfig, TripleStoreConfig};
pub use embeddings::{HttpEmbedder, HttpEmbedderConfig, TextEmbedder};
pub use error::{BackendError, ConfigError, EmbeddingError, Result, StoreError, ValidationError};
#[cfg(feature = "lancedb")]
pub use triples::LanceDbTripleStore;
pub use triples::{
    BlockingTripleStore, InMemoryTripleStore, METRIC_COSINE, Scope, SemanticQuery, TimeOrder,
    TripleAssertion, TripleQuery, TripleStore, create_embedder, create_triple_store,
};
