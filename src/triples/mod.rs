pub mod blocking;
pub mod canonical;
pub mod factory;
pub mod in_memory;
#[cfg(feature = "lancedb")]
pub mod lancedb;
pub mod model;
pub mod ordering;
mod semantic;
pub mod traits;
pub mod vector;

pub use blocking::BlockingTripleStore;
pub use canonical::{canonicalize_owner, canonicalize_term};
pub use factory::{create_embedder, create_triple_store};
pub use in_memory::InMemoryTripleStore;
#[cfg(feature = "lancedb")]
pub use self::lancedb::{DEFAULT_VECTOR_COLUMN, LanceDbTripleStore};
pub use model::{
    Metadata, RETRIEVAL_ATTRIBUTE, Scope, SemanticQuery, TimeOrder, TripleAssertion, TripleQuery,
};
pub use semantic::METRIC_COSINE;
pub use traits::TripleStore;
