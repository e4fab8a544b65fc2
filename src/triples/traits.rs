use super::model::{TripleAssertion, TripleQuery};
use crate::error::Result;

use async_trait::async_trait;

/// Append-only read/write contract shared by every triple store backend.
///
/// Object safe, so backends can live behind `Box<dyn TripleStore>` or
/// `Arc<dyn TripleStore>`. Each call resolves once the whole operation is
/// done; there is no streaming variant.
#[async_trait]
pub trait TripleStore: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Appends assertions. All-or-nothing: on error nothing was written.
    async fn add(&self, assertions: Vec<TripleAssertion>) -> Result<()>;

    /// Runs structured filters, an optional vector pass, ordering, then
    /// `limit`.
    async fn query(&self, query: TripleQuery) -> Result<Vec<TripleAssertion>>;

    /// Cheap liveness probe.
    async fn health_check(&self) -> bool;
}
