//! Synchronous facade over any [`TripleStore`] for callers without an async
//! runtime. Each call blocks until the wrapped store's future completes.

use super::model::{TripleAssertion, TripleQuery};
use super::traits::TripleStore;
use crate::error::{BackendError, Result};

use tokio::runtime::{Builder, Runtime};

pub struct BlockingTripleStore {
    runtime: Runtime,
    store: Box<dyn TripleStore>,
}

impl BlockingTripleStore {
    pub fn new(store: impl TripleStore + 'static) -> Result<Self> {
        Self::from_boxed(Box::new(store))
    }

    pub fn from_boxed(store: Box<dyn TripleStore>) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("triple-store")
            .enable_all()
            .build()
            .map_err(BackendError::Io)?;
        Ok(Self { runtime, store })
    }

    pub fn name(&self) -> &str {
        self.store.name()
    }

    pub fn add(&self, assertions: Vec<TripleAssertion>) -> Result<()> {
        ensure_outside_runtime()?;
        self.runtime.block_on(self.store.add(assertions))
    }

    pub fn query(&self, query: TripleQuery) -> Result<Vec<TripleAssertion>> {
        ensure_outside_runtime()?;
        self.runtime.block_on(self.store.query(query))
    }

    pub fn health_check(&self) -> bool {
        if ensure_outside_runtime().is_err() {
            return false;
        }
        self.runtime.block_on(self.store.health_check())
    }

    /// Returns the wrapped store; the owned runtime is shut down.
    pub fn into_inner(self) -> Box<dyn TripleStore> {
        self.runtime.shutdown_background();
        self.store
    }
}

fn ensure_outside_runtime() -> Result<()> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(BackendError::Runtime(
            "BlockingTripleStore called from inside an async runtime; use the async store".into(),
        )
        .into());
    }
    Ok(())
}
