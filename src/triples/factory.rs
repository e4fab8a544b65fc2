use super::in_memory::InMemoryTripleStore;
use super::traits::TripleStore;
use crate::config::{
    BACKEND_LANCEDB, BACKEND_MEMORY, EmbeddingConfig, PROVIDER_HTTP, PROVIDER_NONE,
    TripleStoreConfig,
};
use crate::embeddings::{HttpEmbedder, HttpEmbedderConfig, TextEmbedder};
use crate::error::{ConfigError, Result};

use std::sync::Arc;
use std::time::Duration;

/// Builds the embedder named by `config`, or `None` for provider `none`.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Option<Arc<dyn TextEmbedder>>> {
    match config.provider.as_str() {
        PROVIDER_NONE => Ok(None),
        PROVIDER_HTTP => {
            let mut http = HttpEmbedderConfig::new(config.base_url.clone())
                .with_endpoint_path(config.endpoint_path.clone())
                .with_dimensions(config.dimensions)
                .with_timeout(Duration::from_secs(config.timeout_secs));
            if let Some(token) = &config.api_token {
                http = http.with_api_token(token.clone());
            }
            if let Some(model) = &config.model {
                http = http.with_model(model.clone());
            }
            Ok(Some(Arc::new(HttpEmbedder::new(&http)?)))
        }
        other => {
            Err(ConfigError::Validation(format!("unknown embedding provider {other:?}")).into())
        }
    }
}

pub fn create_triple_store(config: &TripleStoreConfig) -> Result<Box<dyn TripleStore>> {
    config.validate()?;
    let embedder = create_embedder(&config.embedding)?;

    match config.backend.as_str() {
        BACKEND_MEMORY => Ok(Box::new(match embedder {
            Some(embedder) => InMemoryTripleStore::with_embedder(embedder),
            None => InMemoryTripleStore::new(),
        })),
        #[cfg(feature = "lancedb")]
        BACKEND_LANCEDB => {
            let path = config.resolved_path()?;
            tracing::debug!(path = %path.display(), "creating lancedb triple store");
            let store = super::lancedb::LanceDbTripleStore::new(path, embedder)?
                .with_vector_column(config.vector_column.clone());
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "lancedb"))]
        BACKEND_LANCEDB => Err(ConfigError::Validation(
            "backend \"lancedb\" requires the lancedb feature".into(),
        )
        .into()),
        other => Err(ConfigError::Validation(format!("unknown backend {other:?}")).into()),
    }
}
