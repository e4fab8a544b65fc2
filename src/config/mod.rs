mod env_overrides;
mod loader;
mod types;

pub use env_overrides::{
    ENV_BACKEND, ENV_EMBEDDING_MODEL, ENV_EMBEDDING_TOKEN, ENV_EMBEDDING_URL, ENV_PATH,
};
pub use types::{
    BACKEND_LANCEDB, BACKEND_MEMORY, EmbeddingConfig, PROVIDER_HTTP, PROVIDER_NONE,
    TripleStoreConfig,
};
