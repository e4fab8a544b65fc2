use serde::{Deserialize, Serialize};

use crate::embeddings::DEFAULT_ENDPOINT_PATH;
use crate::error::ConfigError;

pub const BACKEND_MEMORY: &str = "memory";
pub const BACKEND_LANCEDB: &str = "lancedb";
pub const PROVIDER_NONE: &str = "none";
pub const PROVIDER_HTTP: &str = "http";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripleStoreConfig {
    /// "memory" | "lancedb"
    #[serde(default = "default_backend")]
    pub backend: String,
    /// LanceDB database directory; `~` is expanded. Unset means the
    /// platform data directory.
    #[serde(default)]
    pub path: Option<String>,
    /// Name of the LanceDB vector column
    #[serde(default = "default_vector_column")]
    pub vector_column: String,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "none" | "http"
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Expected vector width; 0 lets the first response decide. The LanceDB
    /// backend needs a non-zero value to create its vector column.
    #[serde(default)]
    pub dimensions: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("endpoint_path", &self.endpoint_path)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_backend() -> String {
    BACKEND_MEMORY.into()
}
fn default_vector_column() -> String {
    "vector".into()
}
fn default_provider() -> String {
    PROVIDER_NONE.into()
}
fn default_endpoint_path() -> String {
    DEFAULT_ENDPOINT_PATH.into()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for TripleStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
            vector_column: default_vector_column(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: String::new(),
            endpoint_path: default_endpoint_path(),
            api_token: None,
            model: None,
            dimensions: 0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != PROVIDER_NONE
    }
}

impl TripleStoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.backend.as_str() {
            BACKEND_MEMORY | BACKEND_LANCEDB => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "backend must be \"memory\" or \"lancedb\", got {other:?}"
                )));
            }
        }

        if self.vector_column.trim().is_empty() {
            return Err(ConfigError::Validation(
                "vector_column must not be empty".into(),
            ));
        }

        match self.embedding.provider.as_str() {
            PROVIDER_NONE => {}
            PROVIDER_HTTP => {
                if self.embedding.base_url.trim().is_empty() {
                    return Err(ConfigError::Validation(
                        "embedding.base_url is required for the http provider".into(),
                    ));
                }
                if self.embedding.timeout_secs == 0 {
                    return Err(ConfigError::Validation(
                        "embedding.timeout_secs must be > 0".into(),
                    ));
                }
                if self.backend == BACKEND_LANCEDB && self.embedding.dimensions == 0 {
                    return Err(ConfigError::Validation(
                        "embedding.dimensions must be > 0 for the lancedb backend".into(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::Validation(format!(
                    "embedding.provider must be \"none\" or \"http\", got {other:?}"
                )));
            }
        }

        Ok(())
    }
}
