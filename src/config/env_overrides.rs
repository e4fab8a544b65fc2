use super::TripleStoreConfig;
use super::types::PROVIDER_HTTP;

pub const ENV_BACKEND: &str = "TRIPLE_MEMORY_BACKEND";
pub const ENV_PATH: &str = "TRIPLE_MEMORY_PATH";
pub const ENV_EMBEDDING_URL: &str = "TRIPLE_MEMORY_EMBEDDING_URL";
pub const ENV_EMBEDDING_TOKEN: &str = "TRIPLE_MEMORY_EMBEDDING_TOKEN";
pub const ENV_EMBEDDING_MODEL: &str = "TRIPLE_MEMORY_EMBEDDING_MODEL";

impl TripleStoreConfig {
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary lookup. Empty values are ignored.
    /// Setting an embedding URL switches the provider to `http`.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = get(ENV_BACKEND) {
            self.backend = backend.trim().to_ascii_lowercase();
        }

        if let Some(path) = get(ENV_PATH) {
            self.path = Some(path);
        }

        if let Some(url) = get(ENV_EMBEDDING_URL) {
            self.embedding.base_url = url;
            self.embedding.provider = PROVIDER_HTTP.into();
        }

        if let Some(token) = get(ENV_EMBEDDING_TOKEN) {
            self.embedding.api_token = Some(token);
        }

        if let Some(model) = get(ENV_EMBEDDING_MODEL) {
            self.embedding.model = Some(model);
        }
    }
}
