use crate::error::EmbeddingError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use std::time::Duration;

pub const DEFAULT_ENDPOINT_PATH: &str = "/api/gateway/embeddings";
const CONNECT_TIMEOUT_SECS: u64 = 5;
const ERROR_BODY_MAX_CHARS: usize = 512;

/// Anything that can turn text into fixed-length vectors.
///
/// One vector per input, in input order. Every vector written to a store
/// must come from the same model; the store does not detect a switch.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Embedding dimensions, or `0` when the provider does not declare one
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts into vectors
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Embeds `texts` and checks the provider kept its side of the contract:
/// one non-empty vector per input, all of the declared dimension.
pub async fn embed_checked(
    embedder: &dyn TextEmbedder,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let vectors = embedder.embed_texts(texts).await?;
    if vectors.len() != texts.len() {
        return Err(EmbeddingError::CountMismatch {
            expected: texts.len(),
            actual: vectors.len(),
        });
    }

    let declared = embedder.dimensions();
    let expected = if declared > 0 {
        declared
    } else {
        vectors.first().map_or(0, Vec::len)
    };
    for vector in &vectors {
        if vector.is_empty() || vector.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
    }

    tracing::debug!(
        provider = embedder.name(),
        count = vectors.len(),
        dims = expected,
        "embedded texts"
    );
    Ok(vectors)
}

// ── HTTP gateway embedder ────────────────────────────────────

/// Settings for [`HttpEmbedder`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpEmbedderConfig {
    pub base_url: String,
    pub endpoint_path: String,
    pub api_token: Option<String>,
    pub model: Option<String>,
    pub dimensions: usize,
    pub timeout: Option<Duration>,
}

impl HttpEmbedderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
            api_token: None,
            model: None,
            dimensions: 0,
            timeout: None,
        }
    }

    pub fn with_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = path.into();
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl std::fmt::Debug for HttpEmbedderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbedderConfig")
            .field("base_url", &self.base_url)
            .field("endpoint_path", &self.endpoint_path)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Client for an embeddings gateway speaking
/// `{"input": [...]}` → `{"data": [{"embedding": [...], "index": n}]}`.
pub struct HttpEmbedder {
    client: reqwest::Client,
    cached_embeddings_url: String,
    cached_auth_header: Option<String>,
    model: Option<String>,
    dims: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Option<Vec<EmbeddingDatum>>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Option<Vec<f32>>,
    #[serde(default)]
    index: Option<usize>,
}

fn validate_base_url(raw: &str) -> Result<String, EmbeddingError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(EmbeddingError::InvalidConfig(
            "embedding base URL is empty".into(),
        ));
    }

    let url = reqwest::Url::parse(raw)
        .map_err(|e| EmbeddingError::InvalidConfig(format!("invalid embedding base URL: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(EmbeddingError::InvalidConfig(
            "embedding base URL must use http(s)".into(),
        ));
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(EmbeddingError::InvalidConfig(
            "embedding base URL must not include userinfo".into(),
        ));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(EmbeddingError::InvalidConfig(
            "embedding base URL must not include query or fragment".into(),
        ));
    }

    if url.host_str().is_none() {
        return Err(EmbeddingError::InvalidConfig(
            "embedding base URL missing host".into(),
        ));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn join_endpoint(base: &str, path: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        return base.to_string();
    }
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

/// Puts vectors back in input order. Either every item carries an `index`
/// forming a permutation of `0..n`, or none does and response order is used.
fn order_vectors(
    data: Vec<EmbeddingDatum>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if data.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: data.len(),
        });
    }

    let indexed = data.iter().filter(|d| d.index.is_some()).count();
    if indexed != 0 && indexed != data.len() {
        return Err(EmbeddingError::MalformedResponse(
            "some items carry an index and some do not".into(),
        ));
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for (position, datum) in data.into_iter().enumerate() {
        let embedding = datum.embedding.ok_or_else(|| {
            EmbeddingError::MalformedResponse(format!("item {position} has no 'embedding'"))
        })?;
        if embedding.is_empty() {
            return Err(EmbeddingError::MalformedResponse(format!(
                "item {position} has an empty embedding"
            )));
        }
        let slot = datum.index.unwrap_or(position);
        let Some(entry) = slots.get_mut(slot) else {
            return Err(EmbeddingError::MalformedResponse(format!(
                "index {slot} out of range for {expected} inputs"
            )));
        };
        if entry.is_some() {
            return Err(EmbeddingError::MalformedResponse(format!(
                "duplicate index {slot}"
            )));
        }
        *entry = Some(embedding);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.ok_or_else(|| EmbeddingError::MalformedResponse(format!("missing index {i}")))
        })
        .collect()
}

impl HttpEmbedder {
    pub fn new(config: &HttpEmbedderConfig) -> Result<Self, EmbeddingError> {
        let base = validate_base_url(&config.base_url)?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let cached_auth_header = config
            .api_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| format!("Bearer {t}"));

        Ok(Self {
            client,
            cached_embeddings_url: join_endpoint(&base, &config.endpoint_path),
            cached_auth_header,
            model: config
                .model
                .clone()
                .filter(|m| !m.trim().is_empty()),
            dims: config.dimensions,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.cached_embeddings_url
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            input: texts,
            model: self.model.as_deref(),
        };

        let mut request = self
            .client
            .post(&self.cached_embeddings_url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(auth) = &self.cached_auth_header {
            request = request.header("Authorization", auth);
        }

        let resp = request.send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            let body: String = body.chars().take(ERROR_BODY_MAX_CHARS).collect();
            return Err(EmbeddingError::Status { status, body });
        }

        let bytes = resp.bytes().await?;
        let parsed: EmbeddingResponse = serde_json::from_slice(&bytes)
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;
        let data = parsed
            .data
            .ok_or_else(|| EmbeddingError::MalformedResponse("missing 'data'".into()))?;

        let vectors = order_vectors(data, texts.len())?;
        if self.dims > 0
            && let Some(bad) = vectors.iter().find(|v| v.len() != self.dims)
        {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dims,
                actual: bad.len(),
            });
        }
        Ok(vectors)
    }
}

#[async_trait]
impl TextEmbedder for HttpEmbedder {
    fn name(&self) -> &str {
        "http"
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.request(texts).await
    }
}

// ── Test embedders ───────────────────────────────────────────

/// Hash-seeded embedder producing stable pseudo-random unit-range vectors.
#[cfg(test)]
pub(crate) struct DeterministicEmbedding {
    dims: usize,
    seed: u64,
}

#[cfg(test)]
impl DeterministicEmbedding {
    pub(crate) fn new(dims: usize) -> Self {
        Self { dims, seed: 0 }
    }

    fn fnv1a64(seed: u64, bytes: &[u8]) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325 ^ seed;
        for &b in bytes {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash
    }

    fn splitmix64(mut x: u64) -> u64 {
        x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = x;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    #[allow(clippy::cast_precision_loss)]
    fn u64_to_unit_f32(x: u64) -> f32 {
        const U24_MAX: f32 = ((1u32 << 24) - 1) as f32;
        let top_u24: u32 = (x >> 40) as u32;
        (top_u24 as f32 / U24_MAX) * 2.0 - 1.0
    }

    pub(crate) fn vector_for(&self, text: &str) -> Vec<f32> {
        let base = Self::fnv1a64(self.seed, text.as_bytes());
        (0..self.dims)
            .map(|i| Self::u64_to_unit_f32(Self::splitmix64(base ^ (i as u64))))
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl TextEmbedder for DeterministicEmbedding {
    fn name(&self) -> &str {
        "deterministic_test"
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

/// Embedder that always fails; exercises error propagation.
#[cfg(test)]
pub(crate) struct FailingEmbedding;

#[cfg(test)]
#[async_trait]
impl TextEmbedder for FailingEmbedding {
    fn name(&self) -> &str {
        "failing_test"
    }

    fn dimensions(&self) -> usize {
        4
    }

    async fn embed_texts(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Provider("embedder offline".into()))
    }
}
