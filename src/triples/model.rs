use super::canonical::{canonicalize_owner, canonicalize_term, canonicalize_timestamp};
use crate::error::ValidationError;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Free-form JSON object used for provenance and attributes.
pub type Metadata = Map<String, Value>;

/// Attribute key under which stores attach vector retrieval metadata.
pub const RETRIEVAL_ATTRIBUTE: &str = "_retrieval";

/// Attributes folded into the canonical embedding text, in order.
const CANONICAL_TEXT_ATTRIBUTES: [&str; 3] = ["subject_type", "object_type", "evidence_quote"];
const ORIGINAL_CONTEXT_ATTRIBUTE: &str = "original_context";
const ORIGINAL_CONTEXT_MAX_CHARS: usize = 200;

// ── Scope ────────────────────────────────────────────────────

/// Partition discriminator for assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Scope {
    Run,
    Session,
    #[default]
    Global,
}

impl Scope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Session => "session",
            Self::Global => "global",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scope {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "run" => Ok(Self::Run),
            "session" => Ok(Self::Session),
            "global" => Ok(Self::Global),
            _ => Err(ValidationError::InvalidScope(value.to_string())),
        }
    }
}

impl TryFrom<String> for Scope {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.as_str().to_string()
    }
}

// ── TripleAssertion ──────────────────────────────────────────

/// An immutable fact record.
///
/// Terms are canonicalized once, in [`TripleAssertion::new`]. Fields are only
/// readable; a "changed" fact is a new assertion with a fresh id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AssertionRecord")]
pub struct TripleAssertion {
    assertion_id: String,
    subject: String,
    predicate: String,
    object: String,
    scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner_id: Option<String>,
    observed_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_until: Option<String>,
    confidence: f64,
    provenance: Metadata,
    attributes: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedding: Option<Vec<f32>>,
}

/// Wire shape for deserialization; funnels through the same validation as
/// the builder.
#[derive(Deserialize)]
struct AssertionRecord {
    #[serde(default)]
    assertion_id: Option<String>,
    subject: String,
    predicate: String,
    object: String,
    #[serde(default)]
    scope: Scope,
    #[serde(default)]
    owner_id: Option<String>,
    observed_at: String,
    #[serde(default)]
    valid_from: Option<String>,
    #[serde(default)]
    valid_until: Option<String>,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default)]
    provenance: Metadata,
    #[serde(default)]
    attributes: Metadata,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

const fn default_confidence() -> f64 {
    1.0
}

impl TryFrom<AssertionRecord> for TripleAssertion {
    type Error = ValidationError;

    fn try_from(record: AssertionRecord) -> Result<Self, Self::Error> {
        let mut assertion = Self::new(record.subject, record.predicate, record.object)?
            .with_scope(record.scope)
            .with_owner(record.owner_id.as_deref())
            .with_observed_at(record.observed_at)?
            .with_validity(record.valid_from, record.valid_until)?
            .with_confidence(record.confidence)?
            .with_provenance(record.provenance)
            .with_attributes(record.attributes);
        if let Some(id) = record.assertion_id.filter(|id| !id.trim().is_empty()) {
            assertion.assertion_id = id;
        }
        assertion.embedding = record.embedding;
        Ok(assertion)
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

fn required_term(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let term = canonicalize_term(raw);
    if term.is_empty() {
        return Err(ValidationError::EmptyTerm(field));
    }
    Ok(term)
}

impl TripleAssertion {
    /// Builds a new assertion with a fresh id, `Global` scope, confidence
    /// `1.0` and `observed_at` set to now (RFC-3339, UTC).
    pub fn new(
        subject: impl AsRef<str>,
        predicate: impl AsRef<str>,
        object: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            assertion_id: Uuid::new_v4().to_string(),
            subject: required_term("subject", subject.as_ref())?,
            predicate: required_term("predicate", predicate.as_ref())?,
            object: required_term("object", object.as_ref())?,
            scope: Scope::default(),
            owner_id: None,
            observed_at: now_rfc3339(),
            valid_from: None,
            valid_until: None,
            confidence: default_confidence(),
            provenance: Metadata::new(),
            attributes: Metadata::new(),
            embedding: None,
        })
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Parses and sets the scope; unknown spellings fail fast.
    pub fn with_scope_str(self, scope: &str) -> Result<Self, ValidationError> {
        Ok(self.with_scope(scope.parse()?))
    }

    pub fn with_owner(mut self, owner_id: Option<&str>) -> Self {
        self.owner_id = canonicalize_owner(owner_id);
        self
    }

    pub fn with_observed_at(
        mut self,
        observed_at: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        self.observed_at = canonicalize_timestamp(Some(observed_at.as_ref()))
            .ok_or(ValidationError::EmptyTimestamp("observed_at"))?;
        Ok(self)
    }

    /// Sets the validity window. `valid_until` is exclusive.
    pub fn with_validity(
        mut self,
        valid_from: Option<String>,
        valid_until: Option<String>,
    ) -> Result<Self, ValidationError> {
        let valid_from = canonicalize_timestamp(valid_from.as_deref());
        let valid_until = canonicalize_timestamp(valid_until.as_deref());
        if let (Some(from), Some(until)) = (&valid_from, &valid_until)
            && until < from
        {
            return Err(ValidationError::InvertedValidity {
                from: from.clone(),
                until: until.clone(),
            });
        }
        self.valid_from = valid_from;
        self.valid_until = valid_until;
        Ok(self)
    }

    pub fn with_confidence(mut self, confidence: f64) -> Result<Self, ValidationError> {
        if !confidence.is_finite() {
            return Err(ValidationError::NonFiniteConfidence(confidence));
        }
        self.confidence = confidence;
        Ok(self)
    }

    pub fn with_provenance(mut self, provenance: Metadata) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn with_attributes(mut self, attributes: Metadata) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn assertion_id(&self) -> &str {
        &self.assertion_id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn observed_at(&self) -> &str {
        &self.observed_at
    }

    pub fn valid_from(&self) -> Option<&str> {
        self.valid_from.as_deref()
    }

    pub fn valid_until(&self) -> Option<&str> {
        self.valid_until.as_deref()
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn provenance(&self) -> &Metadata {
        &self.provenance
    }

    pub fn attributes(&self) -> &Metadata {
        &self.attributes
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }

    /// Vector retrieval metadata attached by a semantic query, if any.
    pub fn retrieval(&self) -> Option<&Value> {
        self.attributes.get(RETRIEVAL_ATTRIBUTE)
    }

    /// Retrieval score attached by a semantic query, if any.
    pub fn retrieval_score(&self) -> Option<f64> {
        self.retrieval()
            .and_then(|r| r.get("score"))
            .and_then(Value::as_f64)
    }

    /// Text fed to the embedder: the triple itself plus selected
    /// descriptive attributes.
    pub fn canonical_text(&self) -> String {
        let mut text = format!("{} {} {}", self.subject, self.predicate, self.object);
        for key in CANONICAL_TEXT_ATTRIBUTES {
            if let Some(value) = self.string_attribute(key) {
                text.push('\n');
                text.push_str(key);
                text.push_str(": ");
                text.push_str(value);
            }
        }
        if let Some(context) = self.string_attribute(ORIGINAL_CONTEXT_ATTRIBUTE) {
            let truncated: String = context.chars().take(ORIGINAL_CONTEXT_MAX_CHARS).collect();
            text.push('\n');
            text.push_str(ORIGINAL_CONTEXT_ATTRIBUTE);
            text.push_str(": ");
            text.push_str(&truncated);
        }
        text
    }

    /// Whether the validity window contains `instant` (`valid_until`
    /// exclusive, open bounds unbounded).
    pub fn is_active_at(&self, instant: &str) -> bool {
        let started = self.valid_from.as_deref().is_none_or(|from| from <= instant);
        let not_ended = self
            .valid_until
            .as_deref()
            .is_none_or(|until| until > instant);
        started && not_ended
    }

    fn string_attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub(crate) fn set_embedding(&mut self, embedding: Option<Vec<f32>>) {
        self.embedding = embedding;
    }

    pub(crate) fn attach_retrieval(&mut self, retrieval: Value) {
        self.attributes
            .insert(RETRIEVAL_ATTRIBUTE.to_string(), retrieval);
    }

    /// Rebuilds an assertion from already-canonical stored fields.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_stored(
        assertion_id: String,
        subject: String,
        predicate: String,
        object: String,
        scope: Scope,
        owner_id: Option<String>,
        observed_at: String,
        valid_from: Option<String>,
        valid_until: Option<String>,
        confidence: f64,
        provenance: Metadata,
        attributes: Metadata,
        embedding: Option<Vec<f32>>,
    ) -> Self {
        Self {
            assertion_id,
            subject,
            predicate,
            object,
            scope,
            owner_id,
            observed_at,
            valid_from,
            valid_until,
            confidence,
            provenance,
            attributes,
            embedding,
        }
    }
}

// ── TripleQuery ──────────────────────────────────────────────

/// Direction of the `observed_at` sort applied to structured results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Optional semantic component of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticQuery {
    /// Embedded with the store's embedder; fails without one.
    Text(String),
    /// Used as-is.
    Vector(Vec<f32>),
}

/// Structured read filter plus an optional semantic probe. Unset fields mean "any".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripleQuery {
    pub(crate) subject: Option<String>,
    pub(crate) predicate: Option<String>,
    pub(crate) object: Option<String>,
    pub(crate) scope: Option<Scope>,
    pub(crate) owner_id: Option<String>,
    pub(crate) since: Option<String>,
    pub(crate) until: Option<String>,
    pub(crate) active_at: Option<String>,
    pub(crate) min_confidence: Option<f64>,
    pub(crate) limit: Option<usize>,
    pub(crate) order: TimeOrder,
    pub(crate) semantic: Option<SemanticQuery>,
}

fn optional_term(raw: &str) -> Option<String> {
    Some(canonicalize_term(raw)).filter(|t| !t.is_empty())
}

impl TripleQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: impl AsRef<str>) -> Self {
        self.subject = optional_term(subject.as_ref());
        self
    }

    pub fn predicate(mut self, predicate: impl AsRef<str>) -> Self {
        self.predicate = optional_term(predicate.as_ref());
        self
    }

    pub fn object(mut self, object: impl AsRef<str>) -> Self {
        self.object = optional_term(object.as_ref());
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn scope_str(self, scope: &str) -> Result<Self, ValidationError> {
        Ok(self.scope(scope.parse()?))
    }

    pub fn owner(mut self, owner_id: impl AsRef<str>) -> Self {
        self.owner_id = canonicalize_owner(Some(owner_id.as_ref()));
        self
    }

    /// Inclusive lower bound on `observed_at`.
    pub fn since(mut self, since: impl AsRef<str>) -> Self {
        self.since = canonicalize_timestamp(Some(since.as_ref()));
        self
    }

    /// Inclusive upper bound on `observed_at`.
    pub fn until(mut self, until: impl AsRef<str>) -> Self {
        self.until = canonicalize_timestamp(Some(until.as_ref()));
        self
    }

    /// Keep assertions whose validity window contains `instant`.
    pub fn active_at(mut self, instant: impl AsRef<str>) -> Self {
        self.active_at = canonicalize_timestamp(Some(instant.as_ref()));
        self
    }

    pub fn min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }

    /// Maximum number of results; `limit <= 0` means unbounded.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = usize::try_from(limit).ok().filter(|l| *l > 0);
        self
    }

    pub fn order(mut self, order: TimeOrder) -> Self {
        self.order = order;
        self
    }

    pub fn query_text(mut self, text: impl Into<String>) -> Self {
        self.semantic = Some(SemanticQuery::Text(text.into()));
        self
    }

    pub fn query_vector(mut self, vector: Vec<f32>) -> Self {
        self.semantic = Some(SemanticQuery::Vector(vector));
        self
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    pub fn semantic(&self) -> Option<&SemanticQuery> {
        self.semantic.as_ref()
    }

    /// Structured predicate shared by the in-memory scan and by tests
    /// checking the persistent backend's compiled filter.
    pub fn matches(&self, assertion: &TripleAssertion) -> bool {
        let eq = |want: &Option<String>, have: &str| want.as_deref().is_none_or(|w| w == have);

        eq(&self.subject, &assertion.subject)
            && eq(&self.predicate, &assertion.predicate)
            && eq(&self.object, &assertion.object)
            && self.scope.is_none_or(|s| s == assertion.scope)
            && self
                .owner_id
                .as_deref()
                .is_none_or(|o| assertion.owner_id.as_deref() == Some(o))
            && self
                .since
                .as_deref()
                .is_none_or(|since| assertion.observed_at.as_str() >= since)
            && self
                .until
                .as_deref()
                .is_none_or(|until| assertion.observed_at.as_str() <= until)
            && self
                .active_at
                .as_deref()
                .is_none_or(|t| assertion.is_active_at(t))
            && self
                .min_confidence
                .is_none_or(|min| assertion.confidence >= min)
    }
}
