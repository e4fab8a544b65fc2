//! Persistent backend on an embedded LanceDB table.
//!
//! One table (`triples`) per database directory. The vector column exists
//! only when the store is built with an embedder; an existing table's schema
//! always wins and is checked against the configured embedder on open.
//! No ANN index is built, so vector search is an exact flat scan.

mod batch;
mod filter;

use super::model::{TripleAssertion, TripleQuery};
use super::ordering::{apply_limit, sort_by_observed_at, sort_by_score};
use super::semantic::{embed_assertions, resolve_probe, retrieval_metadata};
use super::traits::TripleStore;
use super::vector::{cosine_similarity, similarity_from_cosine_distance};
use crate::embeddings::TextEmbedder;
use crate::error::{BackendError, EmbeddingError, Result, StoreError, ValidationError};

use arrow_array::{Array, RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::SchemaRef;

use async_trait::async_trait;
use lancedb::Table;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use tokio::sync::{Mutex, OnceCell};

use futures_util::TryStreamExt;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub(crate) const TABLE_NAME: &str = "triples";
pub const DEFAULT_VECTOR_COLUMN: &str = "vector";

const LANCE_DISTANCE_COL: &str = "_distance";
const ID_CHECK_CHUNK: usize = 256;

struct OpenTable {
    table: Table,
    schema: SchemaRef,
    vector_dims: Option<usize>,
}

pub struct LanceDbTripleStore {
    db_dir: PathBuf,
    embedder: Option<Arc<dyn TextEmbedder>>,
    vector_column: String,
    table: OnceCell<OpenTable>,
    // Serializes the duplicate-id check with the append it guards.
    write_lock: Mutex<()>,
}

impl LanceDbTripleStore {
    /// Prepares a store rooted at `path`. The directory is created now; the
    /// connection and table are opened on first use.
    pub fn new(path: impl AsRef<Path>, embedder: Option<Arc<dyn TextEmbedder>>) -> Result<Self> {
        if let Some(embedder) = &embedder
            && embedder.dimensions() == 0
        {
            return Err(EmbeddingError::InvalidConfig(format!(
                "LanceDB triple store requires embedder dimensions > 0 (embedder {})",
                embedder.name()
            ))
            .into());
        }

        let db_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&db_dir).map_err(BackendError::Io)?;

        Ok(Self {
            db_dir,
            embedder,
            vector_column: DEFAULT_VECTOR_COLUMN.to_string(),
            table: OnceCell::new(),
            write_lock: Mutex::new(()),
        })
    }

    /// Names the vector column. Only meaningful before first use.
    #[must_use]
    pub fn with_vector_column(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let name = name.trim();
        if !name.is_empty() {
            self.vector_column = name.to_string();
        }
        self
    }

    pub fn path(&self) -> &Path {
        &self.db_dir
    }

    pub fn vector_column(&self) -> &str {
        &self.vector_column
    }

    /// Releases the table and connection handles.
    pub fn close(self) {
        tracing::debug!(path = %self.db_dir.display(), "lancedb triple store closed");
    }

    async fn open(&self) -> Result<&OpenTable> {
        self.table
            .get_or_try_init(|| async {
                let uri = self.db_dir.to_string_lossy().to_string();
                let conn = lancedb::connect(&uri).execute().await?;

                let table = match conn.open_table(TABLE_NAME).execute().await {
                    Ok(t) => {
                        tracing::debug!(%uri, "opened existing lancedb triples table");
                        t
                    }
                    Err(lancedb::Error::TableNotFound { .. }) => {
                        let vector = self
                            .embedder
                            .as_deref()
                            .map(|e| (self.vector_column.as_str(), e.dimensions()));
                        let schema = batch::triple_schema(vector)?;
                        tracing::info!(
                            %uri,
                            vector = vector.is_some(),
                            "creating lancedb triples table"
                        );
                        conn.create_empty_table(TABLE_NAME, schema).execute().await?
                    }
                    Err(e) => return Err(e.into()),
                };

                let schema = table.schema().await?;
                let vector_dims = batch::vector_dims(&schema, &self.vector_column)?;
                self.check_embedder(vector_dims)?;

                Ok::<_, StoreError>(OpenTable {
                    table,
                    schema,
                    vector_dims,
                })
            })
            .await
    }

    fn check_embedder(&self, vector_dims: Option<usize>) -> Result<()> {
        let Some(embedder) = self.embedder.as_deref() else {
            return Ok(());
        };
        match vector_dims {
            None => Err(BackendError::Schema(format!(
                "table {TABLE_NAME} has no vector column {:?} but an embedder was configured",
                self.vector_column
            ))
            .into()),
            Some(dims) if dims != embedder.dimensions() => Err(BackendError::Schema(format!(
                "vector column {:?} has {dims} dimensions, embedder {} produces {}",
                self.vector_column,
                embedder.name(),
                embedder.dimensions()
            ))
            .into()),
            Some(_) => Ok(()),
        }
    }

    async fn append(&self, mut assertions: Vec<TripleAssertion>) -> Result<()> {
        if assertions.is_empty() {
            return Ok(());
        }

        let mut batch_ids = HashSet::with_capacity(assertions.len());
        for assertion in &assertions {
            if !batch_ids.insert(assertion.assertion_id().to_string()) {
                return Err(
                    ValidationError::DuplicateAssertionId(assertion.assertion_id().into()).into(),
                );
            }
        }

        let open = self.open().await?;
        let _guard = self.write_lock.lock().await;

        let ids: Vec<&str> = batch_ids.iter().map(String::as_str).collect();
        if let Some(existing) = first_existing_id(&open.table, &ids).await? {
            return Err(ValidationError::DuplicateAssertionId(existing).into());
        }

        embed_assertions(self.embedder.as_deref(), &mut assertions).await?;

        let batch = batch::build_batch(open.schema.clone(), &assertions, &self.vector_column)?;
        let reader = RecordBatchIterator::new([Ok(batch)].into_iter(), open.schema.clone());
        open.table.add(Box::new(reader)).execute().await?;

        tracing::debug!(added = assertions.len(), "lancedb triple store append");
        Ok(())
    }

    async fn search(&self, query: TripleQuery) -> Result<Vec<TripleAssertion>> {
        let open = self.open().await?;
        let probe =
            resolve_probe(query.semantic(), self.embedder.as_deref(), open.vector_dims).await?;
        let structured = filter::compile_filter(&query);

        let Some(probe) = probe else {
            let mut rows = self.scan(&open.table, structured).await?;
            sort_by_observed_at(&mut rows, query.order);
            apply_limit(&mut rows, query.limit_value());
            tracing::debug!(returned = rows.len(), "lancedb structured query");
            return Ok(rows);
        };

        // A table without a vector column holds no vectors to rank.
        if open.vector_dims.is_none() {
            return Ok(Vec::new());
        }

        let candidates_filter = filter::and(
            structured.as_deref(),
            &filter::not_null(&self.vector_column),
        );
        let candidates = open
            .table
            .count_rows(Some(candidates_filter.clone()))
            .await?;
        if candidates == 0 {
            return Ok(Vec::new());
        }

        // k covers every filtered row so ranking is exact and the limit is
        // applied after our own deterministic sort.
        let mut stream = open
            .table
            .query()
            .nearest_to(probe.as_slice())?
            .column(&self.vector_column)
            .distance_type(lancedb::DistanceType::Cosine)
            .only_if(candidates_filter)
            .limit(candidates)
            .execute()
            .await?;

        // Lance reports f32 distances; near-ties collapse there, so the rank
        // score is recomputed in f64 from the stored vector.
        let mut scored = Vec::with_capacity(candidates);
        while let Some(found) = stream.try_next().await? {
            for row in batch::parse_rows(&found, &self.vector_column, Some(LANCE_DISTANCE_COL))? {
                let distance = row.distance.ok_or_else(|| {
                    BackendError::Schema(format!("vector search result lacks {LANCE_DISTANCE_COL}"))
                })?;
                let mut assertion = row.assertion;
                let score = assertion
                    .embedding()
                    .and_then(|vector| cosine_similarity(vector, &probe))
                    .unwrap_or_else(|| similarity_from_cosine_distance(distance));
                assertion.attach_retrieval(retrieval_metadata(score, Some(distance)));
                scored.push((assertion, score));
            }
        }

        sort_by_score(&mut scored);
        apply_limit(&mut scored, query.limit_value());
        tracing::debug!(candidates, returned = scored.len(), "lancedb vector query");

        Ok(scored.into_iter().map(|(row, _)| row).collect())
    }

    async fn scan(
        &self,
        table: &Table,
        structured: Option<String>,
    ) -> Result<Vec<TripleAssertion>> {
        let total = table.count_rows(structured.clone()).await?;
        if total == 0 {
            return Ok(Vec::new());
        }

        let mut query = table.query().limit(total);
        if let Some(f) = structured {
            query = query.only_if(f);
        }
        let mut stream = query.execute().await?;

        let mut rows = Vec::with_capacity(total);
        while let Some(found) = stream.try_next().await? {
            rows.extend(
                batch::parse_rows(&found, &self.vector_column, None)?
                    .into_iter()
                    .map(|row| row.assertion),
            );
        }
        Ok(rows)
    }
}

async fn first_existing_id(table: &Table, ids: &[&str]) -> Result<Option<String>> {
    for chunk in ids.chunks(ID_CHECK_CHUNK) {
        let mut stream = table
            .query()
            .only_if(filter::ids_in(chunk.iter().copied()))
            .select(Select::columns(&[batch::COL_ASSERTION_ID]))
            .limit(1)
            .execute()
            .await?;
        while let Some(found) = stream.try_next().await? {
            if let Some(id) = first_string(&found, batch::COL_ASSERTION_ID) {
                return Ok(Some(id));
            }
        }
    }
    Ok(None)
}

fn first_string(found: &RecordBatch, column: &str) -> Option<String> {
    let col = found
        .column_by_name(column)?
        .as_any()
        .downcast_ref::<StringArray>()?;
    (0..col.len())
        .find(|i| !col.is_null(*i))
        .map(|i| col.value(i).to_string())
}

#[async_trait]
impl TripleStore for LanceDbTripleStore {
    fn name(&self) -> &str {
        "lancedb"
    }

    async fn add(&self, assertions: Vec<TripleAssertion>) -> Result<()> {
        self.append(assertions).await
    }

    async fn query(&self, query: TripleQuery) -> Result<Vec<TripleAssertion>> {
        self.search(query).await
    }

    async fn health_check(&self) -> bool {
        match self.open().await {
            Ok(open) => open.table.count_rows(None).await.is_ok(),
            Err(e) => {
                tracing::warn!("lancedb triple store health check failed: {e}");
                false
            }
        }
    }
}
