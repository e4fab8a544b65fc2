use crate::error::{BackendError, Result, ValidationError};
use crate::triples::model::{Metadata, Scope, TripleAssertion};

use arrow_array::builder::{FixedSizeListBuilder, Float32Builder};
use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, Float64Array, RecordBatch, StringArray,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};

use std::sync::Arc;

pub(super) const COL_ASSERTION_ID: &str = "assertion_id";
pub(super) const COL_SUBJECT: &str = "subject";
pub(super) const COL_PREDICATE: &str = "predicate";
pub(super) const COL_OBJECT: &str = "object";
pub(super) const COL_SCOPE: &str = "scope";
pub(super) const COL_OWNER_ID: &str = "owner_id";
pub(super) const COL_OBSERVED_AT: &str = "observed_at";
pub(super) const COL_VALID_FROM: &str = "valid_from";
pub(super) const COL_VALID_UNTIL: &str = "valid_until";
pub(super) const COL_CONFIDENCE: &str = "confidence";
pub(super) const COL_PROVENANCE: &str = "provenance";
pub(super) const COL_ATTRIBUTES: &str = "attributes";
pub(super) const COL_TEXT: &str = "text";

/// Table schema; the vector column exists only for stores built with an
/// embedder.
pub(super) fn triple_schema(vector: Option<(&str, usize)>) -> Result<SchemaRef> {
    let mut fields = vec![
        Field::new(COL_ASSERTION_ID, DataType::Utf8, false),
        Field::new(COL_SUBJECT, DataType::Utf8, false),
        Field::new(COL_PREDICATE, DataType::Utf8, false),
        Field::new(COL_OBJECT, DataType::Utf8, false),
        Field::new(COL_SCOPE, DataType::Utf8, false),
        Field::new(COL_OWNER_ID, DataType::Utf8, true),
        Field::new(COL_OBSERVED_AT, DataType::Utf8, false),
        Field::new(COL_VALID_FROM, DataType::Utf8, true),
        Field::new(COL_VALID_UNTIL, DataType::Utf8, true),
        Field::new(COL_CONFIDENCE, DataType::Float64, false),
        Field::new(COL_PROVENANCE, DataType::Utf8, false),
        Field::new(COL_ATTRIBUTES, DataType::Utf8, false),
        Field::new(COL_TEXT, DataType::Utf8, false),
    ];

    if let Some((name, dims)) = vector {
        let dims_i32 = i32::try_from(dims)
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| BackendError::Schema(format!("invalid vector dimension: {dims}")))?;
        let item = Field::new("item", DataType::Float32, true);
        fields.push(Field::new(
            name,
            DataType::FixedSizeList(Arc::new(item), dims_i32),
            true,
        ));
    }

    Ok(Arc::new(Schema::new(fields)))
}

/// Dimension of `column` if the schema has it as a fixed-size float list.
pub(super) fn vector_dims(schema: &Schema, column: &str) -> Result<Option<usize>> {
    let Ok(field) = schema.field_with_name(column) else {
        return Ok(None);
    };
    match field.data_type() {
        DataType::FixedSizeList(_, n) => usize::try_from(*n)
            .map(Some)
            .map_err(|_| BackendError::Schema(format!("invalid vector dimension: {n}")).into()),
        other => Err(BackendError::Schema(format!(
            "column {column} has type {other:?}, expected a fixed-size float list"
        ))
        .into()),
    }
}

/// Encodes assertions into one batch laid out like `schema`.
pub(super) fn build_batch(
    schema: SchemaRef,
    rows: &[TripleAssertion],
    vector_column: &str,
) -> Result<RecordBatch> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

    for field in schema.fields() {
        let column: ArrayRef = match field.name().as_str() {
            COL_ASSERTION_ID => strings(rows, TripleAssertion::assertion_id),
            COL_SUBJECT => strings(rows, TripleAssertion::subject),
            COL_PREDICATE => strings(rows, TripleAssertion::predicate),
            COL_OBJECT => strings(rows, TripleAssertion::object),
            COL_SCOPE => strings(rows, |a| a.scope().as_str()),
            COL_OWNER_ID => optional_strings(rows, TripleAssertion::owner_id),
            COL_OBSERVED_AT => strings(rows, TripleAssertion::observed_at),
            COL_VALID_FROM => optional_strings(rows, TripleAssertion::valid_from),
            COL_VALID_UNTIL => optional_strings(rows, TripleAssertion::valid_until),
            COL_CONFIDENCE => Arc::new(Float64Array::from(
                rows.iter().map(TripleAssertion::confidence).collect::<Vec<_>>(),
            )),
            COL_PROVENANCE => json_strings(rows, TripleAssertion::provenance)?,
            COL_ATTRIBUTES => json_strings(rows, TripleAssertion::attributes)?,
            COL_TEXT => Arc::new(StringArray::from(
                rows.iter()
                    .map(TripleAssertion::canonical_text)
                    .collect::<Vec<_>>(),
            )),
            name if name == vector_column => vectors(field.data_type(), rows)?,
            other => {
                let msg = format!("unexpected column in table: {other}");
                return Err(BackendError::Schema(msg).into());
            }
        };
        columns.push(column);
    }

    Ok(RecordBatch::try_new(schema, columns)?)
}

fn strings(rows: &[TripleAssertion], get: impl Fn(&TripleAssertion) -> &str) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(get).collect::<Vec<_>>()))
}

fn optional_strings(
    rows: &[TripleAssertion],
    get: impl Fn(&TripleAssertion) -> Option<&str>,
) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(get).collect::<Vec<_>>()))
}

fn json_strings(
    rows: &[TripleAssertion],
    get: impl Fn(&TripleAssertion) -> &Metadata,
) -> Result<ArrayRef> {
    let encoded = rows
        .iter()
        .map(|row| serde_json::to_string(get(row)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Arc::new(StringArray::from(encoded)))
}

fn vectors(data_type: &DataType, rows: &[TripleAssertion]) -> Result<ArrayRef> {
    let DataType::FixedSizeList(_, dims) = data_type else {
        return Err(BackendError::Schema(format!("unexpected vector type: {data_type:?}")).into());
    };
    let dims_usize = usize::try_from(*dims)
        .map_err(|_| BackendError::Schema(format!("invalid vector dimension: {dims}")))?;

    let mut builder = FixedSizeListBuilder::new(Float32Builder::new(), *dims);
    for row in rows {
        if let Some(v) = row.embedding() {
            if v.len() != dims_usize {
                return Err(ValidationError::VectorDimensionMismatch {
                    expected: dims_usize,
                    actual: v.len(),
                }
                .into());
            }
            builder.values().append_slice(v);
            builder.append(true);
        } else {
            for _ in 0..dims_usize {
                builder.values().append_value(0.0);
            }
            builder.append(false);
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| BackendError::Schema(format!("missing or non-text column {name}")).into())
}

fn optional_value(col: &StringArray, i: usize) -> Option<String> {
    (!col.is_null(i)).then(|| col.value(i).to_string())
}

fn decode_metadata(raw: &str) -> Result<Metadata> {
    if raw.is_empty() {
        return Ok(Metadata::new());
    }
    Ok(serde_json::from_str(raw)?)
}

/// A decoded row plus the engine's distance column when present.
pub(super) struct DecodedRow {
    pub assertion: TripleAssertion,
    pub distance: Option<f64>,
}

/// Decodes a result batch. Missing required columns and undecodable JSON
/// are errors; rows with null required values are skipped with a warning.
pub(super) fn parse_rows(
    batch: &RecordBatch,
    vector_column: &str,
    distance_column: Option<&str>,
) -> Result<Vec<DecodedRow>> {
    let assertion_id = string_column(batch, COL_ASSERTION_ID)?;
    let subject = string_column(batch, COL_SUBJECT)?;
    let predicate = string_column(batch, COL_PREDICATE)?;
    let object = string_column(batch, COL_OBJECT)?;
    let scope = string_column(batch, COL_SCOPE)?;
    let owner_id = string_column(batch, COL_OWNER_ID)?;
    let observed_at = string_column(batch, COL_OBSERVED_AT)?;
    let valid_from = string_column(batch, COL_VALID_FROM)?;
    let valid_until = string_column(batch, COL_VALID_UNTIL)?;
    let provenance = string_column(batch, COL_PROVENANCE)?;
    let attributes = string_column(batch, COL_ATTRIBUTES)?;
    let confidence = batch
        .column_by_name(COL_CONFIDENCE)
        .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
        .ok_or_else(|| BackendError::Schema(format!("missing column {COL_CONFIDENCE}")))?;

    let vectors = batch
        .column_by_name(vector_column)
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>());

    let distance_col = distance_column.and_then(|name| batch.column_by_name(name));
    let distances_f32 = distance_col.and_then(|c| c.as_any().downcast_ref::<Float32Array>());
    let distances_f64 = distance_col.and_then(|c| c.as_any().downcast_ref::<Float64Array>());

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        if assertion_id.is_null(i)
            || subject.is_null(i)
            || predicate.is_null(i)
            || object.is_null(i)
            || scope.is_null(i)
            || observed_at.is_null(i)
            || confidence.is_null(i)
        {
            tracing::warn!(row = i, "lancedb triple row with null required column skipped");
            continue;
        }

        let parsed_scope: Scope = scope.value(i).parse().map_err(|e| {
            BackendError::Schema(format!("row {} has invalid scope: {e}", assertion_id.value(i)))
        })?;

        let embedding = vectors.and_then(|col| {
            if col.is_null(i) {
                return None;
            }
            let values = col.value(i);
            values
                .as_any()
                .downcast_ref::<Float32Array>()
                .map(|a| a.values().to_vec())
        });

        let distance = if let Some(a) = distances_f32 {
            Some(f64::from(a.value(i)))
        } else {
            distances_f64.map(|a| a.value(i))
        };

        let assertion = TripleAssertion::from_stored(
            assertion_id.value(i).to_string(),
            subject.value(i).to_string(),
            predicate.value(i).to_string(),
            object.value(i).to_string(),
            parsed_scope,
            optional_value(owner_id, i),
            observed_at.value(i).to_string(),
            optional_value(valid_from, i),
            optional_value(valid_until, i),
            confidence.value(i),
            decode_metadata(optional_value(provenance, i).as_deref().unwrap_or_default())?,
            decode_metadata(optional_value(attributes, i).as_deref().unwrap_or_default())?,
            embedding,
        );
        out.push(DecodedRow {
            assertion,
            distance,
        });
    }
    Ok(out)
}
