// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Arrow record batches over a [`ResultCursor`].
//!
//! `RowBatchReader` pulls up to `batch_size` rows, decodes every cell with
//! [`decode_cell`] and builds one `RecordBatch` at a time.
//! `ResultReaderAdapter` exposes it as a blocking
//! `arrow_array::RecordBatchReader`.

use crate::error::{Error, Result};
use crate::reader::cursor::ResultCursor;
use crate::reader::decode::{decode_cell, CellValue};
use crate::types::query::{arrow_schema, ColumnDescriptor, ColumnType};
use arrow_array::builder::{
    BinaryBuilder, BooleanBuilder, Date32Builder, Decimal128Builder, Float32Builder,
    Float64Builder, Int16Builder, Int32Builder, Int64Builder, Int8Builder, StringBuilder,
    TimestampMillisecondBuilder,
};
use arrow_array::{ArrayRef, RecordBatch};
use arrow_schema::{ArrowError, SchemaRef};
use chrono::{DateTime, NaiveDate};
use std::sync::Arc;

/// Default number of rows per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

enum ColumnBuilder {
    Boolean(BooleanBuilder),
    Int8(Int8Builder),
    Int16(Int16Builder),
    Int32(Int32Builder),
    Int64(Int64Builder),
    Float32(Float32Builder),
    Float64(Float64Builder),
    Decimal(Decimal128Builder),
    Utf8(StringBuilder),
    Binary(BinaryBuilder),
    Date32(Date32Builder),
    Timestamp(TimestampMillisecondBuilder),
}

impl ColumnBuilder {
    fn new(column_type: &ColumnType, capacity: usize) -> Result<Self> {
        let builder = match column_type {
            ColumnType::Boolean => Self::Boolean(BooleanBuilder::with_capacity(capacity)),
            ColumnType::TinyInt => Self::Int8(Int8Builder::with_capacity(capacity)),
            ColumnType::SmallInt => Self::Int16(Int16Builder::with_capacity(capacity)),
            ColumnType::Integer => Self::Int32(Int32Builder::with_capacity(capacity)),
            ColumnType::BigInt => Self::Int64(Int64Builder::with_capacity(capacity)),
            ColumnType::Float => Self::Float32(Float32Builder::with_capacity(capacity)),
            ColumnType::Double => Self::Float64(Float64Builder::with_capacity(capacity)),
            ColumnType::Decimal { precision, scale } => Self::Decimal(
                Decimal128Builder::with_capacity(capacity)
                    .with_precision_and_scale(*precision, *scale)
                    .map_err(|e| Error::invalid_state(format!("Invalid decimal type: {}", e)))?,
            ),
            ColumnType::Varbinary => Self::Binary(BinaryBuilder::with_capacity(capacity, 0)),
            ColumnType::Date => Self::Date32(Date32Builder::with_capacity(capacity)),
            ColumnType::Timestamp => {
                Self::Timestamp(TimestampMillisecondBuilder::with_capacity(capacity))
            }
            ColumnType::Char
            | ColumnType::Varchar
            | ColumnType::Time
            | ColumnType::Json
            | ColumnType::Other(_) => Self::Utf8(StringBuilder::with_capacity(capacity, 0)),
        };
        Ok(builder)
    }

    fn append_null(&mut self) {
        match self {
            Self::Boolean(b) => b.append_null(),
            Self::Int8(b) => b.append_null(),
            Self::Int16(b) => b.append_null(),
            Self::Int32(b) => b.append_null(),
            Self::Int64(b) => b.append_null(),
            Self::Float32(b) => b.append_null(),
            Self::Float64(b) => b.append_null(),
            Self::Decimal(b) => b.append_null(),
            Self::Utf8(b) => b.append_null(),
            Self::Binary(b) => b.append_null(),
            Self::Date32(b) => b.append_null(),
            Self::Timestamp(b) => b.append_null(),
        }
    }

    fn append(&mut self, column: &ColumnDescriptor, cell: CellValue) -> Result<()> {
        match (self, cell) {
            (builder, CellValue::Null) => builder.append_null(),
            (Self::Boolean(b), CellValue::Boolean(v)) => b.append_value(v),
            (Self::Int8(b), CellValue::Int8(v)) => b.append_value(v),
            (Self::Int16(b), CellValue::Int16(v)) => b.append_value(v),
            (Self::Int32(b), CellValue::Int32(v)) => b.append_value(v),
            (Self::Int64(b), CellValue::Int64(v)) => b.append_value(v),
            (Self::Float32(b), CellValue::Float32(v)) => b.append_value(v),
            (Self::Float64(b), CellValue::Float64(v)) => b.append_value(v),
            (Self::Decimal(b), CellValue::Decimal(v)) => b.append_value(v),
            (Self::Utf8(b), CellValue::String(v)) => b.append_value(v),
            (Self::Binary(b), CellValue::Binary(v)) => b.append_value(v),
            (Self::Date32(b), CellValue::Date(v)) => b.append_value(days_since_epoch(v)),
            (Self::Timestamp(b), CellValue::Timestamp(v)) => {
                b.append_value(v.and_utc().timestamp_millis())
            }
            (_, other) => {
                return Err(Error::decode(
                    &column.name,
                    format!("unexpected {:?} for {:?} column", other, column.column_type),
                ))
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> ArrayRef {
        match self {
            Self::Boolean(b) => Arc::new(b.finish()),
            Self::Int8(b) => Arc::new(b.finish()),
            Self::Int16(b) => Arc::new(b.finish()),
            Self::Int32(b) => Arc::new(b.finish()),
            Self::Int64(b) => Arc::new(b.finish()),
            Self::Float32(b) => Arc::new(b.finish()),
            Self::Float64(b) => Arc::new(b.finish()),
            Self::Decimal(b) => Arc::new(b.finish()),
            Self::Utf8(b) => Arc::new(b.finish()),
            Self::Binary(b) => Arc::new(b.finish()),
            Self::Date32(b) => Arc::new(b.finish()),
            Self::Timestamp(b) => Arc::new(b.finish()),
        }
    }
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = DateTime::UNIX_EPOCH.date_naive();
    date.signed_duration_since(epoch).num_days() as i32
}

/// Decodes cursor rows into Arrow record batches.
///
/// Holds at most one batch in memory. A failure is returned again on every
/// later call.
#[derive(Debug)]
pub struct RowBatchReader {
    cursor: ResultCursor,
    batch_size: usize,
    columns: Option<Vec<ColumnDescriptor>>,
    schema: Option<SchemaRef>,
    failed: Option<Error>,
}

impl RowBatchReader {
    pub fn new(cursor: ResultCursor) -> Self {
        Self::with_batch_size(cursor, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(cursor: ResultCursor, batch_size: usize) -> Self {
        Self {
            cursor,
            batch_size: batch_size.max(1),
            columns: None,
            schema: None,
            failed: None,
        }
    }

    pub fn cursor(&self) -> &ResultCursor {
        &self.cursor
    }

    /// Schema of the result. Waits for the query on first use.
    pub async fn schema(&mut self) -> Result<SchemaRef> {
        if let Some(schema) = &self.schema {
            return Ok(schema.clone());
        }
        let columns = self.cursor.columns().await?.to_vec();
        let schema = Arc::new(arrow_schema(&columns));
        self.columns = Some(columns);
        self.schema = Some(schema.clone());
        Ok(schema)
    }

    /// The next batch, or `None` when the cursor is exhausted.
    pub async fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        if let Some(e) = &self.failed {
            return Err(e.clone());
        }
        match self.build_batch().await {
            Ok(batch) => Ok(batch),
            Err(e) => {
                self.failed = Some(e.clone());
                Err(e)
            }
        }
    }

    async fn build_batch(&mut self) -> Result<Option<RecordBatch>> {
        let schema = self.schema().await?;
        let columns = self.columns.as_deref().unwrap_or_default();
        let mut builders = columns
            .iter()
            .map(|column| ColumnBuilder::new(&column.column_type, self.batch_size))
            .collect::<Result<Vec<_>>>()?;

        let mut rows = 0;
        while rows < self.batch_size {
            let Some(row) = self.cursor.next_row().await? else {
                break;
            };
            for ((builder, column), cell) in builders.iter_mut().zip(columns).zip(row) {
                builder.append(column, decode_cell(column, cell.as_deref())?)?;
            }
            rows += 1;
        }

        if rows == 0 {
            return Ok(None);
        }

        let arrays = builders.iter_mut().map(ColumnBuilder::finish).collect();
        let batch = RecordBatch::try_new(schema, arrays)
            .map_err(|e| Error::invalid_state(format!("Failed to build record batch: {}", e)))?;
        Ok(Some(batch))
    }
}

/// Blocking `RecordBatchReader` over a [`RowBatchReader`].
///
/// Must be driven from outside the runtime whose handle it holds.
pub struct ResultReaderAdapter {
    inner: RowBatchReader,
    schema: SchemaRef,
    runtime_handle: tokio::runtime::Handle,
}

impl ResultReaderAdapter {
    /// Create a new adapter. Blocks until the result schema is known.
    pub fn new(mut inner: RowBatchReader, runtime_handle: tokio::runtime::Handle) -> Result<Self> {
        let schema = runtime_handle.block_on(inner.schema())?;
        Ok(Self {
            inner,
            schema,
            runtime_handle,
        })
    }
}

impl arrow_array::RecordBatchReader for ResultReaderAdapter {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
}

impl Iterator for ResultReaderAdapter {
    type Item = std::result::Result<RecordBatch, ArrowError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.runtime_handle.block_on(self.inner.next_batch()) {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => None,
            Err(e) => Some(Err(ArrowError::ExternalError(Box::new(e)))),
        }
    }
}
