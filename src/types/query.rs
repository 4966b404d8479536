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

//! Query lifecycle and result-set description types.

use crate::error::Error;
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::collections::HashMap;
use std::fmt;

/// Remote status of a submitted query.
///
/// State transitions:
/// ```text
///   Queued -> Running -> Succeeded
///                     -> Failed
///                     -> Cancelled
///   Queued -> Failed | Cancelled
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    Queued,
    Running,
    Succeeded,
    Failed { reason: String },
    Cancelled { reason: Option<String> },
}

impl QueryStatus {
    /// Whether the engine will never move this query to another state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueryStatus::Succeeded | QueryStatus::Failed { .. } | QueryStatus::Cancelled { .. }
        )
    }

    /// Convert a non-success terminal status into the matching error.
    ///
    /// Returns `None` for `Succeeded` and for non-terminal states.
    pub fn to_error(&self, query_id: &str) -> Option<Error> {
        match self {
            QueryStatus::Failed { reason } => Some(Error::QueryFailed {
                query_id: query_id.to_string(),
                reason: reason.clone(),
            }),
            QueryStatus::Cancelled { reason } => Some(Error::QueryCancelled {
                query_id: query_id.to_string(),
                reason: reason.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryStatus::Queued => write!(f, "QUEUED"),
            QueryStatus::Running => write!(f, "RUNNING"),
            QueryStatus::Succeeded => write!(f, "SUCCEEDED"),
            QueryStatus::Failed { .. } => write!(f, "FAILED"),
            QueryStatus::Cancelled { .. } => write!(f, "CANCELLED"),
        }
    }
}

/// Client-side reference to a query owned by the engine.
///
/// Holds the query id and the last status observed by a poll. The cached
/// status only moves forward: once terminal it is never replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryHandle {
    query_id: String,
    last_status: QueryStatus,
}

impl QueryHandle {
    pub fn new(query_id: impl Into<String>) -> Self {
        Self::with_status(query_id, QueryStatus::Queued)
    }

    pub fn with_status(query_id: impl Into<String>, status: QueryStatus) -> Self {
        Self {
            query_id: query_id.into(),
            last_status: status,
        }
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    pub fn last_status(&self) -> &QueryStatus {
        &self.last_status
    }

    /// Record a freshly observed status. Ignored once the cache is terminal.
    pub(crate) fn refresh(&mut self, status: &QueryStatus) {
        if !self.last_status.is_terminal() {
            self.last_status = status.clone();
        }
    }
}

/// One observation of a query, as returned by the status probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExecution {
    pub query_id: String,
    pub status: QueryStatus,
    /// Result pages, in read order. Only populated once `Succeeded`.
    pub locations: Vec<ResultLocation>,
}

impl QueryExecution {
    pub fn new(query_id: impl Into<String>, status: QueryStatus) -> Self {
        Self {
            query_id: query_id.into(),
            status,
            locations: Vec::new(),
        }
    }

    pub fn with_locations(mut self, locations: Vec<ResultLocation>) -> Self {
        self.locations = locations;
        self
    }
}

/// Addressable result page in object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLocation {
    /// `s3://bucket/key` or a (presigned) `https://` URL.
    pub uri: String,
    /// Position of this page in the result set.
    pub sequence: usize,
    /// Whether the page starts with a row of column names.
    pub has_header: bool,
    /// Extra headers to send when fetching the page.
    pub http_headers: HashMap<String, String>,
}

impl ResultLocation {
    pub fn new(uri: impl Into<String>, sequence: usize) -> Self {
        Self {
            uri: uri.into(),
            sequence,
            has_header: sequence == 0,
            http_headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }
}

/// Declared type of a result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Double,
    Decimal { precision: u8, scale: i8 },
    Char,
    Varchar,
    Varbinary,
    Date,
    Timestamp,
    Time,
    Json,
    /// Arrays, maps, rows and anything else rendered as text by the engine.
    Other(String),
}

impl ColumnType {
    /// Parse an engine type name such as `varchar`, `decimal(10,2)` or
    /// `array<integer>`.
    pub fn from_type_name(type_name: &str) -> Self {
        let lower = type_name.trim().to_lowercase();
        let base = lower.split(['(', '<']).next().unwrap_or("").trim();
        match base {
            "boolean" => ColumnType::Boolean,
            "tinyint" => ColumnType::TinyInt,
            "smallint" => ColumnType::SmallInt,
            "integer" | "int" => ColumnType::Integer,
            "bigint" => ColumnType::BigInt,
            "float" | "real" => ColumnType::Float,
            "double" => ColumnType::Double,
            "decimal" => Self::parse_decimal(&lower),
            "char" => ColumnType::Char,
            "varchar" | "string" => ColumnType::Varchar,
            "varbinary" => ColumnType::Varbinary,
            "date" => ColumnType::Date,
            "timestamp" => ColumnType::Timestamp,
            "time" => ColumnType::Time,
            "json" => ColumnType::Json,
            _ => ColumnType::Other(lower),
        }
    }

    fn parse_decimal(lower: &str) -> Self {
        let args = lower
            .split_once('(')
            .and_then(|(_, rest)| rest.strip_suffix(')'))
            .map(|args| {
                args.split(',')
                    .map(|part| part.trim().to_string())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let precision = args
            .first()
            .and_then(|p| p.parse::<u32>().ok())
            .unwrap_or(38)
            .clamp(1, 38) as u8;
        let scale = args
            .get(1)
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0)
            .min(38) as i8;
        Self::decimal(precision, scale)
    }

    /// Builder for the decimal variant, for callers that receive precision
    /// and scale as separate metadata fields.
    ///
    /// Precision is kept within 1..=38 (the Arrow `Decimal128` range) and
    /// scale within 0..=precision.
    pub fn decimal(precision: u8, scale: i8) -> Self {
        let precision = precision.clamp(1, 38);
        let scale = scale.clamp(0, precision as i8);
        ColumnType::Decimal { precision, scale }
    }

    /// Arrow type used when materializing this column into record batches.
    pub fn arrow_type(&self) -> DataType {
        match self {
            ColumnType::Boolean => DataType::Boolean,
            ColumnType::TinyInt => DataType::Int8,
            ColumnType::SmallInt => DataType::Int16,
            ColumnType::Integer => DataType::Int32,
            ColumnType::BigInt => DataType::Int64,
            ColumnType::Float => DataType::Float32,
            ColumnType::Double => DataType::Float64,
            ColumnType::Decimal { precision, scale } => DataType::Decimal128(*precision, *scale),
            ColumnType::Varbinary => DataType::Binary,
            ColumnType::Date => DataType::Date32,
            ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Millisecond, None),
            ColumnType::Char
            | ColumnType::Varchar
            | ColumnType::Time
            | ColumnType::Json
            | ColumnType::Other(_) => DataType::Utf8,
        }
    }
}

/// Nullability reported by the engine for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Nullability {
    NotNull,
    Nullable,
    #[default]
    Unknown,
}

/// Name, type and nullability of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub column_type: ColumnType,
    pub nullability: Nullability,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, column_type: ColumnType, nullability: Nullability) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullability,
        }
    }

    pub fn arrow_field(&self) -> Field {
        Field::new(
            &self.name,
            self.column_type.arrow_type(),
            self.nullability != Nullability::NotNull,
        )
    }
}

/// Arrow schema for a list of columns.
pub fn arrow_schema(columns: &[ColumnDescriptor]) -> Schema {
    Schema::new(
        columns
            .iter()
            .map(ColumnDescriptor::arrow_field)
            .collect::<Vec<_>>(),
    )
}
