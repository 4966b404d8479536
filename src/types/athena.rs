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

//! Athena API request/response types.
//!
//! These map the JSON bodies of `StartQueryExecution`, `GetQueryExecution`
//! and the metadata part of `GetQueryResults`. A [`QueryEngine`] backed by
//! the service builds its request with `StartQueryExecutionRequest::from`,
//! deserializes the responses into these types and converts them with
//! `to_execution` and `to_descriptors`. The crate itself ships no such
//! engine.
//!
//! [`QueryEngine`]: crate::client::QueryEngine

use crate::client::QueryRequest;
use crate::error::{Error, Result};
use crate::types::query::{
    ColumnDescriptor, ColumnType, Nullability, QueryExecution, QueryStatus, ResultLocation,
};
use serde::{Deserialize, Serialize};

/// Body of a `StartQueryExecution` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartQueryExecutionRequest {
    pub query_string: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_execution_context: Option<QueryExecutionContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_configuration: Option<ResultConfiguration>,
}

impl From<&QueryRequest> for StartQueryExecutionRequest {
    fn from(request: &QueryRequest) -> Self {
        Self {
            query_string: request.sql.clone(),
            query_execution_context: request.database.as_ref().map(|database| {
                QueryExecutionContext {
                    database: Some(database.clone()),
                }
            }),
            work_group: request.work_group.clone(),
            result_configuration: request.output_location.as_ref().map(|location| {
                ResultConfiguration {
                    output_location: Some(location.clone()),
                }
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryExecutionContext {
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultConfiguration {
    #[serde(default)]
    pub output_location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartQueryExecutionResponse {
    pub query_execution_id: String,
}

/// Body of a `GetQueryExecution` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetQueryExecutionResponse {
    pub query_execution: QueryExecutionInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryExecutionInfo {
    pub query_execution_id: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub result_configuration: Option<ResultConfiguration>,
    pub status: QueryExecutionStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryExecutionStatus {
    pub state: QueryExecutionState,
    #[serde(default)]
    pub state_change_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryExecutionState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl QueryExecutionStatus {
    pub fn to_status(&self) -> QueryStatus {
        match self.state {
            QueryExecutionState::Queued => QueryStatus::Queued,
            QueryExecutionState::Running => QueryStatus::Running,
            QueryExecutionState::Succeeded => QueryStatus::Succeeded,
            QueryExecutionState::Failed => QueryStatus::Failed {
                reason: self
                    .state_change_reason
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            },
            QueryExecutionState::Cancelled => QueryStatus::Cancelled {
                reason: self.state_change_reason.clone(),
            },
        }
    }
}

impl QueryExecutionInfo {
    /// Convert into a status observation.
    ///
    /// Athena writes one result object per query, so a succeeded query
    /// yields a single page with a header row.
    pub fn to_execution(&self) -> Result<QueryExecution> {
        let status = self.status.to_status();
        let mut execution = QueryExecution::new(&self.query_execution_id, status.clone());
        if status == QueryStatus::Succeeded {
            let output = self
                .result_configuration
                .as_ref()
                .and_then(|c| c.output_location.clone())
                .ok_or_else(|| {
                    Error::transport(format!(
                        "Query {} succeeded without an output location",
                        self.query_execution_id
                    ))
                })?;
            execution.locations = vec![ResultLocation::new(output, 0)];
        }
        Ok(execution)
    }
}

/// Metadata part of a `GetQueryResults` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetQueryResultsResponse {
    pub result_set: ResultSet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultSet {
    pub result_set_metadata: ResultSetMetadata,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultSetMetadata {
    #[serde(default)]
    pub column_info: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "Type")]
    pub type_name: String,
    #[serde(default)]
    pub nullable: Option<String>,
    #[serde(default)]
    pub precision: Option<i32>,
    #[serde(default)]
    pub scale: Option<i32>,
}

impl ColumnInfo {
    pub fn to_descriptor(&self) -> ColumnDescriptor {
        let column_type = match ColumnType::from_type_name(&self.type_name) {
            // Precision and scale arrive as separate fields, not in the type name.
            ColumnType::Decimal { .. } if self.precision.is_some() => ColumnType::decimal(
                self.precision.unwrap_or(38).clamp(1, 38) as u8,
                self.scale.unwrap_or(0).clamp(0, 38) as i8,
            ),
            other => other,
        };
        let nullability = match self.nullable.as_deref() {
            Some("NOT_NULL") => Nullability::NotNull,
            Some("NULLABLE") => Nullability::Nullable,
            _ => Nullability::Unknown,
        };
        ColumnDescriptor::new(&self.name, column_type, nullability)
    }
}

impl ResultSetMetadata {
    pub fn to_descriptors(&self) -> Vec<ColumnDescriptor> {
        self.column_info
            .iter()
            .map(ColumnInfo::to_descriptor)
            .collect()
    }
}
