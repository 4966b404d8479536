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

//! Interfaces to the remote query engine and the result object store.
//!
//! This module provides:
//! - `QueryEngine` trait: query submission, status probe and column metadata
//! - `ObjectStore` trait: opens the byte stream of one result page
//! - `HttpObjectStore`: `ObjectStore` backed by plain HTTP GETs

pub mod http;

use crate::error::Result;
use crate::types::query::{ColumnDescriptor, QueryExecution, QueryHandle, ResultLocation};
use async_trait::async_trait;
use std::pin::Pin;
use tokio::io::AsyncBufRead;

pub use http::{HttpClientConfig, HttpObjectStore};

/// Raw bytes of one result page.
pub type PageStream = Pin<Box<dyn AsyncBufRead + Send>>;

/// Everything needed to start a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequest {
    pub sql: String,
    pub database: Option<String>,
    pub work_group: Option<String>,
    pub output_location: Option<String>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Default::default()
        }
    }
}

/// Abstract interface for the remote engine.
///
/// Implementations perform one network call per method and never retry;
/// retry policy belongs to the caller.
#[async_trait]
pub trait QueryEngine: Send + Sync + std::fmt::Debug {
    /// Start a query. The returned handle starts out `Queued`.
    async fn submit(&self, request: &QueryRequest) -> Result<QueryHandle>;

    /// Observe the current status. Once `Succeeded`, the observation lists
    /// the result pages in read order.
    async fn describe(&self, query_id: &str) -> Result<QueryExecution>;

    /// Column metadata of a succeeded query.
    async fn columns(&self, query_id: &str) -> Result<Vec<ColumnDescriptor>>;

    /// Ask the engine to stop a running query.
    async fn stop(&self, query_id: &str) -> Result<()>;
}

/// Source of result page bytes.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    async fn open_stream(&self, location: &ResultLocation) -> Result<PageStream>;
}
