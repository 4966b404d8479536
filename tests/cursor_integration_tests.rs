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

//! Integration tests for the result cursor.
//!
//! These tests drive `ResultCursor` end to end against scripted engines and
//! in-memory object stores:
//! - Polling: status sequences, already-terminal handles, deadlines
//! - Paging: contiguous rows across pages, header rows never yielded
//! - Failures: failed/cancelled queries, broken pages, parse errors
//! - Cancellation: aborts waits and page reads, poisons the cursor
//! - Wire format: a session over an engine speaking the service's JSON
//!
//! ```text
//! [ScriptedEngine] --describe/columns--> [ResultCursor] <--open_stream-- [PageStore]
//!                                              |
//!                                              v
//!                                     next_row() / has_next()
//! ```

use async_trait::async_trait;
use athena_client::client::{ObjectStore, PageStream, QueryEngine, QueryRequest};
use athena_client::error::{Error, ErrorKind, Result};
use athena_client::polling::PollingStrategy;
use athena_client::reader::{QuoteStyle, ResultCursor, Row};
use athena_client::types::athena::{
    GetQueryExecutionResponse, GetQueryResultsResponse, StartQueryExecutionRequest,
    StartQueryExecutionResponse,
};
use athena_client::{ClientConfig, Session};
use athena_client::types::{
    ColumnDescriptor, ColumnType, Nullability, QueryExecution, QueryHandle, QueryStatus,
    ResultLocation,
};
use futures_util::stream;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::io::StreamReader;

// =============================================================================
// Test Helpers
// =============================================================================

fn columns(names: &[&str]) -> Vec<ColumnDescriptor> {
    names
        .iter()
        .map(|name| ColumnDescriptor::new(*name, ColumnType::Varchar, Nullability::Nullable))
        .collect()
}

/// Render rows the way the engine writes them: every value quoted, nulls
/// left empty.
fn page(rows: &[&[Option<&str>]]) -> String {
    let mut out = String::new();
    for row in rows {
        let fields: Vec<String> = row
            .iter()
            .map(|field| {
                field
                    .map(|v| format!("\"{}\"", v.replace('"', "\"\"")))
                    .unwrap_or_default()
            })
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn row(fields: &[Option<&str>]) -> Row {
    fields.iter().map(|f| f.map(str::to_string)).collect()
}

async fn collect_rows(cursor: &mut ResultCursor) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    while let Some(row) = cursor.next_row().await? {
        rows.push(row);
    }
    Ok(rows)
}

fn fast_polling() -> PollingStrategy {
    PollingStrategy::fixed(Duration::from_millis(5)).with_deadline(Duration::from_secs(5))
}

// =============================================================================
// Mock QueryEngine
// =============================================================================

/// Engine that answers status probes from a script.
///
/// Each probe pops the next status; the last one repeats forever. Once a
/// `Succeeded` status is returned, the observation carries `locations`.
#[derive(Debug)]
struct ScriptedEngine {
    statuses: Mutex<VecDeque<QueryStatus>>,
    locations: Vec<ResultLocation>,
    columns: Vec<ColumnDescriptor>,
    describe_error: Option<Error>,
    probe_count: AtomicUsize,
    columns_count: AtomicUsize,
}

impl ScriptedEngine {
    fn new(statuses: Vec<QueryStatus>, locations: Vec<ResultLocation>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            locations,
            columns: columns(&["id", "name"]),
            describe_error: None,
            probe_count: AtomicUsize::new(0),
            columns_count: AtomicUsize::new(0),
        }
    }

    fn succeeded(locations: Vec<ResultLocation>) -> Self {
        Self::new(vec![QueryStatus::Succeeded], locations)
    }

    fn with_columns(mut self, columns: Vec<ColumnDescriptor>) -> Self {
        self.columns = columns;
        self
    }

    fn failing_with(error: Error) -> Self {
        let mut engine = Self::new(vec![QueryStatus::Running], vec![]);
        engine.describe_error = Some(error);
        engine
    }

    fn probe_count(&self) -> usize {
        self.probe_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl QueryEngine for ScriptedEngine {
    async fn submit(&self, _request: &QueryRequest) -> Result<QueryHandle> {
        Ok(QueryHandle::new("query-1"))
    }

    async fn describe(&self, query_id: &str) -> Result<QueryExecution> {
        self.probe_count.fetch_add(1, Ordering::Relaxed);
        if let Some(e) = &self.describe_error {
            return Err(e.clone());
        }

        let status = {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                statuses.front().cloned().unwrap()
            }
        };

        let execution = QueryExecution::new(query_id, status.clone());
        if status == QueryStatus::Succeeded {
            Ok(execution.with_locations(self.locations.clone()))
        } else {
            Ok(execution)
        }
    }

    async fn columns(&self, _query_id: &str) -> Result<Vec<ColumnDescriptor>> {
        self.columns_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.columns.clone())
    }

    async fn stop(&self, _query_id: &str) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Mock ObjectStore
// =============================================================================

#[derive(Debug, Clone)]
enum PageBody {
    Text(String),
    /// Yields the text, then fails the read.
    BreaksAfter(String),
    /// Opening never completes within a test's lifetime.
    Hangs,
    /// Opening fails.
    Unreachable,
}

#[derive(Debug, Default)]
struct PageStore {
    pages: HashMap<String, PageBody>,
    opened: Mutex<Vec<String>>,
}

impl PageStore {
    fn new() -> Self {
        Self::default()
    }

    fn with_page(mut self, uri: &str, body: PageBody) -> Self {
        self.pages.insert(uri.to_string(), body);
        self
    }

    fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for PageStore {
    async fn open_stream(&self, location: &ResultLocation) -> Result<PageStream> {
        self.opened.lock().unwrap().push(location.uri.clone());
        match self.pages.get(&location.uri) {
            Some(PageBody::Text(text)) => Ok(Box::pin(std::io::Cursor::new(text.clone().into_bytes()))),
            Some(PageBody::BreaksAfter(text)) => {
                let chunks: Vec<std::io::Result<std::io::Cursor<Vec<u8>>>> = vec![
                    Ok(std::io::Cursor::new(text.clone().into_bytes())),
                    Err(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "connection reset by peer",
                    )),
                ];
                Ok(Box::pin(StreamReader::new(stream::iter(chunks))))
            }
            Some(PageBody::Hangs) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(Error::transport("unreachable"))
            }
            Some(PageBody::Unreachable) | None => Err(Error::transport(format!(
                "no such page: {}",
                location.uri
            ))),
        }
    }
}

fn cursor_over(engine: Arc<ScriptedEngine>, store: Arc<PageStore>) -> ResultCursor {
    ResultCursor::new(QueryHandle::new("query-1"), fast_polling(), engine, store)
}

// =============================================================================
// Integration Tests
// =============================================================================

/// Test: rows of two pages come out as one contiguous sequence.
///
/// Both pages start with a header row; neither header is yielded.
#[tokio::test]
async fn test_two_pages_yield_contiguous_rows_without_headers() {
    let header: &[Option<&str>] = &[Some("id"), Some("name")];
    let engine = Arc::new(ScriptedEngine::succeeded(vec![
        ResultLocation::new("mem://page0", 0).with_header(true),
        ResultLocation::new("mem://page1", 1).with_header(true),
    ]));
    let store = Arc::new(
        PageStore::new()
            .with_page(
                "mem://page0",
                PageBody::Text(page(&[header, &[Some("1"), Some("a")], &[Some("2"), None]])),
            )
            .with_page(
                "mem://page1",
                PageBody::Text(page(&[header, &[Some("3"), Some("c,\"d\"")]])),
            ),
    );

    let mut cursor = cursor_over(engine, store.clone());
    let rows = collect_rows(&mut cursor).await.unwrap();

    assert_eq!(
        rows,
        vec![
            row(&[Some("1"), Some("a")]),
            row(&[Some("2"), None]),
            row(&[Some("3"), Some("c,\"d\"")]),
        ]
    );
    assert_eq!(cursor.rows_read(), 3);
    assert_eq!(store.opened(), vec!["mem://page0", "mem://page1"]);
    assert!(!cursor.has_next().await.unwrap());
}

/// Test: pages without a header row are read from their first line.
#[tokio::test]
async fn test_continuation_pages_without_header() {
    let engine = Arc::new(ScriptedEngine::succeeded(vec![
        ResultLocation::new("mem://page0", 0),
        ResultLocation::new("mem://page1", 1),
    ]));
    let store = Arc::new(
        PageStore::new()
            .with_page(
                "mem://page0",
                PageBody::Text(page(&[&[Some("id"), Some("name")], &[Some("1"), Some("a")]])),
            )
            .with_page(
                "mem://page1",
                PageBody::Text(page(&[&[Some("2"), Some("b")]])),
            ),
    );

    let mut cursor = cursor_over(engine, store);
    let rows = collect_rows(&mut cursor).await.unwrap();
    assert_eq!(
        rows,
        vec![row(&[Some("1"), Some("a")]), row(&[Some("2"), Some("b")])]
    );
}

/// Test: pages are read in sequence order, and empty pages are skipped.
#[tokio::test]
async fn test_pages_read_in_sequence_order() {
    let engine = Arc::new(ScriptedEngine::succeeded(vec![
        ResultLocation::new("mem://c", 2),
        ResultLocation::new("mem://a", 0),
        ResultLocation::new("mem://b", 1),
    ]));
    let store = Arc::new(
        PageStore::new()
            .with_page(
                "mem://a",
                PageBody::Text(page(&[&[Some("id"), Some("name")], &[Some("1"), Some("a")]])),
            )
            .with_page("mem://b", PageBody::Text(String::new()))
            .with_page("mem://c", PageBody::Text(page(&[&[Some("3"), Some("c")]]))),
    );

    let mut cursor = cursor_over(engine, store.clone());
    let ids: Vec<Option<String>> = collect_rows(&mut cursor)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r[0].clone())
        .collect();

    assert_eq!(ids, vec![Some("1".to_string()), Some("3".to_string())]);
    assert_eq!(store.opened(), vec!["mem://a", "mem://b", "mem://c"]);
}

/// Test: has_next is idempotent, including across a page boundary.
#[tokio::test]
async fn test_has_next_is_idempotent_across_pages() {
    let engine = Arc::new(ScriptedEngine::succeeded(vec![
        ResultLocation::new("mem://page0", 0),
        ResultLocation::new("mem://page1", 1),
    ]));
    let store = Arc::new(
        PageStore::new()
            .with_page(
                "mem://page0",
                PageBody::Text(page(&[&[Some("id"), Some("name")], &[Some("1"), Some("a")]])),
            )
            .with_page("mem://page1", PageBody::Text(page(&[&[Some("2"), Some("b")]]))),
    );

    let mut cursor = cursor_over(engine, store.clone());
    assert!(cursor.has_next().await.unwrap());
    assert!(cursor.has_next().await.unwrap());
    assert_eq!(store.opened().len(), 1);

    cursor.next_row().await.unwrap();
    assert!(cursor.has_next().await.unwrap());
    assert!(cursor.has_next().await.unwrap());
    assert_eq!(store.opened().len(), 2);
    assert_eq!(cursor.rows_read(), 1);

    cursor.next_row().await.unwrap();
    assert!(!cursor.has_next().await.unwrap());
    assert_eq!(cursor.next_row().await.unwrap(), None);
}

/// Test: the cursor polls until the query succeeds, probing once per
/// observation.
#[tokio::test]
async fn test_polls_until_succeeded() {
    let engine = Arc::new(ScriptedEngine::new(
        vec![
            QueryStatus::Queued,
            QueryStatus::Running,
            QueryStatus::Succeeded,
        ],
        vec![ResultLocation::new("mem://page0", 0)],
    ));
    let store = Arc::new(PageStore::new().with_page(
        "mem://page0",
        PageBody::Text(page(&[&[Some("id"), Some("name")]])),
    ));

    let mut cursor = cursor_over(engine.clone(), store);
    let names: Vec<String> = cursor
        .columns()
        .await
        .unwrap()
        .iter()
        .map(|c| c.name.clone())
        .collect();

    assert_eq!(names, vec!["id", "name"]);
    assert_eq!(engine.probe_count(), 3);
    assert_eq!(cursor.handle().last_status(), &QueryStatus::Succeeded);

    // Columns are fetched once.
    cursor.columns().await.unwrap();
    assert!(!cursor.has_next().await.unwrap());
    assert_eq!(engine.probe_count(), 3);
    assert_eq!(engine.columns_count.load(Ordering::Relaxed), 1);
}

/// Test: a failed query fails columns() and next_row() with the engine's
/// reason, and no page is opened.
#[tokio::test]
async fn test_failed_query_surfaces_reason() {
    let engine = Arc::new(ScriptedEngine::new(
        vec![
            QueryStatus::Running,
            QueryStatus::Failed {
                reason: "SYNTAX_ERROR: line 1:8: Column 'x' cannot be resolved".to_string(),
            },
        ],
        vec![],
    ));
    let store = Arc::new(PageStore::new());

    let mut cursor = cursor_over(engine.clone(), store.clone());
    let err = cursor.columns().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QueryFailed);
    assert!(err.to_string().contains("Column 'x' cannot be resolved"));

    assert_eq!(cursor.next_row().await.unwrap_err(), err);
    assert_eq!(cursor.has_next().await.unwrap_err(), err);
    assert!(store.opened().is_empty());
    assert_eq!(engine.probe_count(), 2);
}

/// Test: a query cancelled on the engine side fails the cursor.
#[tokio::test]
async fn test_cancelled_query_fails_cursor() {
    let engine = Arc::new(ScriptedEngine::new(
        vec![QueryStatus::Cancelled {
            reason: Some("Query cancelled by user".to_string()),
        }],
        vec![],
    ));
    let mut cursor = cursor_over(engine, Arc::new(PageStore::new()));

    let err = cursor.next_row().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QueryCancelled);
    assert!(err.to_string().contains("Query cancelled by user"));
}

/// Test: a handle already known to have failed is not probed again.
#[tokio::test]
async fn test_already_failed_handle_is_not_probed() {
    let engine = Arc::new(ScriptedEngine::succeeded(vec![]));
    let handle = QueryHandle::with_status(
        "query-1",
        QueryStatus::Failed {
            reason: "out of memory".to_string(),
        },
    );
    let mut cursor = ResultCursor::new(
        handle,
        fast_polling(),
        engine.clone(),
        Arc::new(PageStore::new()),
    );

    let err = cursor.columns().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QueryFailed);
    assert_eq!(engine.probe_count(), 0);
}

/// Test: a transport error from the status probe is surfaced, not retried.
#[tokio::test]
async fn test_probe_error_is_not_retried() {
    let engine = Arc::new(ScriptedEngine::failing_with(Error::transport(
        "connection refused",
    )));
    let mut cursor = cursor_over(engine.clone(), Arc::new(PageStore::new()));

    let err = cursor.has_next().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(engine.probe_count(), 1);

    cursor.has_next().await.unwrap_err();
    assert_eq!(engine.probe_count(), 1);
}

/// Test: a query that never finishes fails with PollTimeout at the deadline.
#[tokio::test]
async fn test_poll_deadline() {
    let engine = Arc::new(ScriptedEngine::new(vec![QueryStatus::Running], vec![]));
    let strategy =
        PollingStrategy::fixed(Duration::from_millis(10)).with_deadline(Duration::from_millis(60));
    let mut cursor = ResultCursor::new(
        QueryHandle::new("query-1"),
        strategy,
        engine.clone(),
        Arc::new(PageStore::new()),
    );

    let err = timeout(Duration::from_secs(5), cursor.columns())
        .await
        .expect("poll deadline not enforced")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PollTimeout);
    assert_eq!(cursor.handle().last_status(), &QueryStatus::Running);

    let probes = engine.probe_count();
    assert!(probes >= 2, "expected several probes, got {}", probes);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(engine.probe_count(), probes);
}

/// Test: a page failing mid-read poisons the cursor after the rows already
/// read, and later pages are never opened.
#[tokio::test]
async fn test_broken_page_poisons_cursor() {
    let engine = Arc::new(ScriptedEngine::succeeded(vec![
        ResultLocation::new("mem://page0", 0),
        ResultLocation::new("mem://page1", 1),
    ]));
    let store = Arc::new(
        PageStore::new()
            .with_page(
                "mem://page0",
                PageBody::BreaksAfter(page(&[
                    &[Some("id"), Some("name")],
                    &[Some("1"), Some("a")],
                ])),
            )
            .with_page("mem://page1", PageBody::Text(page(&[&[Some("2"), Some("b")]]))),
    );

    let mut cursor = cursor_over(engine, store.clone());
    assert_eq!(
        cursor.next_row().await.unwrap(),
        Some(row(&[Some("1"), Some("a")]))
    );

    let err = cursor.next_row().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("connection reset"));

    assert_eq!(cursor.next_row().await.unwrap_err(), err);
    assert_eq!(cursor.has_next().await.unwrap_err(), err);
    assert_eq!(store.opened(), vec!["mem://page0"]);
    assert_eq!(cursor.rows_read(), 1);
}

/// Test: a page that cannot be opened fails the cursor.
#[tokio::test]
async fn test_unreachable_page() {
    let engine = Arc::new(ScriptedEngine::succeeded(vec![ResultLocation::new(
        "mem://page0",
        0,
    )]));
    let store = Arc::new(PageStore::new().with_page("mem://page0", PageBody::Unreachable));
    let mut cursor = cursor_over(engine, store);

    let err = cursor.has_next().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

/// Test: a malformed row in the second page fails with the offset inside
/// that page, and the failure is sticky.
#[tokio::test]
async fn test_parse_error_in_second_page() {
    let engine = Arc::new(ScriptedEngine::succeeded(vec![
        ResultLocation::new("mem://page0", 0),
        ResultLocation::new("mem://page1", 1),
    ]));
    let store = Arc::new(
        PageStore::new()
            .with_page(
                "mem://page0",
                PageBody::Text(page(&[&[Some("id"), Some("name")], &[Some("1"), Some("a")]])),
            )
            .with_page(
                "mem://page1",
                PageBody::Text("\"2\",\"b\"\n\"3\",\"c\",\"extra\"\n".to_string()),
            ),
    );

    let mut cursor = cursor_over(engine, store);
    assert!(cursor.next_row().await.unwrap().is_some());
    assert_eq!(
        cursor.next_row().await.unwrap(),
        Some(row(&[Some("2"), Some("b")]))
    );

    let err = cursor.next_row().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert_eq!(err.offset(), Some(15));
    assert_eq!(
        err.as_parse_error().unwrap().message(),
        "Expected newline but found \",\""
    );
    assert_eq!(cursor.next_row().await.unwrap_err(), err);
}

/// Test: optional quoting reads unquoted fields.
#[tokio::test]
async fn test_optional_quote_style() {
    let engine = Arc::new(
        ScriptedEngine::succeeded(vec![ResultLocation::new("mem://page0", 0)])
            .with_columns(columns(&["id", "name"])),
    );
    let store = Arc::new(
        PageStore::new().with_page("mem://page0", PageBody::Text("id,name\n1,a\n2,\n".to_string())),
    );
    let mut cursor = cursor_over(engine, store).with_quote_style(QuoteStyle::Optional);

    let rows = collect_rows(&mut cursor).await.unwrap();
    assert_eq!(
        rows,
        vec![row(&[Some("1"), Some("a")]), row(&[Some("2"), None])]
    );
}

/// Test: a query without columns has no rows and opens no pages.
#[tokio::test]
async fn test_query_without_columns() {
    let engine = Arc::new(
        ScriptedEngine::succeeded(vec![ResultLocation::new("mem://page0", 0)])
            .with_columns(vec![]),
    );
    let store = Arc::new(PageStore::new());
    let mut cursor = cursor_over(engine, store.clone());

    assert!(cursor.columns().await.unwrap().is_empty());
    assert!(!cursor.has_next().await.unwrap());
    assert!(store.opened().is_empty());
}

/// Test: cancelling while a page is being opened aborts promptly and the
/// cursor stays failed.
#[tokio::test]
async fn test_cancel_during_page_open() {
    let engine = Arc::new(ScriptedEngine::succeeded(vec![ResultLocation::new(
        "mem://page0",
        0,
    )]));
    let store = Arc::new(PageStore::new().with_page("mem://page0", PageBody::Hangs));
    let mut cursor = cursor_over(engine, store);

    let token = cursor.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let err = timeout(Duration::from_secs(2), cursor.has_next())
        .await
        .expect("cancellation did not interrupt the page open")
        .unwrap_err();
    assert_eq!(err, Error::Cancelled);
    assert_eq!(cursor.next_row().await.unwrap_err(), Error::Cancelled);
}

/// Test: cancelling while waiting for the query interrupts the backoff.
#[tokio::test]
async fn test_cancel_during_polling() {
    let engine = Arc::new(ScriptedEngine::new(vec![QueryStatus::Running], vec![]));
    let strategy = PollingStrategy::fixed(Duration::from_secs(30));
    let mut cursor = ResultCursor::new(
        QueryHandle::new("query-1"),
        strategy,
        engine.clone(),
        Arc::new(PageStore::new()),
    );

    let token = cursor.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let err = timeout(Duration::from_secs(2), cursor.columns())
        .await
        .expect("cancellation did not interrupt the backoff")
        .unwrap_err();
    assert_eq!(err, Error::Cancelled);
    assert_eq!(engine.probe_count(), 1);
    assert_eq!(cursor.handle().last_status(), &QueryStatus::Running);
}

/// Test: cancel() before first use fails without touching the engine.
#[tokio::test]
async fn test_cancel_before_use() {
    let engine = Arc::new(ScriptedEngine::succeeded(vec![]));
    let mut cursor = cursor_over(engine.clone(), Arc::new(PageStore::new()));
    cursor.cancel();

    assert_eq!(cursor.has_next().await.unwrap_err(), Error::Cancelled);
    assert_eq!(engine.probe_count(), 0);
}

// =============================================================================
// JSON-speaking engine
// =============================================================================

/// Engine that answers with canned service response bodies and decodes
/// them through the wire models.
#[derive(Debug)]
struct JsonReplayEngine {
    execution_bodies: Mutex<VecDeque<String>>,
    results_body: String,
    requests: Mutex<Vec<serde_json::Value>>,
}

impl JsonReplayEngine {
    fn new(execution_bodies: Vec<String>, results_body: &str) -> Self {
        Self {
            execution_bodies: Mutex::new(execution_bodies.into()),
            results_body: results_body.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<serde_json::Value> {
        self.requests.lock().unwrap().clone()
    }
}

fn wire_error(e: serde_json::Error) -> Error {
    Error::transport(format!("bad response body: {}", e))
}

fn execution_body(state: &str) -> String {
    format!(
        r#"{{
            "QueryExecution": {{
                "QueryExecutionId": "wire-1",
                "ResultConfiguration": {{"OutputLocation": "s3://results/wire-1.csv"}},
                "Status": {{"State": "{}"}}
            }}
        }}"#,
        state
    )
}

#[async_trait]
impl QueryEngine for JsonReplayEngine {
    async fn submit(&self, request: &QueryRequest) -> Result<QueryHandle> {
        let body = serde_json::to_value(StartQueryExecutionRequest::from(request))
            .map_err(wire_error)?;
        self.requests.lock().unwrap().push(body);
        let response: StartQueryExecutionResponse =
            serde_json::from_str(r#"{"QueryExecutionId": "wire-1"}"#).map_err(wire_error)?;
        Ok(QueryHandle::new(response.query_execution_id))
    }

    async fn describe(&self, _query_id: &str) -> Result<QueryExecution> {
        let body = {
            let mut bodies = self.execution_bodies.lock().unwrap();
            if bodies.len() > 1 {
                bodies.pop_front()
            } else {
                bodies.front().cloned()
            }
        }
        .ok_or_else(|| Error::transport("no scripted response"))?;
        let response: GetQueryExecutionResponse =
            serde_json::from_str(&body).map_err(wire_error)?;
        response.query_execution.to_execution()
    }

    async fn columns(&self, _query_id: &str) -> Result<Vec<ColumnDescriptor>> {
        let response: GetQueryResultsResponse =
            serde_json::from_str(&self.results_body).map_err(wire_error)?;
        Ok(response.result_set.result_set_metadata.to_descriptors())
    }

    async fn stop(&self, _query_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Test: a session over a JSON-speaking engine submits the configured
/// context, polls through QUEUED and RUNNING, and reads the single result
/// object without its header row.
#[tokio::test]
async fn test_session_over_service_responses() {
    let engine = Arc::new(JsonReplayEngine::new(
        vec![
            execution_body("QUEUED"),
            execution_body("RUNNING"),
            execution_body("SUCCEEDED"),
        ],
        r#"{
            "ResultSet": {
                "ResultSetMetadata": {
                    "ColumnInfo": [
                        {"Name": "id", "Type": "bigint", "Nullable": "NOT_NULL"},
                        {"Name": "amount", "Type": "decimal", "Precision": 40, "Scale": 2}
                    ]
                }
            }
        }"#,
    ));
    let store = Arc::new(PageStore::new().with_page(
        "s3://results/wire-1.csv",
        PageBody::Text(page(&[
            &[Some("id"), Some("amount")],
            &[Some("1"), Some("9.50")],
            &[Some("2"), None],
        ])),
    ));

    let mut config = ClientConfig::new().with_database("sales");
    config.output_location = Some("s3://results/".to_string());
    config.polling.interval = Duration::from_millis(5);
    config.log.level = Some("off".to_string());
    let session = Session::new(config, engine.clone(), store.clone());

    let mut cursor = timeout(Duration::from_secs(5), session.execute("SELECT id, amount FROM t"))
        .await
        .expect("submit hung")
        .unwrap();
    assert_eq!(cursor.query_id(), "wire-1");

    let described = cursor.columns().await.unwrap().to_vec();
    assert_eq!(described[0].column_type, ColumnType::BigInt);
    assert_eq!(described[0].nullability, Nullability::NotNull);
    assert_eq!(
        described[1].column_type,
        ColumnType::Decimal {
            precision: 38,
            scale: 2
        }
    );
    assert_eq!(cursor.handle().last_status(), &QueryStatus::Succeeded);

    let rows = collect_rows(&mut cursor).await.unwrap();
    assert_eq!(
        rows,
        vec![row(&[Some("1"), Some("9.50")]), row(&[Some("2"), None])]
    );
    assert_eq!(store.opened(), vec!["s3://results/wire-1.csv"]);

    let requests = engine.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["QueryString"], "SELECT id, amount FROM t");
    assert_eq!(requests[0]["QueryExecutionContext"]["Database"], "sales");
    assert_eq!(
        requests[0]["ResultConfiguration"]["OutputLocation"],
        "s3://results/"
    );
}
