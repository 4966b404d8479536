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

//! Session tying configuration, engine and object store together.

use crate::client::{HttpObjectStore, ObjectStore, QueryEngine, QueryRequest};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::logging::init_logging;
use crate::reader::cursor::ResultCursor;
use crate::types::query::QueryHandle;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs queries and hands out one [`ResultCursor`] per query.
///
/// Cursors get a child of the session's cancellation token, so
/// [`close`](Self::close) aborts every cursor still in flight.
#[derive(Debug)]
pub struct Session {
    config: ClientConfig,
    engine: Arc<dyn QueryEngine>,
    store: Arc<dyn ObjectStore>,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(
        config: ClientConfig,
        engine: Arc<dyn QueryEngine>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        init_logging(&config.log);
        debug!(
            "Session created: database={:?}, work_group={:?}",
            config.database, config.work_group
        );
        Self {
            config,
            engine,
            store,
            cancel: CancellationToken::new(),
        }
    }

    /// Session reading result pages through an [`HttpObjectStore`] built from
    /// `config.http`.
    pub fn with_http_store(config: ClientConfig, engine: Arc<dyn QueryEngine>) -> Result<Self> {
        let store = Arc::new(HttpObjectStore::new(config.http.clone())?);
        Ok(Self::new(config, engine, store))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Submit `sql` and return a cursor over its results.
    ///
    /// Returns as soon as the engine accepted the query; the cursor waits for
    /// completion on first use.
    pub async fn execute(&self, sql: &str) -> Result<ResultCursor> {
        let request = QueryRequest {
            sql: sql.to_string(),
            database: self.config.database.clone(),
            work_group: self.config.work_group.clone(),
            output_location: self.config.output_location.clone(),
        };
        let handle = self.engine.submit(&request).await?;
        info!("Submitted query {}", handle.query_id());
        Ok(self.cursor(handle))
    }

    /// Cursor over an already submitted query.
    pub fn cursor(&self, handle: QueryHandle) -> ResultCursor {
        ResultCursor::new(
            handle,
            self.config.new_polling_strategy(),
            Arc::clone(&self.engine),
            Arc::clone(&self.store),
        )
        .with_quote_style(self.config.parser.quote_style)
        .with_cancellation(self.cancel.child_token())
    }

    /// Ask the engine to stop a query. Best effort: a failure is logged and
    /// returned, and the query may still finish on its own.
    pub async fn cancel(&self, handle: &QueryHandle) -> Result<()> {
        debug!("Stopping query {}", handle.query_id());
        self.engine.stop(handle.query_id()).await.map_err(|e| {
            warn!("Failed to stop query {}: {}", handle.query_id(), e);
            e
        })
    }

    /// Abort every cursor created by this session.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PageStream;
    use crate::error::{Error, ErrorKind};
    use crate::types::query::{
        ColumnDescriptor, ColumnType, Nullability, QueryExecution, QueryStatus, ResultLocation,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct RecordingEngine {
        submitted: Mutex<Vec<QueryRequest>>,
        stopped: Mutex<Vec<String>>,
        running_forever: bool,
    }

    #[async_trait]
    impl QueryEngine for RecordingEngine {
        async fn submit(&self, request: &QueryRequest) -> Result<QueryHandle> {
            self.submitted.lock().unwrap().push(request.clone());
            Ok(QueryHandle::new("q-42"))
        }

        async fn describe(&self, query_id: &str) -> Result<QueryExecution> {
            if self.running_forever {
                return Ok(QueryExecution::new(query_id, QueryStatus::Running));
            }
            Ok(QueryExecution::new(query_id, QueryStatus::Succeeded)
                .with_locations(vec![ResultLocation::new("mem://0", 0)]))
        }

        async fn columns(&self, _query_id: &str) -> Result<Vec<ColumnDescriptor>> {
            Ok(vec![ColumnDescriptor::new(
                "x",
                ColumnType::Varchar,
                Nullability::Nullable,
            )])
        }

        async fn stop(&self, query_id: &str) -> Result<()> {
            self.stopped.lock().unwrap().push(query_id.to_string());
            Ok(())
        }
    }

    #[derive(Debug)]
    struct OneRowStore;

    #[async_trait]
    impl ObjectStore for OneRowStore {
        async fn open_stream(&self, _location: &ResultLocation) -> Result<PageStream> {
            Ok(Box::pin("\"x\"\n\"hello\"\n".as_bytes()))
        }
    }

    fn fast_config() -> ClientConfig {
        let mut config = ClientConfig::new()
            .with_database("sales")
            .with_timeout(Duration::from_secs(5));
        config.work_group = Some("primary".to_string());
        config.polling.interval = Duration::from_millis(5);
        config.log.level = Some("off".to_string());
        config
    }

    #[tokio::test]
    async fn test_execute_passes_configuration_and_reads_rows() {
        let engine = Arc::new(RecordingEngine::default());
        let session = Session::new(fast_config(), engine.clone(), Arc::new(OneRowStore));

        let mut cursor = session.execute("SELECT x FROM t").await.unwrap();
        assert_eq!(cursor.query_id(), "q-42");
        assert_eq!(
            cursor.next_row().await.unwrap(),
            Some(vec![Some("hello".to_string())])
        );
        assert_eq!(cursor.next_row().await.unwrap(), None);

        let submitted = engine.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].sql, "SELECT x FROM t");
        assert_eq!(submitted[0].database.as_deref(), Some("sales"));
        assert_eq!(submitted[0].work_group.as_deref(), Some("primary"));
    }

    #[tokio::test]
    async fn test_cancel_stops_remote_query() {
        let engine = Arc::new(RecordingEngine::default());
        let session = Session::new(fast_config(), engine.clone(), Arc::new(OneRowStore));
        session.cancel(&QueryHandle::new("q-7")).await.unwrap();
        assert_eq!(*engine.stopped.lock().unwrap(), vec!["q-7".to_string()]);
    }

    #[tokio::test]
    async fn test_close_aborts_waiting_cursors() {
        let engine = Arc::new(RecordingEngine {
            running_forever: true,
            ..Default::default()
        });
        let session = Arc::new(Session::new(
            fast_config(),
            engine,
            Arc::new(OneRowStore),
        ));
        let mut cursor = session.execute("SELECT 1").await.unwrap();

        let closer = Arc::clone(&session);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            closer.close();
        });

        let err = tokio::time::timeout(Duration::from_secs(2), cursor.has_next())
            .await
            .expect("cursor did not observe cancellation")
            .unwrap_err();
        assert_eq!(err, Error::Cancelled);
        assert_eq!(cursor.has_next().await.unwrap_err().kind(), ErrorKind::Cancelled);
    }
}
