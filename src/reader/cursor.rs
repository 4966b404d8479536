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

//! Forward-only row cursor over the results of one query.
//!
//! The cursor waits for the query to finish, then reads its result pages in
//! sequence through a [`DelimitedRowParser`]. Page boundaries are invisible
//! to the caller and header rows are consumed internally.
//!
//! ```text
//! Pending --poll--> Open --last page drained--> Exhausted
//!    |               |
//!    +---------------+--any error or cancellation--> Failed
//! ```
//!
//! `Failed` is permanent: every later call returns the same error.

use crate::client::{ObjectStore, PageStream, QueryEngine};
use crate::error::{Error, Result};
use crate::polling::PollingStrategy;
use crate::reader::csv::{DelimitedRowParser, QuoteStyle, Row};
use crate::types::query::{ColumnDescriptor, QueryHandle, QueryStatus, ResultLocation};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug)]
enum CursorState {
    Pending,
    Open,
    Exhausted,
    Failed(Error),
}

/// Rows of one query, pulled one at a time.
///
/// Holds at most one parsed row ahead of the consumer. A cursor is driven
/// by a single caller; it is `Send` but not meant to be shared.
#[derive(Debug)]
pub struct ResultCursor {
    handle: QueryHandle,
    strategy: PollingStrategy,
    engine: Arc<dyn QueryEngine>,
    store: Arc<dyn ObjectStore>,
    quote_style: QuoteStyle,
    cancel: CancellationToken,
    state: CursorState,
    columns: Vec<ColumnDescriptor>,
    pages: VecDeque<ResultLocation>,
    parser: Option<DelimitedRowParser<PageStream>>,
    current_page: Option<usize>,
    page_rows: u64,
    rows_read: u64,
}

/// Run `fut` unless `cancel` fires first.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

impl ResultCursor {
    pub fn new(
        handle: QueryHandle,
        strategy: PollingStrategy,
        engine: Arc<dyn QueryEngine>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            handle,
            strategy,
            engine,
            store,
            quote_style: QuoteStyle::default(),
            cancel: CancellationToken::new(),
            state: CursorState::Pending,
            columns: Vec::new(),
            pages: VecDeque::new(),
            parser: None,
            current_page: None,
            page_rows: 0,
            rows_read: 0,
        }
    }

    pub fn with_quote_style(mut self, quote_style: QuoteStyle) -> Self {
        self.quote_style = quote_style;
        self
    }

    /// Use an externally owned token, e.g. a child of a session-wide one.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn query_id(&self) -> &str {
        self.handle.query_id()
    }

    /// Query handle with the last status observed by this cursor.
    pub fn handle(&self) -> &QueryHandle {
        &self.handle
    }

    /// Data rows returned so far, over all pages.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Token that aborts polling and page reads when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Abort any in-flight wait or read. The cursor fails with
    /// [`Error::Cancelled`] from then on. The remote query is not stopped.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Column metadata. Waits for the query to succeed on first use.
    pub async fn columns(&mut self) -> Result<&[ColumnDescriptor]> {
        self.ensure_ready().await?;
        Ok(&self.columns)
    }

    /// Whether another row is available, opening further pages as needed.
    pub async fn has_next(&mut self) -> Result<bool> {
        self.ensure_ready().await?;
        match self.advance().await {
            Ok(available) => Ok(available),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// The next row, or `None` after the last row of the last page.
    pub async fn next_row(&mut self) -> Result<Option<Row>> {
        if !self.has_next().await? {
            return Ok(None);
        }
        let cancel = self.cancel.clone();
        let next = match self.parser.as_mut() {
            Some(parser) => cancellable(&cancel, parser.next_row()).await,
            None => Err(Error::invalid_state("no open result page")),
        };
        match next {
            Ok(Some(row)) => {
                self.page_rows += 1;
                self.rows_read += 1;
                Ok(Some(row))
            }
            Ok(None) => Err(self.fail(Error::invalid_state(
                "result page ended after reporting another row",
            ))),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&mut self, error: Error) -> Error {
        if let CursorState::Failed(existing) = &self.state {
            return existing.clone();
        }
        warn!("Result cursor for query {} failed: {}", self.query_id(), error);
        self.parser = None;
        self.pages.clear();
        self.state = CursorState::Failed(error.clone());
        error
    }

    async fn ensure_ready(&mut self) -> Result<()> {
        if let CursorState::Failed(e) = &self.state {
            return Err(e.clone());
        }
        if self.cancel.is_cancelled() {
            return Err(self.fail(Error::Cancelled));
        }
        if !matches!(self.state, CursorState::Pending) {
            return Ok(());
        }
        match self.wait_for_results().await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn wait_for_results(&mut self) -> Result<()> {
        let query_id = self.handle.query_id().to_string();

        // A handle already known to have failed needs no further probing.
        if let Some(e) = self.handle.last_status().to_error(&query_id) {
            return Err(e);
        }

        debug!("Waiting for query {} to finish", query_id);
        let engine = Arc::clone(&self.engine);
        let probe_id = query_id.clone();
        let observed: Arc<Mutex<Option<QueryStatus>>> = Arc::new(Mutex::new(None));
        let recorder = Arc::clone(&observed);
        let outcome = self
            .strategy
            .wait(
                move || {
                    let engine = Arc::clone(&engine);
                    let query_id = probe_id.clone();
                    let recorder = Arc::clone(&recorder);
                    async move {
                        let execution = engine.describe(&query_id).await?;
                        *recorder.lock().unwrap_or_else(PoisonError::into_inner) =
                            Some(execution.status.clone());
                        Ok::<_, Error>(execution)
                    }
                },
                &self.cancel,
            )
            .await;

        // Keep the last status seen, even when polling gave up.
        let last_seen = observed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(status) = last_seen {
            self.handle.refresh(&status);
        }
        let execution = outcome?;
        if let Some(e) = execution.status.to_error(&query_id) {
            return Err(e);
        }
        if execution.status != QueryStatus::Succeeded {
            return Err(Error::invalid_state(format!(
                "query {} stopped polling in state {}",
                query_id, execution.status
            )));
        }

        let columns = cancellable(&self.cancel, self.engine.columns(&query_id)).await?;
        let mut pages = execution.locations;
        pages.sort_by_key(|page| page.sequence);

        info!(
            "Query {} succeeded with {} columns in {} result pages",
            query_id,
            columns.len(),
            pages.len()
        );

        self.state = if columns.is_empty() {
            CursorState::Exhausted
        } else {
            CursorState::Open
        };
        self.columns = columns;
        self.pages = pages.into();
        Ok(())
    }

    async fn advance(&mut self) -> Result<bool> {
        let cancel = self.cancel.clone();
        loop {
            match &self.state {
                CursorState::Failed(e) => return Err(e.clone()),
                CursorState::Exhausted => return Ok(false),
                CursorState::Pending | CursorState::Open => {}
            }

            if let Some(parser) = self.parser.as_mut() {
                if cancellable(&cancel, parser.has_next()).await? {
                    return Ok(true);
                }
                debug!(
                    "Finished result page {:?} of query {}: {} rows",
                    self.current_page,
                    self.query_id(),
                    self.page_rows
                );
                self.parser = None;
            }

            match self.pages.pop_front() {
                Some(page) => self.open_page(page).await?,
                None => {
                    debug!(
                        "Read {} rows for query {}",
                        self.rows_read,
                        self.query_id()
                    );
                    self.state = CursorState::Exhausted;
                    return Ok(false);
                }
            }
        }
    }

    async fn open_page(&mut self, page: ResultLocation) -> Result<()> {
        debug!(
            "Opening result page {} of query {}: {}",
            page.sequence,
            self.query_id(),
            page.uri
        );
        let stream = cancellable(&self.cancel, self.store.open_stream(&page)).await?;
        let mut parser =
            DelimitedRowParser::with_quote_style(stream, self.columns.len(), self.quote_style);

        if page.has_header {
            if let Some(header) = cancellable(&self.cancel, parser.next_row()).await? {
                self.check_header(&header);
            }
        }

        self.parser = Some(parser);
        self.current_page = Some(page.sequence);
        self.page_rows = 0;
        Ok(())
    }

    fn check_header(&self, header: &Row) {
        let matches = header.len() == self.columns.len()
            && header
                .iter()
                .zip(&self.columns)
                .all(|(name, column)| name.as_deref() == Some(column.name.as_str()));
        if !matches {
            warn!(
                "Header row of query {} does not match its columns: {:?}",
                self.query_id(),
                header
            );
        }
    }
}
