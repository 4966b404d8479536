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

//! Athena query client for Rust
//!
//! This crate runs SQL on Amazon Athena and streams the results back as a
//! forward-only row cursor with bounded memory use.
//!
//! ## Overview
//!
//! - [`Session`] - Submits queries with the configured database and work group
//! - [`ResultCursor`] - Waits for a query to finish and yields its rows
//! - [`PollingStrategy`] - Fixed or capped exponential backoff with a deadline
//! - [`DelimitedRowParser`] - Streaming parser for Athena's CSV result files
//!
//! The engine and the object store are traits ([`QueryEngine`],
//! [`ObjectStore`]); [`HttpObjectStore`] reads result pages over HTTP.
//!
//! ## Example
//!
//! ```ignore
//! use athena_client::{ClientConfig, Session};
//!
//! let mut config = ClientConfig::new();
//! config.set_option("athena.database", "sales")?;
//! config.set_option("athena.output_location", "s3://my-bucket/results/")?;
//!
//! let session = Session::with_http_store(config, engine)?;
//! let mut cursor = session.execute("SELECT id, name FROM customers").await?;
//! while let Some(row) = cursor.next_row().await? {
//!     println!("{:?}", row);
//! }
//! ```
//!
//! ## Configuration Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `athena.database` | | Default database |
//! | `athena.work_group` | | Work group |
//! | `athena.output_location` | | Result location (`s3://...`) |
//! | `athena.api_call_timeout_ms` | 600000 | Deadline for a query to finish |
//! | `athena.polling.strategy` | fixed | `fixed` or `exponential` |
//! | `athena.polling.interval_ms` | 1000 | Interval, or first backoff delay |
//! | `athena.polling.max_interval_ms` | 10000 | Backoff cap |
//! | `athena.csv.quote_style` | required | `required` or `optional` |
//! | `athena.log_level` | | `off`, `error`, `warn`, `info`, `debug`, `trace` |
//! | `athena.log_file` | | Log file path (stderr when unset) |
//! | `athena.http.connect_timeout_ms` | 30000 | HTTP connect timeout |
//! | `athena.http.read_timeout_ms` | 60000 | HTTP read timeout |

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod polling;
pub mod reader;
pub mod session;
pub mod types;

// Re-export main types
pub use config::{ClientConfig, ParserConfig, PollingConfig, PollingKind};
pub use error::{Error, ErrorKind, ParseError, Result};
pub use polling::{BackoffPolicy, PollingStrategy};
pub use reader::{
    CellValue, DelimitedRowParser, QuoteStyle, ResultCursor, ResultReaderAdapter, Row,
    RowBatchReader,
};
pub use session::Session;

// Re-export client types for custom engines and stores
pub use client::{HttpClientConfig, HttpObjectStore, ObjectStore, PageStream, QueryEngine, QueryRequest};

pub use types::{
    ColumnDescriptor, ColumnType, Nullability, QueryExecution, QueryHandle, QueryStatus,
    ResultLocation,
};
