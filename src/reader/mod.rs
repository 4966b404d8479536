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

//! Result readers for query results stored as delimited text.
//!
//! This module provides:
//! - `csv`: streaming character decoding and row parsing
//! - `ResultCursor`: polls a query to completion and yields its rows
//! - `decode_cell`: typed decoding of text cells
//! - `RowBatchReader` / `ResultReaderAdapter`: Arrow record batches

pub mod batch;
pub mod csv;
pub mod cursor;
pub mod decode;

pub use batch::{ResultReaderAdapter, RowBatchReader, DEFAULT_BATCH_SIZE};
pub use csv::{DelimitedRowParser, QuoteStyle, Row};
pub use cursor::ResultCursor;
pub use decode::{decode_cell, CellValue};
