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

//! Error types for the Athena client.
//!
//! Every failure is surfaced as [`Error`]. Errors are `Clone` so that a
//! poisoned [`ResultCursor`](crate::reader::ResultCursor) can hand out the
//! same failure on every call after the first one.

use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A malformed delimited-text input, located by character offset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (at offset {offset})")]
pub struct ParseError {
    message: String,
    offset: u64,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: u64) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }

    /// Human readable expected/found description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Absolute character offset into the stream where parsing failed.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Coarse classification of an [`Error`], for callers that map failures
/// onto another error vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    QueryFailed,
    QueryCancelled,
    PollTimeout,
    Cancelled,
    Parse,
    Decode,
    Config,
    InvalidState,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The engine or the object store could not be reached, or answered
    /// with something unusable.
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("query {query_id} failed: {reason}")]
    QueryFailed { query_id: String, reason: String },

    #[error("query {query_id} was cancelled{}", reason_suffix(.reason))]
    QueryCancelled {
        query_id: String,
        reason: Option<String>,
    },

    #[error("timed out after {attempts} status checks ({elapsed:?})")]
    PollTimeout { attempts: u32, elapsed: Duration },

    #[error("operation cancelled")]
    Cancelled,

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("cannot decode column {column}: {message}")]
    Decode { column: String, message: String },

    #[error("config: {message}")]
    Config { message: String },

    #[error("invalid state: {message}")]
    InvalidState { message: String },
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {}", r))
        .unwrap_or_default()
}

impl Error {
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Error::InvalidState {
            message: message.into(),
        }
    }

    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport { .. } => ErrorKind::Transport,
            Error::QueryFailed { .. } => ErrorKind::QueryFailed,
            Error::QueryCancelled { .. } => ErrorKind::QueryCancelled,
            Error::PollTimeout { .. } => ErrorKind::PollTimeout,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Parse(_) => ErrorKind::Parse,
            Error::Decode { .. } => ErrorKind::Decode,
            Error::Config { .. } => ErrorKind::Config,
            Error::InvalidState { .. } => ErrorKind::InvalidState,
        }
    }

    /// Character offset for parse failures, `None` for everything else.
    pub fn offset(&self) -> Option<u64> {
        match self {
            Error::Parse(e) => Some(e.offset()),
            _ => None,
        }
    }

    /// The underlying parse failure, if this is one.
    pub fn as_parse_error(&self) -> Option<&ParseError> {
        match self {
            Error::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::transport(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::transport(e.to_string())
    }
}
