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

//! Client configuration and string-keyed option handling.

use crate::client::HttpClientConfig;
use crate::error::{Error, Result};
use crate::logging::LogConfig;
use crate::polling::{BackoffPolicy, PollingStrategy};
use crate::reader::csv::QuoteStyle;
use std::time::Duration;

/// Polling policy used for each new query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollingKind {
    Fixed,
    Exponential,
}

/// Polling settings. Each query gets its own strategy built from these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    pub kind: PollingKind,
    /// Fixed interval, or the first delay for exponential backoff.
    pub interval: Duration,
    /// Upper bound for exponential backoff.
    pub max_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            kind: PollingKind::Fixed,
            interval: Duration::from_millis(1000),
            max_interval: Duration::from_secs(10),
        }
    }
}

impl PollingConfig {
    /// Build a fresh strategy without a deadline.
    pub fn new_strategy(&self) -> PollingStrategy {
        let policy = match self.kind {
            PollingKind::Fixed => BackoffPolicy::Fixed {
                interval: self.interval,
            },
            PollingKind::Exponential => BackoffPolicy::Exponential {
                base: self.interval,
                max: self.max_interval.max(self.interval),
            },
        };
        PollingStrategy::new(policy, None)
    }
}

/// Settings for decoding result pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserConfig {
    pub quote_style: QuoteStyle,
}

/// Everything a [`Session`](crate::session::Session) needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub database: Option<String>,
    pub work_group: Option<String>,
    pub output_location: Option<String>,
    /// Upper bound for waiting on one query to finish.
    pub api_call_timeout: Duration,
    pub polling: PollingConfig,
    pub parser: ParserConfig,
    pub log: LogConfig,
    pub http: HttpClientConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            database: None,
            work_group: None,
            output_location: None,
            api_call_timeout: Duration::from_secs(10 * 60),
            polling: PollingConfig::default(),
            parser: ParserConfig::default(),
            log: LogConfig::default(),
            http: HttpClientConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of this configuration using another database.
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            ..self.clone()
        }
    }

    /// Copy of this configuration with another API call timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            api_call_timeout: timeout,
            ..self.clone()
        }
    }

    /// Polling strategy for one query, bounded by the API call timeout.
    pub fn new_polling_strategy(&self) -> PollingStrategy {
        self.polling
            .new_strategy()
            .with_deadline(self.api_call_timeout)
    }

    fn parse_millis(key: &str, value: &str) -> Result<Duration> {
        value
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| Self::invalid_value(key, value))
    }

    fn invalid_value(key: &str, value: &str) -> Error {
        Error::config(format!("invalid value '{}' for option '{}'", value, key))
    }

    fn unset(key: &str) -> Error {
        Error::config(format!("option '{}' is not set", key))
    }

    pub fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "athena.database" => self.database = Some(value.to_string()),
            "athena.work_group" => self.work_group = Some(value.to_string()),
            "athena.output_location" => self.output_location = Some(value.to_string()),
            "athena.api_call_timeout_ms" => {
                self.api_call_timeout = Self::parse_millis(key, value)?;
            }
            "athena.polling.strategy" => {
                self.polling.kind = match value.to_ascii_lowercase().as_str() {
                    "fixed" => PollingKind::Fixed,
                    "exponential" => PollingKind::Exponential,
                    _ => return Err(Self::invalid_value(key, value)),
                };
            }
            "athena.polling.interval_ms" => {
                let interval = Self::parse_millis(key, value)?;
                if interval.is_zero() {
                    return Err(Self::invalid_value(key, value));
                }
                self.polling.interval = interval;
            }
            "athena.polling.max_interval_ms" => {
                self.polling.max_interval = Self::parse_millis(key, value)?;
            }
            "athena.csv.quote_style" => {
                self.parser.quote_style =
                    QuoteStyle::parse(value).ok_or_else(|| Self::invalid_value(key, value))?;
            }
            "athena.log_level" => self.log.level = Some(value.to_string()),
            "athena.log_file" => self.log.file = Some(value.to_string()),
            "athena.http.connect_timeout_ms" => {
                self.http.connect_timeout = Self::parse_millis(key, value)?;
            }
            "athena.http.read_timeout_ms" => {
                self.http.read_timeout = Self::parse_millis(key, value)?;
            }
            _ => return Err(Error::config(format!("unknown option '{}'", key))),
        }
        Ok(())
    }

    pub fn get_option(&self, key: &str) -> Result<String> {
        let millis = |d: Duration| d.as_millis().to_string();
        match key {
            "athena.database" => self.database.clone().ok_or_else(|| Self::unset(key)),
            "athena.work_group" => self.work_group.clone().ok_or_else(|| Self::unset(key)),
            "athena.output_location" => self
                .output_location
                .clone()
                .ok_or_else(|| Self::unset(key)),
            "athena.api_call_timeout_ms" => Ok(millis(self.api_call_timeout)),
            "athena.polling.strategy" => Ok(match self.polling.kind {
                PollingKind::Fixed => "fixed".to_string(),
                PollingKind::Exponential => "exponential".to_string(),
            }),
            "athena.polling.interval_ms" => Ok(millis(self.polling.interval)),
            "athena.polling.max_interval_ms" => Ok(millis(self.polling.max_interval)),
            "athena.csv.quote_style" => Ok(match self.parser.quote_style {
                QuoteStyle::Required => "required".to_string(),
                QuoteStyle::Optional => "optional".to_string(),
            }),
            "athena.log_level" => self.log.level.clone().ok_or_else(|| Self::unset(key)),
            "athena.log_file" => self.log.file.clone().ok_or_else(|| Self::unset(key)),
            "athena.http.connect_timeout_ms" => Ok(millis(self.http.connect_timeout)),
            "athena.http.read_timeout_ms" => Ok(millis(self.http.read_timeout)),
            _ => Err(Error::config(format!("unknown option '{}'", key))),
        }
    }
}
