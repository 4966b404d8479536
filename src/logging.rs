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

//! Tracing subscriber for the `athena_client` target.
//!
//! The `athena.log_level` option, when set, overrides `RUST_LOG`; without
//! either the level is `warn`. `athena.log_file` redirects output from
//! stderr to a file opened in append mode.
//!
//! ```bash
//! RUST_LOG=athena_client=debug ./my_app
//! ```

use std::fs::{File, OpenOptions};
use std::sync::OnceLock;
use tracing_subscriber::{
    fmt::{self, time::SystemTime, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Logging options carried by [`ClientConfig`](crate::config::ClientConfig).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// "OFF", "ERROR", "WARN", "INFO", "DEBUG" or "TRACE".
    pub level: Option<String>,
    /// Append to this file instead of writing to stderr.
    pub file: Option<String>,
}

impl LogConfig {
    fn filter(&self) -> EnvFilter {
        match self.level {
            Some(ref level) => EnvFilter::new(format!("athena_client={}", level.to_lowercase())),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("athena_client=warn")),
        }
    }

    fn is_off(&self) -> bool {
        self.level
            .as_deref()
            .is_some_and(|level| level.eq_ignore_ascii_case("off"))
    }
}

/// Destination of formatted log lines.
#[derive(Debug)]
enum LogSink {
    Stderr,
    File(File),
}

impl LogSink {
    fn open(config: &LogConfig) -> std::io::Result<Self> {
        match config.file {
            Some(ref path) => OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map(LogSink::File),
            None => Ok(LogSink::Stderr),
        }
    }

    /// Writer plus whether ANSI colors belong in the output.
    fn into_writer(self) -> (BoxMakeWriter, bool) {
        match self {
            LogSink::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
            LogSink::File(file) => (BoxMakeWriter::new(file), false),
        }
    }
}

/// Install the process-wide tracing subscriber.
///
/// Only the first call has an effect, so the first [`Session`](crate::Session)
/// picks the settings. If the host application already installed a
/// subscriber, that one stays.
pub fn init_logging(config: &LogConfig) {
    LOGGING_INITIALIZED.get_or_init(|| {
        if config.is_off() {
            return;
        }

        let sink = match LogSink::open(config) {
            Ok(sink) => sink,
            Err(e) => {
                eprintln!(
                    "athena-client: cannot open log file {}: {}",
                    config.file.as_deref().unwrap_or_default(),
                    e
                );
                return;
            }
        };
        let (writer, ansi) = sink.into_writer();

        tracing_subscriber::registry()
            .with(config.filter())
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_target(false)
                    .with_ansi(ansi)
                    .with_timer(SystemTime),
            )
            .try_init()
            .ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert!(config.level.is_none());
        assert!(config.file.is_none());
        assert!(!config.is_off());
    }

    #[test]
    fn test_log_config_off_is_case_insensitive() {
        let config = LogConfig {
            level: Some("Off".to_string()),
            file: None,
        };
        assert!(config.is_off());
    }

    #[test]
    fn test_explicit_level_builds_crate_filter() {
        let config = LogConfig {
            level: Some("DEBUG".to_string()),
            file: None,
        };
        assert_eq!(config.filter().to_string(), "athena_client=debug");
    }

    #[test]
    fn test_sink_defaults_to_stderr() {
        let sink = LogSink::open(&LogConfig::default()).unwrap();
        assert!(matches!(sink, LogSink::Stderr));
    }

    #[test]
    fn test_sink_appends_to_file() {
        let path = std::env::temp_dir().join(format!("athena-client-log-{}.log", std::process::id()));
        let config = LogConfig {
            level: Some("info".to_string()),
            file: Some(path.to_string_lossy().into_owned()),
        };
        let sink = LogSink::open(&config).unwrap();
        assert!(matches!(sink, LogSink::File(_)));
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_sink_reports_unopenable_file() {
        let config = LogConfig {
            level: None,
            file: Some("/nonexistent-dir/athena/client.log".to_string()),
        };
        assert!(LogSink::open(&config).is_err());
    }
}
