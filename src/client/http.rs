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

//! HTTP object store for result pages.
//!
//! Pages are streamed, never buffered whole: the response body is adapted
//! into an `AsyncBufRead` and handed to the row parser as it arrives.
//! Requests are sent once; a failed request is a transport error.

use crate::client::{ObjectStore, PageStream};
use crate::error::{Error, Result};
use crate::types::query::ResultLocation;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::Client;
use std::time::Duration;
use tokio_util::io::StreamReader;
use tracing::debug;

/// Configuration for the HTTP object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum time between two reads of a response body.
    pub read_timeout: Duration,
    /// Maximum number of idle connections per host.
    pub max_connections_per_host: usize,
    /// User agent string.
    pub user_agent: String,
    /// URL used for `s3://bucket/key` locations. `{bucket}` and `{key}` are
    /// substituted.
    pub endpoint_template: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            max_connections_per_host: 100,
            user_agent: format!("athena-client-rs/{}", env!("CARGO_PKG_VERSION")),
            endpoint_template: "https://{bucket}.s3.amazonaws.com/{key}".to_string(),
        }
    }
}

/// Streams result pages over HTTP(S).
#[derive(Debug)]
pub struct HttpObjectStore {
    client: Client,
    config: HttpClientConfig,
}

impl HttpObjectStore {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .pool_max_idle_per_host(config.max_connections_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Map a location URI to the URL to fetch.
    fn resolve_url(&self, uri: &str) -> Result<String> {
        if uri.starts_with("https://") || uri.starts_with("http://") {
            return Ok(uri.to_string());
        }
        let path = uri
            .strip_prefix("s3://")
            .ok_or_else(|| Error::config(format!("Unsupported result location: {}", uri)))?;
        match path.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(self
                .config
                .endpoint_template
                .replace("{bucket}", bucket)
                .replace("{key}", key)),
            _ => Err(Error::config(format!(
                "Result location has no bucket or key: {}",
                uri
            ))),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn open_stream(&self, location: &ResultLocation) -> Result<PageStream> {
        let url = self.resolve_url(&location.uri)?;
        debug!("Opening result page {} from {}", location.sequence, url);

        let mut request_builder = self.client.get(&url);
        for (key, value) in &location.http_headers {
            request_builder = request_builder.header(key, value);
        }

        let response = request_builder.send().await.map_err(|e| {
            Error::transport(format!("Failed to open result page {}: {}", url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Error::transport(format!(
                "HTTP {} - {}",
                status.as_u16(),
                error_body
            )));
        }

        let body = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::pin(StreamReader::new(body)))
    }
}
