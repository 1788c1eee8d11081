//! HTTP fetch layer for the data client
//!
//! [`ApiRequest`] is the wire-neutral description of one backend call.
//! [`Fetcher`] is the seam the cache store issues requests through, so
//! tests can substitute a scripted in-memory transport. [`RestClient`]
//! is the production implementation on top of reqwest.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use serde_json::Value;

use super::config::ClientConfig;
use super::errors::{FetchError, FetchResult};

/// HTTP method subset used by the backend contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Request body variants.
///
/// Multipart bytes are `Arc`-shared: requests are cloned whenever the
/// store re-issues a fetch and upload payloads can be large.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart {
        field: &'static str,
        file_name: String,
        bytes: Arc<Vec<u8>>,
    },
}

/// Wire-neutral description of a single backend request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path relative to the base URL, e.g. `shipments/` or `imports/42/progress/`
    pub path: String,
    /// Serialized query parameters in declaration order
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_multipart(
        mut self,
        field: &'static str,
        file_name: impl Into<String>,
        bytes: Arc<Vec<u8>>,
    ) -> Self {
        self.body = RequestBody::Multipart {
            field,
            file_name: file_name.into(),
            bytes,
        };
        self
    }
}

/// Flatten a serializable argument struct into query pairs.
///
/// `None` fields serialize to JSON null and are skipped, which is what
/// lets one filter struct serve both full and partial queries. Nested
/// values have no query-string representation and are skipped with a
/// log line.
pub fn query_pairs<A: Serialize>(args: &A) -> Vec<(String, String)> {
    let value = match serde_json::to_value(args) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("failed to serialize query args: {}", e);
            return Vec::new();
        }
    };
    let mut pairs = Vec::new();
    if let Value::Object(map) = value {
        for (key, item) in map {
            match item {
                Value::Null => {}
                Value::String(s) => pairs.push((key, s)),
                Value::Number(n) => pairs.push((key, n.to_string())),
                Value::Bool(b) => pairs.push((key, b.to_string())),
                other => log::warn!("skipping non-scalar query parameter '{}': {}", key, other),
            }
        }
    }
    pairs
}

/// Boxed response future returned by [`Fetcher::dispatch`].
pub type FetchFuture = Pin<Box<dyn Future<Output = FetchResult<Value>> + Send + 'static>>;

/// Transport seam between the cache store and the network.
///
/// The store never talks to reqwest directly; everything goes through
/// this trait so behavior tests can script responses and control their
/// resolution order.
pub trait Fetcher: Send + Sync {
    fn dispatch(&self, request: ApiRequest) -> FetchFuture;
}

/// Production HTTP client for the freight backend.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    /// Create a new REST client with the configured timeouts.
    pub fn new(config: &ClientConfig) -> FetchResult<Self> {
        let client = ClientBuilder::new()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn execute(client: Client, base_url: String, request: ApiRequest) -> FetchResult<Value> {
        let url = format!("{}/{}", base_url, request.path);

        let mut builder = match request.method {
            HttpMethod::Get => client.get(&url),
            HttpMethod::Post => client.post(&url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart {
                field,
                file_name,
                bytes,
            } => {
                let part = reqwest::multipart::Part::bytes(bytes.as_ref().clone())
                    .file_name(file_name)
                    .mime_str("text/csv")
                    .map_err(|e| FetchError::validation(format!("Invalid upload part: {}", e)))?;
                builder.multipart(reqwest::multipart::Form::new().part(field, part))
            }
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(format!("Request to {} timed out", url))
            } else {
                FetchError::network(format!("Request to {} failed: {}", url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::http(status.as_u16(), body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::decode(format!("Failed to parse response from {}: {}", url, e)))
    }
}

impl Fetcher for RestClient {
    fn dispatch(&self, request: ApiRequest) -> FetchFuture {
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        Box::pin(Self::execute(client, base_url, request))
    }
}
