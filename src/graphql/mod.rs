//! GraphQL fetch client for the publication API.
//!
//! One POST per call, bounded by a timeout that starts when the call starts.
//! Failures are classified so callers can tell a timeout from a non-2xx
//! status, a GraphQL `errors` array, or a lower-level transport failure.
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::graphql::model::{ListPostsData, PostBySlugData, PublicationPost};

pub mod model;
pub mod queries;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(8000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {} ms", .after.as_millis())]
    Timeout { after: Duration },
    #[error("HTTP error {status}")]
    Status { status: StatusCode },
    #[error("GraphQL error: {}", .messages.join(", "))]
    Remote { messages: Vec<String> },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("invalid GraphQL response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

#[derive(Clone)]
pub struct GraphqlClient {
    http: Client,
    endpoint: Url,
}

impl fmt::Debug for GraphqlClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphqlClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GraphqlClient {
    pub fn new(endpoint: Url) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent("folio/0.1")
            .no_proxy()
            .build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Bind a query document and options; variables are supplied per call.
    pub fn prepare(&self, query: impl Into<String>, options: Option<FetchOptions>) -> PreparedQuery {
        PreparedQuery {
            client: self.clone(),
            query: query.into(),
            timeout: options.unwrap_or_default().timeout,
        }
    }

    pub fn build_request(&self, body: &Value) -> Result<reqwest::Request, FetchError> {
        let request = self
            .http
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(body)
            .build()?;
        Ok(request)
    }

    async fn execute(&self, body: Value) -> Result<Value, FetchError> {
        let request = self.build_request(&body)?;
        let res = self.http.execute(request).await?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status { status });
        }
        let bytes = res.bytes().await?;
        interpret_body(&bytes)
    }
}

#[derive(Debug, Clone)]
pub struct PreparedQuery {
    client: GraphqlClient,
    query: String,
    timeout: Duration,
}

impl PreparedQuery {
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute the query once. Dropping the in-flight exchange when the timer
    /// fires aborts the request.
    pub async fn fetch(&self, variables: Option<&Map<String, Value>>) -> Result<Value, FetchError> {
        let operation = operation_name(&self.query);
        let body = request_body(&self.query, variables);
        debug!(operation, endpoint = %self.client.endpoint, "graphql request");

        let outcome = tokio::time::timeout(self.timeout, self.client.execute(body)).await;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                after: self.timeout,
            }),
        };
        if let Err(err) = &result {
            warn!(operation, error = %err, "graphql request failed");
        }
        result
    }
}

pub fn request_body(query: &str, variables: Option<&Map<String, Value>>) -> Value {
    match variables {
        Some(vars) => json!({ "query": query, "variables": vars }),
        None => json!({ "query": query }),
    }
}

/// Decode a response body, turning a non-empty `errors` array into
/// [`FetchError::Remote`]. A successful payload is returned untouched.
pub fn interpret_body(bytes: &[u8]) -> Result<Value, FetchError> {
    let payload: Value = serde_json::from_slice(bytes)?;
    if let Some(errors) = payload.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages = errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                })
                .collect();
            return Err(FetchError::Remote { messages });
        }
    }
    Ok(payload)
}

fn operation_name(query: &str) -> &str {
    query
        .split_whitespace()
        .skip_while(|tok| *tok != "query" && *tok != "mutation")
        .nth(1)
        .map(|name| name.split(['(', '{']).next().unwrap_or(name))
        .filter(|name| !name.is_empty())
        .unwrap_or("anonymous")
}

fn decode_data<T: DeserializeOwned>(payload: &Value) -> Result<Option<T>, FetchError> {
    match payload.get("data") {
        None | Some(Value::Null) => Ok(None),
        Some(data) => Ok(Some(T::deserialize(data)?)),
    }
}

/// Read side of the publication: the page loaders depend on this seam.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn list_posts(&self) -> Result<Vec<PublicationPost>, FetchError>;

    async fn post_by_slug(&self, slug: &str) -> Result<Option<PublicationPost>, FetchError>;
}

/// Catalog queries bound to one publication host.
#[derive(Debug, Clone)]
pub struct Publication {
    host: String,
    list: PreparedQuery,
    by_slug: PreparedQuery,
}

impl Publication {
    pub fn new(client: &GraphqlClient, host: &str, options: FetchOptions) -> Self {
        Self {
            host: host.to_string(),
            list: client.prepare(queries::list_posts(host), Some(options)),
            by_slug: client.prepare(queries::post_by_slug(host), Some(options)),
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let endpoint = cfg.endpoint_url()?;
        let client = GraphqlClient::new(endpoint).context("failed to build GraphQL client")?;
        let options = FetchOptions {
            timeout: cfg.fetch_timeout(),
        };
        Ok(Self::new(&client, &cfg.content.host, options))
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl ContentSource for Publication {
    async fn list_posts(&self) -> Result<Vec<PublicationPost>, FetchError> {
        let payload = self.list.fetch(None).await?;
        let data: Option<ListPostsData> = decode_data(&payload)?;
        Ok(data
            .and_then(|d| d.publication)
            .map(|p| p.posts.edges.into_iter().map(|e| e.node).collect())
            .unwrap_or_default())
    }

    async fn post_by_slug(&self, slug: &str) -> Result<Option<PublicationPost>, FetchError> {
        let mut variables = Map::new();
        variables.insert("slug".into(), Value::String(slug.to_string()));
        let payload = self.by_slug.fetch(Some(&variables)).await?;
        let data: Option<PostBySlugData> = decode_data(&payload)?;
        Ok(data.and_then(|d| d.publication).and_then(|p| p.post))
    }
}
