//! A [`SearchProvider`] backed by the Tavily search API.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod proto;

use std::sync::Arc;

use reflexion_core::search::{SearchHit, SearchProvider};
use reflexion_core::tool::Error as ToolError;
use reqwest::{Client, StatusCode};

pub use config::{
    DEFAULT_BASE_URL, DEFAULT_MAX_RESULTS, SearchDepth, TavilyConfig,
    TavilyConfigBuilder,
};
use proto::{SearchRequest, SearchResponse};

/// Error type for [`TavilyProvider`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request could not be sent or its body could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Tavily answered with a non-success status.
    #[error("Tavily API error {status}: {body}")]
    Status {
        /// The response status.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// The response body was not a search response.
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Tavily search provider.
#[derive(Clone, Debug)]
pub struct TavilyProvider {
    client: Client,
    config: Arc<TavilyConfig>,
}

impl TavilyProvider {
    /// Creates a new `TavilyProvider` with the given configuration.
    #[inline]
    pub fn new(config: TavilyConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &TavilyConfig {
        &self.config
    }
}

impl SearchProvider for TavilyProvider {
    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<SearchHit>, ToolError>> + Send + 'static
    {
        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        let query = query.to_owned();
        async move {
            search(&client, &config, &query).await.map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })
        }
    }
}

async fn search(
    client: &Client,
    config: &TavilyConfig,
    query: &str,
) -> Result<Vec<SearchHit>, Error> {
    let body = SearchRequest {
        query,
        search_depth: config.search_depth,
        max_results: config.max_results,
        include_answer: false,
    };
    debug!(query, depth = %config.search_depth, "searching");

    let resp = client
        .post(config.search_url())
        .bearer_auth(&config.api_key)
        .json(&body)
        .send()
        .await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        warn!(%status, "search request failed");
        return Err(Error::Status { status, body });
    }

    let bytes = resp.bytes().await?;
    let resp: SearchResponse = serde_json::from_slice(&bytes)?;
    let mut hits: Vec<SearchHit> =
        resp.results.into_iter().map(Into::into).collect();
    hits.truncate(config.max_results as usize);
    trace!(query, hits = hits.len(), "search finished");
    Ok(hits)
}
