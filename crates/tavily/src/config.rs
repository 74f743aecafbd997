use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

use serde::Serialize;

/// The default Tavily endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.tavily.com";
/// The default number of results per query.
pub const DEFAULT_MAX_RESULTS: u32 = 5;

/// How thoroughly Tavily searches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    /// Fast, generic snippets.
    #[default]
    Basic,
    /// Slower, with content more relevant to the query.
    Advanced,
}

impl Display for SearchDepth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SearchDepth::Basic => f.write_str("basic"),
            SearchDepth::Advanced => f.write_str("advanced"),
        }
    }
}

impl FromStr for SearchDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(SearchDepth::Basic),
            "advanced" => Ok(SearchDepth::Advanced),
            _ => Err(format!("unknown search depth `{s}`")),
        }
    }
}

/// Builder for [`TavilyConfig`].
#[derive(Clone, PartialEq)]
pub struct TavilyConfigBuilder {
    api_key: String,
    search_depth: SearchDepth,
    max_results: Option<u32>,
    base_url: Option<String>,
}

impl TavilyConfigBuilder {
    /// Creates a builder with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            search_depth: SearchDepth::default(),
            max_results: None,
            base_url: None,
        }
    }

    /// Sets the search depth.
    #[inline]
    pub fn with_search_depth(mut self, search_depth: SearchDepth) -> Self {
        self.search_depth = search_depth;
        self
    }

    /// Sets the number of results per query, at least one.
    #[inline]
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results.max(1));
        self
    }

    /// Sets a custom base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> TavilyConfig {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        TavilyConfig {
            api_key: self.api_key,
            search_depth: self.search_depth,
            max_results: self.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }
}

impl Debug for TavilyConfigBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TavilyConfigBuilder")
            .field("api_key", &"<redacted>")
            .field("search_depth", &self.search_depth)
            .field("max_results", &self.max_results)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Configuration for [`TavilyProvider`](crate::TavilyProvider).
#[derive(Clone, PartialEq)]
pub struct TavilyConfig {
    pub(crate) api_key: String,
    pub(crate) search_depth: SearchDepth,
    pub(crate) max_results: u32,
    pub(crate) base_url: String,
}

impl TavilyConfig {
    /// Returns the search depth.
    #[inline]
    pub fn search_depth(&self) -> SearchDepth {
        self.search_depth
    }

    /// Returns the number of results per query.
    #[inline]
    pub fn max_results(&self) -> u32 {
        self.max_results
    }

    #[inline]
    pub(crate) fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }
}

impl Debug for TavilyConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TavilyConfig")
            .field("api_key", &"<redacted>")
            .field("search_depth", &self.search_depth)
            .field("max_results", &self.max_results)
            .field("base_url", &self.base_url)
            .finish()
    }
}
