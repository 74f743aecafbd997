//! The web-search capability used by the tool executor.

use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tool::Error as ToolError;

/// One search result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Title of the page.
    pub title: String,
    /// Address of the page.
    pub url: String,
    /// Extracted content relevant to the query.
    pub content: String,
    /// Relevance score, if the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// A web-search backend.
pub trait SearchProvider: Send + Sync + 'static {
    /// Looks up `query`, returning at most the configured number of hits.
    ///
    /// The returned future must not borrow `self` or `query`.
    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<SearchHit>, ToolError>> + Send + 'static;
}

type BoxedSearchFuture =
    Pin<Box<dyn Future<Output = Result<Vec<SearchHit>, ToolError>> + Send>>;
type SearchFn = Arc<dyn Fn(&str) -> BoxedSearchFuture + Send + Sync>;

/// A type-erased, cloneable handle to a [`SearchProvider`].
#[derive(Clone)]
pub struct SearchClient {
    search_fn: SearchFn,
}

impl SearchClient {
    /// Wraps a provider.
    pub fn new<P: SearchProvider>(provider: P) -> Self {
        let search_fn: SearchFn =
            Arc::new(move |query: &str| -> BoxedSearchFuture {
                Box::pin(provider.search(query))
            });
        Self { search_fn }
    }

    /// Looks up `query`.
    #[inline]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ToolError> {
        (self.search_fn)(query).await
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::future::ready;
    use std::sync::Mutex;

    use super::*;

    /// Answers queries from a fixed table; unknown queries fail.
    #[derive(Clone, Default)]
    pub struct FakeSearch {
        hits: Arc<HashMap<String, Vec<SearchHit>>>,
        queries: Arc<Mutex<Vec<String>>>,
    }

    impl FakeSearch {
        pub fn with_hits<'a>(
            entries: impl IntoIterator<Item = (&'a str, &'a str)>,
        ) -> Self {
            let hits = entries
                .into_iter()
                .map(|(query, url)| {
                    let hit = SearchHit {
                        title: format!("About {query}"),
                        url: url.to_owned(),
                        content: format!("Everything on {query}."),
                        score: Some(0.9),
                    };
                    (query.to_owned(), vec![hit])
                })
                .collect();
            Self {
                hits: Arc::new(hits),
                queries: Default::default(),
            }
        }

        pub fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl SearchProvider for FakeSearch {
        fn search(
            &self,
            query: &str,
        ) -> impl Future<Output = Result<Vec<SearchHit>, ToolError>> + Send + 'static
        {
            self.queries.lock().unwrap().push(query.to_owned());
            ready(match self.hits.get(query) {
                Some(hits) => Ok(hits.clone()),
                None => Err(ToolError::execution_error()
                    .with_reason(format!("no results for `{query}`"))),
            })
        }
    }
}
