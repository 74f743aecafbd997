use reflexion_core::search::SearchHit;
use serde::{Deserialize, Serialize};

use crate::config::SearchDepth;

#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub search_depth: SearchDepth,
    pub max_results: u32,
    pub include_answer: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: Option<f64>,
}

impl From<SearchResult> for SearchHit {
    fn from(result: SearchResult) -> Self {
        SearchHit {
            title: result.title,
            url: result.url,
            content: result.content,
            score: result.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request() {
        let req = SearchRequest {
            query: "rust borrow checker",
            search_depth: SearchDepth::Advanced,
            max_results: 3,
            include_answer: false,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "query": "rust borrow checker",
                "search_depth": "advanced",
                "max_results": 3,
                "include_answer": false,
            })
        );
    }

    #[test]
    fn test_response() {
        let resp: SearchResponse = serde_json::from_slice(include_bytes!(
            "../fixtures/search_response.json"
        ))
        .unwrap();
        let hits: Vec<SearchHit> =
            resp.results.into_iter().map(Into::into).collect();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://doc.rust-lang.org/book/ch04-02-references-and-borrowing.html");
        assert_eq!(hits[0].score, Some(0.93));
        assert_eq!(hits[1].title, "");
        assert_eq!(hits[1].score, None);
    }
}
