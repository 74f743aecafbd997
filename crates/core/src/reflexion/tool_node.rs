use futures_util::future::join_all;

use crate::conversation::{ConversationHistory, ToolResultMessage};
use crate::search::SearchClient;

/// Runs the searches requested by the latest AI message.
pub struct ToolExecutor {
    search: SearchClient,
}

impl ToolExecutor {
    /// Creates an executor backed by `search`.
    #[inline]
    pub fn new(search: SearchClient) -> Self {
        Self { search }
    }

    /// Looks up every query of the latest AI message, concurrently.
    ///
    /// Returns one result per query, in query order. A failed lookup
    /// yields an error payload instead of failing the batch. An AI message
    /// without queries yields no results.
    pub async fn execute(
        &self,
        history: &ConversationHistory,
    ) -> Vec<ToolResultMessage> {
        let Some(last) = history.last_ai_message() else {
            return vec![];
        };

        let lookups = last.search_calls().iter().map(|call| async move {
            match self.search.search(&call.query).await {
                Ok(hits) => {
                    debug!(query = %call.query, hits = hits.len(), "searched");
                    ToolResultMessage::success(call, &hits)
                }
                Err(err) => {
                    warn!(query = %call.query, "search failed: {err}");
                    ToolResultMessage::failure(call, &err.reason())
                }
            }
        });
        join_all(lookups).await
    }
}
