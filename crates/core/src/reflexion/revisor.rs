use super::{RESPOND_POSTAMBLE, actor_prompt};
use crate::chain::StructuredChain;
use crate::conversation::ConversationHistory;
use crate::schema::ReviseAnswer;
use crate::{Error, ModelClient};

const INSTRUCTION: &str = include_str!("../prompts/revisor.md");

/// Rewrites the latest answer using the search results that followed it.
pub struct Revisor {
    chain: StructuredChain<ReviseAnswer>,
}

impl Revisor {
    /// Creates a revisor with the default instructions.
    pub fn new(client: ModelClient) -> Self {
        let chain = StructuredChain::new(client)
            .with_preamble(actor_prompt(INSTRUCTION))
            .with_postamble(RESPOND_POSTAMBLE.trim());
        Self { chain }
    }

    /// Produces a revision of the whole history.
    ///
    /// The returned revision never carries search queries.
    pub async fn revise(
        &self,
        history: &ConversationHistory,
    ) -> Result<ReviseAnswer, Error> {
        let mut revision = self.chain.invoke(history.to_model_messages()).await?;
        if !revision.search_queries.is_empty() {
            warn!(
                dropped = ?revision.search_queries,
                "revision asked for more searches, ignoring them"
            );
            revision.search_queries.clear();
        }
        Ok(revision)
    }
}
