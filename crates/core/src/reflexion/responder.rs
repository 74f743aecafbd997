use super::{RESPOND_POSTAMBLE, actor_prompt};
use crate::chain::StructuredChain;
use crate::conversation::ConversationHistory;
use crate::schema::AnswerQuestion;
use crate::{Error, ModelClient};

const INSTRUCTION: &str = include_str!("../prompts/responder.md");

/// Drafts the first answer to the question.
pub struct Responder {
    chain: StructuredChain<AnswerQuestion>,
}

impl Responder {
    /// Creates a responder with the default instructions.
    pub fn new(client: ModelClient) -> Self {
        let chain = StructuredChain::new(client)
            .with_preamble(actor_prompt(INSTRUCTION))
            .with_postamble(RESPOND_POSTAMBLE.trim());
        Self { chain }
    }

    /// Produces a draft for the history, which normally holds only the
    /// question.
    pub async fn respond(
        &self,
        history: &ConversationHistory,
    ) -> Result<AnswerQuestion, Error> {
        let draft = self.chain.invoke(history.to_model_messages()).await?;
        debug!(?draft.search_queries, "got a draft");
        Ok(draft)
    }
}
