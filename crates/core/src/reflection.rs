//! A generate-then-critique loop over plain text.
//!
//! The generator drafts, the critic reviews the draft, and the critique is
//! fed back to the generator as a user turn. The critic sees the same
//! exchange with the roles flipped, so the drafts it grades arrive as user
//! messages.

use reflexion_model::{ModelMessage, ModelProvider};

use crate::chain::TextChain;
use crate::{Error, ModelClient};

/// The number of drafts a loop generates by default.
pub const DEFAULT_MAX_ROUNDS: usize = 3;

const WRITER_PROMPT: &str = include_str!("prompts/tweet_writer.md");
const CRITIC_PROMPT: &str = include_str!("prompts/tweet_critic.md");

/// The result of a [`ReflectionLoop`] run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReflectionOutcome {
    /// Every draft, the last one being final.
    pub drafts: Vec<String>,
    /// Every critique, one fewer than the drafts.
    pub critiques: Vec<String>,
}

impl ReflectionOutcome {
    /// Returns the final draft.
    pub fn final_draft(&self) -> &str {
        self.drafts.last().map(String::as_str).unwrap_or_default()
    }
}

/// A generate/critique loop.
pub struct ReflectionLoop {
    generator: TextChain,
    critic: TextChain,
    max_rounds: usize,
}

impl ReflectionLoop {
    /// Creates a loop with the default tweet-writing instructions.
    pub fn with_model_provider<P: ModelProvider + 'static>(provider: P) -> Self {
        let client = ModelClient::new(provider);
        Self {
            generator: TextChain::new(client.clone(), WRITER_PROMPT.trim()),
            critic: TextChain::new(client, CRITIC_PROMPT.trim()),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Replaces both instructions.
    pub fn with_prompts<G: Into<String>, C: Into<String>>(
        self,
        generator: G,
        critic: C,
    ) -> Self {
        let client = self.generator.client().clone();
        Self {
            generator: TextChain::new(client.clone(), generator),
            critic: TextChain::new(client, critic),
            max_rounds: self.max_rounds,
        }
    }

    /// Sets how many drafts to generate, at least one.
    #[inline]
    pub fn max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    /// Runs the loop for `request`.
    pub async fn run(&self, request: &str) -> Result<ReflectionOutcome, Error> {
        let mut messages = vec![ModelMessage::User(request.to_owned())];
        let mut outcome = ReflectionOutcome::default();

        for round in 1..=self.max_rounds {
            let draft = self.generator.invoke(&messages).await?;
            debug!(round, len = draft.len(), "generated a draft");
            messages.push(ModelMessage::Assistant(draft.clone()));
            outcome.drafts.push(draft);
            if round == self.max_rounds {
                break;
            }

            let critique = self.critic.invoke(&flip_roles(&messages)).await?;
            debug!(round, len = critique.len(), "got a critique");
            messages.push(ModelMessage::User(critique.clone()));
            outcome.critiques.push(critique);
        }

        info!(rounds = outcome.drafts.len(), "reflection finished");
        Ok(outcome)
    }
}

/// Presents the exchange from the critic's side.
///
/// The request stays a user message; after it, drafts become user turns
/// and critiques become assistant turns.
fn flip_roles(messages: &[ModelMessage]) -> Vec<ModelMessage> {
    messages
        .iter()
        .enumerate()
        .map(|(i, msg)| match msg {
            ModelMessage::Assistant(text) => ModelMessage::User(text.clone()),
            ModelMessage::User(text) if i > 0 => {
                ModelMessage::Assistant(text.clone())
            }
            msg => msg.clone(),
        })
        .collect()
}
