//! The reflexion loop.
//!
//! A run alternates three components over a shared
//! [`ConversationHistory`]:
//!
//! - the [`Responder`] drafts an [`AnswerQuestion`] with a self-critique
//!   and the searches that would improve it,
//! - the [`ToolExecutor`] runs those searches,
//! - the [`Revisor`] rewrites the answer into a cited [`ReviseAnswer`].
//!
//! After each revision the run either goes back to the tool executor or
//! terminates. The decision counts tool cycles: a run stops once more than
//! `max_iterations` cycles have completed, so a run always performs
//! `max_iterations + 1` cycles and `max_iterations + 1` revisions. A cycle
//! counts even when it had nothing to search for, which is what bounds the
//! loop.

mod builder;
mod responder;
mod revisor;
mod state;
#[cfg(test)]
mod tests;
mod tool_node;

use reflexion_model::ModelProvider;
use tracing::Instrument;

use crate::Error;
use crate::conversation::{
    AiMessage, ConversationHistory, Message, ToolResultMessage,
};
use crate::schema::{AnswerQuestion, AnswerRecord, ReviseAnswer};
use crate::search::SearchProvider;
pub use builder::ReflexionAgentBuilder;
pub use responder::Responder;
pub use revisor::Revisor;
pub use state::Stage;
pub use tool_node::ToolExecutor;

/// The number of extra tool cycles a run performs by default.
pub const DEFAULT_MAX_ITERATIONS: usize = 2;

const ACTOR_PROMPT: &str = include_str!("prompts/reflexion_actor.md");
const RESPOND_POSTAMBLE: &str = include_str!("prompts/respond_postamble.md");

fn actor_prompt(first_instruction: &str) -> String {
    ACTOR_PROMPT.replace("{first_instruction}", first_instruction.trim())
}

/// Progress of a run, reported to the `on_event` callback.
#[derive(Clone, Copy, Debug)]
pub enum ReflexionEvent<'a> {
    /// The responder produced a draft.
    Drafted(&'a AnswerQuestion),
    /// A tool cycle completed.
    ToolsExecuted {
        /// 1-based index of the cycle.
        cycle: usize,
        /// The results appended by this cycle, possibly none.
        results: &'a [ToolResultMessage],
    },
    /// The revisor produced a revision.
    Revised {
        /// Index of the cycle the revision follows.
        cycle: usize,
        /// The revision.
        revision: &'a ReviseAnswer,
    },
}

type EventHandler = Box<dyn Fn(ReflexionEvent<'_>) + Send + Sync>;

/// A configured reflexion agent.
///
/// The agent holds no per-question state and may run any number of
/// questions, one [`ReflexionRun`] each.
pub struct ReflexionAgent {
    responder: Responder,
    revisor: Revisor,
    tool_executor: ToolExecutor,
    max_iterations: usize,
    on_event: Option<EventHandler>,
}

impl ReflexionAgent {
    /// Creates a builder with the specified model and search providers.
    #[inline]
    pub fn builder<P, S>(
        model_provider: P,
        search_provider: S,
    ) -> ReflexionAgentBuilder
    where
        P: ModelProvider + 'static,
        S: SearchProvider,
    {
        ReflexionAgentBuilder::with_providers(model_provider, search_provider)
    }

    /// Returns the configured iteration bound.
    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Starts a run for `question` without calling anything yet.
    pub fn start<S: Into<String>>(&self, question: S) -> ReflexionRun<'_> {
        ReflexionRun {
            agent: self,
            history: ConversationHistory::with_question(question),
            stage: Stage::Draft,
            tool_cycles_completed: 0,
        }
    }

    /// Answers `question`, running the loop to its end.
    pub async fn invoke<S: Into<String>>(
        &self,
        question: S,
    ) -> Result<ReflexionOutcome, Error> {
        self.start(question).run_to_end().await
    }

    fn emit(&self, event: ReflexionEvent<'_>) {
        if let Some(on_event) = &self.on_event {
            on_event(event);
        }
    }
}

/// The result of a finished run.
#[derive(Clone, Debug)]
pub struct ReflexionOutcome {
    /// The final revision.
    pub answer: ReviseAnswer,
    /// Everything that was said during the run.
    pub history: ConversationHistory,
    /// How many tool cycles ran.
    pub tool_cycles: usize,
}

/// A single question being answered.
///
/// Messages are appended only after the step that produced them succeeded.
/// A failed step leaves the history as it was and the run can be
/// inspected, but further steps would repeat the failed call.
pub struct ReflexionRun<'a> {
    agent: &'a ReflexionAgent,
    history: ConversationHistory,
    stage: Stage,
    tool_cycles_completed: usize,
}

impl ReflexionRun<'_> {
    /// Returns the stage the next [`step`](Self::step) will run.
    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Returns the history so far.
    #[inline]
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Returns the number of completed tool cycles.
    ///
    /// Unlike [`ConversationHistory::tool_result_count`], a cycle that
    /// searched three queries counts once, and a cycle that searched
    /// nothing counts too.
    #[inline]
    pub fn tool_cycles_completed(&self) -> usize {
        self.tool_cycles_completed
    }

    /// Runs the current stage and returns the next one.
    ///
    /// Does nothing once the run has terminated.
    pub async fn step(&mut self) -> Result<Stage, Error> {
        let agent = self.agent;
        match self.stage {
            Stage::Draft => {
                let draft = agent.responder.respond(&self.history).await?;
                let msg = AiMessage::from_record(
                    &draft,
                    &draft.search_queries,
                    self.history.len(),
                )?;
                self.history.push(Message::Ai(msg));
                info!(queries = draft.search_queries.len(), "drafted an answer");
                agent.emit(ReflexionEvent::Drafted(&draft));
                self.stage = Stage::ExecuteTools;
            }
            Stage::ExecuteTools => {
                let results = agent.tool_executor.execute(&self.history).await;
                self.tool_cycles_completed += 1;
                info!(
                    cycle = self.tool_cycles_completed,
                    results = results.len(),
                    "completed a tool cycle"
                );
                agent.emit(ReflexionEvent::ToolsExecuted {
                    cycle: self.tool_cycles_completed,
                    results: &results,
                });
                for result in results {
                    self.history.push(Message::ToolResult(result));
                }
                self.stage = Stage::Revise;
            }
            Stage::Revise => {
                let revision = agent.revisor.revise(&self.history).await?;
                let msg = AiMessage::from_record(
                    &revision,
                    &revision.search_queries,
                    self.history.len(),
                )?;
                self.history.push(Message::Ai(msg));
                self.stage = Stage::after_revision(
                    self.tool_cycles_completed,
                    agent.max_iterations,
                );
                info!(
                    references = revision.references.len(),
                    next = ?self.stage,
                    "revised the answer"
                );
                agent.emit(ReflexionEvent::Revised {
                    cycle: self.tool_cycles_completed,
                    revision: &revision,
                });
            }
            Stage::Terminated => {}
        }
        Ok(self.stage)
    }

    /// Steps until the run terminates, then returns the outcome.
    pub async fn run_to_end(mut self) -> Result<ReflexionOutcome, Error> {
        let span =
            info_span!("reflexion", max_iterations = self.agent.max_iterations);
        async move {
            while self.stage != Stage::Terminated {
                debug!(stage = ?self.stage, "running a step");
                self.step().await?;
            }
            self.into_outcome()
        }
        .instrument(span)
        .await
    }

    /// Turns a terminated run into its outcome.
    ///
    /// The last AI message must be a [`ReviseAnswer`].
    pub fn into_outcome(self) -> Result<ReflexionOutcome, Error> {
        if self.stage != Stage::Terminated {
            return Err(Error::classification(format!(
                "the run is still at the {:?} stage",
                self.stage
            )));
        }
        let last = self
            .history
            .last_ai_message()
            .ok_or_else(|| Error::classification("no answer was produced"))?;
        let answer = match last.classify() {
            Ok(AnswerRecord::Revision(revision)) => revision,
            Ok(AnswerRecord::Draft(_)) => {
                return Err(Error::classification(
                    "the last answer is a draft, not a revision",
                ));
            }
            Err(err) => return Err(Error::classification(err.to_string())),
        };
        Ok(ReflexionOutcome {
            answer,
            history: self.history,
            tool_cycles: self.tool_cycles_completed,
        })
    }
}
