//! A tool-calling agent.
//!
//! The agent sends the conversation together with its tool definitions,
//! runs whatever the model asks for, feeds the results back and repeats
//! until the model answers in plain text.

use reflexion_model::{
    ModelMessage, ModelProvider, ModelRequest, ToolCallResult, ToolChoice,
};

use crate::chain::render_time;
use crate::tool::{Executor, Tool};
use crate::{Error, ModelClient};

/// The number of model calls an agent makes by default before giving up.
pub const DEFAULT_MAX_STEPS: usize = 8;

const DEFAULT_SYSTEM_PROMPT: &str = include_str!("prompts/react_agent.md");

/// [`ReactAgent`] builder.
pub struct ReactAgentBuilder {
    model_client: ModelClient,
    system_prompt: String,
    executor: Executor,
    max_steps: usize,
}

impl ReactAgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            system_prompt: DEFAULT_SYSTEM_PROMPT.trim().to_owned(),
            executor: Executor::default(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Replaces the system instructions.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.executor.add_tool(tool);
        self
    }

    /// Sets the maximum number of model calls per invocation.
    #[inline]
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> ReactAgent {
        ReactAgent {
            model_client: self.model_client,
            system_prompt: self.system_prompt,
            executor: self.executor,
            max_steps: self.max_steps,
        }
    }
}

/// A tool-calling agent.
pub struct ReactAgent {
    model_client: ModelClient,
    system_prompt: String,
    executor: Executor,
    max_steps: usize,
}

/// The result of a [`ReactAgent`] invocation.
#[derive(Clone, Debug)]
pub struct ReactOutcome {
    /// The model's final text answer.
    pub answer: String,
    /// The model calls it took.
    pub steps: usize,
    /// The tool calls that were run.
    pub tool_calls: usize,
    /// The full exchange, including the system instructions.
    pub messages: Vec<ModelMessage>,
}

impl ReactAgent {
    /// Answers `input`.
    pub async fn invoke(&self, input: &str) -> Result<ReactOutcome, Error> {
        let mut messages = vec![
            ModelMessage::System(render_time(&self.system_prompt)),
            ModelMessage::User(input.to_owned()),
        ];
        let tools = self.executor.definitions();
        let mut tool_calls = 0;

        for step in 1..=self.max_steps {
            let req = ModelRequest {
                messages: messages.clone(),
                tools: tools.clone(),
                tool_choice: ToolChoice::Auto,
            };
            let resp = self.model_client.send_request(req).await?;

            if resp.tool_calls.is_empty() {
                info!(step, tool_calls, "got the final answer");
                messages.push(ModelMessage::Assistant(resp.transcript.clone()));
                return Ok(ReactOutcome {
                    answer: resp.transcript,
                    steps: step,
                    tool_calls,
                    messages,
                });
            }

            debug!(step, calls = resp.tool_calls.len(), "model requested tools");
            messages.push(match resp.opaque_msg {
                Some(opaque) => ModelMessage::Opaque(opaque),
                None => ModelMessage::AssistantToolCalls {
                    content: resp.transcript,
                    tool_calls: resp.tool_calls.clone(),
                },
            });

            for (id, result) in self.executor.run_all(resp.tool_calls).await {
                tool_calls += 1;
                let content = match result {
                    Ok(output) => output,
                    Err(err) => format!("Error: {err}"),
                };
                messages.push(ModelMessage::Tool(ToolCallResult { id, content }));
            }
        }

        warn!(max_steps = self.max_steps, "no final answer");
        Err(Error::StepLimitExceeded {
            steps: self.max_steps,
        })
    }
}
