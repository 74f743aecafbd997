use reflexion_model::ModelProvider;

use super::{
    DEFAULT_MAX_ITERATIONS, EventHandler, ReflexionAgent, ReflexionEvent,
    Responder, Revisor, ToolExecutor,
};
use crate::model_client::ModelClient;
use crate::search::{SearchClient, SearchProvider};

/// [`ReflexionAgent`] builder.
pub struct ReflexionAgentBuilder {
    model_client: ModelClient,
    search_client: SearchClient,
    max_iterations: usize,
    on_event: Option<EventHandler>,
}

impl ReflexionAgentBuilder {
    /// Creates a new builder with the specified model and search providers.
    #[inline]
    pub fn with_providers<P, S>(model_provider: P, search_provider: S) -> Self
    where
        P: ModelProvider + 'static,
        S: SearchProvider,
    {
        Self {
            model_client: ModelClient::new(model_provider),
            search_client: SearchClient::new(search_provider),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            on_event: None,
        }
    }

    /// Sets the iteration bound. A run performs `max_iterations + 1` tool
    /// cycles.
    #[inline]
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Attaches a callback invoked as the run progresses.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(ReflexionEvent<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Box::new(on_event));
        self
    }

    /// Builds the agent.
    pub fn build(self) -> ReflexionAgent {
        let Self {
            model_client,
            search_client,
            max_iterations,
            on_event,
        } = self;

        ReflexionAgent {
            responder: Responder::new(model_client.clone()),
            revisor: Revisor::new(model_client),
            tool_executor: ToolExecutor::new(search_client),
            max_iterations,
            on_event,
        }
    }
}
