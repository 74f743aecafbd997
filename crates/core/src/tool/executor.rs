use std::collections::HashMap;
use std::pin::Pin;

use reflexion_model::{ModelTool, ToolCallRequest};

use crate::tool::{AnyTool, Error, Tool, ToolObject, ToolResult};

type BoxedToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

/// An executor that handles tool call requests from the model.
#[derive(Default)]
pub struct Executor {
    tools: HashMap<String, Box<dyn ToolObject>>,
}

impl Executor {
    /// Registers a tool, replacing any tool with the same name.
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        let tool: Box<dyn ToolObject> = Box::new(AnyTool(tool));
        self.tools.insert(tool.name().to_owned(), tool);
    }

    /// Returns the definitions of all tools, sorted by name.
    pub fn definitions(&self) -> Vec<ModelTool> {
        let mut definitions: Vec<_> =
            self.tools.values().map(|tool| tool.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Runs every request in order and returns one result per request id.
    pub async fn run_all(
        &self,
        requests: Vec<ToolCallRequest>,
    ) -> Vec<(String, ToolResult)> {
        let futures = {
            let span = debug_span!("tool executor");
            let _enter = span.enter();
            self.spawn_all(requests)
        };

        let mut results = Vec::with_capacity(futures.len());
        for (id, fut) in futures {
            let result = fut.await;
            if let Err(err) = &result {
                debug!("tool call ({id}) failed: {err}");
            }
            results.push((id, result));
        }
        results
    }

    fn spawn_all(
        &self,
        requests: Vec<ToolCallRequest>,
    ) -> Vec<(String, BoxedToolFuture)> {
        let mut futures = Vec::with_capacity(requests.len());
        for req in requests {
            let id = req.id;
            let fut: BoxedToolFuture = match self.tools.get(&req.name) {
                Some(tool) => {
                    trace!("running a tool ({id}) with args: {:?}", req.arguments);
                    tool.execute(req.arguments)
                }
                None => {
                    warn!("tool not found: {}", req.name);
                    let err = Error::not_found()
                        .with_reason(format!("no tool named `{}`", req.name));
                    Box::pin(std::future::ready(Err(err)))
                }
            };
            futures.push((id, fut));
        }
        futures
    }
}
