use reflexion_core::search::{SearchClient, SearchProvider};
use reflexion_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize, JsonSchema)]
pub struct WebSearchParameters {
    #[schemars(description = "The search query.")]
    query: String,
}

/// A tool that searches the web.
pub struct WebSearchTool {
    search: SearchClient,
    parameter_schema: Value,
}

impl WebSearchTool {
    /// Creates a web search tool backed by `provider`.
    #[inline]
    pub fn new<P: SearchProvider>(provider: P) -> Self {
        WebSearchTool {
            search: SearchClient::new(provider),
            parameter_schema: schema_for!(WebSearchParameters).to_value(),
        }
    }
}

impl Tool for WebSearchTool {
    type Input = WebSearchParameters;

    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Searches the web and returns the most relevant pages as JSON, each \
         with a title, URL and content excerpt."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: WebSearchParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let search = self.search.clone();
        async move {
            let hits = search.search(&input.query).await?;
            serde_json::to_string(&hits).map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })
        }
    }
}
