//! Tool call supports.

mod error;
mod executor;

use std::pin::Pin;

use reflexion_model::ModelTool;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub use executor::Executor;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless. Configuration the
/// tool needs (an API client, a default format, ...) is set at
/// initialization and copied into the future when executing.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`,
    /// and the future should be cancellation safe.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}

pub(crate) trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn definition(&self) -> ModelTool;

    fn execute(
        &self,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>>;
}

pub(crate) struct AnyTool<T: Tool>(pub T);

impl<T: Tool> ToolObject for AnyTool<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    fn definition(&self) -> ModelTool {
        ModelTool {
            name: self.0.name().to_owned(),
            description: self.0.description().to_owned(),
            parameters: self.0.parameter_schema().clone(),
        }
    }

    #[inline]
    fn execute(
        &self,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> {
        // Some models send the arguments as a JSON string.
        let arguments = match arguments {
            Value::String(raw) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(_) => Value::String(raw),
            },
            arguments => arguments,
        };
        let input: T::Input = match serde_json::from_value(arguments) {
            Ok(input) => input,
            Err(err) => {
                let reason = format!("{err}");
                return Box::pin(std::future::ready(ToolResult::Err(
                    Error::invalid_input().with_reason(reason),
                )));
            }
        };
        Box::pin(self.0.execute(input))
    }
}
