use reflexion_core::chain::format_now;
use reflexion_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_FORMAT: &str = "%Y-%m-%d";

#[derive(Deserialize, JsonSchema)]
pub struct CurrentTimeParameters {
    #[schemars(
        description = "strftime-style format of the result, default to `%Y-%m-%d`."
    )]
    format: Option<String>,
}

/// A tool that tells the current local time.
pub struct CurrentTimeTool {
    parameter_schema: Value,
}

impl CurrentTimeTool {
    /// Creates a new current time tool.
    #[inline]
    pub fn new() -> Self {
        CurrentTimeTool {
            parameter_schema: schema_for!(CurrentTimeParameters).to_value(),
        }
    }
}

impl Default for CurrentTimeTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for CurrentTimeTool {
    type Input = CurrentTimeParameters;

    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Returns the current local date and time in the given format."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: CurrentTimeParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let format = input.format.as_deref().unwrap_or(DEFAULT_FORMAT);
        let result = format_now(format).ok_or_else(|| {
            ToolError::execution_error()
                .with_reason(format!("invalid time format `{format}`"))
        });
        std::future::ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_formats() {
        let tool = CurrentTimeTool::new();

        let date = tool
            .execute(CurrentTimeParameters { format: None })
            .await
            .unwrap();
        assert_eq!(date.len(), "2024-01-01".len());
        assert_eq!(date.matches('-').count(), 2);

        let year = tool
            .execute(CurrentTimeParameters {
                format: Some("%Y".to_owned()),
            })
            .await
            .unwrap();
        assert_eq!(year.len(), 4);

        let err = tool
            .execute(CurrentTimeParameters {
                format: Some("%Q".to_owned()),
            })
            .await
            .unwrap_err();
        assert!(err.reason().contains("%Q"));
    }
}
