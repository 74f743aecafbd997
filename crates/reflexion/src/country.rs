use reflexion_core::chain::StructuredOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Information about a country.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Country {
    /// Name of the country.
    pub name: String,
    /// Language of the country.
    pub language: String,
    /// Capital of the country.
    pub capital: String,
}

impl StructuredOutput for Country {
    const NAME: &'static str = "Country";
    const DESCRIPTION: &'static str =
        "Extract information about the country mentioned in the text.";
}

#[cfg(test)]
mod tests {
    use reflexion_core::ModelClient;
    use reflexion_core::chain::{StructuredChain, tool_definition};
    use reflexion_test_model::{PresetResponse, TestModelProvider};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_tool_definition() {
        let tool = tool_definition::<Country>();
        assert_eq!(tool.name, "Country");
        let required = tool.parameters["required"].as_array().unwrap();
        assert_eq!(required.len(), 3);
    }

    #[tokio::test]
    async fn test_extract() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_tool_call(
            "call_1",
            "Country",
            json!({ "name": "France", "language": "French", "capital": "Paris" }),
        ));

        let chain = StructuredChain::<Country>::new(ModelClient::new(provider));
        let country = chain
            .extract("Tell me about the country whose capital is Paris.")
            .await
            .unwrap();
        assert_eq!(country.capital, "Paris");
    }
}
