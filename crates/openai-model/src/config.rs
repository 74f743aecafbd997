use std::fmt::{self, Debug, Formatter};

/// Groq serves an OpenAI-compatible API, and is what the agents are tuned
/// against.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
/// The default model id.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
/// The default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Builder for [`OpenAIConfig`].
#[derive(Clone, PartialEq)]
pub struct OpenAIConfigBuilder {
    api_key: String,
    model: Option<String>,
    base_url: Option<String>,
    temperature: Option<f32>,
}

impl OpenAIConfigBuilder {
    /// Creates a builder with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            temperature: None,
        }
    }

    /// Sets the model to use.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets a custom base URL, e.g. `https://api.openai.com/v1`.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> OpenAIConfig {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        OpenAIConfig {
            api_key: self.api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            base_url: base_url.trim_end_matches('/').to_owned(),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        }
    }
}

impl Debug for OpenAIConfigBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIConfigBuilder")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Configuration for the OpenAI-compatible provider.
#[derive(Clone, PartialEq)]
pub struct OpenAIConfig {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) temperature: f32,
}

impl OpenAIConfig {
    /// Returns the model id.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the base URL without a trailing slash.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[inline]
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Debug for OpenAIConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OpenAIConfigBuilder::with_api_key("gsk-secret").build();
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(
            config.endpoint("/chat/completions"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = OpenAIConfigBuilder::with_api_key("gsk-secret")
            .with_base_url("http://localhost:8080/v1/")
            .build();
        assert_eq!(config.base_url(), "http://localhost:8080/v1");

        let printed = format!("{config:?}");
        assert!(!printed.contains("gsk-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
