//! Prompt-to-model pipelines.
//!
//! A [`StructuredChain`] forces the model to answer by calling a single
//! tool whose parameters are the schema of the wanted record, then decodes
//! the call's arguments. A [`TextChain`] just returns the reply text.

use std::fmt::Write;
use std::marker::PhantomData;

use chrono::Local;
use reflexion_model::{ModelMessage, ModelRequest, ModelTool, ToolChoice};
use schemars::JsonSchema;
use schemars::generate::SchemaSettings;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Error, ModelClient};

/// Placeholder in prompt templates, replaced by the current local time.
pub const TIME_PLACEHOLDER: &str = "{{TIME}}";

/// A record the model can be asked to produce.
pub trait StructuredOutput:
    Serialize + DeserializeOwned + JsonSchema + Send + 'static
{
    /// Name of the forced tool; also the record name in errors.
    const NAME: &'static str;

    /// Description of the forced tool.
    const DESCRIPTION: &'static str;

    /// Checks constraints the schema cannot express to the decoder.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Generates the inlined JSON schema of `T`, suitable as tool parameters.
pub fn parameter_schema<T: JsonSchema>() -> Value {
    let schema = SchemaSettings::draft07()
        .with(|s| s.inline_subschemas = true)
        .into_generator()
        .into_root_schema_for::<T>();
    let mut value = schema.to_value();
    if let Value::Object(map) = &mut value {
        map.remove("$schema");
    }
    value
}

/// Builds the tool definition that represents `T`.
pub fn tool_definition<T: StructuredOutput>() -> ModelTool {
    ModelTool {
        name: T::NAME.to_owned(),
        description: T::DESCRIPTION.to_owned(),
        parameters: parameter_schema::<T>(),
    }
}

/// Replaces [`TIME_PLACEHOLDER`] with the current local time.
pub fn render_time(template: &str) -> String {
    if !template.contains(TIME_PLACEHOLDER) {
        return template.to_owned();
    }
    template.replace(TIME_PLACEHOLDER, &Local::now().to_rfc3339())
}

/// Formats the current local time with a `strftime`-style format.
///
/// Returns `None` if the format is invalid.
pub fn format_now(format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", Local::now().format(format)).ok()?;
    Some(out)
}

/// A chain that produces records of type `T`.
pub struct StructuredChain<T> {
    client: ModelClient,
    preamble: Option<String>,
    postamble: Option<String>,
    tool: ModelTool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: StructuredOutput> StructuredChain<T> {
    /// Creates a chain without any instructions.
    pub fn new(client: ModelClient) -> Self {
        Self {
            client,
            preamble: None,
            postamble: None,
            tool: tool_definition::<T>(),
            _marker: PhantomData,
        }
    }

    /// Sets the system instructions sent before the history.
    ///
    /// [`TIME_PLACEHOLDER`] is rendered on every invocation.
    pub fn with_preamble<S: Into<String>>(mut self, preamble: S) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    /// Sets the system instructions sent after the history.
    pub fn with_postamble<S: Into<String>>(mut self, postamble: S) -> Self {
        self.postamble = Some(postamble.into());
        self
    }

    /// Returns the tool the model is forced to call.
    #[inline]
    pub fn tool(&self) -> &ModelTool {
        &self.tool
    }

    /// Asks the model for a `T`, given the conversation so far.
    pub async fn invoke(&self, history: Vec<ModelMessage>) -> Result<T, Error> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(preamble) = &self.preamble {
            messages.push(ModelMessage::System(render_time(preamble)));
        }
        messages.extend(history);
        if let Some(postamble) = &self.postamble {
            messages.push(ModelMessage::System(postamble.clone()));
        }

        let req = ModelRequest {
            messages,
            tools: vec![self.tool.clone()],
            tool_choice: ToolChoice::Function(T::NAME.to_owned()),
        };
        let resp = self.client.send_request(req).await?;

        let Some(call) = resp.tool_calls.into_iter().find(|c| c.name == T::NAME)
        else {
            return Err(Error::schema_mismatch(
                T::NAME,
                "the model did not call the tool",
            ));
        };
        let record = decode::<T>(call.arguments)?;
        record
            .validate()
            .map_err(|reason| Error::schema_mismatch(T::NAME, reason))?;
        Ok(record)
    }

    /// Asks the model to extract a `T` from a piece of text.
    #[inline]
    pub async fn extract(&self, text: &str) -> Result<T, Error> {
        self.invoke(vec![ModelMessage::User(text.to_owned())]).await
    }
}

fn decode<T: StructuredOutput>(arguments: Value) -> Result<T, Error> {
    let decoded = match arguments {
        // Unparsable arguments are passed through as raw text.
        Value::String(raw) => serde_json::from_str(&raw),
        arguments => serde_json::from_value(arguments),
    };
    decoded.map_err(|err| Error::schema_mismatch(T::NAME, err.to_string()))
}

/// A chain that returns the model's reply text.
#[derive(Clone)]
pub struct TextChain {
    client: ModelClient,
    system_prompt: String,
}

impl TextChain {
    /// Creates a chain with the given system instructions.
    pub fn new<S: Into<String>>(client: ModelClient, system_prompt: S) -> Self {
        Self {
            client,
            system_prompt: system_prompt.into(),
        }
    }

    /// Returns the client this chain sends requests with.
    #[inline]
    pub fn client(&self) -> &ModelClient {
        &self.client
    }

    /// Sends the instructions followed by `history` and returns the reply.
    pub async fn invoke(&self, history: &[ModelMessage]) -> Result<String, Error> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ModelMessage::System(render_time(&self.system_prompt)));
        messages.extend_from_slice(history);
        let req = ModelRequest {
            messages,
            ..Default::default()
        };
        let resp = self.client.send_request(req).await?;
        Ok(resp.transcript)
    }
}
