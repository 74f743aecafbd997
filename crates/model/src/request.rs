use serde_json::Value;

use crate::OpaqueMessage;
use crate::response::ToolCallRequest;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelRequest {
    /// The input messages, oldest first.
    pub messages: Vec<ModelMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
    /// Whether (and which) tool the model has to call.
    pub tool_choice: ToolChoice,
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
    /// An assistant turn that requested tool calls.
    ///
    /// Every call must be answered by a [`ModelMessage::Tool`] message with
    /// the same id before the next assistant turn.
    AssistantToolCalls {
        /// Text content of the turn, may be empty.
        content: String,
        /// The requested calls.
        tool_calls: Vec<ToolCallRequest>,
    },
    /// A tool call result.
    Tool(ToolCallResult),
    /// A provider-specific message (usually echoed from an earlier response).
    Opaque(OpaqueMessage),
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCallResult {
    /// The id of the tool call this result answers.
    pub id: String,
    /// The result of the tool call.
    pub content: String,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool.
    ///
    /// For most model providers, the parameters should typically be
    /// defined by a [JSON schema](https://json-schema.org/).
    pub parameters: Value,
}

/// Controls whether the model may, must, or must not call tools.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ToolChoice {
    /// The model decides on its own.
    #[default]
    Auto,
    /// The model must not call any tool.
    None,
    /// The model must call the named tool.
    ///
    /// This is how structured output is obtained: the tool's parameter
    /// schema is the record shape and its arguments are the record.
    Function(String),
}
