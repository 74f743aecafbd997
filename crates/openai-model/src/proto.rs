use reflexion_model::{
    ModelMessage, ModelRequest, ModelTool, ToolCallRequest, ToolChoice,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::OpenAIConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(skip_serializing)]
    pub index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionCall>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub reasoning_content: Option<String>,
}

/// An error reported inside the event stream instead of a chunk.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct StreamError {
    pub error: StreamErrorBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct StreamErrorBody {
    pub message: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct FunctionTool {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct Tool {
    r#type: &'static str,
    function: FunctionTool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct FunctionName {
    name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
enum ToolChoiceParam {
    Mode(&'static str),
    Function {
        r#type: &'static str,
        function: FunctionName,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reasoning_content: Option<String>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoiceParam>,
    stream: bool,
}

// -----------
// Conversions
// -----------

pub fn create_request(
    req: &ModelRequest,
    config: &OpenAIConfig,
) -> ChatCompletionRequest {
    let tools: Vec<Tool> = req.tools.iter().map(create_tool).collect();
    // The API rejects `tool_choice` when no tools are declared.
    let tool_choice = if tools.is_empty() {
        None
    } else {
        Some(create_tool_choice(&req.tool_choice))
    };
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: req.messages.iter().map(create_message).collect(),
        temperature: config.temperature,
        tools,
        tool_choice,
        stream: true,
    }
}

fn create_message(msg: &ModelMessage) -> Message {
    match msg {
        ModelMessage::System(content) => Message::System {
            content: content.clone(),
        },
        ModelMessage::User(content) => Message::User {
            content: content.clone(),
        },
        ModelMessage::Assistant(content) => Message::Assistant {
            content: Some(content.clone()),
            tool_calls: None,
            reasoning_content: None,
        },
        ModelMessage::AssistantToolCalls {
            content,
            tool_calls,
        } => Message::Assistant {
            content: (!content.is_empty()).then(|| content.clone()),
            tool_calls: Some(tool_calls.iter().map(create_tool_call).collect()),
            reasoning_content: None,
        },
        ModelMessage::Tool(result) => Message::Tool {
            tool_call_id: result.id.clone(),
            content: result.content.clone(),
        },
        ModelMessage::Opaque(opaque) => match opaque.to_raw::<Message>() {
            Some(msg) => msg.clone(),
            None => {
                warn!("dropping foreign opaque message {}", opaque.id());
                Message::Assistant {
                    content: None,
                    tool_calls: None,
                    reasoning_content: None,
                }
            }
        },
    }
}

fn create_tool_call(req: &ToolCallRequest) -> ToolCall {
    let arguments = match &req.arguments {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    };
    ToolCall {
        index: None,
        id: Some(req.id.clone()),
        r#type: Some("function".to_owned()),
        function: Some(FunctionCall {
            name: Some(req.name.clone()),
            arguments: Some(arguments),
        }),
    }
}

fn create_tool(tool: &ModelTool) -> Tool {
    Tool {
        r#type: "function",
        function: FunctionTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

fn create_tool_choice(choice: &ToolChoice) -> ToolChoiceParam {
    match choice {
        ToolChoice::Auto => ToolChoiceParam::Mode("auto"),
        ToolChoice::None => ToolChoiceParam::Mode("none"),
        ToolChoice::Function(name) => ToolChoiceParam::Function {
            r#type: "function",
            function: FunctionName { name: name.clone() },
        },
    }
}
