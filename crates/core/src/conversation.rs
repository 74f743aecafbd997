//! The append-only history of a reflexion run.

use reflexion_model::{ModelMessage, ToolCallRequest, ToolCallResult};
use serde::Serialize;
use serde_json::{Value, json};

use crate::Error;
use crate::schema::{self, AnswerRecord};

/// Name of the tool every search call is attributed to.
pub const WEB_SEARCH_TOOL: &str = "web_search";

/// An entry of a [`ConversationHistory`].
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// The question that started the run.
    User(UserMessage),
    /// A draft or a revision.
    Ai(AiMessage),
    /// The result of one search.
    ToolResult(ToolResultMessage),
}

/// The user's question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserMessage {
    /// The question text.
    pub text: String,
}

/// A search requested by an AI message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchCall {
    /// Correlation id, echoed by the matching [`ToolResultMessage`].
    pub id: String,
    /// The query to search for.
    pub query: String,
}

/// An answer record produced by the model.
#[derive(Clone, Debug, PartialEq)]
pub struct AiMessage {
    payload: Value,
    search_calls: Vec<SearchCall>,
}

impl AiMessage {
    /// Wraps an answer record. Each query becomes a [`SearchCall`] whose id
    /// is unique within the history, given the index the message will take.
    pub(crate) fn from_record<T: Serialize>(
        record: &T,
        queries: &[String],
        index: usize,
    ) -> Result<Self, Error> {
        let payload = serde_json::to_value(record).map_err(|err| {
            Error::schema_mismatch("AnswerQuestion | ReviseAnswer", err.to_string())
        })?;
        let search_calls = queries
            .iter()
            .enumerate()
            .map(|(i, query)| SearchCall {
                id: format!("search:{index}:{i}"),
                query: query.clone(),
            })
            .collect();
        Ok(Self {
            payload,
            search_calls,
        })
    }

    /// Returns the structured payload.
    #[inline]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns the searches this message asked for, in query order.
    #[inline]
    pub fn search_calls(&self) -> &[SearchCall] {
        &self.search_calls
    }

    /// Decodes the payload into the record it holds.
    #[inline]
    pub fn classify(&self) -> Result<AnswerRecord, Error> {
        schema::classify(&self.payload)
    }
}

/// The outcome of one search, attributed to the call that asked for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolResultMessage {
    /// Serialized lookup results, or the lookup error.
    pub payload: String,
    /// Id of the [`SearchCall`] this result answers.
    pub source_call_id: String,
}

impl ToolResultMessage {
    /// Creates a result for a successful lookup.
    pub fn success<R: Serialize>(call: &SearchCall, results: &R) -> Self {
        Self {
            payload: json!({ "query": call.query, "results": results }).to_string(),
            source_call_id: call.id.clone(),
        }
    }

    /// Creates a result for a failed lookup.
    pub fn failure(call: &SearchCall, error: &str) -> Self {
        Self {
            payload: json!({ "query": call.query, "error": error }).to_string(),
            source_call_id: call.id.clone(),
        }
    }
}

/// An ordered, append-only list of messages.
///
/// The first message is always the user's question.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    /// Starts a history with the given question.
    pub fn with_question<S: Into<String>>(question: S) -> Self {
        Self {
            messages: vec![Message::User(UserMessage {
                text: question.into(),
            })],
        }
    }

    /// Returns all messages in order.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always `false`, since a history starts with the question.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the question.
    pub fn question(&self) -> &str {
        match self.messages.first() {
            Some(Message::User(msg)) => &msg.text,
            _ => "",
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    /// Returns the most recent AI message.
    pub fn last_ai_message(&self) -> Option<&AiMessage> {
        self.messages.iter().rev().find_map(|msg| match msg {
            Message::Ai(ai) => Some(ai),
            _ => None,
        })
    }

    /// Counts tool result messages.
    ///
    /// This counts individual results, not tool cycles: a batch of three
    /// searches adds three.
    pub fn tool_result_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|msg| matches!(msg, Message::ToolResult(_)))
            .count()
    }

    /// Renders the history into the model protocol.
    pub fn to_model_messages(&self) -> Vec<ModelMessage> {
        self.messages
            .iter()
            .map(|msg| match msg {
                Message::User(user) => ModelMessage::User(user.text.clone()),
                Message::Ai(ai) if ai.search_calls.is_empty() => {
                    ModelMessage::Assistant(ai.payload.to_string())
                }
                Message::Ai(ai) => ModelMessage::AssistantToolCalls {
                    content: ai.payload.to_string(),
                    tool_calls: ai
                        .search_calls
                        .iter()
                        .map(|call| ToolCallRequest {
                            id: call.id.clone(),
                            name: WEB_SEARCH_TOOL.to_owned(),
                            arguments: json!({ "query": call.query }),
                        })
                        .collect(),
                },
                Message::ToolResult(result) => {
                    ModelMessage::Tool(ToolCallResult {
                        id: result.source_call_id.clone(),
                        content: result.payload.clone(),
                    })
                }
            })
            .collect()
    }
}
