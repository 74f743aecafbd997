use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::OpaqueMessage;
use crate::provider::ModelProviderError;

/// A streamed response from the model provider.
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Attempts to pull out the next event from the response.
    ///
    /// # Return value
    ///
    /// - `Poll::Pending` means the next event is not ready yet. The
    ///   current task is woken once it may be.
    /// - `Poll::Ready(Ok(Some(event)))` delivers an event. More may follow.
    /// - `Poll::Ready(Ok(None))` means the response has completed.
    /// - `Poll::Ready(Err(error))` means the response failed. No further
    ///   events will be produced.
    ///
    /// Calling this method after completion should always return `None`.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;

    /// Makes an [`OpaqueMessage`] that represents the message in this
    /// response.
    ///
    /// Only meaningful once the response has completed. Implementations
    /// must return the same message on every call.
    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        None
    }
}

/// The reason why a model response has finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model needs to call a tool.
    ToolCalls,
    /// The model has finished generating text.
    Stop,
}

/// Describes a tool call request from the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The arguments, usually a JSON object.
    ///
    /// Providers that fail to parse the arguments as JSON pass the raw
    /// text through as a [`Value::String`].
    pub arguments: Value,
}

/// The event from a model response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// The response has been completed.
    Completed(ModelFinishReason),
    /// Received a message delta.
    MessageDelta(String),
    /// Received a complete tool call request.
    ToolCall(ToolCallRequest),
}
