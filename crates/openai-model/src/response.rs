use std::collections::VecDeque;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use reflexion_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    OpaqueMessage, ToolCallRequest,
};
use serde_json::Value;

use crate::Error;
use crate::io::{Sse, SseError};
use crate::proto::{ChatCompletionChunk, Message, StreamError, ToolCall};

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type Pulled = (Sse, Result<Option<String>, SseError>);

async fn pull(mut sse: Sse) -> Pulled {
    let event = sse.next_event().await;
    (sse, event)
}

/// Folds streamed chunks into events and the final assistant message.
///
/// Text deltas are emitted as they arrive. Tool calls are only emitted
/// once the stream ends, because their arguments arrive in fragments.
#[derive(Default)]
struct Assembler {
    id: Option<String>,
    content: String,
    reasoning_content: Option<String>,
    tool_calls: Vec<ToolCall>,
    finish_reason: Option<ModelFinishReason>,
    pending: VecDeque<ModelResponseEvent>,
    done: bool,
}

impl Assembler {
    fn feed(&mut self, data: &str) -> Result<(), Error> {
        let chunk = match serde_json::from_str::<ChatCompletionChunk>(data) {
            Ok(chunk) => chunk,
            Err(err) => {
                if let Ok(StreamError { error }) = serde_json::from_str(data) {
                    return Err(Error::new(error.message, ErrorKind::Other));
                }
                return Err(Error::new(
                    format!("malformed chunk: {err}"),
                    ErrorKind::Other,
                ));
            }
        };
        if self.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        }

        // The trailing usage chunk has no choices.
        for choice in chunk.choices {
            let delta = choice.delta;
            if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
                self.content.push_str(&content);
                self.pending.push_back(ModelResponseEvent::MessageDelta(content));
            }
            if let Some(reasoning) = delta.reasoning_content {
                self.reasoning_content
                    .get_or_insert_default()
                    .push_str(&reasoning);
            }
            for fragment in delta.tool_calls.into_iter().flatten() {
                self.merge_tool_call(fragment);
            }
            match choice.finish_reason.as_deref() {
                None => {}
                Some("content_filter") => {
                    return Err(Error::new(
                        "response was filtered",
                        ErrorKind::Moderated,
                    ));
                }
                Some("tool_calls") => {
                    self.finish_reason = Some(ModelFinishReason::ToolCalls);
                }
                Some(_) => self.finish_reason = Some(ModelFinishReason::Stop),
            }
        }
        Ok(())
    }

    fn merge_tool_call(&mut self, fragment: ToolCall) {
        let slot = match fragment.index {
            Some(index) => self.tool_calls.iter_mut().find(|t| t.index == Some(index)),
            // Some servers omit the index and send every call in one piece.
            None => None,
        };
        let Some(slot) = slot else {
            self.tool_calls.push(fragment);
            return;
        };

        if let Some(id) = fragment.id {
            slot.id.get_or_insert_default().push_str(&id);
        }
        if let Some(ty) = fragment.r#type {
            slot.r#type.get_or_insert_default().push_str(&ty);
        }
        let Some(function) = fragment.function else {
            return;
        };
        let target = slot.function.get_or_insert_default();
        if let Some(name) = function.name {
            target.name.get_or_insert_default().push_str(&name);
        }
        if let Some(arguments) = function.arguments {
            target.arguments.get_or_insert_default().push_str(&arguments);
        }
    }

    fn finish(&mut self) {
        if self.done {
            return;
        }
        self.done = true;

        for call in &self.tool_calls {
            self.pending
                .push_back(ModelResponseEvent::ToolCall(to_request(call)));
        }
        let reason = self.finish_reason.unwrap_or(if self.tool_calls.is_empty() {
            ModelFinishReason::Stop
        } else {
            ModelFinishReason::ToolCalls
        });
        self.pending.push_back(ModelResponseEvent::Completed(reason));
    }

    fn into_message(self) -> Option<(String, Message)> {
        Some((
            self.id?,
            Message::Assistant {
                content: Some(self.content),
                tool_calls: (!self.tool_calls.is_empty())
                    .then_some(self.tool_calls),
                reasoning_content: self.reasoning_content,
            },
        ))
    }
}

fn to_request(call: &ToolCall) -> ToolCallRequest {
    let function = call.function.clone().unwrap_or_default();
    let raw = function.arguments.unwrap_or_default();
    let arguments = if raw.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(&raw).unwrap_or(Value::String(raw))
    };
    ToolCallRequest {
        id: call.id.clone().unwrap_or_default(),
        name: function.name.unwrap_or_default(),
        arguments,
    }
}

/// A streamed chat completion.
pub struct OpenAIResponse {
    pull_fut: Option<PinnedFuture<Pulled>>,
    assembler: Assembler,
    full_msg: Option<(String, Message)>,
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        Self {
            pull_fut: Some(Box::pin(pull(sse))),
            assembler: Assembler::default(),
            full_msg: None,
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        loop {
            if let Some(event) = this.assembler.pending.pop_front() {
                return Poll::Ready(Ok(Some(event)));
            }
            if this.assembler.done {
                if this.full_msg.is_none() {
                    this.full_msg = mem::take(&mut this.assembler).into_message();
                    // Keep answering `None` on later polls.
                    this.assembler.done = true;
                }
                return Poll::Ready(Ok(None));
            }
            let Some(pull_fut) = this.pull_fut.as_mut() else {
                return Poll::Ready(Ok(None));
            };

            let (sse, event) = ready!(pull_fut.as_mut().poll(cx));
            this.pull_fut = None;
            match event {
                Ok(Some(data)) if data == "[DONE]" => this.assembler.finish(),
                Ok(Some(data)) => {
                    trace!("got sse event: {data}");
                    if let Err(err) = this.assembler.feed(&data) {
                        this.assembler.done = true;
                        return Poll::Ready(Err(err));
                    }
                    this.pull_fut = Some(Box::pin(pull(sse)));
                }
                Ok(None) => this.assembler.finish(),
                Err(err) => {
                    this.assembler.done = true;
                    return Poll::Ready(Err(Error::new(
                        err.to_string(),
                        ErrorKind::Other,
                    )));
                }
            }
        }
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        self.full_msg
            .as_ref()
            .map(|(id, msg)| OpaqueMessage::new(id.clone(), msg.clone()))
    }
}
