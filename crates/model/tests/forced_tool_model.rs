//! A minimal provider exercising the protocol the way structured-output
//! callers use it: the request forces one tool and the answer comes back
//! as a single tool call.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::Pin;
use std::task::{self, Poll};

use reflexion_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
    ModelTool, ToolCallRequest, ToolChoice,
};
use serde_json::{Value, json};

#[derive(Debug)]
struct EchoError(ErrorKind);

impl Display for EchoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "echo model failed: {}", self.0)
    }
}

impl Error for EchoError {}

impl ModelProviderError for EchoError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

struct EchoResponse {
    events: VecDeque<ModelResponseEvent>,
}

impl ModelResponse for EchoResponse {
    type Error = EchoError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        _cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        Poll::Ready(Ok(self.get_mut().events.pop_front()))
    }
}

/// Answers every request by calling the forced tool with the last user
/// text, or with plain text when no tool is forced.
struct EchoProvider;

impl ModelProvider for EchoProvider {
    type Error = EchoError;
    type Response = EchoResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let last_user = req.messages.iter().rev().find_map(|msg| match msg {
            ModelMessage::User(text) => Some(text.clone()),
            _ => None,
        });
        let Some(text) = last_user else {
            return ready(Err(EchoError(ErrorKind::Other)));
        };

        let events = match &req.tool_choice {
            ToolChoice::Function(name) => {
                if !req.tools.iter().any(|t| &t.name == name) {
                    return ready(Err(EchoError(ErrorKind::Moderated)));
                }
                vec![
                    ModelResponseEvent::ToolCall(ToolCallRequest {
                        id: "call:0".to_owned(),
                        name: name.clone(),
                        arguments: json!({ "text": text }),
                    }),
                    ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
                ]
            }
            _ => vec![
                ModelResponseEvent::MessageDelta(text),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ],
        };
        ready(Ok(EchoResponse {
            events: events.into(),
        }))
    }
}

async fn drain(
    mut resp: EchoResponse,
) -> (String, Vec<ToolCallRequest>, Option<ModelFinishReason>) {
    let mut text = String::new();
    let mut calls = vec![];
    let mut finish = None;
    while let Some(event) =
        poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
            .await
            .unwrap()
    {
        match event {
            ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
            ModelResponseEvent::ToolCall(call) => calls.push(call),
            ModelResponseEvent::Completed(reason) => finish = Some(reason),
        }
    }
    (text, calls, finish)
}

fn record_tool() -> ModelTool {
    ModelTool {
        name: "Record".to_owned(),
        description: "Stores a text.".to_owned(),
        parameters: json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        }),
    }
}

#[tokio::test]
async fn test_forced_tool_call() {
    let req = ModelRequest {
        messages: vec![
            ModelMessage::System("Record the input.".to_owned()),
            ModelMessage::User("Tell me about France".to_owned()),
        ],
        tools: vec![record_tool()],
        tool_choice: ToolChoice::Function("Record".to_owned()),
    };
    let resp = EchoProvider.send_request(&req).await.unwrap();
    let (text, calls, finish) = drain(resp).await;

    assert!(text.is_empty());
    assert_eq!(finish, Some(ModelFinishReason::ToolCalls));
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "Record");
    assert_eq!(
        calls[0].arguments.get("text"),
        Some(&Value::from("Tell me about France"))
    );
}

#[tokio::test]
async fn test_plain_text_answer() {
    let req = ModelRequest {
        messages: vec![ModelMessage::User("Good morning".to_owned())],
        ..Default::default()
    };
    let resp = EchoProvider.send_request(&req).await.unwrap();
    let (text, calls, finish) = drain(resp).await;

    assert_eq!(text, "Good morning");
    assert!(calls.is_empty());
    assert_eq!(finish, Some(ModelFinishReason::Stop));
}

#[tokio::test]
async fn test_errors() {
    let empty = ModelRequest::default();
    let err = EchoProvider.send_request(&empty).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Other);

    let unknown_tool = ModelRequest {
        messages: vec![ModelMessage::User("Hi".to_owned())],
        tools: vec![],
        tool_choice: ToolChoice::Function("Record".to_owned()),
    };
    let err = EchoProvider.send_request(&unknown_tool).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Moderated);
}
