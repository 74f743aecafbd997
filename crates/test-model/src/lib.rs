//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use pin_project_lite::pin_project;
use reflexion_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, OpaqueMessage,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pin_project! {
    pub struct TestModelResponse {
        id: String,
        events: VecDeque<PresetEvent>,
        has_tool_call: bool,
        completed: bool,
        delay: Duration,
        #[pin]
        sleep: Option<Sleep>,
    }
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let mut this = self.project();
        if *this.completed {
            return Poll::Ready(Ok(None));
        }

        // Every event is delivered after a short delay, so callers are
        // exercised with real `Pending` states.
        if this.sleep.is_none() {
            this.sleep.set(Some(sleep(*this.delay)));
        }
        if let Some(timer) = this.sleep.as_mut().as_pin_mut() {
            ready!(timer.poll(cx));
        }
        this.sleep.set(None);

        let event = match this.events.pop_front() {
            Some(PresetEvent::MessageDelta(delta)) => {
                ModelResponseEvent::MessageDelta(delta)
            }
            Some(PresetEvent::ToolCall(req)) => ModelResponseEvent::ToolCall(req),
            None => {
                *this.completed = true;
                ModelResponseEvent::Completed(if *this.has_tool_call {
                    ModelFinishReason::ToolCalls
                } else {
                    ModelFinishReason::Stop
                })
            }
        };
        Poll::Ready(Ok(Some(event)))
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        Some(OpaqueMessage::new(self.id.clone(), self.id.clone()))
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<PresetResponse>,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Responses are scripted up front and handed out in order, one per
/// request, no matter what the request contains. Every request is recorded
/// so tests can assert on what the agent actually sent. Running out of
/// scripted responses is an error.
///
/// Clones share the same script.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Appends a response to the script.
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.lock().responses.push_back(preset);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock().requests.clone()
    }

    /// Returns the number of scripted responses not consumed yet.
    pub fn remaining(&self) -> usize {
        self.lock().responses.len()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        // A panicking test thread must not hide the script from the others.
        self.script.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let mut script = self.lock();
        script.requests.push(req.clone());
        let request_idx = script.requests.len();

        let Some(front) = script.responses.front_mut() else {
            return ready(Err(Error {
                message: "no enough responses",
                kind: ErrorKind::RateLimitExceeded,
            }));
        };
        match front.failures {
            Some(0) => {
                return ready(Err(Error {
                    message: "scripted permanent failure",
                    kind: ErrorKind::Other,
                }));
            }
            Some(n) => {
                front.failures = if n > 1 { Some(n - 1) } else { None };
                return ready(Err(Error {
                    message: "scripted failure",
                    kind: ErrorKind::Other,
                }));
            }
            None => {}
        }

        let Some(preset) = script.responses.pop_front() else {
            unreachable!("front response checked above");
        };
        let has_tool_call = preset
            .events
            .iter()
            .any(|event| matches!(event, PresetEvent::ToolCall(_)));
        ready(Ok(TestModelResponse {
            id: format!("msg:{request_idx}"),
            events: preset.events.into(),
            has_tool_call,
            completed: false,
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
        }))
    }
}
