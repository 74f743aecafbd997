use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use reflexion_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent, OpaqueMessage, ToolCallRequest,
};
use tracing::Instrument;

type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A type-erased handle to a model provider.
///
/// Every agent component holds its own clone; all clones share the same
/// provider.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    /// Wraps a provider.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // Erase `P` so that components don't need a generic parameter.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and collects the whole response.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
    ) -> Result<ModelClientResponse, Box<dyn ModelProviderError>> {
        (self.handler_fn)(req).await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    /// All message deltas, concatenated.
    pub transcript: String,
    /// The provider's own representation of the message, if any.
    pub opaque_msg: Option<OpaqueMessage>,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut transcript = String::new();
    let opaque_msg;
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };

        let Some(event) = event else {
            opaque_msg = pinned_resp.make_opaque_message();
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                transcript.push_str(&msg);
            }
            ModelResponseEvent::ToolCall(req) => {
                tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ModelClientResponse {
        transcript,
        opaque_msg,
        tool_calls,
        finish_reason,
    })
}
