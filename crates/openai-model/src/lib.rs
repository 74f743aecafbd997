//! A model provider for OpenAI-compatible chat-completions APIs.
//!
//! Responses are always streamed. The defaults target Groq's endpoint;
//! point [`OpenAIConfigBuilder::with_base_url`] elsewhere for OpenAI or a
//! local server.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reflexion_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};
use reqwest::{Client, StatusCode, header};

pub use config::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE, OpenAIConfig,
    OpenAIConfigBuilder,
};
use io::{Chunks, Sse};
pub use response::OpenAIResponse;

/// Error type for [`OpenAIProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
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

/// OpenAI-compatible model provider.
#[derive(Clone, Debug)]
pub struct OpenAIProvider {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider` with the given configuration.
    #[inline]
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Returns the configuration of this provider.
    #[inline]
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

impl ModelProvider for OpenAIProvider {
    type Error = Error;
    type Response = OpenAIResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let openai_req = proto::create_request(req, &self.config);
        let resp_fut = self
            .client
            .post(self.config.endpoint("/chat/completions"))
            .bearer_auth(&self.config.api_key)
            .header(header::ACCEPT, "text/event-stream")
            .json(&openai_req)
            .send();

        async move {
            let resp = resp_fut.await.map_err(|err| {
                Error::new(format!("request failed: {err}"), ErrorKind::Other)
            })?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                let kind = if status == StatusCode::TOO_MANY_REQUESTS {
                    ErrorKind::RateLimitExceeded
                } else {
                    ErrorKind::Other
                };
                return Err(Error::new(
                    format!("server returned {status}: {body}"),
                    kind,
                ));
            }

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned);
            let is_event_stream = content_type
                .as_deref()
                .and_then(|v| v.parse::<Mime>().ok())
                .is_some_and(|m| m.subtype().as_str() == "event-stream");
            if !is_event_stream {
                return Err(Error::new(
                    format!("unexpected content type: {content_type:?}"),
                    ErrorKind::Other,
                ));
            }

            debug!("streaming response from {}", host_of(&resp));
            let sse = Sse::new(Chunks::from_response(resp));
            Ok(OpenAIResponse::from_sse(sse))
        }
    }
}

#[inline]
fn host_of(resp: &reqwest::Response) -> &str {
    resp.url().host_str().unwrap_or("<unknown host>")
}
