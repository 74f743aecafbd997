use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// The error type for a model provider.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A hosted (or fake) generation capability.
///
/// Providers are configured once at construction (endpoint, model id,
/// temperature, credentials) and afterwards behave as stateless request
/// factories. Callers may clone requests freely and drop the provider at
/// any time.
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// The response type for this provider.
    type Response: ModelResponse<Error = Self::Error>;

    /// Sends a request to the model.
    ///
    /// The returned future must not borrow `self` or `req`.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
