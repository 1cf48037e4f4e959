use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// Errors produced by a [`ModelProvider`] or its responses.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Classifies the error so callers can decide whether to try again.
    fn kind(&self) -> ErrorKind;
}

/// A backend that turns a [`ModelRequest`] into a streamed completion.
///
/// Providers are shared by every session, so they should carry no
/// per-request state. Anything they hold internally (clients, connection
/// pools) must survive the provider being dropped at any time.
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// The streamed completion type.
    type Response: ModelResponse<Error = Self::Error>;

    /// Starts a completion for `req`.
    ///
    /// The returned future owns everything it needs, so the request may be
    /// dropped as soon as this method returns.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
