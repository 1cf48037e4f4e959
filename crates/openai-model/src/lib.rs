//! A model provider for OpenAI-compatible APIs.

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
use reqwest::{Client, Response, StatusCode, header};
use stitch_model::{ErrorKind, ModelProvider, ModelProviderError, ModelRequest};

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
use io::{Chunks, Sse};
use response::OpenAIResponse;

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
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
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
        debug!(
            model = %self.config.model,
            messages = req.messages.len(),
            "sending chat completion request"
        );
        let resp_fut = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header(header::ACCEPT, "text/event-stream")
            .json(&openai_req)
            .send();

        async move {
            let resp = resp_fut
                .await
                .and_then(Response::error_for_status)
                .map_err(|err| {
                    Error::new(err.to_string(), error_kind_for_status(err.status()))
                })?;
            check_event_stream(&resp)?;
            Ok(OpenAIResponse::from_sse(Sse::new(Chunks::from_response(resp))))
        }
    }
}

/// Rejects replies that aren't an SSE stream, e.g. a JSON error page served
/// with a 200 status by a proxy.
fn check_event_stream(resp: &Response) -> Result<(), Error> {
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let is_event_stream = content_type
        .and_then(|v| v.parse::<Mime>().ok())
        .is_some_and(|m| {
            m.type_() == mime::TEXT && m.subtype().as_str() == "event-stream"
        });
    if is_event_stream {
        Ok(())
    } else {
        Err(Error::new(
            format!("expected an event stream, got {content_type:?}"),
            ErrorKind::Other,
        ))
    }
}

fn error_kind_for_status(status: Option<StatusCode>) -> ErrorKind {
    match status {
        Some(StatusCode::TOO_MANY_REQUESTS) => ErrorKind::RateLimitExceeded,
        _ => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_for_status() {
        assert_eq!(
            error_kind_for_status(Some(StatusCode::TOO_MANY_REQUESTS)),
            ErrorKind::RateLimitExceeded
        );
        assert_eq!(
            error_kind_for_status(Some(StatusCode::UNAUTHORIZED)),
            ErrorKind::Other
        );
        assert_eq!(error_kind_for_status(None), ErrorKind::Other);
    }
}
