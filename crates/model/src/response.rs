use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};

use crate::provider::ModelProviderError;

/// A streamed completion.
///
/// The text arrives as a sequence of [`ModelResponseEvent::MessageDelta`]
/// events, concatenated in order, followed by at most one
/// [`ModelResponseEvent::Completed`] event telling why generation stopped.
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Polls for the next event of the stream.
    ///
    /// Resolves to `Ok(Some(event))` while events are flowing and to
    /// `Ok(None)` once the stream is exhausted. Any later call must keep
    /// resolving to `Ok(None)`. An `Err` ends the stream early; the text
    /// received before it should be considered incomplete.
    ///
    /// Returning `Poll::Pending` registers the task in `cx` for wakeup,
    /// like [`Future::poll`] does.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// Why the model stopped generating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFinishReason {
    /// The model ended the reply on its own.
    Stop,
    /// The reply hit the output token limit.
    Length,
}

impl ModelFinishReason {
    /// Returns `true` if the reply was cut off.
    #[inline]
    pub fn is_truncated(self) -> bool {
        self == ModelFinishReason::Length
    }
}

/// One event of a [`ModelResponse`] stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelResponseEvent {
    /// Generation finished.
    Completed(ModelFinishReason),
    /// The next piece of the reply text.
    MessageDelta(String),
}
