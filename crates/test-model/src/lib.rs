//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use stitch_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    #[allow(dead_code)]
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    event_idx: usize,
    completed: bool,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        if this.completed {
            // In case this method is called after completion.
            return Poll::Ready(Ok(None));
        }

        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            let Some(preset) = this.events.get(this.event_idx) else {
                this.completed = true;
                return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                    ModelFinishReason::Stop,
                ))));
            };
            this.event_idx += 1;
            let event = match preset {
                PresetEvent::MessageDelta(msg) => {
                    ModelResponseEvent::MessageDelta(msg.clone())
                }
                PresetEvent::Truncated => {
                    this.completed = true;
                    ModelResponseEvent::Completed(ModelFinishReason::Length)
                }
            };
            return Poll::Ready(Ok(Some(event)));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<PresetResponse>,
    // Failed attempts against the response at the front of the queue.
    attempts: u64,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond. Each request consumes the next preset response in
/// the order they were added. A preset with `failures` keeps failing (and
/// stays at the front of the queue) until its failures are used up. If the
/// script runs out of responses, an error will be returned.
///
/// Clones share the same script, so a clone handed to the code under test
/// can still be inspected from the test.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.script().responses.push_back(preset);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.script().requests.clone()
    }

    #[inline]
    pub fn request_count(&self) -> usize {
        self.script().requests.len()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
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
        let mut script = self.script();
        script.requests.push(req.clone());

        let result = 'blk: {
            let Some(preset) = script.responses.pop_front() else {
                break 'blk Err(Error {
                    message: "no enough responses",
                    kind: ErrorKind::Other,
                });
            };
            let failing = match preset.failures {
                Some(0) => true,
                Some(failures) => script.attempts < failures,
                None => false,
            };
            if failing {
                script.attempts += 1;
                script.responses.push_front(preset);
                break 'blk Err(Error {
                    message: "preset failure",
                    kind: ErrorKind::RateLimitExceeded,
                });
            }

            script.attempts = 0;
            Ok(TestModelResponse {
                events: preset.events,
                event_idx: 0,
                completed: false,
                delay: self.delay.unwrap_or(Duration::from_millis(1)),
                sleep: None,
            })
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> (String, Option<ModelFinishReason>) {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        let mut finish_reason = None;
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await.unwrap()
        {
            match event {
                ModelResponseEvent::Completed(reason) => {
                    finish_reason = Some(reason);
                }
                ModelResponseEvent::MessageDelta(delta) => {
                    msg.push_str(&delta);
                }
            }
        }
        (msg, finish_reason)
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Chain 20, ".to_owned()),
            PresetEvent::MessageDelta("turn.".to_owned()),
        ]));
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Row 1: sc across".to_owned()),
            PresetEvent::Truncated,
            PresetEvent::MessageDelta("never sent".to_owned()),
        ]));

        let req = ModelRequest::with_prompts("sys", "A hat, please");
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, reason) = collect_response(resp).await;
        assert_eq!(msg, "Chain 20, turn.");
        assert_eq!(reason, Some(ModelFinishReason::Stop));

        let resp = provider.send_request(&req).await.unwrap();
        let (msg, reason) = collect_response(resp).await;
        assert_eq!(msg, "Row 1: sc across");
        assert_eq!(reason, Some(ModelFinishReason::Length));

        let err = provider.send_request(&req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(provider.request_count(), 3);
    }

    #[tokio::test]
    async fn test_failures_before_success() {
        let mut provider = TestModelProvider::default();
        provider.add_response(
            PresetResponse::with_text("Row 1: sc", 3).with_failures(2),
        );
        let shared = provider.clone();

        let req = ModelRequest::with_prompts("sys", "A scarf");
        for _ in 0..2 {
            let err = provider.send_request(&req).await.err().unwrap();
            assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        }
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, _) = collect_response(resp).await;
        assert_eq!(msg, "Row 1: sc");
        assert_eq!(shared.request_count(), 3);
        assert_eq!(shared.requests()[0], req);
    }

    #[tokio::test]
    async fn test_infinite_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_text("x", 1).with_failures(0));
        let req = ModelRequest::with_prompts("sys", "A bag");
        for _ in 0..5 {
            assert!(provider.send_request(&req).await.is_err());
        }
    }
}
