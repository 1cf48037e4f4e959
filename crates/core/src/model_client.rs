use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use stitch_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent,
};
use tracing::Instrument;

type CompletionResult = Result<Completion, Box<dyn ModelProviderError>>;
type BoxedCompletionFuture =
    Pin<Box<dyn Future<Output = CompletionResult> + Send>>;
type RequestFn =
    Arc<dyn Fn(ModelRequest) -> BoxedCompletionFuture + Send + Sync>;

/// A model provider behind a type-erased handle, so the composer doesn't
/// need to be generic over it.
#[derive(Clone)]
pub struct ModelClient {
    request_fn: RequestFn,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let request_fn: RequestFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            let span = trace_span!("model request", messages = req.messages.len());
            Box::pin(
                async move {
                    let resp = fut.await.map_err(|err| {
                        error!("model request failed: {err}");
                        Box::new(err) as Box<dyn ModelProviderError>
                    })?;
                    collect::<P::Response>(resp).await
                }
                .instrument(span),
            )
        });
        Self { request_fn }
    }

    /// Sends a request and waits for the whole reply.
    ///
    /// Dropping the returned future stops reading the stream.
    #[inline]
    pub async fn send_request(&self, req: ModelRequest) -> CompletionResult {
        (self.request_fn)(req).await
    }
}

/// A fully received reply.
#[derive(Clone, Debug, Default)]
pub struct Completion {
    pub text: String,
    pub finish_reason: Option<ModelFinishReason>,
}

async fn collect<R: ModelResponse>(resp: R) -> CompletionResult {
    let mut completion = Completion::default();
    let mut resp = pin!(resp);
    while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
        .await
        .map_err(|err| {
            error!("model stream broke off: {err}");
            Box::new(err) as Box<dyn ModelProviderError>
        })?
    {
        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                completion.text.push_str(&delta);
            }
            ModelResponseEvent::Completed(reason) => {
                completion.finish_reason = Some(reason);
            }
        }
    }
    trace!(
        len = completion.text.len(),
        finish_reason = ?completion.finish_reason,
        "reply received"
    );
    Ok(completion)
}

#[cfg(test)]
mod tests {
    use stitch_model::ErrorKind;
    use stitch_test_model::{PresetEvent, PresetResponse, TestModelProvider};

    use super::*;

    #[tokio::test]
    async fn test_send_request() {
        let mut model_provider = TestModelProvider::default();
        for _ in 0..3 {
            model_provider.add_response(PresetResponse::with_events([
                PresetEvent::MessageDelta("Chain ".to_owned()),
                PresetEvent::MessageDelta("20, ".to_owned()),
                PresetEvent::MessageDelta("join.".to_owned()),
            ]));
        }

        let model_client = ModelClient::new(model_provider);

        for _ in 0..3 {
            let completion = model_client
                .send_request(ModelRequest::with_prompts("sys", "A hat"))
                .await
                .unwrap();
            assert_eq!(completion.text, "Chain 20, join.");
            assert_eq!(completion.finish_reason, Some(ModelFinishReason::Stop));
        }
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        let model_client = ModelClient::new(model_provider);
        let err = model_client
            .send_request(ModelRequest::with_prompts("sys", "A hat"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
