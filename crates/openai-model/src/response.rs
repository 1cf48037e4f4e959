use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use stitch_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};

use crate::Error;
use crate::io::Sse;
use crate::proto::ChatCompletionChunk;

struct PartialState {
    sse: Sse,
    id: Option<String>,
    // This field will be cleared after the response returns the complete event.
    pending_finish_reason: Option<ModelFinishReason>,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            pending_finish_reason: None,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

fn parse_finish_reason(reason: &str) -> Result<ModelFinishReason, Error> {
    match reason {
        "length" => Ok(ModelFinishReason::Length),
        "content_filter" => Err(Error::new(
            "the completion was blocked by the content filter",
            ErrorKind::Moderated,
        )),
        _ => Ok(ModelFinishReason::Stop),
    }
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    if let Some(finish_reason) = partial_state.pending_finish_reason.take() {
        return Ok((
            Some(ModelResponseEvent::Completed(finish_reason)),
            partial_state,
        ));
    }

    let sse = &mut partial_state.sse;
    let mut message_delta = None;

    loop {
        let sse_event = match sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            break;
        }

        let mut chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if partial_state.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id
        {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        };

        // The usage chunk has no choices, keep reading.
        let Some(choice) = chunk.choices.pop() else {
            continue;
        };

        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            message_delta = Some(content);
        }
        if let Some(finish_reason) = choice.finish_reason {
            partial_state.pending_finish_reason =
                Some(parse_finish_reason(&finish_reason)?);
            break;
        }
        if message_delta.is_some() {
            break;
        }
    }

    // Always emit the message delta first, the finish reason is emitted on the
    // next poll.
    if let Some(message_delta) = message_delta {
        return Ok((
            Some(ModelResponseEvent::MessageDelta(message_delta)),
            partial_state,
        ));
    }

    if let Some(finish_reason) = partial_state.pending_finish_reason.take() {
        return Ok((
            Some(ModelResponseEvent::Completed(finish_reason)),
            partial_state,
        ));
    }

    Ok((None, partial_state))
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;
    use stitch_model::ModelProviderError;

    use super::*;
    use crate::io::Chunks;

    const STREAM: &str = concat!(
        "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"},\"finish_reason\":null}]}\n\n",
        "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"Row 1: \"},\"finish_reason\":null}]}\n\n",
        "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"ch 20\"},\"finish_reason\":null}]}\n\n",
        "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: {\"id\":\"c1\",\"choices\":[],\"usage\":{\"total_tokens\":12}}\n\n",
        "data: [DONE]\n\n",
    );

    async fn collect(
        body: &'static str,
    ) -> Result<(String, Vec<ModelFinishReason>), Error> {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(body.as_bytes())].into(),
        );
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks)));
        let mut text = String::new();
        let mut reasons = Vec::new();
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            match event {
                ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
                ModelResponseEvent::Completed(reason) => reasons.push(reason),
            }
        }
        Ok((text, reasons))
    }

    #[tokio::test]
    async fn test_simple_events() {
        let (text, reasons) = collect(STREAM).await.unwrap();
        assert_eq!(text, "Row 1: ch 20");
        assert_eq!(reasons, vec![ModelFinishReason::Stop]);
    }

    #[tokio::test]
    async fn test_delta_with_finish_reason() {
        let body = concat!(
            "data: {\"id\":\"c2\",\"choices\":[{\"delta\":{\"content\":\"Row 1\"},\"finish_reason\":\"length\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        let (text, reasons) = collect(body).await.unwrap();
        assert_eq!(text, "Row 1");
        assert_eq!(reasons, vec![ModelFinishReason::Length]);
    }

    #[tokio::test]
    async fn test_content_filter() {
        let body = "data: {\"id\":\"c3\",\"choices\":[{\"delta\":{},\"finish_reason\":\"content_filter\"}]}\n\n";
        let err = collect(body).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Moderated);
    }

    #[tokio::test]
    async fn test_chunk_id_mismatch() {
        let body = concat!(
            "data: {\"id\":\"a\",\"choices\":[{\"delta\":{\"content\":\"x\"},\"finish_reason\":null}]}\n\n",
            "data: {\"id\":\"b\",\"choices\":[{\"delta\":{\"content\":\"y\"},\"finish_reason\":null}]}\n\n",
        );
        let err = collect(body).await.unwrap_err();
        assert_eq!(err.to_string(), "chunk id mismatch");
    }
}
