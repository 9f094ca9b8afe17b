use std::pin::Pin;
use std::task::{Context, Poll, ready};

use booksense_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::{Sse, SseError};
use crate::proto::{
    ErrorResponse, FinishReason, GenerateContentResponse, parse_finish_reason,
};

struct PartialState {
    sse: Sse,
    // A finish reason arrives in the same chunk as the last piece of text,
    // it is reported right after that text.
    pending_finish_reason: Option<ModelFinishReason>,
    finished: bool,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct GeminiResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl GeminiResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            pending_finish_reason: None,
            finished: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for GeminiResponse {
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

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    if let Some(reason) = partial_state.pending_finish_reason.take() {
        return Ok((Some(ModelResponseEvent::Completed(reason)), partial_state));
    }

    loop {
        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err @ SseError::InvalidPayload) => {
                return Err(Error::new(
                    format!("{err}"),
                    ErrorKind::MalformedResponse,
                ));
            }
            Err(err) => {
                return Err(Error::new(format!("{err}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");

        // Failures after the headers were sent arrive as an event.
        if let Ok(resp) = serde_json::from_str::<ErrorResponse>(&sse_event) {
            return Err(Error::from_service(resp.error.code, resp.error));
        }

        let chunk = serde_json::from_str::<GenerateContentResponse>(&sse_event)
            .map_err(|err| {
                Error::new(format!("{err}"), ErrorKind::MalformedResponse)
            })?;
        if let Some(model_version) = &chunk.model_version {
            trace!("answered by {model_version}");
        }

        let block_reason = chunk
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref());
        if let Some(reason) = block_reason {
            return Err(Error::new(
                format!("Response was blocked due to {reason}"),
                ErrorKind::Moderated,
            ));
        }

        let Some(candidate) = chunk.candidates.first() else {
            continue;
        };
        if let Some(reason) = candidate.finish_reason.as_deref() {
            match parse_finish_reason(reason) {
                FinishReason::Blocked(reason) => {
                    return Err(Error::new(
                        format!("Candidate was blocked due to {reason}"),
                        ErrorKind::Moderated,
                    ));
                }
                FinishReason::Finished(reason) => {
                    partial_state.pending_finish_reason = Some(reason);
                    partial_state.finished = true;
                }
            }
        }

        // Always emit the text first, then the pending finish reason.
        if let Some(text) = candidate.text() {
            return Ok((
                Some(ModelResponseEvent::MessageDelta(text)),
                partial_state,
            ));
        }
        if let Some(reason) = partial_state.pending_finish_reason.take() {
            return Ok((
                Some(ModelResponseEvent::Completed(reason)),
                partial_state,
            ));
        }
    }

    // A reply cut off by a dropped connection must not pass as complete.
    if !partial_state.finished {
        return Err(Error::new(
            "Stream ended before the reply was finished",
            ErrorKind::MalformedResponse,
        ));
    }
    Ok((None, partial_state))
}
