//! A local fake model for testing purpose.

mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use booksense_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
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
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        if this.event_idx > this.events.len() {
            // In case this method is called after completion.
            return Poll::Ready(Ok(None));
        }

        let delay = this.delay;
        let sleep = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        let event_idx = this.event_idx;
        this.event_idx += 1;
        let Some(event) = this.events.get(event_idx) else {
            return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                ModelFinishReason::Stop,
            ))));
        };
        match event {
            PresetEvent::MessageDelta(msg) => {
                Poll::Ready(Ok(Some(ModelResponseEvent::MessageDelta(
                    msg.clone(),
                ))))
            }
            PresetEvent::Error(message) => {
                // Nothing follows a broken stream.
                this.event_idx = this.events.len() + 1;
                Poll::Ready(Err(Error {
                    message: message.clone(),
                    kind: ErrorKind::Other,
                }))
            }
        }
    }
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond. The n-th preset answers the request whose history
/// contains n user messages. If there is no preset for a request, an error
/// will be returned.
///
/// Clones share the log of received requests, so a test can keep one clone
/// and hand the other to the code under test.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Vec<PresetResponse>,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl TestModelProvider {
    /// Appends the response for the next user turn.
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.script.push(preset);
    }

    /// Sets the delay before each event, 1ms by default.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
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
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(req.clone());

        let user_turns = req
            .messages
            .iter()
            .filter(|m| matches!(m, ModelMessage::User(_)))
            .count();
        let preset = user_turns.checked_sub(1).and_then(|i| self.script.get(i));
        let result = match preset {
            None => Err(Error {
                message: format!("no preset response for turn {user_turns}"),
                kind: ErrorKind::Other,
            }),
            Some(PresetResponse {
                failure: Some(message),
                ..
            }) => Err(Error {
                message: message.clone(),
                kind: ErrorKind::Other,
            }),
            Some(preset) => Ok(TestModelResponse {
                events: preset.events.clone(),
                event_idx: 0,
                delay: self.delay.unwrap_or(Duration::from_millis(1)),
                sleep: None,
            }),
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
    ) -> Result<String, Error> {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            if let ModelResponseEvent::MessageDelta(delta) = event {
                msg.push_str(&delta);
            }
        }
        Ok(msg)
    }

    fn request(messages: Vec<ModelMessage>) -> ModelRequest {
        ModelRequest {
            model: "test".to_owned(),
            messages,
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Hello, ".to_owned()),
            PresetEvent::MessageDelta("world!".to_owned()),
        ]));
        provider.add_response(PresetResponse::with_text("Sure."));

        let mut messages = vec![
            ModelMessage::Model("Welcome".to_owned()),
            ModelMessage::User("Hi".to_owned()),
        ];
        let resp = provider.send_request(&request(messages.clone())).await;
        let msg = collect_response(resp.unwrap()).await.unwrap();
        assert_eq!(msg, "Hello, world!");

        messages.push(ModelMessage::Model(msg));
        messages.push(ModelMessage::User("More".to_owned()));
        let resp = provider.send_request(&request(messages)).await;
        let msg = collect_response(resp.unwrap()).await.unwrap();
        assert_eq!(msg, "Sure.");

        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::failing("quota exceeded"));
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Half".to_owned()),
            PresetEvent::Error("connection reset".to_owned()),
        ]));

        let one = vec![ModelMessage::User("a".to_owned())];
        let err = provider.send_request(&request(one)).await.err().unwrap();
        assert_eq!(err.to_string(), "quota exceeded");

        let two = vec![
            ModelMessage::User("a".to_owned()),
            ModelMessage::User("b".to_owned()),
        ];
        let resp = provider.send_request(&request(two)).await.unwrap();
        let err = collect_response(resp).await.unwrap_err();
        assert_eq!(err.to_string(), "connection reset");

        let none = vec![];
        let err = provider.send_request(&request(none)).await.err().unwrap();
        assert_eq!(err.to_string(), "no preset response for turn 0");
    }
}
