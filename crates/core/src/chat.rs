mod builder;
mod state;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use builder::{
    ChatBuilder, DEFAULT_MODEL, DEFAULT_STARTER, DEFAULT_WELCOME_MESSAGE,
};
pub use state::{
    CANCELLED_MESSAGE, ChatState, EMPTY_REPLY_PLACEHOLDER,
    MISSING_CREDENTIAL_MESSAGE, Rejection,
};

use crate::credential::Credential;
use crate::model_client::ModelClient;

/// How a submission ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubmitOutcome {
    /// Nothing was sent.
    Rejected(Rejection),
    /// The model replied and the reply was appended.
    Replied,
    /// The request failed; the error is in the state.
    Failed,
}

/// The conversation controller.
///
/// A chat owns the transcript and the composer state, and sends at most one
/// request at a time. All methods take `&self`, so a host can keep reading
/// [`Chat::snapshot`] while a submission is being awaited; the state lock is
/// never held across an await point.
pub struct Chat {
    model_client: ModelClient,
    state: Arc<Mutex<ChatState>>,
    on_transcript: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    on_idle: Option<Box<dyn Fn() + Send + Sync>>,
}

impl Chat {
    /// Sends `text` as the next user turn and waits for the reply.
    ///
    /// The text is ignored when it is blank, when a request is already
    /// outstanding, or when no API key is configured. Otherwise the draft is
    /// cleared, the trimmed text is appended as a user message and the whole
    /// transcript is sent to the model.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let (request, api_key) = {
            let mut state = self.lock_state();
            match state.begin_submit(text) {
                Ok(request) => (request, state.credential.api_key().to_owned()),
                Err(rejection) => {
                    debug!("submission rejected: {rejection:?}");
                    return SubmitOutcome::Rejected(rejection);
                }
            }
        };
        debug!("submitting turn {}", request.messages.len());
        let mut settle_guard = SettleGuard {
            state: Some(&self.state),
        };

        let on_delta = {
            let state = Arc::clone(&self.state);
            let on_transcript = self.on_transcript.clone();
            move |delta: String| {
                state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push_delta(&delta);
                if let Some(on_transcript) = &on_transcript {
                    on_transcript(&delta);
                }
            }
        };
        let result = self
            .model_client
            .send_request(&api_key, request, on_delta)
            .await;

        let outcome = {
            settle_guard.disarm();
            let mut state = self.lock_state();
            match result {
                Ok(resp) => {
                    state.complete(resp.transcript);
                    SubmitOutcome::Replied
                }
                Err(err) => {
                    warn!("submission failed: {err}");
                    state.fail(err.to_string());
                    SubmitOutcome::Failed
                }
            }
        };

        if let Some(on_idle) = &self.on_idle {
            on_idle();
        }
        outcome
    }

    /// Sends the current draft, like pressing the composer's send button.
    pub async fn submit_draft(&self) -> SubmitOutcome {
        let draft = self.lock_state().draft.clone();
        self.submit(&draft).await
    }

    /// Replaces the composer text.
    #[inline]
    pub fn set_draft<S: Into<String>>(&self, draft: S) {
        self.lock_state().draft = draft.into();
    }

    /// Selects the model for the following submissions.
    #[inline]
    pub fn set_model<S: Into<String>>(&self, model: S) {
        self.lock_state().model = model.into();
    }

    /// Replaces the API key. This does not persist anything, see
    /// [`Credential::persist`].
    #[inline]
    pub fn set_api_key<S: Into<String>>(&self, api_key: S) {
        self.lock_state().credential.set_api_key(api_key);
    }

    /// Turns remembering the API key on or off. This does not persist
    /// anything, see [`Credential::persist`].
    #[inline]
    pub fn set_remember(&self, remember: bool) {
        self.lock_state().credential.set_remember(remember);
    }

    /// Returns a copy of the credential.
    #[inline]
    pub fn credential(&self) -> Credential {
        self.lock_state().credential.clone()
    }

    /// Returns a copy of the whole state for rendering.
    #[inline]
    pub fn snapshot(&self) -> ChatState {
        self.lock_state().clone()
    }

    #[inline]
    fn lock_state(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Settles a submission whose future is dropped before the reply arrives,
/// so the chat does not stay in flight forever.
struct SettleGuard<'a> {
    state: Option<&'a Mutex<ChatState>>,
}

impl SettleGuard<'_> {
    #[inline]
    fn disarm(&mut self) {
        self.state = None;
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            warn!("submission dropped before it settled");
            state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .fail(CANCELLED_MESSAGE.to_owned());
        }
    }
}
