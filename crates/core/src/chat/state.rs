use booksense_model::ModelRequest;

use crate::conversation::{Conversation, Message};
use crate::credential::Credential;

/// The error shown when a message is submitted without an API key.
pub const MISSING_CREDENTIAL_MESSAGE: &str =
    "Please enter a valid Gemini API key first";

/// The error recorded when a submission is abandoned before its reply
/// arrives.
pub const CANCELLED_MESSAGE: &str = "The request was cancelled";

/// The reply recorded when the model answers without any text.
pub const EMPTY_REPLY_PLACEHOLDER: &str = "[No content]";

/// Why a submission was ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// The text is empty or whitespace only.
    EmptyInput,
    /// Another request is still outstanding.
    InFlight,
    /// No API key is configured. The error field explains this to the user.
    MissingCredential,
}

/// Everything the chat shows, as one plain value.
///
/// Only the transitions in this module change it, and the transcript is
/// only ever appended to: one user message right before a request, one
/// model message after a successful reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatState {
    pub(super) conversation: Conversation,
    pub(super) draft: String,
    pub(super) in_flight: bool,
    pub(super) error: Option<String>,
    pub(super) model: String,
    pub(super) credential: Credential,
    pub(super) pending_reply: String,
}

impl ChatState {
    /// Returns the transcript.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the text in the composer.
    #[inline]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Returns `true` while a request is outstanding.
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Returns the error of the last submission, if it failed.
    #[inline]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the selected model identifier.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the credential.
    #[inline]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Returns the reply text streamed so far for the outstanding request.
    ///
    /// This is not part of the transcript until the reply completes.
    #[inline]
    pub fn pending_reply(&self) -> &str {
        &self.pending_reply
    }

    /// Returns `true` if the composer's send action would do anything.
    #[inline]
    pub fn can_send(&self) -> bool {
        !self.in_flight
            && !self.draft.trim().is_empty()
            && self.credential.is_configured()
    }

    /// Checks a submission and, if accepted, records the user message and
    /// returns the request to send.
    pub(super) fn begin_submit(
        &mut self,
        text: &str,
    ) -> Result<ModelRequest, Rejection> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Rejection::EmptyInput);
        }
        if self.in_flight {
            return Err(Rejection::InFlight);
        }
        if !self.credential.is_configured() {
            self.error = Some(MISSING_CREDENTIAL_MESSAGE.to_owned());
            return Err(Rejection::MissingCredential);
        }

        self.error = None;
        self.in_flight = true;
        self.pending_reply.clear();
        self.draft.clear();
        self.conversation.push(Message::user(text));

        Ok(ModelRequest {
            model: self.model.clone(),
            messages: self.conversation.to_model_messages(),
        })
    }

    pub(super) fn push_delta(&mut self, delta: &str) {
        if self.in_flight {
            self.pending_reply.push_str(delta);
        }
    }

    pub(super) fn complete(&mut self, reply: String) {
        let reply = if reply.is_empty() {
            EMPTY_REPLY_PLACEHOLDER.to_owned()
        } else {
            reply
        };
        self.conversation.push(Message::model(reply));
        self.in_flight = false;
        self.pending_reply.clear();
    }

    pub(super) fn fail(&mut self, message: String) {
        self.error = Some(message);
        self.in_flight = false;
        self.pending_reply.clear();
    }
}

#[cfg(test)]
mod tests {
    use booksense_model::ModelMessage;

    use super::*;

    fn make_state(api_key: &str) -> ChatState {
        ChatState {
            conversation: Conversation::with_welcome("Welcome"),
            draft: "starter".to_owned(),
            in_flight: false,
            error: None,
            model: "gemini-2.5-flash".to_owned(),
            credential: Credential::new(api_key),
            pending_reply: String::new(),
        }
    }

    #[test]
    fn test_begin_submit_builds_request() {
        let mut state = make_state("key");
        state.error = Some("previous".to_owned());

        let request = state.begin_submit("  recommend 3 books \n").unwrap();
        assert_eq!(request.model, "gemini-2.5-flash");
        assert_eq!(
            request.messages,
            vec![
                ModelMessage::Model("Welcome".to_owned()),
                ModelMessage::User("recommend 3 books".to_owned()),
            ]
        );
        assert!(state.is_in_flight());
        assert_eq!(state.error(), None);
        assert_eq!(state.draft(), "");
        assert_eq!(state.conversation().len(), 2);
    }

    #[test]
    fn test_rejections_leave_transcript_alone() {
        let mut state = make_state("key");
        assert_eq!(state.begin_submit(" \t"), Err(Rejection::EmptyInput));
        assert_eq!(state.draft(), "starter");

        state.begin_submit("first").unwrap();
        assert_eq!(state.begin_submit("second"), Err(Rejection::InFlight));
        assert_eq!(state.conversation().len(), 2);

        let mut state = make_state("");
        assert_eq!(
            state.begin_submit("x"),
            Err(Rejection::MissingCredential)
        );
        assert_eq!(state.error(), Some(MISSING_CREDENTIAL_MESSAGE));
        assert_eq!(state.conversation().len(), 1);
        assert!(!state.is_in_flight());
    }

    #[test]
    fn test_complete_and_fail() {
        let mut state = make_state("key");
        state.begin_submit("a").unwrap();
        state.push_delta("Try ");
        assert_eq!(state.pending_reply(), "Try ");
        state.complete(String::new());
        assert_eq!(
            state.conversation().last(),
            Some(&Message::model(EMPTY_REPLY_PLACEHOLDER))
        );
        assert_eq!(state.pending_reply(), "");

        state.begin_submit("b").unwrap();
        state.fail("[503] overloaded".to_owned());
        assert_eq!(state.error(), Some("[503] overloaded"));
        assert!(!state.is_in_flight());
        assert_eq!(state.conversation().last(), Some(&Message::user("b")));

        // Deltas outside a request are dropped.
        state.push_delta("late");
        assert_eq!(state.pending_reply(), "");
    }

    #[test]
    fn test_can_send() {
        let mut state = make_state("key");
        assert!(state.can_send());
        state.draft.clear();
        assert!(!state.can_send());
        assert!(!make_state("").can_send());
    }
}
