use std::sync::{Arc, Mutex};

use booksense_model::ModelProvider;

use super::{Chat, ChatState};
use crate::conversation::Conversation;
use crate::credential::Credential;
use crate::model_client::ModelClient;

/// The model selected when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// The message the transcript starts with.
pub const DEFAULT_WELCOME_MESSAGE: &str = "📚 Hi, I'm your BookSense reading \
assistant.\nTell me what you usually like to read, how you've been feeling \
lately, or what's on your mind, and I'll put a reading list together for you.";

/// The prompt the composer starts with.
pub const DEFAULT_STARTER: &str = "I'd like to read more. Could you \
recommend 3 beginner-friendly books to start with?";

/// [`Chat`] builder.
pub struct ChatBuilder {
    model_client: ModelClient,
    model: String,
    welcome_message: String,
    starter: String,
    credential: Credential,
    on_transcript: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    on_idle: Option<Box<dyn Fn() + Send + Sync>>,
}

impl ChatBuilder {
    /// Creates a new builder that makes a provider from the API key current
    /// at each submission.
    #[inline]
    pub fn with_provider_factory<P, F>(make_provider: F) -> Self
    where
        P: ModelProvider + 'static,
        F: Fn(&str) -> P + Send + Sync + 'static,
    {
        Self {
            model_client: ModelClient::new(make_provider),
            model: DEFAULT_MODEL.to_owned(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_owned(),
            starter: DEFAULT_STARTER.to_owned(),
            credential: Credential::default(),
            on_transcript: None,
            on_idle: None,
        }
    }

    /// Creates a new builder with a provider that carries its own
    /// credential. The chat's API key then only gates submissions.
    #[inline]
    pub fn with_model_provider<P>(provider: P) -> Self
    where
        P: ModelProvider + Clone + 'static,
    {
        Self::with_provider_factory(move |_: &str| provider.clone())
    }

    /// Sets the initially selected model.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the message the transcript starts with.
    #[inline]
    pub fn with_welcome_message<S: Into<String>>(mut self, text: S) -> Self {
        self.welcome_message = text.into();
        self
    }

    /// Sets the text the composer starts with. Pass an empty string for an
    /// empty composer.
    #[inline]
    pub fn with_starter<S: Into<String>>(mut self, starter: S) -> Self {
        self.starter = starter.into();
        self
    }

    /// Sets the initial credential.
    #[inline]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// Attaches a callback to be invoked with each piece of reply text as it
    /// streams in.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Attaches a callback to be invoked when a submission has settled,
    /// successfully or not.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_idle = Some(Box::new(on_idle));
        self
    }

    /// Builds the chat.
    pub fn build(self) -> Chat {
        let ChatBuilder {
            model_client,
            model,
            welcome_message,
            starter,
            credential,
            on_transcript,
            on_idle,
        } = self;

        let state = ChatState {
            conversation: Conversation::with_welcome(welcome_message),
            draft: starter,
            in_flight: false,
            error: None,
            model,
            credential,
            pending_reply: String::new(),
        };
        Chat {
            model_client,
            state: Arc::new(Mutex::new(state)),
            on_transcript,
            on_idle,
        }
    }
}
