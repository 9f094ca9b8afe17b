use booksense_cat_api::{CatApiConfig, CatApiConfigBuilder, CatApiSource};
use booksense_core::image::ImageWidget;
use booksense_core::{Chat, ChatBuilder, Credential, SubmitOutcome};
use booksense_gemini_model::{GeminiConfigBuilder, GeminiProvider};
use booksense_model::ModelProvider;
use reqwest::Client;

/// Suggestions the host offers next to the composer. Each one is submitted
/// as is.
pub const QUICK_PROMPTS: [&str; 3] = [
    "I love Haruki Murakami's novels and Greeny Wu's songs. What books would \
     suit me?",
    "Recommend a few beginner-friendly personal finance books for college \
     students, nothing too hard.",
    "I've been feeling a bit lost lately. Are there any books about finding \
     yourself and growing up?",
];

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    chat_builder: ChatBuilder,
    image_config: CatApiConfig,
    client: Client,
}

impl SessionBuilder {
    /// Creates a session builder that talks to the Gemini API at `base_url`,
    /// or the public endpoint if it is `None`.
    pub fn with_gemini(base_url: Option<String>) -> Self {
        let client = Client::new();
        let chat_builder = ChatBuilder::with_provider_factory({
            let client = client.clone();
            move |api_key: &str| {
                let mut config = GeminiConfigBuilder::with_api_key(api_key);
                if let Some(base_url) = &base_url {
                    config = config.with_base_url(base_url.as_str());
                }
                GeminiProvider::with_client(client.clone(), config.build())
            }
        });
        Self {
            chat_builder,
            image_config: CatApiConfigBuilder::new().build(),
            client,
        }
    }

    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + Clone + 'static>(
        provider: M,
    ) -> Self {
        Self {
            chat_builder: ChatBuilder::with_model_provider(provider),
            image_config: CatApiConfigBuilder::new().build(),
            client: Client::new(),
        }
    }

    /// Sets the initially selected model.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.chat_builder = self.chat_builder.with_model(model);
        self
    }

    /// Sets the initial credential.
    #[inline]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.chat_builder = self.chat_builder.with_credential(credential);
        self
    }

    /// Sets where the image widget gets its pictures from.
    #[inline]
    pub fn with_image_config(mut self, config: CatApiConfig) -> Self {
        self.image_config = config;
        self
    }

    /// Attaches a callback to be invoked when the chat is idle.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.chat_builder = self.chat_builder.on_idle(on_idle);
        self
    }

    /// Attaches a callback to be invoked with each piece of reply text.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.chat_builder = self.chat_builder.on_transcript(on_transcript);
        self
    }

    /// Builds a new session and mounts its widgets. The image widget fetches
    /// its first picture before this returns.
    pub async fn mount(self) -> Session {
        let chat = self.chat_builder.build();
        let source = CatApiSource::with_client(self.client, self.image_config);
        let image = ImageWidget::mount(source).await;
        Session { chat, image }
    }
}

/// A mounted page: the book chat and the cat picture widget.
///
/// The two widgets share nothing but the HTTP client.
pub struct Session {
    chat: Chat,
    image: ImageWidget<CatApiSource>,
}

impl Session {
    /// Returns the chat.
    #[inline]
    pub fn chat(&self) -> &Chat {
        &self.chat
    }

    /// Returns the image widget.
    #[inline]
    pub fn image(&self) -> &ImageWidget<CatApiSource> {
        &self.image
    }

    /// Sends a message to the chat.
    #[inline]
    pub async fn send_message(&self, message: &str) -> SubmitOutcome {
        self.chat.submit(message).await
    }

    /// Sends the quick prompt at `index`, or returns `None` if there is no
    /// such prompt.
    pub async fn send_quick_prompt(
        &self,
        index: usize,
    ) -> Option<SubmitOutcome> {
        let prompt = QUICK_PROMPTS.get(index)?;
        self.chat.set_draft("");
        Some(self.chat.submit(prompt).await)
    }

    /// Fetches another picture.
    #[inline]
    pub async fn refresh_image(&self) {
        self.image.refresh().await;
    }
}

#[cfg(test)]
mod tests {
    use booksense_core::conversation::Message;
    use booksense_test_model::{PresetResponse, TestModelProvider};

    use super::*;

    async fn mount(provider: &TestModelProvider) -> Session {
        let image_config = CatApiConfigBuilder::new()
            .with_endpoint("http://127.0.0.1:9/v1/images/search")
            .build();
        SessionBuilder::with_model_provider(provider.clone())
            .with_credential(Credential::new("key"))
            .with_image_config(image_config)
            .mount()
            .await
    }

    #[tokio::test]
    async fn test_quick_prompt() {
        let mut provider = TestModelProvider::default();
        provider
            .add_response(PresetResponse::with_text("Try Kafka on the Shore."));
        let session = mount(&provider).await;

        assert_eq!(session.send_quick_prompt(3).await, None);
        let outcome = session.send_quick_prompt(0).await;
        assert_eq!(outcome, Some(SubmitOutcome::Replied));

        let state = session.chat().snapshot();
        assert_eq!(state.draft(), "");
        assert_eq!(
            &state.conversation().messages()[1..],
            &[
                Message::user(QUICK_PROMPTS[0]),
                Message::model("Try Kafka on the Shore."),
            ]
        );
    }

    #[tokio::test]
    async fn test_widgets_are_independent() {
        let provider = TestModelProvider::default();
        let session = mount(&provider).await;

        // The image widget failed on mount, which leaves the chat alone.
        let image = session.image().state();
        assert!(image.error.is_some());
        assert_eq!(session.chat().snapshot().error(), None);

        session.send_message("hello").await;
        assert!(session.chat().snapshot().error().is_some());
        session.refresh_image().await;
        assert!(session.image().state().image_url.is_none());
    }
}
