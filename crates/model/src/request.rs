use serde::{Deserialize, Serialize};

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// Identifier of the model that should answer, e.g. `gemini-2.5-flash`.
    pub model: String,
    /// The conversation so far, oldest first. The last message is usually
    /// the user input this request answers.
    pub messages: Vec<ModelMessage>,
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "text", rename_all = "lowercase")]
pub enum ModelMessage {
    /// A user input text.
    User(String),
    /// A text previously generated by the model.
    Model(String),
}

impl ModelMessage {
    /// Returns the text carried by this message.
    #[inline]
    pub fn text(&self) -> &str {
        match self {
            ModelMessage::User(text) | ModelMessage::Model(text) => text,
        }
    }
}
